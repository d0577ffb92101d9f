//! CLI command definitions
//!
//! Defines the clap commands for the resource pipe CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Connection options shared by every command
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Channel name or socket path (default: from config, then my_ipc_pipe)
    #[arg(long, global = true)]
    pub channel: Option<String>,

    /// How long to wait for the host to accept the connection
    #[arg(long, global = true, value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Bound on each request/response round trip (0 disables)
    #[arg(long, global = true, value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List resources that have an active script runtime
    #[command(alias = "ls")]
    List,

    /// Execute a file inside a resource
    Exec {
        /// Resource to execute in
        resource: String,

        /// File to execute (resolved to an absolute path before sending)
        file: PathBuf,
    },

    /// Send a raw command object and print the response
    #[command(hide = true)]
    Raw {
        /// JSON object with a "cmd" field
        json: String,
    },
}
