//! resource-pipe - list resources on a local host and execute files in them
//!
//! Talks to the host over a named pipe (Windows) or Unix domain socket
//! using length-prefixed JSON frames.

use clap::Parser;
use resource_pipe::commands::{Commands, ConnectionArgs};
use resource_pipe::{cli, common::logging};

#[derive(Parser)]
#[command(name = "resource-pipe", about = "Command channel client for resource runtimes")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.connection, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
