//! Resource pipe - client for a local command channel
//!
//! A long-lived host exposes resources that can execute files. This library
//! connects to it over a named pipe or Unix domain socket, sends
//! length-prefixed JSON commands and reads one response per command.

pub mod cli;
pub mod commands;
pub mod common;
pub mod ipc;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use ipc::{Command, PipeSession, ResourceChannel, SessionState};
