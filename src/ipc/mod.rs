//! IPC between the client and the host
//!
//! Uses Unix domain sockets on Unix/macOS and named pipes on Windows
//! via the interprocess crate, with length-prefixed JSON frames.

pub mod framer;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use protocol::Command;
pub use server::{FrameServer, RequestHandler};
pub use session::{PipeSession, ResourceChannel, SessionState, SharedSession};
