//! Cross-platform IPC transport layer
//!
//! Abstracts Unix domain sockets (Unix/macOS) and named pipes (Windows)
//! using the interprocess crate. Framing lives in [`super::framer`].

use std::io;

use interprocess::local_socket::tokio::prelude::*;
pub use interprocess::local_socket::tokio::{Listener, Stream};
use interprocess::local_socket::{GenericFilePath, GenericNamespaced, ListenerOptions, Name};

use crate::common::paths;

/// Convert a resolved channel string into an interprocess name
///
/// Path-like channels are filesystem names (socket files, or `\\.\pipe\...`
/// on Windows); bare names go to the local socket namespace.
fn local_name(channel: &str) -> io::Result<Name<'_>> {
    if paths::is_path_like(channel) {
        channel.to_fs_name::<GenericFilePath>()
    } else {
        channel.to_ns_name::<GenericNamespaced>()
    }
}

/// Create a listener for incoming connections on `channel`
pub async fn bind(channel: &str) -> io::Result<Listener> {
    let is_socket_file = cfg!(unix) && paths::is_path_like(channel);

    if is_socket_file {
        // Ensure socket directory exists and clean up stale socket
        let path = std::path::Path::new(channel);
        paths::ensure_socket_dir(path)?;
        paths::remove_socket(path)?;
    }

    let listener = ListenerOptions::new()
        .name(local_name(channel)?)
        .create_tokio()?;

    // Set socket permissions on Unix
    #[cfg(unix)]
    if is_socket_file {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(channel, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(listener)
}

/// Make a single connection attempt to `channel`
pub async fn connect(channel: &str) -> io::Result<Stream> {
    Stream::connect(local_name(channel)?).await
}
