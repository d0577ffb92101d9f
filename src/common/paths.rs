//! Channel names and configuration paths
//!
//! Unix/macOS: the channel is a Unix domain socket under $XDG_RUNTIME_DIR or /tmp
//! Windows: the channel is the named pipe \\.\pipe\my_ipc_pipe

use std::io;
use std::path::{Path, PathBuf};

/// Well-known channel name shared with the host
pub const CHANNEL_NAME: &str = "my_ipc_pipe";

/// Application name used for directories
const APP_NAME: &str = "resource-pipe";

/// Whether a channel string is a filesystem path rather than a bare name
///
/// Paths are used verbatim. On Windows this covers `\\.\pipe\...` names.
pub fn is_path_like(channel: &str) -> bool {
    channel.contains('/') || channel.contains('\\')
}

/// Turn a configured channel into the string handed to the transport
///
/// Bare names become a socket path on Unix and stay namespaced pipe names
/// on Windows. Path-like channels pass through unchanged.
pub fn resolve_channel(channel: &str) -> String {
    if is_path_like(channel) {
        return channel.to_string();
    }

    #[cfg(unix)]
    {
        runtime_dir()
            .join(format!("{}.sock", channel))
            .to_string_lossy()
            .into_owned()
    }

    #[cfg(windows)]
    {
        channel.to_string()
    }
}

/// Directory holding socket files
///
/// - `$XDG_RUNTIME_DIR/resource-pipe/` when set
/// - `/tmp/resource-pipe-<uid>/` otherwise
#[cfg(unix)]
pub fn runtime_dir() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_NAME);
    }

    // Fallback to /tmp with uid for security
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
}

/// Ensure the directory containing a socket file exists
///
/// Newly created directories get mode 0700.
#[cfg(unix)]
pub fn ensure_socket_dir(socket: &Path) -> io::Result<()> {
    let dir = socket.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Invalid socket path")
    })?;

    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

#[cfg(windows)]
pub fn ensure_socket_dir(_socket: &Path) -> io::Result<()> {
    Ok(())
}

/// Remove a stale socket file left behind by a previous host
#[cfg(unix)]
pub fn remove_socket(socket: &Path) -> io::Result<()> {
    match std::fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(windows)]
pub fn remove_socket(_socket: &Path) -> io::Result<()> {
    // Named pipes are cleaned up by the OS
    Ok(())
}

/// Get the configuration directory path
///
/// - Linux: `~/.config/resource-pipe/`
/// - macOS: `~/Library/Application Support/resource-pipe/`
/// - Windows: `%APPDATA%\resource-pipe\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
