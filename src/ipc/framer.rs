//! Length-prefixed JSON framing
//!
//! ```text
//! +----------------------+---------------------------+
//! | length: u32 (LE)     | payload: `length` bytes   |
//! +----------------------+---------------------------+
//! ```
//!
//! The payload is UTF-8 JSON. A stream that ends before a complete frame
//! yields `None` rather than an error, so callers can tell "peer closed"
//! apart from "peer sent garbage".

use serde::Serialize;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

/// Maximum frame payload size (64 MB)
pub const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Write one frame containing `json`
///
/// Does not return until every byte has been handed to the transport and
/// the writer has been flushed. A payload above [`MAX_FRAME_SIZE`] is
/// rejected before anything is written.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, json: &[u8]) -> Result<()> {
    let len = u32::try_from(json.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            Error::invalid_argument(format!("frame too large: {} bytes", json.len()))
        })?;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(json).await?;
    writer.flush().await?;
    Ok(())
}

/// Serialize `message` and write it as one frame
pub async fn send_json<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec(message)?;
    write_frame(writer, &json).await
}

/// Read the raw payload of one frame
///
/// Returns `Ok(None)` when the stream closes before a full frame arrives or
/// when the header carries an implausible length.
pub async fn read_frame_bytes<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    if !read_full(reader, &mut len_buf).await? {
        tracing::debug!("Stream closed before frame header");
        return Ok(None);
    }

    // Peers that read the header as i32 see anything above i32::MAX as
    // negative; MAX_FRAME_SIZE sits well below that, so one check covers both.
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        tracing::warn!(len, "Rejecting frame with implausible length");
        return Ok(None);
    }

    let mut payload = vec![0u8; len as usize];
    if !read_full(reader, &mut payload).await? {
        tracing::debug!(expected = len, "Stream closed mid-frame");
        return Ok(None);
    }

    Ok(Some(payload))
}

/// Read one frame and parse it as JSON
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<serde_json::Value>> {
    let Some(payload) = read_frame_bytes(reader).await? else {
        return Ok(None);
    };

    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(|e| Error::Protocol(format!("Invalid JSON payload ({} bytes): {}", payload.len(), e)))
}

/// Fill `buf` completely; `false` when the stream hit EOF first
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(Error::Io(e)),
    }
}
