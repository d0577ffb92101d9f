//! Host side of the channel - listener and per-client loop
//!
//! Accepts clients on the channel and spawns one task per connection. Each
//! task reads a request frame, hands it to a [`RequestHandler`] and writes
//! the returned document back, until the client disconnects or the handler
//! declines to answer.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use interprocess::local_socket::traits::tokio::Listener as ListenerTrait;

use crate::common::{paths, Error, Result};

use super::framer;
use super::transport::{self, Listener, Stream};

/// Turns one request document into one response document
///
/// Returning `None` ends the exchange and disconnects that client.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: Value) -> Option<Value>;
}

impl<F> RequestHandler for F
where
    F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
{
    fn handle(&self, request: Value) -> Option<Value> {
        self(request)
    }
}

/// Listener bound to a channel
pub struct FrameServer {
    channel: String,
    listener: Listener,
}

impl FrameServer {
    /// Bind the channel, replacing a stale socket file if there is one
    pub async fn bind(channel: &str) -> Result<Self> {
        let channel = paths::resolve_channel(channel);
        let listener = transport::bind(&channel).await?;
        tracing::info!(channel = %channel, "Host listening");

        Ok(Self { channel, listener })
    }

    /// Resolved channel this server listens on
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Accept clients until `shutdown` resolves
    pub async fn serve<H, F>(self, handler: H, shutdown: F) -> Result<()>
    where
        H: RequestHandler,
        F: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        let mut next_client: u64 = 1;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, closing listener");
                    break;
                }
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok(stream) => {
                            let client = next_client;
                            next_client += 1;
                            tracing::debug!(client, "Client connected");

                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, handler.as_ref()).await {
                                    tracing::error!(client, "Error handling client: {}", e);
                                }
                                tracing::debug!(client, "Client finished");
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }

        drop(self.listener);
        #[cfg(unix)]
        if paths::is_path_like(&self.channel) {
            paths::remove_socket(std::path::Path::new(&self.channel))?;
        }

        Ok(())
    }
}

/// Serve request/response cycles for one client
async fn handle_client<H: RequestHandler>(stream: Stream, handler: &H) -> Result<()> {
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        let request = match framer::read_frame(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!("Client disconnected");
                break;
            }
            Err(Error::Protocol(message)) => {
                tracing::warn!("Dropping client after malformed request: {}", message);
                break;
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(%request, "Received request");

        let Some(response) = handler.handle(request) else {
            tracing::debug!("Handler ended the exchange");
            break;
        };

        framer::send_json(&mut writer, &response).await?;
    }

    Ok(())
}
