//! Client-side session owning one connection to the host
//!
//! The protocol is strictly half-duplex: one request frame, then exactly one
//! response frame. Request methods take `&mut self`, so a session can never
//! have two requests in flight. To share a session between call sites, wrap
//! it in a [`SharedSession`] or hand out a `&mut dyn ResourceChannel`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::common::{config::Config, paths, Error, Result};

use super::framer;
use super::protocol::Command;
use super::transport::{self, Stream};

/// Delay between attempts while the channel does not exist yet
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// A session shared between several callers; the mutex keeps exchanges
/// from interleaving on the wire
pub type SharedSession<S = Stream> = Arc<Mutex<PipeSession<S>>>;

/// Lifecycle of a session
///
/// `Closed` is terminal. Reconnecting means creating a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

/// The two operations the host offers
///
/// Implemented by [`PipeSession`]; callers that take this trait can be
/// tested against a fake.
#[async_trait]
pub trait ResourceChannel: Send {
    /// List resources that have a runtime; `None` if the host hung up
    async fn list_resources(&mut self) -> Result<Option<Value>>;

    /// Execute `file_path` inside `resource`; `None` if the host hung up
    async fn execute_in_resource(
        &mut self,
        resource: &str,
        file_path: &str,
    ) -> Result<Option<Value>>;
}

struct Connection<S> {
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
}

/// Session with the host over one duplex connection
pub struct PipeSession<S = Stream> {
    channel: String,
    state: SessionState,
    connection: Option<Connection<S>>,
    request_timeout: Option<Duration>,
}

impl<S> PipeSession<S> {
    /// Create an unconnected session for `channel`
    ///
    /// Bare channel names are resolved to the platform's socket or pipe name.
    pub fn new(channel: &str) -> Self {
        Self {
            channel: paths::resolve_channel(channel),
            state: SessionState::Unconnected,
            connection: None,
            request_timeout: None,
        }
    }

    /// Create an unconnected session using the configured channel and
    /// request timeout
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.channel()).with_request_timeout(config.request_timeout())
    }

    /// Bound each request/response round trip; `None` waits forever
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Resolved channel this session talks to
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Drop the connection; the session cannot be used afterwards
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::debug!(channel = %self.channel, "Closing session");
        }
        self.connection = None;
        self.state = SessionState::Closed;
    }

    /// Wrap the session for sharing between tasks
    pub fn into_shared(self) -> SharedSession<S> {
        Arc::new(Mutex::new(self))
    }
}

impl PipeSession<Stream> {
    /// Connect to the host, waiting at most `timeout`
    ///
    /// While the channel does not exist the attempt is repeated, so a host
    /// that comes up within the timeout is still reached.
    pub async fn connect(&mut self, timeout: Duration) -> Result<()> {
        match self.state {
            SessionState::Unconnected => {}
            SessionState::Closed => return Err(Error::SessionClosed),
            SessionState::Connecting | SessionState::Connected => {
                return Err(Error::AlreadyConnected)
            }
        }

        self.state = SessionState::Connecting;
        let timeout_ms = timeout.as_millis() as u64;
        tracing::info!(channel = %self.channel, timeout_ms, "Connecting to host");

        let channel = self.channel.as_str();
        let attempt = async {
            loop {
                match transport::connect(channel).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                    }
                    Err(e) => return Err(Error::ConnectError(e)),
                }
            }
        };

        let result = match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectTimeout(timeout_ms)),
        };

        match result {
            Ok(stream) => {
                self.attach(stream);
                tracing::info!(channel = %self.channel, "Connected");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(channel = %self.channel, "Connection failed: {}", e);
                self.close();
                Err(e)
            }
        }
    }
}

impl<S> PipeSession<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Create a connected session over an already-open stream
    pub fn from_stream(channel: &str, stream: S) -> Self {
        let mut session = Self::new(channel);
        session.attach(stream);
        session
    }

    fn attach(&mut self, stream: S) {
        let (reader, writer) = tokio::io::split(stream);
        self.connection = Some(Connection { reader, writer });
        self.state = SessionState::Connected;
    }

    /// Send one command and read its response
    ///
    /// Returns `Ok(None)` if the host closed the connection without a
    /// complete response. Every failure after the command is handed to the
    /// transport, the `None` case, and dropping the returned future before
    /// it completes all leave the session closed.
    pub async fn request<T>(&mut self, command: &T) -> Result<Option<Value>>
    where
        T: Serialize + ?Sized,
    {
        match self.state {
            SessionState::Connected => {}
            SessionState::Closed => return Err(Error::SessionClosed),
            SessionState::Unconnected | SessionState::Connecting => {
                return Err(Error::NotConnected)
            }
        }

        let payload = serde_json::to_vec(command)?;
        if payload.len() > framer::MAX_FRAME_SIZE as usize {
            return Err(Error::invalid_argument(format!(
                "command too large: {} bytes",
                payload.len()
            )));
        }

        let limit = self.request_timeout;
        let mut connection = self.connection.take().ok_or(Error::NotConnected)?;

        // Closed until the response is in hand. If this future is dropped
        // mid-exchange the connection goes with it, and later requests fail
        // instead of reading a response meant for this one.
        self.state = SessionState::Closed;

        tracing::debug!(len = payload.len(), "Sending request");
        let exchange = round_trip(&mut connection, &payload);
        let outcome = match limit {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::RequestTimeout(limit.as_millis() as u64)),
            },
            None => exchange.await,
        };

        match outcome {
            Ok(Some(response)) => {
                tracing::debug!(%response, "Received response");
                self.connection = Some(connection);
                self.state = SessionState::Connected;
                Ok(Some(response))
            }
            Ok(None) => {
                tracing::info!(channel = %self.channel, "Host closed the connection without responding");
                self.close();
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(channel = %self.channel, "Request failed: {}", e);
                self.close();
                Err(e)
            }
        }
    }

    /// Ask the host for resources that currently have a runtime
    pub async fn list_resources(&mut self) -> Result<Option<Value>> {
        self.request(&Command::ListResourcesWithRuntimes).await
    }

    /// Ask the host to execute `file_path` inside `resource`
    ///
    /// `file_path` is sent verbatim; resolving and checking it is the
    /// caller's job.
    pub async fn execute_in_resource(
        &mut self,
        resource: &str,
        file_path: &str,
    ) -> Result<Option<Value>> {
        if resource.is_empty() {
            return Err(Error::invalid_argument("resource name must not be empty"));
        }

        let command = Command::ExecuteInResource {
            resource: resource.to_string(),
            script_file_path: file_path.to_string(),
        };
        self.request(&command).await
    }
}

async fn round_trip<S>(connection: &mut Connection<S>, payload: &[u8]) -> Result<Option<Value>>
where
    S: AsyncRead + AsyncWrite,
{
    framer::write_frame(&mut connection.writer, payload).await?;
    framer::read_frame(&mut connection.reader).await
}

#[async_trait]
impl<S> ResourceChannel for PipeSession<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    async fn list_resources(&mut self) -> Result<Option<Value>> {
        PipeSession::list_resources(self).await
    }

    async fn execute_in_resource(
        &mut self,
        resource: &str,
        file_path: &str,
    ) -> Result<Option<Value>> {
        PipeSession::execute_in_resource(self, resource, file_path).await
    }
}
