//! Per-display MDC transport session.
//!
//! A [`DeviceSession`] owns the TCP link to exactly one display and turns a
//! `(command, payload)` pair into a validated response frame.  It handles:
//!
//! - connecting lazily, bounded by the connect timeout;
//! - reading exactly one response frame, bounded by the response timeout;
//! - retrying a failed exchange up to `max_retries` times with a fixed delay
//!   between attempts;
//! - tracking connection state, I/O error count, and the time of the last
//!   response so the health monitor can report on it.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──ok──► Connected
//!      ▲                          │                  │
//!      │                          └──timeout/err──►  │ I/O error / timeout
//!      │                                      Faulted ◄┘
//!      └──────────── disconnect() ◄──────── (any state)
//! ```
//!
//! `Faulted` and `Disconnected` are both valid starting points for the next
//! `connect()`.
//!
//! # Concurrency
//!
//! At most one exchange runs per session: the link lives behind a
//! `tokio::sync::Mutex` that is held for a whole `send_command` call,
//! retries included.  Statistics live in a separate short-lived
//! `std::sync::Mutex` so [`DeviceSession::snapshot`] never waits on I/O.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use mdc_core::protocol::{frame_len, FRAME_HEADER, HEADER_SIZE};
use mdc_core::{decode_frame, encode_frame, CommandCode, DecodedFrame, DisplayId, ProtocolError};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::application::display_control::ControlError;

/// Default MDC TCP port.
pub const DEFAULT_MDC_PORT: u16 = 1515;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors raised by the transport itself, below the MDC framing layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection attempt did not finish within the connect timeout.
    #[error("timed out after {timeout:?} connecting to {addr}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The connector reported an error while opening the link.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// No complete response frame arrived within the response timeout.
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    /// The display closed the connection.
    #[error("connection closed by display")]
    Disconnected,

    /// Any other I/O failure on an established link.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Why a single send attempt failed.
#[derive(Debug, Error)]
enum AttemptFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid response: {0}")]
    Protocol(#[from] ProtocolError),
}

impl AttemptFailure {
    /// Whether the link can no longer be trusted after this failure.
    fn faults_link(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            // Once the header byte is wrong the frame boundaries are lost.
            Self::Protocol(ProtocolError::InvalidHeader(_)) => true,
            Self::Protocol(_) => false,
        }
    }

    fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Io(_) | TransportError::Disconnected)
        )
    }
}

// ── Stream seam ───────────────────────────────────────────────────────────────

/// A bidirectional byte stream to a display.
pub trait DisplayStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> DisplayStream for T {}

/// Owned, type-erased display stream.
pub type BoxedStream = Box<dyn DisplayStream>;

/// Opens links to displays.
///
/// Production code uses [`TcpConnector`]; tests inject in-memory streams.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new stream to `host:port`.
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedStream>;
}

/// [`Connector`] backed by `tokio::net::TcpStream`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedStream> {
        let stream = TcpStream::connect((host, port)).await?;
        // Frames are tiny request/response pairs; do not let Nagle hold them.
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

// ── Session configuration and state ───────────────────────────────────────────

/// Timeouts and retry policy for a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub retry_delay: Duration,
    /// Attempts per command.  Zero is treated as one: a command is always
    /// tried at least once.
    pub max_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            max_retries: 3,
        }
    }
}

/// Connection state of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Faulted,
}

/// Point-in-time copy of a session's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// I/O failures since the last successful connect.
    pub error_count: u32,
    /// When the last complete response frame arrived.
    pub last_response: Option<SystemTime>,
}

#[derive(Debug)]
struct SessionStats {
    state: SessionState,
    error_count: u32,
    last_response: Option<SystemTime>,
}

// ── DeviceSession ─────────────────────────────────────────────────────────────

/// Transport session to a single display.
pub struct DeviceSession {
    device_id: DisplayId,
    host: String,
    port: u16,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    link: tokio::sync::Mutex<Option<BoxedStream>>,
    stats: Mutex<SessionStats>,
    span: Span,
}

impl DeviceSession {
    /// Creates a disconnected session.  No I/O happens until the first
    /// [`connect`](Self::connect) or [`send_command`](Self::send_command).
    pub fn new(
        device_id: DisplayId,
        host: impl Into<String>,
        port: u16,
        config: SessionConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let host = host.into();
        let span = info_span!("session", display = device_id, address = %format!("{host}:{port}"));
        Self {
            device_id,
            host,
            port,
            config,
            connector,
            link: tokio::sync::Mutex::new(None),
            stats: Mutex::new(SessionStats {
                state: SessionState::Disconnected,
                error_count: 0,
                last_response: None,
            }),
            span,
        }
    }

    /// Replaces the span all session events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn device_id(&self) -> DisplayId {
        self.device_id
    }

    /// `host:port` of the display.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Returns a copy of the current statistics.
    pub fn snapshot(&self) -> SessionSnapshot {
        let stats = self.stats();
        SessionSnapshot {
            state: stats.state,
            error_count: stats.error_count,
            last_response: stats.last_response,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stats().state == SessionState::Connected
    }

    /// Opens the link if it is not already open.
    ///
    /// # Errors
    ///
    /// [`TransportError::ConnectTimeout`] or [`TransportError::ConnectFailed`];
    /// the session is left `Faulted` in both cases.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;
        if link.is_some() {
            return Ok(());
        }
        self.open(&mut link).instrument(self.span.clone()).await
    }

    /// Sends one command frame, retrying on transport and framing failures.
    ///
    /// Returns `Ok(None)` when `expect_response` is false and the frame was
    /// written, or the decoded response frame otherwise.
    ///
    /// # Errors
    ///
    /// - [`ControlError::Protocol`] if the payload cannot be encoded; nothing
    ///   is sent and no retry happens.
    /// - [`ControlError::RetriesExhausted`] once every attempt has failed.
    pub async fn send_command(
        &self,
        command: CommandCode,
        payload: &[u8],
        expect_response: bool,
    ) -> Result<Option<DecodedFrame>, ControlError> {
        let frame = encode_frame(self.device_id, command, payload)?;
        self.send_frame(command, &frame, expect_response)
            .instrument(self.span.clone())
            .await
    }

    /// Shuts the link down.  A no-op when already disconnected.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        if let Some(mut stream) = link.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(parent: &self.span, error = %e, "shutdown reported an error");
            }
            info!(parent: &self.span, "disconnected");
        }
        self.stats().state = SessionState::Disconnected;
    }

    // ── Private helpers ──────────────────────────────────────────────────────

    fn stats(&self) -> MutexGuard<'_, SessionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn open(&self, link: &mut Option<BoxedStream>) -> Result<(), TransportError> {
        self.stats().state = SessionState::Connecting;
        let timeout = self.config.connect_timeout;

        match time::timeout(timeout, self.connector.connect(&self.host, self.port)).await {
            Ok(Ok(stream)) => {
                *link = Some(stream);
                let mut stats = self.stats();
                stats.state = SessionState::Connected;
                stats.error_count = 0;
                info!("connected");
                Ok(())
            }
            Ok(Err(source)) => {
                self.stats().state = SessionState::Faulted;
                Err(TransportError::ConnectFailed {
                    addr: self.address(),
                    source,
                })
            }
            Err(_) => {
                self.stats().state = SessionState::Faulted;
                Err(TransportError::ConnectTimeout {
                    addr: self.address(),
                    timeout,
                })
            }
        }
    }

    async fn send_frame(
        &self,
        command: CommandCode,
        frame: &[u8],
        expect_response: bool,
    ) -> Result<Option<DecodedFrame>, ControlError> {
        let mut link = self.link.lock().await;
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if link.is_none() {
                if let Err(e) = self.open(&mut link).await {
                    warn!(attempt, error = %e, "connect failed");
                    last_error = e.to_string();
                }
            }

            let outcome = match link.as_mut() {
                Some(stream) => Some(self.exchange(stream, frame, expect_response).await),
                None => None,
            };

            match outcome {
                Some(Ok(response)) => {
                    debug!(attempt, %command, "command succeeded");
                    return Ok(response);
                }
                Some(Err(failure)) => {
                    warn!(attempt, %command, error = %failure, "command attempt failed");
                    if failure.faults_link() {
                        *link = None;
                        let mut stats = self.stats();
                        stats.state = SessionState::Faulted;
                        if failure.is_io() {
                            stats.error_count += 1;
                        }
                    }
                    last_error = failure.to_string();
                }
                None => {}
            }

            if attempt < attempts {
                time::sleep(self.config.retry_delay).await;
            }
        }

        Err(ControlError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    async fn exchange(
        &self,
        stream: &mut BoxedStream,
        frame: &[u8],
        expect_response: bool,
    ) -> Result<Option<DecodedFrame>, AttemptFailure> {
        stream.write_all(frame).await.map_err(TransportError::from)?;
        stream.flush().await.map_err(TransportError::from)?;

        if !expect_response {
            return Ok(None);
        }

        let timeout = self.config.response_timeout;
        let bytes = time::timeout(timeout, read_frame(stream))
            .await
            .map_err(|_| TransportError::ResponseTimeout(timeout))??;
        self.stats().last_response = Some(SystemTime::now());

        Ok(Some(decode_frame(&bytes, self.device_id)?))
    }
}

/// Reads exactly one frame: the 4-byte header, then the declared payload and
/// the checksum byte.
async fn read_frame<S>(stream: &mut S) -> Result<Vec<u8>, AttemptFailure>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).await.map_err(read_error)?;
    if header[0] != FRAME_HEADER {
        return Err(ProtocolError::InvalidHeader(header[0]).into());
    }

    let mut bytes = vec![0u8; frame_len(&header)];
    bytes[..HEADER_SIZE].copy_from_slice(&header);
    stream
        .read_exact(&mut bytes[HEADER_SIZE..])
        .await
        .map_err(read_error)?;
    Ok(bytes)
}

fn read_error(e: io::Error) -> TransportError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TransportError::Disconnected
    } else {
        TransportError::Io(e)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
