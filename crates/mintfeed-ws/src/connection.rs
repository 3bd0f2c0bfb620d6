//! WebSocket connection manager.
//!
//! Owns the single upstream connection: validates the endpoint, drives the
//! connect / read / reconnect loop on one worker task, publishes every state
//! transition and hands data frames to a `FrameSink`.
//!
//! State machine:
//! - `start` → `Connecting`
//! - handshake done → `Open` (backoff reset)
//! - connect failure, read error, heartbeat timeout → `Error`, then reconnect
//! - close frame from the peer → `Closed`, then reconnect
//! - `stop` → `Closed`, no reconnect

use crate::backoff::{Backoff, BackoffConfig};
use crate::endpoint::parse_endpoint;
use crate::error::{WsError, WsResult};
use crate::heartbeat::Heartbeat;
use crate::sink::FrameSink;
use crate::status::StatusPublisher;
use futures_util::{SinkExt, StreamExt};
use mintfeed_core::ConnectionState;
use mintfeed_telemetry::Metrics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Delay before the first reconnect attempt.
    pub reconnect_initial_delay_ms: u64,
    /// Backoff growth factor.
    pub reconnect_multiplier: f64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
    /// Fraction of each delay randomized away (0.0 - 1.0).
    pub reconnect_jitter: f64,
    /// Maximum consecutive failed attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Idle time before a ping is sent.
    pub heartbeat_interval_ms: u64,
    /// Time allowed for traffic after a ping.
    pub heartbeat_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let backoff = BackoffConfig::default();
        Self {
            reconnect_initial_delay_ms: backoff.initial_delay_ms,
            reconnect_multiplier: backoff.multiplier,
            reconnect_max_delay_ms: backoff.max_delay_ms,
            reconnect_jitter: backoff.jitter,
            max_reconnect_attempts: 0, // Infinite
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 10_000,
        }
    }
}

impl ConnectionConfig {
    /// Backoff parameters for the reconnect loop.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay_ms: self.reconnect_initial_delay_ms,
            multiplier: self.reconnect_multiplier,
            max_delay_ms: self.reconnect_max_delay_ms,
            jitter: self.reconnect_jitter,
        }
    }
}

/// Handle to the running worker.
struct Session {
    url: Url,
    shutdown_token: CancellationToken,
    task: JoinHandle<()>,
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    status: StatusPublisher,
    sink: Arc<dyn FrameSink>,
    session: Mutex<Option<Session>>,
    /// Consecutive failed attempts since the last successful open.
    reconnect_count: Arc<AtomicU32>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    ///
    /// Nothing connects until `start` is called.
    pub fn new(
        config: ConnectionConfig,
        status: StatusPublisher,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            config,
            status,
            sink,
            session: Mutex::new(None),
            reconnect_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.status.current()
    }

    /// Publisher observed by consumers.
    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    /// Endpoint of the active session, if any.
    pub fn endpoint(&self) -> Option<Url> {
        self.session.lock().as_ref().map(|s| s.url.clone())
    }

    /// Check whether a worker is running.
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// Start connecting to `endpoint`.
    ///
    /// A malformed endpoint fails immediately with `WsError::InvalidEndpoint`
    /// and changes no state. Must be called within a Tokio runtime.
    pub fn start(&self, endpoint: &str) -> WsResult<()> {
        let url = parse_endpoint(endpoint)?;

        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| !s.task.is_finished()) {
            return Err(WsError::AlreadyStarted);
        }

        info!(url = %url, "Starting connection manager");
        self.reconnect_count.store(0, Ordering::Relaxed);
        self.status.transition(ConnectionState::Connecting);

        let shutdown_token = CancellationToken::new();
        let worker = Worker {
            url: url.clone(),
            status: self.status.clone(),
            sink: self.sink.clone(),
            shutdown_token: shutdown_token.clone(),
            backoff: Backoff::new(self.config.backoff()),
            heartbeat: Heartbeat::new(
                self.config.heartbeat_interval_ms,
                self.config.heartbeat_timeout_ms,
            ),
            max_reconnect_attempts: self.config.max_reconnect_attempts,
            reconnect_count: self.reconnect_count.clone(),
        };

        *session = Some(Session {
            url,
            shutdown_token,
            task: tokio::spawn(worker.run()),
        });
        Ok(())
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Cancels any pending backoff timer, waits for the worker to release
    /// the socket and leaves the state `Closed`. Idempotent.
    pub async fn stop(&self) {
        let session = self.session.lock().take();
        let Some(session) = session else {
            debug!("Stop requested with no active session");
            return;
        };

        info!(url = %session.url, "ConnectionManager stop requested");
        session.shutdown_token.cancel();
        if let Err(e) = session.task.await {
            error!(error = %e, "Connection worker ended abnormally");
        }
        self.status.transition(ConnectionState::Closed);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.shutdown_token.cancel();
        }
    }
}

/// State owned by the worker task.
struct Worker {
    url: Url,
    status: StatusPublisher,
    sink: Arc<dyn FrameSink>,
    shutdown_token: CancellationToken,
    backoff: Backoff,
    heartbeat: Heartbeat,
    max_reconnect_attempts: u32,
    reconnect_count: Arc<AtomicU32>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            self.status.transition(ConnectionState::Connecting);

            match self.connect_and_read().await {
                Ok(()) => break,
                Err(e) => {
                    match &e {
                        WsError::ConnectionClosed { code, reason } => {
                            warn!(code, %reason, "WebSocket closed by server")
                        }
                        other => error!(error = %other, "WebSocket connection error"),
                    }
                    self.status.transition(state_after(&e));
                    Metrics::ws_reconnect(e.reason_label());
                }
            }

            if self.shutdown_token.is_cancelled() {
                break;
            }

            let attempt = self.reconnect_count.fetch_add(1, Ordering::Relaxed) + 1;
            if self.max_reconnect_attempts > 0 && attempt >= self.max_reconnect_attempts {
                error!(attempt, "Max reconnection attempts reached, giving up");
                self.status.transition(ConnectionState::Error);
                return;
            }

            let delay = self.backoff.next_delay();
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff");
                    break;
                }
            }
        }

        self.status.transition(ConnectionState::Closed);
        info!(url = %self.url, "Connection worker stopped");
    }

    /// One connection lifetime. `Ok(())` only on shutdown.
    async fn connect_and_read(&mut self) -> WsResult<()> {
        info!(url = %self.url, "Connecting to WebSocket");

        let token = self.shutdown_token.clone();
        let connect = connect_async_tls_with_config(self.url.as_str(), None, true, None);
        let (ws_stream, _response) = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(()),
            result = connect => result?,
        };
        let (mut write, mut read) = ws_stream.split();

        self.backoff.reset();
        self.heartbeat.reset();
        self.reconnect_count.store(0, Ordering::Relaxed);
        self.status.transition(ConnectionState::Open);

        loop {
            let check = tokio::time::sleep(self.heartbeat.check_interval());

            tokio::select! {
                biased;

                () = token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.heartbeat.record_inbound();
                            self.sink.on_frame(text.as_bytes());
                        }
                        Some(Ok(Message::Binary(data))) => {
                            self.heartbeat.record_inbound();
                            self.sink.on_frame(&data);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            self.heartbeat.record_inbound();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1005, "No status".to_string()));
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(WsError::StreamEnded),
                    }
                }

                () = check => {
                    if self.heartbeat.is_timed_out() {
                        return Err(WsError::HeartbeatTimeout);
                    }
                    if self.heartbeat.should_send_ping() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                    }
                }
            }
        }
    }
}

/// State reported after a connection lifetime ends with `err`.
///
/// Only a close frame from the peer is `Closed`; every other failure is `Error`.
fn state_after(err: &WsError) -> ConnectionState {
    match err {
        WsError::ConnectionClosed { .. } => ConnectionState::Closed,
        _ => ConnectionState::Error,
    }
}
