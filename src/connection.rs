//! Connection lifecycle for the controller socket.
//!
//! [`ConnectionManager`] owns the socket. It connects, feeds every binary
//! frame through [`protocol::decode`] and [`router::route`], drains the
//! outbound queue that [`SharedState::send`] fills, and reconnects after a
//! fixed delay whenever the socket goes away.
//!
//! # State machine
//!
//! ```text
//!   Disconnected ──start / delay elapsed──► Connecting
//!   Connecting   ──open──────────────────► Connected    (send handshake)
//!   Connecting   ──connect failed────────► Disconnected (schedule retry)
//!   Connected    ──binary frame──────────► Connected    (decode + route)
//!   Connected    ──close / error─────────► Disconnected (schedule retry)
//! ```
//!
//! There is no terminal state and no backoff: the manager retries every
//! [`Config::reconnect_delay`] for as long as its task runs.
//!
//! # Ordering
//!
//! Frames are handled inline in the select loop, so frame N is decoded and
//! routed before frame N+1 is read.
//!
//! Rust guideline compliant 2026-02

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::protocol;
use crate::router;
use crate::state::{LinkStatus, OutboundFrame, SharedState};
use crate::ws::WsMessage;

/// Opens transport connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `url` and return the (writer, reader) halves.
    async fn connect(&self, url: &str) -> Result<(Box<dyn FrameWriter>, Box<dyn FrameReader>)>;
}

/// Write half of an open connection.
#[async_trait]
pub trait FrameWriter: Send {
    /// Send a binary frame.
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<()>;
    /// Send a UTF-8 text frame.
    async fn send_text(&mut self, text: &str) -> Result<()>;
    /// Answer a ping.
    async fn send_pong(&mut self, data: Vec<u8>) -> Result<()>;
    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Read half of an open connection.
#[async_trait]
pub trait FrameReader: Send {
    /// Next frame, or `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<WsMessage>>;
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Disconnect {
    /// The connection attempt itself failed.
    ConnectFailed,
    /// The peer sent a close frame.
    Closed { code: u16, reason: String },
    /// The stream ended without a close frame.
    Ended,
    /// Reading from the socket failed; the socket was closed locally.
    ReadFailed,
    /// Writing to the socket failed; the socket was closed locally.
    WriteFailed,
}

impl std::fmt::Display for Disconnect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Closed { code, reason } if reason.is_empty() => write!(f, "closed ({code})"),
            Self::Closed { code, reason } => write!(f, "closed ({code}: {reason})"),
            Self::Ended => write!(f, "stream ended"),
            Self::ReadFailed => write!(f, "read error"),
            Self::WriteFailed => write!(f, "write error"),
        }
    }
}

/// Keeps the controller connection alive and wired to a [`SharedState`].
pub struct ConnectionManager<C> {
    connector: C,
    endpoint: String,
    handshake: String,
    reconnect_delay: Duration,
    state: Arc<SharedState>,
}

impl<C> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish_non_exhaustive()
    }
}

impl<C: Connector + 'static> ConnectionManager<C> {
    /// Create a manager for the endpoint in `config`.
    #[must_use]
    pub fn new(connector: C, config: &Config, state: Arc<SharedState>) -> Self {
        Self {
            connector,
            endpoint: config.ws_url(),
            handshake: config.handshake.clone(),
            reconnect_delay: config.reconnect_delay(),
            state,
        }
    }

    /// Run the lifecycle on a background task.
    ///
    /// The loop never exits on its own; abort the handle to stop it.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Connect, serve, and reconnect forever.
    pub async fn run(self) {
        loop {
            let reason = self.connect_once().await;
            log::info!(
                "[Connection] Socket is closed ({}). Reconnect will be attempted in {:?}",
                reason,
                self.reconnect_delay
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One full connection: open, serve until it drops, mark disconnected.
    async fn connect_once(&self) -> Disconnect {
        self.state.set_link(LinkStatus::Connecting);
        log::info!("[Connection] Connecting to {}", self.endpoint);

        let (mut writer, mut reader) = match self.connector.connect(&self.endpoint).await {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("[Connection] Connection failed: {:#}", e);
                self.state.detach();
                return Disconnect::ConnectFailed;
            }
        };

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        self.state.attach(outbound_tx);
        log::info!("[Connection] Connected");

        let reason = if self.handshake.is_empty() {
            self.serve(writer.as_mut(), reader.as_mut(), &mut outbound_rx)
                .await
        } else {
            match writer.send_text(&self.handshake).await {
                Ok(()) => {
                    self.serve(writer.as_mut(), reader.as_mut(), &mut outbound_rx)
                        .await
                }
                Err(e) => {
                    log::warn!("[Connection] Failed to send handshake: {:#}", e);
                    let _ = writer.close().await;
                    Disconnect::WriteFailed
                }
            }
        };

        // Frames still queued for this socket are dropped with the receiver
        self.state.detach();
        reason
    }

    /// Message loop for one open socket.
    async fn serve(
        &self,
        writer: &mut dyn FrameWriter,
        reader: &mut dyn FrameReader,
        outbound_rx: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    ) -> Disconnect {
        loop {
            tokio::select! {
                biased;

                msg = reader.recv() => {
                    match msg {
                        Some(Ok(WsMessage::Binary(data))) => self.handle_frame(&data),
                        Some(Ok(WsMessage::Text(text))) => {
                            log::debug!(
                                "[Connection] Ignoring text frame: {}",
                                text.chars().take(100).collect::<String>()
                            );
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            if let Err(e) = writer.send_pong(data).await {
                                log::warn!("[Connection] Failed to send pong: {:#}", e);
                                let _ = writer.close().await;
                                return Disconnect::WriteFailed;
                            }
                        }
                        Some(Ok(WsMessage::Pong(_))) => {}
                        Some(Ok(WsMessage::Close { code, reason })) => {
                            // Flushes the close reply
                            if let Err(e) = writer.close().await {
                                log::debug!("[Connection] Close handshake incomplete: {:#}", e);
                            }
                            return Disconnect::Closed { code, reason };
                        }
                        Some(Err(e)) => {
                            log::error!("[Connection] Socket encountered error: {:#}. Closing socket", e);
                            let _ = writer.close().await;
                            return Disconnect::ReadFailed;
                        }
                        None => return Disconnect::Ended,
                    }
                }

                Some(frame) = outbound_rx.recv() => {
                    if let Err(e) = writer.send_binary(frame.bytes).await {
                        log::warn!("[Connection] Failed to send frame: {:#}", e);
                        let _ = writer.close().await;
                        return Disconnect::WriteFailed;
                    }
                    if let Some(written) = frame.written {
                        let _ = written.send(());
                    }
                }
            }
        }
    }

    /// Decode one binary frame and route it. Bad frames are dropped.
    fn handle_frame(&self, data: &[u8]) {
        match protocol::decode(data) {
            Ok(message) => {
                log::trace!("[Connection] Received '{}' ({} bytes)", message.kind(), data.len());
                router::route(message, &self.state);
            }
            Err(e) => {
                log::warn!("[Connection] Dropping frame ({} bytes): {}", data.len(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NeverConnects;

    #[async_trait]
    impl Connector for NeverConnects {
        async fn connect(
            &self,
            _url: &str,
        ) -> Result<(Box<dyn FrameWriter>, Box<dyn FrameReader>)> {
            anyhow::bail!("unreachable")
        }
    }

    fn manager() -> ConnectionManager<NeverConnects> {
        ConnectionManager::new(NeverConnects, &Config::default(), SharedState::new())
    }

    #[test]
    fn test_disconnect_display() {
        assert_eq!(
            Disconnect::Closed {
                code: 1000,
                reason: String::new()
            }
            .to_string(),
            "closed (1000)"
        );
        assert_eq!(
            Disconnect::Closed {
                code: 1001,
                reason: "going away".to_string()
            }
            .to_string(),
            "closed (1001: going away)"
        );
        assert_eq!(Disconnect::ReadFailed.to_string(), "read error");
    }

    #[test]
    fn test_manager_uses_config() {
        let mut config = Config::default();
        config.endpoint = "http://lights.local/ws".to_string();
        config.reconnect_delay_ms = 250;
        let manager = ConnectionManager::new(NeverConnects, &config, SharedState::new());
        assert_eq!(manager.endpoint, "ws://lights.local/ws");
        assert_eq!(manager.reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_handle_frame_routes_valid_frame() {
        let manager = manager();
        let bytes = rmp_serde::to_vec_named(&json!({
            "type": "globalStats", "brightness": 128, "on": true, "followSun": false
        }))
        .unwrap();
        manager.handle_frame(&bytes);
        assert_eq!(manager.state.snapshot().global_stats.unwrap().brightness, 128);
    }

    #[test]
    fn test_handle_frame_drops_garbage() {
        let manager = manager();
        let mut rx = manager.state.subscribe();
        manager.handle_frame(b"\xc1not msgpack");
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_connect_failure_reports_and_stays_disconnected() {
        let manager = manager();
        let reason = manager.connect_once().await;
        assert_eq!(reason, Disconnect::ConnectFailed);
        assert_eq!(manager.state.snapshot().link, LinkStatus::Disconnected);
    }
}
