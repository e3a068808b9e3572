//! Shared device state.
//!
//! [`SharedState`] is the single source of truth for everything decoded from
//! the controller plus the connectivity flag. One instance is created per
//! session and handed out as `Arc<SharedState>`; the connection manager and
//! router write to it, any number of consumers read it.
//!
//! # Observing
//!
//! Readers either take a [`SharedState::snapshot`] or hold a
//! `watch::Receiver` from [`SharedState::subscribe`] and await `changed()`.
//!
//! # Sending
//!
//! [`SharedState::send`] never touches the socket directly. While a
//! connection is up the manager attaches an outbound queue; `send` encodes
//! the command and pushes the frame onto that queue. With no queue attached
//! it returns `false`. [`SharedState::deliver`] additionally waits until the
//! manager has written the frame to the socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::protocol::{
    self, Command, EffectDescriptor, EffectSettings, GlobalPatch, GlobalStats, Network,
    StripConfiguration,
};

/// Connection phase as seen by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// No socket; a reconnect may be pending.
    #[default]
    Disconnected,
    /// Socket is being opened.
    Connecting,
    /// Socket is open.
    Connected,
}

/// Latest known controller state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Connection phase.
    pub link: LinkStatus,
    /// Last WiFi scan result.
    pub networks: Vec<Network>,
    /// Effects the controller offers, once announced.
    pub effect_catalog: Option<Vec<EffectDescriptor>>,
    /// Effect settings per strip, once announced.
    pub strip_config: Option<StripConfiguration>,
    /// Brightness and power, once announced.
    pub global_stats: Option<GlobalStats>,
}

impl DeviceState {
    /// `true` only while the socket is open.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.link == LinkStatus::Connected
    }

    /// Find an effect in the catalog by name.
    #[must_use]
    pub fn effect(&self, name: &str) -> Option<&EffectDescriptor> {
        self.effect_catalog
            .as_ref()?
            .iter()
            .find(|effect| effect.name == name)
    }
}

/// One encoded command waiting to be written.
#[derive(Debug)]
pub(crate) struct OutboundFrame {
    pub(crate) bytes: Vec<u8>,
    /// Fired once the frame is on the socket. Dropped unfired if it never gets there.
    pub(crate) written: Option<oneshot::Sender<()>>,
}

/// Sender half of the live connection's outbound queue.
pub(crate) type OutboundTx = mpsc::UnboundedSender<OutboundFrame>;

/// Observable device state plus the `send` capability.
pub struct SharedState {
    state: watch::Sender<DeviceState>,
    outbound: Mutex<Option<OutboundTx>>,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("link", &self.state.borrow().link)
            .field("receivers", &self.state.receiver_count())
            .finish_non_exhaustive()
    }
}

impl SharedState {
    /// Create the session's state store with every field empty.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: watch::Sender::new(DeviceState::default()),
            outbound: Mutex::new(None),
        })
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state.subscribe()
    }

    /// Whether a socket is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected()
    }

    /// Encode `command` and queue it on the open connection.
    ///
    /// Returns `false` without side effects when disconnected, when the
    /// command cannot be encoded, or when the connection has already gone.
    pub fn send(&self, command: &Command) -> bool {
        self.enqueue(command, None)
    }

    /// Like [`send`](Self::send), but resolves only once the frame has been
    /// written to the socket.
    ///
    /// Returns `false` if the command was never queued, or if the
    /// connection dropped (or the write failed) before it was written.
    pub async fn deliver(&self, command: &Command) -> bool {
        let (tx, rx) = oneshot::channel();
        if !self.enqueue(command, Some(tx)) {
            return false;
        }
        rx.await.is_ok()
    }

    /// Wait until `ready` holds for the current state.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        ready: impl FnMut(&DeviceState) -> bool,
    ) -> bool {
        let mut rx = self.subscribe();
        let ready = matches!(
            tokio::time::timeout(timeout, rx.wait_for(ready)).await,
            Ok(Ok(_))
        );
        ready
    }

    fn enqueue(&self, command: &Command, written: Option<oneshot::Sender<()>>) -> bool {
        let guard = self.outbound.lock().expect("outbound mutex poisoned");
        let Some(tx) = guard.as_ref() else {
            log::debug!("[Store] Dropping '{}': not connected", command.kind());
            return false;
        };

        let bytes = match protocol::encode(command) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[Store] {}", e);
                return false;
            }
        };

        match tx.send(OutboundFrame { bytes, written }) {
            Ok(()) => {
                log::trace!("[Store] Queued '{}'", command.kind());
                true
            }
            Err(_) => {
                log::debug!("[Store] Dropping '{}': connection closed", command.kind());
                false
            }
        }
    }

    /// Send an `updateEffect` command.
    pub fn update_effect(&self, strip: &str, effect: &str, config: EffectSettings) -> bool {
        self.send(&Command::UpdateEffect {
            strip: strip.to_string(),
            effect: effect.to_string(),
            config,
        })
    }

    /// Send a `removeEffect` command.
    pub fn remove_effect(&self, strip: &str, effect: &str) -> bool {
        self.send(&Command::RemoveEffect {
            strip: strip.to_string(),
            effect: effect.to_string(),
        })
    }

    /// Send an `updateGlobal` patch.
    pub fn update_global(&self, patch: GlobalPatch) -> bool {
        self.send(&Command::UpdateGlobal(patch))
    }

    // =========================================================================
    // Writer side (router and connection manager)
    // =========================================================================

    /// Apply a change and notify subscribers.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut DeviceState)) {
        self.state.send_modify(f);
    }

    /// Record the connection phase.
    pub(crate) fn set_link(&self, link: LinkStatus) {
        self.state.send_if_modified(|state| {
            if state.link == link {
                return false;
            }
            state.link = link;
            true
        });
    }

    /// Mark the socket open and route `send` to `tx`.
    pub(crate) fn attach(&self, tx: OutboundTx) {
        *self.outbound.lock().expect("outbound mutex poisoned") = Some(tx);
        self.set_link(LinkStatus::Connected);
    }

    /// Mark the socket closed; `send` returns `false` from here on.
    pub(crate) fn detach(&self) {
        self.outbound.lock().expect("outbound mutex poisoned").take();
        self.set_link(LinkStatus::Disconnected);
    }
}
