//! Lighting Client - control plane for an ESP32 lighting controller.
//!
//! This crate keeps a persistent WebSocket connection to the controller,
//! decodes its MessagePack state broadcasts into a shared, observable store,
//! and encodes commands back to the device.
//!
//! # Architecture
//!
//! ```text
//!   ConnectionManager ──frame──► codec::decode ──Message──► router::route
//!          ▲                                                   │
//!          │ outbound queue                                    ▼
//!          └──────────── SharedState::send ◄──── consumers ── SharedState
//! ```
//!
//! # Modules
//!
//! - [`protocol`] - Wire types and the MessagePack codec
//! - [`router`] - Applies decoded messages to the store
//! - [`state`] - Observable device state and the `send` capability
//! - [`connection`] - Connect / reconnect lifecycle
//! - [`ws`] - tokio-tungstenite transport
//! - [`config`] - Configuration loading/saving

pub mod config;
pub mod connection;
pub mod constants;
pub mod copy;
pub mod protocol;
pub mod router;
pub mod state;
pub mod ws;

// Re-export commonly used types
pub use config::Config;
pub use connection::{ConnectionManager, Connector};
pub use protocol::{Command, Message};
pub use state::{DeviceState, LinkStatus, SharedState};
