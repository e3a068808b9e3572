//! Application-wide constants for lighting-client.
//!
//! Centralizes the endpoint, timing, and protocol constants so they are
//! discoverable in one place.

use std::time::Duration;

// ============================================================================
// Connection
// ============================================================================

/// Default controller WebSocket endpoint.
///
/// The controller serves its socket at `/ws` on port 80.
pub const DEFAULT_ENDPOINT: &str = "ws://10.0.1.224/ws";

/// Fixed delay between a close and the next connection attempt.
///
/// There is no backoff: every retry waits exactly this long.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Text frame sent immediately after the socket opens.
///
/// The controller does not inspect it; it only needs a first frame.
pub const DEFAULT_HANDSHAKE: &str = "{}";

// ============================================================================
// Protocol
// ============================================================================

/// Decimal places kept for `number` parameter bounds (`min`, `max`, `stepBy`).
pub const PARAMETER_PRECISION: usize = 3;

/// Largest channel value for a color component.
pub const COLOR_CHANNEL_MAX: u8 = u8::MAX;
