//! Wire protocol spoken with the lighting controller.
//!
//! Every frame is a single MessagePack map discriminated by its `type`
//! field. The controller broadcasts four kinds of state; the client sends
//! three kinds of command.
//!
//! # Inbound
//!
//! ```text
//! scan          { networks: [{ ssid, rssi, enc }] }
//! effectConfig  { effects: [{ name, config: [ParameterSpec] }] }
//! config        { <strip>: { <effect>: { <param>: value } } }
//! globalStats   { brightness, on, followSun }
//! ```
//!
//! # Outbound
//!
//! ```text
//! updateEffect  { strip, effect, config: { <param>: value } }
//! removeEffect  { strip, effect }
//! updateGlobal  { brightness?, on?, followSun? }
//! ```
//!
//! Rust guideline compliant 2026-02

pub mod codec;
pub mod effect;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use codec::{decode, decode_command, encode, DecodeError, EncodeError};
pub use effect::{normalize_bound, EffectDescriptor, ParameterSpec, ValidationError};

/// A WiFi network seen by the controller's last scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Network name.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// Whether the network requires authentication.
    #[serde(rename = "enc")]
    pub encrypted: bool,
}

/// An RGB color as carried in effect configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorValue {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// A single effect parameter value.
///
/// Integers and floats are kept apart so a value read from the device is
/// written back with the same MessagePack type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Boolean flag.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Whole number above `i64::MAX`.
    UInteger(u64),
    /// Floating point number.
    Float(f64),
    /// String, select option name, or JSON text.
    Text(String),
    /// RGB color.
    Color(ColorValue),
}

impl ConfigValue {
    /// Numeric view of the value, if it is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::UInteger(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }
}

/// Parameter name -> value for one effect on one strip.
pub type EffectSettings = BTreeMap<String, ConfigValue>;

/// Strip id -> effect name -> parameter name -> value.
///
/// Keys are opaque identifiers chosen by the controller.
pub type StripConfiguration = BTreeMap<String, BTreeMap<String, EffectSettings>>;

/// Controller-wide switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    /// LED brightness (0-255).
    pub brightness: u8,
    /// Whether the strips are lit.
    pub on: bool,
    /// Whether the controller switches on at sunset and off at sunrise.
    pub follow_sun: bool,
}

/// Partial update of [`GlobalStats`].
///
/// Only the fields that are `Some` are put on the wire; the controller keeps
/// its current value for the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPatch {
    /// New brightness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// New on/off state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// New follow-sun flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_sun: Option<bool>,
}

impl GlobalPatch {
    /// Returns `true` if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.on.is_none() && self.follow_sun.is_none()
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Result of a WiFi scan.
    Scan {
        /// Networks in the order the controller reported them.
        networks: Vec<Network>,
    },
    /// Catalog of effects the controller can run.
    EffectConfig {
        /// Effect descriptors.
        effects: Vec<EffectDescriptor>,
    },
    /// Effect settings currently applied per strip.
    Config(StripConfiguration),
    /// Brightness and power state.
    GlobalStats(GlobalStats),
    /// A well-formed frame with a `type` this client does not know.
    Unrecognized {
        /// The frame's `type` value.
        kind: String,
    },
}

impl Message {
    /// The wire `type` of this message.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Scan { .. } => "scan",
            Self::EffectConfig { .. } => "effectConfig",
            Self::Config(_) => "config",
            Self::GlobalStats(_) => "globalStats",
            Self::Unrecognized { kind } => kind,
        }
    }
}

/// A command sent to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Create or replace an effect's settings on a strip.
    UpdateEffect {
        /// Strip id.
        strip: String,
        /// Effect name.
        effect: String,
        /// Parameter values.
        config: EffectSettings,
    },
    /// Stop running an effect on a strip.
    RemoveEffect {
        /// Strip id.
        strip: String,
        /// Effect name.
        effect: String,
    },
    /// Patch the controller-wide switches.
    UpdateGlobal(GlobalPatch),
}

impl Command {
    /// The wire `type` of this command.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateEffect { .. } => "updateEffect",
            Self::RemoveEffect { .. } => "removeEffect",
            Self::UpdateGlobal(_) => "updateGlobal",
        }
    }
}
