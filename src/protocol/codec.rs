//! MessagePack codec for controller frames.
//!
//! Decoding runs in two stages. The frame is first read as a generic map so
//! the `type` tag can be inspected; the map is then decoded into the typed
//! payload for that tag, so a garbage blob and a known tag with a bad body
//! surface as different [`DecodeError`] variants. Unknown tags are not an
//! error.
//!
//! Encoding uses named map keys (`to_vec_named`); the controller looks
//! fields up by name.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Command, EffectDescriptor, GlobalStats, Message, Network, StripConfiguration};

/// Why an inbound frame could not be turned into a [`Message`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a MessagePack map.
    #[error("frame is not a MessagePack map: {0}")]
    Malformed(#[source] rmp_serde::decode::Error),
    /// The map has no string `type` field.
    #[error("frame has no string 'type' field")]
    MissingType,
    /// The tag is known but the body does not match it.
    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        /// The frame's `type` value.
        kind: String,
        /// Underlying field error.
        #[source]
        source: serde_json::Error,
    },
}

/// Why a [`Command`] could not be serialized.
#[derive(Debug, Error)]
#[error("failed to encode '{kind}' command: {source}")]
pub struct EncodeError {
    /// The command's wire `type`.
    pub kind: &'static str,
    /// Underlying serializer error.
    #[source]
    pub source: rmp_serde::encode::Error,
}

#[derive(Deserialize)]
struct ScanBody {
    networks: Vec<Network>,
}

#[derive(Deserialize)]
struct EffectConfigBody {
    effects: Vec<EffectDescriptor>,
}

/// Encode a command as one binary frame.
pub fn encode(command: &Command) -> Result<Vec<u8>, EncodeError> {
    rmp_serde::to_vec_named(command).map_err(|source| EncodeError {
        kind: command.kind(),
        source,
    })
}

/// Decode one inbound binary frame.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let (kind, mut fields) = read_tagged_map(bytes)?;

    let message = match kind.as_str() {
        "scan" => {
            let body: ScanBody = payload(&kind, fields)?;
            Message::Scan {
                networks: body.networks,
            }
        }
        "effectConfig" => {
            let body: EffectConfigBody = payload(&kind, fields)?;
            Message::EffectConfig {
                effects: body.effects,
            }
        }
        "config" => {
            // Strip ids share the top level with the tag
            fields.remove("type");
            Message::Config(payload::<StripConfiguration>(&kind, fields)?)
        }
        "globalStats" => Message::GlobalStats(payload::<GlobalStats>(&kind, fields)?),
        _ => Message::Unrecognized { kind },
    };

    Ok(message)
}

/// Decode an outbound command as the controller would receive it.
pub fn decode_command(bytes: &[u8]) -> Result<Command, DecodeError> {
    let (kind, fields) = read_tagged_map(bytes)?;
    payload(&kind, fields)
}

fn read_tagged_map(bytes: &[u8]) -> Result<(String, Map<String, Value>), DecodeError> {
    let fields: Map<String, Value> = rmp_serde::from_slice(bytes).map_err(DecodeError::Malformed)?;
    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();
    Ok((kind, fields))
}

fn payload<T: DeserializeOwned>(kind: &str, fields: Map<String, Value>) -> Result<T, DecodeError> {
    serde_json::from_value(Value::Object(fields)).map_err(|source| DecodeError::InvalidPayload {
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ConfigValue, GlobalPatch, ParameterSpec};
    use serde_json::json;

    fn frame(value: &Value) -> Vec<u8> {
        rmp_serde::to_vec_named(value).unwrap()
    }

    #[test]
    fn test_decode_scan() {
        let bytes = frame(&json!({
            "type": "scan",
            "networks": [
                {"ssid": "home", "rssi": -40, "enc": true},
                {"ssid": "cafe", "rssi": -82, "enc": false},
            ]
        }));
        let Message::Scan { networks } = decode(&bytes).unwrap() else {
            panic!("expected scan");
        };
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].ssid, "home");
        assert!(!networks[1].encrypted);
    }

    #[test]
    fn test_decode_effect_config_keeps_raw_bounds() {
        let bytes = frame(&json!({
            "type": "effectConfig",
            "effects": [{
                "name": "Rainbow",
                "config": [{
                    "type": "number", "title": "Speed", "description": "Animation Speed",
                    "min": 1, "max": 50, "stepBy": 0.123456, "defaultValue": 1, "required": true
                }]
            }]
        }));
        let Message::EffectConfig { effects } = decode(&bytes).unwrap() else {
            panic!("expected effectConfig");
        };
        let ParameterSpec::Number(spec) = &effects[0].parameters[0] else {
            panic!("expected number spec");
        };
        // Normalization belongs to the router
        assert_eq!(spec.step_by, 0.123456);
        assert_eq!(spec.min, 1.0);
    }

    #[test]
    fn test_decode_config_strips_tag() {
        let bytes = frame(&json!({
            "type": "config",
            "default": {"Solid": {"Color": {"r": 255, "g": 0, "b": 0}}}
        }));
        let Message::Config(config) = decode(&bytes).unwrap() else {
            panic!("expected config");
        };
        assert_eq!(config.len(), 1);
        assert!(config.contains_key("default"));
        assert!(!config.contains_key("type"));
    }

    #[test]
    fn test_decode_global_stats() {
        let bytes = frame(&json!({
            "type": "globalStats", "brightness": 30, "on": false, "followSun": true
        }));
        assert_eq!(
            decode(&bytes).unwrap(),
            Message::GlobalStats(GlobalStats {
                brightness: 30,
                on: false,
                follow_sun: true,
            })
        );
    }

    #[test]
    fn test_decode_unknown_type_is_unrecognized() {
        let bytes = frame(&json!({"type": "otaProgress", "percent": 12}));
        assert_eq!(
            decode(&bytes).unwrap(),
            Message::Unrecognized {
                kind: "otaProgress".to_string()
            }
        );
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let err = decode(&[0xc1, 0x00, 0xff]).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_non_map_is_malformed() {
        let bytes = frame(&json!([1, 2, 3]));
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_empty_frame_is_malformed() {
        assert!(matches!(decode(&[]), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_missing_type() {
        let bytes = frame(&json!({"brightness": 3}));
        assert!(matches!(decode(&bytes), Err(DecodeError::MissingType)));

        let bytes = frame(&json!({"type": 7}));
        assert!(matches!(decode(&bytes), Err(DecodeError::MissingType)));
    }

    #[test]
    fn test_decode_bad_body_is_invalid_payload() {
        let bytes = frame(&json!({"type": "globalStats", "brightness": "high"}));
        match decode(&bytes) {
            Err(DecodeError::InvalidPayload { kind, .. }) => assert_eq!(kind, "globalStats"),
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_brightness_out_of_byte_range() {
        let bytes = frame(&json!({
            "type": "globalStats", "brightness": 300, "on": true, "followSun": false
        }));
        assert!(matches!(decode(&bytes), Err(DecodeError::InvalidPayload { .. })));
    }

    #[test]
    fn test_encode_uses_named_keys() {
        let bytes = encode(&Command::UpdateGlobal(GlobalPatch {
            on: Some(true),
            ..GlobalPatch::default()
        }))
        .unwrap();
        let value: Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"type": "updateGlobal", "on": true}));
    }

    #[test]
    fn test_update_effect_round_trip_preserves_types() {
        let mut config = crate::protocol::EffectSettings::new();
        config.insert("Speed".to_string(), ConfigValue::Integer(12));
        config.insert("Fade".to_string(), ConfigValue::Float(0.25));
        config.insert("Reverse".to_string(), ConfigValue::Bool(true));
        config.insert("Mode".to_string(), ConfigValue::Text("Wave".to_string()));
        config.insert(
            "Color".to_string(),
            ConfigValue::Color(crate::protocol::ColorValue { r: 1, g: 2, b: 3 }),
        );
        let command = Command::UpdateEffect {
            strip: "default".to_string(),
            effect: "Rainbow".to_string(),
            config,
        };

        let decoded = decode_command(&encode(&command).unwrap()).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn test_config_keeps_unsigned_above_i64_max() {
        let bytes = frame(&json!({
            "type": "config",
            "default": {"Counter": {"Seed": u64::MAX, "Offset": -3}}
        }));
        let Message::Config(config) = decode(&bytes).unwrap() else {
            panic!("expected config");
        };
        let settings = config["default"]["Counter"].clone();
        assert_eq!(settings["Seed"], ConfigValue::UInteger(u64::MAX));
        assert_eq!(settings["Offset"], ConfigValue::Integer(-3));

        let command = Command::UpdateEffect {
            strip: "default".to_string(),
            effect: "Counter".to_string(),
            config: settings,
        };
        let raw: Value = rmp_serde::from_slice(&encode(&command).unwrap()).unwrap();
        assert_eq!(raw["config"]["Seed"], json!(u64::MAX));
    }

    #[test]
    fn test_decode_command_remove_effect() {
        let bytes = frame(&json!({"type": "removeEffect", "strip": "default", "effect": "Solid"}));
        assert_eq!(
            decode_command(&bytes).unwrap(),
            Command::RemoveEffect {
                strip: "default".to_string(),
                effect: "Solid".to_string(),
            }
        );
    }
}
