//! Applies decoded controller messages to the shared state.
//!
//! Every recognized message replaces its field wholesale; nothing is merged.
//! The router performs no I/O and cannot fail.

use crate::protocol::Message;
use crate::state::SharedState;

/// Apply one decoded message to `state`.
pub fn route(message: Message, state: &SharedState) {
    match message {
        Message::Scan { networks } => {
            log::debug!("[Router] Scan: {} networks", networks.len());
            state.modify(|s| s.networks = networks);
        }
        Message::EffectConfig { mut effects } => {
            for effect in &mut effects {
                effect.normalize();
            }
            log::debug!("[Router] Effect catalog: {} effects", effects.len());
            state.modify(|s| s.effect_catalog = Some(effects));
        }
        Message::Config(config) => {
            log::debug!("[Router] Strip config: {} strips", config.len());
            state.modify(|s| s.strip_config = Some(config));
        }
        Message::GlobalStats(stats) => {
            log::debug!("[Router] Global stats: {:?}", stats);
            state.modify(|s| s.global_stats = Some(stats));
        }
        Message::Unrecognized { kind } => {
            log::debug!("[Router] Ignoring message type '{}'", kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::effect::NumberSpec;
    use crate::protocol::{
        ConfigValue, EffectDescriptor, GlobalStats, Network, ParameterSpec, StripConfiguration,
    };

    fn network(ssid: &str) -> Network {
        Network {
            ssid: ssid.to_string(),
            rssi: -50,
            encrypted: true,
        }
    }

    #[test]
    fn test_scan_replaces_networks() {
        let state = SharedState::new();
        route(
            Message::Scan {
                networks: vec![network("a"), network("b")],
            },
            &state,
        );
        route(
            Message::Scan {
                networks: vec![network("c")],
            },
            &state,
        );
        assert_eq!(state.snapshot().networks, vec![network("c")]);
    }

    #[test]
    fn test_effect_config_normalizes_number_bounds() {
        let state = SharedState::new();
        let effects = vec![EffectDescriptor {
            name: "Rainbow".to_string(),
            parameters: vec![ParameterSpec::Number(NumberSpec {
                title: "Speed".to_string(),
                description: String::new(),
                min: 0.100000001,
                max: 49.99951,
                step_by: 0.123456,
                default_value: 1.0,
                required: true,
            })],
        }];
        route(Message::EffectConfig { effects }, &state);

        let snapshot = state.snapshot();
        let catalog = snapshot.effect_catalog.unwrap();
        let ParameterSpec::Number(spec) = &catalog[0].parameters[0] else {
            panic!("expected number spec");
        };
        assert_eq!(spec.min, 0.1);
        assert_eq!(spec.max, 50.0);
        assert_eq!(spec.step_by, 0.123);
    }

    #[test]
    fn test_config_replaces_not_merges() {
        let state = SharedState::new();

        let mut first = StripConfiguration::new();
        first.entry("left".to_string()).or_default().insert(
            "Solid".to_string(),
            [("Speed".to_string(), ConfigValue::Integer(1))].into(),
        );
        route(Message::Config(first), &state);

        let mut second = StripConfiguration::new();
        second.entry("right".to_string()).or_default();
        route(Message::Config(second.clone()), &state);

        assert_eq!(state.snapshot().strip_config, Some(second));
    }

    #[test]
    fn test_global_stats_stored_verbatim() {
        let state = SharedState::new();
        let stats = GlobalStats {
            brightness: 128,
            on: true,
            follow_sun: false,
        };
        route(Message::GlobalStats(stats), &state);
        assert_eq!(state.snapshot().global_stats, Some(stats));
    }

    #[test]
    fn test_unrecognized_leaves_state_untouched() {
        let state = SharedState::new();
        let mut rx = state.subscribe();
        route(
            Message::Unrecognized {
                kind: "ota".to_string(),
            },
            &state,
        );
        assert_eq!(state.snapshot(), crate::state::DeviceState::default());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_route_does_not_touch_link() {
        let state = SharedState::new();
        route(Message::Scan { networks: vec![] }, &state);
        assert!(!state.is_connected());
    }
}
