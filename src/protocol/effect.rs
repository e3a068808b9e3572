//! Effect catalog types.
//!
//! The controller describes each effect as a list of typed parameters. The
//! catalog drives which values an `updateEffect` command may carry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ConfigValue, EffectSettings};
use crate::constants::PARAMETER_PRECISION;

/// Tolerance used when checking that a number lands on a step.
const STEP_EPSILON: f64 = 1e-9;

/// One effect the controller can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Effect name, used as the key in strip configuration.
    pub name: String,
    /// Parameters in display order.
    #[serde(rename = "config")]
    pub parameters: Vec<ParameterSpec>,
}

/// Schema of a single effect parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterSpec {
    /// Free text with length bounds.
    String(TextSpec),
    /// Number on a stepped range.
    Number(NumberSpec),
    /// RGB color.
    Color(ColorSpec),
    /// One of a fixed list of option names.
    Select(SelectSpec),
    /// On/off flag.
    Boolean(BooleanSpec),
    /// JSON document passed through as text.
    Json(JsonSpec),
    /// A kind introduced by newer firmware.
    #[serde(other)]
    Unsupported,
}

/// `string` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    /// Display title; also the key in effect settings.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Minimum length in bytes.
    pub min_length: u32,
    /// Maximum length in bytes.
    pub max_length: u32,
    /// Value used when the parameter is required but missing.
    #[serde(default)]
    pub default_value: String,
    /// Whether the effect needs a value.
    #[serde(default)]
    pub required: bool,
}

/// `number` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSpec {
    /// Display title; also the key in effect settings.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
    /// Accepted values are `min + k * step_by`.
    pub step_by: f64,
    /// Value used when the parameter is required but missing.
    #[serde(default)]
    pub default_value: f64,
    /// Whether the effect needs a value.
    #[serde(default)]
    pub required: bool,
}

/// `color` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSpec {
    /// Display title; also the key in effect settings.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Default red channel, absent when there is no default color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_r: Option<u8>,
    /// Default green channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_g: Option<u8>,
    /// Default blue channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_b: Option<u8>,
    /// Whether the effect needs a value.
    #[serde(default)]
    pub required: bool,
}

/// `select` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSpec {
    /// Display title; also the key in effect settings.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Option names; settings carry the chosen name.
    pub options: Vec<String>,
    /// Index into `options` used when required but missing.
    #[serde(default)]
    pub default_value: u32,
    /// Whether the effect needs a value.
    #[serde(default)]
    pub required: bool,
}

/// `boolean` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanSpec {
    /// Display title; also the key in effect settings.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Value used when missing.
    #[serde(default)]
    pub default_value: bool,
}

/// `json` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSpec {
    /// Display title; also the key in effect settings.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Value used when required but missing.
    #[serde(default)]
    pub default_value: String,
    /// Whether the effect needs a value.
    #[serde(default)]
    pub required: bool,
}

/// A setting the controller would reject.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The effect has no parameter with this title.
    #[error("effect '{effect}' has no parameter '{parameter}'")]
    UnknownParameter {
        /// Effect name.
        effect: String,
        /// Offending key.
        parameter: String,
    },
    /// The value has the wrong type for the parameter.
    #[error("parameter '{parameter}' expects a {expected} value")]
    WrongType {
        /// Parameter title.
        parameter: String,
        /// Expected kind name.
        expected: &'static str,
    },
    /// The value has the right type but is out of bounds.
    #[error("parameter '{parameter}': {reason}")]
    OutOfRange {
        /// Parameter title.
        parameter: String,
        /// What bound was violated.
        reason: String,
    },
}

/// Round a bound to [`PARAMETER_PRECISION`] decimal places.
///
/// Rounds the exact binary value, so `1.0005` (stored as 1.000499...) becomes
/// `1.0`. Exact ties go to the even digit. Non-finite values are returned
/// unchanged.
#[must_use]
pub fn normalize_bound(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.prec$}", prec = PARAMETER_PRECISION)
        .parse()
        .unwrap_or(value)
}

impl NumberSpec {
    /// Round `min`, `max` and `step_by` to display precision.
    pub fn normalize(&mut self) {
        self.min = normalize_bound(self.min);
        self.max = normalize_bound(self.max);
        self.step_by = normalize_bound(self.step_by);
    }

    fn check(&self, value: f64) -> Result<(), String> {
        if value.is_nan() {
            return Err("value is not a number".to_string());
        }
        if value < self.min || value > self.max {
            return Err(format!("{value} is outside {}..={}", self.min, self.max));
        }
        if self.step_by > 0.0 {
            let steps = (value - self.min) / self.step_by;
            if (steps - steps.round()).abs() > STEP_EPSILON {
                return Err(format!(
                    "{value} is not {} plus a multiple of {}",
                    self.min, self.step_by
                ));
            }
        }
        Ok(())
    }
}

impl ParameterSpec {
    /// Parameter title, or `None` for [`ParameterSpec::Unsupported`].
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::String(spec) => Some(&spec.title),
            Self::Number(spec) => Some(&spec.title),
            Self::Color(spec) => Some(&spec.title),
            Self::Select(spec) => Some(&spec.title),
            Self::Boolean(spec) => Some(&spec.title),
            Self::Json(spec) => Some(&spec.title),
            Self::Unsupported => None,
        }
    }

    /// Check a value the way the controller does before applying it.
    pub fn validate(&self, value: &ConfigValue) -> Result<(), ValidationError> {
        let parameter = self.title().unwrap_or_default().to_string();
        let wrong_type = |expected| ValidationError::WrongType {
            parameter: parameter.clone(),
            expected,
        };
        let out_of_range = |reason| ValidationError::OutOfRange {
            parameter: parameter.clone(),
            reason,
        };

        match (self, value) {
            (Self::String(spec), ConfigValue::Text(text)) => {
                let len = u32::try_from(text.len()).unwrap_or(u32::MAX);
                if len < spec.min_length || len > spec.max_length {
                    return Err(out_of_range(format!(
                        "length {len} is outside {}..={}",
                        spec.min_length, spec.max_length
                    )));
                }
                Ok(())
            }
            (Self::String(_), _) => Err(wrong_type("string")),
            (Self::Number(spec), value) => match value.as_f64() {
                Some(number) => spec.check(number).map_err(out_of_range),
                None => Err(wrong_type("number")),
            },
            (Self::Color(_), ConfigValue::Color(_)) => Ok(()),
            (Self::Color(_), _) => Err(wrong_type("color")),
            (Self::Select(spec), ConfigValue::Text(option)) => {
                if spec.options.iter().any(|o| o == option) {
                    Ok(())
                } else {
                    Err(out_of_range(format!(
                        "'{option}' is not one of {:?}",
                        spec.options
                    )))
                }
            }
            (Self::Select(_), _) => Err(wrong_type("select")),
            (Self::Boolean(_), ConfigValue::Bool(_)) => Ok(()),
            (Self::Boolean(_), _) => Err(wrong_type("boolean")),
            (Self::Json(_), ConfigValue::Text(_)) => Ok(()),
            (Self::Json(_), _) => Err(wrong_type("json")),
            (Self::Unsupported, _) => Ok(()),
        }
    }
}

impl EffectDescriptor {
    /// Round every `number` parameter's bounds to display precision.
    pub fn normalize(&mut self) {
        for parameter in &mut self.parameters {
            if let ParameterSpec::Number(spec) = parameter {
                spec.normalize();
            }
        }
    }

    /// Look up a parameter by title.
    #[must_use]
    pub fn parameter(&self, title: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.title() == Some(title))
    }

    /// Check a full settings map against this effect's parameters.
    ///
    /// Missing parameters are accepted: the controller fills in defaults.
    pub fn validate(&self, settings: &EffectSettings) -> Result<(), ValidationError> {
        for (key, value) in settings {
            let spec = self
                .parameter(key)
                .ok_or_else(|| ValidationError::UnknownParameter {
                    effect: self.name.clone(),
                    parameter: key.clone(),
                })?;
            spec.validate(value)?;
        }
        Ok(())
    }
}
