//! Parameter schemas and value bags.
//!
//! Every effect declares its parameters as a static table of [`ParamSpec`]s:
//! key, display name, range, default, step, and kind. Ranges and steps are
//! declared centrally so the automation engine and any UI can validate and
//! clamp without knowing the effect internals. Actual values travel in a
//! [`ParamMap`], a serializable bag keyed by parameter name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit type for parameter display and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamUnit {
    /// Hertz (Hz) - frequencies and LFO rates.
    Hertz,
    /// Milliseconds (ms) - times and grain sizes.
    Milliseconds,
    /// Percentage (%) - gains and normalized amounts.
    Percent,
    /// Semitones - pitch offsets.
    Semitones,
    /// No unit - dimensionless parameters.
    None,
}

impl ParamUnit {
    /// Unit suffix string for display.
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Hertz => " Hz",
            ParamUnit::Milliseconds => " ms",
            ParamUnit::Percent => "%",
            ParamUnit::Semitones => " st",
            ParamUnit::None => "",
        }
    }
}

/// The shape of a parameter's value space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Continuous value in `[min, max]`.
    Float,
    /// Integer value in `[min, max]` (stored as f32, rounded on read).
    Int,
    /// On/off toggle.
    Bool,
    /// One of a fixed set of options; `default` indexes into the list.
    Choice(&'static [&'static str]),
}

/// Static description of one effect parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Stable key used in [`ParamMap`]s and persisted ops.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Unit for formatting.
    pub unit: ParamUnit,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Default value (choice index for [`ParamKind::Choice`]).
    pub default: f32,
    /// Recommended increment for encoder/slider control.
    pub step: f32,
    /// Value space.
    pub kind: ParamKind,
    /// Whether the automation engine may drive this parameter.
    pub automatable: bool,
}

impl ParamSpec {
    /// Continuous float parameter.
    pub const fn float(
        key: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
        step: f32,
        unit: ParamUnit,
    ) -> Self {
        Self {
            key,
            name,
            unit,
            min,
            max,
            default,
            step,
            kind: ParamKind::Float,
            automatable: false,
        }
    }

    /// Integer parameter.
    pub const fn int(
        key: &'static str,
        name: &'static str,
        min: i32,
        max: i32,
        default: i32,
    ) -> Self {
        Self {
            key,
            name,
            unit: ParamUnit::None,
            min: min as f32,
            max: max as f32,
            default: default as f32,
            step: 1.0,
            kind: ParamKind::Int,
            automatable: false,
        }
    }

    /// Boolean toggle.
    pub const fn toggle(key: &'static str, name: &'static str, default: bool) -> Self {
        Self {
            key,
            name,
            unit: ParamUnit::None,
            min: 0.0,
            max: 1.0,
            default: if default { 1.0 } else { 0.0 },
            step: 1.0,
            kind: ParamKind::Bool,
            automatable: false,
        }
    }

    /// Fixed-choice parameter; `default` is an index into `options`.
    pub const fn choice(
        key: &'static str,
        name: &'static str,
        options: &'static [&'static str],
        default: usize,
    ) -> Self {
        Self {
            key,
            name,
            unit: ParamUnit::None,
            min: 0.0,
            max: (options.len() - 1) as f32,
            default: default as f32,
            step: 1.0,
            kind: ParamKind::Choice(options),
            automatable: false,
        }
    }

    /// Mark the parameter as automatable (builder style).
    pub const fn automatable(mut self) -> Self {
        self.automatable = true;
        self
    }

    /// Clamp a raw value to this parameter's range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Default option name for choice parameters, `None` otherwise.
    pub fn default_option(&self) -> Option<&'static str> {
        match self.kind {
            ParamKind::Choice(options) => options.get(self.default as usize).copied(),
            _ => None,
        }
    }
}

/// A single parameter value as stored in an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value (floats and ints share this representation).
    Number(f32),
    /// On/off toggle.
    Bool(bool),
    /// Choice option name.
    Text(String),
}

/// Ordered bag of parameter values keyed by [`ParamSpec::key`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap(BTreeMap<String, ParamValue>);

impl ParamMap {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a numeric value.
    pub fn set(&mut self, key: impl Into<String>, value: f32) -> &mut Self {
        self.0.insert(key.into(), ParamValue::Number(value));
        self
    }

    /// Set a boolean value.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.0.insert(key.into(), ParamValue::Bool(value));
        self
    }

    /// Set a choice option by name.
    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), ParamValue::Text(value.into()));
        self
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// True when no values are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Float value for `spec`, clamped to its range; missing or mistyped
    /// values fall back to the default.
    pub fn float(&self, spec: &ParamSpec) -> f32 {
        let raw = match self.0.get(spec.key) {
            Some(ParamValue::Number(v)) => *v,
            Some(ParamValue::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => spec.default,
        };
        spec.clamp(raw)
    }

    /// Integer value for `spec` (rounded, clamped).
    pub fn int(&self, spec: &ParamSpec) -> i64 {
        self.float(spec).round() as i64
    }

    /// Boolean value for `spec`.
    pub fn flag(&self, spec: &ParamSpec) -> bool {
        match self.0.get(spec.key) {
            Some(ParamValue::Bool(b)) => *b,
            Some(ParamValue::Number(v)) => *v > 0.5,
            _ => spec.default > 0.5,
        }
    }

    /// Choice option for `spec`; unknown options fall back to the default.
    pub fn choice(&self, spec: &ParamSpec) -> &str {
        let ParamKind::Choice(options) = spec.kind else {
            return "";
        };
        if let Some(ParamValue::Text(s)) = self.0.get(spec.key)
            && let Some(opt) = options.iter().copied().find(|o| *o == s.as_str())
        {
            return opt;
        }
        options.get(spec.default as usize).copied().unwrap_or(options[0])
    }
}

impl FromIterator<(String, ParamValue)> for ParamMap {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVE: ParamSpec =
        ParamSpec::float("drive", "Drive", 0.5, 20.0, 3.0, 0.1, ParamUnit::None).automatable();
    const MODE: ParamSpec = ParamSpec::choice("mode", "Mode", &["hard", "soft", "overdrive"], 1);
    const MONO: ParamSpec = ParamSpec::toggle("mono", "Mono", false);

    #[test]
    fn test_float_clamps_to_range() {
        let mut params = ParamMap::new();
        params.set("drive", 100.0);
        assert_eq!(params.float(&DRIVE), 20.0);
        params.set("drive", -5.0);
        assert_eq!(params.float(&DRIVE), 0.5);
    }

    #[test]
    fn test_missing_falls_back_to_default() {
        let params = ParamMap::new();
        assert_eq!(params.float(&DRIVE), 3.0);
        assert_eq!(params.choice(&MODE), "soft");
        assert!(!params.flag(&MONO));
    }

    #[test]
    fn test_unknown_choice_falls_back() {
        let mut params = ParamMap::new();
        params.set_text("mode", "shred");
        assert_eq!(params.choice(&MODE), "soft");
        params.set_text("mode", "hard");
        assert_eq!(params.choice(&MODE), "hard");
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut params = ParamMap::new();
        params.set("drive", 5.5);
        params.set_text("mode", "hard");
        params.set_bool("mono", true);
        let json = serde_json::to_string(&params).unwrap();
        let back: ParamMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_int_rounds() {
        const REPEATS: ParamSpec = ParamSpec::int("repeats", "Repeats", 1, 64, 4);
        let mut params = ParamMap::new();
        params.set("repeats", 7.6);
        assert_eq!(params.int(&REPEATS), 8);
    }
}
