//! The simulation-facing side of a canvas.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named parameter values passed to [`Model::from_params`].
pub type Params = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value; booleans map to 0/1 and text is never numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Bool(b) => Some(i64::from(*b)),
            ParamValue::Int(i) => Some(*i),
            ParamValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(v) => f.write_str(&format_float(*v)),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip rendering that always shows a fractional part (`1.0`, `0.25`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("parameter `{name}` is invalid: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("model construction failed: {0}")]
    Construction(String),
}

/// Typed reads with defaults for [`Params`].
pub trait ParamsExt {
    fn f64_or(&self, name: &str, default: f64) -> Result<f64, ModelError>;
    fn i64_or(&self, name: &str, default: i64) -> Result<i64, ModelError>;
    fn usize_or(&self, name: &str, default: usize) -> Result<usize, ModelError>;
    fn bool_or(&self, name: &str, default: bool) -> Result<bool, ModelError>;
    fn text_or(&self, name: &str, default: &str) -> Result<String, ModelError>;
}

fn invalid(name: &str, expected: &str, value: &ParamValue) -> ModelError {
    ModelError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected {expected}, got `{value}`"),
    }
}

impl ParamsExt for Params {
    fn f64_or(&self, name: &str, default: f64) -> Result<f64, ModelError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| invalid(name, "a number", value)),
        }
    }

    fn i64_or(&self, name: &str, default: i64) -> Result<i64, ModelError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| invalid(name, "an integer", value)),
        }
    }

    fn usize_or(&self, name: &str, default: usize) -> Result<usize, ModelError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| invalid(name, "a non-negative integer", value)),
        }
    }

    fn bool_or(&self, name: &str, default: bool) -> Result<bool, ModelError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| invalid(name, "a boolean", value)),
        }
    }

    fn text_or(&self, name: &str, default: &str) -> Result<String, ModelError> {
        match self.get(name) {
            None => Ok(default.to_string()),
            Some(ParamValue::Text(s)) => Ok(s.clone()),
            Some(value) => Err(invalid(name, "text", value)),
        }
    }
}

/// Simulation collaborator driven by the renderer.
pub trait Model: Sized + 'static {
    /// Build a fresh model from the merged parameter dictionary.
    fn from_params(params: &Params) -> Result<Self, ModelError>;

    /// Advance the simulation by one tick.
    fn step(&mut self);

    /// Read a named attribute; `None` when the model has no such attribute.
    fn attribute(&self, name: &str) -> Option<ParamValue>;

    /// Overwrite a named attribute; returns false when there is no such attribute.
    fn set_attribute(&mut self, name: &str, value: &ParamValue) -> bool {
        let _ = (name, value);
        false
    }

    fn collector(&self) -> Option<&DataCollector> {
        None
    }

    /// Seed for presentation randomness (sprite jitter, spring layouts).
    fn seed(&self) -> Option<u64> {
        None
    }
}

/// Stable identity of a simulation entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

pub trait Entity {
    fn entity_id(&self) -> EntityId;
}

/// Declared extent of a grid or continuous space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpaceExtent {
    pub width: f64,
    pub height: f64,
}

impl SpaceExtent {
    pub fn new(width: impl Into<f64>, height: impl Into<f64>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }
}

/// Per-tick model-level series recorded by a simulation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataCollector {
    model_vars: BTreeMap<String, Vec<f64>>,
}

impl DataCollector {
    /// Collector with the given series registered and empty.
    pub fn with_series<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model_vars: names.into_iter().map(|n| (n.into(), Vec::new())).collect(),
        }
    }

    pub fn record(&mut self, name: &str, value: f64) {
        self.model_vars
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.model_vars.get(name).map(Vec::as_slice)
    }

    /// `None` when the series is unknown, `Some(None)` when it exists but is empty.
    pub fn latest(&self, name: &str) -> Option<Option<f64>> {
        self.series(name).map(|s| s.last().copied())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.model_vars.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_display_keeps_fraction() {
        assert_eq!(ParamValue::Float(1.0).to_string(), "1.0");
        assert_eq!(ParamValue::Float(0.25).to_string(), "0.25");
        assert_eq!(ParamValue::Int(125).to_string(), "125");
        assert_eq!(ParamValue::Bool(true).to_string(), "True");
    }

    #[test]
    fn untagged_json_picks_narrowest_variant() {
        let params: Params =
            serde_json::from_str(r#"{"n": 3, "p": 0.5, "on": true, "mode": "fast"}"#)
                .expect("params json");
        assert_eq!(params["n"], ParamValue::Int(3));
        assert_eq!(params["p"], ParamValue::Float(0.5));
        assert_eq!(params["on"], ParamValue::Bool(true));
        assert_eq!(params["mode"], ParamValue::Text("fast".into()));
    }

    #[test]
    fn params_ext_defaults_and_type_errors() {
        let mut params = Params::new();
        params.insert("width".into(), ParamValue::Int(20));
        params.insert("density".into(), ParamValue::Float(0.8));
        params.insert("name".into(), ParamValue::Text("x".into()));

        assert_eq!(params.usize_or("width", 5).expect("width"), 20);
        assert_eq!(params.f64_or("density", 0.1).expect("density"), 0.8);
        assert_eq!(params.f64_or("missing", 0.1).expect("default"), 0.1);
        assert!(params.i64_or("density", 1).is_err());
        assert!(params.f64_or("name", 1.0).is_err());
    }

    #[test]
    fn collector_latest_distinguishes_empty_and_unknown() {
        let mut collector = DataCollector::with_series(["Infected"]);
        assert_eq!(collector.latest("Infected"), Some(None));
        assert_eq!(collector.latest("Resistant"), None);
        collector.record("Infected", 3.0);
        collector.record("Infected", 4.0);
        assert_eq!(collector.latest("Infected"), Some(Some(4.0)));
        assert_eq!(collector.series("Infected"), Some(&[3.0, 4.0][..]));
    }
}
