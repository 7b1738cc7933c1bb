//! Error types raised while configuring and driving a canvas.

use thiserror::Error;

use crate::color::StyleError;
use crate::model::ModelError;

/// Configuration mistakes caught at construction time. These are never coerced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid shape `{0}`; expected `rect` or `circle`")]
    InvalidShape(String),
    #[error("invalid color map `{0}`")]
    InvalidColorMap(String),
    #[error("continuous color maps require both a minimum and a maximum value")]
    MissingColorBounds,
    #[error("color bounds must be finite with vmin < vmax and a span of at most 100000 (got {vmin}..{vmax})")]
    InvalidColorBounds { vmin: f64, vmax: f64 },
    #[error("sprite size must be positive and finite (got {0})")]
    InvalidSize(f64),
    #[error("history plots support at most {max} series (got {count})")]
    TooManySeries { count: usize, max: usize },
    #[error("history plots need at least one series")]
    EmptyHistory,
    #[error("{what} has {actual} entries but {expected} series were configured")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("at most 4 figures can be laid out (got {0})")]
    TooManyFigures(usize),
    #[error("controller `{name}`: {reason}")]
    InvalidRange { name: String, reason: String },
    #[error("value display `{0}` needs a positive update step")]
    InvalidUpdateStep(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Color(#[from] StyleError),
}

/// Failures raised while a canvas is running; these propagate to the host loop.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("model has no attribute `{0}`")]
    MissingAttribute(String),
    #[error("model attribute `{0}` is not numeric")]
    NonNumericAttribute(String),
    #[error("data collector has no series `{0}`")]
    MissingSeries(String),
    #[error("model does not expose a data collector (needed for `{0}`)")]
    MissingCollector(String),
    #[error("network layout has no node {0}")]
    MissingNode(usize),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
