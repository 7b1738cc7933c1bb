//! JSON configuration file for the `simcanvas` binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use simcanvas_core::{CanvasSettings, Params};

use crate::demos::DemoKind;

/// File layout:
///
/// ```json
/// {
///   "model": "boids",
///   "canvas": { "window_width": 900, "target_fps": 30 },
///   "params": { "population_size": 250, "seed": 7 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub model: Option<DemoKind>,
    pub canvas: CanvasSettings,
    /// Model parameter overrides; names bound to a controller become its initial value.
    pub params: Params,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_str(raw);
        let config: AppConfig = serde_path_to_error::deserialize(&mut de)
            .map_err(|err| anyhow!("{} at {}", err.inner(), err.path()))?;
        config.canvas.validate()?;
        Ok(config)
    }
}
