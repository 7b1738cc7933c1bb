use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_WINDOW_WIDTH: u32 = 360;
pub const FPS_RANGE: (u32, u32) = (5, 60);
pub const RENDERING_STEP_RANGE: (u32, u32) = (1, 10);

/// Window and run-loop settings of a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub window_width: u32,
    pub window_title: String,
    pub target_fps: u32,
    pub rendering_step: u32,
    pub visible: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            window_width: 1200,
            window_title: "simcanvas".to_string(),
            target_fps: 40,
            rendering_step: 1,
            visible: true,
        }
    }
}

impl CanvasSettings {
    pub fn window_height(&self) -> u32 {
        (f64::from(self.window_width) * 0.6).round() as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width < MIN_WINDOW_WIDTH {
            return Err(ConfigError::InvalidSettings(format!(
                "window_width must be at least {MIN_WINDOW_WIDTH} (got {})",
                self.window_width
            )));
        }
        let (lo, hi) = FPS_RANGE;
        if !(lo..=hi).contains(&self.target_fps) {
            return Err(ConfigError::InvalidSettings(format!(
                "target_fps must be within {lo}..={hi} (got {})",
                self.target_fps
            )));
        }
        let (lo, hi) = RENDERING_STEP_RANGE;
        if !(lo..=hi).contains(&self.rendering_step) {
            return Err(ConfigError::InvalidSettings(format!(
                "rendering_step must be within {lo}..={hi} (got {})",
                self.rendering_step
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = CanvasSettings::default();
        settings.validate().expect("defaults are valid");
        assert_eq!(settings.window_height(), 720);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for bad in [
            CanvasSettings {
                window_width: 200,
                ..CanvasSettings::default()
            },
            CanvasSettings {
                target_fps: 0,
                ..CanvasSettings::default()
            },
            CanvasSettings {
                rendering_step: 0,
                ..CanvasSettings::default()
            },
        ] {
            assert!(matches!(
                bad.validate(),
                Err(ConfigError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings: CanvasSettings =
            serde_json::from_str(r#"{"window_width": 900, "visible": false}"#).expect("json");
        assert_eq!(settings.window_width, 900);
        assert_eq!(settings.target_fps, 40);
        assert!(!settings.visible);
    }
}
