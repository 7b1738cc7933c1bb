//! Label + value text bound to a model attribute.

use std::fmt::Display;

use crate::color::Rgba;
use crate::error::{ConfigError, RenderError};
use crate::layout::DisplaySlot;
use crate::model::{Model, format_float};
use crate::scene::Scene;

pub const DEFAULT_UPDATE_STEP: u64 = 10;
const MISSING: &str = "NA";

enum Source<M> {
    Attribute(String),
    Collector(String),
    Accessor(Box<dyn Fn(&M) -> String>),
    /// Value pushed by the renderer (tick counter, FPS).
    Fed,
}

pub struct ValueDisplay<M> {
    source: Source<M>,
    label: String,
    update_step: u64,
    text: String,
    slot: Option<DisplaySlot>,
}

impl<M> ValueDisplay<M> {
    fn with_source(source: Source<M>, label: String) -> Self {
        Self {
            source,
            label,
            update_step: DEFAULT_UPDATE_STEP,
            text: MISSING.to_string(),
            slot: None,
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_source(Source::Attribute(name.clone()), name)
    }

    pub fn collector(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_source(Source::Collector(name.clone()), name)
    }

    pub fn from_fn<T>(f: impl Fn(&M) -> T + 'static) -> Self
    where
        M: 'static,
        T: Display + 'static,
    {
        Self::with_source(
            Source::Accessor(Box::new(move |model: &M| f(model).to_string())),
            "no label".to_string(),
        )
    }

    /// Display whose value is supplied through [`ValueDisplay::update`].
    pub fn fed(label: impl Into<String>) -> Self {
        Self::with_source(Source::Fed, label.into())
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn update_step(mut self, step: u64) -> Result<Self, ConfigError> {
        if step == 0 {
            return Err(ConfigError::InvalidUpdateStep(self.label));
        }
        self.update_step = step;
        Ok(self)
    }

    pub fn label_text(&self) -> &str {
        &self.label
    }

    pub fn value_text(&self) -> &str {
        &self.text
    }
}

impl<M: Model> ValueDisplay<M> {
    fn read(&self, model: &M) -> Result<Option<String>, RenderError> {
        let text = match &self.source {
            Source::Attribute(name) => model
                .attribute(name)
                .ok_or_else(|| RenderError::MissingAttribute(name.clone()))?
                .to_string(),
            Source::Collector(name) => model
                .collector()
                .ok_or_else(|| RenderError::MissingCollector(name.clone()))?
                .latest(name)
                .ok_or_else(|| RenderError::MissingSeries(name.clone()))?
                .map(format_float)
                .unwrap_or_else(|| MISSING.to_string()),
            Source::Accessor(f) => f(model),
            Source::Fed => return Ok(None),
        };
        Ok(Some(text))
    }

    /// Bind to a layout slot and read the initial value.
    pub fn setup(
        &mut self,
        slot: DisplaySlot,
        model: &M,
        fed: Option<String>,
    ) -> Result<(), RenderError> {
        self.slot = Some(slot);
        self.text = match (self.read(model)?, fed) {
            (Some(text), _) | (None, Some(text)) => text,
            (None, None) => MISSING.to_string(),
        };
        Ok(())
    }

    /// Refresh on the update interval or when forced; returns whether the text changed.
    pub fn update(
        &mut self,
        model: &M,
        tick: u64,
        fed: Option<String>,
        force: bool,
    ) -> Result<bool, RenderError> {
        if !force && tick % self.update_step != 0 {
            return Ok(false);
        }
        let Some(text) = self.read(model)?.or(fed) else {
            return Ok(false);
        };
        if text == self.text {
            return Ok(false);
        }
        self.text = text;
        Ok(true)
    }

    pub fn draw(&self, scene: &mut Scene, color: Rgba, font_size: f64) {
        if let Some(slot) = self.slot {
            scene.text(slot.label, self.label.clone(), color, font_size);
            scene.text(slot.value, self.text.clone(), color, font_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ParamValue, Params};
    use crate::scene::Point;

    struct Counter {
        happy: i64,
    }

    impl Model for Counter {
        fn from_params(_params: &Params) -> Result<Self, ModelError> {
            Ok(Self { happy: 0 })
        }

        fn step(&mut self) {
            self.happy += 1;
        }

        fn attribute(&self, name: &str) -> Option<ParamValue> {
            (name == "happy").then_some(ParamValue::Int(self.happy))
        }
    }

    fn slot() -> DisplaySlot {
        DisplaySlot {
            label: Point::new(0.0, 20.0),
            value: Point::new(0.0, 10.0),
        }
    }

    #[test]
    fn refreshes_on_interval_or_force() {
        let mut model = Counter { happy: 3 };
        let mut display = ValueDisplay::attribute("happy");
        display.setup(slot(), &model, None).expect("setup");
        assert_eq!(display.label_text(), "happy");
        assert_eq!(display.value_text(), "3");

        model.happy = 4;
        assert!(!display.update(&model, 7, None, false).expect("skip"));
        assert_eq!(display.value_text(), "3");
        assert!(display.update(&model, 10, None, false).expect("interval"));
        assert_eq!(display.value_text(), "4");
        assert!(!display.update(&model, 20, None, false).expect("unchanged"));

        model.happy = 5;
        assert!(display.update(&model, 21, None, true).expect("forced"));
        assert_eq!(display.value_text(), "5");
    }

    #[test]
    fn fed_display_uses_renderer_value() {
        let model = Counter { happy: 0 };
        let mut tick = ValueDisplay::fed("Tick");
        tick.setup(slot(), &model, Some("0".into())).expect("setup");
        assert!(tick.update(&model, 10, Some("10".into()), false).expect("update"));
        assert_eq!(tick.value_text(), "10");
    }

    #[test]
    fn accessor_label_defaults_and_missing_attribute_errors() {
        let model = Counter { happy: 2 };
        let mut display = ValueDisplay::from_fn(|m: &Counter| m.happy * 10);
        display.setup(slot(), &model, None).expect("setup");
        assert_eq!(display.label_text(), "no label");
        assert_eq!(display.value_text(), "20");

        let mut missing = ValueDisplay::<Counter>::attribute("sad");
        assert!(matches!(
            missing.setup(slot(), &model, None),
            Err(RenderError::MissingAttribute(_))
        ));
        assert!(ValueDisplay::<Counter>::attribute("x").update_step(0).is_err());
    }
}
