//! Parameter controllers bound either to the live model or to the pending
//! parameter dictionary used at the next model construction.

use tracing::debug;

use crate::error::ConfigError;
use crate::model::{Model, ParamValue, Params};

/// Reserved name of the built-in frame-rate controller.
pub const TARGET_FPS: &str = "target_fps";
/// Reserved name of the built-in render-interval controller.
pub const RENDERING_STEP: &str = "rendering_step";

pub fn is_reserved(name: &str) -> bool {
    name == TARGET_FPS || name == RENDERING_STEP
}

/// Something a controller can read and write parameters on.
pub trait ParameterTarget {
    /// Current value, or `None` when the target has no such attribute.
    fn current(&self, name: &str) -> Option<ParamValue>;
    /// Write the value; returns false when the target has no such attribute.
    fn apply(&mut self, name: &str, value: &ParamValue) -> bool;
}

/// Adapts a live [`Model`] to [`ParameterTarget`].
pub struct ModelTarget<'a, M>(pub &'a mut M);

impl<M: Model> ParameterTarget for ModelTarget<'_, M> {
    fn current(&self, name: &str) -> Option<ParamValue> {
        self.0.attribute(name)
    }

    fn apply(&mut self, name: &str, value: &ParamValue) -> bool {
        self.0.attribute(name).is_some() && self.0.set_attribute(name, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Increase,
    Decrease,
}

impl StepDirection {
    fn sign(self) -> f64 {
        match self {
            StepDirection::Increase => 1.0,
            StepDirection::Decrease => -1.0,
        }
    }
}

/// Slider plus `+`/`-` steppers over a numeric range.
#[derive(Debug, Clone, PartialEq)]
pub struct NumController {
    name: String,
    label: Option<String>,
    value: f64,
    min: f64,
    max: f64,
    step: f64,
    integral: bool,
    decimals: u32,
}

fn invalid_range(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidRange {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Number of decimal digits in the shortest rendering of `step`.
fn step_decimals(step: f64) -> u32 {
    let text = format!("{step}");
    text.split_once('.')
        .map(|(_, frac)| frac.len().min(12) as u32)
        .unwrap_or(0)
}

impl NumController {
    pub fn int(
        name: impl Into<String>,
        value: i64,
        min: i64,
        max: i64,
        step: i64,
    ) -> Result<Self, ConfigError> {
        Self::validated(
            name.into(),
            value as f64,
            min as f64,
            max as f64,
            step as f64,
            true,
        )
    }

    pub fn float(
        name: impl Into<String>,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Result<Self, ConfigError> {
        Self::validated(name.into(), value, min, max, step, false)
    }

    fn validated(
        name: String,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
        integral: bool,
    ) -> Result<Self, ConfigError> {
        if ![value, min, max, step].iter().all(|v| v.is_finite()) {
            return Err(invalid_range(&name, "bounds, step and value must be finite"));
        }
        if min > max {
            return Err(invalid_range(&name, format!("min {min} exceeds max {max}")));
        }
        if step <= 0.0 {
            return Err(invalid_range(&name, format!("step {step} is not positive")));
        }
        if value < min || value > max {
            return Err(invalid_range(
                &name,
                format!("initial value {value} outside [{min}, {max}]"),
            ));
        }
        let decimals = if integral { 0 } else { step_decimals(step) };
        Ok(Self {
            name,
            label: None,
            value,
            min,
            max,
            step,
            integral,
            decimals,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn is_integral(&self) -> bool {
        self.integral
    }

    pub fn raw_value(&self) -> f64 {
        self.value
    }

    pub fn value(&self) -> ParamValue {
        self.to_param(self.value)
    }

    /// Round to the controller's granularity.
    pub fn round(&self, value: f64) -> f64 {
        if self.integral {
            value.round()
        } else {
            let scale = 10f64.powi(self.decimals as i32);
            (value * scale).round() / scale
        }
    }

    pub fn to_param(&self, value: f64) -> ParamValue {
        if self.integral {
            ParamValue::Int(value as i64)
        } else {
            ParamValue::Float(value)
        }
    }

    /// One stepper move from `current`, rounded then clamped.
    pub fn stepped(&self, current: f64, direction: StepDirection) -> f64 {
        self.round(current + self.step * direction.sign())
            .clamp(self.min, self.max)
    }

    /// Slider position snapped to `min + k * step`, then clamped.
    pub fn snapped(&self, raw: f64) -> f64 {
        let k = ((raw - self.min) / self.step).round();
        self.round(self.min + k * self.step).clamp(self.min, self.max)
    }
}

/// Dropdown over an enumerated option set.
#[derive(Debug, Clone, PartialEq)]
pub struct CatController {
    name: String,
    label: Option<String>,
    value: ParamValue,
    options: Vec<ParamValue>,
}

impl CatController {
    pub fn new<V, I>(name: impl Into<String>, value: V, options: I) -> Result<Self, ConfigError>
    where
        V: Into<ParamValue>,
        I: IntoIterator,
        I::Item: Into<ParamValue>,
    {
        let name = name.into();
        let value = value.into();
        let options: Vec<ParamValue> = options.into_iter().map(Into::into).collect();
        if !options.contains(&value) {
            return Err(invalid_range(
                &name,
                format!("initial value `{value}` is not one of the options"),
            ));
        }
        Ok(Self {
            name,
            label: None,
            value,
            options,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn value(&self) -> ParamValue {
        self.value.clone()
    }

    pub fn options(&self) -> &[ParamValue] {
        &self.options
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.options.iter().position(|o| *o == self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    Num(NumController),
    Cat(CatController),
}

impl From<NumController> for Controller {
    fn from(value: NumController) -> Self {
        Controller::Num(value)
    }
}

impl From<CatController> for Controller {
    fn from(value: CatController) -> Self {
        Controller::Cat(value)
    }
}

impl Controller {
    pub fn name(&self) -> &str {
        match self {
            Controller::Num(c) => c.name(),
            Controller::Cat(c) => c.name(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Controller::Num(c) => c.label(),
            Controller::Cat(c) => c.label(),
        }
    }

    /// Value recorded by the controller's last change.
    pub fn value(&self) -> ParamValue {
        match self {
            Controller::Num(c) => c.value(),
            Controller::Cat(c) => c.value(),
        }
    }

    /// Live value: target attribute, then pending dictionary, then the recorded value.
    pub fn current(&self, target: &dyn ParameterTarget, pending: &Params) -> ParamValue {
        target
            .current(self.name())
            .or_else(|| pending.get(self.name()).cloned())
            .unwrap_or_else(|| self.value())
    }

    /// Move a numeric controller one step. Categorical controllers ignore steppers.
    pub fn adjust(
        &mut self,
        direction: StepDirection,
        target: &mut dyn ParameterTarget,
        pending: &mut Params,
    ) -> Option<ParamValue> {
        let current = self.current(target, pending);
        let Controller::Num(num) = self else {
            return None;
        };
        let base = current.as_f64().unwrap_or(num.value);
        let next = num.stepped(base, direction);
        Some(Self::commit_num(num, next, target, pending))
    }

    /// Apply a raw slider position. Categorical controllers have no slider.
    pub fn slide(
        &mut self,
        raw: f64,
        target: &mut dyn ParameterTarget,
        pending: &mut Params,
    ) -> Option<ParamValue> {
        let Controller::Num(num) = self else {
            return None;
        };
        let next = num.snapped(raw);
        Some(Self::commit_num(num, next, target, pending))
    }

    /// Select option `index`; out-of-range indices are ignored.
    pub fn select(
        &mut self,
        index: usize,
        target: &mut dyn ParameterTarget,
        pending: &mut Params,
    ) -> Option<ParamValue> {
        let Controller::Cat(cat) = self else {
            return None;
        };
        let value = cat.options.get(index)?.clone();
        cat.value = value.clone();
        Self::write(&cat.name, &value, target, pending);
        Some(value)
    }

    fn commit_num(
        num: &mut NumController,
        next: f64,
        target: &mut dyn ParameterTarget,
        pending: &mut Params,
    ) -> ParamValue {
        num.value = next;
        let value = num.to_param(next);
        Self::write(&num.name, &value, target, pending);
        value
    }

    fn write(name: &str, value: &ParamValue, target: &mut dyn ParameterTarget, pending: &mut Params) {
        let live = target.apply(name, value);
        pending.insert(name.to_string(), value.clone());
        debug!(parameter = name, %value, live, "controller value changed");
    }
}
