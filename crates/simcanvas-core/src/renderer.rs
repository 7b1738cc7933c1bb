//! Per-frame orchestrator: owns the model, figures, controllers, displays and
//! the play/step/reset state machine.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::controller::{
    Controller, ModelTarget, NumController, ParameterTarget, RENDERING_STEP, StepDirection,
    TARGET_FPS, is_reserved,
};
use crate::display::ValueDisplay;
use crate::error::{ConfigError, RenderError};
use crate::figure::Figure;
use crate::layout::LayoutMetrics;
use crate::model::{Model, ParamValue, Params};
use crate::scene::{Point, Rect, Scene};
use crate::settings::{CanvasSettings, FPS_RANGE, RENDERING_STEP_RANGE};
use crate::style::Theme;
use crate::widgets::{UiAction, UiKey, WidgetId, WidgetManager};

/// Number of frame durations averaged by the FPS meter.
pub const FPS_WINDOW: usize = 60;
const BUILTIN_CONTROLLERS: usize = 2;
const BUILTIN_DISPLAYS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct FpsMeter {
    frames: VecDeque<f64>,
}

impl FpsMeter {
    pub fn record(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        if self.frames.len() == FPS_WINDOW {
            self.frames.pop_front();
        }
        self.frames.push_back(dt);
    }

    /// Mean frames per second over the window; 0 before any frame.
    pub fn fps(&self) -> f64 {
        let total: f64 = self.frames.iter().sum();
        if total > 0.0 {
            self.frames.len() as f64 / total
        } else {
            0.0
        }
    }
}

/// User-supplied parts of a canvas.
pub struct SceneParts<M> {
    pub figures: Vec<Figure<M>>,
    pub controllers: Vec<Controller>,
    pub value_displays: Vec<ValueDisplay<M>>,
    pub params: Params,
}

impl<M> Default for SceneParts<M> {
    fn default() -> Self {
        Self {
            figures: Vec::new(),
            controllers: Vec::new(),
            value_displays: Vec::new(),
            params: Params::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStats {
    pub tick: u64,
    pub playing: bool,
    pub rendering_step: u64,
    pub target_fps: u32,
    pub measured_fps: f64,
}

/// Run-loop settings edited by the built-in controllers.
#[derive(Debug, Clone, Copy)]
struct RunSettings {
    target_fps: u32,
    rendering_step: u64,
}

impl ParameterTarget for RunSettings {
    fn current(&self, name: &str) -> Option<ParamValue> {
        match name {
            TARGET_FPS => Some(ParamValue::Int(i64::from(self.target_fps))),
            RENDERING_STEP => Some(ParamValue::Int(self.rendering_step as i64)),
            _ => None,
        }
    }

    fn apply(&mut self, name: &str, value: &ParamValue) -> bool {
        let Some(v) = value.as_i64().filter(|v| *v > 0) else {
            return false;
        };
        match name {
            TARGET_FPS => {
                self.target_fps = v as u32;
                true
            }
            RENDERING_STEP => {
                self.rendering_step = v as u64;
                true
            }
            _ => false,
        }
    }
}

pub struct Renderer<M: Model> {
    settings: CanvasSettings,
    metrics: LayoutMetrics,
    theme: Theme,
    model: M,
    fixed_params: Params,
    pending: Params,
    run: RunSettings,
    controllers: Vec<Controller>,
    figures: Vec<Figure<M>>,
    figure_rects: Vec<Rect>,
    displays: Vec<ValueDisplay<M>>,
    widgets: WidgetManager,
    play_button: WidgetId,
    playing: bool,
    tick: u64,
    fps: FpsMeter,
}

/// Fixed params overridden by controller values, without run-loop names.
fn merged_params(fixed: &Params, controllers: &[Controller]) -> Params {
    let mut params = fixed.clone();
    for controller in controllers {
        params.insert(controller.name().to_string(), controller.value());
    }
    params.retain(|name, _| !is_reserved(name));
    params
}

fn builtin_controllers(settings: &CanvasSettings) -> Result<[Controller; 2], ConfigError> {
    let fps = NumController::int(
        TARGET_FPS,
        i64::from(settings.target_fps),
        i64::from(FPS_RANGE.0),
        i64::from(FPS_RANGE.1),
        5,
    )?
    .with_label("Target FPS");
    let step = NumController::int(
        RENDERING_STEP,
        i64::from(settings.rendering_step),
        i64::from(RENDERING_STEP_RANGE.0),
        i64::from(RENDERING_STEP_RANGE.1),
        1,
    )?
    .with_label("Rendering step");
    Ok([fps.into(), step.into()])
}

impl<M: Model> Renderer<M> {
    /// Build layout, the first model and every widget. Play state starts stopped at tick 0.
    pub fn setup(settings: CanvasSettings, parts: SceneParts<M>) -> Result<Self, RenderError> {
        settings.validate()?;
        let metrics = LayoutMetrics::new(
            f64::from(settings.window_width),
            f64::from(settings.window_height()),
        );
        let figure_rects = metrics.figure_rects(parts.figures.len())?;
        let theme = Theme::new(metrics.font_size);

        let mut controllers: Vec<Controller> = builtin_controllers(&settings)?.into();
        controllers.extend(parts.controllers);

        let mut displays = vec![ValueDisplay::fed("Tick"), ValueDisplay::fed("FPS")];
        displays.extend(parts.value_displays);

        let pending = merged_params(&parts.params, &controllers);
        let model = M::from_params(&pending)?;

        let mut widgets = WidgetManager::new(theme);
        let [play, step, reset] = metrics.default_buttons();
        let play_button = widgets.add_button(play, "Play", UiAction::TogglePlay);
        widgets.add_button(step, "Step", UiAction::Step);
        widgets.add_button(reset, "Reset", UiAction::Reset);
        for (index, controller) in controllers.iter().enumerate() {
            let row = index + 1;
            match controller {
                Controller::Num(num) => {
                    widgets.add_num_controller(
                        &metrics.num_controller(row),
                        num.label(),
                        (num.min(), num.max()),
                        num.raw_value(),
                        &num.value().to_string(),
                    );
                }
                Controller::Cat(cat) => {
                    widgets.add_cat_controller(
                        &metrics.cat_controller(row),
                        cat.label(),
                        cat.options().iter().map(ToString::to_string).collect(),
                        cat.selected_index().unwrap_or(0),
                    );
                }
            }
        }

        let mut renderer = Self {
            run: RunSettings {
                target_fps: settings.target_fps,
                rendering_step: u64::from(settings.rendering_step),
            },
            settings,
            metrics,
            theme,
            model,
            fixed_params: parts.params,
            pending,
            controllers,
            figures: parts.figures,
            figure_rects,
            displays,
            widgets,
            play_button,
            playing: false,
            tick: 0,
            fps: FpsMeter::default(),
        };
        renderer.setup_components()?;
        renderer.sync_controller_widgets();
        info!(
            figures = renderer.figures.len(),
            controllers = renderer.controllers.len() - BUILTIN_CONTROLLERS,
            displays = renderer.displays.len() - BUILTIN_DISPLAYS,
            window_width = renderer.settings.window_width,
            "renderer ready"
        );
        Ok(renderer)
    }

    fn fed_value(&self, index: usize) -> Option<String> {
        match index {
            0 => Some(self.tick.to_string()),
            1 => Some(format!("{}", self.fps.fps() as u64)),
            _ => None,
        }
    }

    fn setup_components(&mut self) -> Result<(), RenderError> {
        for (figure, rect) in self.figures.iter_mut().zip(&self.figure_rects) {
            figure.setup(*rect, &self.model)?;
        }
        for index in 0..self.displays.len() {
            let fed = self.fed_value(index);
            let slot = self.metrics.display_slot(index + 1);
            self.displays[index].setup(slot, &self.model, fed)?;
        }
        Ok(())
    }

    fn update_figures(&mut self) -> Result<(), RenderError> {
        for figure in &mut self.figures {
            figure.update(&self.model, self.tick)?;
        }
        Ok(())
    }

    fn update_displays(&mut self, force: bool) -> Result<(), RenderError> {
        for index in 0..self.displays.len() {
            let fed = self.fed_value(index);
            self.displays[index].update(&self.model, self.tick, fed, force)?;
        }
        Ok(())
    }

    /// Refresh every controller widget from the live model or pending params.
    fn sync_controller_widgets(&mut self) {
        for index in 0..self.controllers.len() {
            self.sync_controller_widget(index);
        }
    }

    fn sync_controller_widget(&mut self, index: usize) {
        let Some(controller) = self.controllers.get(index) else {
            return;
        };
        let current = if is_reserved(controller.name()) {
            controller.current(&self.run, &self.pending)
        } else {
            let live = self.model.attribute(controller.name());
            live.or_else(|| self.pending.get(controller.name()).cloned())
                .unwrap_or_else(|| controller.value())
        };
        match controller {
            Controller::Num(_) => {
                let value = current.as_f64().unwrap_or_default();
                self.widgets.sync_num(index, value, &current.to_string());
            }
            Controller::Cat(cat) => {
                let selected = cat
                    .options()
                    .iter()
                    .position(|o| *o == current)
                    .or_else(|| cat.selected_index())
                    .unwrap_or(0);
                self.widgets.sync_cat(index, selected);
            }
        }
    }

    pub fn toggle_play(&mut self) {
        self.playing = !self.playing;
        let label = if self.playing { "Pause" } else { "Play" };
        self.widgets.set_button_label(self.play_button, label);
        info!(playing = self.playing, tick = self.tick, "play state changed");
    }

    /// Advance exactly one tick and force-refresh everything. Play state is untouched.
    pub fn step(&mut self) -> Result<(), RenderError> {
        self.model.step();
        self.tick += 1;
        self.update_figures()?;
        self.update_displays(true)?;
        debug!(tick = self.tick, "single step");
        Ok(())
    }

    /// Rebuild parameters, replace the model and re-set-up every component.
    pub fn reset(&mut self) -> Result<(), RenderError> {
        self.pending = merged_params(&self.fixed_params, &self.controllers);
        self.model = M::from_params(&self.pending)?;
        self.tick = 0;
        self.setup_components()?;
        self.sync_controller_widgets();
        info!(params = self.pending.len(), "model reset");
        Ok(())
    }

    /// Per-frame update: advances the model only while playing.
    pub fn tick(&mut self, dt: f64) -> Result<(), RenderError> {
        self.fps.record(dt);
        if !self.playing {
            return Ok(());
        }
        self.model.step();
        self.tick += 1;
        if self.tick % self.run.rendering_step == 0 {
            self.update_figures()?;
            self.update_displays(false)?;
        }
        Ok(())
    }

    pub fn render(&self) -> Scene {
        let mut scene = Scene::new(
            self.metrics.window_width,
            self.metrics.window_height,
            self.theme.background,
        );
        for figure in &self.figures {
            figure.draw(&mut scene);
        }
        for display in &self.displays {
            display.draw(&mut scene, self.theme.font_color, self.theme.font_size);
        }
        self.widgets.draw(&mut scene);
        scene
    }

    /// Apply a UI intent against the current model.
    pub fn apply(&mut self, action: UiAction) -> Result<(), RenderError> {
        match action {
            UiAction::TogglePlay => self.toggle_play(),
            UiAction::Step => self.step()?,
            UiAction::Reset => self.reset()?,
            UiAction::Increase(index) => self.adjust(index, StepDirection::Increase),
            UiAction::Decrease(index) => self.adjust(index, StepDirection::Decrease),
            UiAction::Slide { controller, value } => {
                self.with_controller(controller, |c, target, pending| {
                    c.slide(value, target, pending)
                });
            }
            UiAction::Select { controller, option } => {
                let changed = self.with_controller(controller, |c, target, pending| {
                    c.select(option, target, pending)
                });
                if !changed {
                    warn!(controller, option, "ignored dropdown selection");
                }
            }
        }
        Ok(())
    }

    fn adjust(&mut self, index: usize, direction: StepDirection) {
        self.with_controller(index, |c, target, pending| {
            c.adjust(direction, target, pending)
        });
    }

    /// Run a controller operation against the right target and resync its widget.
    fn with_controller<F>(&mut self, index: usize, op: F) -> bool
    where
        F: FnOnce(&mut Controller, &mut dyn ParameterTarget, &mut Params) -> Option<ParamValue>,
    {
        let Some(controller) = self.controllers.get_mut(index) else {
            warn!(index, "no controller at index");
            return false;
        };
        let changed = if is_reserved(controller.name()) {
            op(controller, &mut self.run, &mut self.pending)
        } else {
            op(controller, &mut ModelTarget(&mut self.model), &mut self.pending)
        };
        self.sync_controller_widget(index);
        changed.is_some()
    }

    pub fn on_mouse_move(&mut self, x: f64, y: f64) {
        self.widgets.on_mouse_move(Point::new(x, y));
    }

    pub fn on_mouse_press(&mut self, x: f64, y: f64) -> Result<(), RenderError> {
        match self.widgets.on_mouse_press(Point::new(x, y)) {
            Some(action) => self.apply(action),
            None => Ok(()),
        }
    }

    pub fn on_mouse_drag(&mut self, x: f64, y: f64) -> Result<(), RenderError> {
        match self.widgets.on_mouse_drag(Point::new(x, y)) {
            Some(action) => self.apply(action),
            None => Ok(()),
        }
    }

    pub fn on_mouse_release(&mut self, x: f64, y: f64) -> Result<(), RenderError> {
        match self.widgets.on_mouse_release(Point::new(x, y)) {
            Some(action) => self.apply(action),
            None => Ok(()),
        }
    }

    pub fn on_key(&mut self, key: UiKey) -> Result<(), RenderError> {
        match self.widgets.on_key(key) {
            Some(action) => self.apply(action),
            None => Ok(()),
        }
    }

    /// Index of the controller bound to `name`.
    pub fn controller_index(&self, name: &str) -> Option<usize> {
        self.controllers.iter().position(|c| c.name() == name)
    }

    pub fn controller(&self, name: &str) -> Option<&Controller> {
        self.controllers.iter().find(|c| c.name() == name)
    }

    /// Step the named controller up; returns false when no such controller exists.
    pub fn increase(&mut self, name: &str) -> bool {
        self.controller_index(name)
            .map(|i| self.adjust(i, StepDirection::Increase))
            .is_some()
    }

    pub fn decrease(&mut self, name: &str) -> bool {
        self.controller_index(name)
            .map(|i| self.adjust(i, StepDirection::Decrease))
            .is_some()
    }

    /// Move the named controller's slider to a raw value (snapped and clamped).
    pub fn slide(&mut self, name: &str, value: f64) -> Result<(), RenderError> {
        match self.controller_index(name) {
            Some(controller) => self.apply(UiAction::Slide { controller, value }),
            None => Ok(()),
        }
    }

    pub fn select(&mut self, name: &str, option: usize) -> Result<(), RenderError> {
        match self.controller_index(name) {
            Some(controller) => self.apply(UiAction::Select { controller, option }),
            None => Ok(()),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn parameters(&self) -> &Params {
        &self.pending
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn figures(&self) -> &[Figure<M>] {
        &self.figures
    }

    pub fn displays(&self) -> &[ValueDisplay<M>] {
        &self.displays
    }

    pub fn widgets(&self) -> &WidgetManager {
        &self.widgets
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn target_fps(&self) -> u32 {
        self.run.target_fps
    }

    pub fn rendering_step(&self) -> u64 {
        self.run.rendering_step
    }

    pub fn frame_stats(&self) -> FrameStats {
        FrameStats {
            tick: self.tick,
            playing: self.playing,
            rendering_step: self.run.rendering_step,
            target_fps: self.run.target_fps,
            measured_fps: self.fps.fps(),
        }
    }
}
