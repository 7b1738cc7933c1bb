//! Top-level façade: collect plots, controllers and displays, then show them.

use anyhow::{Context, Result};
use simcanvas_core::layout::MAX_FIGURES;
use simcanvas_core::{
    CanvasSettings, ConfigError, Controller, Figure, Model, ParamValue, Params, RenderError,
    Renderer, SceneParts, ValueDisplay,
};
use tracing::info;

use crate::host::{Host, HostContext};
use crate::terminal::TerminalHost;

pub struct CanvasBuilder<M: Model> {
    figures: Vec<Figure<M>>,
    controllers: Vec<Controller>,
    value_displays: Vec<ValueDisplay<M>>,
    params: Params,
    settings: CanvasSettings,
}

impl<M: Model> CanvasBuilder<M> {
    pub fn plot(mut self, figure: Figure<M>) -> Self {
        self.figures.push(figure);
        self
    }

    pub fn controller(mut self, controller: impl Into<Controller>) -> Self {
        self.controllers.push(controller.into());
        self
    }

    pub fn value_display(mut self, display: ValueDisplay<M>) -> Self {
        self.value_displays.push(display);
        self
    }

    /// Fixed model parameter, passed on every construction unless a controller owns the name.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn window_width(mut self, width: u32) -> Self {
        self.settings.window_width = width;
        self
    }

    pub fn window_title(mut self, title: impl Into<String>) -> Self {
        self.settings.window_title = title.into();
        self
    }

    pub fn target_fps(mut self, fps: u32) -> Self {
        self.settings.target_fps = fps;
        self
    }

    pub fn rendering_step(mut self, step: u32) -> Self {
        self.settings.rendering_step = step;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.settings.visible = visible;
        self
    }

    pub fn settings(mut self, settings: CanvasSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<Canvas<M>, ConfigError> {
        self.settings.validate()?;
        if self.figures.len() > MAX_FIGURES {
            return Err(ConfigError::TooManyFigures(self.figures.len()));
        }
        Ok(Canvas {
            parts: Some(SceneParts {
                figures: self.figures,
                controllers: self.controllers,
                value_displays: self.value_displays,
                params: self.params,
            }),
            settings: self.settings,
            renderer: None,
        })
    }
}

/// A validated canvas. The renderer is created lazily by [`Canvas::setup`] or [`Canvas::show`].
pub struct Canvas<M: Model> {
    parts: Option<SceneParts<M>>,
    settings: CanvasSettings,
    renderer: Option<Renderer<M>>,
}

impl<M: Model> Canvas<M> {
    pub fn builder() -> CanvasBuilder<M> {
        CanvasBuilder {
            figures: Vec::new(),
            controllers: Vec::new(),
            value_displays: Vec::new(),
            params: Params::new(),
            settings: CanvasSettings::default(),
        }
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    /// Build the renderer and the first model. Later calls return the existing renderer.
    pub fn setup(&mut self) -> Result<&mut Renderer<M>, RenderError> {
        if let Some(parts) = self.parts.take() {
            let renderer = Renderer::setup(self.settings.clone(), parts)?;
            self.renderer = Some(renderer);
        }
        self.renderer.as_mut().ok_or_else(|| {
            RenderError::Config(ConfigError::InvalidSettings(
                "canvas renderer is missing".into(),
            ))
        })
    }

    pub fn renderer(&self) -> Option<&Renderer<M>> {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> Option<&mut Renderer<M>> {
        self.renderer.as_mut()
    }

    /// Run the terminal host until the operator quits (or the headless frame budget is spent).
    pub fn show(&mut self) -> Result<()> {
        self.show_with(&TerminalHost::default())
    }

    pub fn show_with(&mut self, host: &dyn Host<M>) -> Result<()> {
        let renderer = self.setup().context("failed to set up canvas")?;
        info!(
            host = host.name(),
            title = %renderer.settings().window_title,
            visible = renderer.settings().visible,
            "showing canvas"
        );
        host.run(HostContext { renderer })
    }
}
