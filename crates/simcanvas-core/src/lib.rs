//! Core types shared across the simcanvas workspace.
//!
//! Everything in this crate is host-agnostic: figures, artists and widgets
//! emit [`Scene`] primitives in logical window pixels (origin bottom-left,
//! y up) and a host rasterizes them.

pub mod artist;
pub mod color;
pub mod controller;
pub mod display;
pub mod error;
pub mod figure;
pub mod history;
pub mod layout;
pub mod model;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod style;
pub mod widgets;

pub use artist::{Artist, ArtistBuilder, Shape, Sprite, SpriteKey};
pub use color::{ColorMap, ColorTable, Rgba, StyleError, parse_color};
pub use controller::{
    CatController, Controller, ModelTarget, NumController, ParameterTarget, RENDERING_STEP, StepDirection,
    TARGET_FPS, is_reserved,
};
pub use display::ValueDisplay;
pub use error::{ConfigError, RenderError};
pub use figure::{Component, Figure, FigureFrame, NetworkLayout, NetworkShape};
pub use history::{HistoryPlot, HistoryPlotBuilder, Series, rescale};
pub use layout::LayoutMetrics;
pub use model::{
    DataCollector, Entity, EntityId, Model, ModelError, ParamValue, Params, ParamsExt, SpaceExtent,
};
pub use renderer::{FpsMeter, FrameStats, Renderer, SceneParts};
pub use scene::{Point, Primitive, Rect, Scene};
pub use settings::CanvasSettings;
pub use style::{ButtonStyle, ButtonTheme, Theme};
pub use widgets::{UiAction, UiKey, WidgetId, WidgetManager};
