//! Canvas façade and terminal host for simcanvas.

pub mod canvas;
pub mod config;
pub mod demos;
pub mod terminal;

pub mod host {
    use anyhow::Result;
    use simcanvas_core::{Model, Renderer};

    /// Shared context passed to host implementations.
    pub struct HostContext<'a, M: Model> {
        pub renderer: &'a mut Renderer<M>,
    }

    pub trait Host<M: Model> {
        /// Stable identifier describing the host implementation (e.g., "terminal").
        fn name(&self) -> &'static str;

        /// Drive the renderer; blocks until the session completes.
        fn run(&self, ctx: HostContext<'_, M>) -> Result<()>;
    }
}

pub use canvas::{Canvas, CanvasBuilder};
pub use config::AppConfig;
pub use demos::DemoKind;
pub use terminal::TerminalHost;
