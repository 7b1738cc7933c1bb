use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use simcanvas_app::{AppConfig, DemoKind, demos};
use simcanvas_core::ParamValue;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "simcanvas",
    version,
    about = "Interactive terminal canvas for agent-based simulations"
)]
struct Cli {
    /// Demo model to show; overrides the config file.
    #[arg(long, value_enum)]
    model: Option<DemoKind>,

    /// JSON config file with `model`, `canvas` and `params` sections.
    #[arg(long, env = "SIMCANVAS_CONFIG")]
    config: Option<PathBuf>,

    /// Logical window width; height is 0.6 of it.
    #[arg(long)]
    window_width: Option<u32>,

    #[arg(long)]
    target_fps: Option<u32>,

    /// Ticks simulated per figure refresh.
    #[arg(long)]
    rendering_step: Option<u32>,

    /// Run the off-screen frame loop instead of taking over the terminal.
    #[arg(long, env = "SIMCANVAS_HEADLESS", value_parser = clap::builder::FalseyValueParser::new())]
    headless: bool,

    /// Seed for the demo model.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let kind = cli.model.or(config.model).unwrap_or_default();

    let settings = &mut config.canvas;
    if let Some(width) = cli.window_width {
        settings.window_width = width;
    }
    if let Some(fps) = cli.target_fps {
        settings.target_fps = fps;
    }
    if let Some(step) = cli.rendering_step {
        settings.rendering_step = step;
    }
    if cli.headless {
        settings.visible = false;
    }
    settings.validate()?;

    if let Some(seed) = cli.seed {
        config
            .params
            .insert("seed".into(), ParamValue::Int(seed as i64));
    }

    info!(
        demo = ?kind,
        window_width = config.canvas.window_width,
        target_fps = config.canvas.target_fps,
        rendering_step = config.canvas.rendering_step,
        visible = config.canvas.visible,
        "Starting simcanvas"
    );
    demos::run(kind, config.canvas, config.params)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
