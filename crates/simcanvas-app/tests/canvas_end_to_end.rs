use std::sync::{Mutex, OnceLock};

use anyhow::Result;
use serde::Deserialize;
use simcanvas_app::{Canvas, TerminalHost, demos};
use simcanvas_core::{
    Artist, CanvasSettings, ColorMap, Figure, Model, NumController, ParamValue, Params,
};
use simcanvas_models::{Schelling, SchellingAgent};
use tempfile::tempdir;
use tracing::Level;

static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvCleanup {
    keys: Vec<String>,
}

impl EnvCleanup {
    fn new() -> Self {
        Self { keys: Vec::new() }
    }

    fn set(&mut self, key: &str, value: &str) {
        unsafe {
            std::env::set_var(key, value);
        }
        self.keys.push(key.to_string());
    }
}

impl Drop for EnvCleanup {
    fn drop(&mut self) {
        for key in &self.keys {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct FrameStatsDto {
    tick: u64,
    playing: bool,
    rendering_step: u64,
    target_fps: u32,
    measured_fps: f64,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct ReportSummaryDto {
    frame_count: usize,
    ticks_simulated: u64,
    final_tick: u64,
    rendering_step: u64,
    target_fps: u32,
    final_primitives: usize,
}

#[derive(Debug, Deserialize)]
struct HeadlessReportDto {
    initial: FrameStatsDto,
    frames: Vec<FrameStatsDto>,
    summary: ReportSummaryDto,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("simcanvas_app=info,simcanvas_core=warn")
        .with_max_level(Level::INFO)
        .with_test_writer()
        .try_init();
}

fn headless(settings: CanvasSettings) -> CanvasSettings {
    CanvasSettings {
        visible: false,
        ..settings
    }
}

fn seeded(seed: i64) -> Params {
    let mut params = Params::new();
    params.insert("seed".into(), ParamValue::Int(seed));
    params
}

#[test]
fn headless_canvas_writes_report() -> Result<()> {
    let _env_guard = ENV_GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env guard");
    init_tracing();

    let frames = 24usize;
    let report_dir = tempdir()?;
    let report_path = report_dir.path().join("nested").join("report.json");

    let mut env = EnvCleanup::new();
    env.set("SIMCANVAS_HEADLESS_FRAMES", &frames.to_string());
    env.set(
        "SIMCANVAS_HEADLESS_REPORT",
        &report_path.to_string_lossy(),
    );

    let mut params = seeded(21);
    params.insert("num_nodes".into(), ParamValue::Int(40));
    let mut canvas = demos::virus(headless(CanvasSettings::default()), params)?;
    canvas.show()?;

    let report: HeadlessReportDto =
        serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    let summary = &report.summary;

    assert_eq!(
        summary.frame_count, frames,
        "headless host should honour requested frame budget"
    );
    assert_eq!(summary.final_tick, frames as u64);
    assert_eq!(
        summary.ticks_simulated,
        summary.final_tick.saturating_sub(report.initial.tick),
        "tick delta should align with simulated frames"
    );
    assert!(report.initial.playing, "headless run starts playing");
    assert_eq!(report.initial.tick, 0);
    for (index, frame) in report.frames.iter().enumerate() {
        assert_eq!(frame.tick, index as u64 + 1);
        assert!(frame.playing);
        assert_eq!(frame.target_fps, 40);
    }
    assert!(summary.final_primitives > 0, "scene should not be empty");

    let renderer = canvas.renderer().expect("renderer kept after show");
    assert_eq!(renderer.tick_count(), frames as u64);
    assert_eq!(renderer.model().agents().len(), 40);
    Ok(())
}

#[test]
fn headless_frame_budget_is_capped() -> Result<()> {
    let _env_guard = ENV_GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env guard");
    init_tracing();

    let report_dir = tempdir()?;
    let report_path = report_dir.path().join("report.json");
    let mut env = EnvCleanup::new();
    env.set("SIMCANVAS_HEADLESS_FRAMES", "100000");
    env.set(
        "SIMCANVAS_HEADLESS_REPORT",
        &report_path.to_string_lossy(),
    );

    let mut params = seeded(4);
    params.insert("width".into(), ParamValue::Int(10));
    params.insert("height".into(), ParamValue::Int(10));
    let mut canvas = demos::life(headless(CanvasSettings::default()), params)?;
    canvas.show()?;

    let report: HeadlessReportDto =
        serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(report.summary.frame_count, 360);
    Ok(())
}

#[test]
fn headless_rendering_step_is_reported() -> Result<()> {
    let _env_guard = ENV_GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env guard");
    init_tracing();

    let report_dir = tempdir()?;
    let report_path = report_dir.path().join("report.json");
    let mut env = EnvCleanup::new();
    env.set("SIMCANVAS_HEADLESS_FRAMES", "12");
    env.set(
        "SIMCANVAS_HEADLESS_REPORT",
        &report_path.to_string_lossy(),
    );

    let settings = CanvasSettings {
        rendering_step: 4,
        target_fps: 20,
        ..CanvasSettings::default()
    };
    let mut canvas = demos::boids(settings, seeded(8))?;
    assert!(canvas.settings().visible);
    canvas.show_with(&TerminalHost::headless())?;

    let report: HeadlessReportDto =
        serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(report.summary.rendering_step, 4);
    assert_eq!(report.summary.target_fps, 20);
    assert_eq!(report.summary.final_tick, 12);
    Ok(())
}

#[test]
fn schelling_density_scenario_through_canvas() -> Result<()> {
    let agents = Artist::cell_agents(
        |m: &Schelling| m.agents().iter().collect(),
        |a: &SchellingAgent| (a.x as f64, a.y as f64),
    )
    .shape("rect")
    .color_by(|a: &SchellingAgent| f64::from(a.kind))
    .color_map(ColorMap::categorical([(0, "blue"), (1, "red")]))
    .build()?;

    let mut canvas = Canvas::<Schelling>::builder()
        .plot(Figure::grid(Schelling::extent).artist(agents))
        .controller(NumController::float("density", 0.8, 0.1, 0.9, 0.1)?)
        .param("width", 100)
        .param("height", 100)
        .param("seed", 17)
        .rendering_step(1)
        .visible(false)
        .build()?;

    let renderer = canvas.setup()?;
    renderer.toggle_play();
    for _ in 0..10 {
        renderer.tick(1.0 / 40.0)?;
    }

    assert_eq!(renderer.tick_count(), 10);
    assert_eq!(
        renderer.controller("density").map(|c| c.value()),
        Some(ParamValue::Float(0.8))
    );
    assert_eq!(renderer.model().extent().width, 100.0);
    Ok(())
}

#[test]
fn direct_mutation_is_undone_by_reset() -> Result<()> {
    let mut params = seeded(6);
    params.insert("width".into(), ParamValue::Int(20));
    params.insert("height".into(), ParamValue::Int(20));
    let mut canvas = demos::schelling(headless(CanvasSettings::default()), params)?;
    let renderer = canvas.setup()?;

    assert!(renderer.increase("homophily"));
    renderer
        .model_mut()
        .set_attribute("homophily", &ParamValue::Float(0.9));
    renderer.reset()?;

    assert_eq!(
        renderer.model().attribute("homophily"),
        Some(ParamValue::Float(0.525))
    );
    assert_eq!(renderer.model().extent().width, 20.0);
    Ok(())
}
