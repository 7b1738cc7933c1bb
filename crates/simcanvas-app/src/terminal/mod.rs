use std::{
    fs::{self, File},
    io::{self, Stdout},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use serde::Serialize;
use simcanvas_core::{FrameStats, Model, Point, Renderer, Rgba, UiKey};
use supports_color::{ColorLevel, Stream, on_cached};
use tracing::{debug, info};

use crate::host::{Host, HostContext};

mod raster;

pub use raster::{Raster, RasterCell};

const DEFAULT_HEADLESS_FRAMES: usize = 12;
const MAX_HEADLESS_FRAMES: usize = 360;
const HEADLESS_SIZE: (u16, u16) = (80, 36);
const HEADER_HEIGHT: u16 = 3;

/// Hosts a renderer in the terminal, or on an off-screen backend when headless.
#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    force_headless: bool,
}

impl TerminalHost {
    pub fn headless() -> Self {
        Self {
            force_headless: true,
        }
    }

    fn wants_headless<M: Model>(&self, renderer: &Renderer<M>) -> bool {
        self.force_headless
            || !renderer.settings().visible
            || std::env::var_os("SIMCANVAS_HEADLESS").is_some_and(|v| !v.is_empty() && v != "0")
    }
}

impl<M: Model> Host<M> for TerminalHost {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn run(&self, ctx: HostContext<'_, M>) -> Result<()> {
        if self.wants_headless(ctx.renderer) {
            let report = self.run_headless(ctx)?;
            info!(
                target = "simcanvas::terminal",
                frames = report.summary.frame_count,
                ticks_simulated = report.summary.ticks_simulated,
                final_tick = report.summary.final_tick,
                rendering_step = report.summary.rendering_step,
                primitives = report.summary.final_primitives,
                "Terminal headless run completed"
            );
            return Ok(());
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to build terminal backend")?;
        terminal.hide_cursor().ok();

        let result = run_event_loop(&mut terminal, ctx);

        terminal.show_cursor().ok();
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(
            terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        ) {
            tracing::error!(?err, "failed to leave alternate screen");
        }

        result
    }
}

fn run_event_loop<M: Model>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ctx: HostContext<'_, M>,
) -> Result<()> {
    let mut app = TerminalApp::new(ctx, Palette::detect());
    terminal.draw(|frame| app.draw(frame))?;

    loop {
        let now = Instant::now();
        let interval = app.frame_interval();
        let elapsed = now.duration_since(app.last_frame);
        if elapsed >= interval {
            app.advance(elapsed.as_secs_f64())?;
            terminal.draw(|frame| app.draw(frame))?;
            app.last_frame = now;
        }

        let timeout = interval.saturating_sub(Instant::now().duration_since(app.last_frame));
        if event::poll(timeout).context("failed to poll terminal events")? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key)? {
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse)?,
                _ => {}
            }
        }
    }

    info!(tick = app.renderer.tick_count(), "terminal session closed");
    Ok(())
}

impl TerminalHost {
    fn run_headless<M: Model>(&self, ctx: HostContext<'_, M>) -> Result<HeadlessReport> {
        let backend = ratatui::backend::TestBackend::new(HEADLESS_SIZE.0, HEADLESS_SIZE.1);
        let mut terminal = Terminal::new(backend).context("failed to build test backend")?;
        let mut app = TerminalApp::new(ctx, Palette::detect());
        if !app.renderer.is_playing() {
            app.renderer.toggle_play();
        }
        let mut report = HeadlessReport::new(app.renderer.frame_stats());
        let frames = headless_frame_budget();

        for _ in 0..frames {
            let dt = 1.0 / f64::from(app.renderer.target_fps().max(1));
            app.advance(dt)?;
            terminal.draw(|frame| app.draw(frame))?;
            report.record(app.renderer.frame_stats(), app.primitives);
        }

        report.finalize();

        if let Some(path) = report_file_path_from_env() {
            report.write_json(&path).with_context(|| {
                format!("failed to write headless report to {}", path.display())
            })?;
        }

        Ok(report)
    }
}

fn headless_frame_budget() -> usize {
    std::env::var("SIMCANVAS_HEADLESS_FRAMES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .map(|value| value.min(MAX_HEADLESS_FRAMES))
        .unwrap_or(DEFAULT_HEADLESS_FRAMES)
}

fn report_file_path_from_env() -> Option<PathBuf> {
    std::env::var_os("SIMCANVAS_HEADLESS_REPORT").and_then(|raw| {
        if raw.is_empty() {
            None
        } else {
            Some(PathBuf::from(raw))
        }
    })
}

struct TerminalApp<'a, M: Model> {
    renderer: &'a mut Renderer<M>,
    palette: Palette,
    last_frame: Instant,
    canvas_area: Rect,
    raster: Option<Raster>,
    primitives: usize,
}

impl<'a, M: Model> TerminalApp<'a, M> {
    fn new(ctx: HostContext<'a, M>, palette: Palette) -> Self {
        Self {
            renderer: ctx.renderer,
            palette,
            last_frame: Instant::now(),
            canvas_area: Rect::default(),
            raster: None,
            primitives: 0,
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.renderer.target_fps().max(1)))
    }

    fn advance(&mut self, dt: f64) -> Result<()> {
        self.renderer
            .tick(dt)
            .context("simulation tick failed")
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(0)])
            .split(frame.area());

        self.draw_header(frame, outer[0]);
        self.draw_canvas(frame, outer[1]);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let stats = self.renderer.frame_stats();
        let (state, style) = if stats.playing {
            (" RUNNING ", self.palette.running_style())
        } else {
            (" PAUSED ", self.palette.paused_style())
        };
        let line = Line::from(vec![
            Span::styled(state, style),
            Span::raw(format!(
                "  tick {}  fps {:.0}/{}  step {}",
                stats.tick, stats.measured_fps, stats.target_fps, stats.rendering_step
            )),
            Span::styled(
                "  space play · s step · r reset · tab focus · q quit",
                self.palette.hint_style(),
            ),
        ]);
        let block = Block::default()
            .title(self.palette.title(self.renderer.settings().window_title.clone()))
            .borders(Borders::ALL);
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_canvas(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.canvas_area = inner;

        if inner.width < 2 || inner.height < 2 {
            self.raster = None;
            return;
        }

        let scene = self.renderer.render();
        self.primitives = scene.len();
        let raster = Raster::paint(&scene, inner.width, inner.height);

        let mut lines = Vec::with_capacity(raster.rows());
        for row in 0..raster.rows() {
            let spans: Vec<Span> = (0..raster.cols())
                .filter_map(|col| raster.cell(col, row))
                .map(|cell| self.palette.cell_span(cell))
                .collect();
            lines.push(Line::from(spans));
        }
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
        self.raster = Some(raster);
    }

    /// Returns `Ok(true)` when the session should end.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _)
            | (KeyCode::Char('q'), _)
            | (KeyCode::Char('Q'), _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Ok(true),
            _ => {}
        }
        if let Some(ui_key) = map_key(key) {
            self.renderer
                .on_key(ui_key)
                .context("failed to apply key input")?;
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        let Some(p) = self.logical_point(mouse.column, mouse.row) else {
            return Ok(());
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.renderer.on_mouse_press(p.x, p.y),
            MouseEventKind::Drag(MouseButton::Left) => self.renderer.on_mouse_drag(p.x, p.y),
            MouseEventKind::Up(MouseButton::Left) => self.renderer.on_mouse_release(p.x, p.y),
            MouseEventKind::Moved => {
                self.renderer.on_mouse_move(p.x, p.y);
                Ok(())
            }
            _ => Ok(()),
        }
        .context("failed to apply mouse input")
    }

    fn logical_point(&self, column: u16, row: u16) -> Option<Point> {
        let area = self.canvas_area;
        let inside = column >= area.x
            && row >= area.y
            && column < area.x + area.width
            && row < area.y + area.height;
        if !inside {
            return None;
        }
        let p = self
            .raster
            .as_ref()?
            .to_logical(column - area.x, row - area.y);
        debug!(column, row, x = p.x, y = p.y, "mouse mapped to canvas");
        Some(p)
    }
}

fn map_key(key: KeyEvent) -> Option<UiKey> {
    let ui = match key.code {
        KeyCode::Char(' ') => UiKey::Space,
        KeyCode::Char(c) => UiKey::Char(c),
        KeyCode::Tab => UiKey::Tab,
        KeyCode::BackTab => UiKey::BackTab,
        KeyCode::Left => UiKey::Left,
        KeyCode::Right => UiKey::Right,
        KeyCode::Up => UiKey::Up,
        KeyCode::Down => UiKey::Down,
        _ => return None,
    };
    Some(ui)
}

#[derive(Debug, Clone, Serialize)]
struct HeadlessReport {
    initial: FrameStats,
    frames: Vec<FrameStats>,
    summary: ReportSummary,
    #[serde(skip)]
    primitives: Vec<usize>,
}

impl HeadlessReport {
    fn new(initial: FrameStats) -> Self {
        Self {
            initial,
            frames: Vec::new(),
            summary: ReportSummary::default(),
            primitives: Vec::new(),
        }
    }

    fn record(&mut self, stats: FrameStats, primitives: usize) {
        self.frames.push(stats);
        self.primitives.push(primitives);
    }

    fn finalize(&mut self) {
        let last = self.frames.last().copied().unwrap_or(self.initial);
        self.summary = ReportSummary {
            frame_count: self.frames.len(),
            ticks_simulated: last.tick.saturating_sub(self.initial.tick),
            final_tick: last.tick,
            rendering_step: last.rendering_step,
            target_fps: last.target_fps,
            final_primitives: self.primitives.last().copied().unwrap_or(0),
        };
    }

    fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).context("failed to serialize headless report")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct ReportSummary {
    frame_count: usize,
    ticks_simulated: u64,
    final_tick: u64,
    rendering_step: u64,
    target_fps: u32,
    final_primitives: usize,
}

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

const BASIC: [(Color, [u8; 3]); 16] = [
    (Color::Black, [0, 0, 0]),
    (Color::Red, [128, 0, 0]),
    (Color::Green, [0, 128, 0]),
    (Color::Yellow, [128, 128, 0]),
    (Color::Blue, [0, 0, 128]),
    (Color::Magenta, [128, 0, 128]),
    (Color::Cyan, [0, 128, 128]),
    (Color::Gray, [192, 192, 192]),
    (Color::DarkGray, [128, 128, 128]),
    (Color::LightRed, [255, 0, 0]),
    (Color::LightGreen, [0, 255, 0]),
    (Color::LightYellow, [255, 255, 0]),
    (Color::LightBlue, [0, 0, 255]),
    (Color::LightMagenta, [255, 0, 255]),
    (Color::LightCyan, [0, 255, 255]),
    (Color::White, [255, 255, 255]),
];

struct Palette {
    level: Option<ColorLevel>,
}

impl Palette {
    fn detect() -> Self {
        Self {
            level: on_cached(Stream::Stdout),
        }
    }

    fn header_style(&self) -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    fn hint_style(&self) -> Style {
        Style::default().fg(Color::DarkGray)
    }

    fn paused_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    fn running_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    fn title<T: Into<String>>(&self, title: T) -> Span<'static> {
        Span::styled(title.into(), self.header_style())
    }

    fn has_color(&self) -> bool {
        self.level.is_some()
    }

    fn color(&self, c: Rgba) -> Color {
        match self.level {
            Some(level) if level.has_16m => Color::Rgb(c.r(), c.g(), c.b()),
            Some(level) if level.has_256 => Color::Indexed(ansi256(c)),
            Some(_) => nearest_basic(c),
            None => Color::Reset,
        }
    }

    fn cell_span(&self, cell: RasterCell) -> Span<'static> {
        if !self.has_color() {
            let ch = match cell.glyph {
                Some((ch, _)) => ch,
                None => {
                    let dark = 255.0 - (luminance(cell.top) + luminance(cell.bottom)) / 2.0;
                    SHADES[((dark / 256.0) * SHADES.len() as f64) as usize % SHADES.len()]
                }
            };
            return Span::raw(ch.to_string());
        }
        match cell.glyph {
            Some((ch, color)) => Span::styled(
                ch.to_string(),
                Style::default().fg(self.color(color)).bg(self.color(cell.top)),
            ),
            None if cell.top == cell.bottom => {
                Span::styled(" ", Style::default().bg(self.color(cell.top)))
            }
            None => Span::styled(
                "▀",
                Style::default()
                    .fg(self.color(cell.top))
                    .bg(self.color(cell.bottom)),
            ),
        }
    }
}

fn luminance(c: Rgba) -> f64 {
    0.2126 * f64::from(c.r()) + 0.7152 * f64::from(c.g()) + 0.0722 * f64::from(c.b())
}

/// Map to the xterm 256-color palette: grayscale ramp for neutral colors, 6x6x6 cube otherwise.
fn ansi256(c: Rgba) -> u8 {
    let (r, g, b) = (c.r(), c.g(), c.b());
    if r == g && g == b {
        return match r {
            0..=7 => 16,
            249..=255 => 231,
            v => 232 + ((f64::from(v) - 8.0) / 247.0 * 24.0).round().min(23.0) as u8,
        };
    }
    let q = |v: u8| (f64::from(v) / 255.0 * 5.0).round() as u8;
    16 + 36 * q(r) + 6 * q(g) + q(b)
}

fn nearest_basic(c: Rgba) -> Color {
    let distance = |rgb: &[u8; 3]| {
        let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
        d(c.r(), rgb[0]) + d(c.g(), rgb[1]) + d(c.b(), rgb[2])
    };
    BASIC
        .iter()
        .min_by_key(|(_, rgb)| distance(rgb))
        .map_or(Color::Reset, |(color, _)| *color)
}
