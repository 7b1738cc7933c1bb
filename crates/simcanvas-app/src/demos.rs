//! Ready-made canvases for the bundled demo models.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use simcanvas_core::{
    Artist, CanvasSettings, CatController, ColorMap, Figure, HistoryPlot, Model, NumController,
    ParamValue, Params, Series, ValueDisplay,
};
use simcanvas_models::{
    Boid, BoidFlockers, Cell, GameOfLife, Resource, Schelling, SchellingAgent, Sugarscape, Trader,
    VirusAgent, VirusOnNetwork, virus::SERIES,
};
use tracing::info;

use crate::canvas::Canvas;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoKind {
    #[default]
    Schelling,
    Boids,
    Virus,
    Life,
    Sugarscape,
}

impl DemoKind {
    pub fn title(self) -> &'static str {
        match self {
            DemoKind::Schelling => "Schelling segregation",
            DemoKind::Boids => "Boid flockers",
            DemoKind::Virus => "Virus on network",
            DemoKind::Life => "Game of Life",
            DemoKind::Sugarscape => "Sugarscape with traders",
        }
    }
}

/// Build and show the canvas for `kind`.
pub fn run(kind: DemoKind, mut settings: CanvasSettings, params: Params) -> Result<()> {
    if settings.window_title == CanvasSettings::default().window_title {
        settings.window_title = kind.title().to_string();
    }
    info!(demo = ?kind, params = params.len(), "launching demo");
    match kind {
        DemoKind::Schelling => schelling(settings, params)?.show(),
        DemoKind::Boids => boids(settings, params)?.show(),
        DemoKind::Virus => virus(settings, params)?.show(),
        DemoKind::Life => life(settings, params)?.show(),
        DemoKind::Sugarscape => sugarscape(settings, params)?.show(),
    }
}

/// Integer controller whose initial value may be overridden through `params`.
fn int_controller(
    params: &Params,
    name: &str,
    (value, min, max, step): (i64, i64, i64, i64),
) -> Result<NumController> {
    let value = params
        .get(name)
        .and_then(ParamValue::as_i64)
        .unwrap_or(value);
    NumController::int(name, value, min, max, step)
        .with_context(|| format!("invalid `{name}` override"))
}

fn float_controller(
    params: &Params,
    name: &str,
    (value, min, max, step): (f64, f64, f64, f64),
) -> Result<NumController> {
    let value = params
        .get(name)
        .and_then(ParamValue::as_f64)
        .unwrap_or(value);
    NumController::float(name, value, min, max, step)
        .with_context(|| format!("invalid `{name}` override"))
}

/// Dropdown controller; an override must be one of `options`.
fn cat_controller<const N: usize>(
    params: &Params,
    name: &str,
    value: impl Into<ParamValue>,
    options: [ParamValue; N],
) -> Result<CatController> {
    let value = params.get(name).cloned().unwrap_or_else(|| value.into());
    CatController::new(name, value, options).with_context(|| format!("invalid `{name}` override"))
}

fn finish<M: Model>(
    builder: crate::canvas::CanvasBuilder<M>,
    settings: CanvasSettings,
    params: Params,
) -> Result<Canvas<M>> {
    builder
        .settings(settings)
        .params(params)
        .build()
        .context("invalid canvas configuration")
}

pub fn schelling(settings: CanvasSettings, params: Params) -> Result<Canvas<Schelling>> {
    let agents = Artist::cell_agents(
        |m: &Schelling| m.agents().iter().collect(),
        |a: &SchellingAgent| (a.x as f64, a.y as f64),
    )
    .shape("rect")
    .color_by(|a: &SchellingAgent| f64::from(a.kind))
    .color_map(ColorMap::categorical([(0, "blue"), (1, "red")]))
    .build()?;
    let happy = HistoryPlot::builder()
        .series(Series::collector("happy"))
        .build()?;

    let builder = Canvas::builder()
        .plot(Figure::grid(Schelling::extent).artist(agents))
        .plot(Figure::history(happy))
        .controller(float_controller(&params, "density", (0.8, 0.1, 0.9, 0.1))?)
        .controller(float_controller(&params, "minority_pc", (0.2, 0.0, 1.0, 0.05))?)
        .controller(float_controller(&params, "homophily", (0.4, 0.0, 1.0, 0.125))?)
        .controller(int_controller(&params, "width", (100, 10, 200, 10))?)
        .controller(int_controller(&params, "height", (100, 10, 200, 10))?)
        .value_display(ValueDisplay::attribute("happy").label("Happy agents"));
    finish(builder, settings, params)
}

pub fn boids(settings: CanvasSettings, params: Params) -> Result<Canvas<BoidFlockers>> {
    let birds = Artist::continuous_agents(
        |m: &BoidFlockers| m.boids().iter().collect(),
        |b: &Boid| (b.x, b.y),
    )
    .build()?;

    let builder = Canvas::builder()
        .plot(Figure::continuous(BoidFlockers::extent).artist(birds))
        .controller(int_controller(&params, "population_size", (100, 10, 1000, 50))?)
        .controller(int_controller(&params, "speed", (5, 1, 20, 1))?)
        .controller(int_controller(&params, "vision", (10, 1, 50, 1))?)
        .controller(int_controller(&params, "separation", (2, 1, 20, 1))?)
        .value_display(ValueDisplay::attribute("boid_count").label("Boids"))
        .value_display(ValueDisplay::from_fn(|m: &BoidFlockers| {
            format!("{:.0}°", m.mean_heading().to_degrees())
        })
        .label("Mean heading"));
    finish(builder, settings, params)
}

pub fn virus(settings: CanvasSettings, params: Params) -> Result<Canvas<VirusOnNetwork>> {
    let nodes = Artist::network_agents(
        |m: &VirusOnNetwork| m.agents().iter().collect(),
        |a: &VirusAgent| a.node,
    )
    .color_by(|a: &VirusAgent| a.state.code() as f64)
    .color_map(ColorMap::categorical([(0, "green"), (1, "red"), (2, "blue")]))
    .build()?;
    let sir = SERIES
        .iter()
        .fold(HistoryPlot::builder(), |plot, name| {
            plot.series(Series::collector(*name))
        })
        .colors(["green", "red", "blue"])
        .build()?;

    let builder = Canvas::builder()
        .plot(Figure::network(VirusOnNetwork::graph).artist(nodes))
        .plot(Figure::history(sir))
        .controller(int_controller(&params, "num_nodes", (10, 10, 1000, 10))?)
        .controller(int_controller(&params, "avg_node_degree", (3, 1, 10, 1))?)
        .controller(
            int_controller(&params, "initial_outbreak_size", (1, 1, 10, 1))?
                .with_label("initial outbreak"),
        )
        .controller(float_controller(&params, "virus_spread_chance", (0.4, 0.0, 1.0, 0.1))?)
        .controller(
            float_controller(&params, "virus_check_frequency", (0.4, 0.0, 1.0, 0.1))?
                .with_label("virus check freq"),
        )
        .controller(float_controller(&params, "recovery_chance", (0.3, 0.0, 1.0, 0.1))?)
        .controller(
            float_controller(&params, "gain_resistance_chance", (0.5, 0.0, 1.0, 0.1))?
                .with_label("resistance prob."),
        )
        .value_display(ValueDisplay::from_fn(|m: &VirusOnNetwork| {
            match m.resistant_susceptible_ratio() {
                Some(ratio) => format!("{ratio:.2}"),
                None => "inf".to_string(),
            }
        })
        .label("Resistant/Susceptible"));
    finish(builder, settings, params)
}

pub fn life(settings: CanvasSettings, params: Params) -> Result<Canvas<GameOfLife>> {
    let cells = Artist::cells(
        |m: &GameOfLife| m.cells().iter().collect(),
        |c: &Cell| (c.x as f64, c.y as f64),
    )
    .color_by(|c: &Cell| f64::from(c.state()))
    .color_map(ColorMap::categorical([(0, "white"), (1, "black")]))
    .build()?;

    let builder = Canvas::builder()
        .plot(Figure::grid(GameOfLife::extent).artist(cells))
        .controller(float_controller(&params, "initial_fraction_alive", (0.5, 0.0, 1.0, 0.1))?)
        .controller(int_controller(&params, "width", (50, 10, 200, 10))?)
        .controller(int_controller(&params, "height", (50, 10, 200, 10))?)
        .value_display(ValueDisplay::attribute("alive").label("Alive"));
    finish(builder, settings, params)
}

pub fn sugarscape(settings: CanvasSettings, params: Params) -> Result<Canvas<Sugarscape>> {
    let resource = |value: fn(&Resource) -> f64, map: &str| {
        Artist::cells(
            |m: &Sugarscape| m.resources().iter().collect(),
            |r: &Resource| (r.x as f64, r.y as f64),
        )
        .color_by(value)
        .color_map(ColorMap::named(map))
        .color_range(0.0, 4.0)
        .jitter(true)
        .size(0.5)
        .filter(move |r| value(r) > 0.0)
        .build()
    };
    let sugar = resource(|r| r.sugar, "Greens")?;
    let spice = resource(|r| r.spice, "Reds")?;
    let traders = Artist::cell_agents(
        |m: &Sugarscape| m.traders().iter().collect(),
        |t: &Trader| (t.x as f64, t.y as f64),
    )
    .build()?;

    let price = HistoryPlot::builder().series(Series::collector("Price")).build()?;
    let volume = HistoryPlot::builder()
        .series(Series::collector("#Traders"))
        .series(Series::collector("Trade Volume"))
        .build()?;

    let builder = Canvas::builder()
        .plot(
            Figure::grid(Sugarscape::extent)
                .artist(sugar)
                .artist(spice)
                .artist(traders),
        )
        .plot(Figure::history(price))
        .plot(Figure::history(volume))
        .controller(int_controller(&params, "initial_population", (200, 50, 500, 10))?)
        .controller(int_controller(&params, "endowment_min", (50, 30, 100, 1))?)
        .controller(int_controller(&params, "endowment_max", (50, 30, 100, 1))?)
        .controller(int_controller(&params, "metabolism_min", (1, 1, 3, 1))?)
        .controller(int_controller(&params, "metabolism_max", (5, 3, 8, 1))?)
        .controller(cat_controller(
            &params,
            "enable_trade",
            true,
            [ParamValue::Bool(true), ParamValue::Bool(false)],
        )?)
        .controller(int_controller(&params, "vision_min", (1, 1, 3, 1))?)
        .controller(int_controller(&params, "vision_max", (5, 3, 8, 1))?)
        .value_display(ValueDisplay::attribute("traders").label("Traders"))
        .value_display(
            ValueDisplay::from_fn(|m: &Sugarscape| match m.price() {
                Some(price) => format!("{price:.2}"),
                None => "-".to_string(),
            })
            .label("Price"),
        );
    finish(builder, settings, params)
}
