use simcanvas_core::{
    Artist, CanvasSettings, ConfigError, DataCollector, Entity, EntityId, Figure, HistoryPlot,
    Model, ModelError, NumController, ParamValue, Params, ParamsExt, Primitive, RENDERING_STEP,
    RenderError, Renderer, Rgba, SceneParts, Series, SpaceExtent, UiAction, UiKey, ValueDisplay,
};

struct Particle {
    id: u64,
    x: i64,
    y: i64,
}

impl Entity for Particle {
    fn entity_id(&self) -> EntityId {
        EntityId(self.id)
    }
}

/// Grid of particles: each step spawns one particle and drops the oldest once full.
struct Drift {
    size: i64,
    capacity: usize,
    next_id: u64,
    particles: Vec<Particle>,
    collector: DataCollector,
}

impl Drift {
    fn spawn(&mut self) {
        let id = self.next_id;
        self.next_id += 1;
        let cell = id as i64 % (self.size * self.size);
        self.particles.push(Particle {
            id,
            x: cell % self.size,
            y: cell / self.size,
        });
        if self.particles.len() > self.capacity {
            self.particles.remove(0);
        }
        self.collector
            .record("population", self.particles.len() as f64);
    }
}

impl Model for Drift {
    fn from_params(params: &Params) -> Result<Self, ModelError> {
        let initial = params.usize_or("initial", 3)?;
        let capacity = params.usize_or("capacity", 5)?;
        if capacity == 0 {
            return Err(ModelError::InvalidParameter {
                name: "capacity".into(),
                reason: "must be positive".into(),
            });
        }
        let mut model = Self {
            size: params.i64_or("size", 10)?,
            capacity,
            next_id: 0,
            particles: Vec::new(),
            collector: DataCollector::with_series(["population"]),
        };
        for _ in 0..initial {
            model.spawn();
        }
        Ok(model)
    }

    fn step(&mut self) {
        self.spawn();
    }

    fn attribute(&self, name: &str) -> Option<ParamValue> {
        match name {
            "population" => Some(ParamValue::from(self.particles.len())),
            "capacity" => Some(ParamValue::from(self.capacity)),
            _ => None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: &ParamValue) -> bool {
        match (name, value.as_i64()) {
            ("capacity", Some(v)) if v > 0 => {
                self.capacity = v as usize;
                true
            }
            _ => false,
        }
    }

    fn collector(&self) -> Option<&DataCollector> {
        Some(&self.collector)
    }

    fn seed(&self) -> Option<u64> {
        Some(7)
    }
}

fn grid_figure() -> Figure<Drift> {
    let artist = Artist::cell_agents(
        |m: &Drift| m.particles.iter().collect(),
        |p: &Particle| (p.x as f64, p.y as f64),
    )
    .shape("circle")
    .color("orange")
    .build()
    .expect("artist");
    Figure::grid(|m: &Drift| SpaceExtent::new(m.size as f64, m.size as f64))
        .title("Drift")
        .artist(artist)
}

fn history_figure() -> Figure<Drift> {
    let plot = HistoryPlot::builder()
        .series(Series::collector("population"))
        .sampling_step(1)
        .legend(false)
        .build()
        .expect("plot");
    Figure::history(plot)
}

fn parts() -> SceneParts<Drift> {
    let mut params = Params::new();
    params.insert("initial".into(), ParamValue::from(3usize));
    SceneParts {
        figures: vec![grid_figure(), history_figure()],
        controllers: vec![
            NumController::int("capacity", 5, 1, 8, 1)
                .expect("controller")
                .into(),
        ],
        value_displays: vec![
            ValueDisplay::attribute("population")
                .update_step(1)
                .expect("step"),
        ],
        params,
    }
}

fn circles(renderer: &Renderer<Drift>) -> usize {
    renderer
        .render()
        .primitives()
        .iter()
        .filter(|p| matches!(p, Primitive::Circle { color, .. } if *color == Rgba::ORANGE))
        .count()
}

#[test]
fn sprites_follow_population_churn_while_playing() {
    let mut renderer = Renderer::setup(CanvasSettings::default(), parts()).expect("setup");
    assert_eq!(circles(&renderer), 3);

    renderer.apply(UiAction::TogglePlay).expect("play");
    for _ in 0..4 {
        renderer.tick(0.025).expect("tick");
    }
    assert_eq!(renderer.tick_count(), 4);
    assert_eq!(renderer.model().particles.len(), 5);
    assert_eq!(circles(&renderer), 5);
    assert_eq!(renderer.displays()[2].value_text(), "5");
}

#[test]
fn rendering_step_defers_figure_updates() {
    let mut renderer = Renderer::setup(CanvasSettings::default(), parts()).expect("setup");
    for _ in 0..2 {
        assert!(renderer.increase(RENDERING_STEP));
    }
    assert_eq!(renderer.rendering_step(), 3);

    renderer.toggle_play();
    renderer.tick(0.025).expect("tick");
    renderer.tick(0.025).expect("tick");
    assert_eq!(renderer.model().particles.len(), 5);
    assert_eq!(circles(&renderer), 3);

    renderer.tick(0.025).expect("tick");
    assert_eq!(circles(&renderer), 5);
}

#[test]
fn step_and_reset_keep_play_state() {
    let mut renderer = Renderer::setup(CanvasSettings::default(), parts()).expect("setup");
    renderer.on_key(UiKey::Char('s')).expect("step");
    assert_eq!(renderer.tick_count(), 1);
    assert!(!renderer.is_playing());
    assert_eq!(circles(&renderer), 4);

    renderer.on_key(UiKey::Space).expect("toggle");
    assert!(renderer.is_playing());
    renderer.tick(0.025).expect("tick");
    renderer.on_key(UiKey::Char('r')).expect("reset");
    assert_eq!(renderer.tick_count(), 0);
    assert!(renderer.is_playing());
    assert_eq!(renderer.model().particles.len(), 3);
    assert_eq!(circles(&renderer), 3);
}

#[test]
fn controller_change_survives_reset() {
    let mut renderer = Renderer::setup(CanvasSettings::default(), parts()).expect("setup");
    assert!(renderer.decrease("capacity"));
    assert!(renderer.decrease("capacity"));
    assert_eq!(renderer.model().capacity, 3);

    for _ in 0..4 {
        renderer.step().expect("step");
    }
    assert_eq!(renderer.model().particles.len(), 3);

    renderer.reset().expect("reset");
    assert_eq!(renderer.model().capacity, 3);
    assert_eq!(
        renderer.parameters().get("initial"),
        Some(&ParamValue::from(3usize))
    );
    assert!(!renderer.parameters().contains_key(RENDERING_STEP));
}

#[test]
fn history_plot_draws_sampled_series() {
    let mut renderer = Renderer::setup(CanvasSettings::default(), parts()).expect("setup");
    for _ in 0..3 {
        renderer.step().expect("step");
    }
    let scene = renderer.render();
    let strips = scene
        .primitives()
        .iter()
        .filter(|p| matches!(p, Primitive::LineStrip { .. }))
        .count();
    assert_eq!(strips, 1);
    assert!(scene.texts().any(|t| t == "3"));
}

#[test]
fn too_many_figures_is_rejected() {
    let mut parts = parts();
    parts.figures = (0..5).map(|_| grid_figure()).collect();
    let err = Renderer::setup(CanvasSettings::default(), parts)
        .err()
        .expect("five figures");
    assert!(matches!(
        err,
        RenderError::Config(ConfigError::TooManyFigures(5))
    ));
}

#[test]
fn model_construction_errors_surface() {
    let mut parts = parts();
    parts.params.insert("capacity".into(), ParamValue::from(0usize));
    parts.controllers.clear();
    let err = Renderer::setup(CanvasSettings::default(), parts)
        .err()
        .expect("capacity 0");
    assert!(matches!(err, RenderError::Model(_)));
}
