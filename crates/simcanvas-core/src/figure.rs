//! Rectangular panels that host artists or a history plot.

use ordered_float::OrderedFloat;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::artist::Artist;
use crate::color::{Rgba, parse_color};
use crate::error::{ConfigError, RenderError};
use crate::history::HistoryPlot;
use crate::model::{Entity, Model, SpaceExtent};
use crate::scene::{Point, Rect, Scene};

/// Nominal cell size used to size sprites on network figures.
pub const NETWORK_CELL_SIZE: f64 = 10.0;
const OUTLINE_WIDTH: f64 = 2.0;
const TITLE_GAP: f64 = 5.0;

/// Geometry shared with a figure's components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FigureFrame {
    pub rect: Rect,
    pub cell_width: f64,
    pub cell_height: f64,
    /// Normalized node positions in `[-1, 1]`, present on network figures.
    pub node_positions: Vec<Point>,
    pub edges: Vec<(usize, usize)>,
}

impl FigureFrame {
    /// Window position of a normalized network coordinate.
    pub fn network_point(&self, normalized: Point) -> Point {
        let r = self.rect;
        Point::new(
            normalized.x * r.width / 2.2 + r.x + r.width / 2.0,
            normalized.y * r.height / 2.2 + r.y + r.height / 2.0,
        )
    }
}

/// A figure child: artists and history plots.
pub trait Component<M> {
    fn setup(&mut self, frame: &FigureFrame, model: &M) -> Result<(), RenderError>;
    fn update(&mut self, frame: &FigureFrame, model: &M, tick: u64) -> Result<(), RenderError>;
    fn draw(&self, frame: &FigureFrame, scene: &mut Scene);
}

/// Node and edge structure of a network space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkShape {
    pub node_count: usize,
    pub edges: Vec<(usize, usize)>,
}

impl NetworkShape {
    pub fn from_graph<N, E>(graph: &UnGraph<N, E>) -> Self {
        Self {
            node_count: graph.node_count(),
            edges: graph
                .edge_references()
                .map(|e| (e.source().index(), e.target().index()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetworkLayout {
    Circular,
    /// Fruchterman–Reingold force layout.
    Spring { iterations: usize },
}

impl Default for NetworkLayout {
    fn default() -> Self {
        NetworkLayout::Spring { iterations: 50 }
    }
}

impl NetworkLayout {
    /// Node positions normalized so the largest absolute coordinate is 1.
    pub fn positions(&self, shape: &NetworkShape, seed: u64) -> Vec<Point> {
        let raw = match self {
            NetworkLayout::Circular => circular(shape.node_count),
            NetworkLayout::Spring { iterations } => spring(shape, *iterations, seed),
        };
        normalize(raw)
    }
}

fn circular(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / n.max(1) as f64;
            Point::new(angle.cos(), angle.sin())
        })
        .collect()
}

fn spring(shape: &NetworkShape, iterations: usize, seed: u64) -> Vec<Point> {
    let n = shape.node_count;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut pos: Vec<Point> = (0..n)
        .map(|_| Point::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
        .collect();
    if n < 2 {
        return pos;
    }

    let k = (4.0 / n as f64).sqrt();
    let mut temperature = 0.1;
    let cooling = temperature / (iterations as f64 + 1.0);
    let mut disp = vec![Point::default(); n];

    for _ in 0..iterations {
        disp.iter_mut().for_each(|d| *d = Point::default());
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = pos[i].x - pos[j].x;
                let dy = pos[i].y - pos[j].y;
                let dist = (dx * dx + dy * dy).sqrt().max(0.01);
                let force = k * k / dist;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[i].x += fx;
                disp[i].y += fy;
                disp[j].x -= fx;
                disp[j].y -= fy;
            }
        }
        for &(a, b) in &shape.edges {
            if a >= n || b >= n || a == b {
                continue;
            }
            let dx = pos[a].x - pos[b].x;
            let dy = pos[a].y - pos[b].y;
            let dist = (dx * dx + dy * dy).sqrt().max(0.01);
            let force = dist * dist / k;
            let (fx, fy) = (dx / dist * force, dy / dist * force);
            disp[a].x -= fx;
            disp[a].y -= fy;
            disp[b].x += fx;
            disp[b].y += fy;
        }
        for (p, d) in pos.iter_mut().zip(&disp) {
            let len = (d.x * d.x + d.y * d.y).sqrt().max(1e-9);
            let limited = len.min(temperature);
            p.x += d.x / len * limited;
            p.y += d.y / len * limited;
        }
        temperature -= cooling;
    }
    pos
}

fn normalize(mut points: Vec<Point>) -> Vec<Point> {
    if points.is_empty() {
        return points;
    }
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / points.len() as f64;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / points.len() as f64;
    let extent = points
        .iter()
        .map(|p| OrderedFloat((p.x - mean_x).abs().max((p.y - mean_y).abs())))
        .max()
        .map(|m| m.into_inner())
        .filter(|m| *m > 0.0)
        .unwrap_or(1.0);
    for p in &mut points {
        p.x = (p.x - mean_x) / extent;
        p.y = (p.y - mean_y) / extent;
    }
    points
}

type ExtentFn<M> = Box<dyn Fn(&M) -> SpaceExtent>;
type NetworkFn<M> = Box<dyn Fn(&M) -> NetworkShape>;

enum Space<M> {
    Grid(ExtentFn<M>),
    Continuous(ExtentFn<M>),
    Network {
        shape: NetworkFn<M>,
        layout: NetworkLayout,
    },
    Plain,
}

/// A panel on the canvas.
pub struct Figure<M> {
    space: Space<M>,
    background: Rgba,
    title: Option<String>,
    components: Vec<Box<dyn Component<M>>>,
    frame: FigureFrame,
}

impl<M: Model> Figure<M> {
    fn with_space(space: Space<M>, background: Rgba) -> Self {
        Self {
            space,
            background,
            title: None,
            components: Vec::new(),
            frame: FigureFrame::default(),
        }
    }

    /// Discrete grid space; sprites sit at cell centers.
    pub fn grid(extent: impl Fn(&M) -> SpaceExtent + 'static) -> Self {
        Self::with_space(Space::Grid(Box::new(extent)), Rgba::WHITE)
    }

    pub fn continuous(extent: impl Fn(&M) -> SpaceExtent + 'static) -> Self {
        Self::with_space(Space::Continuous(Box::new(extent)), Rgba::WHITE)
    }

    pub fn network<N, E>(graph: impl Fn(&M) -> &UnGraph<N, E> + 'static) -> Self
    where
        N: 'static,
        E: 'static,
    {
        let shape: NetworkFn<M> = Box::new(move |model: &M| NetworkShape::from_graph(graph(model)));
        Self::with_space(
            Space::Network {
                shape,
                layout: NetworkLayout::default(),
            },
            Rgba::WHITE,
        )
    }

    /// Plain panel holding a history plot.
    pub fn history(plot: HistoryPlot<M>) -> Self {
        Self::with_space(Space::Plain, Rgba::WHITESMOKE).component(plot)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn background(mut self, color: &str) -> Result<Self, ConfigError> {
        self.background = parse_color(color)?;
        Ok(self)
    }

    /// Choose the node layout of a network figure. Ignored elsewhere.
    pub fn layout(mut self, layout: NetworkLayout) -> Self {
        if let Space::Network { layout: slot, .. } = &mut self.space {
            *slot = layout;
        }
        self
    }

    pub fn artist<E: Entity + 'static>(self, artist: Artist<M, E>) -> Self {
        self.component(artist)
    }

    pub fn component(mut self, component: impl Component<M> + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn frame(&self) -> &FigureFrame {
        &self.frame
    }

    pub fn components(&self) -> &[Box<dyn Component<M>>] {
        &self.components
    }

    pub fn setup(&mut self, rect: Rect, model: &M) -> Result<(), RenderError> {
        let mut frame = FigureFrame {
            rect,
            cell_width: 1.0,
            cell_height: 1.0,
            ..FigureFrame::default()
        };
        match &self.space {
            Space::Grid(extent) | Space::Continuous(extent) => {
                let SpaceExtent { width, height } = extent(model);
                frame.cell_width = rect.width / width;
                frame.cell_height = rect.height / height;
            }
            Space::Network { shape, layout } => {
                let shape = shape(model);
                frame.cell_width = NETWORK_CELL_SIZE;
                frame.cell_height = NETWORK_CELL_SIZE;
                frame.node_positions = layout.positions(&shape, model.seed().unwrap_or(0));
                debug!(
                    nodes = shape.node_count,
                    edges = shape.edges.len(),
                    "network layout computed"
                );
                frame.edges = shape.edges;
            }
            Space::Plain => {}
        }
        self.frame = frame;
        for component in &mut self.components {
            component.setup(&self.frame, model)?;
        }
        Ok(())
    }

    pub fn update(&mut self, model: &M, tick: u64) -> Result<(), RenderError> {
        for component in &mut self.components {
            component.update(&self.frame, model, tick)?;
        }
        Ok(())
    }

    pub fn draw(&self, scene: &mut Scene) {
        let rect = self.frame.rect;
        scene.fill_rect(rect, self.background);
        for &(a, b) in &self.frame.edges {
            if let (Some(pa), Some(pb)) = (
                self.frame.node_positions.get(a),
                self.frame.node_positions.get(b),
            ) {
                scene.line(
                    self.frame.network_point(*pa),
                    self.frame.network_point(*pb),
                    Rgba::BLACK,
                    1.0,
                );
            }
        }
        for component in &self.components {
            component.draw(&self.frame, scene);
        }
        scene.outline_rect(rect, Rgba::BLACK, OUTLINE_WIDTH);
        if let Some(title) = &self.title {
            scene.text(
                Point::new(rect.x, rect.top() + TITLE_GAP),
                title.clone(),
                Rgba::BLACK,
                rect.height * 0.03,
            );
        }
    }
}
