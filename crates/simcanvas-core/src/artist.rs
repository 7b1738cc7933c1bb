//! Artists map a population of simulation entities onto sprites.
//!
//! Each artist owns a slotmap arena of sprites plus an index from the stable
//! [`EntityId`] of the entity it represents. Population churn, color and
//! position refreshes are driven from [`Component::update`].

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use slotmap::{SlotMap, new_key_type};
use tracing::debug;

use crate::color::{ColorMap, ColorTable, Rgba, parse_color};
use crate::error::{ConfigError, RenderError};
use crate::figure::{Component, FigureFrame};
use crate::model::{Entity, EntityId, Model};
use crate::scene::{Point, Rect, Scene};

new_key_type! {
    /// Handle into an artist's sprite arena.
    pub struct SpriteKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rect,
    Circle,
}

impl FromStr for Shape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rect" => Ok(Shape::Rect),
            "circle" => Ok(Shape::Circle),
            _ => Err(ConfigError::InvalidShape(s.to_string())),
        }
    }
}

/// Visual state of one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub entity: EntityId,
    pub center: Point,
    pub color: Rgba,
    /// Offset fixed at creation and reapplied on every position refresh.
    pub jitter: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    CellCenter,
    Continuous,
    NetworkNode,
}

type PopulationFn<M, E> = Box<dyn for<'a> Fn(&'a M) -> Vec<&'a E>>;
type CoordinateFn<E> = Box<dyn Fn(&E) -> (f64, f64)>;
type NodeFn<E> = Box<dyn Fn(&E) -> usize>;
type SelectorFn<E> = Box<dyn Fn(&E) -> bool>;
type ValueFn<E> = Box<dyn Fn(&E) -> f64>;

enum Locator<E> {
    Coordinates(CoordinateFn<E>),
    Node(NodeFn<E>),
}

enum ColorSource<E> {
    Fixed(Rgba),
    Mapped { value: ValueFn<E>, table: ColorTable },
}

/// Configuration collected before an [`Artist`] is validated.
pub struct ArtistBuilder<M, E> {
    population: PopulationFn<M, E>,
    locator: Locator<E>,
    placement: Placement,
    selector: Option<SelectorFn<E>>,
    color: String,
    color_value: Option<ValueFn<E>>,
    color_map: ColorMap,
    shape: String,
    size: f64,
    jitter: bool,
    dynamic_color: bool,
    dynamic_position: bool,
    dynamic_population: bool,
}

impl<M, E> ArtistBuilder<M, E> {
    fn new(
        population: PopulationFn<M, E>,
        locator: Locator<E>,
        placement: Placement,
        shape: &str,
        size: f64,
        color: &str,
    ) -> Self {
        Self {
            population,
            locator,
            placement,
            selector: None,
            color: color.to_string(),
            color_value: None,
            color_map: ColorMap::named("bwr"),
            shape: shape.to_string(),
            size,
            jitter: false,
            dynamic_color: true,
            dynamic_position: true,
            dynamic_population: true,
        }
    }

    /// Fixed sprite color (named, single-letter or hex).
    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self.color_value = None;
        self
    }

    /// Color each sprite by a numeric entity value looked up in the color map.
    pub fn color_by(mut self, value: impl Fn(&E) -> f64 + 'static) -> Self {
        self.color_value = Some(Box::new(value));
        self
    }

    pub fn color_map(mut self, map: ColorMap) -> Self {
        self.color_map = map;
        self
    }

    /// Normalization bounds for a continuous color map.
    pub fn color_range(mut self, vmin: f64, vmax: f64) -> Self {
        self.color_map = self.color_map.with_bounds(vmin, vmax);
        self
    }

    pub fn shape(mut self, shape: &str) -> Self {
        self.shape = shape.to_string();
        self
    }

    /// Sprite size in cells.
    pub fn size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn filter(mut self, selector: impl Fn(&E) -> bool + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    pub fn dynamic_color(mut self, enabled: bool) -> Self {
        self.dynamic_color = enabled;
        self
    }

    pub fn dynamic_position(mut self, enabled: bool) -> Self {
        self.dynamic_position = enabled;
        self
    }

    pub fn dynamic_population(mut self, enabled: bool) -> Self {
        self.dynamic_population = enabled;
        self
    }

    pub fn build(self) -> Result<Artist<M, E>, ConfigError> {
        let shape = self.shape.parse::<Shape>()?;
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ConfigError::InvalidSize(self.size));
        }
        let color = match self.color_value {
            None => ColorSource::Fixed(parse_color(&self.color)?),
            Some(value) => ColorSource::Mapped {
                value,
                table: ColorTable::build(&self.color_map)?,
            },
        };
        Ok(Artist {
            population: self.population,
            locator: self.locator,
            placement: self.placement,
            selector: self.selector,
            color,
            shape,
            size: self.size,
            jitter: self.jitter,
            dynamic_color: self.dynamic_color,
            dynamic_position: self.dynamic_position,
            dynamic_population: self.dynamic_population,
            sprites: SlotMap::with_key(),
            index: HashMap::new(),
            sprite_size: (1.0, 1.0),
            rng: SmallRng::seed_from_u64(0),
        })
    }
}

pub struct Artist<M, E> {
    population: PopulationFn<M, E>,
    locator: Locator<E>,
    placement: Placement,
    selector: Option<SelectorFn<E>>,
    color: ColorSource<E>,
    shape: Shape,
    size: f64,
    jitter: bool,
    dynamic_color: bool,
    dynamic_position: bool,
    dynamic_population: bool,
    sprites: SlotMap<SpriteKey, Sprite>,
    index: HashMap<EntityId, SpriteKey>,
    sprite_size: (f64, f64),
    rng: SmallRng,
}

impl<M, E> Artist<M, E> {
    /// Agents on a discrete grid: black circles one cell wide.
    pub fn cell_agents(
        population: impl for<'a> Fn(&'a M) -> Vec<&'a E> + 'static,
        coordinates: impl Fn(&E) -> (f64, f64) + 'static,
    ) -> ArtistBuilder<M, E> {
        ArtistBuilder::new(
            Box::new(population),
            Locator::Coordinates(Box::new(coordinates)),
            Placement::CellCenter,
            "circle",
            1.0,
            "black",
        )
    }

    /// Grid cells: grey rectangles that never move.
    pub fn cells(
        population: impl for<'a> Fn(&'a M) -> Vec<&'a E> + 'static,
        coordinates: impl Fn(&E) -> (f64, f64) + 'static,
    ) -> ArtistBuilder<M, E> {
        ArtistBuilder::new(
            Box::new(population),
            Locator::Coordinates(Box::new(coordinates)),
            Placement::CellCenter,
            "rect",
            1.0,
            "grey",
        )
        .dynamic_position(false)
    }

    pub fn continuous_agents(
        population: impl for<'a> Fn(&'a M) -> Vec<&'a E> + 'static,
        position: impl Fn(&E) -> (f64, f64) + 'static,
    ) -> ArtistBuilder<M, E> {
        ArtistBuilder::new(
            Box::new(population),
            Locator::Coordinates(Box::new(position)),
            Placement::Continuous,
            "circle",
            2.0,
            "black",
        )
    }

    /// Network nodes themselves: each entity's id is its node index.
    pub fn network_nodes(
        population: impl for<'a> Fn(&'a M) -> Vec<&'a E> + 'static,
    ) -> ArtistBuilder<M, E>
    where
        E: Entity + 'static,
    {
        ArtistBuilder::new(
            Box::new(population),
            Locator::Node(Box::new(|e: &E| e.entity_id().0 as usize)),
            Placement::NetworkNode,
            "circle",
            2.0,
            "black",
        )
    }

    /// Agents sitting on network nodes, located through `node`.
    pub fn network_agents(
        population: impl for<'a> Fn(&'a M) -> Vec<&'a E> + 'static,
        node: impl Fn(&E) -> usize + 'static,
    ) -> ArtistBuilder<M, E> {
        ArtistBuilder::new(
            Box::new(population),
            Locator::Node(Box::new(node)),
            Placement::NetworkNode,
            "circle",
            2.0,
            "black",
        )
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Sprite width and height in window pixels.
    pub fn sprite_size(&self) -> (f64, f64) {
        self.sprite_size
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn sprite(&self, entity: EntityId) -> Option<&Sprite> {
        self.index.get(&entity).and_then(|key| self.sprites.get(*key))
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.sprites.values()
    }
}

impl<M, E: Entity> Artist<M, E> {
    fn select<'a>(&self, model: &'a M) -> Vec<&'a E> {
        let mut entities = (self.population)(model);
        if let Some(selector) = &self.selector {
            entities.retain(|e| selector(e));
        }
        entities
    }

    fn color_for(&self, entity: &E) -> Result<Rgba, RenderError> {
        match &self.color {
            ColorSource::Fixed(color) => Ok(*color),
            ColorSource::Mapped { value, table } => Ok(table.lookup(value(entity))?),
        }
    }

    fn position_for(
        &self,
        frame: &FigureFrame,
        entity: &E,
        jitter: Point,
    ) -> Result<Point, RenderError> {
        let base = match (&self.locator, self.placement) {
            (Locator::Coordinates(coords), Placement::CellCenter) => {
                let (x, y) = coords(entity);
                Point::new(
                    x * frame.cell_width + frame.rect.x + frame.cell_width / 2.0,
                    y * frame.cell_height + frame.rect.y + frame.cell_height / 2.0,
                )
            }
            (Locator::Coordinates(coords), _) => {
                let (x, y) = coords(entity);
                Point::new(
                    x * frame.cell_width + frame.rect.x,
                    y * frame.cell_height + frame.rect.y,
                )
            }
            (Locator::Node(node), _) => {
                let index = node(entity);
                let normalized = frame
                    .node_positions
                    .get(index)
                    .ok_or(RenderError::MissingNode(index))?;
                frame.network_point(*normalized)
            }
        };
        Ok(Point::new(base.x + jitter.x, base.y + jitter.y))
    }

    fn spawn(&mut self, frame: &FigureFrame, entity: &E) -> Result<(), RenderError> {
        let jitter = if self.jitter {
            Point::new(
                (self.rng.random::<f64>() - 0.5) * frame.cell_width,
                (self.rng.random::<f64>() - 0.5) * frame.cell_height,
            )
        } else {
            Point::default()
        };
        let sprite = Sprite {
            entity: entity.entity_id(),
            center: self.position_for(frame, entity, jitter)?,
            color: self.color_for(entity)?,
            jitter,
        };
        let key = self.sprites.insert(sprite);
        if let Some(stale) = self.index.insert(sprite.entity, key) {
            self.sprites.remove(stale);
        }
        Ok(())
    }
}

impl<M: Model, E: Entity> Component<M> for Artist<M, E> {
    fn setup(&mut self, frame: &FigureFrame, model: &M) -> Result<(), RenderError> {
        self.sprites.clear();
        self.index.clear();
        self.rng = match model.seed() {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        let (w, h) = (frame.cell_width * self.size, frame.cell_height * self.size);
        self.sprite_size = match self.shape {
            Shape::Rect => (w.max(1.0), h.max(1.0)),
            Shape::Circle => {
                let diameter = (w.min(h) / 2.0).max(1.0) * 2.0;
                (diameter, diameter)
            }
        };

        for entity in self.select(model) {
            self.spawn(frame, entity)?;
        }
        debug!(sprites = self.sprites.len(), "artist set up");
        Ok(())
    }

    fn update(&mut self, frame: &FigureFrame, model: &M, _tick: u64) -> Result<(), RenderError> {
        if self.dynamic_population {
            let selected = self.select(model);
            let live: HashSet<EntityId> = selected.iter().map(|e| e.entity_id()).collect();
            let stale: Vec<EntityId> = self
                .index
                .keys()
                .filter(|id| !live.contains(*id))
                .copied()
                .collect();
            for id in &stale {
                if let Some(key) = self.index.remove(id) {
                    self.sprites.remove(key);
                }
            }
            let mut added = 0usize;
            for entity in &selected {
                if !self.index.contains_key(&entity.entity_id()) {
                    self.spawn(frame, entity)?;
                    added += 1;
                }
            }
            if added > 0 || !stale.is_empty() {
                debug!(added, removed = stale.len(), "artist population churn");
            }
        }

        if !(self.dynamic_color || self.dynamic_position) {
            return Ok(());
        }
        // every entity that owns a sprite, whether or not it still passes the filter
        for entity in (self.population)(model) {
            let Some(&key) = self.index.get(&entity.entity_id()) else {
                continue;
            };
            let Some(jitter) = self.sprites.get(key).map(|s| s.jitter) else {
                continue;
            };
            let color = if self.dynamic_color {
                Some(self.color_for(entity)?)
            } else {
                None
            };
            let center = if self.dynamic_position {
                Some(self.position_for(frame, entity, jitter)?)
            } else {
                None
            };
            if let Some(sprite) = self.sprites.get_mut(key) {
                if let Some(color) = color {
                    sprite.color = color;
                }
                if let Some(center) = center {
                    sprite.center = center;
                }
            }
        }
        Ok(())
    }

    fn draw(&self, _frame: &FigureFrame, scene: &mut Scene) {
        let (w, h) = self.sprite_size;
        for sprite in self.sprites.values() {
            match self.shape {
                Shape::Rect => scene.fill_rect(Rect::centered(sprite.center, w, h), sprite.color),
                Shape::Circle => scene.circle(sprite.center, w / 2.0, sprite.color),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamValue, Params};

    struct Dot {
        id: u64,
        x: f64,
        y: f64,
        heat: f64,
    }

    impl Entity for Dot {
        fn entity_id(&self) -> EntityId {
            EntityId(self.id)
        }
    }

    struct Field {
        dots: Vec<Dot>,
    }

    impl Model for Field {
        fn from_params(_params: &Params) -> Result<Self, crate::model::ModelError> {
            Ok(Self { dots: Vec::new() })
        }

        fn step(&mut self) {}

        fn attribute(&self, _name: &str) -> Option<ParamValue> {
            None
        }

        fn seed(&self) -> Option<u64> {
            Some(42)
        }
    }

    fn field(n: u64) -> Field {
        Field {
            dots: (0..n)
                .map(|id| Dot {
                    id,
                    x: id as f64,
                    y: 0.0,
                    heat: 0.0,
                })
                .collect(),
        }
    }

    fn frame() -> FigureFrame {
        FigureFrame {
            rect: Rect::new(100.0, 50.0, 100.0, 100.0),
            cell_width: 10.0,
            cell_height: 10.0,
            ..FigureFrame::default()
        }
    }

    fn dots(model: &Field) -> Vec<&Dot> {
        model.dots.iter().collect()
    }

    #[test]
    fn builder_rejects_invalid_configuration() {
        let shape = Artist::<Field, Dot>::cell_agents(dots, |d| (d.x, d.y))
            .shape("hexagon")
            .build();
        assert!(matches!(shape, Err(ConfigError::InvalidShape(_))));

        let bounds = Artist::<Field, Dot>::cell_agents(dots, |d| (d.x, d.y))
            .color_by(|d| d.heat)
            .color_map(ColorMap::named("viridis"))
            .build();
        assert!(matches!(bounds, Err(ConfigError::MissingColorBounds)));

        let size = Artist::<Field, Dot>::cell_agents(dots, |d| (d.x, d.y))
            .size(0.0)
            .build();
        assert!(matches!(size, Err(ConfigError::InvalidSize(_))));
    }

    #[test]
    fn grid_sprites_sit_at_cell_centers() {
        let model = field(3);
        let mut artist = Artist::cell_agents(dots, |d: &Dot| (d.x, d.y))
            .build()
            .expect("artist");
        artist.setup(&frame(), &model).expect("setup");
        assert_eq!(artist.sprite_count(), 3);
        let sprite = artist.sprite(EntityId(2)).expect("sprite 2");
        assert_eq!(sprite.center, Point::new(125.0, 55.0));
        assert_eq!(sprite.color, Rgba::BLACK);
        assert_eq!(artist.sprite_size(), (10.0, 10.0));
    }

    #[test]
    fn population_churn_follows_filter() {
        let mut model = field(4);
        let mut artist = Artist::cell_agents(dots, |d: &Dot| (d.x, d.y))
            .filter(|d| d.heat < 1.0)
            .build()
            .expect("artist");
        artist.setup(&frame(), &model).expect("setup");
        assert_eq!(artist.sprite_count(), 4);

        model.dots[1].heat = 2.0;
        model.dots.push(Dot {
            id: 9,
            x: 5.0,
            y: 5.0,
            heat: 0.0,
        });
        artist.update(&frame(), &model, 1).expect("update");
        assert_eq!(artist.sprite_count(), 4);
        assert!(artist.sprite(EntityId(1)).is_none());
        assert!(artist.sprite(EntityId(9)).is_some());
    }

    #[test]
    fn static_population_ignores_newcomers() {
        let mut model = field(2);
        let mut artist = Artist::cell_agents(dots, |d: &Dot| (d.x, d.y))
            .dynamic_population(false)
            .build()
            .expect("artist");
        artist.setup(&frame(), &model).expect("setup");
        model.dots.push(Dot {
            id: 7,
            x: 1.0,
            y: 1.0,
            heat: 0.0,
        });
        model.dots[0].x = 4.0;
        artist.update(&frame(), &model, 1).expect("update");
        assert_eq!(artist.sprite_count(), 2);
        assert_eq!(
            artist.sprite(EntityId(0)).expect("sprite 0").center,
            Point::new(145.0, 55.0)
        );
    }

    #[test]
    fn static_population_refreshes_filtered_out_sprites() {
        let mut model = field(1);
        let mut artist = Artist::cell_agents(dots, |d: &Dot| (d.x, d.y))
            .filter(|d| d.heat < 1.0)
            .dynamic_population(false)
            .build()
            .expect("artist");
        artist.setup(&frame(), &model).expect("setup");

        model.dots[0].heat = 2.0;
        model.dots[0].x = 5.0;
        artist.update(&frame(), &model, 1).expect("update");
        assert_eq!(artist.sprite_count(), 1);
        assert_eq!(
            artist.sprite(EntityId(0)).expect("sprite 0").center,
            Point::new(155.0, 55.0)
        );
    }

    #[test]
    fn jitter_is_stable_across_updates() {
        let mut model = field(5);
        let mut artist = Artist::cell_agents(dots, |d: &Dot| (d.x, d.y))
            .jitter(true)
            .build()
            .expect("artist");
        artist.setup(&frame(), &model).expect("setup");
        let before = artist.sprite(EntityId(3)).expect("sprite").jitter;
        assert!(before.x.abs() <= 5.0 && before.y.abs() <= 5.0);

        model.dots[3].y = 2.0;
        artist.update(&frame(), &model, 1).expect("update");
        let sprite = artist.sprite(EntityId(3)).expect("sprite");
        assert_eq!(sprite.jitter, before);
        assert_eq!(sprite.center, Point::new(135.0 + before.x, 75.0 + before.y));
    }

    #[test]
    fn mapped_colors_refresh_and_report_out_of_range() {
        let mut model = field(1);
        let mut artist = Artist::cells(dots, |d: &Dot| (d.x, d.y))
            .color_by(|d| d.heat)
            .color_map(ColorMap::categorical([(0, "white"), (1, "red")]))
            .build()
            .expect("artist");
        artist.setup(&frame(), &model).expect("setup");
        assert_eq!(artist.sprite(EntityId(0)).expect("sprite").color, Rgba::WHITE);

        model.dots[0].heat = 1.0;
        model.dots[0].x = 3.0;
        artist.update(&frame(), &model, 1).expect("update");
        let sprite = artist.sprite(EntityId(0)).expect("sprite");
        assert_eq!(sprite.color, Rgba::RED);
        assert_eq!(sprite.center, Point::new(105.0, 55.0), "cells never move");

        model.dots[0].heat = 7.0;
        assert!(matches!(
            artist.update(&frame(), &model, 2),
            Err(RenderError::Style(_))
        ));
    }

    #[test]
    fn network_nodes_and_agents_locate_differently() {
        let model = field(3);
        let network = FigureFrame {
            rect: Rect::new(100.0, 50.0, 220.0, 220.0),
            cell_width: 10.0,
            cell_height: 10.0,
            node_positions: vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, -1.0),
                Point::new(-1.0, 1.0),
            ],
            edges: Vec::new(),
        };
        let close = |p: Point, x: f64, y: f64| (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9;

        let mut nodes = Artist::network_nodes(dots).build().expect("nodes");
        nodes.setup(&network, &model).expect("setup");
        let node = nodes.sprite(EntityId(1)).expect("node 1").center;
        assert!(close(node, 310.0, 60.0), "{node:?}");

        let mut agents = Artist::network_agents(dots, |d: &Dot| 2 - d.id as usize)
            .build()
            .expect("agents");
        agents.setup(&network, &model).expect("setup");
        let agent = agents.sprite(EntityId(0)).expect("agent 0").center;
        assert!(close(agent, 110.0, 260.0), "{agent:?}");

        let missing = Artist::network_agents(dots, |_: &Dot| 9)
            .build()
            .expect("agents")
            .setup(&network, &model);
        assert!(matches!(missing, Err(RenderError::MissingNode(9))));
    }

    #[test]
    fn circle_radius_has_a_floor() {
        let model = field(1);
        let tiny = FigureFrame {
            cell_width: 0.5,
            cell_height: 0.5,
            ..frame()
        };
        let mut artist = Artist::cell_agents(dots, |d: &Dot| (d.x, d.y))
            .build()
            .expect("artist");
        artist.setup(&tiny, &model).expect("setup");
        assert_eq!(artist.sprite_size(), (2.0, 2.0));
    }
}
