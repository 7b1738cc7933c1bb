//! Sugarscape with two resources and optional bilateral trade.
//!
//! Traders move to the visible cell that maximises their Cobb-Douglas welfare,
//! harvest it, pay their metabolism and starve when either stock runs out.
//! With trade enabled, neighbours swap sugar for spice at the geometric mean
//! of their marginal rates of substitution until neither side gains.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::{IndexedRandom, SliceRandom};
use simcanvas_core::{
    DataCollector, Entity, EntityId, Model, ModelError, ParamValue, Params, ParamsExt,
    SpaceExtent,
};
use tracing::debug;

use crate::{positive, seeded_rng};

pub const SERIES: [&str; 3] = ["#Traders", "Trade Volume", "Price"];

/// Resource level at the centre of each peak.
pub const MAX_CAPACITY: f64 = 4.0;
const EPSILON: f64 = 1e-9;

/// One grid cell of the sugar/spice landscape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resource {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub sugar: f64,
    pub spice: f64,
    pub max_sugar: f64,
    pub max_spice: f64,
}

impl Entity for Resource {
    fn entity_id(&self) -> EntityId {
        EntityId(self.id)
    }
}

impl Resource {
    fn regrow(&mut self) {
        self.sugar = (self.sugar + 1.0).min(self.max_sugar);
        self.spice = (self.spice + 1.0).min(self.max_spice);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trader {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub sugar: f64,
    pub spice: f64,
    pub metabolism_sugar: f64,
    pub metabolism_spice: f64,
    pub vision: usize,
}

impl Entity for Trader {
    fn entity_id(&self) -> EntityId {
        EntityId(self.id)
    }
}

impl Trader {
    pub fn welfare(&self, sugar: f64, spice: f64) -> f64 {
        let total = self.metabolism_sugar + self.metabolism_spice;
        sugar.powf(self.metabolism_sugar / total) * spice.powf(self.metabolism_spice / total)
    }

    /// Spice this trader would give up for one unit of sugar.
    pub fn mrs(&self, sugar: f64, spice: f64) -> f64 {
        (spice / self.metabolism_spice) / (sugar / self.metabolism_sugar)
    }
}

/// Inclusive `<name>_min..=<name>_max` integer range.
fn bounds(
    params: &Params,
    name: &str,
    (min, max): (usize, usize),
) -> Result<(usize, usize), ModelError> {
    let lo = params.usize_or(&format!("{name}_min"), min)?;
    let hi = params.usize_or(&format!("{name}_max"), max)?;
    if lo > hi {
        return Err(ModelError::InvalidParameter {
            name: format!("{name}_max"),
            reason: format!("must be at least {name}_min ({hi} < {lo})"),
        });
    }
    Ok((lo, hi))
}

/// Capacity ring around the nearest peak; peaks are given as fractions of the grid.
fn capacity(x: usize, y: usize, width: usize, height: usize, peaks: [(f64, f64); 2]) -> f64 {
    let ring = (width.min(height) as f64 / 10.0).max(1.0);
    let distance = peaks
        .iter()
        .map(|(px, py)| {
            let dx = x as f64 - px * width as f64;
            let dy = y as f64 - py * height as f64;
            dx.hypot(dy)
        })
        .fold(f64::INFINITY, f64::min);
    (MAX_CAPACITY - (distance / ring).floor()).max(0.0)
}

pub struct Sugarscape {
    width: usize,
    height: usize,
    enable_trade: bool,
    resources: Vec<Resource>,
    traders: Vec<Trader>,
    /// Trader index per cell.
    occupant: Vec<Option<usize>>,
    prices: Vec<f64>,
    seed: u64,
    rng: SmallRng,
    collector: DataCollector,
}

impl Sugarscape {
    pub fn extent(&self) -> SpaceExtent {
        SpaceExtent::new(self.width as f64, self.height as f64)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn traders(&self) -> &[Trader] {
        &self.traders
    }

    pub fn trade_enabled(&self) -> bool {
        self.enable_trade
    }

    /// Exchanges made during the last step.
    pub fn trade_volume(&self) -> usize {
        self.prices.len()
    }

    /// Geometric mean price of the last step's trades, in spice per sugar.
    pub fn price(&self) -> Option<f64> {
        if self.prices.is_empty() {
            return None;
        }
        let log_sum: f64 = self.prices.iter().map(|p| p.ln()).sum();
        Some((log_sum / self.prices.len() as f64).exp())
    }

    fn cell(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Cells within Manhattan distance `radius` of `(x, y)`, with that distance.
    fn neighborhood(&self, x: usize, y: usize, radius: usize) -> Vec<(usize, usize, usize)> {
        let r = radius as isize;
        let mut cells = Vec::new();
        for dy in -r..=r {
            let reach = r - dy.abs();
            for dx in -reach..=reach {
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if nx < 0 || ny < 0 || nx >= self.width as isize || ny >= self.height as isize {
                    continue;
                }
                cells.push((nx as usize, ny as usize, (dx.abs() + dy.abs()) as usize));
            }
        }
        cells
    }

    fn rebuild_occupancy(&mut self) {
        self.occupant.iter_mut().for_each(|c| *c = None);
        for (index, trader) in self.traders.iter().enumerate() {
            let cell = trader.y * self.width + trader.x;
            self.occupant[cell] = Some(index);
        }
    }

    fn move_trader(&mut self, index: usize) {
        let trader = self.traders[index];
        let origin = self.cell(trader.x, trader.y);
        let mut best: Vec<(usize, usize)> = Vec::new();
        let (mut best_welfare, mut best_distance) = (f64::NEG_INFINITY, usize::MAX);
        for (x, y, distance) in self.neighborhood(trader.x, trader.y, trader.vision) {
            let cell = self.cell(x, y);
            if cell != origin && self.occupant[cell].is_some() {
                continue;
            }
            let resource = &self.resources[cell];
            let welfare =
                trader.welfare(trader.sugar + resource.sugar, trader.spice + resource.spice);
            let level = (welfare - best_welfare).abs() <= EPSILON;
            if welfare > best_welfare + EPSILON || (level && distance < best_distance) {
                best.clear();
                best_welfare = welfare;
                best_distance = distance;
                best.push((x, y));
            } else if level && distance == best_distance {
                best.push((x, y));
            }
        }
        let Some(&(x, y)) = best.choose(&mut self.rng) else {
            return;
        };
        let target = self.cell(x, y);
        self.occupant[origin] = None;
        self.occupant[target] = Some(index);
        let trader = &mut self.traders[index];
        trader.x = x;
        trader.y = y;
    }

    /// Harvest the current cell and pay metabolism; returns false when the trader starves.
    fn eat(&mut self, index: usize) -> bool {
        let (x, y) = (self.traders[index].x, self.traders[index].y);
        let cell = self.cell(x, y);
        let resource = &mut self.resources[cell];
        let trader = &mut self.traders[index];
        trader.sugar += resource.sugar - trader.metabolism_sugar;
        trader.spice += resource.spice - trader.metabolism_spice;
        resource.sugar = 0.0;
        resource.spice = 0.0;
        if trader.sugar > 0.0 && trader.spice > 0.0 {
            true
        } else {
            self.occupant[cell] = None;
            false
        }
    }

    fn trade_with_neighbors(&mut self, index: usize) {
        let trader = self.traders[index];
        let partners: Vec<usize> = self
            .neighborhood(trader.x, trader.y, trader.vision)
            .into_iter()
            .filter_map(|(x, y, _)| self.occupant[self.cell(x, y)])
            .filter(|other| *other != index)
            .collect();
        for other in partners {
            self.trade(index, other);
        }
    }

    /// Repeat single exchanges between two traders until their rates meet.
    fn trade(&mut self, a: usize, b: usize) {
        loop {
            let (first, second) = (self.traders[a], self.traders[b]);
            let mrs_a = first.mrs(first.sugar, first.spice);
            let mrs_b = second.mrs(second.sugar, second.spice);
            if (mrs_a - mrs_b).abs() <= EPSILON * mrs_a.max(mrs_b) {
                return;
            }
            let price = (mrs_a * mrs_b).sqrt();
            let (buyer, seller) = if mrs_a > mrs_b { (a, b) } else { (b, a) };
            if !self.exchange(buyer, seller, price) {
                return;
            }
            self.prices.push(price);
        }
    }

    /// `buyer` pays spice for the seller's sugar. Both must gain and their rates must not cross.
    fn exchange(&mut self, buyer: usize, seller: usize, price: f64) -> bool {
        let (sugar, spice) = if price >= 1.0 {
            (1.0, price.floor())
        } else {
            ((1.0 / price).floor(), 1.0)
        };
        let (b, s) = (self.traders[buyer], self.traders[seller]);
        let (b_sugar, b_spice) = (b.sugar + sugar, b.spice - spice);
        let (s_sugar, s_spice) = (s.sugar - sugar, s.spice + spice);
        if b_spice <= 0.0 || s_sugar <= 0.0 {
            return false;
        }
        let gains = b.welfare(b_sugar, b_spice) > b.welfare(b.sugar, b.spice)
            && s.welfare(s_sugar, s_spice) > s.welfare(s.sugar, s.spice);
        if !gains || b.mrs(b_sugar, b_spice) < s.mrs(s_sugar, s_spice) {
            return false;
        }
        let buyer = &mut self.traders[buyer];
        buyer.sugar = b_sugar;
        buyer.spice = b_spice;
        let seller = &mut self.traders[seller];
        seller.sugar = s_sugar;
        seller.spice = s_spice;
        true
    }

    fn collect(&mut self) {
        let price = self.price().unwrap_or(f64::NAN);
        self.collector.record("#Traders", self.traders.len() as f64);
        self.collector.record("Trade Volume", self.prices.len() as f64);
        self.collector.record("Price", price);
    }
}

impl Model for Sugarscape {
    fn from_params(params: &Params) -> Result<Self, ModelError> {
        let width = positive(params, "width", 50)?;
        let height = positive(params, "height", 50)?;
        let population = params.usize_or("initial_population", 200)?;
        let endowment = bounds(params, "endowment", (25, 50))?;
        let metabolism = bounds(params, "metabolism", (1, 5))?;
        let vision = bounds(params, "vision", (1, 5))?;
        let enable_trade = params.bool_or("enable_trade", true)?;
        if metabolism.0 == 0 {
            return Err(ModelError::InvalidParameter {
                name: "metabolism_min".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if population > width * height {
            return Err(ModelError::InvalidParameter {
                name: "initial_population".to_string(),
                reason: format!("{population} traders do not fit on a {width}x{height} grid"),
            });
        }
        let (seed, mut rng) = seeded_rng(params)?;

        let mut resources = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let max_sugar = capacity(x, y, width, height, [(0.25, 0.75), (0.75, 0.25)]);
                let max_spice = capacity(x, y, width, height, [(0.25, 0.25), (0.75, 0.75)]);
                resources.push(Resource {
                    id: (y * width + x) as u64,
                    x,
                    y,
                    sugar: max_sugar,
                    spice: max_spice,
                    max_sugar,
                    max_spice,
                });
            }
        }

        let mut cells: Vec<usize> = (0..width * height).collect();
        cells.shuffle(&mut rng);
        let mut draw = |(lo, hi): (usize, usize)| rng.random_range(lo..=hi) as f64;
        let traders: Vec<Trader> = cells
            .iter()
            .take(population)
            .enumerate()
            .map(|(id, cell)| Trader {
                id: id as u64,
                x: cell % width,
                y: cell / width,
                sugar: draw(endowment),
                spice: draw(endowment),
                metabolism_sugar: draw(metabolism),
                metabolism_spice: draw(metabolism),
                vision: draw(vision) as usize,
            })
            .collect();

        let mut model = Self {
            width,
            height,
            enable_trade,
            resources,
            traders,
            occupant: vec![None; width * height],
            prices: Vec::new(),
            seed,
            rng,
            collector: DataCollector::with_series(SERIES),
        };
        model.rebuild_occupancy();
        model.collect();
        debug!(
            traders = model.traders.len(),
            width,
            height,
            enable_trade,
            "sugarscape model built"
        );
        Ok(model)
    }

    fn step(&mut self) {
        self.resources.iter_mut().for_each(Resource::regrow);
        self.prices.clear();

        let mut order: Vec<usize> = (0..self.traders.len()).collect();
        order.shuffle(&mut self.rng);
        let mut alive = vec![true; self.traders.len()];
        for index in order {
            self.move_trader(index);
            alive[index] = self.eat(index);
        }
        self.traders = self
            .traders
            .iter()
            .zip(&alive)
            .filter_map(|(trader, alive)| alive.then_some(*trader))
            .collect();
        self.rebuild_occupancy();

        if self.enable_trade {
            let mut order: Vec<usize> = (0..self.traders.len()).collect();
            order.shuffle(&mut self.rng);
            for index in order {
                self.trade_with_neighbors(index);
            }
        }
        self.collect();
    }

    fn attribute(&self, name: &str) -> Option<ParamValue> {
        let value = match name {
            "enable_trade" => ParamValue::Bool(self.enable_trade),
            "traders" => ParamValue::from(self.traders.len()),
            "trade_volume" => ParamValue::from(self.prices.len()),
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&mut self, name: &str, value: &ParamValue) -> bool {
        match (name, value.as_bool()) {
            ("enable_trade", Some(enabled)) => {
                self.enable_trade = enabled;
                true
            }
            _ => false,
        }
    }

    fn collector(&self) -> Option<&DataCollector> {
        Some(&self.collector)
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn params(population: i64, enable_trade: bool) -> Params {
        let mut params = Params::new();
        params.insert("width".into(), ParamValue::Int(30));
        params.insert("height".into(), ParamValue::Int(30));
        params.insert("initial_population".into(), ParamValue::Int(population));
        params.insert("enable_trade".into(), ParamValue::Bool(enable_trade));
        params.insert("seed".into(), ParamValue::Int(5));
        params
    }

    fn trader(id: u64, x: usize, sugar: f64, spice: f64) -> Trader {
        Trader {
            id,
            x,
            y: 0,
            sugar,
            spice,
            metabolism_sugar: 1.0,
            metabolism_spice: 1.0,
            vision: 1,
        }
    }

    #[test]
    fn landscape_has_sugar_and_spice_peaks() {
        let model = Sugarscape::from_params(&params(50, true)).expect("model");
        let at = |x: usize, y: usize| model.resources()[y * 30 + x];
        assert_eq!(at(7, 22).max_sugar, MAX_CAPACITY);
        assert_eq!(at(7, 7).max_spice, MAX_CAPACITY);
        assert_eq!(at(0, 0).max_sugar, 0.0);
        assert!(
            model
                .resources()
                .iter()
                .all(|r| r.sugar == r.max_sugar && r.spice == r.max_spice)
        );
        assert_eq!(model.traders().len(), 50);
        let cells: HashSet<(usize, usize)> = model.traders().iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(cells.len(), 50);
    }

    #[test]
    fn survivors_keep_positive_stocks_on_distinct_cells() {
        let mut model = Sugarscape::from_params(&params(120, true)).expect("model");
        for _ in 0..15 {
            model.step();
        }
        assert!(model.traders().len() <= 120);
        assert!(model.traders().iter().all(|t| t.sugar > 0.0 && t.spice > 0.0));
        let cells: HashSet<(usize, usize)> = model.traders().iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(cells.len(), model.traders().len());
        assert!(
            model
                .resources()
                .iter()
                .all(|r| r.sugar <= r.max_sugar && r.spice <= r.max_spice)
        );
        let series = model
            .collector()
            .and_then(|c| c.series("#Traders"))
            .expect("traders series");
        assert_eq!(series.len(), 16);
        assert_eq!(series[15], model.traders().len() as f64);
    }

    #[test]
    fn disabled_trade_records_no_volume() {
        let mut model = Sugarscape::from_params(&params(80, false)).expect("model");
        for _ in 0..5 {
            model.step();
        }
        assert_eq!(model.trade_volume(), 0);
        assert_eq!(model.price(), None);
        let volume = model
            .collector()
            .and_then(|c| c.series("Trade Volume"))
            .expect("volume series");
        assert!(volume.iter().all(|v| *v == 0.0));
        let prices = model.collector().and_then(|c| c.series("Price")).expect("price");
        assert!(prices.iter().all(|p| p.is_nan()));
    }

    #[test]
    fn trade_stops_when_rates_meet() {
        let mut model = Sugarscape::from_params(&params(0, true)).expect("model");
        model.traders = vec![trader(0, 0, 10.0, 40.0), trader(1, 1, 40.0, 10.0)];
        model.rebuild_occupancy();

        model.trade_with_neighbors(0);
        let (a, b) = (model.traders[0], model.traders[1]);
        assert_eq!((a.sugar, a.spice), (25.0, 25.0));
        assert_eq!((b.sugar, b.spice), (25.0, 25.0));
        assert_eq!(model.trade_volume(), 15);
        let price = model.price().expect("price");
        assert!((price - 1.0).abs() < 1e-6, "{price}");
    }

    #[test]
    fn trade_toggle_is_live() {
        let mut model = Sugarscape::from_params(&params(10, true)).expect("model");
        assert!(model.set_attribute("enable_trade", &ParamValue::Bool(false)));
        assert_eq!(model.attribute("enable_trade"), Some(ParamValue::Bool(false)));
        assert!(!model.set_attribute("initial_population", &ParamValue::Int(20)));
    }

    #[test]
    fn rejects_inverted_bounds_and_overfull_grid() {
        let mut inverted = params(10, true);
        inverted.insert("vision_min".into(), ParamValue::Int(6));
        inverted.insert("vision_max".into(), ParamValue::Int(3));
        assert!(Sugarscape::from_params(&inverted).is_err());
        assert!(Sugarscape::from_params(&params(901, true)).is_err());
    }
}
