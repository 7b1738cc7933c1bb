//! Schelling segregation on a toroidal grid.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use simcanvas_core::{
    DataCollector, Entity, EntityId, Model, ModelError, ParamValue, Params, SpaceExtent,
};
use tracing::debug;

use crate::{positive, seeded_rng, unit_interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchellingAgent {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    /// 0 for the majority group, 1 for the minority.
    pub kind: u8,
}

impl Entity for SchellingAgent {
    fn entity_id(&self) -> EntityId {
        EntityId(self.id)
    }
}

pub struct Schelling {
    width: usize,
    height: usize,
    density: f64,
    minority_pc: f64,
    homophily: f64,
    agents: Vec<SchellingAgent>,
    cells: Vec<Option<usize>>,
    empties: Vec<usize>,
    happy: usize,
    seed: u64,
    rng: SmallRng,
    collector: DataCollector,
}

impl Schelling {
    pub fn agents(&self) -> &[SchellingAgent] {
        &self.agents
    }

    pub fn extent(&self) -> SpaceExtent {
        SpaceExtent::new(self.width as f64, self.height as f64)
    }

    pub fn happy(&self) -> usize {
        self.happy
    }

    /// True once every agent is happy.
    pub fn settled(&self) -> bool {
        self.happy == self.agents.len()
    }

    fn similarity(&self, agent: &SchellingAgent) -> f64 {
        let (w, h) = (self.width as isize, self.height as isize);
        let (mut similar, mut total) = (0usize, 0usize);
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (agent.x as isize + dx).rem_euclid(w) as usize;
                let ny = (agent.y as isize + dy).rem_euclid(h) as usize;
                if let Some(other) = self.cells[ny * self.width + nx] {
                    total += 1;
                    if self.agents[other].kind == agent.kind {
                        similar += 1;
                    }
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            similar as f64 / total as f64
        }
    }

    fn move_to_empty(&mut self, index: usize) {
        if self.empties.is_empty() {
            return;
        }
        let slot = self.rng.random_range(0..self.empties.len());
        let target = self.empties[slot];
        let agent = &mut self.agents[index];
        let origin = agent.y * self.width + agent.x;
        agent.x = target % self.width;
        agent.y = target / self.width;
        self.cells[origin] = None;
        self.cells[target] = Some(index);
        self.empties[slot] = origin;
    }
}

impl Model for Schelling {
    fn from_params(params: &Params) -> Result<Self, ModelError> {
        let width = positive(params, "width", 20)?;
        let height = positive(params, "height", 20)?;
        let density = unit_interval(params, "density", 0.8)?;
        let minority_pc = unit_interval(params, "minority_pc", 0.5)?;
        let homophily = unit_interval(params, "homophily", 0.4)?;
        let (seed, mut rng) = seeded_rng(params)?;

        let mut agents = Vec::new();
        let mut cells = vec![None; width * height];
        let mut empties = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let cell = y * width + x;
                if rng.random::<f64>() < density {
                    let kind = u8::from(rng.random::<f64>() < minority_pc);
                    cells[cell] = Some(agents.len());
                    agents.push(SchellingAgent {
                        id: agents.len() as u64,
                        x,
                        y,
                        kind,
                    });
                } else {
                    empties.push(cell);
                }
            }
        }

        let mut model = Self {
            width,
            height,
            density,
            minority_pc,
            homophily,
            agents,
            cells,
            empties,
            happy: 0,
            seed,
            rng,
            collector: DataCollector::with_series(["happy"]),
        };
        model.happy = model
            .agents
            .iter()
            .filter(|a| model.similarity(a) >= homophily)
            .count();
        model.collector.record("happy", model.happy as f64);
        debug!(agents = model.agents.len(), width, height, "schelling model built");
        Ok(model)
    }

    fn step(&mut self) {
        self.happy = 0;
        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.shuffle(&mut self.rng);
        for index in order {
            if self.similarity(&self.agents[index]) < self.homophily {
                self.move_to_empty(index);
            } else {
                self.happy += 1;
            }
        }
        self.collector.record("happy", self.happy as f64);
    }

    fn attribute(&self, name: &str) -> Option<ParamValue> {
        let value = match name {
            "density" => ParamValue::Float(self.density),
            "minority_pc" => ParamValue::Float(self.minority_pc),
            "homophily" => ParamValue::Float(self.homophily),
            "happy" => ParamValue::from(self.happy),
            "agents" => ParamValue::from(self.agents.len()),
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&mut self, name: &str, value: &ParamValue) -> bool {
        let Some(v) = value.as_f64().map(|v| v.clamp(0.0, 1.0)) else {
            return false;
        };
        // density and minority_pc only take effect on the next reset
        match name {
            "homophily" => self.homophily = v,
            "density" => self.density = v,
            "minority_pc" => self.minority_pc = v,
            _ => return false,
        }
        true
    }

    fn collector(&self) -> Option<&DataCollector> {
        Some(&self.collector)
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}
