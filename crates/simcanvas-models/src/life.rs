//! Conway's Game of Life on a toroidal grid.

use rand::Rng;
use simcanvas_core::{Entity, EntityId, Model, ModelError, ParamValue, Params, SpaceExtent};

use crate::{positive, seeded_rng, unit_interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
    pub alive: bool,
}

impl Cell {
    pub fn state(&self) -> u8 {
        u8::from(self.alive)
    }
}

pub struct GameOfLife {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    seed: u64,
}

impl Entity for Cell {
    fn entity_id(&self) -> EntityId {
        EntityId(((self.y as u64) << 32) | self.x as u64)
    }
}

impl GameOfLife {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn extent(&self) -> SpaceExtent {
        SpaceExtent::new(self.width as f64, self.height as f64)
    }

    pub fn alive(&self) -> usize {
        self.cells.iter().filter(|c| c.alive).count()
    }

    fn live_neighbors(&self, x: usize, y: usize) -> usize {
        let (w, h) = (self.width, self.height);
        let mut count = 0;
        for dy in [h - 1, 0, 1] {
            for dx in [w - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (x + dx) % w;
                let ny = (y + dy) % h;
                if self.cells[ny * w + nx].alive {
                    count += 1;
                }
            }
        }
        count
    }
}

impl Model for GameOfLife {
    fn from_params(params: &Params) -> Result<Self, ModelError> {
        let width = positive(params, "width", 50)?;
        let height = positive(params, "height", 50)?;
        let fraction = unit_interval(params, "initial_fraction_alive", 0.2)?;
        let (seed, mut rng) = seeded_rng(params)?;
        let cells = (0..width * height)
            .map(|i| Cell {
                x: i % width,
                y: i / width,
                alive: rng.random::<f64>() < fraction,
            })
            .collect();
        Ok(Self {
            width,
            height,
            cells,
            seed,
        })
    }

    fn step(&mut self) {
        let next: Vec<bool> = self
            .cells
            .iter()
            .map(|c| {
                let n = self.live_neighbors(c.x, c.y);
                matches!((c.alive, n), (true, 2) | (_, 3))
            })
            .collect();
        for (cell, alive) in self.cells.iter_mut().zip(next) {
            cell.alive = alive;
        }
    }

    fn attribute(&self, name: &str) -> Option<ParamValue> {
        match name {
            "alive" => Some(ParamValue::from(self.alive())),
            _ => None,
        }
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(width: usize, height: usize) -> GameOfLife {
        let mut params = Params::new();
        params.insert("width".into(), ParamValue::from(width));
        params.insert("height".into(), ParamValue::from(height));
        params.insert("initial_fraction_alive".into(), ParamValue::Float(0.0));
        GameOfLife::from_params(&params).expect("grid")
    }

    fn set(model: &mut GameOfLife, cells: &[(usize, usize)]) {
        for &(x, y) in cells {
            model.cells[y * model.width + x].alive = true;
        }
    }

    #[test]
    fn blinker_oscillates() {
        let mut model = empty(5, 5);
        set(&mut model, &[(1, 2), (2, 2), (3, 2)]);
        model.step();
        let alive: Vec<(usize, usize)> = model
            .cells()
            .iter()
            .filter(|c| c.alive)
            .map(|c| (c.x, c.y))
            .collect();
        assert_eq!(alive, vec![(2, 1), (2, 2), (2, 3)]);
        model.step();
        assert_eq!(model.alive(), 3);
        assert!(model.cells[2 * 5 + 1].alive);
    }

    #[test]
    fn neighbors_wrap_around_edges() {
        let mut model = empty(4, 4);
        set(&mut model, &[(0, 0), (3, 3), (3, 0)]);
        assert_eq!(model.live_neighbors(0, 3), 3);
    }

    #[test]
    fn entity_ids_are_unique_per_cell() {
        let model = empty(3, 3);
        let mut ids: Vec<EntityId> = model.cells().iter().map(Entity::entity_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }
}
