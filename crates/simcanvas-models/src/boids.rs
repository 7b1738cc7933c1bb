//! Boid flocking in a toroidal continuous space.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use simcanvas_core::{
    Entity, EntityId, Model, ModelError, ParamValue, Params, ParamsExt, SpaceExtent,
};
use tracing::debug;

use crate::{positive, seeded_rng};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boid {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    /// Unit heading.
    pub dx: f64,
    pub dy: f64,
}

impl Entity for Boid {
    fn entity_id(&self) -> EntityId {
        EntityId(self.id)
    }
}

pub struct BoidFlockers {
    width: f64,
    height: f64,
    speed: f64,
    vision: f64,
    separation: f64,
    cohere: f64,
    separate: f64,
    align: f64,
    boids: Vec<Boid>,
    seed: u64,
    rng: SmallRng,
}

fn wrap(v: f64, size: f64) -> f64 {
    let w = v.rem_euclid(size);
    // rem_euclid rounds tiny negatives up to `size`
    if w >= size { 0.0 } else { w }
}

/// Shortest signed offset from `a` to `b` on a ring of length `size`.
fn torus_delta(a: f64, b: f64, size: f64) -> f64 {
    let d = b - a;
    if d > size / 2.0 {
        d - size
    } else if d < -size / 2.0 {
        d + size
    } else {
        d
    }
}

impl BoidFlockers {
    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn extent(&self) -> SpaceExtent {
        SpaceExtent::new(self.width, self.height)
    }

    /// Mean heading angle in radians, or 0 for an empty flock.
    pub fn mean_heading(&self) -> f64 {
        let (sx, sy) = self
            .boids
            .iter()
            .fold((0.0, 0.0), |(sx, sy), b| (sx + b.dx, sy + b.dy));
        if sx == 0.0 && sy == 0.0 {
            0.0
        } else {
            sy.atan2(sx)
        }
    }

    fn steer(&self, boid: &Boid) -> (f64, f64) {
        let mut cohere = (0.0, 0.0);
        let mut separate = (0.0, 0.0);
        let mut align = (0.0, 0.0);
        let mut neighbors = 0usize;
        for other in &self.boids {
            if other.id == boid.id {
                continue;
            }
            let ox = torus_delta(boid.x, other.x, self.width);
            let oy = torus_delta(boid.y, other.y, self.height);
            let dist = ox.hypot(oy);
            if dist > self.vision {
                continue;
            }
            neighbors += 1;
            cohere.0 += ox;
            cohere.1 += oy;
            if dist < self.separation {
                separate.0 -= ox;
                separate.1 -= oy;
            }
            align.0 += other.dx;
            align.1 += other.dy;
        }
        if neighbors == 0 {
            return (boid.dx, boid.dy);
        }
        let n = neighbors as f64;
        let mut dx = boid.dx
            + (cohere.0 / n * self.cohere + separate.0 * self.separate + align.0 / n * self.align)
                / 2.0;
        let mut dy = boid.dy
            + (cohere.1 / n * self.cohere + separate.1 * self.separate + align.1 / n * self.align)
                / 2.0;
        let norm = dx.hypot(dy);
        if norm > f64::EPSILON {
            dx /= norm;
            dy /= norm;
        } else {
            (dx, dy) = (boid.dx, boid.dy);
        }
        (dx, dy)
    }
}

impl Model for BoidFlockers {
    fn from_params(params: &Params) -> Result<Self, ModelError> {
        let width = positive(params, "width", 100)? as f64;
        let height = positive(params, "height", 100)? as f64;
        let population_size = params.usize_or("population_size", 100)?;
        let (seed, mut rng) = seeded_rng(params)?;

        let boids = (0..population_size)
            .map(|id| {
                let angle = rng.random_range(0.0..std::f64::consts::TAU);
                Boid {
                    id: id as u64,
                    x: rng.random_range(0.0..width),
                    y: rng.random_range(0.0..height),
                    dx: angle.cos(),
                    dy: angle.sin(),
                }
            })
            .collect();

        debug!(population_size, "boid flock built");
        Ok(Self {
            width,
            height,
            speed: params.f64_or("speed", 1.0)?,
            vision: params.f64_or("vision", 10.0)?,
            separation: params.f64_or("separation", 2.0)?,
            cohere: params.f64_or("cohere", 0.03)?,
            separate: params.f64_or("separate", 0.015)?,
            align: params.f64_or("match", 0.05)?,
            boids,
            seed,
            rng,
        })
    }

    fn step(&mut self) {
        let mut order: Vec<usize> = (0..self.boids.len()).collect();
        order.shuffle(&mut self.rng);
        for index in order {
            let boid = self.boids[index];
            let (dx, dy) = self.steer(&boid);
            let b = &mut self.boids[index];
            b.dx = dx;
            b.dy = dy;
            b.x = wrap(b.x + dx * self.speed, self.width);
            b.y = wrap(b.y + dy * self.speed, self.height);
        }
    }

    fn attribute(&self, name: &str) -> Option<ParamValue> {
        let value = match name {
            "boid_count" => ParamValue::from(self.boids.len()),
            "speed" => ParamValue::Float(self.speed),
            "vision" => ParamValue::Float(self.vision),
            "separation" => ParamValue::Float(self.separation),
            "mean_heading" => ParamValue::Float(self.mean_heading()),
            _ => return None,
        };
        Some(value)
    }

    fn set_attribute(&mut self, name: &str, value: &ParamValue) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        match name {
            "speed" => self.speed = v,
            "vision" => self.vision = v,
            "separation" => self.separation = v,
            _ => return false,
        }
        true
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}
