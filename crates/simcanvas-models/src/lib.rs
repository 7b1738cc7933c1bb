//! Demo simulations used by the `simcanvas` binary and its tests.
//!
//! Each model implements [`simcanvas_core::Model`] and reads its constructor
//! arguments from the parameter dictionary, so any of them can be bound to
//! controllers by name.

pub mod boids;
pub mod life;
pub mod schelling;
pub mod sugarscape;
pub mod virus;

pub use boids::{Boid, BoidFlockers};
pub use life::{Cell, GameOfLife};
pub use schelling::{Schelling, SchellingAgent};
pub use sugarscape::{Resource, Sugarscape, Trader};
pub use virus::{NodeState, VirusAgent, VirusOnNetwork};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use simcanvas_core::{ModelError, Params, ParamsExt};

/// Resolve the `seed` parameter, drawing a fresh one when absent.
pub(crate) fn seeded_rng(params: &Params) -> Result<(u64, SmallRng), ModelError> {
    let seed = match params.get("seed") {
        Some(_) => params.i64_or("seed", 0)? as u64,
        None => rand::random(),
    };
    Ok((seed, SmallRng::seed_from_u64(seed)))
}

pub(crate) fn unit_interval(params: &Params, name: &str, default: f64) -> Result<f64, ModelError> {
    let value = params.f64_or(name, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be within [0, 1] (got {value})"),
        });
    }
    Ok(value)
}

pub(crate) fn positive(params: &Params, name: &str, default: usize) -> Result<usize, ModelError> {
    let value = params.usize_or(name, default)?;
    if value == 0 {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(value)
}
