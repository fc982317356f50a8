//! Heritable genomes: random generation and bounded Gaussian mutation.
//!
//! Both operations are pure given an injected random source, so callers can
//! seed a generator and get reproducible lineages.

use crate::WorldError;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Gene ranges and mutation parameters, threaded explicitly through every
/// genome operation instead of living in module-level state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticsConfig {
    /// Inclusive bounds for steps-per-tick.
    pub speed_range: (u32, u32),
    /// Inclusive bounds for the movement-cost scale.
    pub metabolism_range: (f32, f32),
    /// Inclusive bounds for the Manhattan search radius.
    pub vision_range: (u32, u32),
    /// Independent per-gene chance that mutation perturbs the gene.
    pub mutation_rate: f32,
    /// Standard deviations of the Gaussian jitter per gene.
    pub speed_sigma: f32,
    pub metabolism_sigma: f32,
    pub vision_sigma: f32,
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            speed_range: (0, 5),
            metabolism_range: (0.5, 2.0),
            vision_range: (1, 3),
            mutation_rate: 0.1,
            speed_sigma: 1.0,
            metabolism_sigma: 0.2,
            vision_sigma: 1.0,
        }
    }
}

impl GeneticsConfig {
    pub(crate) fn validate(&self) -> Result<(), WorldError> {
        if self.speed_range.1 < self.speed_range.0 || self.vision_range.1 < self.vision_range.0 {
            return Err(WorldError::InvalidConfig(
                "gene ranges must be ordered low..=high",
            ));
        }
        if self.metabolism_range.0 <= 0.0 || self.metabolism_range.1 < self.metabolism_range.0 {
            return Err(WorldError::InvalidConfig(
                "metabolism range must be positive and ordered low..=high",
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(WorldError::InvalidConfig(
                "mutation_rate must lie in [0, 1]",
            ));
        }
        if self.speed_sigma < 0.0 || self.metabolism_sigma < 0.0 || self.vision_sigma < 0.0 {
            return Err(WorldError::InvalidConfig(
                "mutation sigmas must be non-negative",
            ));
        }
        Ok(())
    }
}

/// The three heritable traits of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Movement steps attempted per tick.
    pub speed: u32,
    /// Scales the per-step movement energy cost.
    pub metabolism: f32,
    /// Manhattan radius for threat and prey scans.
    pub vision: u32,
}

impl Genome {
    /// Draws each gene uniformly within its configured range.
    pub fn random<R: Rng + ?Sized>(config: &GeneticsConfig, rng: &mut R) -> Self {
        Self {
            speed: rng.random_range(config.speed_range.0..=config.speed_range.1),
            metabolism: rng.random_range(config.metabolism_range.0..=config.metabolism_range.1),
            vision: rng.random_range(config.vision_range.0..=config.vision_range.1),
        }
    }

    /// Returns a copy with each gene independently perturbed with probability
    /// `mutation_rate`, then clamped back into range.
    #[must_use]
    pub fn mutate<R: Rng + ?Sized>(&self, config: &GeneticsConfig, rng: &mut R) -> Self {
        let mut child = *self;
        if rng.random::<f32>() < config.mutation_rate {
            child.speed = jitter_integer(child.speed, config.speed_sigma, config.speed_range, rng);
        }
        if rng.random::<f32>() < config.mutation_rate {
            child.metabolism = (child.metabolism + gaussian(config.metabolism_sigma, rng))
                .clamp(config.metabolism_range.0, config.metabolism_range.1);
        }
        if rng.random::<f32>() < config.mutation_rate {
            child.vision =
                jitter_integer(child.vision, config.vision_sigma, config.vision_range, rng);
        }
        child
    }
}

fn gaussian<R: Rng + ?Sized>(sigma: f32, rng: &mut R) -> f32 {
    if sigma <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, sigma)
        .map(|normal| normal.sample(rng))
        .unwrap_or(0.0)
}

fn jitter_integer<R: Rng + ?Sized>(
    value: u32,
    sigma: f32,
    (low, high): (u32, u32),
    rng: &mut R,
) -> u32 {
    let shifted = value as f32 + gaussian(sigma, rng);
    let rounded = shifted.round() as i64;
    rounded.clamp(i64::from(low), i64::from(high)) as u32
}
