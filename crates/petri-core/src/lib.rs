//! Core types shared across the Petri workspace.
//!
//! The crate is organised leaves-first: [`genetics`] supplies heritable
//! genomes, [`organism`] the per-kind entity types, [`field`] the toroidal
//! nutrient grid and seasons, [`world`] the tick engine, [`stats`] aggregate
//! per-tick summaries, and [`history`] the snapshot store with live/replay
//! navigation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod field;
pub mod genetics;
pub mod history;
pub mod organism;
pub mod stats;
pub mod world;

pub use field::{NutrientField, Season};
pub use genetics::{GeneticsConfig, Genome};
pub use history::{Mode, Simulation, SimulationError, WorldSnapshot};
pub use organism::{Animal, Producer, Species, SpeciesParams};
pub use stats::{SpeciesTraits, TickStats};
pub use world::World;

/// Monotonic tick counter. Tick 0 is the freshly initialised world.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[must_use]
    pub const fn next(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-unique organism identifier, assigned once and never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OrganismId(pub u64);

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out [`OrganismId`]s for one simulation run.
///
/// Owned by the world rather than kept in any global so that independent
/// simulations (and independent tests) never share counters. Ids are not
/// reclaimed when an organism dies, which keeps lineage records unambiguous
/// even across replay navigation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    pub fn allocate(&mut self) -> OrganismId {
        let id = OrganismId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next
    }
}

/// Errors that can occur when constructing world state.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Static configuration for a Petri world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetriConfig {
    /// Grid width in cells.
    pub grid_width: u32,
    /// Grid height in cells.
    pub grid_height: u32,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Initial population counts per kind.
    pub initial_producers: usize,
    pub initial_herbivores: usize,
    pub initial_carnivores: usize,
    pub initial_omnivores: usize,
    /// Inclusive starting-energy ranges per kind.
    pub producer_energy_range: (f32, f32),
    pub herbivore_energy_range: (f32, f32),
    pub carnivore_energy_range: (f32, f32),
    pub omnivore_energy_range: (f32, f32),
    /// Conversion factor from consumed nutrient to producer energy.
    pub producer_energy_gain: f32,
    /// Hard cap on producer energy.
    pub producer_max_energy: f32,
    /// Energy spent on a seeding attempt.
    pub producer_seed_cost: f32,
    /// Per-tick probability that an energetic producer tries to seed.
    pub producer_seed_prob: f32,
    /// Nutrient drawn from the underlying cell per tick.
    pub producer_consumption: f32,
    /// Flat energy gains on successful consumption.
    pub herbivore_eat_gain: f32,
    pub carnivore_eat_gain: f32,
    pub omnivore_plant_gain: f32,
    pub omnivore_meat_gain: f32,
    /// Reproduction thresholds per kind.
    pub herbivore_repro_threshold: f32,
    pub carnivore_repro_threshold: f32,
    pub omnivore_repro_threshold: f32,
    /// Maximum lifespans per kind, in ticks.
    pub herbivore_max_age: u32,
    pub carnivore_max_age: u32,
    pub omnivore_max_age: u32,
    /// Ticks both parent and child wait between reproductions.
    pub reproduction_cooldown: u32,
    /// Baseline energy drained from every animal each tick.
    pub base_life_cost: f32,
    /// Per-step movement cost multiplier applied to metabolism.
    pub move_cost_factor: f32,
    /// Below this energy an animal forages desperately with forced moves.
    pub critical_energy: f32,
    /// One-time reward for entering a cell absent from recent memory.
    pub discovery_bonus: f32,
    /// Capacity of the recent-cell memory ring.
    pub recent_cell_memory: usize,
    /// Nutrient returned to the death cell by a dying consumer.
    pub consumer_nutrient_release: f32,
    /// Uniform nutrient level of a fresh field.
    pub initial_nutrient: f32,
    /// Multiplicative per-tick decay of nutrient concentration.
    pub nutrient_decay: f32,
    /// Fraction of concentration difference exchanged with each neighbor.
    pub nutrient_diffusion: f32,
    /// Ticks per season phase; the cycle starts in winter at tick 0.
    pub season_length: u64,
    /// Per-tick probability of a disease outbreak roll.
    pub disease_chance: f32,
    /// Ticks an infection lasts.
    pub disease_duration: u32,
    /// Multiplier applied to life and movement costs while infected.
    pub disease_metabolism_multiplier: f32,
    /// Base per-tick probability of a border spawn.
    pub base_spawn_chance: f32,
    pub winter_spawn_multiplier: f32,
    pub summer_spawn_multiplier: f32,
    /// Live ticks after which `step` becomes a no-op.
    pub max_ticks: u64,
    /// Gene ranges and mutation parameters.
    pub genetics: GeneticsConfig,
}

impl Default for PetriConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            rng_seed: None,
            initial_producers: 15,
            initial_herbivores: 10,
            initial_carnivores: 10,
            initial_omnivores: 3,
            producer_energy_range: (5.0, 15.0),
            herbivore_energy_range: (5.0, 25.0),
            carnivore_energy_range: (15.0, 35.0),
            omnivore_energy_range: (5.0, 25.0),
            producer_energy_gain: 0.3,
            producer_max_energy: 30.0,
            producer_seed_cost: 2.0,
            producer_seed_prob: 0.18,
            producer_consumption: 0.1,
            herbivore_eat_gain: 6.0,
            carnivore_eat_gain: 10.0,
            omnivore_plant_gain: 3.0,
            omnivore_meat_gain: 5.0,
            herbivore_repro_threshold: 26.0,
            carnivore_repro_threshold: 27.0,
            omnivore_repro_threshold: 28.0,
            herbivore_max_age: 300,
            carnivore_max_age: 250,
            omnivore_max_age: 280,
            reproduction_cooldown: 10,
            base_life_cost: 1.5,
            move_cost_factor: 0.3,
            critical_energy: 8.0,
            discovery_bonus: 0.2,
            recent_cell_memory: 20,
            consumer_nutrient_release: 0.5,
            initial_nutrient: 0.5,
            nutrient_decay: 0.01,
            nutrient_diffusion: 0.1,
            season_length: 50,
            disease_chance: 0.01,
            disease_duration: 40,
            disease_metabolism_multiplier: 1.3,
            base_spawn_chance: 0.15,
            winter_spawn_multiplier: 0.5,
            summer_spawn_multiplier: 1.2,
            max_ticks: 400,
            genetics: GeneticsConfig::default(),
        }
    }
}

impl PetriConfig {
    /// Validates the configuration. A world is never partially constructed
    /// from an invalid config.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(WorldError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        let cells = (self.grid_width as usize) * (self.grid_height as usize);
        if self.initial_herbivores + self.initial_carnivores + self.initial_omnivores > cells {
            return Err(WorldError::InvalidConfig(
                "initial animal count exceeds grid capacity",
            ));
        }
        if self.initial_producers > cells {
            return Err(WorldError::InvalidConfig(
                "initial producer count exceeds grid capacity",
            ));
        }
        for range in [
            self.producer_energy_range,
            self.herbivore_energy_range,
            self.carnivore_energy_range,
            self.omnivore_energy_range,
        ] {
            if range.0 < 0.0 || range.1 < range.0 {
                return Err(WorldError::InvalidConfig(
                    "energy ranges must be non-negative and ordered low..=high",
                ));
            }
        }
        if self.nutrient_decay < 0.0 || self.nutrient_decay > 1.0 {
            return Err(WorldError::InvalidConfig(
                "nutrient_decay must lie in [0, 1]",
            ));
        }
        // Both sides of every neighbor pair are processed, so a cell can
        // shed up to 8x the rate of its value in one step.
        if self.nutrient_diffusion < 0.0 || self.nutrient_diffusion > 0.125 {
            return Err(WorldError::InvalidConfig(
                "nutrient_diffusion must lie in [0, 0.125]",
            ));
        }
        for probability in [
            self.producer_seed_prob,
            self.disease_chance,
            self.base_spawn_chance,
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(WorldError::InvalidConfig(
                    "probabilities must lie in [0, 1]",
                ));
            }
        }
        if self.producer_energy_gain < 0.0
            || self.producer_max_energy <= 0.0
            || self.producer_seed_cost < 0.0
            || self.producer_consumption < 0.0
            || self.base_life_cost < 0.0
            || self.move_cost_factor < 0.0
            || self.critical_energy < 0.0
            || self.discovery_bonus < 0.0
            || self.consumer_nutrient_release < 0.0
            || self.initial_nutrient < 0.0
        {
            return Err(WorldError::InvalidConfig(
                "energy and nutrient parameters must be non-negative",
            ));
        }
        if self.disease_metabolism_multiplier < 1.0 {
            return Err(WorldError::InvalidConfig(
                "disease_metabolism_multiplier must be at least 1",
            ));
        }
        if self.winter_spawn_multiplier < 0.0 || self.summer_spawn_multiplier < 0.0 {
            return Err(WorldError::InvalidConfig(
                "season spawn multipliers must be non-negative",
            ));
        }
        if self.season_length == 0 {
            return Err(WorldError::InvalidConfig(
                "season_length must be non-zero",
            ));
        }
        if self.recent_cell_memory == 0 {
            return Err(WorldError::InvalidConfig(
                "recent_cell_memory must be non-zero",
            ));
        }
        self.genetics.validate()
    }

    /// Lifespan, reproduction threshold, and starting-energy range for a kind.
    #[must_use]
    pub fn species_params(&self, species: Species) -> SpeciesParams {
        match species {
            Species::Herbivore => SpeciesParams {
                max_age: self.herbivore_max_age,
                reproduction_threshold: self.herbivore_repro_threshold,
                initial_energy: self.herbivore_energy_range,
            },
            Species::Carnivore => SpeciesParams {
                max_age: self.carnivore_max_age,
                reproduction_threshold: self.carnivore_repro_threshold,
                initial_energy: self.carnivore_energy_range,
            },
            Species::Omnivore => SpeciesParams {
                max_age: self.omnivore_max_age,
                reproduction_threshold: self.omnivore_repro_threshold,
                initial_energy: self.omnivore_energy_range,
            },
        }
    }
}
