//! Snapshot history: tick-indexed world copies with live/replay navigation.
//!
//! A snapshot is recorded for tick 0 at construction and after every live
//! tick, so snapshot `n` always describes the world at tick `n`. The mode is
//! derived rather than stored: the simulation is live exactly when the read
//! cursor sits on the newest snapshot.

use crate::genetics::Genome;
use crate::organism::{Animal, Producer, Species};
use crate::stats::TickStats;
use crate::world::World;
use crate::{NutrientField, OrganismId, PetriConfig, Tick, WorldError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Immutable deep copy of the world at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub producers: Vec<Producer>,
    pub herbivores: Vec<Animal>,
    pub carnivores: Vec<Animal>,
    pub omnivores: Vec<Animal>,
    pub field: NutrientField,
}

impl WorldSnapshot {
    /// `[producers, herbivores, carnivores, omnivores]` population counts.
    #[must_use]
    pub fn counts(&self) -> [usize; 4] {
        [
            self.producers.len(),
            self.herbivores.len(),
            self.carnivores.len(),
            self.omnivores.len(),
        ]
    }

    /// Aggregate statistics computed from this snapshot.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        TickStats::new(
            self.tick,
            self.producers.len(),
            &self.herbivores,
            &self.carnivores,
            &self.omnivores,
        )
    }
}

/// Whether new ticks may currently be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Cursor is on the newest snapshot; mutation is allowed.
    Live,
    /// Cursor is behind the newest snapshot; navigation only.
    Replay,
}

/// Errors raised by history navigation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    /// A live-only mutation was attempted while scrubbing the past.
    #[error("cannot mutate state in replay mode; step forward to the newest snapshot first")]
    ReplayMode,
}

/// A [`World`] paired with its full snapshot history and a read cursor.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    snapshots: Vec<WorldSnapshot>,
    cursor: usize,
}

impl Simulation {
    /// Builds the world and records the tick-0 snapshot.
    pub fn new(config: PetriConfig) -> Result<Self, WorldError> {
        let world = World::new(config)?;
        let snapshots = vec![world.snapshot()];
        Ok(Self {
            world,
            snapshots,
            cursor: 0,
        })
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn config(&self) -> &PetriConfig {
        self.world.config()
    }

    /// Snapshot under the read cursor.
    #[must_use]
    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshots[self.cursor]
    }

    /// Every recorded snapshot in tick order.
    #[must_use]
    pub fn snapshots(&self) -> &[WorldSnapshot] {
        &self.snapshots
    }

    /// Tick under the read cursor.
    #[must_use]
    pub fn tick(&self) -> Tick {
        self.snapshots[self.cursor].tick
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.cursor + 1 == self.snapshots.len() {
            Mode::Live
        } else {
            Mode::Replay
        }
    }

    /// Runs one live tick and records its snapshot. Returns `Ok(false)` when
    /// the configured tick limit has been reached (a no-op), and
    /// [`SimulationError::ReplayMode`] when the cursor is not at the tip.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        if self.mode() == Mode::Replay {
            return Err(SimulationError::ReplayMode);
        }
        if self.world.tick().0 >= self.config().max_ticks {
            debug!(tick = self.world.tick().0, "tick limit reached");
            return Ok(false);
        }
        self.world.step_tick();
        self.snapshots.push(self.world.snapshot());
        self.cursor += 1;
        Ok(true)
    }

    /// Moves the cursor one tick into the past, loading that snapshot into
    /// the working state. Returns `false` at tick 0.
    pub fn step_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.world.restore(&self.snapshots[self.cursor]);
        true
    }

    /// Moves the cursor one tick forward. Behind the tip this replays the
    /// recorded snapshot; at the tip it falls through to a live [`step`].
    ///
    /// [`step`]: Simulation::step
    pub fn step_forward(&mut self) -> Result<bool, SimulationError> {
        if self.cursor + 1 < self.snapshots.len() {
            self.cursor += 1;
            self.world.restore(&self.snapshots[self.cursor]);
            Ok(true)
        } else {
            self.step()
        }
    }

    /// Statistics for a recorded tick; `None` when the tick was never run.
    #[must_use]
    pub fn stats_at(&self, tick: Tick) -> Option<TickStats> {
        let snapshot = self.snapshots.get(tick.0 as usize)?;
        debug_assert_eq!(snapshot.tick, tick);
        Some(snapshot.stats())
    }

    /// Statistics for the snapshot under the cursor.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        self.snapshot().stats()
    }

    /// Injects an animal into the live world, refreshing the tip snapshot.
    /// Fails in replay mode like every other live mutation.
    pub fn spawn_animal(
        &mut self,
        species: Species,
        x: u32,
        y: u32,
        energy: f32,
        genome: Option<Genome>,
    ) -> Result<OrganismId, SimulationError> {
        if self.mode() == Mode::Replay {
            return Err(SimulationError::ReplayMode);
        }
        let id = self.world.spawn_animal(species, x, y, energy, genome);
        self.snapshots[self.cursor] = self.world.snapshot();
        Ok(id)
    }

    /// Injects a producer into the live world, refreshing the tip snapshot.
    pub fn spawn_producer(
        &mut self,
        x: u32,
        y: u32,
        energy: f32,
    ) -> Result<OrganismId, SimulationError> {
        if self.mode() == Mode::Replay {
            return Err(SimulationError::ReplayMode);
        }
        let id = self.world.spawn_producer(x, y, energy);
        self.snapshots[self.cursor] = self.world.snapshot();
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PetriConfig {
        PetriConfig {
            grid_width: 12,
            grid_height: 12,
            initial_producers: 8,
            initial_herbivores: 6,
            initial_carnivores: 3,
            initial_omnivores: 2,
            rng_seed: Some(2024),
            max_ticks: 40,
            ..PetriConfig::default()
        }
    }

    #[test]
    fn starts_live_at_tick_zero() {
        let sim = Simulation::new(small_config()).expect("simulation");
        assert_eq!(sim.mode(), Mode::Live);
        assert_eq!(sim.tick(), Tick::ZERO);
        assert_eq!(sim.snapshots().len(), 1);
    }

    #[test]
    fn stepping_back_enters_replay_and_blocks_mutation() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        for _ in 0..5 {
            sim.step().expect("live step");
        }
        assert!(sim.step_back());
        assert_eq!(sim.mode(), Mode::Replay);
        assert_eq!(sim.step(), Err(SimulationError::ReplayMode));
        assert_eq!(
            sim.spawn_producer(0, 0, 10.0),
            Err(SimulationError::ReplayMode)
        );
    }

    #[test]
    fn cannot_step_back_past_tick_zero() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        assert!(!sim.step_back());
        assert_eq!(sim.tick(), Tick::ZERO);
    }

    #[test]
    fn forward_through_history_reaches_live_again() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        for _ in 0..4 {
            sim.step().expect("live step");
        }
        for _ in 0..3 {
            assert!(sim.step_back());
        }
        assert_eq!(sim.mode(), Mode::Replay);
        for _ in 0..3 {
            assert_eq!(sim.step_forward(), Ok(true));
        }
        assert_eq!(sim.mode(), Mode::Live);
        assert_eq!(sim.tick(), Tick(4));
        // At the tip, step_forward runs a fresh live tick.
        assert_eq!(sim.step_forward(), Ok(true));
        assert_eq!(sim.tick(), Tick(5));
    }

    #[test]
    fn replay_navigation_is_idempotent() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        for _ in 0..6 {
            sim.step().expect("live step");
        }
        let reference = sim.snapshot().clone();
        for _ in 0..4 {
            sim.step_back();
        }
        for _ in 0..4 {
            sim.step_forward().expect("replay forward");
        }
        assert_eq!(*sim.snapshot(), reference);
        assert_eq!(sim.world().snapshot(), reference);
    }

    #[test]
    fn step_is_noop_at_tick_limit() {
        let config = PetriConfig {
            max_ticks: 3,
            ..small_config()
        };
        let mut sim = Simulation::new(config).expect("simulation");
        for _ in 0..3 {
            assert_eq!(sim.step(), Ok(true));
        }
        assert_eq!(sim.step(), Ok(false));
        assert_eq!(sim.tick(), Tick(3));
        assert_eq!(sim.snapshots().len(), 4);
    }

    #[test]
    fn stats_for_unrecorded_tick_is_none() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        sim.step().expect("live step");
        assert!(sim.stats_at(Tick(1)).is_some());
        assert!(sim.stats_at(Tick(99)).is_none());
    }

    #[test]
    fn snapshots_serialize_round_trip() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        for _ in 0..3 {
            sim.step().expect("live step");
        }
        let snapshot = sim.snapshot();
        let encoded = serde_json::to_string(snapshot).expect("encode");
        let decoded: WorldSnapshot = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, *snapshot);
    }

    #[test]
    fn snapshots_are_tick_indexed() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        for _ in 0..5 {
            sim.step().expect("live step");
        }
        for (index, snapshot) in sim.snapshots().iter().enumerate() {
            assert_eq!(snapshot.tick, Tick(index as u64));
        }
    }
}
