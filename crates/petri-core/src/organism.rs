//! Entity types: producers and the three animal kinds.

use crate::genetics::Genome;
use crate::OrganismId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// The three genome-bearing kinds. Producers are modelled separately since
/// they carry no genome and never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
    Omnivore,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Herbivore, Species::Carnivore, Species::Omnivore];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Species::Herbivore => "herbivore",
            Species::Carnivore => "carnivore",
            Species::Omnivore => "omnivore",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific scalar parameters resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesParams {
    pub max_age: u32,
    pub reproduction_threshold: f32,
    pub initial_energy: (f32, f32),
}

/// A stationary plant. Gains energy from the nutrient cell beneath it and
/// occasionally seeds a neighbor cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub id: OrganismId,
    pub parent: Option<OrganismId>,
    pub x: u32,
    pub y: u32,
    pub energy: f32,
    pub generation: u32,
}

impl Producer {
    #[must_use]
    pub fn new(id: OrganismId, x: u32, y: u32, energy: f32) -> Self {
        Self {
            id,
            parent: None,
            x,
            y,
            energy,
            generation: 0,
        }
    }

    /// A seeded offspring placed at `(x, y)`.
    #[must_use]
    pub fn seeded(parent: &Producer, id: OrganismId, x: u32, y: u32, energy: f32) -> Self {
        Self {
            id,
            parent: Some(parent.id),
            x,
            y,
            energy,
            generation: parent.generation + 1,
        }
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.energy <= 0.0
    }
}

/// A mobile, genome-bearing organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: OrganismId,
    pub parent: Option<OrganismId>,
    pub species: Species,
    pub x: u32,
    pub y: u32,
    pub energy: f32,
    pub age: u32,
    pub generation: u32,
    pub genome: Genome,
    /// Remaining infection ticks; 0 means healthy.
    pub disease_timer: u32,
    /// Ticks until reproduction is allowed again.
    pub reproduction_cooldown: u32,
    /// Bounded ring of recently visited cells, seeded with the birth cell.
    pub recent_cells: VecDeque<(u32, u32)>,
}

impl Animal {
    #[must_use]
    pub fn new(
        id: OrganismId,
        species: Species,
        x: u32,
        y: u32,
        energy: f32,
        genome: Genome,
    ) -> Self {
        Self {
            id,
            parent: None,
            species,
            x,
            y,
            energy,
            age: 0,
            generation: 0,
            genome,
            disease_timer: 0,
            reproduction_cooldown: 0,
            recent_cells: VecDeque::from([(x, y)]),
        }
    }

    /// A child born at `(x, y)` with a mutated genome. Both ends of the
    /// lineage enter reproduction cooldown; the caller sets the parent's.
    #[must_use]
    pub fn child_of(
        parent: &Animal,
        id: OrganismId,
        x: u32,
        y: u32,
        energy: f32,
        genome: Genome,
        cooldown: u32,
    ) -> Self {
        let mut child = Animal::new(id, parent.species, x, y, energy, genome);
        child.parent = Some(parent.id);
        child.generation = parent.generation + 1;
        child.reproduction_cooldown = cooldown;
        child
    }

    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.disease_timer > 0
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.energy <= 0.0
    }

    /// Records the current cell in the recent-cell ring. Returns `true` when
    /// the cell was not already remembered, i.e. the visit is a discovery.
    pub fn note_visit(&mut self, capacity: usize) -> bool {
        let cell = (self.x, self.y);
        if self.recent_cells.contains(&cell) {
            return false;
        }
        self.recent_cells.push_back(cell);
        while self.recent_cells.len() > capacity {
            self.recent_cells.pop_front();
        }
        true
    }
}
