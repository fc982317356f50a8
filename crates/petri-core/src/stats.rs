//! Aggregate per-tick statistics: population counts and trait averages.

use crate::organism::Animal;
use crate::Tick;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Mean heritable traits (plus generation) over one kind's live set.
/// All zeros when the kind is extinct.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTraits {
    pub speed: f64,
    pub generation: f64,
    pub metabolism: f64,
    pub vision: f64,
}

impl SpeciesTraits {
    #[must_use]
    pub fn from_animals(animals: &[Animal]) -> Self {
        if animals.is_empty() {
            return Self::default();
        }
        let count = animals.len() as f64;
        let mut traits = Self::default();
        for animal in animals {
            traits.speed += f64::from(animal.genome.speed);
            traits.generation += f64::from(animal.generation);
            traits.metabolism += f64::from(animal.genome.metabolism);
            traits.vision += f64::from(animal.genome.vision);
        }
        traits.speed /= count;
        traits.generation /= count;
        traits.metabolism /= count;
        traits.vision /= count;
        traits
    }
}

/// One row of the per-tick report consumed by logging and CSV output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickStats {
    pub tick: Tick,
    pub producer_count: usize,
    pub herbivore_count: usize,
    pub carnivore_count: usize,
    pub omnivore_count: usize,
    pub herbivore_traits: SpeciesTraits,
    pub carnivore_traits: SpeciesTraits,
    pub omnivore_traits: SpeciesTraits,
}

impl TickStats {
    #[must_use]
    pub fn new(
        tick: Tick,
        producer_count: usize,
        herbivores: &[Animal],
        carnivores: &[Animal],
        omnivores: &[Animal],
    ) -> Self {
        Self {
            tick,
            producer_count,
            herbivore_count: herbivores.len(),
            carnivore_count: carnivores.len(),
            omnivore_count: omnivores.len(),
            herbivore_traits: SpeciesTraits::from_animals(herbivores),
            carnivore_traits: SpeciesTraits::from_animals(carnivores),
            omnivore_traits: SpeciesTraits::from_animals(omnivores),
        }
    }

    /// Header matching [`TickStats::csv_row`].
    #[must_use]
    pub fn csv_header() -> &'static str {
        "tick,producers,herbivores,carnivores,omnivores,\
         h_speed,h_generation,h_metabolism,h_vision,\
         c_speed,c_generation,c_metabolism,c_vision,\
         o_speed,o_generation,o_metabolism,o_vision"
    }

    /// One CSV row, a pure projection of the stats fields.
    #[must_use]
    pub fn csv_row(&self) -> String {
        let mut row = format!(
            "{},{},{},{},{}",
            self.tick.0,
            self.producer_count,
            self.herbivore_count,
            self.carnivore_count,
            self.omnivore_count
        );
        for traits in [
            &self.herbivore_traits,
            &self.carnivore_traits,
            &self.omnivore_traits,
        ] {
            let _ = write!(
                row,
                ",{:.3},{:.3},{:.3},{:.3}",
                traits.speed, traits.generation, traits.metabolism, traits.vision
            );
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::Genome;
    use crate::organism::Species;
    use crate::OrganismId;

    fn animal(id: u64, speed: u32, metabolism: f32, vision: u32, generation: u32) -> Animal {
        let mut animal = Animal::new(
            OrganismId(id),
            Species::Herbivore,
            0,
            0,
            10.0,
            Genome {
                speed,
                metabolism,
                vision,
            },
        );
        animal.generation = generation;
        animal
    }

    #[test]
    fn traits_average_over_population() {
        let herd = vec![animal(0, 1, 1.0, 1, 0), animal(1, 3, 2.0, 3, 2)];
        let traits = SpeciesTraits::from_animals(&herd);
        assert!((traits.speed - 2.0).abs() < 1e-9);
        assert!((traits.metabolism - 1.5).abs() < 1e-9);
        assert!((traits.vision - 2.0).abs() < 1e-9);
        assert!((traits.generation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_population_reports_zeros() {
        assert_eq!(SpeciesTraits::from_animals(&[]), SpeciesTraits::default());
    }

    #[test]
    fn csv_row_matches_header_width() {
        let stats = TickStats::new(Tick(3), 4, &[animal(0, 2, 1.0, 2, 1)], &[], &[]);
        let columns = stats.csv_row().split(',').count();
        assert_eq!(columns, TickStats::csv_header().split(',').count());
        assert!(stats.csv_row().starts_with("3,4,1,0,0"));
    }
}
