//! Tick engine: world state and the fixed per-tick update order.
//!
//! One tick runs producers, then herbivores, then carnivores, then
//! omnivores, rolls disease and border spawns, diffuses the nutrient field,
//! and finally advances the tick counter. Dead organisms are filtered only
//! after their kind's full pass, so a pass always sees the populations as
//! they stood when it began.

use crate::field::{random_border_cell, NutrientField, Season};
use crate::genetics::Genome;
use crate::history::WorldSnapshot;
use crate::organism::{Animal, Producer, Species};
use crate::stats::TickStats;
use crate::{IdAllocator, OrganismId, PetriConfig, Tick, WorldError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Starting energy of organisms appearing through a border spawn.
const BORDER_PRODUCER_ENERGY: f32 = 10.0;
const BORDER_HERBIVORE_ENERGY: f32 = 15.0;
const BORDER_CARNIVORE_ENERGY: f32 = 20.0;
const BORDER_OMNIVORE_ENERGY: f32 = 15.0;

/// Attempts before a random move gives up and the organism stays put.
const RANDOM_MOVE_TRIES: usize = 5;

const CARDINALS: [(i64, i64); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Full simulation state for one run.
#[derive(Debug)]
pub struct World {
    config: PetriConfig,
    tick: Tick,
    rng: SmallRng,
    ids: IdAllocator,
    producers: Vec<Producer>,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
    omnivores: Vec<Animal>,
    field: NutrientField,
}

impl World {
    /// Builds the initial world: a uniform nutrient field and randomly
    /// placed starting populations. Fails fast on an invalid configuration
    /// without partially constructing anything.
    pub fn new(config: PetriConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        };
        let field = NutrientField::new(
            config.grid_width,
            config.grid_height,
            config.initial_nutrient,
        )?;
        let mut world = Self {
            config,
            tick: Tick::ZERO,
            rng,
            ids: IdAllocator::new(),
            producers: Vec::new(),
            herbivores: Vec::new(),
            carnivores: Vec::new(),
            omnivores: Vec::new(),
            field,
        };
        world.seed_populations();
        Ok(world)
    }

    #[must_use]
    pub fn config(&self) -> &PetriConfig {
        &self.config
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn season(&self) -> Season {
        Season::at(self.tick, self.config.season_length)
    }

    #[must_use]
    pub fn producers(&self) -> &[Producer] {
        &self.producers
    }

    #[must_use]
    pub fn herbivores(&self) -> &[Animal] {
        &self.herbivores
    }

    #[must_use]
    pub fn carnivores(&self) -> &[Animal] {
        &self.carnivores
    }

    #[must_use]
    pub fn omnivores(&self) -> &[Animal] {
        &self.omnivores
    }

    #[must_use]
    pub fn field(&self) -> &NutrientField {
        &self.field
    }

    /// Aggregate counts and trait averages for the current state.
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

    /// Deep-copies the current state into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            producers: self.producers.clone(),
            herbivores: self.herbivores.clone(),
            carnivores: self.carnivores.clone(),
            omnivores: self.omnivores.clone(),
            field: self.field.clone(),
        }
    }

    /// Loads a snapshot back into the live state. The id allocator is left
    /// untouched so identifiers stay unique across replay navigation.
    pub(crate) fn restore(&mut self, snapshot: &WorldSnapshot) {
        self.tick = snapshot.tick;
        self.producers = snapshot.producers.clone();
        self.herbivores = snapshot.herbivores.clone();
        self.carnivores = snapshot.carnivores.clone();
        self.omnivores = snapshot.omnivores.clone();
        self.field = snapshot.field.clone();
    }

    /// Places a producer directly, bypassing the seeding roll. Used by
    /// callers assembling bespoke scenarios.
    pub fn spawn_producer(&mut self, x: u32, y: u32, energy: f32) -> OrganismId {
        let id = self.ids.allocate();
        self.producers.push(Producer::new(
            id,
            x % self.config.grid_width,
            y % self.config.grid_height,
            energy,
        ));
        id
    }

    /// Places an animal directly. A genome of `None` draws a random one from
    /// the configured gene ranges.
    pub fn spawn_animal(
        &mut self,
        species: Species,
        x: u32,
        y: u32,
        energy: f32,
        genome: Option<Genome>,
    ) -> OrganismId {
        let genome = genome.unwrap_or_else(|| Genome::random(&self.config.genetics, &mut self.rng));
        let id = self.ids.allocate();
        let animal = Animal::new(
            id,
            species,
            x % self.config.grid_width,
            y % self.config.grid_height,
            energy,
            genome,
        );
        match species {
            Species::Herbivore => self.herbivores.push(animal),
            Species::Carnivore => self.carnivores.push(animal),
            Species::Omnivore => self.omnivores.push(animal),
        }
        id
    }

    /// Advances the world by one tick in the fixed stage order.
    pub fn step_tick(&mut self) {
        let season = self.season();
        self.stage_producers();
        self.stage_herbivores();
        self.stage_carnivores();
        self.stage_omnivores();
        self.stage_disease();
        self.stage_border_spawn(season);
        self.field
            .step(self.config.nutrient_diffusion, self.config.nutrient_decay);
        self.tick = self.tick.next();
    }

    fn seed_populations(&mut self) {
        let Self {
            config,
            rng,
            ids,
            producers,
            herbivores,
            carnivores,
            omnivores,
            ..
        } = self;
        let (width, height) = (config.grid_width, config.grid_height);
        for _ in 0..config.initial_producers {
            let Some((x, y)) =
                random_free_cell(width, height, rng, |x, y| !producer_at(producers, x, y))
            else {
                break;
            };
            let (low, high) = config.producer_energy_range;
            let energy = rng.random_range(low..=high);
            producers.push(Producer::new(ids.allocate(), x, y, energy));
        }
        for (species, count) in [
            (Species::Herbivore, config.initial_herbivores),
            (Species::Carnivore, config.initial_carnivores),
            (Species::Omnivore, config.initial_omnivores),
        ] {
            for _ in 0..count {
                let cell = {
                    let kin: &[Animal] = match species {
                        Species::Herbivore => herbivores,
                        Species::Carnivore => carnivores,
                        Species::Omnivore => omnivores,
                    };
                    random_free_cell(width, height, rng, |x, y| !animal_at(kin, x, y))
                };
                let Some((x, y)) = cell else { break };
                let (low, high) = config.species_params(species).initial_energy;
                let energy = rng.random_range(low..=high);
                let genome = Genome::random(&config.genetics, rng);
                let animal = Animal::new(ids.allocate(), species, x, y, energy, genome);
                match species {
                    Species::Herbivore => herbivores.push(animal),
                    Species::Carnivore => carnivores.push(animal),
                    Species::Omnivore => omnivores.push(animal),
                }
            }
        }
    }

    /// Producers draw nutrients, cap their energy, and occasionally seed a
    /// Moore-neighborhood cell. Offspring join at the end of the pass and
    /// act for the first time next tick.
    fn stage_producers(&mut self) {
        let Self {
            config,
            rng,
            ids,
            producers,
            herbivores,
            carnivores,
            omnivores,
            field,
            ..
        } = self;
        let initial = producers.len();
        for idx in 0..initial {
            let (x, y) = (producers[idx].x, producers[idx].y);
            let taken = field.take(x, y, config.producer_consumption);
            producers[idx].energy = (producers[idx].energy + taken * config.producer_energy_gain)
                .min(config.producer_max_energy);
            if producers[idx].energy > config.producer_seed_cost
                && rng.random::<f32>() < config.producer_seed_prob
            {
                // The seed cost is spent on the attempt even when the chosen
                // cell turns out to be blocked.
                producers[idx].energy -= config.producer_seed_cost;
                let (sx, sy) =
                    random_moore_neighbor(x, y, config.grid_width, config.grid_height, rng);
                let blocked = producer_at(producers, sx, sy)
                    || animal_at(herbivores, sx, sy)
                    || animal_at(carnivores, sx, sy)
                    || animal_at(omnivores, sx, sy);
                if !blocked {
                    let (low, high) = config.producer_energy_range;
                    let energy = rng.random_range(low..=high);
                    let child = Producer::seeded(&producers[idx], ids.allocate(), sx, sy, energy);
                    producers.push(child);
                }
            }
        }
        producers.retain(|producer| !producer.is_dead());
    }

    fn stage_herbivores(&mut self) {
        let Self {
            config,
            rng,
            ids,
            producers,
            herbivores,
            carnivores,
            omnivores,
            field,
            ..
        } = self;
        let initial = herbivores.len();
        for idx in 0..initial {
            update_herbivore(
                config, rng, ids, herbivores, idx, producers, carnivores, omnivores,
            );
            let herbivore = &herbivores[idx];
            if herbivore.is_dead() {
                field.deposit(herbivore.x, herbivore.y, config.consumer_nutrient_release);
            }
        }
        herbivores.retain(|animal| !animal.is_dead());
    }

    fn stage_carnivores(&mut self) {
        let Self {
            config,
            rng,
            ids,
            herbivores,
            carnivores,
            field,
            ..
        } = self;
        let initial = carnivores.len();
        for idx in 0..initial {
            update_carnivore(config, rng, ids, carnivores, idx, herbivores);
            let carnivore = &carnivores[idx];
            if carnivore.is_dead() {
                field.deposit(carnivore.x, carnivore.y, config.consumer_nutrient_release);
            }
        }
        carnivores.retain(|animal| !animal.is_dead());
    }

    fn stage_omnivores(&mut self) {
        let Self {
            config,
            rng,
            ids,
            producers,
            herbivores,
            carnivores,
            omnivores,
            field,
            ..
        } = self;
        let initial = omnivores.len();
        for idx in 0..initial {
            update_omnivore(
                config, rng, ids, omnivores, idx, producers, herbivores, carnivores,
            );
            let omnivore = &omnivores[idx];
            if omnivore.is_dead() {
                field.deposit(omnivore.x, omnivore.y, config.consumer_nutrient_release);
            }
        }
        omnivores.retain(|animal| !animal.is_dead());
    }

    /// With probability `disease_chance` per tick, tries to infect up to
    /// five animals drawn without replacement from the combined population.
    /// Each draw infects a healthy animal with a further 70% roll.
    fn stage_disease(&mut self) {
        let Self {
            config,
            tick,
            rng,
            herbivores,
            carnivores,
            omnivores,
            ..
        } = self;
        if rng.random::<f32>() >= config.disease_chance {
            return;
        }
        let total = herbivores.len() + carnivores.len() + omnivores.len();
        if total == 0 {
            return;
        }
        let mut pool: Vec<(u8, usize)> = (0..herbivores.len())
            .map(|i| (0u8, i))
            .chain((0..carnivores.len()).map(|i| (1u8, i)))
            .chain((0..omnivores.len()).map(|i| (2u8, i)))
            .collect();
        let max_infections = (total / 5 + 1).min(5);
        let mut infected = 0usize;
        for _ in 0..max_infections {
            if pool.is_empty() {
                break;
            }
            let pick = rng.random_range(0..pool.len());
            let (kind, i) = pool.swap_remove(pick);
            let animal = match kind {
                0 => &mut herbivores[i],
                1 => &mut carnivores[i],
                _ => &mut omnivores[i],
            };
            if animal.disease_timer == 0 && rng.random::<f32>() < 0.7 {
                animal.disease_timer = config.disease_duration;
                infected += 1;
            }
        }
        if infected > 0 {
            debug!(tick = tick.0, infected, "disease outbreak");
        }
    }

    /// Season-modulated chance of one new organism appearing on a border
    /// cell. The spawn is skipped when the cell already holds an organism of
    /// the chosen kind, preserving per-kind occupancy exclusivity.
    fn stage_border_spawn(&mut self, season: Season) {
        let Self {
            config,
            tick,
            rng,
            ids,
            producers,
            herbivores,
            carnivores,
            omnivores,
            ..
        } = self;
        let multiplier = match season {
            Season::Summer => config.summer_spawn_multiplier,
            Season::Winter => config.winter_spawn_multiplier,
        };
        if rng.random::<f32>() >= config.base_spawn_chance * multiplier {
            return;
        }
        let (x, y) = random_border_cell(config.grid_width, config.grid_height, rng);
        match rng.random_range(0..4u8) {
            0 => {
                if !producer_at(producers, x, y) {
                    producers.push(Producer::new(ids.allocate(), x, y, BORDER_PRODUCER_ENERGY));
                    debug!(tick = tick.0, x, y, kind = "producer", "border spawn");
                }
            }
            kind => {
                let (species, energy, population) = match kind {
                    1 => (Species::Herbivore, BORDER_HERBIVORE_ENERGY, &mut *herbivores),
                    2 => (Species::Carnivore, BORDER_CARNIVORE_ENERGY, &mut *carnivores),
                    _ => (Species::Omnivore, BORDER_OMNIVORE_ENERGY, &mut *omnivores),
                };
                if !animal_at(population, x, y) {
                    let genome = Genome::random(&config.genetics, rng);
                    population.push(Animal::new(ids.allocate(), species, x, y, energy, genome));
                    debug!(tick = tick.0, x, y, kind = species.as_str(), "border spawn");
                }
            }
        }
    }
}

/// A scan hit: raw (unwrapped) offsets and the Manhattan distance.
#[derive(Debug, Clone, Copy)]
struct Target {
    dx: i64,
    dy: i64,
    distance: i64,
}

fn wrap(value: i64, extent: u32) -> u32 {
    value.rem_euclid(i64::from(extent)) as u32
}

fn animal_at(animals: &[Animal], x: u32, y: u32) -> bool {
    animals.iter().any(|animal| animal.x == x && animal.y == y)
}

fn producer_at(producers: &[Producer], x: u32, y: u32) -> bool {
    producers
        .iter()
        .any(|producer| producer.x == x && producer.y == y)
}

fn same_kind_occupied(animals: &[Animal], skip: usize, x: u32, y: u32) -> bool {
    animals
        .iter()
        .enumerate()
        .any(|(i, animal)| i != skip && animal.x == x && animal.y == y)
}

fn random_free_cell<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    rng: &mut R,
    mut is_free: impl FnMut(u32, u32) -> bool,
) -> Option<(u32, u32)> {
    for _ in 0..64 {
        let x = rng.random_range(0..width);
        let y = rng.random_range(0..height);
        if is_free(x, y) {
            return Some((x, y));
        }
    }
    // Dense grid: fall back to a linear scan so placement cannot livelock.
    for y in 0..height {
        for x in 0..width {
            if is_free(x, y) {
                return Some((x, y));
            }
        }
    }
    None
}

const MOORE: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];

fn random_moore_neighbor<R: Rng + ?Sized>(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    rng: &mut R,
) -> (u32, u32) {
    let (dx, dy) = MOORE[rng.random_range(0..MOORE.len())];
    (
        wrap(i64::from(x) + dx, width),
        wrap(i64::from(y) + dy, height),
    )
}

/// Nearest animal across the given groups within `vision` Manhattan cells.
/// Groups are scanned in order and ties keep the first hit, so earlier
/// groups take precedence at equal distance.
fn nearest_target(groups: &[&[Animal]], x: u32, y: u32, vision: u32) -> Option<Target> {
    let mut best: Option<Target> = None;
    let mut best_distance = i64::from(vision) + 1;
    for group in groups {
        for animal in *group {
            let dx = i64::from(animal.x) - i64::from(x);
            let dy = i64::from(animal.y) - i64::from(y);
            let distance = dx.abs() + dy.abs();
            if distance <= i64::from(vision) && distance < best_distance {
                best_distance = distance;
                best = Some(Target { dx, dy, distance });
            }
        }
    }
    best
}

fn nearest_producer(producers: &[Producer], x: u32, y: u32, vision: u32) -> Option<Target> {
    let mut best: Option<Target> = None;
    let mut best_distance = i64::from(vision) + 1;
    for producer in producers {
        let dx = i64::from(producer.x) - i64::from(x);
        let dy = i64::from(producer.y) - i64::from(y);
        let distance = dx.abs() + dy.abs();
        if distance <= i64::from(vision) && distance < best_distance {
            best_distance = distance;
            best = Some(Target { dx, dy, distance });
        }
    }
    best
}

/// Baseline upkeep shared by every animal: life cost (scaled while
/// infected), aging, and cooldown bookkeeping. Returns `false` when the
/// animal died of starvation or old age.
fn upkeep(animal: &mut Animal, config: &PetriConfig, max_age: u32) -> bool {
    let mut life_cost = config.base_life_cost;
    if animal.is_infected() {
        life_cost *= config.disease_metabolism_multiplier;
        animal.disease_timer -= 1;
    }
    animal.energy -= life_cost;
    animal.age += 1;
    if animal.reproduction_cooldown > 0 {
        animal.reproduction_cooldown -= 1;
    }
    if animal.energy <= 0.0 {
        return false;
    }
    if animal.age > max_age {
        animal.energy = -1.0;
        return false;
    }
    true
}

/// Per-step movement cost. Returns `false` when the payer starved.
fn pay_move_cost(animal: &mut Animal, config: &PetriConfig) -> bool {
    let mut cost = config.move_cost_factor * animal.genome.metabolism;
    if animal.is_infected() {
        cost *= config.disease_metabolism_multiplier;
    }
    animal.energy -= cost;
    animal.energy > 0.0
}

/// One step along the sign of the direction vector, toroidally wrapped.
/// Falls back to a random move when the destination is blocked by a
/// same-kind organism.
fn step_toward(
    animals: &mut [Animal],
    idx: usize,
    (dx, dy): (i64, i64),
    config: &PetriConfig,
    rng: &mut SmallRng,
) {
    let nx = wrap(i64::from(animals[idx].x) + dx.signum(), config.grid_width);
    let ny = wrap(i64::from(animals[idx].y) + dy.signum(), config.grid_height);
    if same_kind_occupied(animals, idx, nx, ny) {
        step_random(animals, idx, config, rng);
    } else {
        animals[idx].x = nx;
        animals[idx].y = ny;
    }
}

/// A bounded random walk attempt: up to [`RANDOM_MOVE_TRIES`] draws of a
/// cardinal direction, staying put when every draw lands on an occupied
/// cell. Exhaustion is not an error.
fn step_random(animals: &mut [Animal], idx: usize, config: &PetriConfig, rng: &mut SmallRng) {
    for _ in 0..RANDOM_MOVE_TRIES {
        let (dx, dy) = CARDINALS[rng.random_range(0..CARDINALS.len())];
        let nx = wrap(i64::from(animals[idx].x) + dx, config.grid_width);
        let ny = wrap(i64::from(animals[idx].y) + dy, config.grid_height);
        if !same_kind_occupied(animals, idx, nx, ny) {
            animals[idx].x = nx;
            animals[idx].y = ny;
            return;
        }
    }
}

/// Removes and consumes a producer on the eater's cell, if any.
fn eat_producer(
    animals: &mut [Animal],
    idx: usize,
    producers: &mut Vec<Producer>,
    gain: f32,
) -> bool {
    let (x, y) = (animals[idx].x, animals[idx].y);
    if let Some(pos) = producers
        .iter()
        .position(|producer| producer.x == x && producer.y == y)
    {
        producers.remove(pos);
        animals[idx].energy += gain;
        return true;
    }
    false
}

/// Removes and consumes a prey animal on the eater's cell, if any.
fn eat_prey(animals: &mut [Animal], idx: usize, prey: &mut Vec<Animal>, gain: f32) -> bool {
    let (x, y) = (animals[idx].x, animals[idx].y);
    if let Some(pos) = prey.iter().position(|p| p.x == x && p.y == y) {
        prey.remove(pos);
        animals[idx].energy += gain;
        return true;
    }
    false
}

fn grant_discovery_bonus(animal: &mut Animal, config: &PetriConfig) {
    if config.discovery_bonus > 0.0 && animal.note_visit(config.recent_cell_memory) {
        animal.energy += config.discovery_bonus;
    }
}

/// Splits the parent's energy in half (float division) and hands the child
/// a mutated genome. The child lands on a random same-kind-free cell of the
/// parent's Moore neighborhood so per-kind occupancy stays exclusive; a
/// fully crowded neighborhood skips reproduction entirely, leaving the
/// parent's energy and cooldown untouched.
fn try_reproduce(
    config: &PetriConfig,
    rng: &mut SmallRng,
    ids: &mut IdAllocator,
    animals: &mut Vec<Animal>,
    idx: usize,
    threshold: f32,
) {
    if animals[idx].energy < threshold || animals[idx].reproduction_cooldown > 0 {
        return;
    }
    let (px, py) = (animals[idx].x, animals[idx].y);
    let open: Vec<(u32, u32)> = MOORE
        .iter()
        .map(|(dx, dy)| {
            (
                wrap(i64::from(px) + dx, config.grid_width),
                wrap(i64::from(py) + dy, config.grid_height),
            )
        })
        .filter(|(x, y)| !animal_at(animals, *x, *y))
        .collect();
    if open.is_empty() {
        return;
    }
    let (cx, cy) = open[rng.random_range(0..open.len())];
    let child_energy = animals[idx].energy / 2.0;
    animals[idx].energy -= child_energy;
    animals[idx].reproduction_cooldown = config.reproduction_cooldown;
    let genome = animals[idx].genome.mutate(&config.genetics, rng);
    let child = Animal::child_of(
        &animals[idx],
        ids.allocate(),
        cx,
        cy,
        child_energy,
        genome,
        config.reproduction_cooldown,
    );
    animals.push(child);
}

/// Herbivore tick: flee the nearest visible predator, otherwise chase the
/// nearest producer, otherwise wander (desperately when below the critical
/// energy line).
#[allow(clippy::too_many_arguments)]
fn update_herbivore(
    config: &PetriConfig,
    rng: &mut SmallRng,
    ids: &mut IdAllocator,
    herbivores: &mut Vec<Animal>,
    idx: usize,
    producers: &mut Vec<Producer>,
    carnivores: &[Animal],
    omnivores: &[Animal],
) {
    if !upkeep(&mut herbivores[idx], config, config.herbivore_max_age) {
        return;
    }
    let (x, y, vision, speed) = {
        let me = &herbivores[idx];
        (me.x, me.y, me.genome.vision, me.genome.speed)
    };
    if let Some(threat) = nearest_target(&[carnivores, omnivores], x, y, vision) {
        let away = (-threat.dx, -threat.dy);
        for _ in 0..speed {
            step_toward(herbivores, idx, away, config, rng);
            if !pay_move_cost(&mut herbivores[idx], config) {
                return;
            }
        }
    } else if let Some(target) = nearest_producer(producers, x, y, vision) {
        let dir = (target.dx, target.dy);
        for _ in 0..speed {
            step_toward(herbivores, idx, dir, config, rng);
            if !pay_move_cost(&mut herbivores[idx], config) {
                return;
            }
            if eat_producer(herbivores, idx, producers, config.herbivore_eat_gain) {
                break;
            }
        }
    } else if herbivores[idx].energy < config.critical_energy {
        for _ in 0..speed.max(1) {
            step_random(herbivores, idx, config, rng);
            if !pay_move_cost(&mut herbivores[idx], config) {
                return;
            }
            if eat_producer(herbivores, idx, producers, config.herbivore_eat_gain) {
                break;
            }
        }
    } else {
        step_random(herbivores, idx, config, rng);
        if !pay_move_cost(&mut herbivores[idx], config) {
            return;
        }
        eat_producer(herbivores, idx, producers, config.herbivore_eat_gain);
    }
    grant_discovery_bonus(&mut herbivores[idx], config);
    try_reproduce(
        config,
        rng,
        ids,
        herbivores,
        idx,
        config.herbivore_repro_threshold,
    );
}

/// Carnivore tick: hunt the nearest visible herbivore, otherwise wander.
fn update_carnivore(
    config: &PetriConfig,
    rng: &mut SmallRng,
    ids: &mut IdAllocator,
    carnivores: &mut Vec<Animal>,
    idx: usize,
    herbivores: &mut Vec<Animal>,
) {
    if !upkeep(&mut carnivores[idx], config, config.carnivore_max_age) {
        return;
    }
    let (x, y, vision, speed) = {
        let me = &carnivores[idx];
        (me.x, me.y, me.genome.vision, me.genome.speed)
    };
    if let Some(target) = nearest_target(&[herbivores], x, y, vision) {
        let dir = (target.dx, target.dy);
        for _ in 0..speed {
            step_toward(carnivores, idx, dir, config, rng);
            if !pay_move_cost(&mut carnivores[idx], config) {
                return;
            }
            if eat_prey(carnivores, idx, herbivores, config.carnivore_eat_gain) {
                break;
            }
        }
    } else if carnivores[idx].energy < config.critical_energy {
        for _ in 0..speed.max(1) {
            step_random(carnivores, idx, config, rng);
            if !pay_move_cost(&mut carnivores[idx], config) {
                return;
            }
            if eat_prey(carnivores, idx, herbivores, config.carnivore_eat_gain) {
                break;
            }
        }
    } else {
        step_random(carnivores, idx, config, rng);
        if !pay_move_cost(&mut carnivores[idx], config) {
            return;
        }
        eat_prey(carnivores, idx, herbivores, config.carnivore_eat_gain);
    }
    grant_discovery_bonus(&mut carnivores[idx], config);
    try_reproduce(
        config,
        rng,
        ids,
        carnivores,
        idx,
        config.carnivore_repro_threshold,
    );
}

/// Omnivore tick: chase whichever of the nearest herbivore or producer is
/// closer (ties go to the producer), then settle any stand-off with a
/// carnivore sharing the cell.
#[allow(clippy::too_many_arguments)]
fn update_omnivore(
    config: &PetriConfig,
    rng: &mut SmallRng,
    ids: &mut IdAllocator,
    omnivores: &mut Vec<Animal>,
    idx: usize,
    producers: &mut Vec<Producer>,
    herbivores: &mut Vec<Animal>,
    carnivores: &mut Vec<Animal>,
) {
    if !upkeep(&mut omnivores[idx], config, config.omnivore_max_age) {
        return;
    }
    let (x, y, vision, speed) = {
        let me = &omnivores[idx];
        (me.x, me.y, me.genome.vision, me.genome.speed)
    };
    let prey = nearest_target(&[herbivores], x, y, vision);
    let plant = nearest_producer(producers, x, y, vision);
    let choice = match (prey, plant) {
        (Some(meat), Some(plant)) => {
            if meat.distance < plant.distance {
                Some((meat, true))
            } else {
                Some((plant, false))
            }
        }
        (Some(meat), None) => Some((meat, true)),
        (None, Some(plant)) => Some((plant, false)),
        (None, None) => None,
    };
    if let Some((target, wants_meat)) = choice {
        let dir = (target.dx, target.dy);
        for _ in 0..speed {
            step_toward(omnivores, idx, dir, config, rng);
            if !pay_move_cost(&mut omnivores[idx], config) {
                return;
            }
            let ate = if wants_meat {
                eat_prey(omnivores, idx, herbivores, config.omnivore_meat_gain)
            } else {
                eat_producer(omnivores, idx, producers, config.omnivore_plant_gain)
            };
            if ate {
                break;
            }
        }
    } else if omnivores[idx].energy < config.critical_energy {
        for _ in 0..speed.max(1) {
            step_random(omnivores, idx, config, rng);
            if !pay_move_cost(&mut omnivores[idx], config) {
                return;
            }
            if eat_prey(omnivores, idx, herbivores, config.omnivore_meat_gain)
                || eat_producer(omnivores, idx, producers, config.omnivore_plant_gain)
            {
                break;
            }
        }
    } else {
        step_random(omnivores, idx, config, rng);
        if !pay_move_cost(&mut omnivores[idx], config) {
            return;
        }
        // An unhurried wander grazes the whole cell: meat and plant both.
        eat_prey(omnivores, idx, herbivores, config.omnivore_meat_gain);
        eat_producer(omnivores, idx, producers, config.omnivore_plant_gain);
    }
    grant_discovery_bonus(&mut omnivores[idx], config);
    carnivore_encounter(config, rng, omnivores, idx, carnivores);
    if omnivores[idx].is_dead() {
        return;
    }
    try_reproduce(
        config,
        rng,
        ids,
        omnivores,
        idx,
        config.omnivore_repro_threshold,
    );
}

/// Fixed three-way stand-off between an omnivore and the first carnivore on
/// its cell: 80% the carnivore kills and feeds, 13% the omnivore kills and
/// feeds, 7% both walk away.
fn carnivore_encounter(
    config: &PetriConfig,
    rng: &mut SmallRng,
    omnivores: &mut [Animal],
    idx: usize,
    carnivores: &mut Vec<Animal>,
) {
    let (x, y) = (omnivores[idx].x, omnivores[idx].y);
    let Some(pos) = carnivores
        .iter()
        .position(|carnivore| carnivore.x == x && carnivore.y == y)
    else {
        return;
    };
    let roll: f32 = rng.random();
    if roll < 0.80 {
        carnivores[pos].energy += config.carnivore_eat_gain;
        omnivores[idx].energy = -1.0;
    } else if roll < 0.93 {
        omnivores[idx].energy += config.omnivore_meat_gain;
        carnivores.remove(pos);
    }
}
