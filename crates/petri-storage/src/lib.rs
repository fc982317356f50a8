//! DuckDB-backed long-term store for petri simulation snapshots.
//!
//! Records are keyed by tick number. Writing the same tick twice replaces
//! the previous record wholesale, so persisting a re-run of a replayed tick
//! is idempotent. Each record holds the per-kind population counts, a
//! columnar table of organism attributes (position, energy, genome,
//! lineage), the full nutrient grid, and free-form debug log lines.

use duckdb::{Connection, params};
use petri_core::{Animal, Producer, WorldSnapshot};
use thiserror::Error;
use tracing::debug;

/// Storage error wrapper.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("environment encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One organism's attributes as persisted. Producers carry no genome, so
/// the gene columns are null for them.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganismRow {
    pub organism_id: u64,
    pub parent_id: Option<u64>,
    pub species: String,
    pub x: u32,
    pub y: u32,
    pub energy: f32,
    pub age: u32,
    pub generation: u32,
    pub speed: Option<u32>,
    pub metabolism: Option<f32>,
    pub vision: Option<u32>,
}

impl OrganismRow {
    fn from_producer(producer: &Producer) -> Self {
        Self {
            organism_id: producer.id.0,
            parent_id: producer.parent.map(|id| id.0),
            species: "producer".to_owned(),
            x: producer.x,
            y: producer.y,
            energy: producer.energy,
            age: 0,
            generation: producer.generation,
            speed: None,
            metabolism: None,
            vision: None,
        }
    }

    fn from_animal(animal: &Animal) -> Self {
        Self {
            organism_id: animal.id.0,
            parent_id: animal.parent.map(|id| id.0),
            species: animal.species.as_str().to_owned(),
            x: animal.x,
            y: animal.y,
            energy: animal.energy,
            age: animal.age,
            generation: animal.generation,
            speed: Some(animal.genome.speed),
            metabolism: Some(animal.genome.metabolism),
            vision: Some(animal.genome.vision),
        }
    }
}

/// A fully loaded per-tick record.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    pub tick: u64,
    pub producer_count: usize,
    pub herbivore_count: usize,
    pub carnivore_count: usize,
    pub omnivore_count: usize,
    pub width: u32,
    pub height: u32,
    pub cells: Vec<f32>,
    pub organisms: Vec<OrganismRow>,
    pub debug_logs: Vec<String>,
}

/// Tick-keyed DuckDB store.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create a DuckDB database at the provided path.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let mut storage = Self { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// In-memory database, mainly for tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let mut storage = Self { conn };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&mut self) -> Result<(), StorageError> {
        self.conn.execute(
            "create table if not exists ticks (
                tick bigint primary key,
                producer_count integer,
                herbivore_count integer,
                carnivore_count integer,
                omnivore_count integer
            )",
            [],
        )?;
        self.conn.execute(
            "create table if not exists organisms (
                tick bigint,
                organism_id bigint,
                parent_id bigint,
                species text,
                x integer,
                y integer,
                energy double,
                age integer,
                generation integer,
                speed integer,
                metabolism double,
                vision integer,
                primary key (tick, organism_id)
            )",
            [],
        )?;
        self.conn.execute(
            "create table if not exists environment (
                tick bigint primary key,
                width integer,
                height integer,
                cells text
            )",
            [],
        )?;
        self.conn.execute(
            "create table if not exists debug_logs (
                tick bigint,
                seq bigint,
                message text,
                primary key (tick, seq)
            )",
            [],
        )?;
        Ok(())
    }

    /// Persists one snapshot under its tick key, replacing any previous
    /// record for that tick.
    pub fn save_snapshot(
        &mut self,
        snapshot: &WorldSnapshot,
        logs: &[String],
    ) -> Result<(), StorageError> {
        let tick = snapshot.tick.0 as i64;
        let cells_json = serde_json::to_string(snapshot.field.cells())?;
        let tx = self.conn.transaction()?;
        for table in ["ticks", "organisms", "environment", "debug_logs"] {
            tx.execute(&format!("delete from {table} where tick = ?"), params![tick])?;
        }
        tx.execute(
            "insert into ticks (
                tick, producer_count, herbivore_count, carnivore_count, omnivore_count
            ) values (?, ?, ?, ?, ?)",
            params![
                tick,
                snapshot.producers.len() as i64,
                snapshot.herbivores.len() as i64,
                snapshot.carnivores.len() as i64,
                snapshot.omnivores.len() as i64,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "insert into organisms (
                    tick, organism_id, parent_id, species, x, y,
                    energy, age, generation, speed, metabolism, vision
                ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            let rows = snapshot
                .producers
                .iter()
                .map(OrganismRow::from_producer)
                .chain(snapshot.herbivores.iter().map(OrganismRow::from_animal))
                .chain(snapshot.carnivores.iter().map(OrganismRow::from_animal))
                .chain(snapshot.omnivores.iter().map(OrganismRow::from_animal));
            for row in rows {
                stmt.execute(params![
                    tick,
                    row.organism_id as i64,
                    row.parent_id.map(|id| id as i64),
                    row.species,
                    i64::from(row.x),
                    i64::from(row.y),
                    f64::from(row.energy),
                    i64::from(row.age),
                    i64::from(row.generation),
                    row.speed.map(i64::from),
                    row.metabolism.map(f64::from),
                    row.vision.map(i64::from),
                ])?;
            }
        }
        tx.execute(
            "insert into environment (tick, width, height, cells) values (?, ?, ?, ?)",
            params![
                tick,
                i64::from(snapshot.field.width()),
                i64::from(snapshot.field.height()),
                cells_json,
            ],
        )?;
        {
            let mut stmt =
                tx.prepare("insert into debug_logs (tick, seq, message) values (?, ?, ?)")?;
            for (seq, message) in logs.iter().enumerate() {
                stmt.execute(params![tick, seq as i64, message])?;
            }
        }
        tx.commit()?;
        debug!(tick, logs = logs.len(), "snapshot persisted");
        Ok(())
    }

    /// Serializes every given in-memory snapshot. An empty history still
    /// leaves behind a valid (empty) database.
    pub fn flush_history(&mut self, snapshots: &[WorldSnapshot]) -> Result<(), StorageError> {
        for snapshot in snapshots {
            self.save_snapshot(snapshot, &[])?;
        }
        debug!(snapshots = snapshots.len(), "history flushed");
        Ok(())
    }

    /// Every recorded tick number, ascending.
    pub fn recorded_ticks(&mut self) -> Result<Vec<u64>, StorageError> {
        let mut stmt = self.conn.prepare("select tick from ticks order by tick")?;
        let mut rows = stmt.query([])?;
        let mut ticks = Vec::new();
        while let Some(row) = rows.next()? {
            let tick: i64 = row.get(0)?;
            ticks.push(tick as u64);
        }
        Ok(ticks)
    }

    /// Loads one tick's record, or `None` when the tick was never written.
    pub fn load_tick(&mut self, tick: u64) -> Result<Option<TickRecord>, StorageError> {
        let key = tick as i64;
        let counts = {
            let mut stmt = self.conn.prepare(
                "select producer_count, herbivore_count, carnivore_count, omnivore_count
                 from ticks where tick = ?",
            )?;
            let mut rows = stmt.query(params![key])?;
            match rows.next()? {
                Some(row) => {
                    let producer: i64 = row.get(0)?;
                    let herbivore: i64 = row.get(1)?;
                    let carnivore: i64 = row.get(2)?;
                    let omnivore: i64 = row.get(3)?;
                    (
                        producer as usize,
                        herbivore as usize,
                        carnivore as usize,
                        omnivore as usize,
                    )
                }
                None => return Ok(None),
            }
        };
        let (width, height, cells) = {
            let mut stmt = self
                .conn
                .prepare("select width, height, cells from environment where tick = ?")?;
            let mut rows = stmt.query(params![key])?;
            match rows.next()? {
                Some(row) => {
                    let width: i64 = row.get(0)?;
                    let height: i64 = row.get(1)?;
                    let encoded: String = row.get(2)?;
                    let cells: Vec<f32> = serde_json::from_str(&encoded)?;
                    (width as u32, height as u32, cells)
                }
                None => (0, 0, Vec::new()),
            }
        };
        let organisms = {
            let mut stmt = self.conn.prepare(
                "select organism_id, parent_id, species, x, y,
                        energy, age, generation, speed, metabolism, vision
                 from organisms where tick = ? order by organism_id",
            )?;
            let mut rows = stmt.query(params![key])?;
            let mut organisms = Vec::new();
            while let Some(row) = rows.next()? {
                let organism_id: i64 = row.get(0)?;
                let parent_id: Option<i64> = row.get(1)?;
                let species: String = row.get(2)?;
                let x: i64 = row.get(3)?;
                let y: i64 = row.get(4)?;
                let energy: f64 = row.get(5)?;
                let age: i64 = row.get(6)?;
                let generation: i64 = row.get(7)?;
                let speed: Option<i64> = row.get(8)?;
                let metabolism: Option<f64> = row.get(9)?;
                let vision: Option<i64> = row.get(10)?;
                organisms.push(OrganismRow {
                    organism_id: organism_id as u64,
                    parent_id: parent_id.map(|id| id as u64),
                    species,
                    x: x as u32,
                    y: y as u32,
                    energy: energy as f32,
                    age: age as u32,
                    generation: generation as u32,
                    speed: speed.map(|v| v as u32),
                    metabolism: metabolism.map(|v| v as f32),
                    vision: vision.map(|v| v as u32),
                });
            }
            organisms
        };
        let debug_logs = {
            let mut stmt = self
                .conn
                .prepare("select message from debug_logs where tick = ? order by seq")?;
            let mut rows = stmt.query(params![key])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row.get(0)?);
            }
            logs
        };
        Ok(Some(TickRecord {
            tick,
            producer_count: counts.0,
            herbivore_count: counts.1,
            carnivore_count: counts.2,
            omnivore_count: counts.3,
            width,
            height,
            cells,
            organisms,
            debug_logs,
        }))
    }

    /// Loads the full ordered sequence of recorded ticks.
    pub fn load_all(&mut self) -> Result<Vec<TickRecord>, StorageError> {
        let mut records = Vec::new();
        for tick in self.recorded_ticks()? {
            if let Some(record) = self.load_tick(tick)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_core::{PetriConfig, Simulation, Species};

    fn sample_simulation(seed: u64) -> Simulation {
        let config = PetriConfig {
            grid_width: 8,
            grid_height: 8,
            initial_producers: 5,
            initial_herbivores: 4,
            initial_carnivores: 2,
            initial_omnivores: 1,
            rng_seed: Some(seed),
            ..PetriConfig::default()
        };
        Simulation::new(config).expect("simulation")
    }

    #[test]
    fn round_trip_reproduces_counts_and_attributes() -> Result<(), StorageError> {
        let mut sim = sample_simulation(11);
        for _ in 0..4 {
            sim.step().expect("live tick");
        }
        let snapshot = sim.snapshot().clone();
        let logs = vec!["outbreak checked".to_owned(), "border spawn".to_owned()];

        let mut storage = Storage::open_in_memory()?;
        storage.save_snapshot(&snapshot, &logs)?;

        let record = storage.load_tick(snapshot.tick.0)?.expect("recorded tick");
        assert_eq!(record.tick, snapshot.tick.0);
        assert_eq!(record.producer_count, snapshot.producers.len());
        assert_eq!(record.herbivore_count, snapshot.herbivores.len());
        assert_eq!(record.carnivore_count, snapshot.carnivores.len());
        assert_eq!(record.omnivore_count, snapshot.omnivores.len());
        assert_eq!(
            record.organisms.len(),
            snapshot.producers.len()
                + snapshot.herbivores.len()
                + snapshot.carnivores.len()
                + snapshot.omnivores.len()
        );
        assert_eq!(record.cells.len(), snapshot.field.cells().len());
        for (stored, live) in record.cells.iter().zip(snapshot.field.cells()) {
            assert!((stored - live).abs() < 1e-6);
        }
        assert_eq!(record.debug_logs, logs);

        for herbivore in &snapshot.herbivores {
            let row = record
                .organisms
                .iter()
                .find(|row| row.organism_id == herbivore.id.0)
                .expect("herbivore row");
            assert_eq!(row.species, "herbivore");
            assert_eq!((row.x, row.y), (herbivore.x, herbivore.y));
            assert!((row.energy - herbivore.energy).abs() < 1e-5);
            assert_eq!(row.speed, Some(herbivore.genome.speed));
            assert_eq!(row.vision, Some(herbivore.genome.vision));
            assert_eq!(row.generation, herbivore.generation);
            assert_eq!(row.parent_id, herbivore.parent.map(|id| id.0));
        }
        for producer in &snapshot.producers {
            let row = record
                .organisms
                .iter()
                .find(|row| row.organism_id == producer.id.0)
                .expect("producer row");
            assert_eq!(row.species, "producer");
            assert_eq!(row.speed, None);
            assert_eq!(row.metabolism, None);
        }
        Ok(())
    }

    #[test]
    fn rewriting_a_tick_replaces_the_record() -> Result<(), StorageError> {
        let mut sim = sample_simulation(23);
        sim.step().expect("live tick");
        let first = sim.snapshot().clone();

        let mut storage = Storage::open_in_memory()?;
        storage.save_snapshot(&first, &["first write".to_owned()])?;

        sim.spawn_animal(Species::Herbivore, 0, 0, 12.0, None)
            .expect("live spawn");
        let second = sim.snapshot().clone();
        assert_eq!(second.tick, first.tick);
        storage.save_snapshot(&second, &[])?;

        let record = storage.load_tick(first.tick.0)?.expect("recorded tick");
        assert_eq!(record.herbivore_count, second.herbivores.len());
        assert_eq!(
            record.organisms.len(),
            second.producers.len()
                + second.herbivores.len()
                + second.carnivores.len()
                + second.omnivores.len()
        );
        assert!(record.debug_logs.is_empty(), "old logs must not survive");
        assert_eq!(storage.recorded_ticks()?, vec![first.tick.0]);
        Ok(())
    }

    #[test]
    fn flushing_an_empty_history_is_valid() -> Result<(), StorageError> {
        let mut storage = Storage::open_in_memory()?;
        storage.flush_history(&[])?;
        assert!(storage.recorded_ticks()?.is_empty());
        assert!(storage.load_all()?.is_empty());
        Ok(())
    }

    #[test]
    fn flush_history_writes_every_snapshot_in_order() -> Result<(), StorageError> {
        let mut sim = sample_simulation(37);
        for _ in 0..5 {
            sim.step().expect("live tick");
        }
        let mut storage = Storage::open_in_memory()?;
        storage.flush_history(sim.snapshots())?;

        assert_eq!(storage.recorded_ticks()?, vec![0, 1, 2, 3, 4, 5]);
        let records = storage.load_all()?;
        assert_eq!(records.len(), 6);
        for (record, snapshot) in records.iter().zip(sim.snapshots()) {
            assert_eq!(record.tick, snapshot.tick.0);
            assert_eq!(record.producer_count, snapshot.producers.len());
        }
        Ok(())
    }

    #[test]
    fn missing_tick_loads_none() -> Result<(), StorageError> {
        let mut storage = Storage::open_in_memory()?;
        assert!(storage.load_tick(123)?.is_none());
        Ok(())
    }

    #[test]
    fn reopening_preserves_records() -> Result<(), StorageError> {
        let path = temp_db_path("petri-reopen");
        let path_string = path.to_string_lossy().to_string();
        let mut sim = sample_simulation(53);
        sim.step().expect("live tick");

        {
            let mut storage = Storage::open(&path_string)?;
            storage.flush_history(sim.snapshots())?;
        }
        let mut storage = Storage::open(&path_string)?;
        assert_eq!(storage.recorded_ticks()?, vec![0, 1]);

        drop(storage);
        let _ = std::fs::remove_file(path);
        Ok(())
    }

    fn temp_db_path(prefix: &str) -> std::path::PathBuf {
        use std::time::{SystemTime, UNIX_EPOCH};
        let mut path = std::env::temp_dir();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        path.push(format!(
            "{}-{}-{}.duckdb",
            prefix,
            std::process::id(),
            timestamp
        ));
        path
    }
}
