//! Headless runner for the petri ecosystem simulator.
//!
//! Steps a seeded world to its tick limit, logs population summaries along
//! the way, then writes a per-tick CSV report and persists the full snapshot
//! history to DuckDB.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use petri_core::{PetriConfig, Simulation};
use petri_storage::Storage;
use tracing::info;

/// How often the run loop emits a population summary.
const REPORT_INTERVAL: u64 = 50;

#[derive(Parser, Debug)]
#[command(name = "petri", version, about = "Run a headless petri ecosystem simulation")]
struct Options {
    /// DuckDB database receiving the full snapshot history.
    #[arg(long, default_value = "petri.duckdb")]
    db: String,
    /// CSV file receiving one stats row per recorded tick.
    #[arg(long, default_value = "petri_stats.csv")]
    csv: String,
    /// RNG seed; omitted means a fresh random run.
    #[arg(long)]
    seed: Option<u64>,
    /// Override for the configured tick limit.
    #[arg(long)]
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let options = Options::parse();

    let config = PetriConfig {
        rng_seed: options.seed,
        max_ticks: options.ticks.unwrap_or(PetriConfig::default().max_ticks),
        ..PetriConfig::default()
    };
    let mut sim = Simulation::new(config)?;
    let start = sim.stats();
    info!(
        producers = start.producer_count,
        herbivores = start.herbivore_count,
        carnivores = start.carnivore_count,
        omnivores = start.omnivore_count,
        "Seeded world"
    );

    run_to_limit(&mut sim)?;

    let finish = sim.stats();
    info!(
        tick = finish.tick.0,
        producers = finish.producer_count,
        herbivores = finish.herbivore_count,
        carnivores = finish.carnivore_count,
        omnivores = finish.omnivore_count,
        "Run complete"
    );

    write_stats_csv(&sim, &options.csv)
        .with_context(|| format!("writing stats to {}", options.csv))?;
    persist_history(&sim, &options.db)
        .with_context(|| format!("persisting history to {}", options.db))?;

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn run_to_limit(sim: &mut Simulation) -> Result<()> {
    while sim.step()? {
        let stats = sim.stats();
        if stats.tick.0 % REPORT_INTERVAL == 0 {
            info!(
                tick = stats.tick.0,
                season = %sim.world().season(),
                producers = stats.producer_count,
                herbivores = stats.herbivore_count,
                carnivores = stats.carnivore_count,
                omnivores = stats.omnivore_count,
                "Tick summary"
            );
        }
    }
    Ok(())
}

fn write_stats_csv(sim: &Simulation, path: &str) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", petri_core::TickStats::csv_header())?;
    for snapshot in sim.snapshots() {
        writeln!(out, "{}", snapshot.stats().csv_row())?;
    }
    out.flush()?;
    info!(path, rows = sim.snapshots().len(), "Wrote stats report");
    Ok(())
}

fn persist_history(sim: &Simulation, path: &str) -> Result<()> {
    let mut storage = Storage::open(path)?;
    storage.flush_history(sim.snapshots())?;
    info!(path, ticks = sim.snapshots().len(), "Flushed history");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_arguments() {
        let options = Options::try_parse_from(["petri"]).expect("empty args");
        assert_eq!(options.db, "petri.duckdb");
        assert_eq!(options.csv, "petri_stats.csv");
        assert!(options.seed.is_none());
        assert!(options.ticks.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let options = Options::try_parse_from([
            "petri", "--db", "run.db", "--csv", "run.csv", "--seed", "7", "--ticks", "25",
        ])
        .expect("full args");
        assert_eq!(options.db, "run.db");
        assert_eq!(options.csv, "run.csv");
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.ticks, Some(25));
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(Options::try_parse_from(["petri", "--what"]).is_err());
    }

    #[test]
    fn rejects_missing_value() {
        assert!(Options::try_parse_from(["petri", "--seed"]).is_err());
    }
}
