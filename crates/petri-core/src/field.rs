//! Toroidal nutrient field plus the season clock.

use crate::{Tick, WorldError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-phase season cycle. Tick 0 falls in winter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Summer,
}

impl Season {
    /// Season for `tick` given the configured phase length.
    #[must_use]
    pub fn at(tick: Tick, season_length: u64) -> Season {
        if season_length == 0 {
            return Season::Winter;
        }
        if (tick.0 / season_length) % 2 == 0 {
            Season::Winter
        } else {
            Season::Summer
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Summer => "summer",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks a uniformly random cell on one of the four grid borders.
pub fn random_border_cell<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> (u32, u32) {
    match rng.random_range(0..4u8) {
        0 => (rng.random_range(0..width), 0),
        1 => (width - 1, rng.random_range(0..height)),
        2 => (rng.random_range(0..width), height - 1),
        _ => (0, rng.random_range(0..height)),
    }
}

/// Dense 2D grid of nutrient concentration, toroidally wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientField {
    width: u32,
    height: u32,
    cells: Vec<f32>,
}

impl NutrientField {
    /// Construct a field with every cell set to `initial`.
    pub fn new(width: u32, height: u32, initial: f32) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            return Err(WorldError::InvalidConfig(
                "field dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![initial; (width as usize) * (height as usize)],
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize) * (self.width as usize) + (x as usize)
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.cells[self.offset(x, y)]
    }

    /// Adds `amount` to the cell, e.g. a dying consumer's nutrient release.
    pub fn deposit(&mut self, x: u32, y: u32, amount: f32) {
        let index = self.offset(x, y);
        self.cells[index] += amount;
    }

    /// Removes up to `amount` from the cell, returning what was taken.
    pub fn take(&mut self, x: u32, y: u32, amount: f32) -> f32 {
        let index = self.offset(x, y);
        let taken = self.cells[index].min(amount);
        self.cells[index] -= taken;
        taken
    }

    /// Total nutrient mass across the grid.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.cells.iter().sum()
    }

    /// One environment step: symmetric diffusion against the pre-step values,
    /// then multiplicative decay, then a floor at zero.
    ///
    /// Each cell exchanges `diffusion * (difference)` with each of its four
    /// toroidal neighbors; both directions of every pair are processed, so
    /// transfers conserve mass exactly until decay is applied.
    pub fn step(&mut self, diffusion: f32, decay: f32) {
        let width = self.width as i64;
        let height = self.height as i64;
        let previous = self.cells.clone();
        for y in 0..height {
            for x in 0..width {
                let here = (y * width + x) as usize;
                for (dx, dy) in [(0i64, -1i64), (1, 0), (0, 1), (-1, 0)] {
                    let nx = (x + dx).rem_euclid(width);
                    let ny = (y + dy).rem_euclid(height);
                    let there = (ny * width + nx) as usize;
                    let transfer = (previous[here] - previous[there]) * diffusion;
                    self.cells[here] -= transfer;
                    self.cells[there] += transfer;
                }
            }
        }
        for cell in &mut self.cells {
            *cell = (*cell * (1.0 - decay)).max(0.0);
        }
    }
}
