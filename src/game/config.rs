use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the square grid, in cells
    pub tile_count: usize,
    /// Tick interval at score 0 and speed multiplier 1.0
    pub base_interval_ms: u64,
    /// Points awarded per food eaten
    pub score_per_food: u32,
    /// Score needed for each acceleration step
    pub acceleration_score_step: u32,
    /// Milliseconds taken off the base interval per acceleration step
    pub acceleration_ms: u64,
    /// Lower bound for the score-accelerated base interval
    pub min_base_interval_ms: u64,
    /// Lower bound for the final tick interval
    pub min_interval_ms: u64,
    /// Seed for food placement; random when absent
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_count: 20,
            base_interval_ms: 100,
            score_per_food: 10,
            acceleration_score_step: 50,
            acceleration_ms: 5,
            min_base_interval_ms: 50,
            min_interval_ms: 20,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(tile_count: usize) -> Self {
        Self {
            tile_count,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10)
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: GameConfig =
            serde_json::from_str(&json).context("Failed to parse game config")?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style seed override
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Cell where every session's snake starts
    pub fn origin(&self) -> (i32, i32) {
        let center = (self.tile_count / 2) as i32;
        (center, center)
    }

    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn min_base_interval(&self) -> Duration {
        Duration::from_millis(self.min_base_interval_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Check that all parameters are in usable ranges
    pub fn validate(&self) -> Result<()> {
        if self.tile_count < 2 {
            bail!("tile_count must be at least 2, got {}", self.tile_count);
        }

        if self.tile_count > i32::MAX as usize {
            bail!("tile_count {} does not fit the grid coordinates", self.tile_count);
        }

        if self.base_interval_ms == 0 {
            bail!("base_interval_ms must be positive");
        }

        if self.min_interval_ms == 0 {
            bail!("min_interval_ms must be positive");
        }

        if self.acceleration_score_step == 0 {
            bail!("acceleration_score_step must be at least 1");
        }

        if self.min_base_interval_ms > self.base_interval_ms {
            bail!(
                "min_base_interval_ms ({}) cannot exceed base_interval_ms ({})",
                self.min_base_interval_ms,
                self.base_interval_ms
            );
        }

        Ok(())
    }
}
