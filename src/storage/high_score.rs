use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage for the best score across sessions
pub trait HighScoreStore {
    /// Read the stored score, `None` when nothing has been saved yet
    fn load(&mut self) -> Result<Option<u32>>;

    /// Overwrite the stored score
    fn save(&mut self, score: u32) -> Result<()>;
}

impl<S: HighScoreStore + ?Sized> HighScoreStore for Box<S> {
    fn load(&mut self) -> Result<Option<u32>> {
        (**self).load()
    }

    fn save(&mut self, score: u32) -> Result<()> {
        (**self).save(score)
    }
}

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HighScoreRecord {
    high_score: u32,
    /// Crate version that wrote the record
    version: String,
}

/// Stores the high score as a small JSON document
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<u32>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read high score from {:?}", self.path))?;
        let record: HighScoreRecord =
            serde_json::from_str(&json).context("Failed to deserialize high score")?;

        Ok(Some(record.high_score))
    }

    fn save(&mut self, score: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let record = HighScoreRecord {
            high_score: score,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let json =
            serde_json::to_string_pretty(&record).context("Failed to serialize high score")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write high score to {:?}", self.path))?;

        Ok(())
    }
}

/// Keeps the high score for the lifetime of the process only
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    score: Option<u32>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a score already stored
    pub fn with_score(score: u32) -> Self {
        Self {
            score: Some(score),
            saves: 0,
        }
    }

    pub fn score(&self) -> Option<u32> {
        self.score
    }

    /// Number of writes performed so far
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&mut self) -> Result<Option<u32>> {
        Ok(self.score)
    }

    fn save(&mut self, score: u32) -> Result<()> {
        self.score = Some(score);
        self.saves += 1;
        Ok(())
    }
}
