//! High-score persistence
//!
//! The engine reads the stored high score once at construction and writes it
//! back when a session beats it. Stores are plain synchronous objects.

pub mod high_score;

pub use high_score::{HighScoreStore, JsonFileStore, MemoryStore};
