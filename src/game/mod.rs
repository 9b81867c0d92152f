//! Core game logic module for Snake
//!
//! This module contains all the game logic without any I/O or rendering dependencies.
//! Adapters drive it through commands and read it back through snapshots.

pub mod action;
pub mod config;
pub mod engine;
pub mod speed;
pub mod state;

// Re-export commonly used types
pub use action::{Command, Direction};
pub use config::GameConfig;
pub use engine::{GameEngine, GameOver, TickOutcome};
pub use speed::{tick_interval, SpeedLevel, TickSchedule};
pub use state::{GameOverCause, GameState, Position, SessionState, Snake, Snapshot};
