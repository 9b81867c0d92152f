//! Grid Snake - a terminal snake game with adaptive tick speed
//!
//! This library provides:
//! - Core game engine: session state machine, simulation, tick schedule (game module)
//! - High-score persistence (storage module)
//! - TUI rendering (render module)
//! - Keyboard input mapping (input module)
//! - Session metrics (metrics module)
//! - The interactive play loop (modes module)

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod storage;
