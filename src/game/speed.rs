//! Tick interval computation
//!
//! The interval between ticks is derived from three inputs: the configured base
//! interval, an acceleration term that grows with the score, and a multiplier
//! picked by the player's speed level. Higher levels mean faster play.

use std::fmt;
use std::time::Duration;

use super::config::GameConfig;

/// Speed multiplier per level, index 0 is level 1
const SPEED_MULTIPLIERS: [f64; SpeedLevel::COUNT] = [
    0.1, 0.15, 0.2, 0.25, 0.3, 0.4, 0.5, 0.6, 0.7, 1.0, //
    1.2, 1.4, 1.6, 1.8, 2.0, 2.3, 2.6, 3.0, 3.5, 4.0,
];

/// Player-selected speed dial, always within `MIN..=MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeedLevel(u8);

impl SpeedLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;
    const COUNT: usize = (Self::MAX - Self::MIN + 1) as usize;

    /// Returns `None` for levels outside `MIN..=MAX`
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn multiplier(&self) -> f64 {
        SPEED_MULTIPLIERS[(self.0 - Self::MIN) as usize]
    }

    /// One level faster, saturating at `MAX`
    pub fn faster(&self) -> Self {
        Self(self.0.saturating_add(1).min(Self::MAX))
    }

    /// One level slower, saturating at `MIN`
    pub fn slower(&self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN))
    }
}

impl Default for SpeedLevel {
    fn default() -> Self {
        Self(10)
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the tick interval for a score and speed level
pub fn tick_interval(config: &GameConfig, score: u32, level: SpeedLevel) -> Duration {
    let steps = u64::from(score / config.acceleration_score_step);
    let acceleration = Duration::from_millis(steps.saturating_mul(config.acceleration_ms));
    let adjusted = config
        .base_interval()
        .saturating_sub(acceleration)
        .max(config.min_base_interval());

    let micros = (adjusted.as_micros() as f64 / level.multiplier()).round() as u64;
    Duration::from_micros(micros).max(config.min_interval())
}

/// Single-slot handle for the pending tick schedule
///
/// Holds at most one interval. Every `replace` or `cancel` bumps the generation so
/// the driver can tell its timer is stale and rebuild it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSchedule {
    slot: Option<Duration>,
    generation: u64,
}

impl TickSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new interval, dropping whatever was scheduled before
    pub fn replace(&mut self, interval: Duration) {
        self.slot = Some(interval);
        self.generation += 1;
    }

    /// Drop the scheduled interval, if any
    pub fn cancel(&mut self) {
        if self.slot.take().is_some() {
            self.generation += 1;
        }
    }

    pub fn current(&self) -> Option<Duration> {
        self.slot
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
