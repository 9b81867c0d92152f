use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    action::{Command, Direction},
    config::GameConfig,
    speed::{tick_interval, SpeedLevel, TickSchedule},
    state::{GameOverCause, GameState, Position, SessionState, Snake, Snapshot},
};
use crate::storage::{HighScoreStore, MemoryStore};

/// Random draws per grid cell before food placement falls back to scanning
const FOOD_SAMPLE_ROUNDS: usize = 4;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOver {
    /// `None` when the session was cut short by a restart
    pub cause: Option<GameOverCause>,
    pub final_score: u32,
    pub new_high_score: bool,
}

/// Result of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session was not running; nothing changed
    Skipped,
    /// The snake moved one cell
    Advanced { ate_food: bool },
    /// The move ended the session
    GameOver(GameOver),
}

impl TickOutcome {
    /// Whether the render sink should redraw
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, TickOutcome::Skipped)
    }
}

/// The game engine: session state machine, simulation and tick schedule
pub struct GameEngine<S: HighScoreStore = MemoryStore> {
    config: GameConfig,
    state: GameState,
    speed: SpeedLevel,
    high_score: u32,
    new_high_score: bool,
    store: S,
    rng: StdRng,
    schedule: TickSchedule,
}

impl<S: HighScoreStore> GameEngine<S> {
    /// Create an idle engine, reading the stored high score
    pub fn new(config: GameConfig, speed: SpeedLevel, mut store: S) -> Result<Self> {
        config.validate()?;

        let high_score = match store.load() {
            Ok(score) => score.unwrap_or(0),
            Err(err) => {
                warn!("Could not read high score, starting from 0: {:#}", err);
                0
            }
        };

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let snake = Snake::new(config.origin().into());
        let food = spawn_food(&mut rng, config.tile_count, &snake)
            .context("Grid has no room for food")?;
        let state = GameState::new(snake, food, config.tile_count);

        Ok(Self {
            config,
            state,
            speed,
            high_score,
            new_high_score: false,
            store,
            rng,
            schedule: TickSchedule::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn session(&self) -> SessionState {
        self.state.session
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn speed_level(&self) -> SpeedLevel {
        self.speed
    }

    pub fn schedule(&self) -> &TickSchedule {
        &self.schedule
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Interval the tick schedule should run at for the current score and level
    pub fn tick_interval(&self) -> Duration {
        tick_interval(&self.config, self.state.score, self.speed)
    }

    /// Read-only view for the render sink
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            snake: self.state.snake.segments().to_vec(),
            food: self.state.food,
            score: self.state.score,
            high_score: self.high_score,
            session: self.state.session,
            speed_level: self.speed,
            tile_count: self.state.tile_count,
            game_over: self.state.game_over,
            new_high_score: self.new_high_score,
        }
    }

    /// Apply a command, returning whether it was accepted
    pub fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Move(direction) => self.change_direction(direction),
            Command::TogglePause => self.toggle_pause(),
            Command::Start => self.start(),
            Command::Restart => {
                self.restart();
                true
            }
        }
    }

    /// Begin a session from Idle or Over
    pub fn start(&mut self) -> bool {
        if self.state.session.in_progress() {
            return false;
        }

        let snake = Snake::new(self.config.origin().into());
        let Some(food) = spawn_food(&mut self.rng, self.config.tile_count, &snake) else {
            return false;
        };

        self.state = GameState {
            snake,
            food,
            direction: Some(Direction::Right),
            score: 0,
            session: SessionState::Running,
            tile_count: self.config.tile_count,
            game_over: None,
        };
        self.new_high_score = false;
        self.schedule.replace(self.tick_interval());

        info!(
            "Session started (speed level {}, interval {:?})",
            self.speed,
            self.tick_interval()
        );
        true
    }

    /// Pause a running session or resume a paused one
    pub fn toggle_pause(&mut self) -> bool {
        match self.state.session {
            SessionState::Running => {
                self.state.session = SessionState::Paused;
                self.schedule.cancel();
                info!("Session paused at score {}", self.state.score);
                true
            }
            SessionState::Paused => {
                self.state.session = SessionState::Running;
                self.schedule.replace(self.tick_interval());
                info!("Session resumed");
                true
            }
            SessionState::Idle | SessionState::Over => false,
        }
    }

    /// End any session in progress and start a fresh one
    pub fn restart(&mut self) -> Option<GameOver> {
        let ended = self
            .state
            .session
            .in_progress()
            .then(|| self.end_session(None));
        self.start();
        ended
    }

    /// Request a new heading for the next tick
    pub fn change_direction(&mut self, direction: Direction) -> bool {
        if self.state.session != SessionState::Running {
            return false;
        }

        match self.state.direction {
            Some(current) if current.is_opposite(direction) => false,
            _ => {
                self.state.direction = Some(direction);
                true
            }
        }
    }

    /// Change the speed dial; a running schedule picks it up immediately
    pub fn set_speed_level(&mut self, level: SpeedLevel) {
        if level == self.speed {
            return;
        }

        self.speed = level;
        info!("Speed level set to {}", level);

        if self.state.session == SessionState::Running {
            self.reschedule();
        }
    }

    /// Advance the simulation by one step
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.session != SessionState::Running {
            return TickOutcome::Skipped;
        }
        let Some(direction) = self.state.direction else {
            return TickOutcome::Skipped;
        };

        let new_head = self.state.snake.head().moved_in_direction(direction);
        let ate_food = new_head == self.state.food;

        // Checked before committing so a fatal move leaves the snake untouched
        let collision = if !self.state.is_in_bounds(new_head) {
            Some(GameOverCause::Wall)
        } else if self.state.snake.would_collide(new_head, ate_food) {
            Some(GameOverCause::SelfCollision)
        } else {
            None
        };

        if let Some(cause) = collision {
            return TickOutcome::GameOver(self.end_session(Some(cause)));
        }

        self.state.snake.advance(new_head, ate_food);

        if ate_food {
            self.state.score = self.state.score.saturating_add(self.config.score_per_food);
            debug!("Food eaten, score {}", self.state.score);

            match spawn_food(&mut self.rng, self.config.tile_count, &self.state.snake) {
                Some(food) => self.state.food = food,
                None => {
                    return TickOutcome::GameOver(
                        self.end_session(Some(GameOverCause::BoardFilled)),
                    )
                }
            }

            self.reschedule();
        }

        TickOutcome::Advanced { ate_food }
    }

    /// Replace the schedule if the computed interval moved
    fn reschedule(&mut self) {
        let interval = self.tick_interval();
        if self.schedule.current() != Some(interval) {
            debug!("Rescheduling ticks every {:?}", interval);
            self.schedule.replace(interval);
        }
    }

    fn end_session(&mut self, cause: Option<GameOverCause>) -> GameOver {
        self.schedule.cancel();
        self.state.session = SessionState::Over;
        self.state.game_over = cause;

        let final_score = self.state.score;
        self.new_high_score = final_score > self.high_score;

        if self.new_high_score {
            self.high_score = final_score;
            if let Err(err) = self.store.save(final_score) {
                warn!("Failed to persist high score {}: {:#}", final_score, err);
            }
        }

        info!(
            "Session over ({:?}), final score {}{}",
            cause,
            final_score,
            if self.new_high_score { ", new high score" } else { "" }
        );

        GameOver {
            cause,
            final_score,
            new_high_score: self.new_high_score,
        }
    }
}

/// Pick a random free cell, or `None` when the snake covers the grid
///
/// Uses rejection sampling, then falls back to choosing among the free cells
/// once the sample budget is spent.
fn spawn_food(rng: &mut StdRng, tile_count: usize, snake: &Snake) -> Option<Position> {
    let side = tile_count as i32;
    let cells = tile_count * tile_count;

    if snake.len() < cells {
        for _ in 0..cells * FOOD_SAMPLE_ROUNDS {
            let pos = Position::new(rng.gen_range(0..side), rng.gen_range(0..side));

            if !snake.occupies(pos) {
                return Some(pos);
            }
        }
    }

    let free: Vec<Position> = (0..side)
        .flat_map(|y| (0..side).map(move |x| Position::new(x, y)))
        .filter(|pos| !snake.occupies(*pos))
        .collect();

    free.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(config: GameConfig, store: MemoryStore) -> GameEngine<MemoryStore> {
        GameEngine::new(config.with_seed(42), SpeedLevel::default(), store).unwrap()
    }

    fn running_engine() -> GameEngine<MemoryStore> {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::new());
        assert!(engine.start());
        engine
    }

    fn place(engine: &mut GameEngine<MemoryStore>, cells: &[(i32, i32)], dir: Direction) {
        let segments = cells.iter().copied().map(Position::from).collect();
        engine.state.snake = Snake::from_segments(segments).unwrap();
        engine.state.direction = Some(dir);
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = engine_with(GameConfig::default(), MemoryStore::new());

        assert_eq!(engine.session(), SessionState::Idle);
        assert_eq!(engine.high_score(), 0);
        assert_eq!(engine.state().direction, None);
        assert!(!engine.schedule().is_active());
        assert!(!engine.state().snake.occupies(engine.state().food));
    }

    #[test]
    fn test_start_resets_session() {
        let engine = running_engine();

        assert_eq!(engine.session(), SessionState::Running);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.state().snake.segments(), &[Position::new(10, 10)]);
        assert_eq!(engine.state().direction, Some(Direction::Right));
        assert_eq!(engine.schedule().current(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_start_ignored_while_in_progress() {
        let mut engine = running_engine();
        engine.state.score = 30;

        assert!(!engine.start());
        assert_eq!(engine.score(), 30);

        engine.toggle_pause();
        assert!(!engine.start());
        assert_eq!(engine.session(), SessionState::Paused);
    }

    #[test]
    fn test_toggle_pause_ignored_when_idle() {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::new());

        assert!(!engine.toggle_pause());
        assert_eq!(engine.session(), SessionState::Idle);
    }

    #[test]
    fn test_eating_food_grows_and_scores() {
        let mut engine = running_engine();
        place(&mut engine, &[(10, 10)], Direction::Right);
        engine.state.food = Position::new(11, 10);

        let outcome = engine.tick();

        assert_eq!(outcome, TickOutcome::Advanced { ate_food: true });
        assert_eq!(
            engine.state().snake.segments(),
            &[Position::new(11, 10), Position::new(10, 10)]
        );
        assert_eq!(engine.score(), 10);
        assert!(!engine.state().snake.occupies(engine.state().food));
    }

    #[test]
    fn test_plain_move_keeps_length() {
        let mut engine = running_engine();
        place(&mut engine, &[(5, 5), (4, 5), (3, 5)], Direction::Right);
        engine.state.food = Position::new(0, 0);

        assert_eq!(engine.tick(), TickOutcome::Advanced { ate_food: false });
        assert_eq!(
            engine.state().snake.segments(),
            &[Position::new(6, 5), Position::new(5, 5), Position::new(4, 5)]
        );
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn test_wall_collision_leaves_snake_untouched() {
        let mut engine = running_engine();
        place(&mut engine, &[(0, 10), (1, 10)], Direction::Left);
        let before = engine.state().snake.clone();

        let outcome = engine.tick();

        assert_eq!(
            outcome,
            TickOutcome::GameOver(GameOver {
                cause: Some(GameOverCause::Wall),
                final_score: 0,
                new_high_score: false,
            })
        );
        assert_eq!(engine.session(), SessionState::Over);
        assert_eq!(engine.state().snake, before);
        assert!(!engine.schedule().is_active());
    }

    #[test]
    fn test_far_wall_collision() {
        let mut engine = running_engine();
        place(&mut engine, &[(19, 3)], Direction::Right);

        assert!(matches!(engine.tick(), TickOutcome::GameOver(_)));
        assert_eq!(engine.state().game_over, Some(GameOverCause::Wall));
    }

    #[test]
    fn test_self_collision() {
        let mut engine = running_engine();
        // Head at (5,5) heading up; turning left runs into (4,5)
        place(
            &mut engine,
            &[(5, 5), (5, 6), (4, 6), (4, 5), (4, 4)],
            Direction::Up,
        );
        engine.state.food = Position::new(0, 0);

        assert!(engine.change_direction(Direction::Left));
        let outcome = engine.tick();

        assert!(matches!(
            outcome,
            TickOutcome::GameOver(GameOver {
                cause: Some(GameOverCause::SelfCollision),
                ..
            })
        ));
        assert_eq!(engine.state().snake.len(), 5);
    }

    #[test]
    fn test_chasing_tail_is_allowed() {
        let mut engine = running_engine();
        place(&mut engine, &[(5, 5), (4, 5), (4, 6), (5, 6)], Direction::Right);
        engine.state.food = Position::new(0, 0);

        assert!(engine.change_direction(Direction::Down));
        assert_eq!(engine.tick(), TickOutcome::Advanced { ate_food: false });
        assert_eq!(engine.state().snake.head(), Position::new(5, 6));
    }

    #[test]
    fn test_reversal_rejected() {
        let mut engine = running_engine();

        assert!(!engine.change_direction(Direction::Left));
        assert_eq!(engine.state().direction, Some(Direction::Right));

        assert!(engine.change_direction(Direction::Up));
        assert!(!engine.change_direction(Direction::Down));
        assert_eq!(engine.state().direction, Some(Direction::Up));
    }

    #[test]
    fn test_direction_ignored_unless_running() {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::new());
        assert!(!engine.change_direction(Direction::Up));

        engine.start();
        engine.toggle_pause();
        assert!(!engine.change_direction(Direction::Up));
        assert_eq!(engine.state().direction, Some(Direction::Right));
    }

    #[test]
    fn test_paused_tick_changes_nothing() {
        let mut engine = running_engine();
        engine.toggle_pause();
        let before = engine.state().clone();

        assert_eq!(engine.tick(), TickOutcome::Skipped);
        assert_eq!(engine.state(), &before);
        assert!(!engine.schedule().is_active());

        assert!(engine.toggle_pause());
        assert_eq!(engine.session(), SessionState::Running);
        assert_eq!(engine.schedule().current(), Some(engine.tick_interval()));
    }

    #[test]
    fn test_food_eaten_reschedules_when_interval_changes() {
        let mut engine = running_engine();
        place(&mut engine, &[(10, 10)], Direction::Right);
        engine.state.food = Position::new(11, 10);
        engine.state.score = 40;
        let generation = engine.schedule().generation();

        engine.tick();

        assert_eq!(engine.score(), 50);
        assert_eq!(engine.schedule().current(), Some(Duration::from_millis(95)));
        assert_eq!(engine.schedule().generation(), generation + 1);
    }

    #[test]
    fn test_food_eaten_keeps_schedule_when_interval_unchanged() {
        let mut engine = running_engine();
        place(&mut engine, &[(10, 10)], Direction::Right);
        engine.state.food = Position::new(11, 10);
        let generation = engine.schedule().generation();

        engine.tick();

        assert_eq!(engine.schedule().generation(), generation);
    }

    #[test]
    fn test_speed_change_while_running_reschedules() {
        let mut engine = running_engine();

        engine.set_speed_level(SpeedLevel::new(20).unwrap());
        assert_eq!(engine.schedule().current(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn test_speed_change_while_paused_applies_on_resume() {
        let mut engine = running_engine();
        engine.toggle_pause();

        engine.set_speed_level(SpeedLevel::new(1).unwrap());
        assert!(!engine.schedule().is_active());

        engine.toggle_pause();
        assert_eq!(engine.schedule().current(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_high_score_kept_when_not_beaten() {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::with_score(50));
        engine.start();
        engine.state.score = 30;
        place(&mut engine, &[(0, 0)], Direction::Up);

        let outcome = engine.tick();

        assert!(matches!(
            outcome,
            TickOutcome::GameOver(GameOver { final_score: 30, new_high_score: false, .. })
        ));
        assert_eq!(engine.high_score(), 50);
        assert_eq!(engine.store().score(), Some(50));
        assert_eq!(engine.store().saves(), 0);
    }

    #[test]
    fn test_high_score_updated_when_beaten() {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::with_score(50));
        engine.start();
        engine.state.score = 80;
        place(&mut engine, &[(0, 0)], Direction::Up);

        engine.tick();

        assert_eq!(engine.high_score(), 80);
        assert_eq!(engine.store().score(), Some(80));
        assert!(engine.snapshot().new_high_score);
    }

    #[test]
    fn test_start_after_game_over_resets_score() {
        let mut engine = running_engine();
        engine.state.score = 20;
        place(&mut engine, &[(0, 0)], Direction::Left);
        engine.tick();
        assert_eq!(engine.session(), SessionState::Over);

        assert!(engine.start());
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.state().game_over, None);
        assert!(!engine.snapshot().new_high_score);
    }

    #[test]
    fn test_restart_mid_session_commits_and_restarts() {
        let mut engine = running_engine();
        engine.state.score = 70;
        let generation = engine.schedule().generation();

        let ended = engine.restart();

        assert_eq!(
            ended,
            Some(GameOver {
                cause: None,
                final_score: 70,
                new_high_score: true,
            })
        );
        assert_eq!(engine.high_score(), 70);
        assert_eq!(engine.session(), SessionState::Running);
        assert_eq!(engine.score(), 0);
        assert!(engine.schedule().generation() > generation);
        assert!(engine.schedule().is_active());
    }

    #[test]
    fn test_restart_from_idle_just_starts() {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::new());

        assert_eq!(engine.restart(), None);
        assert_eq!(engine.session(), SessionState::Running);
    }

    #[test]
    fn test_board_filled_ends_session() {
        let mut engine = engine_with(GameConfig::new(2), MemoryStore::new());
        engine.start();
        place(&mut engine, &[(1, 1), (1, 0), (0, 0)], Direction::Left);
        engine.state.food = Position::new(0, 1);

        let outcome = engine.tick();

        assert!(matches!(
            outcome,
            TickOutcome::GameOver(GameOver {
                cause: Some(GameOverCause::BoardFilled),
                final_score: 10,
                ..
            })
        ));
        assert_eq!(engine.state().snake.len(), 4);
    }

    #[test]
    fn test_spawn_food_finds_last_free_cell() {
        let mut rng = StdRng::seed_from_u64(1);
        let snake = Snake::from_segments(vec![
            Position::new(0, 0),
            Position::new(1, 0),
            Position::new(1, 1),
        ])
        .unwrap();

        assert_eq!(spawn_food(&mut rng, 2, &snake), Some(Position::new(0, 1)));
    }

    #[test]
    fn test_dispatch_routes_commands() {
        let mut engine = engine_with(GameConfig::default(), MemoryStore::new());

        assert!(!engine.dispatch(Command::TogglePause));
        assert!(engine.dispatch(Command::Start));
        assert!(engine.dispatch(Command::Move(Direction::Down)));
        assert!(engine.dispatch(Command::TogglePause));
        assert_eq!(engine.session(), SessionState::Paused);
        assert!(engine.dispatch(Command::Restart));
        assert_eq!(engine.session(), SessionState::Running);
    }

    #[test]
    fn test_random_play_keeps_invariants() {
        let mut engine = engine_with(GameConfig::small(), MemoryStore::new());
        let mut rng = StdRng::seed_from_u64(7);
        let directions = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

        for _ in 0..2_000 {
            if engine.session() != SessionState::Running {
                engine.start();
            }

            if rng.gen_bool(0.3) {
                engine.change_direction(*directions.choose(&mut rng).unwrap());
            }

            let len_before = engine.state().snake.len();
            let score_before = engine.score();
            let food_before = engine.state().food;
            let next_head = engine
                .state()
                .snake
                .head()
                .moved_in_direction(engine.state().direction.unwrap());

            match engine.tick() {
                TickOutcome::Advanced { ate_food } => {
                    let snake = &engine.state().snake;
                    assert!(!snake.has_overlap());
                    assert!(!snake.occupies(engine.state().food));
                    assert!(engine.score() >= score_before);
                    assert_eq!(ate_food, next_head == food_before);
                    let expected = if ate_food { len_before + 1 } else { len_before };
                    assert_eq!(snake.len(), expected);
                }
                TickOutcome::GameOver(over) => {
                    assert_eq!(over.final_score, engine.score());
                    if over.cause != Some(GameOverCause::BoardFilled) {
                        assert_eq!(engine.state().snake.len(), len_before);
                    }
                }
                TickOutcome::Skipped => panic!("running engine skipped a tick"),
            }
        }
    }
}
