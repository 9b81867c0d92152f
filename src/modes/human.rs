use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::future::pending;
use std::io::{stderr, Stderr};
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::game::{Command, GameEngine, SessionState, TickOutcome};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::GameMetrics;
use crate::render::Renderer;
use crate::storage::HighScoreStore;

/// Keyboard-driven play in the terminal
pub struct HumanMode<S: HighScoreStore> {
    engine: GameEngine<S>,
    metrics: GameMetrics,
    renderer: Renderer,
    input_handler: InputHandler,
    should_quit: bool,
    needs_redraw: bool,
    /// Timer driving `engine.tick`, rebuilt whenever the engine's schedule changes
    tick_timer: Option<Interval>,
    timer_generation: Option<u64>,
}

impl<S: HighScoreStore> HumanMode<S> {
    pub fn new(engine: GameEngine<S>) -> Self {
        Self {
            engine,
            metrics: GameMetrics::new(),
            renderer: Renderer::new(),
            input_handler: InputHandler::new(),
            should_quit: false,
            needs_redraw: true,
            tick_timer: None,
            timer_generation: None,
        }
    }

    pub fn engine(&self) -> &GameEngine<S> {
        &self.engine
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        // Run game loop with cleanup
        let result = self.run_game_loop(&mut terminal).await;

        // Cleanup terminal
        self.cleanup_terminal(&mut terminal)?;

        result
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();

        // Keeps the play clock in the header moving between ticks
        let mut clock_timer = interval(Duration::from_secs(1));

        self.sync_tick_timer();

        loop {
            if self.needs_redraw {
                let snapshot = self.engine.snapshot();
                terminal
                    .draw(|frame| {
                        self.renderer.render(frame, &snapshot, &self.metrics);
                    })
                    .context("Failed to draw frame")?;
                self.needs_redraw = false;
            }

            let clock_running = self.metrics.is_ticking();

            tokio::select! {
                // Handle terminal events
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                        None => self.should_quit = true,
                    }
                }

                // Game logic tick
                _ = next_tick(&mut self.tick_timer) => {
                    self.update_game();
                }

                _ = clock_timer.tick(), if clock_running => {
                    self.needs_redraw = true;
                }

                // Handle Ctrl+C
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            self.sync_tick_timer();

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            // Only process key press events, not release
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let action = self
                    .input_handler
                    .handle_key_event(key, self.engine.session());
                self.apply(action);
            }
            Event::Resize(_, _) => self.needs_redraw = true,
            _ => {}
        }
    }

    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::Command(command) => self.apply_command(command),
            KeyAction::SpeedUp => {
                let level = self.engine.speed_level().faster();
                self.engine.set_speed_level(level);
                self.needs_redraw = true;
            }
            KeyAction::SpeedDown => {
                let level = self.engine.speed_level().slower();
                self.engine.set_speed_level(level);
                self.needs_redraw = true;
            }
            KeyAction::Quit => {
                self.should_quit = true;
            }
            KeyAction::None => {}
        }
    }

    fn apply_command(&mut self, command: Command) {
        if command == Command::Restart {
            if self.engine.restart().is_some() {
                self.metrics.on_game_over();
            }
            self.metrics.on_game_start();
            self.needs_redraw = true;
            return;
        }

        let before = self.engine.session();
        if !self.engine.dispatch(command) {
            return;
        }

        match (before, self.engine.session()) {
            (SessionState::Idle | SessionState::Over, SessionState::Running) => {
                self.metrics.on_game_start()
            }
            (SessionState::Running, SessionState::Paused) => self.metrics.on_pause(),
            (SessionState::Paused, SessionState::Running) => self.metrics.on_resume(),
            _ => {}
        }
        self.needs_redraw = true;
    }

    fn update_game(&mut self) {
        let outcome = self.engine.tick();

        if let TickOutcome::GameOver(over) = outcome {
            self.metrics.on_game_over();
            debug!("Game {} finished: {:?}", self.metrics.games_played, over);
        }

        if outcome.needs_redraw() {
            self.needs_redraw = true;
        }
    }

    /// Make the tick timer match the engine's schedule slot
    ///
    /// The old timer is dropped before a new one is installed, so at most one
    /// schedule is ever live.
    fn sync_tick_timer(&mut self) {
        let schedule = self.engine.schedule();
        if self.timer_generation == Some(schedule.generation()) {
            return;
        }

        self.timer_generation = Some(schedule.generation());
        self.tick_timer = schedule.current().map(build_tick_timer);
    }

    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}

/// First tick fires one full period after installation
fn build_tick_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending::<()>().await,
    }
}
