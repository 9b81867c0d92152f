use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::game::{Command, Direction, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    SpeedUp,
    SpeedDown,
    Quit,
    None,
}

pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Translate a key press, given the session it arrives in
    ///
    /// Space starts a game when none is in progress and toggles pause otherwise.
    pub fn handle_key_event(&self, key: KeyEvent, session: SessionState) -> KeyAction {
        // Handle Ctrl+C
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        match key.code {
            // Movement - Arrow keys
            KeyCode::Up => KeyAction::Command(Command::Move(Direction::Up)),
            KeyCode::Down => KeyAction::Command(Command::Move(Direction::Down)),
            KeyCode::Left => KeyAction::Command(Command::Move(Direction::Left)),
            KeyCode::Right => KeyAction::Command(Command::Move(Direction::Right)),

            // Movement - WASD
            KeyCode::Char('w') | KeyCode::Char('W') => {
                KeyAction::Command(Command::Move(Direction::Up))
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                KeyAction::Command(Command::Move(Direction::Down))
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                KeyAction::Command(Command::Move(Direction::Left))
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                KeyAction::Command(Command::Move(Direction::Right))
            }

            // Session controls
            KeyCode::Char(' ') if session.in_progress() => {
                KeyAction::Command(Command::TogglePause)
            }
            KeyCode::Char(' ') | KeyCode::Enter => KeyAction::Command(Command::Start),
            KeyCode::Char('p') | KeyCode::Char('P') => KeyAction::Command(Command::TogglePause),
            KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Command(Command::Restart),

            // Speed dial
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(']') => KeyAction::SpeedUp,
            KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Char('[') => KeyAction::SpeedDown,

            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,

            _ => KeyAction::None,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
