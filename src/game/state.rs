use super::action::Direction;
use super::speed::SpeedLevel;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    /// Check if the position lies on a square grid of the given side
    pub fn is_within(&self, tile_count: usize) -> bool {
        let side = tile_count as i32;
        (0..side).contains(&self.x) && (0..side).contains(&self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// The snake in the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    /// Body segments, with head at index 0
    body: Vec<Position>,
}

impl Snake {
    /// Create a one-segment snake
    pub fn new(head: Position) -> Self {
        Self { body: vec![head] }
    }

    /// Create a snake from explicit segments, head first
    ///
    /// Returns `None` for an empty list.
    pub fn from_segments(segments: Vec<Position>) -> Option<Self> {
        (!segments.is_empty()).then_some(Self { body: segments })
    }

    /// Get the head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn segments(&self) -> &[Position] {
        &self.body
    }

    /// Check if any segment sits on the position
    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Check if the head would hit the body after advancing to `new_head`
    ///
    /// When not growing the tail moves out of the way, so it is excluded.
    pub fn would_collide(&self, new_head: Position, growing: bool) -> bool {
        let remaining = if growing {
            &self.body[..]
        } else {
            &self.body[..self.body.len() - 1]
        };
        remaining.contains(&new_head)
    }

    /// Prepend a new head, dropping the tail unless growing
    pub fn advance(&mut self, new_head: Position, grow: bool) {
        self.body.insert(0, new_head);

        if !grow {
            self.body.pop();
        }
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the snake is empty (never true for a constructed snake)
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// True when two segments share a cell
    pub fn has_overlap(&self) -> bool {
        self.body
            .iter()
            .enumerate()
            .any(|(i, seg)| self.body[i + 1..].contains(seg))
    }
}

/// Lifecycle of a play session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Over,
}

impl SessionState {
    /// Running or paused, i.e. a session that has not ended
    pub fn in_progress(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverCause {
    /// Snake hit a wall
    Wall,
    /// Snake hit itself
    SelfCollision,
    /// No free cell left for food
    BoardFilled,
}

/// Complete mutable game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub snake: Snake,
    pub food: Position,
    /// `None` until the first session starts moving
    pub direction: Option<Direction>,
    pub score: u32,
    pub session: SessionState,
    pub tile_count: usize,
    pub game_over: Option<GameOverCause>,
}

impl GameState {
    /// Create a new idle game state
    pub fn new(snake: Snake, food: Position, tile_count: usize) -> Self {
        Self {
            snake,
            food,
            direction: None,
            score: 0,
            session: SessionState::Idle,
            tile_count,
            game_over: None,
        }
    }

    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.is_within(self.tile_count)
    }
}

/// Read-only view handed to the render sink
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub snake: Vec<Position>,
    pub food: Position,
    pub score: u32,
    pub high_score: u32,
    pub session: SessionState,
    pub speed_level: SpeedLevel,
    pub tile_count: usize,
    pub game_over: Option<GameOverCause>,
    /// Set when the last session ended above the previous high score
    pub new_high_score: bool,
}

impl Snapshot {
    pub fn head(&self) -> Option<Position> {
        self.snake.first().copied()
    }
}
