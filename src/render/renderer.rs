use ratatui::{
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use crate::game::{GameOverCause, Position, SessionState, Snapshot};
use crate::metrics::GameMetrics;

/// Terminal columns used per grid cell
const CELL_WIDTH: u16 = 2;

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame, snapshot: &Snapshot, metrics: &GameMetrics) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Game area
                Constraint::Length(3), // Footer
            ])
            .split(frame.area());

        frame.render_widget(self.render_stats(snapshot, metrics), chunks[0]);

        let board = board_area(chunks[1], snapshot.tile_count);
        frame.render_widget(self.render_grid(snapshot), board);

        if let Some(overlay) = self.render_overlay(snapshot) {
            let popup = centered_rect(chunks[1], 36, 9);
            frame.render_widget(Clear, popup);
            frame.render_widget(overlay, popup);
        }

        frame.render_widget(self.render_controls(), chunks[2]);
    }

    fn render_grid(&self, snapshot: &Snapshot) -> Paragraph<'static> {
        let head = snapshot.head();
        let dead = snapshot.session == SessionState::Over;
        let mut lines = Vec::with_capacity(snapshot.tile_count);

        for y in 0..snapshot.tile_count {
            let mut spans = Vec::with_capacity(snapshot.tile_count);

            for x in 0..snapshot.tile_count {
                let pos = Position::new(x as i32, y as i32);

                let cell = if Some(pos) == head {
                    let color = if dead { Color::Red } else { Color::Cyan };
                    Span::styled(
                        "■ ",
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    )
                } else if snapshot.snake.contains(&pos) {
                    Span::styled("□ ", Style::default().fg(Color::Green))
                } else if pos == snapshot.food {
                    Span::styled(
                        "● ",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::styled(". ", Style::default().fg(Color::DarkGray))
                };

                spans.push(cell);
            }

            lines.push(Line::from(spans));
        }

        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(Color::White))
                .title(" Snake "),
        )
    }

    fn render_stats(&self, snapshot: &Snapshot, metrics: &GameMetrics) -> Paragraph<'static> {
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default().fg(Color::White);

        let text = vec![Line::from(vec![
            Span::styled("Score: ", label),
            Span::styled(snapshot.score.to_string(), value.add_modifier(Modifier::BOLD)),
            Span::raw("    "),
            Span::styled("High: ", label),
            Span::styled(snapshot.high_score.to_string(), value),
            Span::raw("    "),
            Span::styled("Speed: ", label),
            Span::styled(format!("{}/20", snapshot.speed_level), value),
            Span::raw("    "),
            Span::styled("Time: ", label),
            Span::styled(metrics.format_time(), value),
            Span::raw("    "),
            Span::styled("Games: ", label),
            Span::styled(metrics.games_played.to_string(), value),
        ])];

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM))
    }

    fn render_overlay(&self, snapshot: &Snapshot) -> Option<Paragraph<'static>> {
        let key = Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD);
        let hint = Style::default().fg(Color::Gray);

        let (title, color, mut text) = match snapshot.session {
            SessionState::Running => return None,
            SessionState::Idle => (
                " Ready ",
                Color::Cyan,
                vec![Line::from(vec![
                    Span::styled("Press ", hint),
                    Span::styled("Space", key),
                    Span::styled(" to start", hint),
                ])],
            ),
            SessionState::Paused => (
                " Paused ",
                Color::Yellow,
                vec![Line::from(vec![
                    Span::styled("Press ", hint),
                    Span::styled("Space", key),
                    Span::styled(" to resume", hint),
                ])],
            ),
            SessionState::Over => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        "GAME OVER",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(cause_text(snapshot.game_over), hint)),
                    Line::from(vec![
                        Span::styled("Final Score: ", Style::default().fg(Color::Yellow)),
                        Span::styled(
                            snapshot.score.to_string(),
                            Style::default()
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD),
                        ),
                    ]),
                ];

                if snapshot.new_high_score {
                    lines.push(Line::from(Span::styled(
                        "New high score!",
                        Style::default()
                            .fg(Color::Magenta)
                            .add_modifier(Modifier::BOLD),
                    )));
                }

                lines.push(Line::from(vec![
                    Span::styled("Space", key),
                    Span::styled(" or ", hint),
                    Span::styled("R", key),
                    Span::styled(" to play again", hint),
                ]));

                (" Game Over ", Color::Red, lines)
            }
        };

        text.insert(0, Line::from(""));

        Some(
            Paragraph::new(text).alignment(Alignment::Center).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(color))
                    .title(title),
            ),
        )
    }

    fn render_controls(&self) -> Paragraph<'static> {
        let text = vec![Line::from(vec![
            Span::styled("↑↓←→", Style::default().fg(Color::Cyan)),
            Span::raw("/"),
            Span::styled("WASD", Style::default().fg(Color::Cyan)),
            Span::raw(" move | "),
            Span::styled("Space", Style::default().fg(Color::Cyan)),
            Span::raw(" start/pause | "),
            Span::styled("R", Style::default().fg(Color::Cyan)),
            Span::raw(" restart | "),
            Span::styled("+/-", Style::default().fg(Color::Cyan)),
            Span::raw(" speed | "),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" quit"),
        ])];

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn cause_text(cause: Option<GameOverCause>) -> &'static str {
    match cause {
        Some(GameOverCause::Wall) => "Hit the wall",
        Some(GameOverCause::SelfCollision) => "Ran into itself",
        Some(GameOverCause::BoardFilled) => "Board filled",
        None => "Session ended",
    }
}

/// Board rectangle sized to the grid plus its border, centered in `area`
fn board_area(area: Rect, tile_count: usize) -> Rect {
    let side = u16::try_from(tile_count).unwrap_or(u16::MAX);
    let width = side.saturating_mul(CELL_WIDTH).saturating_add(2);
    let height = side.saturating_add(2);
    centered_rect(area, width, height)
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
