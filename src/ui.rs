//! Terminal UI rendering with ratatui
//!
//! Everything drawn comes from one [`EngineSnapshot`], so a frame never mixes
//! two engine states.

use crate::board::Cell;
use crate::game::{EngineSnapshot, GameState};
use crate::settings::Settings;
use crate::tetromino::{PieceKind, SHAPE_SIZE};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const EMPTY: &str = "  ";

/// Width of the side panel
const PANEL_WIDTH: u16 = 18;

/// Everything the game screen shows besides the engine state
pub struct View<'a> {
    pub snapshot: &'a EngineSnapshot,
    pub settings: &'a Settings,
    pub ai_enabled: bool,
}

/// Render the entire game UI
pub fn render_game(frame: &mut Frame, view: &View) {
    let area = frame.area();
    let grid = &view.snapshot.grid;
    let board_width = grid.width() as u16 * 2 + 2;
    let board_height = grid.height() as u16 + 2;

    let game_area = center_rect(area, board_width + PANEL_WIDTH, board_height);

    // board | next + stats
    let main_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(board_width),
            Constraint::Length(PANEL_WIDTH),
        ])
        .split(game_area);

    render_board(frame, main_layout[0], view);

    let right_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Next piece
            Constraint::Min(8),    // Stats
        ])
        .split(main_layout[1]);

    let (block_char, _) = view.settings.visual.block_chars();
    render_next(frame, right_layout[0], view.snapshot.next, block_char);
    render_stats(frame, right_layout[1], view);

    match view.snapshot.state {
        GameState::Paused => render_overlay(frame, area, "PAUSED", "Press P to resume"),
        GameState::GameOver => render_overlay(
            frame,
            area,
            "GAME OVER",
            &format!("Score {}", view.snapshot.last_score),
        ),
        GameState::Playing => {}
    }
}

/// Center a rect within another rect
fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Render the next piece preview
fn render_next(frame: &mut Frame, area: Rect, kind: PieceKind, block_char: &str) {
    let block = Block::default()
        .title(" NEXT ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let shape = kind.shape(0);
    let style = Style::default().fg(kind.color());
    let lines: Vec<Line> = (0..SHAPE_SIZE)
        .filter(|&row| (0..SHAPE_SIZE).any(|col| shape.is_filled(row, col)))
        .map(|row| {
            let spans: Vec<Span> = (0..SHAPE_SIZE)
                .map(|col| {
                    if shape.is_filled(row, col) {
                        Span::styled(block_char, style)
                    } else {
                        Span::raw(EMPTY)
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

/// Board rows as styled lines, top row first
pub fn board_lines<'a>(snapshot: &EngineSnapshot, block_char: &'a str) -> Vec<Line<'a>> {
    let grid = &snapshot.grid;
    (0..grid.height() as i32)
        .map(|row| {
            let spans: Vec<Span> = (0..grid.width() as i32)
                .map(|col| {
                    let cell = grid.get(col, row).unwrap_or(Cell::EMPTY);
                    match cell.kind.filter(|_| !cell.is_empty()) {
                        Some(kind) if cell.is_active() => {
                            Span::styled(block_char, Style::default().fg(kind.color()).bold())
                        }
                        Some(kind) => Span::styled(block_char, Style::default().fg(kind.color())),
                        None => Span::raw(EMPTY),
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Render the game board
fn render_board(frame: &mut Frame, area: Rect, view: &View) {
    let (block_char, _) = view.settings.visual.block_chars();
    let title = if view.ai_enabled { " AUTO " } else { " BLOCKFALL " };
    let block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(board_lines(view.snapshot, block_char)), inner);
}

/// Render stats panel
fn render_stats(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let score = view.snapshot.score;
    let label = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(Color::Gray)));

    let mut lines = vec![
        label("SCORE"),
        Line::from(Span::styled(
            format!("{}", score.points),
            Style::default().fg(Color::Yellow).bold(),
        )),
        label("LINES"),
        Line::from(Span::styled(
            format!("{}", score.lines),
            Style::default().fg(Color::Green),
        )),
        label("BLOCKS"),
        Line::from(Span::styled(
            format!("{}", score.blocks_dropped),
            Style::default().fg(Color::Cyan),
        )),
    ];

    if view.snapshot.last_score > 0 {
        lines.push(label("LAST"));
        lines.push(Line::from(format!(
            "{} / {}",
            view.snapshot.last_score, view.snapshot.last_lines
        )));
    }
    if let Some(best) = view.settings.best_score() {
        lines.push(label("BEST"));
        lines.push(Line::from(format!("{}", best)));
    }
    if view.ai_enabled {
        lines.push(Line::raw(""));
        lines.push(Line::styled("AI PLAYING", Style::default().fg(Color::Magenta).bold()));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render an overlay (for pause/game over)
fn render_overlay(frame: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let popup_width = 24u16;
    let popup_height = 5u16;
    let popup_area = center_rect(area, popup_width, popup_height);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = vec![
        Line::styled(title, Style::default().fg(Color::Yellow).bold()),
        Line::raw(""),
        Line::styled(subtitle, Style::default().fg(Color::Gray)),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Engine;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(snapshot: &EngineSnapshot, ai_enabled: bool) -> String {
        let settings = Settings::default();
        let mut terminal = Terminal::new(TestBackend::new(60, 26)).unwrap();
        terminal
            .draw(|frame| {
                render_game(
                    frame,
                    &View {
                        snapshot,
                        settings: &settings,
                        ai_enabled,
                    },
                )
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_board_lines_show_active_piece() {
        let engine = Engine::with_seed(11);
        engine.start();
        engine.soft_drop();
        let snapshot = engine.snapshot();
        let lines = board_lines(&snapshot, "##");
        assert_eq!(lines.len(), 20);
        let drawn: usize = lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .filter(|span| span.content == "##")
            .count();
        assert_eq!(drawn, 4);
    }

    #[test]
    fn test_paused_overlay() {
        let engine = Engine::with_seed(1);
        let text = screen_text(&engine.snapshot(), false);
        assert!(text.contains("PAUSED"));
        assert!(text.contains("SCORE"));
    }

    #[test]
    fn test_ai_marker() {
        let engine = Engine::with_seed(1);
        engine.start();
        let text = screen_text(&engine.snapshot(), true);
        assert!(text.contains("AI PLAYING"));
        assert!(!text.contains("PAUSED"));
    }
}
