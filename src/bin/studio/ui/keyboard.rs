//! On-screen keyboard - one cell per mapped key, lit while sounding

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_studio::{advisor::note_name, surface::Highlights};

use crate::keys::{is_black, PIANO_KEYS};

pub fn render_keyboard(frame: &mut Frame, area: Rect, highlights: &Highlights) {
    let block = Block::default().title(" Keys ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, PIANO_KEYS.len() as u32); PIANO_KEYS.len()])
        .split(inner);

    for (&(key, pitch), cell) in PIANO_KEYS.iter().zip(cells.iter()) {
        let style = match (highlights.is_lit(pitch), is_black(pitch)) {
            (true, _) => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            (false, true) => Style::default().fg(Color::White).bg(Color::DarkGray),
            (false, false) => Style::default().fg(Color::Black).bg(Color::Gray),
        };

        let lines = vec![
            Line::from(note_name(pitch)).centered(),
            Line::from(key.to_ascii_uppercase().to_string()).centered(),
        ];
        frame.render_widget(Paragraph::new(lines).style(style), *cell);
    }
}
