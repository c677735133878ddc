//! Library and archive panes

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use saavy_studio::{catalog::Motif, performance::Performance};

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn selection_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

pub fn render_library(
    frame: &mut Frame,
    area: Rect,
    motifs: &[&Motif],
    selected: usize,
    focused: bool,
    genre: &str,
    playing: Option<&str>,
) {
    let items: Vec<ListItem> = motifs
        .iter()
        .map(|m| {
            let marker = if playing == Some(m.id.as_str()) { "▶ " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::raw(m.name.clone()),
                Span::styled(format!("  {}", m.genre), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let title = format!(" Library [{genre}] ({}) ", motifs.len());
    let list = List::new(items)
        .block(pane_block(title, focused))
        .highlight_style(selection_style());

    let mut state = ListState::default().with_selected((!motifs.is_empty()).then_some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn render_archive(
    frame: &mut Frame,
    area: Rect,
    performances: &[Performance],
    selected: usize,
    focused: bool,
    playing: Option<u64>,
) {
    let items: Vec<ListItem> = performances
        .iter()
        .map(|p| {
            let marker = if playing == Some(p.id) { "▶ " } else { "  " };
            let mut lines = vec![Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Magenta)),
                Span::raw(p.display_name.clone()),
                Span::styled(
                    format!("  {} notes, {:.1}s", p.pitch_set().len(), p.duration_ms() as f32 / 1000.0),
                    Style::default().fg(Color::DarkGray),
                ),
            ])];
            if let Some(annotation) = &p.annotation {
                lines.push(Line::from(Span::styled(
                    format!("    {}", annotation.mood),
                    Style::default().fg(Color::Blue),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let title = format!(" My Mixes ({}) ", performances.len());
    let list = List::new(items)
        .block(pane_block(title, focused))
        .highlight_style(selection_style());

    let mut state =
        ListState::default().with_selected((!performances.is_empty()).then_some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}
