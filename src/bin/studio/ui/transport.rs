//! Transport bar widget - recorder state, countdown, held notes, what is playing

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_studio::{advisor::note_name, recorder::RecorderState, synth::PitchId, RecorderStatus};

pub struct TransportView {
    pub status: RecorderStatus,
    /// Held pitches with how long each has been down
    pub held: Vec<(PitchId, u64)>,
    pub library: Option<String>,
    pub archive: Option<String>,
    pub advisor_busy: bool,
}

/// `00:SS`, rounded up so the display never shows 00:00 while time is left
fn countdown(remaining_ms: u64) -> String {
    let secs = remaining_ms.div_ceil(1000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Render the transport bar
pub fn render_transport(frame: &mut Frame, area: Rect, view: &TransportView) {
    let block = Block::default().title(" saavy studio ").borders(Borders::ALL);

    let (symbol, label, color) = match view.status.state {
        RecorderState::Idle => ("○", "Idle", Color::DarkGray),
        RecorderState::Armed => ("●", "REC", Color::Red),
        RecorderState::Paused => ("⏸", "Paused", Color::Yellow),
    };

    let held = if view.held.is_empty() {
        "-".to_string()
    } else {
        view.held
            .iter()
            .map(|&(p, ms)| {
                format!("{}{} {:.1}s", note_name(p), p.div_euclid(12) - 1, ms as f32 / 1000.0)
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut spans = vec![
        Span::styled(
            format!(" {symbol} {label}  "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{}  ", countdown(view.status.remaining_ms)),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("{} events  ", view.status.event_count),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("Notes: {held}  "), Style::default().fg(Color::Cyan)),
    ];

    if let Some(name) = &view.library {
        spans.push(Span::styled(format!("▶ {name}  "), Style::default().fg(Color::Green)));
    }
    if let Some(name) = &view.archive {
        spans.push(Span::styled(format!("▶ {name}  "), Style::default().fg(Color::Magenta)));
    }
    if view.advisor_busy {
        spans.push(Span::styled("advisor…", Style::default().fg(Color::Blue)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
