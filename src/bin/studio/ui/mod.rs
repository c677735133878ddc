//! TUI for saavy-studio
//!
//! Single-threaded loop: read keys, feed the studio, tick it, draw. The only
//! work that leaves this thread is advisor requests (see `worker`).

mod keyboard;
mod lists;
mod transport;

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use tracing::{debug, warn};

use saavy_studio::{
    catalog::{Catalog, Motif},
    performance::Performance,
    playback::{AssetId, PlayOutcome, PlaybackSlot},
    recorder::RecorderState,
    surface::Highlights,
    Notice, Studio,
};

use crate::keys::{self, PressTimeouts, RELEASE_SILENCE};
use crate::worker::{AdvisorJob, AdvisorReply, AdvisorWorker};

use keyboard::render_keyboard;
use lists::{render_archive, render_library};
use transport::{render_transport, TransportView};

/// Redraw interval when nothing is scheduled sooner (~60fps)
const FRAME: Duration = Duration::from_millis(16);

/// How long a status message stays up
const STATUS_TTL: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Library,
    Archive,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Input {
    Normal,
    Search,
    Compose,
}

/// UI application state
pub struct UiApp {
    studio: Studio,
    catalog: Catalog,
    highlights: Highlights,
    worker: AdvisorWorker,
    pane: Pane,
    library_sel: usize,
    archive_sel: usize,
    /// Newest first
    performances: Vec<Performance>,
    search: String,
    genre: Option<usize>,
    input: Input,
    compose_text: String,
    status: Option<(String, Instant)>,
    /// Present when the terminal does not report key releases
    timeouts: Option<PressTimeouts>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(studio: Studio, catalog: Catalog, highlights: Highlights, worker: AdvisorWorker) -> Self {
        let mut app = Self {
            studio,
            catalog,
            highlights,
            worker,
            pane: Pane::Library,
            library_sel: 0,
            archive_sel: 0,
            performances: Vec::new(),
            search: String::new(),
            genre: None,
            input: Input::Normal,
            compose_text: String::new(),
            status: None,
            timeouts: Some(PressTimeouts::new(RELEASE_SILENCE)),
            should_quit: false,
        };
        app.refresh_performances();
        app
    }

    /// Whether key release events will arrive from the terminal
    pub fn set_key_releases(&mut self, reported: bool) {
        self.timeouts = if reported {
            None
        } else {
            Some(PressTimeouts::new(RELEASE_SILENCE))
        };
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), Instant::now()));
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.studio.tick();
            self.release_quiet_keys();
            self.poll_advisor();
            self.poll_notices();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(self.poll_timeout())? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }

        self.studio.shutdown();
        Ok(())
    }

    fn poll_timeout(&self) -> Duration {
        let now = self.studio.now_ms();
        let until_due = self
            .studio
            .next_deadline_ms()
            .map(|due| Duration::from_millis(due.saturating_sub(now)));

        match until_due {
            Some(wait) => wait.min(FRAME),
            None => FRAME,
        }
    }

    fn release_quiet_keys(&mut self) {
        let Some(timeouts) = self.timeouts.as_mut() else {
            return;
        };
        for pitch in timeouts.expired(Instant::now()) {
            self.studio.release(pitch);
        }
    }

    fn poll_advisor(&mut self) {
        while let Some(reply) = self.worker.poll() {
            match reply {
                AdvisorReply::Described { id, result: Ok(annotation) } => {
                    match self.studio.apply_annotation(id, annotation) {
                        Ok(performance) => {
                            self.set_status(format!("Named \"{}\"", performance.display_name));
                            self.refresh_performances();
                        }
                        Err(err) => {
                            warn!(%err, id, "could not store annotation");
                            self.set_status(format!("Archive error: {err}"));
                        }
                    }
                }
                AdvisorReply::Described { id, result: Err(err) } => {
                    warn!(%err, id, "describe failed");
                    self.set_status(format!("Advisor unavailable: {err}"));
                }
                AdvisorReply::Composed { vibe, result: Ok(offsets) } => {
                    debug!(?offsets, "composed motif");
                    self.studio.play_composed(&offsets);
                    self.set_status(format!("Playing \"{vibe}\""));
                }
                AdvisorReply::Composed { result: Err(err), .. } => {
                    warn!(%err, "compose failed");
                    self.set_status(format!("Advisor unavailable: {err}"));
                }
            }
        }
    }

    fn poll_notices(&mut self) {
        for notice in self.studio.drain_notices() {
            match notice {
                Notice::RecordingSaved(performance) => {
                    self.set_status(format!("Time limit reached, saved {}", performance.display_name));
                    self.refresh_performances();
                }
                Notice::CeilingReached => {
                    if self.status.is_none() {
                        self.set_status("Time limit reached");
                    }
                }
                Notice::ArchiveFailed(message) => {
                    self.set_status(format!("Archive error: {message}"));
                }
            }
        }
    }

    fn refresh_performances(&mut self) {
        match self.studio.performances() {
            Ok(mut performances) => {
                performances.reverse();
                self.performances = performances;
                self.archive_sel = self.archive_sel.min(self.performances.len().saturating_sub(1));
            }
            Err(err) => {
                warn!(%err, "could not load archive");
                self.set_status(format!("Archive error: {err}"));
            }
        }
    }

    fn genre_filter(&self) -> Option<&str> {
        let genres = self.catalog.genres();
        self.genre.and_then(|i| genres.get(i).copied())
    }

    fn visible_motifs(&self) -> Vec<&Motif> {
        self.catalog.search(&self.search, self.genre_filter())
    }

    // ---- input -------------------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent) {
        match self.input {
            Input::Search => self.handle_search_key(key),
            Input::Compose => self.handle_compose_key(key),
            Input::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_piano_key(&mut self, pitch: i32, kind: KeyEventKind) {
        match (kind, self.timeouts.as_mut()) {
            (KeyEventKind::Release, _) => self.studio.release(pitch),
            (KeyEventKind::Press | KeyEventKind::Repeat, Some(timeouts)) => {
                if timeouts.seen(pitch, Instant::now()) {
                    self.studio.press(pitch);
                }
            }
            (KeyEventKind::Press, None) => self.studio.press(pitch),
            (KeyEventKind::Repeat, None) => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char(c) = key.code {
            if let Some(pitch) = keys::pitch_for(c) {
                self.handle_piano_key(pitch, key.kind);
                return;
            }
        }
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('1') => self.toggle_recording(),
            KeyCode::Char('2') => {
                if self.studio.toggle_pause() {
                    let paused = self.studio.recorder_status().state == RecorderState::Paused;
                    self.set_status(if paused { "Paused" } else { "Recording" });
                }
            }
            KeyCode::Tab => {
                self.pane = match self.pane {
                    Pane::Library => Pane::Archive,
                    Pane::Archive => Pane::Library,
                };
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Enter => self.play_selected(),
            KeyCode::Char('x') => self.delete_selected(),
            KeyCode::Char('i') => self.describe_selected(),
            KeyCode::Char('/') => {
                self.input = Input::Search;
                self.pane = Pane::Library;
            }
            KeyCode::Char('[') => self.cycle_genre(-1),
            KeyCode::Char(']') => self.cycle_genre(1),
            KeyCode::Char('m') => {
                self.compose_text.clear();
                self.input = Input::Compose;
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char(c) => {
                self.search.push(c);
                self.library_sel = 0;
            }
            KeyCode::Backspace => {
                self.search.pop();
                self.library_sel = 0;
            }
            KeyCode::Enter | KeyCode::Esc => self.input = Input::Normal,
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char(c) => self.compose_text.push(c),
            KeyCode::Backspace => {
                self.compose_text.pop();
            }
            KeyCode::Esc => self.input = Input::Normal,
            KeyCode::Enter => {
                self.input = Input::Normal;
                let vibe = self.compose_text.trim().to_string();
                if vibe.is_empty() {
                    return;
                }
                if self.worker.submit(AdvisorJob::Compose { vibe }) {
                    self.set_status("Composing...");
                } else {
                    self.set_status("Advisor unavailable");
                }
            }
            _ => {}
        }
    }

    // ---- commands ----------------------------------------------------------

    fn toggle_recording(&mut self) {
        if self.studio.recorder_status().state == RecorderState::Idle {
            self.studio.start_recording();
            self.set_status("Recording");
            return;
        }

        match self.studio.stop_recording() {
            Some(performance) => {
                self.set_status(format!("Saved {}", performance.display_name));
                self.refresh_performances();
                self.archive_sel = 0;
            }
            None => self.set_status("Nothing recorded"),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let (sel, len) = match self.pane {
            Pane::Library => (self.library_sel, self.visible_motifs().len()),
            Pane::Archive => (self.archive_sel, self.performances.len()),
        };
        if len == 0 {
            return;
        }
        let next = (sel as isize + delta).clamp(0, len as isize - 1) as usize;
        match self.pane {
            Pane::Library => self.library_sel = next,
            Pane::Archive => self.archive_sel = next,
        }
    }

    fn cycle_genre(&mut self, delta: isize) {
        // None ("all") sits before the first genre
        let count = self.catalog.genres().len() as isize + 1;
        let current = self.genre.map_or(0, |i| i as isize + 1);
        let next = (current + delta).rem_euclid(count);
        self.genre = if next == 0 { None } else { Some(next as usize - 1) };
        self.library_sel = 0;
    }

    fn play_selected(&mut self) {
        match self.pane {
            Pane::Library => {
                let Some(motif) = self.visible_motifs().get(self.library_sel).map(|m| (*m).clone()) else {
                    return;
                };
                if self.studio.play_motif(&motif) == PlayOutcome::ToggledOff {
                    self.set_status(format!("Stopped {}", motif.name));
                }
            }
            Pane::Archive => {
                let Some(id) = self.performances.get(self.archive_sel).map(|p| p.id) else {
                    return;
                };
                if let Err(err) = self.studio.play_performance(id) {
                    self.set_status(format!("Cannot play: {err}"));
                }
            }
        }
    }

    fn delete_selected(&mut self) {
        if self.pane != Pane::Archive {
            return;
        }
        let Some(performance) = self.performances.get(self.archive_sel) else {
            return;
        };
        let (id, name) = (performance.id, performance.display_name.clone());

        match self.studio.delete_performance(id) {
            Ok(_) => self.set_status(format!("Deleted {name}")),
            Err(err) => self.set_status(format!("Archive error: {err}")),
        }
        self.refresh_performances();
    }

    fn describe_selected(&mut self) {
        if self.pane != Pane::Archive {
            return;
        }
        let Some(performance) = self.performances.get(self.archive_sel) else {
            return;
        };
        let job = AdvisorJob::Describe {
            id: performance.id,
            pitches: performance.pitch_set(),
        };

        if self.worker.submit(job) {
            self.set_status("Asking the advisor...");
        } else {
            self.set_status("Advisor unavailable");
        }
    }

    // ---- drawing -----------------------------------------------------------

    fn asset_label(&self, asset: &AssetId) -> String {
        match asset {
            AssetId::Motif(id) => self
                .catalog
                .get(id)
                .map_or_else(|| id.clone(), |m| m.name.clone()),
            AssetId::Composed => "advisor motif".to_string(),
            AssetId::Performance(id) => self
                .performances
                .iter()
                .find(|p| p.id == *id)
                .map_or_else(|| id.to_string(), |p| p.display_name.clone()),
        }
    }

    fn status_line(&self) -> String {
        match self.input {
            Input::Search => format!(" search: {}_   [Enter] done", self.search),
            Input::Compose => format!(" mood: {}_   [Enter] compose  [Esc] cancel", self.compose_text),
            Input::Normal => match &self.status {
                Some((message, at)) if at.elapsed() < STATUS_TTL => format!(" {message}"),
                _ => " [1] Rec/Save  [2] Pause  [Tab] Pane  [Enter] Play/Stop  [x] Delete  [i] Describe  [/] Search  [ ] Genre  [m] Compose  [q] Quit".to_string(),
            },
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport bar
                Constraint::Min(8),    // Library + archive
                Constraint::Length(5), // Keyboard
                Constraint::Length(1), // Help / status
            ])
            .split(area);

        let view = TransportView {
            status: self.studio.recorder_status(),
            held: self
                .studio
                .held_pitches()
                .into_iter()
                .map(|p| (p, self.studio.held_for_ms(p).unwrap_or(0)))
                .collect(),
            library: self
                .studio
                .active_asset(PlaybackSlot::Library)
                .map(|a| self.asset_label(&a)),
            archive: self
                .studio
                .active_asset(PlaybackSlot::Archive)
                .map(|a| self.asset_label(&a)),
            advisor_busy: self.worker.is_busy(),
        };
        render_transport(frame, chunks[0], &view);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let active_motif = match self.studio.active_asset(PlaybackSlot::Library) {
            Some(AssetId::Motif(id)) => Some(id),
            _ => None,
        };
        render_library(
            frame,
            columns[0],
            &self.visible_motifs(),
            self.library_sel,
            self.pane == Pane::Library,
            self.genre_filter().unwrap_or("All"),
            active_motif.as_deref(),
        );

        let active_performance = match self.studio.active_asset(PlaybackSlot::Archive) {
            Some(AssetId::Performance(id)) => Some(id),
            _ => None,
        };
        render_archive(
            frame,
            columns[1],
            &self.performances,
            self.archive_sel,
            self.pane == Pane::Archive,
            active_performance,
        );

        render_keyboard(frame, chunks[2], &self.highlights);

        let help = Paragraph::new(self.status_line()).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
