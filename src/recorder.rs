//! Performance recorder.
//!
//! Converts held-voice transitions into a timestamped event log while a
//! session is armed.
//!
//! ```text
//!            start              pause
//!   ┌──────┐ ─────→ ┌───────┐ ─────→ ┌────────┐
//!   │ Idle │        │ Armed │        │ Paused │
//!   └──────┘ ←───── └───────┘ ←───── └────────┘
//!       ↑     stop               resume   │
//!       └─────────────────────────────────┘
//!                      stop
//! ```
//!
//! Offsets count live time only: `now - started_at - accumulated_pause`.
//! A session also has a ceiling of live time; once it is reached the owner
//! must finalize the session exactly as if `stop` had been called (see
//! [`Recorder::ceiling_reached`]). The countdown freezes while paused
//! because paused time never enters the live clock.

use tracing::debug;

use crate::{
    performance::PerformanceEvent,
    registry::VoiceTransition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Armed,
    Paused,
}

#[derive(Debug, Clone)]
struct RecordingSession {
    started_at_ms: u64,
    paused_at_ms: Option<u64>,
    accumulated_pause_ms: u64,
    events: Vec<PerformanceEvent>,
}

impl RecordingSession {
    fn new(now_ms: u64) -> Self {
        Self {
            started_at_ms: now_ms,
            paused_at_ms: None,
            accumulated_pause_ms: 0,
            events: Vec::new(),
        }
    }

    /// Live elapsed time; while paused the clock stands at the pause point.
    fn live_elapsed_ms(&self, now_ms: u64) -> u64 {
        let now = self.paused_at_ms.unwrap_or(now_ms);
        now.saturating_sub(self.started_at_ms)
            .saturating_sub(self.accumulated_pause_ms)
    }
}

pub struct Recorder {
    session: Option<RecordingSession>,
    ceiling_ms: u64,
}

impl Recorder {
    pub fn new(ceiling_ms: u64) -> Self {
        Self {
            session: None,
            ceiling_ms,
        }
    }

    pub fn state(&self) -> RecorderState {
        match &self.session {
            None => RecorderState::Idle,
            Some(s) if s.paused_at_ms.is_some() => RecorderState::Paused,
            Some(_) => RecorderState::Armed,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Idle → Armed. Returns false if a session is already running.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(RecordingSession::new(now_ms));
        debug!(now_ms, "recording armed");
        true
    }

    /// Armed → Paused.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        match &mut self.session {
            Some(session) if session.paused_at_ms.is_none() => {
                session.paused_at_ms = Some(now_ms);
                debug!(now_ms, "recording paused");
                true
            }
            _ => false,
        }
    }

    /// Paused → Armed, adding the paused span to the accumulated pause.
    pub fn resume(&mut self, now_ms: u64) -> bool {
        match &mut self.session {
            Some(session) => match session.paused_at_ms.take() {
                Some(paused_at) => {
                    session.accumulated_pause_ms += now_ms.saturating_sub(paused_at);
                    debug!(now_ms, pause_ms = session.accumulated_pause_ms, "recording resumed");
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn toggle_pause(&mut self, now_ms: u64) -> bool {
        match self.state() {
            RecorderState::Armed => self.pause(now_ms),
            RecorderState::Paused => self.resume(now_ms),
            RecorderState::Idle => false,
        }
    }

    /// Record a transition if armed and not paused. Returns whether it was kept.
    pub fn observe(&mut self, transition: &VoiceTransition, now_ms: u64) -> bool {
        let ceiling = self.ceiling_ms;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.paused_at_ms.is_some() {
            return false;
        }

        let offset_ms = session.live_elapsed_ms(now_ms);
        if offset_ms >= ceiling {
            return false;
        }

        // Offsets never go backwards, even if the clock source misbehaves
        let offset_ms = session
            .events
            .last()
            .map_or(offset_ms, |last| offset_ms.max(last.offset_ms));

        session.events.push(PerformanceEvent {
            offset_ms,
            pitch: transition.pitch,
            kind: transition.kind,
        });
        true
    }

    /// Armed/Paused → Idle. Returns the captured events when there are any.
    ///
    /// The events are raw; normalization happens when they are stored.
    pub fn stop(&mut self, now_ms: u64) -> Option<Vec<PerformanceEvent>> {
        let session = self.session.take()?;
        debug!(
            now_ms,
            events = session.events.len(),
            live_ms = session.live_elapsed_ms(now_ms),
            "recording stopped"
        );

        if session.events.is_empty() {
            None
        } else {
            Some(session.events)
        }
    }

    pub fn live_elapsed_ms(&self, now_ms: u64) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| s.live_elapsed_ms(now_ms))
    }

    /// Live time left before the ceiling; the full ceiling when idle.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.ceiling_ms
            .saturating_sub(self.live_elapsed_ms(now_ms))
    }

    /// True once an active session has used up its live time.
    pub fn ceiling_reached(&self, now_ms: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.live_elapsed_ms(now_ms) >= self.ceiling_ms)
    }

    /// Absolute time at which the ceiling will be hit, if armed and running.
    pub fn ceiling_deadline_ms(&self) -> Option<u64> {
        let session = self.session.as_ref()?;
        if session.paused_at_ms.is_some() {
            return None;
        }
        Some(session.started_at_ms + session.accumulated_pause_ms + self.ceiling_ms)
    }

    pub fn event_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.events.len())
    }

    pub fn ceiling_ms(&self) -> u64 {
        self.ceiling_ms
    }
}
