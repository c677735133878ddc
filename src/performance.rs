//! Recorded performances and their events.
//!
//! A performance is an ordered log of note on/off events with offsets in
//! live milliseconds since the recording began. Logs are normalized before
//! they are stored so every release has the press that started it.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::synth::PitchId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    On,
    Off,
}

/// One captured transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceEvent {
    /// Live milliseconds since the session started (pauses excluded).
    pub offset_ms: u64,
    pub pitch: PitchId,
    pub kind: EventKind,
}

impl PerformanceEvent {
    pub fn on(offset_ms: u64, pitch: PitchId) -> Self {
        Self {
            offset_ms,
            pitch,
            kind: EventKind::On,
        }
    }

    pub fn off(offset_ms: u64, pitch: PitchId) -> Self {
        Self {
            offset_ms,
            pitch,
            kind: EventKind::Off,
        }
    }
}

/// Title and mood supplied by the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub title: String,
    pub mood: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub id: u64,
    pub display_name: String,
    pub events: Vec<PerformanceEvent>,
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

impl Performance {
    pub fn new(id: u64, display_name: impl Into<String>, events: Vec<PerformanceEvent>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            events,
            annotation: None,
        }
    }

    /// Distinct pitches that were pressed, ascending.
    pub fn pitch_set(&self) -> BTreeSet<PitchId> {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::On)
            .map(|e| e.pitch)
            .collect()
    }

    /// Offset of the last event.
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map_or(0, |e| e.offset_ms)
    }

    /// Copy with the event log normalized.
    pub fn normalized(mut self) -> Self {
        self.events = normalize_events(&self.events);
        self
    }

    pub fn apply(&mut self, patch: PerformancePatch) {
        if let Some(name) = patch.display_name {
            self.display_name = name;
        }
        if let Some(annotation) = patch.annotation {
            self.annotation = Some(annotation);
        }
    }
}

/// Partial update applied through the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformancePatch {
    pub display_name: Option<String>,
    pub annotation: Option<Annotation>,
}

/// Drop releases with no open press for their pitch, then drop presses that
/// are never released. Order of the surviving events is kept.
///
/// A press still held when the recording ended has no release inside the
/// recorded window, so it is removed rather than closed artificially. A
/// release whose press happened before recording started is removed too.
pub fn normalize_events(events: &[PerformanceEvent]) -> Vec<PerformanceEvent> {
    let mut keep = vec![false; events.len()];
    let mut open: HashMap<PitchId, usize> = HashMap::new();

    for (idx, event) in events.iter().enumerate() {
        match event.kind {
            EventKind::On => {
                // A second press while one is open: the earlier one never closed
                open.insert(event.pitch, idx);
            }
            EventKind::Off => {
                if let Some(on_idx) = open.remove(&event.pitch) {
                    keep[on_idx] = true;
                    keep[idx] = true;
                }
            }
        }
    }

    events
        .iter()
        .zip(keep)
        .filter_map(|(event, keep)| keep.then_some(*event))
        .collect()
}
