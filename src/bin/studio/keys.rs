//! Computer keyboard to pitch mapping, plus the release fallback for
//! terminals that only report key presses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use saavy_studio::synth::PitchId;

/// Home row plus the row above: one chromatic octave from C4.
pub const PIANO_KEYS: [(char, PitchId); 13] = [
    ('a', 60),
    ('w', 61),
    ('s', 62),
    ('e', 63),
    ('d', 64),
    ('f', 65),
    ('t', 66),
    ('g', 67),
    ('y', 68),
    ('h', 69),
    ('u', 70),
    ('j', 71),
    ('k', 72),
];

pub fn pitch_for(c: char) -> Option<PitchId> {
    let c = c.to_ascii_lowercase();
    PIANO_KEYS.iter().find(|(k, _)| *k == c).map(|&(_, p)| p)
}

pub fn is_black(pitch: PitchId) -> bool {
    matches!(pitch.rem_euclid(12), 1 | 3 | 6 | 8 | 10)
}

/// Longer than the usual autorepeat delay, so a held key keeps repeating
/// before it times out.
pub const RELEASE_SILENCE: Duration = Duration::from_millis(600);

/// Tracks presses when the terminal never reports releases. A key counts as
/// released once no press or repeat has arrived for `silence`.
pub struct PressTimeouts {
    last_seen: HashMap<PitchId, Instant>,
    silence: Duration,
}

impl PressTimeouts {
    pub fn new(silence: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            silence,
        }
    }

    /// Returns true for a fresh press, false for an autorepeat.
    pub fn seen(&mut self, pitch: PitchId, now: Instant) -> bool {
        self.last_seen.insert(pitch, now).is_none()
    }

    /// Pitches that have gone quiet, removed from tracking.
    pub fn expired(&mut self, now: Instant) -> Vec<PitchId> {
        let silence = self.silence;
        let mut gone: Vec<PitchId> = self
            .last_seen
            .iter()
            .filter(|(_, &t)| now.duration_since(t) >= silence)
            .map(|(&p, _)| p)
            .collect();
        gone.sort_unstable();
        for pitch in &gone {
            self.last_seen.remove(pitch);
        }
        gone
    }

    /// Earliest moment a tracked key could expire.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.last_seen.values().min().map(|&t| t + self.silence)
    }
}
