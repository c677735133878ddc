//! Engine tuning and timing constants.
//!
//! Everything time-related in the engine is expressed in milliseconds so the
//! recorder, the scheduler and the synthesizer agree on one unit. The render
//! side converts to samples once it knows the device sample rate.

use serde::{Deserialize, Serialize};

use crate::synth::oscillator::Waveform;

/// Configuration for a [`Studio`](crate::studio::Studio) and its components.
///
/// Missing fields in a config file fall back to [`StudioConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Pitch that sounds at `reference_freq` (69 = A4).
    pub reference_pitch: i32,
    /// Frequency of `reference_pitch` in Hz.
    pub reference_freq: f32,
    /// Oscillator shape used for every voice.
    pub waveform: Waveform,
    /// Amplitude reached at the end of the attack ramp.
    pub peak_level: f32,
    /// Linear attack length.
    pub attack_ms: u32,
    /// Time constant of the exponential release.
    pub release_ms: u32,
    /// Delay between the start of a release and the hard stop of the voice.
    pub stop_delay_ms: u32,
    /// Maximum live (non-paused) length of a recording session.
    pub recording_ceiling_ms: u64,
    /// Spacing between consecutive notes of a library motif.
    pub motif_spacing_ms: u64,
    /// Motif offsets are relative to this pitch.
    pub motif_base_pitch: i32,
    /// Auto-release length for motif notes.
    pub motif_note_ms: u32,
    /// Auto-release length for notes replayed from a recording.
    pub performance_note_ms: u32,
    /// Highlight flash for replayed notes without a paired release.
    pub flash_ms: u64,
    /// Extra time after the last event before a playback counts as finished.
    pub trailing_margin_ms: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            reference_pitch: 69,
            reference_freq: 440.0,
            waveform: Waveform::Triangle,
            peak_level: 0.3,
            attack_ms: 50,
            release_ms: 100,
            stop_delay_ms: 200,
            recording_ceiling_ms: 15_000,
            motif_spacing_ms: 200,
            motif_base_pitch: 55,
            motif_note_ms: 500,
            performance_note_ms: 1_500,
            flash_ms: 150,
            trailing_margin_ms: 500,
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the oscillator shape
    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Set the recording ceiling in live milliseconds
    pub fn recording_ceiling(mut self, ms: u64) -> Self {
        self.recording_ceiling_ms = ms;
        self
    }

    /// Set the tuning reference (pitch and its frequency)
    pub fn tuning(mut self, reference_pitch: i32, reference_freq: f32) -> Self {
        self.reference_pitch = reference_pitch;
        self.reference_freq = reference_freq;
        self
    }

    /// Set the peak amplitude reached after the attack
    pub fn peak_level(mut self, level: f32) -> Self {
        self.peak_level = level.clamp(0.0, 1.0);
        self
    }

    /// Envelope timings: attack ramp, release time constant, hard-stop delay.
    pub fn envelope(mut self, attack_ms: u32, release_ms: u32, stop_delay_ms: u32) -> Self {
        self.attack_ms = attack_ms;
        self.release_ms = release_ms;
        self.stop_delay_ms = stop_delay_ms;
        self
    }

    /// Parse a config from JSON, keeping defaults for missing fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
