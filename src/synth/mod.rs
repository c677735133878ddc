// Purpose: Tone synthesis - one audible voice per triggered pitch
//
// The control side (`ToneSynth`) lives with the engine and hands out voice
// handles. The render side (`VoiceBank`) lives in the audio callback and owns
// the oscillators and envelopes. The two halves talk over a lock-free ring
// buffer, so `play` and `stop` never block on the audio thread.

pub mod bank;
pub mod envelope;
pub mod message;
pub mod oscillator;
pub mod tone;
pub mod voice;

pub use bank::VoiceBank;
pub use message::{VoiceCommand, VoiceId};
pub use oscillator::Waveform;
pub use tone::ToneSynth;

/// Chromatic pitch number (60 = middle C, 69 = A4).
pub type PitchId = i32;

/// Furthest a pitch may sit from the reference, in semitones.
const MAX_DISTANCE: PitchId = 127;

/// Convert a pitch to Hz in 12-tone equal temperament.
#[inline]
pub fn pitch_to_freq(pitch: PitchId, reference_pitch: PitchId, reference_freq: f32) -> f32 {
    let distance = pitch
        .saturating_sub(reference_pitch)
        .clamp(-MAX_DISTANCE, MAX_DISTANCE);
    reference_freq * 2.0_f32.powf(distance as f32 / 12.0)
}

/// How long a voice sounds before it releases on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Hold at peak until `stop` is called (manually held notes).
    Sustained,
    /// Release automatically `hold_ms` after the start (auto-playback).
    Timed { hold_ms: u32 },
}

/// Handle to a started voice.
///
/// An inert handle refers to nothing; stopping it does nothing. Handles are
/// never reused, so stopping a handle twice is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(Option<VoiceId>);

impl VoiceHandle {
    pub(crate) fn new(id: VoiceId) -> Self {
        Self(Some(id))
    }

    /// A handle that owns no voice (device unavailable).
    pub fn inert() -> Self {
        Self(None)
    }

    pub fn is_inert(&self) -> bool {
        self.0.is_none()
    }

    pub fn id(&self) -> Option<VoiceId> {
        self.0
    }
}

/// Starts and stops voices.
///
/// `stop` must be called once for every handle from a `Sustained` play;
/// further calls are no-ops.
pub trait Synthesizer {
    fn play(&mut self, pitch: PitchId, mode: PlayMode) -> VoiceHandle;

    fn stop(&mut self, handle: VoiceHandle);

    /// Release every voice this synthesizer started.
    fn stop_all(&mut self) {}
}

impl<S: Synthesizer + ?Sized> Synthesizer for Box<S> {
    fn play(&mut self, pitch: PitchId, mode: PlayMode) -> VoiceHandle {
        (**self).play(pitch, mode)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        (**self).stop(handle)
    }

    fn stop_all(&mut self) {
        (**self).stop_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_pitch_maps_to_reference_freq() {
        assert!((pitch_to_freq(69, 69, 440.0) - 440.0).abs() < 1e-4);
    }

    #[test]
    fn octaves_double_frequency() {
        assert!((pitch_to_freq(81, 69, 440.0) - 880.0).abs() < 1e-3);
        assert!((pitch_to_freq(57, 69, 440.0) - 220.0).abs() < 1e-3);
        // Middle C
        assert!((pitch_to_freq(60, 69, 440.0) - 261.6256).abs() < 1e-2);
    }

    #[test]
    fn extreme_pitches_stay_finite() {
        let high = pitch_to_freq(PitchId::MAX, 69, 440.0);
        let low = pitch_to_freq(PitchId::MIN, 69, 440.0);
        assert!(high.is_finite() && high > 0.0);
        assert!(low.is_finite() && low > 0.0);
        assert_eq!(high, pitch_to_freq(69 + 127, 69, 440.0));
    }

    #[test]
    fn inert_handle_has_no_id() {
        assert!(VoiceHandle::inert().is_inert());
        assert_eq!(VoiceHandle::new(7).id(), Some(7));
    }
}
