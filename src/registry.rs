//! Voice registry for manually held notes.
//!
//! A held key owns exactly one sustained voice. Pressing it again while it
//! is held does nothing, which is what makes a long press sound as one
//! continuous note and produce a single `On`.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    performance::EventKind,
    synth::{PitchId, PlayMode, Synthesizer, VoiceHandle},
};

/// An on/off change of a held pitch, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTransition {
    pub pitch: PitchId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy)]
struct HeldVoice {
    handle: VoiceHandle,
    started_at_ms: u64,
}

#[derive(Default)]
pub struct VoiceRegistry {
    held: HashMap<PitchId, HeldVoice>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a sustained voice for `pitch` unless one is already held.
    pub fn trigger(
        &mut self,
        pitch: PitchId,
        now_ms: u64,
        synth: &mut dyn Synthesizer,
    ) -> Option<VoiceTransition> {
        if self.held.contains_key(&pitch) {
            return None;
        }

        let handle = synth.play(pitch, PlayMode::Sustained);
        self.held.insert(
            pitch,
            HeldVoice {
                handle,
                started_at_ms: now_ms,
            },
        );
        debug!(pitch, "note on");

        Some(VoiceTransition {
            pitch,
            kind: EventKind::On,
        })
    }

    /// Release the held voice for `pitch`, if any.
    pub fn release(
        &mut self,
        pitch: PitchId,
        synth: &mut dyn Synthesizer,
    ) -> Option<VoiceTransition> {
        let voice = self.held.remove(&pitch)?;
        synth.stop(voice.handle);
        debug!(pitch, "note off");

        Some(VoiceTransition {
            pitch,
            kind: EventKind::Off,
        })
    }

    /// Release every held voice, returning the transitions in pitch order.
    pub fn release_all(&mut self, synth: &mut dyn Synthesizer) -> Vec<VoiceTransition> {
        let mut pitches: Vec<PitchId> = self.held.keys().copied().collect();
        pitches.sort_unstable();

        pitches
            .into_iter()
            .filter_map(|pitch| self.release(pitch, synth))
            .collect()
    }

    pub fn is_held(&self, pitch: PitchId) -> bool {
        self.held.contains_key(&pitch)
    }

    /// How long `pitch` has been held.
    pub fn held_for_ms(&self, pitch: PitchId, now_ms: u64) -> Option<u64> {
        self.held
            .get(&pitch)
            .map(|v| now_ms.saturating_sub(v.started_at_ms))
    }

    pub fn held_pitches(&self) -> Vec<PitchId> {
        let mut pitches: Vec<PitchId> = self.held.keys().copied().collect();
        pitches.sort_unstable();
        pitches
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSynth;

    #[test]
    fn repeated_trigger_is_a_no_op() {
        let mut synth = FakeSynth::default();
        let mut registry = VoiceRegistry::new();

        assert!(registry.trigger(60, 0, &mut synth).is_some());
        assert!(registry.trigger(60, 40, &mut synth).is_none());
        assert!(registry.trigger(60, 80, &mut synth).is_none());

        assert_eq!(synth.log.borrow().started.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_stops_the_held_voice() {
        let mut synth = FakeSynth::default();
        let mut registry = VoiceRegistry::new();

        registry.trigger(62, 0, &mut synth);
        let transition = registry.release(62, &mut synth).unwrap();

        assert_eq!(transition.kind, EventKind::Off);
        assert_eq!(synth.log.borrow().stopped.len(), 1);
        assert!(!registry.is_held(62));
    }

    #[test]
    fn release_without_trigger_is_ignored() {
        let mut synth = FakeSynth::default();
        let mut registry = VoiceRegistry::new();

        assert!(registry.release(70, &mut synth).is_none());
        assert!(synth.log.borrow().stopped.is_empty());
    }

    #[test]
    fn distinct_pitches_sound_together() {
        let mut synth = FakeSynth::default();
        let mut registry = VoiceRegistry::new();

        for pitch in [60, 64, 67, 72] {
            registry.trigger(pitch, 0, &mut synth);
        }
        assert_eq!(registry.held_pitches(), vec![60, 64, 67, 72]);
        assert_eq!(registry.held_for_ms(64, 250), Some(250));

        let released = registry.release_all(&mut synth);
        assert_eq!(released.len(), 4);
        assert!(registry.is_empty());
    }
}
