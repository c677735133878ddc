use crate::synth::{
    envelope::{EnvelopeShape, EnvelopeStage, ToneEnvelope},
    message::VoiceId,
    oscillator::{Oscillator, Waveform},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Sounding, envelope in attack or sustain
    Releasing, // Released, envelope decaying toward the hard stop
}

/// A single rendered tone: oscillator through envelope.
pub struct Tone {
    id: VoiceId,
    state: VoiceState,
    sample_rate: f32,
    osc: Oscillator,
    env: ToneEnvelope,
}

impl Tone {
    pub fn new(waveform: Waveform, shape: EnvelopeShape, sample_rate: f32) -> Self {
        Self {
            id: 0,
            state: VoiceState::Free,
            sample_rate,
            osc: Oscillator::new(waveform),
            env: ToneEnvelope::new(shape, sample_rate),
        }
    }

    pub fn start(&mut self, id: VoiceId, frequency: f32, hold_ms: Option<u32>) {
        self.id = id;
        self.state = VoiceState::Active;
        self.osc.reset(frequency, self.sample_rate);

        let hold_samples =
            hold_ms.map(|ms| (ms as f32 / 1000.0 * self.sample_rate).round() as u32);
        self.env.note_on(hold_samples);
    }

    pub fn release(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.env.note_off();
        }
    }

    /// Render into `out`, overwriting it.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let level = self.env.next_sample();
            *sample = self.osc.next_sample() * level;
        }

        // Timed voices release inside the envelope
        if self.state == VoiceState::Active && self.env.stage() == EnvelopeStage::Release {
            self.state = VoiceState::Releasing;
        }

        if !self.env.is_active() {
            self.free();
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.env.reset();
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn envelope_level(&self) -> f32 {
        self.env.level()
    }
}
