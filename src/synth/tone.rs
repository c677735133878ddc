//! Control side of the tone synthesizer.

use rtrb::{Producer, RingBuffer};
use tracing::{debug, warn};

use crate::{
    config::StudioConfig,
    io::{NoOutput, NullOutput, OutputDevice},
    synth::{
        bank::VoiceBank,
        message::{VoiceCommand, VoiceId},
        pitch_to_freq, PitchId, PlayMode, Synthesizer, VoiceHandle,
    },
};

/// Capacity of the command queue between engine and audio callback.
pub const COMMAND_QUEUE_SIZE: usize = 256;

/// Starts and stops tones by sending commands to a [`VoiceBank`].
pub struct ToneSynth {
    tx: Producer<VoiceCommand>,
    device: Box<dyn OutputDevice>,
    next_id: VoiceId,
    reference_pitch: PitchId,
    reference_freq: f32,
}

impl ToneSynth {
    pub fn new(tx: Producer<VoiceCommand>, device: Box<dyn OutputDevice>, config: &StudioConfig) -> Self {
        Self {
            tx,
            device,
            next_id: 1,
            reference_pitch: config.reference_pitch,
            reference_freq: config.reference_freq,
        }
    }

    /// A synth paired with a bank the caller renders by hand.
    pub fn offline(config: &StudioConfig, sample_rate: f32) -> (Self, VoiceBank) {
        let (tx, rx) = RingBuffer::new(COMMAND_QUEUE_SIZE);
        let bank = VoiceBank::new(rx, config, sample_rate);
        (Self::new(tx, Box::new(NullOutput), config), bank)
    }

    /// A synth with no output device at all: every `play` is inert.
    pub fn silent(config: &StudioConfig) -> Self {
        let (tx, _rx) = RingBuffer::new(COMMAND_QUEUE_SIZE);
        Self::new(tx, Box::new(NoOutput), config)
    }

    /// Make sure the output device is running, resuming it if needed.
    fn ensure_output(&mut self) -> bool {
        if self.device.is_running() {
            return true;
        }

        match self.device.resume() {
            Ok(()) => {
                debug!("audio output resumed");
                true
            }
            Err(err) => {
                warn!(%err, "audio output unavailable, voice dropped");
                false
            }
        }
    }
}

impl Synthesizer for ToneSynth {
    fn play(&mut self, pitch: PitchId, mode: PlayMode) -> VoiceHandle {
        if !self.ensure_output() {
            return VoiceHandle::inert();
        }

        let id = self.next_id;
        let hold_ms = match mode {
            PlayMode::Sustained => None,
            PlayMode::Timed { hold_ms } => Some(hold_ms),
        };
        let frequency = pitch_to_freq(pitch, self.reference_pitch, self.reference_freq);

        if self
            .tx
            .push(VoiceCommand::Start {
                id,
                frequency,
                hold_ms,
            })
            .is_err()
        {
            warn!(pitch, "voice command queue full, voice dropped");
            return VoiceHandle::inert();
        }

        self.next_id += 1;
        VoiceHandle::new(id)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        let Some(id) = handle.id() else {
            return;
        };

        if self.tx.push(VoiceCommand::Release { id }).is_err() {
            warn!(id, "voice command queue full, release dropped");
        }
    }

    fn stop_all(&mut self) {
        if self.tx.push(VoiceCommand::ReleaseAll).is_err() {
            warn!("voice command queue full, release-all dropped");
        }
    }
}
