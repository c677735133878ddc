use rtrb::Consumer;

use crate::{
    config::StudioConfig,
    synth::{
        envelope::EnvelopeShape,
        message::{VoiceCommand, VoiceId},
        oscillator::Waveform,
        voice::Tone,
    },
    MAX_BLOCK_SIZE,
};

/// Tones built up front, one per pitch of a full keyboard range.
const INITIAL_VOICES: usize = 128;

/// Pool capacity reserved up front. Growth stays allocation-free until this
/// many tones overlap; past it the pool reallocates on the audio thread
/// rather than drop or steal a note.
const RESERVED_VOICES: usize = 512;

/// Render side of the synthesizer.
///
/// Drains voice commands at the start of every block and mixes all sounding
/// tones into a mono output.
pub struct VoiceBank {
    voices: Vec<Tone>,
    rx: Consumer<VoiceCommand>,
    temp_buffer: Vec<f32>,
    waveform: Waveform,
    shape: EnvelopeShape,
    sample_rate: f32,
}

impl VoiceBank {
    pub fn new(rx: Consumer<VoiceCommand>, config: &StudioConfig, sample_rate: f32) -> Self {
        let shape = EnvelopeShape::from_config(config);
        let mut voices = Vec::with_capacity(RESERVED_VOICES);
        voices.extend((0..INITIAL_VOICES).map(|_| Tone::new(config.waveform, shape, sample_rate)));

        Self {
            voices,
            rx,
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
            waveform: config.waveform,
            shape,
            sample_rate,
        }
    }

    /// Render one block (at most `MAX_BLOCK_SIZE` frames) into `out`.
    pub fn render_block(&mut self, out: &mut [f32]) {
        debug_assert!(out.len() <= MAX_BLOCK_SIZE);

        // Process control messages
        while let Ok(cmd) = self.rx.pop() {
            match cmd {
                VoiceCommand::Start {
                    id,
                    frequency,
                    hold_ms,
                } => {
                    self.allocate_voice().start(id, frequency, hold_ms);
                }
                VoiceCommand::Release { id } => {
                    if let Some(voice) = self.find_voice(id) {
                        voice.release();
                    }
                }
                VoiceCommand::ReleaseAll => {
                    for voice in &mut self.voices {
                        voice.release();
                    }
                }
            }
        }

        // Mix voices
        out.fill(0.0);
        for voice in &mut self.voices {
            if voice.is_active() {
                let frames = &mut self.temp_buffer[..out.len()];
                voice.render(frames);

                for (o, v) in out.iter_mut().zip(frames.iter()) {
                    *o += v;
                }
            }
        }
    }

    /// Render any number of frames, splitting into blocks.
    pub fn render(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_block(chunk);
        }
    }

    /// Number of tones currently sounding (including releases).
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn allocate_voice(&mut self) -> &mut Tone {
        if let Some(idx) = self.voices.iter().position(|v| v.is_free()) {
            return &mut self.voices[idx];
        }

        // No free slot: grow rather than steal, every note gets its voice
        self.voices
            .push(Tone::new(self.waveform, self.shape, self.sample_rate));
        let last = self.voices.len() - 1;
        &mut self.voices[last]
    }

    fn find_voice(&mut self, id: VoiceId) -> Option<&mut Tone> {
        self.voices
            .iter_mut()
            .find(|v| v.id() == id && v.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn bank() -> (rtrb::Producer<VoiceCommand>, VoiceBank) {
        let (tx, rx) = RingBuffer::new(64);
        (tx, VoiceBank::new(rx, &StudioConfig::default(), SAMPLE_RATE))
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn silent_without_voices() {
        let (_tx, mut bank) = bank();
        let mut out = vec![1.0f32; 256];
        bank.render(&mut out);

        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sustained_voice_sounds_until_released() {
        let (mut tx, mut bank) = bank();
        tx.push(VoiceCommand::Start {
            id: 1,
            frequency: 110.0,
            hold_ms: None,
        })
        .unwrap();

        let mut out = vec![0.0f32; 1_000];
        bank.render(&mut out);
        assert!(peak(&out[500..]) > 0.25);
        assert_eq!(bank.active_count(), 1);

        tx.push(VoiceCommand::Release { id: 1 }).unwrap();
        let mut tail = vec![0.0f32; 300];
        bank.render(&mut tail);

        assert!(peak(&tail[250..]) == 0.0);
        assert_eq!(bank.active_count(), 0);
    }

    #[test]
    fn timed_voice_frees_its_slot() {
        let (mut tx, mut bank) = bank();
        tx.push(VoiceCommand::Start {
            id: 3,
            frequency: 220.0,
            hold_ms: Some(100),
        })
        .unwrap();

        let mut out = vec![0.0f32; 400];
        bank.render(&mut out);

        assert_eq!(bank.active_count(), 0);
    }

    #[test]
    fn release_of_unknown_voice_is_ignored() {
        let (mut tx, mut bank) = bank();
        tx.push(VoiceCommand::Start {
            id: 1,
            frequency: 220.0,
            hold_ms: None,
        })
        .unwrap();
        tx.push(VoiceCommand::Release { id: 99 }).unwrap();

        let mut out = vec![0.0f32; 64];
        bank.render(&mut out);

        assert_eq!(bank.active_count(), 1);
    }

    #[test]
    fn pool_grows_past_initial_size_without_reallocating() {
        let (mut tx, mut bank) = bank();
        let capacity = bank.voices.capacity();
        let total = INITIAL_VOICES as u64 + 40;

        let mut out = vec![0.0f32; 8];
        for id in 0..total {
            tx.push(VoiceCommand::Start {
                id,
                frequency: 200.0 + id as f32,
                hold_ms: None,
            })
            .unwrap();
            // Drain before the command queue fills
            if id % 32 == 31 {
                bank.render(&mut out);
            }
        }
        bank.render(&mut out);

        assert_eq!(bank.active_count(), total as usize);
        assert_eq!(bank.voices.capacity(), capacity);
    }
}
