use serde::{Deserialize, Serialize};

/*
Tone Oscillator
===============

A phase accumulator that turns a frequency into a periodic waveform. Phase
runs from 0.0 to 1.0 and wraps; each sample advances it by
`frequency / sample_rate`.

  Sine      sin(2π·phase)                pure, no overtones
  Triangle  1 - 4·|phase - 0.5|          soft, weak odd harmonics (default)
  Saw       2·phase - 1                  bright, all harmonics
  Square    ±1 around phase 0.5          hollow, odd harmonics

The shapes are naive (not band-limited). At the pitches a keyboard reaches
and with the quiet peak level the engine uses, aliasing stays low enough.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
    Square,
}

pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    increment: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
            increment: 0.0,
        }
    }

    /// Restart at phase zero with a new frequency, capped at Nyquist.
    pub fn reset(&mut self, frequency: f32, sample_rate: f32) {
        self.phase = 0.0;
        self.increment = (frequency / sample_rate).clamp(0.0, 0.5);
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let phase = self.phase;
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        match self.waveform {
            Waveform::Sine => (std::f32::consts::TAU * phase).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
