use crate::config::StudioConfig;

/*
Tone Envelope
=============

Every voice is shaped by the same four-stage envelope. It is simpler than a
full ADSR: there is no decay stage, the level holds at the peak until the
voice is released.

  Level
   peak ┐   ╱‾‾‾‾‾‾‾‾‾‾‾‾‾╲
        │  ╱                 ╲_
        │ ╱                    ╲__
    0.0 └╱──────────────────────────┴──→ Time
        Attack    Sustain     Release  hard stop
       (linear)              (exp decay)


Attack: Linear Ramp
-------------------

Every voice starts at zero and climbs in a straight line to `peak` over the
attack time. Starting from zero is what keeps a note from clicking.

    increment = peak / (attack_time * sample_rate)


Release: Exponential Decay
--------------------------

On release the level decays toward zero with time constant `tau`:

    level(t) = start * e^(-t / tau)

Per sample this is one multiply by a fixed coefficient:

    coefficient = e^(-1 / (tau * sample_rate))

Exponential decay never reaches zero by itself, so the voice is cut off
hard after a fixed stop delay. With tau = 100ms and a 200ms delay the level
is at e^-2 ≈ 13% of where it started, and the start was at most the peak.


Timed Voices
------------

A voice started with a hold time releases by itself once that many samples
have elapsed since note_on. The hold is counted from the start, attack
included, so a very short hold releases from wherever the attack got to.


The State Machine
-----------------

    ┌──────┐ note_on ┌────────┐ level=peak ┌─────────┐
    │ Idle │ ──────→ │ Attack │ ─────────→ │ Sustain │
    └──────┘         └────────┘            └─────────┘
        ↑                │ note_off / hold      │ note_off / hold
        │                ↓                      ↓
        │            ┌─────────────────────────────┐
        └─────────── │           Release           │
       stop delay    └─────────────────────────────┘
*/

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,    // Not sounding, level = 0
    Attack,  // Ramping from 0 to peak
    Sustain, // Holding at peak
    Release, // Decaying toward 0 until the hard stop
}

/// Envelope timings resolved from the engine config.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeShape {
    pub peak: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
    pub stop_delay_secs: f32,
}

impl EnvelopeShape {
    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            peak: config.peak_level,
            attack_secs: config.attack_ms as f32 / 1000.0,
            release_secs: config.release_ms as f32 / 1000.0,
            stop_delay_secs: config.stop_delay_ms as f32 / 1000.0,
        }
    }
}

pub struct ToneEnvelope {
    // Derived per-sample constants
    peak: f32,
    attack_increment: f32,
    release_coefficient: f32,
    stop_delay_samples: u32,

    // Runtime state
    stage: EnvelopeStage,
    level: f32,
    elapsed_samples: u32,       // since note_on
    hold_samples: Option<u32>,  // auto-release point for timed voices
    release_elapsed_samples: u32,
}

impl ToneEnvelope {
    pub fn new(shape: EnvelopeShape, sample_rate: f32) -> Self {
        let attack_samples = (shape.attack_secs * sample_rate).max(1.0);
        let release_samples = (shape.release_secs * sample_rate).max(1.0);

        Self {
            peak: shape.peak,
            attack_increment: shape.peak / attack_samples,
            release_coefficient: (-1.0 / release_samples).exp(),
            stop_delay_samples: (shape.stop_delay_secs * sample_rate).round().max(1.0) as u32,

            stage: EnvelopeStage::Idle,
            level: 0.0,
            elapsed_samples: 0,
            hold_samples: None,
            release_elapsed_samples: 0,
        }
    }

    /// Start the attack from zero. `hold_samples` makes the voice timed.
    pub fn note_on(&mut self, hold_samples: Option<u32>) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.elapsed_samples = 0;
        self.hold_samples = hold_samples;
        self.release_elapsed_samples = 0;
    }

    /// Begin the release from the current level. Ignored once releasing.
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeStage::Attack | EnvelopeStage::Sustain) {
            self.release_elapsed_samples = 0;
            self.stage = EnvelopeStage::Release;
        }
    }

    /// Advance the envelope by one sample.
    pub fn next_sample(&mut self) -> f32 {
        if matches!(self.stage, EnvelopeStage::Attack | EnvelopeStage::Sustain) {
            if let Some(hold) = self.hold_samples {
                if self.elapsed_samples >= hold {
                    self.note_off();
                }
            }
            self.elapsed_samples = self.elapsed_samples.saturating_add(1);
        }

        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                self.level += self.attack_increment;
                if self.level >= self.peak {
                    self.level = self.peak;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                self.level = self.peak;
            }

            EnvelopeStage::Release => {
                self.level *= self.release_coefficient;
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.stop_delay_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!(self.level >= 0.0 && self.level <= self.peak.max(0.0) + f32::EPSILON);
        self.level
    }

    /// Returns true while the envelope produces output.
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.elapsed_samples = 0;
        self.hold_samples = None;
        self.release_elapsed_samples = 0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn shape() -> EnvelopeShape {
        EnvelopeShape {
            peak: 0.3,
            attack_secs: 0.05,
            release_secs: 0.1,
            stop_delay_secs: 0.2,
        }
    }

    fn render_samples(env: &mut ToneEnvelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample();
        }
    }

    #[test]
    fn attack_is_linear_from_zero() {
        let mut env = ToneEnvelope::new(shape(), SAMPLE_RATE);
        env.note_on(None);

        let first = env.next_sample();
        render_samples(&mut env, 23);
        let halfway = env.next_sample();

        assert!(first > 0.0 && first < 0.01);
        assert!((halfway - 0.15).abs() < 0.01, "got {halfway}");
    }

    #[test]
    fn sustained_voice_holds_peak() {
        let mut env = ToneEnvelope::new(shape(), SAMPLE_RATE);
        env.note_on(None);
        render_samples(&mut env, 5_000);

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn release_decays_then_stops_hard() {
        let mut env = ToneEnvelope::new(shape(), SAMPLE_RATE);
        env.note_on(None);
        render_samples(&mut env, 100);

        env.note_off();
        render_samples(&mut env, 100);
        // One time constant in: about 37% of the peak
        assert!((env.level() - 0.3 * (-1.0f32).exp()).abs() < 0.01);
        assert!(env.is_active());

        render_samples(&mut env, 100);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn timed_voice_releases_itself() {
        let mut env = ToneEnvelope::new(shape(), SAMPLE_RATE);
        env.note_on(Some(500));

        render_samples(&mut env, 499);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);

        render_samples(&mut env, 2);
        assert_eq!(env.stage(), EnvelopeStage::Release);

        render_samples(&mut env, 200);
        assert!(!env.is_active());
    }

    #[test]
    fn note_off_twice_does_not_restart_release() {
        let mut env = ToneEnvelope::new(shape(), SAMPLE_RATE);
        env.note_on(None);
        render_samples(&mut env, 100);

        env.note_off();
        render_samples(&mut env, 150);
        env.note_off();
        render_samples(&mut env, 50);

        assert!(!env.is_active());
    }
}
