// Purpose - audio output devices

pub mod cpal_output;

pub use cpal_output::CpalOutput;

use thiserror::Error;

/// Audio device failures. None of these are fatal to the engine; a voice
/// that cannot be played is dropped silently.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no default output device available")]
    NoDevice,

    #[error("failed to fetch default output config: {0}")]
    Config(String),

    #[error("failed to build output stream: {0}")]
    Stream(String),

    #[error("output device suspended: {0}")]
    Suspended(String),
}

/// A process-wide audio output that may be running or suspended.
pub trait OutputDevice {
    fn is_running(&self) -> bool;

    /// Try to bring a suspended device back.
    fn resume(&mut self) -> Result<(), AudioError>;
}

/// Output that is always running and renders nowhere.
///
/// Used with [`ToneSynth::offline`](crate::synth::ToneSynth::offline), where
/// the caller renders the voice bank itself.
pub struct NullOutput;

impl OutputDevice for NullOutput {
    fn is_running(&self) -> bool {
        true
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Stand-in for a device that could not be opened. Never runs and never
/// resumes, so every voice played against it is inert.
pub struct NoOutput;

impl OutputDevice for NoOutput {
    fn is_running(&self) -> bool {
        false
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Err(AudioError::NoDevice)
    }
}
