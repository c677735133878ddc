//! cpal-backed output device.
//!
//! Opens the default output device and renders a [`VoiceBank`] inside the
//! stream callback. The bank is mono; each frame is copied to every channel.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use tracing::{error, info};

use crate::{
    config::StudioConfig,
    io::{AudioError, OutputDevice},
    synth::{bank::VoiceBank, tone::COMMAND_QUEUE_SIZE, ToneSynth},
    MAX_BLOCK_SIZE,
};

pub struct CpalOutput {
    stream: cpal::Stream,
    running: Arc<AtomicBool>,
    sample_rate: f32,
    channels: usize,
}

impl CpalOutput {
    /// Open the default device and return a synth that plays through it.
    pub fn open(config: &StudioConfig) -> Result<ToneSynth, AudioError> {
        let (tx, rx) = RingBuffer::new(COMMAND_QUEUE_SIZE);

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let stream_config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;

        let mut bank = VoiceBank::new(rx, config, sample_rate);
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let running = Arc::new(AtomicBool::new(false));
        let running_flag = running.clone();

        let stream = device
            .build_output_stream(
                &stream_config.into(),
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;

                    while frames_written < total_frames {
                        let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..frames_to_render];
                        bank.render_block(block);

                        // Copy to output (mono to all channels)
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }

                        frames_written += frames_to_render;
                    }
                },
                move |err| {
                    error!(%err, "audio stream error");
                    running_flag.store(false, Ordering::Relaxed);
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let mut output = Self {
            stream,
            running,
            sample_rate,
            channels,
        };
        output.resume()?;

        info!(sample_rate, channels, "audio output opened");
        Ok(ToneSynth::new(tx, Box::new(output), config))
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl OutputDevice for CpalOutput {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::Suspended(e.to_string()))?;
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }
}
