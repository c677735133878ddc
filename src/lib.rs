pub mod advisor; // Text-generation bridge (describe / compose)
pub mod archive; // Performance persistence
pub mod catalog; // Built-in motif library
pub mod config;
pub mod io; // Audio output devices
pub mod performance;
pub mod playback; // Replaying event logs on the timeline
pub mod recorder;
pub mod registry; // Held voices
pub mod studio; // Engine context
pub mod surface; // Highlight callbacks to the input surface
pub mod synth; // Tone synthesis
pub mod time;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

pub use config::StudioConfig;
pub use studio::{Notice, RecorderStatus, Studio, StudioError};

pub const MAX_BLOCK_SIZE: usize = 2048;
