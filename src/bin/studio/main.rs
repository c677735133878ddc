//! saavy-studio - terminal keyboard with recording, playback and a motif library
//!
//! Run with: cargo run --bin saavy-studio
//!
//! Data lives in `$SAAVY_STUDIO_DIR`, or the platform data directory:
//!   archive.json   recorded performances
//!   config.json    engine settings (optional)
//!   settings.json  advisor API key and model (GEMINI_API_KEY overrides)
//!   studio.log     tracing output (RUST_LOG to adjust)

mod app;
mod keys;
mod ui;
mod worker;

use app::StudioApp;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    StudioApp::new().data_dir(app::default_data_dir()).run()
}
