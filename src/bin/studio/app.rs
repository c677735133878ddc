//! StudioApp - startup: data directory, logging, audio, then the UI loop

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::supports_keyboard_enhancement,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use saavy_studio::{
    advisor::{Advisor, AdvisorSettings},
    archive::JsonArchive,
    catalog::Catalog,
    io::CpalOutput,
    surface::Highlights,
    synth::{Synthesizer, ToneSynth},
    Studio, StudioConfig,
};

use super::ui::UiApp;
use super::worker::AdvisorWorker;

const DATA_DIR_VAR: &str = "SAAVY_STUDIO_DIR";

/// `$SAAVY_STUDIO_DIR`, else `<platform data dir>/saavy-studio`, else `./.saavy-studio`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_VAR) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("saavy-studio"))
        .unwrap_or_else(|| PathBuf::from(".saavy-studio"))
}

/// Main application builder
pub struct StudioApp {
    data_dir: PathBuf,
}

impl StudioApp {
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from(".saavy-studio"),
        }
    }

    /// Set where archive, settings and logs are kept
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Run the application (takes over the terminal)
    pub fn run(self) -> EyreResult<()> {
        fs::create_dir_all(&self.data_dir)
            .wrap_err_with(|| format!("failed to create {}", self.data_dir.display()))?;
        self.init_logging()?;

        let config = self.load_config();
        let settings = AdvisorSettings::load(&self.data_dir.join("settings.json")).with_env_override();
        if settings.api_key.is_none() {
            info!("no advisor API key; describe and compose are disabled");
        }

        let (synth, audio_note): (Box<dyn Synthesizer>, Option<String>) = match CpalOutput::open(&config) {
            Ok(synth) => (Box::new(synth), None),
            Err(err) => {
                warn!(%err, "audio output unavailable, running silent");
                let synth = ToneSynth::silent(&config);
                (Box::new(synth), Some(format!("Audio unavailable: {err}")))
            }
        };

        let highlights = Highlights::new();
        let archive = JsonArchive::new(self.data_dir.join("archive.json"));
        let studio = Studio::new(config, synth, Box::new(archive)).with_highlights(highlights.clone());

        let worker = AdvisorWorker::spawn(Advisor::http(settings))
            .wrap_err("failed to start advisor worker")?;

        let mut ui = UiApp::new(studio, Catalog::builtin(), highlights, worker);
        if let Some(note) = audio_note {
            ui.set_status(note);
        }

        let mut terminal = ratatui::init();
        // Key releases need the enhancement flags; without them held keys time out
        let enhanced = matches!(supports_keyboard_enhancement(), Ok(true))
            && execute!(
                std::io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        ui.set_key_releases(enhanced);
        info!(enhanced, "terminal ready");

        let result = ui.run(&mut terminal);

        if enhanced {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        ratatui::restore();
        result
    }

    fn init_logging(&self) -> EyreResult<()> {
        let path = self.data_dir.join("studio.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to open {}", path.display()))?;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("saavy_studio=info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
        Ok(())
    }

    fn load_config(&self) -> StudioConfig {
        let path = self.data_dir.join("config.json");
        match fs::read_to_string(&path) {
            Ok(text) => StudioConfig::from_json(&text).unwrap_or_else(|err| {
                warn!(%err, path = %path.display(), "bad config, using defaults");
                StudioConfig::default()
            }),
            Err(_) => StudioConfig::default(),
        }
    }
}

impl Default for StudioApp {
    fn default() -> Self {
        Self::new()
    }
}
