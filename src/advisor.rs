//! Advisor bridge - one request/response call to a text-generation service.
//!
//! Two questions are asked:
//!   - describe: name a set of pitches and give it a mood
//!   - compose: turn a free-text mood into a list of pitch offsets
//!
//! Each call is a single POST with no retries. Every failure (no key, network,
//! non-2xx status, unexpected reply) comes back as an [`AdvisorError`] and the
//! caller keeps its state as it was.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{performance::Annotation, synth::PitchId};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Largest composed offset, in semitones either side of the base pitch.
pub const MAX_OFFSET: PitchId = 127;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch class name, e.g. 61 -> "C#".
pub fn note_name(pitch: PitchId) -> &'static str {
    NOTE_NAMES[pitch.rem_euclid(12) as usize]
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("no API key configured")]
    NoCredential,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("unexpected reply: {0}")]
    Malformed(String),
}

impl AdvisorError {
    /// Every advisor failure means the same thing to callers: no answer.
    pub fn is_unavailable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorSettings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl AdvisorSettings {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    /// Read settings from `path`. A missing or unreadable file gives defaults.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read advisor settings");
                return Self::default();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "advisor settings are not valid JSON");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    /// Apply the `GEMINI_API_KEY` environment variable, if set.
    pub fn with_env_override(self) -> Self {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => self.with_api_key(key),
            _ => self,
        }
    }

    fn request_url(&self) -> Result<String, AdvisorError> {
        let key = self.api_key.as_deref().ok_or(AdvisorError::NoCredential)?;
        Ok(format!(
            "{}/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            key
        ))
    }
}

/// Carries one JSON request to the service and returns the raw reply body.
pub trait AdvisorTransport: Send {
    fn post_json(&self, url: &str, body: &str) -> Result<String, AdvisorError>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}

impl AdvisorTransport for HttpTransport {
    fn post_json(&self, url: &str, body: &str) -> Result<String, AdvisorError> {
        let response = ureq::post(url)
            .set("Content-Type", "application/json")
            .timeout(self.timeout)
            .send_string(body);

        match response {
            Ok(response) => response
                .into_string()
                .map_err(|e| AdvisorError::Transport(e.to_string())),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(AdvisorError::Service(service_message(code, &body)))
            }
            Err(e) => Err(AdvisorError::Transport(e.to_string())),
        }
    }
}

/// Pull `error.message` out of an error body, falling back to the status.
fn service_message(code: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {code}"))
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn request_body(prompt: &str) -> Result<String, AdvisorError> {
    let request = GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(prompt.to_string()),
            }],
        }],
    };
    serde_json::to_string(&request).map_err(|e| AdvisorError::Malformed(e.to_string()))
}

/// `candidates[0].content.parts[0].text`
fn reply_text(body: &str) -> Result<String, AdvisorError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| AdvisorError::Malformed(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| AdvisorError::Malformed("reply has no text".into()))
}

pub fn describe_prompt(pitches: &BTreeSet<PitchId>) -> String {
    let names: Vec<&str> = pitches.iter().map(|&p| note_name(p)).collect();
    format!(
        "Trendy producer mode. Notes: [{}]. Give a 2-word trendy name and 10-word mood. \
         Format Name: [Name] | Analysis: [Analysis]",
        names.join(", ")
    )
}

pub fn compose_prompt(vibe: &str) -> String {
    format!(
        "Return ONLY a JSON array of 5 MIDI offsets for: \"{vibe}\". No markdown. e.g. [0,3,7,10,12]"
    )
}

/// Split `Name: X | Analysis: Y` into a title and a mood.
pub fn parse_annotation(reply: &str) -> Result<Annotation, AdvisorError> {
    let mut segments = reply.split('|');
    let (Some(name), Some(analysis)) = (segments.next(), segments.next()) else {
        return Err(AdvisorError::Malformed("no '|' delimiter".into()));
    };

    let title = name.replacen("Name:", "", 1).trim().to_string();
    let mood = analysis.replacen("Analysis:", "", 1).trim().to_string();
    if title.is_empty() || mood.is_empty() {
        return Err(AdvisorError::Malformed("empty title or mood".into()));
    }

    Ok(Annotation { title, mood })
}

/// Read the bracketed number list out of a reply, tolerating text around it.
pub fn parse_offsets(reply: &str) -> Result<Vec<PitchId>, AdvisorError> {
    let (Some(start), Some(end)) = (reply.find('['), reply.rfind(']')) else {
        return Err(AdvisorError::Malformed("no bracketed list".into()));
    };
    if end < start {
        return Err(AdvisorError::Malformed("no bracketed list".into()));
    }

    let offsets: Vec<PitchId> = serde_json::from_str(&reply[start..=end])
        .map_err(|e| AdvisorError::Malformed(e.to_string()))?;
    if offsets.is_empty() {
        return Err(AdvisorError::Malformed("empty list".into()));
    }
    if let Some(bad) = offsets.iter().find(|o| !(-MAX_OFFSET..=MAX_OFFSET).contains(*o)) {
        return Err(AdvisorError::Malformed(format!("offset {bad} out of range")));
    }
    Ok(offsets)
}

pub struct Advisor<T = HttpTransport> {
    settings: AdvisorSettings,
    transport: T,
}

impl Advisor<HttpTransport> {
    pub fn http(settings: AdvisorSettings) -> Self {
        Self::new(settings, HttpTransport::default())
    }
}

impl<T: AdvisorTransport> Advisor<T> {
    pub fn new(settings: AdvisorSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &AdvisorSettings {
        &self.settings
    }

    pub fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn ask(&self, prompt: &str) -> Result<String, AdvisorError> {
        let url = self.settings.request_url()?;
        let body = request_body(prompt)?;
        debug!(model = %self.settings.model, "advisor request");

        let reply = self.transport.post_json(&url, &body)?;
        reply_text(&reply)
    }

    /// Title and mood for a set of pitches.
    pub fn describe(&self, pitches: &BTreeSet<PitchId>) -> Result<Annotation, AdvisorError> {
        let reply = self.ask(&describe_prompt(pitches))?;
        parse_annotation(&reply)
    }

    /// Pitch offsets for a free-text mood.
    pub fn compose(&self, vibe: &str) -> Result<Vec<PitchId>, AdvisorError> {
        let reply = self.ask(&compose_prompt(vibe))?;
        parse_offsets(&reply)
    }
}
