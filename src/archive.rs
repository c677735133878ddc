//! Archive store - where finished performances live.
//!
//! The store is the single owner of persisted performances. Every write
//! normalizes the event log first, so a stored record never has a release
//! without its press or a press that is never released.
//!
//! `JsonArchive` keeps the whole collection in one versioned JSON document
//! and rewrites it on each change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::performance::{Performance, PerformancePatch};

pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("archive is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("archive version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("no performance with id {0}")]
    NotFound(u64),
}

pub trait ArchiveStore {
    /// All performances, oldest first.
    fn list(&self) -> Result<Vec<Performance>, ArchiveError>;

    fn get(&self, id: u64) -> Result<Option<Performance>, ArchiveError>;

    /// Insert or replace by id. Returns the record as stored.
    fn save(&mut self, performance: Performance) -> Result<Performance, ArchiveError>;

    fn update(&mut self, id: u64, patch: PerformancePatch) -> Result<Performance, ArchiveError>;

    /// Returns false if nothing had that id.
    fn delete(&mut self, id: u64) -> Result<bool, ArchiveError>;
}

fn upsert(performances: &mut Vec<Performance>, performance: Performance) -> Performance {
    let performance = performance.normalized();
    match performances.iter_mut().find(|p| p.id == performance.id) {
        Some(existing) => *existing = performance.clone(),
        None => performances.push(performance.clone()),
    }
    performance
}

fn patch(
    performances: &mut [Performance],
    id: u64,
    patch: PerformancePatch,
) -> Result<Performance, ArchiveError> {
    let performance = performances
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(ArchiveError::NotFound(id))?;
    performance.apply(patch);
    Ok(performance.clone())
}

fn remove(performances: &mut Vec<Performance>, id: u64) -> bool {
    let before = performances.len();
    performances.retain(|p| p.id != id);
    performances.len() != before
}

/// In-process store.
#[derive(Default)]
pub struct MemoryArchive {
    performances: Vec<Performance>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveStore for MemoryArchive {
    fn list(&self) -> Result<Vec<Performance>, ArchiveError> {
        Ok(self.performances.clone())
    }

    fn get(&self, id: u64) -> Result<Option<Performance>, ArchiveError> {
        Ok(self.performances.iter().find(|p| p.id == id).cloned())
    }

    fn save(&mut self, performance: Performance) -> Result<Performance, ArchiveError> {
        Ok(upsert(&mut self.performances, performance))
    }

    fn update(&mut self, id: u64, changes: PerformancePatch) -> Result<Performance, ArchiveError> {
        patch(&mut self.performances, id, changes)
    }

    fn delete(&mut self, id: u64) -> Result<bool, ArchiveError> {
        Ok(remove(&mut self.performances, id))
    }
}

#[derive(Serialize, Deserialize)]
struct ArchiveFile {
    version: u32,
    performances: Vec<Performance>,
}

/// Store backed by a single JSON file.
pub struct JsonArchive {
    path: PathBuf,
}

impl JsonArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Performance>, ArchiveError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let file: ArchiveFile = serde_json::from_str(&json)?;
        if file.version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(file.version));
        }
        Ok(file.performances)
    }

    fn store(&self, performances: Vec<Performance>) -> Result<(), ArchiveError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let file = ArchiveFile {
            version: ARCHIVE_VERSION,
            performances,
        };
        let json = serde_json::to_string_pretty(&file)?;

        // Write beside the target, then swap
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), count = file.performances.len(), "archive written");
        Ok(())
    }
}

impl ArchiveStore for JsonArchive {
    fn list(&self) -> Result<Vec<Performance>, ArchiveError> {
        self.load()
    }

    fn get(&self, id: u64) -> Result<Option<Performance>, ArchiveError> {
        Ok(self.load()?.into_iter().find(|p| p.id == id))
    }

    fn save(&mut self, performance: Performance) -> Result<Performance, ArchiveError> {
        let mut performances = self.load()?;
        let stored = upsert(&mut performances, performance);
        self.store(performances)?;
        Ok(stored)
    }

    fn update(&mut self, id: u64, changes: PerformancePatch) -> Result<Performance, ArchiveError> {
        let mut performances = self.load()?;
        let updated = patch(&mut performances, id, changes)?;
        self.store(performances)?;
        Ok(updated)
    }

    fn delete(&mut self, id: u64) -> Result<bool, ArchiveError> {
        let mut performances = self.load()?;
        if !remove(&mut performances, id) {
            return Ok(false);
        }
        self.store(performances)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{Annotation, PerformanceEvent};

    fn scratch_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "saavy-studio-archive-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join("archive.json")
    }

    fn take(id: u64) -> Performance {
        Performance::new(
            id,
            format!("User Mix {id}"),
            vec![
                PerformanceEvent::on(0, 60),
                PerformanceEvent::off(500, 60),
                PerformanceEvent::on(600, 62),
            ],
        )
    }

    #[test]
    fn memory_save_normalizes() {
        let mut archive = MemoryArchive::new();
        let stored = archive.save(take(1)).unwrap();

        assert_eq!(
            stored.events,
            vec![PerformanceEvent::on(0, 60), PerformanceEvent::off(500, 60)]
        );
        assert_eq!(archive.get(1).unwrap().unwrap(), stored);
    }

    #[test]
    fn save_with_existing_id_replaces() {
        let mut archive = MemoryArchive::new();
        archive.save(take(1)).unwrap();

        let mut renamed = take(1);
        renamed.display_name = "Night Bus".into();
        archive.save(renamed).unwrap();

        let all = archive.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Night Bus");
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let mut archive = MemoryArchive::new();
        let err = archive.update(9, PerformancePatch::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(9)));
    }

    #[test]
    fn json_round_trip_through_disk() {
        let path = scratch_path("round-trip");
        let mut archive = JsonArchive::new(&path);
        assert!(archive.list().unwrap().is_empty());

        archive.save(take(1)).unwrap();
        archive.save(take(2)).unwrap();
        archive
            .update(
                2,
                PerformancePatch {
                    display_name: Some("Cloud Walk".into()),
                    annotation: Some(Annotation {
                        title: "Cloud Walk".into(),
                        mood: "soft and slow".into(),
                    }),
                },
            )
            .unwrap();

        let reopened = JsonArchive::new(&path);
        let all = reopened.list().unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(all[1].display_name, "Cloud Walk");
        assert_eq!(all[1].events.len(), 2);

        let mut reopened = reopened;
        assert!(reopened.delete(1).unwrap());
        assert!(!reopened.delete(1).unwrap());
        assert_eq!(reopened.list().unwrap().len(), 1);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let path = scratch_path("version");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"version": 7, "performances": []}"#).unwrap();

        let archive = JsonArchive::new(&path);
        assert!(matches!(
            archive.list(),
            Err(ArchiveError::UnsupportedVersion(7))
        ));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
