//! Studio - the engine context.
//!
//! One `Studio` owns everything that has state: the synthesizer, the held
//! voices, the recording session, both playback slots and the timeline of
//! deferred actions. Every operation reads the clock once and passes that
//! time down, so a single call sees one consistent "now".
//!
//! ```text
//!   press/release ──→ VoiceRegistry ──→ Synthesizer
//!                          │
//!                          └──→ Recorder ──(stop/ceiling)──→ ArchiveStore
//!
//!   play_* ──→ PlaybackScheduler ──→ Timeline ──(tick)──→ Synthesizer
//!                                                      └──→ HighlightSink
//! ```
//!
//! Nothing here blocks. The owner calls [`Studio::tick`] regularly (at the
//! latest by [`Studio::next_deadline_ms`]) to run due actions and enforce the
//! recording ceiling.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    advisor::{Advisor, AdvisorError, AdvisorTransport},
    archive::{ArchiveError, ArchiveStore},
    catalog::Motif,
    config::StudioConfig,
    performance::{Annotation, Performance, PerformancePatch},
    playback::{
        motif_events, AssetId, Deferred, PlayOutcome, PlaybackCtx, PlaybackScheduler,
        PlaybackSlot,
    },
    recorder::{Recorder, RecorderState},
    registry::VoiceRegistry,
    surface::{HighlightSink, NoHighlights},
    synth::{PitchId, Synthesizer},
    time::{Clock, MonotonicClock},
    timeline::Timeline,
};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("advisor unavailable: {0}")]
    Advisor(#[from] AdvisorError),
    #[error("no performance with id {0}")]
    NotFound(u64),
}

/// Things that happened without a direct caller, e.g. inside `tick`.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    RecordingSaved(Performance),
    CeilingReached,
    ArchiveFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderStatus {
    pub state: RecorderState,
    /// Live time left before the ceiling; frozen while paused.
    pub remaining_ms: u64,
    pub event_count: usize,
}

pub struct Studio {
    config: StudioConfig,
    clock: Box<dyn Clock>,
    synth: Box<dyn Synthesizer>,
    highlights: Box<dyn HighlightSink>,
    archive: Box<dyn ArchiveStore>,
    registry: VoiceRegistry,
    recorder: Recorder,
    library: PlaybackScheduler,
    archive_playback: PlaybackScheduler,
    timeline: Timeline<Deferred>,
    notices: Vec<Notice>,
}

impl Studio {
    pub fn new(
        config: StudioConfig,
        synth: Box<dyn Synthesizer>,
        archive: Box<dyn ArchiveStore>,
    ) -> Self {
        Self {
            recorder: Recorder::new(config.recording_ceiling_ms),
            library: PlaybackScheduler::new(
                PlaybackSlot::Library,
                config.flash_ms,
                config.trailing_margin_ms,
            ),
            archive_playback: PlaybackScheduler::new(
                PlaybackSlot::Archive,
                config.flash_ms,
                config.trailing_margin_ms,
            ),
            config,
            clock: Box::new(MonotonicClock::new()),
            synth,
            highlights: Box::new(NoHighlights),
            archive,
            registry: VoiceRegistry::new(),
            timeline: Timeline::new(),
            notices: Vec::new(),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Set where highlight changes are reported
    pub fn with_highlights(mut self, highlights: impl HighlightSink + 'static) -> Self {
        self.highlights = Box::new(highlights);
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // ---- input -------------------------------------------------------------

    /// A key went down. Repeats while held are ignored.
    pub fn press(&mut self, pitch: PitchId) {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);

        if let Some(transition) = self.registry.trigger(pitch, now, self.synth.as_mut()) {
            self.highlights.highlight(pitch, true);
            self.recorder.observe(&transition, now);
        }
    }

    /// A key went up.
    pub fn release(&mut self, pitch: PitchId) {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);

        if let Some(transition) = self.registry.release(pitch, self.synth.as_mut()) {
            self.highlights.highlight(pitch, false);
            self.recorder.observe(&transition, now);
        }
    }

    pub fn is_held(&self, pitch: PitchId) -> bool {
        self.registry.is_held(pitch)
    }

    pub fn held_pitches(&self) -> Vec<PitchId> {
        self.registry.held_pitches()
    }

    /// How long `pitch` has been down, or None if it is not held.
    pub fn held_for_ms(&self, pitch: PitchId) -> Option<u64> {
        self.registry.held_for_ms(pitch, self.clock.now_ms())
    }

    // ---- recording ---------------------------------------------------------

    pub fn start_recording(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.recorder.start(now)
    }

    pub fn pause_recording(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);
        self.recorder.pause(now)
    }

    pub fn resume_recording(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);
        self.recorder.resume(now)
    }

    pub fn toggle_pause(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);
        self.recorder.toggle_pause(now)
    }

    /// Finalize the session. Returns the stored performance, or `None` if
    /// nothing was captured.
    pub fn stop_recording(&mut self) -> Option<Performance> {
        let now = self.clock.now_ms();
        if self.recorder.ceiling_reached(now) {
            self.notices.push(Notice::CeilingReached);
        }
        self.finalize(now)
    }

    pub fn recorder_status(&self) -> RecorderStatus {
        let now = self.clock.now_ms();
        RecorderStatus {
            state: self.recorder.state(),
            remaining_ms: self.recorder.remaining_ms(now),
            event_count: self.recorder.event_count(),
        }
    }

    fn enforce_ceiling(&mut self, now: u64) {
        if !self.recorder.ceiling_reached(now) {
            return;
        }

        info!(ceiling_ms = self.recorder.ceiling_ms(), "recording ceiling reached");
        if let Some(performance) = self.finalize(now) {
            self.notices.push(Notice::RecordingSaved(performance));
        }
        self.notices.push(Notice::CeilingReached);
    }

    fn finalize(&mut self, now: u64) -> Option<Performance> {
        let events = self.recorder.stop(now)?;

        let existing = match self.archive.list() {
            Ok(existing) => existing,
            Err(e) => {
                warn!(error = %e, "could not list archive");
                Vec::new()
            }
        };
        let id = next_performance_id(&existing);
        let name = format!("User Mix {}", existing.len() + 1);
        let performance = Performance::new(id, name, events);

        match self.archive.save(performance.clone()) {
            Ok(stored) => {
                info!(id, events = stored.events.len(), "performance saved");
                Some(stored)
            }
            Err(e) => {
                warn!(id, error = %e, "could not save performance");
                self.notices.push(Notice::ArchiveFailed(e.to_string()));
                Some(performance.normalized())
            }
        }
    }

    // ---- playback ----------------------------------------------------------

    fn scheduler_run<R>(
        &mut self,
        slot: PlaybackSlot,
        now_ms: u64,
        f: impl FnOnce(&mut PlaybackScheduler, &mut PlaybackCtx<'_>) -> R,
    ) -> R {
        let scheduler = match slot {
            PlaybackSlot::Library => &mut self.library,
            PlaybackSlot::Archive => &mut self.archive_playback,
        };
        let mut ctx = PlaybackCtx {
            now_ms,
            synth: self.synth.as_mut(),
            highlights: self.highlights.as_mut(),
            timeline: &mut self.timeline,
        };
        f(scheduler, &mut ctx)
    }

    /// Play a library motif, or stop it if it is already playing.
    pub fn play_motif(&mut self, motif: &Motif) -> PlayOutcome {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);

        let events = motif_events(
            &motif.offsets,
            self.config.motif_base_pitch,
            self.config.motif_spacing_ms,
        );
        let note_ms = self.config.motif_note_ms;
        let asset = AssetId::Motif(motif.id.clone());

        self.scheduler_run(PlaybackSlot::Library, now, |s, ctx| {
            s.play(asset, &events, note_ms, ctx)
        })
    }

    /// Play offsets from the advisor. Always starts fresh, replacing any
    /// composition that is still playing.
    pub fn play_composed(&mut self, offsets: &[PitchId]) -> PlayOutcome {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);

        let events = motif_events(
            offsets,
            self.config.motif_base_pitch,
            self.config.motif_spacing_ms,
        );
        let note_ms = self.config.motif_note_ms;

        self.scheduler_run(PlaybackSlot::Library, now, |s, ctx| {
            s.stop(&AssetId::Composed, ctx);
            s.play(AssetId::Composed, &events, note_ms, ctx)
        })
    }

    /// Play an archived performance, or stop it if it is already playing.
    pub fn play_performance(&mut self, id: u64) -> Result<PlayOutcome, StudioError> {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);

        let asset = AssetId::Performance(id);
        if self.archive_playback.is_active(&asset) {
            return Ok(self.scheduler_run(PlaybackSlot::Archive, now, |s, ctx| {
                s.stop(&asset, ctx);
                PlayOutcome::ToggledOff
            }));
        }

        let performance = self.archive.get(id)?.ok_or(StudioError::NotFound(id))?;
        let note_ms = self.config.performance_note_ms;

        Ok(self.scheduler_run(PlaybackSlot::Archive, now, |s, ctx| {
            s.play(asset, &performance.events, note_ms, ctx)
        }))
    }

    pub fn stop_playback(&mut self, slot: PlaybackSlot) -> bool {
        let now = self.clock.now_ms();
        self.scheduler_run(slot, now, |s, ctx| s.stop_active(ctx))
    }

    pub fn active_asset(&self, slot: PlaybackSlot) -> Option<AssetId> {
        match slot {
            PlaybackSlot::Library => self.library.active_asset().cloned(),
            PlaybackSlot::Archive => self.archive_playback.active_asset().cloned(),
        }
    }

    // ---- archive -----------------------------------------------------------

    pub fn performances(&self) -> Result<Vec<Performance>, StudioError> {
        Ok(self.archive.list()?)
    }

    pub fn performance(&self, id: u64) -> Result<Option<Performance>, StudioError> {
        Ok(self.archive.get(id)?)
    }

    /// Delete a performance, stopping it first if it is playing.
    pub fn delete_performance(&mut self, id: u64) -> Result<bool, StudioError> {
        let now = self.clock.now_ms();
        let asset = AssetId::Performance(id);
        self.scheduler_run(PlaybackSlot::Archive, now, |s, ctx| s.stop(&asset, ctx));

        let deleted = self.archive.delete(id)?;
        debug!(id, deleted, "delete performance");
        Ok(deleted)
    }

    /// Store an advisor annotation; the title also becomes the display name.
    pub fn apply_annotation(
        &mut self,
        id: u64,
        annotation: Annotation,
    ) -> Result<Performance, StudioError> {
        let patch = PerformancePatch {
            display_name: Some(annotation.title.clone()),
            annotation: Some(annotation),
        };
        Ok(self.archive.update(id, patch)?)
    }

    pub fn rename(&mut self, id: u64, name: impl Into<String>) -> Result<Performance, StudioError> {
        let patch = PerformancePatch {
            display_name: Some(name.into()),
            annotation: None,
        };
        Ok(self.archive.update(id, patch)?)
    }

    /// Ask the advisor about a stored performance and keep its answer.
    ///
    /// Blocks for the length of the request. On any advisor failure the
    /// stored performance is left exactly as it was.
    pub fn describe_performance<T: AdvisorTransport>(
        &mut self,
        id: u64,
        advisor: &Advisor<T>,
    ) -> Result<Performance, StudioError> {
        let performance = self.archive.get(id)?.ok_or(StudioError::NotFound(id))?;
        let annotation = advisor.describe(&performance.pitch_set())?;
        self.apply_annotation(id, annotation)
    }

    // ---- driving -----------------------------------------------------------

    /// Enforce the recording ceiling and run every deferred action that is due.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.enforce_ceiling(now);

        while let Some(due) = self.timeline.next_due() {
            if due > now {
                break;
            }
            let Some(deferred) = self.timeline.pop_due(due) else {
                break;
            };
            self.scheduler_run(deferred.slot, due, |s, ctx| s.fire(deferred, ctx));
        }
    }

    /// Earliest time `tick` has something to do.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        match (self.timeline.next_due(), self.recorder.ceiling_deadline_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Release held notes and stop both playback slots.
    pub fn shutdown(&mut self) {
        for transition in self.registry.release_all(self.synth.as_mut()) {
            self.highlights.highlight(transition.pitch, false);
        }
        self.stop_playback(PlaybackSlot::Library);
        self.stop_playback(PlaybackSlot::Archive);
        self.synth.stop_all();
    }
}

/// Wall-clock milliseconds, moved past every id already in use.
fn next_performance_id(existing: &[Performance]) -> u64 {
    let wall_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64);

    match existing.iter().map(|p| p.id).max() {
        Some(max) if max >= wall_ms => max + 1,
        _ => wall_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        advisor::AdvisorSettings,
        archive::MemoryArchive,
        catalog::Catalog,
        performance::PerformanceEvent,
        surface::Highlights,
        testing::FakeSynth,
        time::ManualClock,
    };

    struct Rig {
        clock: ManualClock,
        synth: FakeSynth,
        highlights: Highlights,
        studio: Studio,
    }

    fn rig() -> Rig {
        let clock = ManualClock::new();
        let synth = FakeSynth::default();
        let highlights = Highlights::new();
        let studio = Studio::new(
            StudioConfig::default(),
            Box::new(synth.clone()),
            Box::new(MemoryArchive::new()),
        )
        .with_clock(clock.clone())
        .with_highlights(highlights.clone());

        Rig {
            clock,
            synth,
            highlights,
            studio,
        }
    }

    impl Rig {
        fn at(&mut self, ms: u64) -> &mut Studio {
            self.clock.set(ms);
            &mut self.studio
        }
    }

    #[test]
    fn held_key_sounds_once() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(30).press(60);
        rig.at(60).press(60);
        rig.at(500).release(60);

        assert_eq!(rig.synth.log.borrow().started.len(), 1);
        let performance = rig.at(600).stop_recording().unwrap();
        assert_eq!(performance.events.len(), 2);
    }

    #[test]
    fn recording_round_trip() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(500).release(60);
        let saved = rig.at(800).stop_recording().unwrap();

        let stored = rig.studio.performances().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], saved);
        assert_eq!(saved.display_name, "User Mix 1");
        assert_eq!(
            saved.events,
            vec![PerformanceEvent::on(0, 60), PerformanceEvent::off(500, 60)]
        );
    }

    #[test]
    fn pause_excludes_wall_time() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(100).press(64);
        rig.at(200).pause_recording();
        rig.at(1_200).resume_recording();
        rig.at(1_300).release(64);

        let saved = rig.at(1_400).stop_recording().unwrap();
        assert_eq!(
            saved.events,
            vec![PerformanceEvent::on(100, 64), PerformanceEvent::off(300, 64)]
        );
    }

    #[test]
    fn ceiling_finalizes_the_session() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(1_000).press(60);
        rig.at(2_000).release(60);
        rig.at(14_000).press(62);

        assert_eq!(rig.studio.next_deadline_ms(), Some(15_000));
        rig.at(15_000).tick();

        let notices = rig.studio.drain_notices();
        assert!(notices.contains(&Notice::CeilingReached));
        assert_eq!(rig.studio.recorder_status().state, RecorderState::Idle);

        // Nothing past the boundary makes it in
        rig.at(15_100).release(62);
        rig.at(15_200).press(65);

        let stored = rig.studio.performances().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            stored[0].events,
            vec![PerformanceEvent::on(1_000, 60), PerformanceEvent::off(2_000, 60)]
        );
    }

    #[test]
    fn ceiling_is_checked_before_input_too() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(10).press(60);
        rig.at(20).release(60);

        // No tick in between: the next press finalizes first
        rig.at(16_000).press(67);

        assert_eq!(rig.studio.recorder_status().state, RecorderState::Idle);
        let stored = rig.studio.performances().unwrap();
        assert_eq!(stored[0].events.len(), 2);
    }

    #[test]
    fn paused_session_does_not_hit_the_ceiling() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(5_000).pause_recording();

        assert_eq!(rig.studio.next_deadline_ms(), None);
        rig.at(60_000).tick();

        let status = rig.studio.recorder_status();
        assert_eq!(status.state, RecorderState::Paused);
        assert_eq!(status.remaining_ms, 10_000);
    }

    #[test]
    fn dangling_press_is_trimmed_on_save() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        let saved = rig.at(400).stop_recording().unwrap();

        assert!(saved.events.is_empty());
        let stored = rig.studio.performance(saved.id).unwrap().unwrap();
        assert!(stored.events.is_empty());
    }

    #[test]
    fn empty_session_saves_nothing() {
        let mut rig = rig();
        rig.at(0).start_recording();
        assert!(rig.at(1_000).stop_recording().is_none());
        assert!(rig.studio.performances().unwrap().is_empty());
    }

    #[test]
    fn names_and_ids_follow_the_archive() {
        let mut rig = rig();
        let mut ids = Vec::new();
        for round in 0..3u64 {
            let t = round * 1_000;
            rig.at(t).start_recording();
            rig.at(t).press(60);
            rig.at(t + 100).release(60);
            ids.push(rig.at(t + 200).stop_recording().unwrap());
        }

        let names: Vec<&str> = ids.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["User Mix 1", "User Mix 2", "User Mix 3"]);
        assert!(ids[0].id < ids[1].id && ids[1].id < ids[2].id);
    }

    #[test]
    fn playing_the_same_performance_twice_toggles() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(500).release(60);
        let saved = rig.at(600).stop_recording().unwrap();

        let asset = AssetId::Performance(saved.id);
        assert_eq!(rig.at(1_000).play_performance(saved.id).unwrap(), PlayOutcome::Started);
        assert_eq!(rig.studio.active_asset(PlaybackSlot::Archive), Some(asset));

        assert_eq!(
            rig.at(1_010).play_performance(saved.id).unwrap(),
            PlayOutcome::ToggledOff
        );
        assert_eq!(rig.studio.active_asset(PlaybackSlot::Archive), None);
    }

    #[test]
    fn performance_playback_runs_on_tick() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(500).release(60);
        let saved = rig.at(600).stop_recording().unwrap();
        let held_before = rig.synth.log.borrow().started.len();

        rig.at(10_000).play_performance(saved.id).unwrap();
        rig.at(10_000).tick();
        assert!(rig.highlights.is_lit(60));
        assert_eq!(rig.synth.log.borrow().started.len(), held_before + 1);

        rig.at(10_500).tick();
        assert!(!rig.highlights.is_lit(60));

        assert_eq!(rig.studio.next_deadline_ms(), Some(11_000));
        rig.at(11_000).tick();
        assert_eq!(rig.studio.active_asset(PlaybackSlot::Archive), None);
    }

    #[test]
    fn library_and_archive_slots_are_independent() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(100).release(60);
        let saved = rig.at(200).stop_recording().unwrap();

        let catalog = Catalog::builtin();
        let motif = catalog.get("SonicRing").unwrap();

        rig.at(1_000).play_motif(motif);
        rig.at(1_000).play_performance(saved.id).unwrap();

        assert!(rig.studio.active_asset(PlaybackSlot::Library).is_some());
        assert!(rig.studio.active_asset(PlaybackSlot::Archive).is_some());

        assert_eq!(rig.at(1_050).play_motif(motif), PlayOutcome::ToggledOff);
        assert!(rig.studio.active_asset(PlaybackSlot::Archive).is_some());
    }

    #[test]
    fn composed_motif_replaces_previous_composition() {
        let mut rig = rig();
        assert_eq!(rig.at(0).play_composed(&[0, 3, 7]), PlayOutcome::Started);
        rig.at(0).tick();
        assert_eq!(rig.at(50).play_composed(&[0, 4, 7]), PlayOutcome::Started);

        rig.at(2_000).tick();
        // Base pitch 55: first composition got one note out before the switch
        assert_eq!(rig.synth.started_pitches(), vec![55, 55, 59, 62]);
    }

    #[test]
    fn out_of_range_composition_never_reaches_the_synth() {
        let mut rig = rig();
        assert!(crate::advisor::parse_offsets("[0, 2147483647]").is_err());

        // Called directly, extreme offsets saturate instead of overflowing
        assert_eq!(
            rig.at(0).play_composed(&[0, PitchId::MAX]),
            PlayOutcome::Started
        );
        rig.at(1_000).tick();
        assert_eq!(rig.synth.started_pitches(), vec![55, PitchId::MAX]);
    }

    #[test]
    fn deleting_a_playing_performance_stops_it() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(100).release(60);
        let saved = rig.at(200).stop_recording().unwrap();

        rig.at(1_000).play_performance(saved.id).unwrap();
        assert!(rig.at(1_000).delete_performance(saved.id).unwrap());

        assert_eq!(rig.studio.active_asset(PlaybackSlot::Archive), None);
        assert!(matches!(
            rig.at(1_100).play_performance(saved.id),
            Err(StudioError::NotFound(_))
        ));
    }

    struct FixedReply(String);

    impl AdvisorTransport for FixedReply {
        fn post_json(&self, _url: &str, _body: &str) -> Result<String, AdvisorError> {
            Ok(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": self.0 }] } }]
            })
            .to_string())
        }
    }

    fn advisor(reply: &str) -> Advisor<FixedReply> {
        Advisor::new(
            AdvisorSettings::default().with_api_key("test"),
            FixedReply(reply.to_string()),
        )
    }

    #[test]
    fn malformed_advisor_reply_changes_nothing() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(100).release(60);
        let saved = rig.at(200).stop_recording().unwrap();

        let before = serde_json::to_string(&rig.studio.performance(saved.id).unwrap()).unwrap();
        let err = rig
            .studio
            .describe_performance(saved.id, &advisor("just a cool name"))
            .unwrap_err();
        assert!(matches!(err, StudioError::Advisor(e) if e.is_unavailable()));

        let after = serde_json::to_string(&rig.studio.performance(saved.id).unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn advisor_annotation_renames_the_performance() {
        let mut rig = rig();
        rig.at(0).start_recording();
        rig.at(0).press(60);
        rig.at(100).release(60);
        let saved = rig.at(200).stop_recording().unwrap();

        let updated = rig
            .studio
            .describe_performance(saved.id, &advisor("Name: Velvet Ping | Analysis: quiet single note"))
            .unwrap();

        assert_eq!(updated.display_name, "Velvet Ping");
        assert_eq!(updated.annotation.unwrap().mood, "quiet single note");
    }

    #[test]
    fn hold_time_runs_from_the_press() {
        let mut rig = rig();
        rig.at(100).press(60);
        rig.at(850);

        assert_eq!(rig.studio.held_for_ms(60), Some(750));
        assert_eq!(rig.studio.held_for_ms(62), None);

        rig.at(900).release(60);
        assert_eq!(rig.studio.held_for_ms(60), None);
    }

    #[test]
    fn shutdown_releases_held_keys() {
        let mut rig = rig();
        rig.at(0).press(60);
        rig.at(0).press(64);
        rig.at(10).shutdown();

        assert!(rig.studio.held_pitches().is_empty());
        assert!(rig.highlights.snapshot().is_empty());
        assert_eq!(rig.synth.log.borrow().stopped.len(), 2);
        assert_eq!(rig.synth.log.borrow().stop_all_calls, 1);
    }
}
