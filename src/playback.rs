//! Playback scheduler - replays an event log with its recorded timing
//!
//! `play` turns the log into cues and schedules every cue at its offset from
//! one "now" anchor, plus a finish marker after the last one. Nothing is ever
//! unscheduled. Each deferred action carries the token of the playback that
//! scheduled it and does nothing if that playback is no longer the active
//! one when it fires. Stopping is just clearing the active playback.
//!
//! Single-flight: one scheduler serves one UI slot. Playing the asset that
//! is already active stops it (toggle); playing another asset stops the
//! current one first.
//!
//! Replayed notes are timed voices that release on their own. When a press
//! in the log has a matching release, that release stops the voice early,
//! so a recorded performance keeps the length of every held note.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use tracing::debug;

use crate::{
    performance::{EventKind, PerformanceEvent},
    surface::HighlightSink,
    synth::{PitchId, PlayMode, Synthesizer, VoiceHandle},
    timeline::Timeline,
};

/// Identity of a playable asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetId {
    /// Library motif, by catalog id.
    Motif(String),
    /// Archived performance, by id.
    Performance(u64),
    /// Motif composed on demand by the advisor.
    Composed,
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Motif(id) => write!(f, "motif:{id}"),
            AssetId::Performance(id) => write!(f, "performance:{id}"),
            AssetId::Composed => write!(f, "composed"),
        }
    }
}

/// UI slot a scheduler serves. Each slot plays at most one asset at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackSlot {
    Library,
    Archive,
}

pub type PlaybackToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    ToggledOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Cue(usize),
    Finish,
    FlashOff(PitchId),
}

/// Timeline entry produced by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub slot: PlaybackSlot,
    pub token: PlaybackToken,
    pub action: PlaybackAction,
}

/// What a scheduler needs from the engine while it runs.
pub struct PlaybackCtx<'a> {
    pub now_ms: u64,
    pub synth: &'a mut dyn Synthesizer,
    pub highlights: &'a mut dyn HighlightSink,
    pub timeline: &'a mut Timeline<Deferred>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CueKind {
    /// Start a voice; `pair` is set when a later release belongs to it.
    Start { pair: Option<usize> },
    Release { pair: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cue {
    offset_ms: u64,
    pitch: PitchId,
    kind: CueKind,
}

/// Turn an event log into cues, pairing each release with the earliest open
/// press of the same pitch. Releases without a press are dropped.
fn build_cues(events: &[PerformanceEvent]) -> (Vec<Cue>, usize) {
    let mut cues = Vec::with_capacity(events.len());
    let mut open: HashMap<PitchId, VecDeque<usize>> = HashMap::new();
    let mut pairs = 0;

    for event in events {
        match event.kind {
            EventKind::On => {
                open.entry(event.pitch).or_default().push_back(cues.len());
                cues.push(Cue {
                    offset_ms: event.offset_ms,
                    pitch: event.pitch,
                    kind: CueKind::Start { pair: None },
                });
            }
            EventKind::Off => {
                let Some(start_idx) = open.get_mut(&event.pitch).and_then(|q| q.pop_front()) else {
                    continue;
                };
                cues[start_idx].kind = CueKind::Start { pair: Some(pairs) };
                cues.push(Cue {
                    offset_ms: event.offset_ms,
                    pitch: event.pitch,
                    kind: CueKind::Release { pair: pairs },
                });
                pairs += 1;
            }
        }
    }

    (cues, pairs)
}

/// A library motif as an event log: one press every `spacing_ms`.
pub fn motif_events(offsets: &[i32], base_pitch: PitchId, spacing_ms: u64) -> Vec<PerformanceEvent> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, &offset)| {
            PerformanceEvent::on(i as u64 * spacing_ms, base_pitch.saturating_add(offset))
        })
        .collect()
}

struct ActivePlayback {
    asset: AssetId,
    token: PlaybackToken,
    cues: Vec<Cue>,
    note_ms: u32,
    /// Every voice started so far, for cancellation
    voices: Vec<VoiceHandle>,
    /// Voices waiting for their paired release
    paired: Vec<Option<VoiceHandle>>,
    lit: BTreeSet<PitchId>,
}

pub struct PlaybackScheduler {
    slot: PlaybackSlot,
    active: Option<ActivePlayback>,
    next_token: PlaybackToken,
    flash_ms: u64,
    trailing_margin_ms: u64,
}

impl PlaybackScheduler {
    pub fn new(slot: PlaybackSlot, flash_ms: u64, trailing_margin_ms: u64) -> Self {
        Self {
            slot,
            active: None,
            next_token: 1,
            flash_ms,
            trailing_margin_ms,
        }
    }

    pub fn slot(&self) -> PlaybackSlot {
        self.slot
    }

    pub fn active_asset(&self) -> Option<&AssetId> {
        self.active.as_ref().map(|a| &a.asset)
    }

    pub fn is_active(&self, asset: &AssetId) -> bool {
        self.active_asset() == Some(asset)
    }

    /// Start replaying `events`, or stop if `asset` is already playing.
    ///
    /// Every replayed press becomes a timed voice of `note_ms`.
    pub fn play(
        &mut self,
        asset: AssetId,
        events: &[PerformanceEvent],
        note_ms: u32,
        ctx: &mut PlaybackCtx<'_>,
    ) -> PlayOutcome {
        if self.is_active(&asset) {
            self.stop_active(ctx);
            return PlayOutcome::ToggledOff;
        }
        self.stop_active(ctx);

        let token = self.next_token;
        self.next_token += 1;

        let (cues, pairs) = build_cues(events);
        for (index, cue) in cues.iter().enumerate() {
            ctx.timeline.schedule(
                ctx.now_ms + cue.offset_ms,
                Deferred {
                    slot: self.slot,
                    token,
                    action: PlaybackAction::Cue(index),
                },
            );
        }

        let last_offset = events.last().map_or(0, |e| e.offset_ms);
        ctx.timeline.schedule(
            ctx.now_ms + last_offset + self.trailing_margin_ms,
            Deferred {
                slot: self.slot,
                token,
                action: PlaybackAction::Finish,
            },
        );

        debug!(slot = ?self.slot, %asset, cues = cues.len(), "playback started");
        self.active = Some(ActivePlayback {
            asset,
            token,
            cues,
            note_ms,
            voices: Vec::new(),
            paired: vec![None; pairs],
            lit: BTreeSet::new(),
        });

        PlayOutcome::Started
    }

    /// Run a deferred action. Stale actions are ignored.
    pub fn fire(&mut self, deferred: Deferred, ctx: &mut PlaybackCtx<'_>) {
        let flash_ms = self.flash_ms;
        let slot = self.slot;

        let Some(active) = self.active.as_mut() else {
            return;
        };
        if deferred.slot != slot || active.token != deferred.token {
            return;
        }

        match deferred.action {
            PlaybackAction::Cue(index) => {
                let Some(cue) = active.cues.get(index).copied() else {
                    return;
                };
                match cue.kind {
                    CueKind::Start { pair } => {
                        let handle = ctx.synth.play(
                            cue.pitch,
                            PlayMode::Timed {
                                hold_ms: active.note_ms,
                            },
                        );
                        active.voices.push(handle);

                        if active.lit.insert(cue.pitch) {
                            ctx.highlights.highlight(cue.pitch, true);
                        }

                        match pair {
                            Some(pair) => active.paired[pair] = Some(handle),
                            None => ctx.timeline.schedule(
                                ctx.now_ms + flash_ms,
                                Deferred {
                                    slot,
                                    token: active.token,
                                    action: PlaybackAction::FlashOff(cue.pitch),
                                },
                            ),
                        }
                    }
                    CueKind::Release { pair } => {
                        if let Some(handle) = active.paired[pair].take() {
                            ctx.synth.stop(handle);
                        }
                        if active.lit.remove(&cue.pitch) {
                            ctx.highlights.highlight(cue.pitch, false);
                        }
                    }
                }
            }

            PlaybackAction::FlashOff(pitch) => {
                if active.lit.remove(&pitch) {
                    ctx.highlights.highlight(pitch, false);
                }
            }

            PlaybackAction::Finish => {
                // Voices are timed and fade out by themselves
                for pitch in std::mem::take(&mut active.lit) {
                    ctx.highlights.highlight(pitch, false);
                }
                debug!(slot = ?slot, asset = %active.asset, "playback finished");
                self.active = None;
            }
        }
    }

    /// Stop `asset` if it is the active playback.
    pub fn stop(&mut self, asset: &AssetId, ctx: &mut PlaybackCtx<'_>) -> bool {
        if self.is_active(asset) {
            self.stop_active(ctx)
        } else {
            false
        }
    }

    /// Stop whatever is playing: clear the marker, stop every voice started so
    /// far and turn off the highlights this playback turned on.
    pub fn stop_active(&mut self, ctx: &mut PlaybackCtx<'_>) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        for handle in active.voices {
            ctx.synth.stop(handle);
        }
        for pitch in active.lit {
            ctx.highlights.highlight(pitch, false);
        }

        debug!(slot = ?self.slot, asset = %active.asset, "playback stopped");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{surface::Highlights, testing::FakeSynth};

    const NOTE_MS: u32 = 1_500;

    struct Rig {
        synth: FakeSynth,
        highlights: Highlights,
        timeline: Timeline<Deferred>,
        scheduler: PlaybackScheduler,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                synth: FakeSynth::default(),
                highlights: Highlights::new(),
                timeline: Timeline::new(),
                scheduler: PlaybackScheduler::new(PlaybackSlot::Archive, 150, 500),
            }
        }

        fn play(&mut self, asset: AssetId, events: &[PerformanceEvent], now_ms: u64) -> PlayOutcome {
            let mut ctx = PlaybackCtx {
                now_ms,
                synth: &mut self.synth,
                highlights: &mut self.highlights,
                timeline: &mut self.timeline,
            };
            self.scheduler.play(asset, events, NOTE_MS, &mut ctx)
        }

        fn stop(&mut self, now_ms: u64) -> bool {
            let mut ctx = PlaybackCtx {
                now_ms,
                synth: &mut self.synth,
                highlights: &mut self.highlights,
                timeline: &mut self.timeline,
            };
            self.scheduler.stop_active(&mut ctx)
        }

        /// Fire everything due up to `now_ms`, in order.
        fn run_until(&mut self, now_ms: u64) {
            while let Some(due) = self.timeline.next_due() {
                if due > now_ms {
                    break;
                }
                let deferred = self.timeline.pop_due(due).unwrap();
                let mut ctx = PlaybackCtx {
                    now_ms: due,
                    synth: &mut self.synth,
                    highlights: &mut self.highlights,
                    timeline: &mut self.timeline,
                };
                self.scheduler.fire(deferred, &mut ctx);
            }
        }
    }

    fn take() -> Vec<PerformanceEvent> {
        vec![
            PerformanceEvent::on(0, 60),
            PerformanceEvent::on(100, 64),
            PerformanceEvent::off(400, 60),
            PerformanceEvent::off(600, 64),
        ]
    }

    #[test]
    fn same_asset_twice_toggles_off() {
        let mut rig = Rig::new();
        let asset = AssetId::Performance(7);

        assert_eq!(rig.play(asset.clone(), &take(), 0), PlayOutcome::Started);
        assert!(rig.scheduler.is_active(&asset));

        assert_eq!(rig.play(asset.clone(), &take(), 10), PlayOutcome::ToggledOff);
        assert!(rig.scheduler.active_asset().is_none());

        // Stale timers from the cancelled playback do nothing
        rig.run_until(10_000);
        assert!(rig.synth.log.borrow().started.is_empty());
    }

    #[test]
    fn notes_fire_at_their_offsets() {
        let mut rig = Rig::new();
        rig.play(AssetId::Performance(1), &take(), 1_000);

        rig.run_until(1_099);
        assert_eq!(rig.synth.started_pitches(), vec![60]);

        rig.run_until(1_100);
        assert_eq!(rig.synth.started_pitches(), vec![60, 64]);

        let started = rig.synth.log.borrow().started.clone();
        assert!(started
            .iter()
            .all(|(_, _, mode)| *mode == PlayMode::Timed { hold_ms: NOTE_MS }));
    }

    #[test]
    fn paired_release_stops_its_voice_early() {
        let mut rig = Rig::new();
        rig.play(AssetId::Performance(1), &take(), 0);

        rig.run_until(399);
        assert!(rig.synth.log.borrow().stopped.is_empty());

        rig.run_until(400);
        let first_voice = rig.synth.log.borrow().started[0].0;
        assert_eq!(rig.synth.log.borrow().stopped, vec![first_voice]);
        assert_eq!(rig.highlights.snapshot(), vec![64]);

        rig.run_until(600);
        assert_eq!(rig.synth.log.borrow().stopped.len(), 2);
        assert!(rig.highlights.snapshot().is_empty());
    }

    #[test]
    fn finish_clears_the_active_marker() {
        let mut rig = Rig::new();
        let asset = AssetId::Performance(3);
        rig.play(asset.clone(), &take(), 0);

        rig.run_until(1_099);
        assert!(rig.scheduler.is_active(&asset));

        rig.run_until(1_100);
        assert!(!rig.scheduler.is_active(&asset));

        // Playing again afterwards starts fresh instead of toggling
        assert_eq!(rig.play(asset, &take(), 2_000), PlayOutcome::Started);
    }

    #[test]
    fn switching_assets_stops_previous_voices() {
        let mut rig = Rig::new();
        rig.play(AssetId::Performance(1), &take(), 0);
        rig.run_until(150);
        assert_eq!(rig.synth.log.borrow().started.len(), 2);

        let next = motif_events(&[0, 4, 7], 55, 200);
        assert_eq!(
            rig.play(AssetId::Motif("SonicRing".into()), &next, 150),
            PlayOutcome::Started
        );

        assert_eq!(rig.synth.log.borrow().stopped.len(), 2);
        assert!(rig.highlights.snapshot().is_empty());

        rig.run_until(10_000);
        // Only the motif notes were added after the switch
        assert_eq!(rig.synth.started_pitches(), vec![60, 64, 55, 59, 62]);
    }

    #[test]
    fn motif_notes_flash_briefly() {
        let mut rig = Rig::new();
        rig.play(AssetId::Composed, &motif_events(&[0, 12], 55, 200), 0);

        rig.run_until(0);
        assert_eq!(rig.highlights.snapshot(), vec![55]);

        rig.run_until(149);
        assert_eq!(rig.highlights.snapshot(), vec![55]);

        rig.run_until(150);
        assert!(rig.highlights.snapshot().is_empty());

        rig.run_until(200);
        assert_eq!(rig.highlights.snapshot(), vec![67]);
    }

    #[test]
    fn explicit_stop_cancels_pending_cues() {
        let mut rig = Rig::new();
        rig.play(AssetId::Performance(1), &take(), 0);
        rig.run_until(0);

        assert!(rig.stop(50));
        assert!(!rig.stop(60));

        rig.run_until(10_000);
        assert_eq!(rig.synth.started_pitches(), vec![60]);
        assert!(rig.highlights.snapshot().is_empty());
    }

    #[test]
    fn simultaneous_events_keep_log_order() {
        let mut rig = Rig::new();
        let chord = vec![
            PerformanceEvent::on(0, 67),
            PerformanceEvent::on(0, 60),
            PerformanceEvent::on(0, 64),
        ];
        rig.play(AssetId::Performance(2), &chord, 0);
        rig.run_until(0);

        assert_eq!(rig.synth.started_pitches(), vec![67, 60, 64]);
    }

    #[test]
    fn motif_events_are_evenly_spaced() {
        let events = motif_events(&[0, 5, 12], 55, 200);
        assert_eq!(
            events,
            vec![
                PerformanceEvent::on(0, 55),
                PerformanceEvent::on(200, 60),
                PerformanceEvent::on(400, 67),
            ]
        );
    }

    #[test]
    fn motif_pitches_saturate_instead_of_overflowing() {
        let events = motif_events(&[0, i32::MAX, i32::MIN], 55, 200);
        let pitches: Vec<_> = events.iter().map(|e| e.pitch).collect();
        assert_eq!(pitches, vec![55, i32::MAX, i32::MIN + 55]);
    }

    #[test]
    fn unmatched_release_is_skipped() {
        let (cues, pairs) = build_cues(&[
            PerformanceEvent::off(0, 60),
            PerformanceEvent::on(10, 60),
        ]);

        assert_eq!(pairs, 0);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].kind, CueKind::Start { pair: None });
    }
}
