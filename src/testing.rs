//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::synth::{PitchId, PlayMode, Synthesizer, VoiceHandle};

#[derive(Debug, Default)]
pub struct SynthLog {
    pub started: Vec<(VoiceHandle, PitchId, PlayMode)>,
    pub stopped: Vec<VoiceHandle>,
    pub stop_all_calls: usize,
}

/// Synthesizer that records calls instead of making sound.
#[derive(Clone, Default)]
pub struct FakeSynth {
    pub log: Rc<RefCell<SynthLog>>,
    next_id: Rc<RefCell<u64>>,
}

impl FakeSynth {
    pub fn started_pitches(&self) -> Vec<PitchId> {
        self.log.borrow().started.iter().map(|(_, p, _)| *p).collect()
    }
}

impl Synthesizer for FakeSynth {
    fn play(&mut self, pitch: PitchId, mode: PlayMode) -> VoiceHandle {
        let mut next_id = self.next_id.borrow_mut();
        *next_id += 1;
        let handle = VoiceHandle::new(*next_id);
        self.log.borrow_mut().started.push((handle, pitch, mode));
        handle
    }

    fn stop(&mut self, handle: VoiceHandle) {
        self.log.borrow_mut().stopped.push(handle);
    }

    fn stop_all(&mut self) {
        self.log.borrow_mut().stop_all_calls += 1;
    }
}
