//! Callbacks from the engine to the input surface.
//!
//! The engine never looks inside the surface. It only reports which pitches
//! should be shown as lit.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::synth::PitchId;

/// Receives highlight on/off notifications for pitches.
pub trait HighlightSink {
    fn highlight(&mut self, pitch: PitchId, on: bool);
}

/// Sink that ignores all highlights.
pub struct NoHighlights;

impl HighlightSink for NoHighlights {
    fn highlight(&mut self, _pitch: PitchId, _on: bool) {}
}

/// Shared set of lit pitches. Clones share state, so the surface can keep one
/// clone for drawing while the engine owns another.
///
/// Lights are counted: a pitch held by hand and flashed by playback at the
/// same time stays lit until both turn it off.
#[derive(Clone, Default)]
pub struct Highlights {
    lit: Rc<RefCell<BTreeMap<PitchId, u32>>>,
}

impl Highlights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_lit(&self, pitch: PitchId) -> bool {
        self.lit.borrow().contains_key(&pitch)
    }

    /// Lit pitches, ascending.
    pub fn snapshot(&self) -> Vec<PitchId> {
        self.lit.borrow().keys().copied().collect()
    }
}

impl HighlightSink for Highlights {
    fn highlight(&mut self, pitch: PitchId, on: bool) {
        let mut lit = self.lit.borrow_mut();
        if on {
            *lit.entry(pitch).or_insert(0) += 1;
        } else if let Some(count) = lit.get_mut(&pitch) {
            *count -= 1;
            if *count == 0 {
                lit.remove(&pitch);
            }
        }
    }
}
