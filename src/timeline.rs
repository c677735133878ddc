//! Timeline - single-threaded queue of deferred actions
//!
//! Everything that happens "later" in the engine (a replayed note, the end
//! of a playback, a highlight flash turning off) is pushed here with an
//! absolute due time and drained by the engine's tick.
//!
//! Entries are never cancelled. An action that may go stale carries its own
//! liveness token and the code handling it checks that token when it fires.
//!
//! Ordering: entries come out by due time; entries with the same due time
//! come out in the order they were scheduled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Entry<T> {
    due_ms: u64,
    seq: u64,
    action: T,
}

impl<T> Entry<T> {
    fn key(&self) -> (u64, u64) {
        (self.due_ms, self.seq)
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Queue of actions keyed by absolute due time in milliseconds.
pub struct Timeline<T> {
    queue: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `action` to become due at `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, action: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry {
            due_ms,
            seq,
            action,
        }));
    }

    /// Pop the earliest action whose due time is `<= now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<T> {
        let due = self.queue.peek().is_some_and(|Reverse(e)| e.due_ms <= now_ms);
        if due {
            self.queue.pop().map(|Reverse(e)| e.action)
        } else {
            None
        }
    }

    /// Due time of the earliest pending action.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(e)| e.due_ms)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(timeline: &mut Timeline<&'static str>, now: u64) -> Vec<&'static str> {
        std::iter::from_fn(|| timeline.pop_due(now)).collect()
    }

    #[test]
    fn pops_in_due_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(300, "c");
        timeline.schedule(100, "a");
        timeline.schedule(200, "b");

        assert_eq!(drain(&mut timeline, 1_000), vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_schedule_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(50, "first");
        timeline.schedule(50, "second");
        timeline.schedule(0, "zero");
        timeline.schedule(50, "third");

        assert_eq!(
            drain(&mut timeline, 50),
            vec!["zero", "first", "second", "third"]
        );
    }

    #[test]
    fn future_actions_stay_queued() {
        let mut timeline = Timeline::new();
        timeline.schedule(10, "now");
        timeline.schedule(500, "later");

        assert_eq!(drain(&mut timeline, 100), vec!["now"]);
        assert_eq!(timeline.next_due(), Some(500));
        assert_eq!(timeline.len(), 1);

        assert_eq!(drain(&mut timeline, 499), Vec::<&str>::new());
        assert_eq!(drain(&mut timeline, 500), vec!["later"]);
        assert!(timeline.is_empty());
    }
}
