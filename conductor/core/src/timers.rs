//! Virtual-Time Timer Queue
//!
//! Every timer, poll and loop in the engine is an entry in one deadline-ordered
//! queue owned by the conductor. The host drives time forward; due entries are
//! popped one at a time in `(deadline, id)` order, so two timers armed for the
//! same instant fire in the order they were armed.
//!
//! Cancelling an entry removes it outright. Callbacks still re-check the state
//! they were armed for, because an entry may already have been popped when a
//! transition happens inside the same dispatch.

use std::collections::{BTreeMap, HashMap};

use crate::animation::MoveId;
use crate::behavior::BehaviorTimer;
use crate::sleep::SleepTimer;
use crate::tutorial::TutorialTimer;

/// Handle for a scheduled timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer does when it fires, routed to the owning component
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Next animation frame for a move
    AnimationFrame(MoveId),
    /// Behavior scheduler loops
    Behavior(BehaviorTimer),
    /// Sleep/wake poll and transitions
    Sleep(SleepTimer),
    /// Tutorial step timers and polls
    Tutorial(TutorialTimer),
}

/// A timer popped from the queue
#[derive(Clone, Copy, Debug)]
pub struct DueTimer {
    /// Timer handle
    pub id: TimerId,
    /// Deadline it was armed for
    pub deadline_ms: u64,
    /// Routing payload
    pub kind: TimerKind,
}

/// Deadline-ordered, cancellable timer queue
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<(u64, TimerId), TimerKind>,
    deadlines: HashMap<TimerId, u64>,
    next_id: u64,
}

impl TimerQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for an absolute deadline
    pub fn schedule(&mut self, deadline_ms: u64, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((deadline_ms, id), kind);
        self.deadlines.insert(id, deadline_ms);
        id
    }

    /// Cancel a timer; returns whether it was still pending
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.entries.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Cancel the timer held in `slot` (if any) and empty the slot
    pub fn clear(&mut self, slot: &mut Option<TimerId>) {
        if let Some(id) = slot.take() {
            self.cancel(id);
        }
    }

    /// Earliest pending deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer whose deadline is at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<DueTimer> {
        let (&(deadline_ms, id), _) = self.entries.iter().next()?;
        if deadline_ms > now_ms {
            return None;
        }
        let kind = self.entries.remove(&(deadline_ms, id))?;
        self.deadlines.remove(&id);
        Some(DueTimer {
            id,
            deadline_ms,
            kind,
        })
    }

    /// Number of pending timers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timers are pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> TimerKind {
        TimerKind::Sleep(SleepTimer::Poll)
    }

    #[test]
    fn test_pops_in_deadline_then_arm_order() {
        let mut q = TimerQueue::new();
        let late = q.schedule(200, poll());
        let first = q.schedule(100, poll());
        let second = q.schedule(100, TimerKind::Sleep(SleepTimer::FallAsleep));

        assert_eq!(q.next_deadline(), Some(100));
        assert_eq!(q.pop_due(50).map(|t| t.id), None);
        assert_eq!(q.pop_due(150).map(|t| t.id), Some(first));
        assert_eq!(q.pop_due(150).map(|t| t.id), Some(second));
        assert_eq!(q.pop_due(150).map(|t| t.id), None);
        assert_eq!(q.pop_due(200).map(|t| t.id), Some(late));
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut q = TimerQueue::new();
        let a = q.schedule(10, poll());
        let mut slot = Some(q.schedule(20, poll()));

        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.len(), 1);

        q.clear(&mut slot);
        assert!(slot.is_none());
        assert_eq!(q.len(), 0);
        assert_eq!(q.pop_due(1000).map(|t| t.id), None);
    }
}
