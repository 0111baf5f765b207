//! Interaction Clock
//!
//! Tracks when the user last interacted with the agent. Engine time is a
//! millisecond counter supplied by the host; the clock never goes backwards.

/// Time-since-last-interaction tracker
#[derive(Clone, Copy, Debug, Default)]
pub struct InteractionClock {
    last_interaction_ms: u64,
}

impl InteractionClock {
    /// Create a clock whose last interaction is `now_ms`
    #[must_use]
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_interaction_ms: now_ms,
        }
    }

    /// Record an interaction at `now_ms`
    pub fn record(&mut self, now_ms: u64) {
        self.last_interaction_ms = self.last_interaction_ms.max(now_ms);
    }

    /// Timestamp of the most recent interaction
    #[must_use]
    pub fn last_interaction_ms(&self) -> u64 {
        self.last_interaction_ms
    }

    /// Milliseconds since the last interaction
    #[must_use]
    pub fn idle_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_interaction_ms)
    }

    /// Whether `now_ms` still falls inside the post-interaction cooldown
    ///
    /// Behavior may only start once strictly more than `cooldown_ms` has passed.
    #[must_use]
    pub fn in_cooldown(&self, now_ms: u64, cooldown_ms: u64) -> bool {
        self.idle_for(now_ms) <= cooldown_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_for_and_cooldown() {
        let mut clock = InteractionClock::new(0);
        assert!(clock.in_cooldown(5000, 5000));
        assert!(!clock.in_cooldown(5001, 5000));

        clock.record(10_000);
        assert_eq!(clock.idle_for(12_500), 2500);
        assert!(clock.in_cooldown(12_500, 5000));
    }

    #[test]
    fn test_record_is_monotonic() {
        let mut clock = InteractionClock::new(0);
        clock.record(9000);
        clock.record(4000);
        assert_eq!(clock.last_interaction_ms(), 9000);
        assert_eq!(clock.idle_for(1000), 0);
    }
}
