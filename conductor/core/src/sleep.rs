//! Sleep/Wake Cycle
//!
//! ```text
//!          60 s idle          5 s
//! Awake ───────────► Dozing ─────► Asleep
//!   ▲                  │             │
//!   │   1 s            │ interaction │
//!   └──── Startled ◄───┴─────────────┘
//! ```
//!
//! Startled is transient and ignores further interaction until it settles.
//! Every timer re-checks the phase it was armed for before acting.

use serde::{Deserialize, Serialize};

use crate::avatar::Mood;
use crate::context::AgentContext;
use crate::timers::{TimerId, TimerKind};

/// Sleep phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SleepPhase {
    /// Normal operation
    #[default]
    Awake,
    /// Drifting off; falls asleep unless disturbed
    Dozing,
    /// Asleep until the user interacts
    Asleep,
    /// Just woken up
    Startled,
}

/// Sleep cycle timers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepTimer {
    /// Periodic inactivity check
    Poll,
    /// Dozing turns into sleep
    FallAsleep,
    /// Startle settles back to awake
    Settle,
}

/// Sleep/wake state machine
#[derive(Debug, Default)]
pub struct SleepCycle {
    phase: SleepPhase,
    poll_timer: Option<TimerId>,
    fall_asleep_timer: Option<TimerId>,
    settle_timer: Option<TimerId>,
}

impl SleepCycle {
    /// Create an awake cycle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> SleepPhase {
        self.phase
    }

    /// Arm the inactivity poll
    pub fn start(&mut self, ctx: &mut AgentContext) {
        self.schedule_poll(ctx);
    }

    fn schedule_poll(&mut self, ctx: &mut AgentContext) {
        let interval = ctx.config().sleep.poll_interval_ms;
        ctx.cancel(&mut self.poll_timer);
        self.poll_timer = Some(ctx.schedule_in(interval, TimerKind::Sleep(SleepTimer::Poll)));
    }

    fn enter(&mut self, ctx: &mut AgentContext, phase: SleepPhase, mood: Mood) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Sleep phase transition");
        self.phase = phase;
        ctx.set_mood(mood, Some("sleep"));
    }

    /// Handle a sleep timer
    pub fn on_timer(
        &mut self,
        ctx: &mut AgentContext,
        id: TimerId,
        timer: SleepTimer,
        tutorial_active: bool,
    ) {
        match timer {
            SleepTimer::Poll => {
                if self.poll_timer != Some(id) {
                    return;
                }
                self.poll_timer = None;
                let idle_for = ctx.interaction().idle_for(ctx.now_ms());
                let doze_after = ctx.config().sleep.doze_after_ms;
                if self.phase == SleepPhase::Awake && !tutorial_active && idle_for >= doze_after {
                    self.enter(ctx, SleepPhase::Dozing, Mood::Dozing);
                    let delay = ctx.config().sleep.fall_asleep_ms;
                    ctx.cancel(&mut self.fall_asleep_timer);
                    self.fall_asleep_timer =
                        Some(ctx.schedule_in(delay, TimerKind::Sleep(SleepTimer::FallAsleep)));
                }
                self.schedule_poll(ctx);
            }
            SleepTimer::FallAsleep => {
                if self.fall_asleep_timer != Some(id) {
                    return;
                }
                self.fall_asleep_timer = None;
                if self.phase == SleepPhase::Dozing {
                    self.enter(ctx, SleepPhase::Asleep, Mood::Sleeping);
                }
            }
            SleepTimer::Settle => {
                if self.settle_timer != Some(id) {
                    return;
                }
                self.settle_timer = None;
                if self.phase == SleepPhase::Startled {
                    self.enter(ctx, SleepPhase::Awake, Mood::Idle);
                }
            }
        }
    }

    /// React to a user interaction
    ///
    /// Returns whether the agent was startled awake.
    pub fn on_interaction(&mut self, ctx: &mut AgentContext) -> bool {
        match self.phase {
            SleepPhase::Dozing | SleepPhase::Asleep => {
                ctx.cancel(&mut self.fall_asleep_timer);
                self.enter(ctx, SleepPhase::Startled, Mood::Startled);
                let delay = ctx.config().sleep.startle_ms;
                ctx.cancel(&mut self.settle_timer);
                self.settle_timer = Some(ctx.schedule_in(delay, TimerKind::Sleep(SleepTimer::Settle)));
                true
            }
            SleepPhase::Awake | SleepPhase::Startled => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConductorConfig;
    use crate::context::test_support::TestRig;
    use crate::timers::DueTimer;

    fn fire(rig: &mut TestRig, cycle: &mut SleepCycle, until: u64, tutorial_active: bool) {
        while let Some(DueTimer {
            id,
            deadline_ms,
            kind,
        }) = rig.ctx.pop_due(until)
        {
            rig.ctx.set_now(deadline_ms);
            if let TimerKind::Sleep(timer) = kind {
                cycle.on_timer(&mut rig.ctx, id, timer, tutorial_active);
            }
        }
        rig.ctx.set_now(until);
    }

    #[test]
    fn test_dozes_then_sleeps() {
        let mut rig = TestRig::new(ConductorConfig::default());
        let mut cycle = SleepCycle::new();
        cycle.start(&mut rig.ctx);

        fire(&mut rig, &mut cycle, 59_999, false);
        assert_eq!(cycle.phase(), SleepPhase::Awake);

        fire(&mut rig, &mut cycle, 60_000, false);
        assert_eq!(cycle.phase(), SleepPhase::Dozing);
        assert_eq!(rig.ctx.mood(), Mood::Dozing);

        fire(&mut rig, &mut cycle, 64_999, false);
        assert_eq!(cycle.phase(), SleepPhase::Dozing);

        fire(&mut rig, &mut cycle, 65_000, false);
        assert_eq!(cycle.phase(), SleepPhase::Asleep);
        assert_eq!(rig.ctx.mood(), Mood::Sleeping);
    }

    #[test]
    fn test_interaction_startles_once_then_settles() {
        let mut rig = TestRig::new(ConductorConfig::default());
        let mut cycle = SleepCycle::new();
        cycle.start(&mut rig.ctx);
        fire(&mut rig, &mut cycle, 62_000, false);
        assert_eq!(cycle.phase(), SleepPhase::Dozing);

        rig.ctx.record_interaction();
        assert!(cycle.on_interaction(&mut rig.ctx));
        assert!(!cycle.on_interaction(&mut rig.ctx));
        assert_eq!(cycle.phase(), SleepPhase::Startled);

        // The fall-asleep timer was disarmed by the startle
        fire(&mut rig, &mut cycle, 62_999, false);
        assert_eq!(cycle.phase(), SleepPhase::Startled);
        fire(&mut rig, &mut cycle, 63_000, false);
        assert_eq!(cycle.phase(), SleepPhase::Awake);
        assert_eq!(rig.ctx.mood(), Mood::Idle);

        fire(&mut rig, &mut cycle, 100_000, false);
        assert_eq!(cycle.phase(), SleepPhase::Awake);
    }

    #[test]
    fn test_no_doze_while_tutorial_runs() {
        let mut rig = TestRig::new(ConductorConfig::default());
        let mut cycle = SleepCycle::new();
        cycle.start(&mut rig.ctx);
        fire(&mut rig, &mut cycle, 300_000, true);
        assert_eq!(cycle.phase(), SleepPhase::Awake);
    }
}
