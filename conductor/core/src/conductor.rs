//! Conductor - The Owning Scheduler
//!
//! The Conductor owns the agent and everything that may drive it:
//! - The shared [`AgentContext`] (time, timers, animation, position, mood)
//! - The [`BehaviorScheduler`] (idle fidgets, attention seeking)
//! - The [`SleepCycle`] (doze, sleep, startle)
//! - The [`TutorialGuide`] (first-use walkthrough)
//!
//! # Design Philosophy
//!
//! The engine is synchronous and runs on virtual time. The host advances time
//! with [`Conductor::advance_to`] and delivers input with
//! [`Conductor::handle_event`]. Each timer fire and each event is dispatched to
//! exactly one orchestrator, one at a time, so the three state machines never
//! interleave. Moves that settle during a dispatch are delivered to their
//! owner only after the dispatch returns.
//!
//! The Conductor never reads the wall clock. The host supplies an epoch once
//! (see [`Host`]) and engine milliseconds are counted from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::animation::{FollowUp, MoveId, MoveOutcome};
use crate::avatar::Mood;
use crate::behavior::{BehaviorScheduler, Suppression};
use crate::config::ConductorConfig;
use crate::context::AgentContext;
use crate::events::AgentEvent;
use crate::geometry::Point;
use crate::messages::AgentMessage;
use crate::overlay::{Overlay, ScreenGeometry};
use crate::sleep::{SleepCycle, SleepPhase};
use crate::store::SettingsStore;
use crate::timers::{DueTimer, TimerKind};
use crate::tutorial::{TutorialGuide, TutorialProgress};

/// Host-side collaborators handed to the conductor
pub struct Host {
    /// Overlay window; `None` runs headless (moves resolve in place)
    pub overlay: Option<Box<dyn Overlay>>,
    /// Work area and cursor
    pub screen: Box<dyn ScreenGeometry>,
    /// Persisted settings
    pub store: Box<dyn SettingsStore>,
    /// Wall-clock time at engine time 0
    pub epoch: DateTime<Utc>,
}

impl Host {
    /// Host with an overlay window
    pub fn new(
        overlay: impl Overlay + 'static,
        screen: impl ScreenGeometry + 'static,
        store: impl SettingsStore + 'static,
        epoch: DateTime<Utc>,
    ) -> Self {
        Self {
            overlay: Some(Box::new(overlay)),
            screen: Box::new(screen),
            store: Box::new(store),
            epoch,
        }
    }

    /// Host without an overlay window
    pub fn headless(
        screen: impl ScreenGeometry + 'static,
        store: impl SettingsStore + 'static,
        epoch: DateTime<Utc>,
    ) -> Self {
        Self {
            overlay: None,
            screen: Box::new(screen),
            store: Box::new(store),
            epoch,
        }
    }
}

/// Point-in-time view of the engine, for hosts and diagnostics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConductorSnapshot {
    /// Engine time
    pub now_ms: u64,
    /// Agent position
    pub position: Point,
    /// Agent mood
    pub mood: Mood,
    /// Sleep phase
    pub sleep_phase: SleepPhase,
    /// Tutorial progress
    pub tutorial: TutorialProgress,
    /// Whether an idle behavior or approach is in flight
    pub behavior_busy: bool,
    /// Whether a move is in flight
    pub moving: bool,
}

/// The behavior engine
#[derive(Debug)]
pub struct Conductor {
    ctx: AgentContext,
    behavior: BehaviorScheduler,
    sleep: SleepCycle,
    tutorial: TutorialGuide,
    booted: bool,
}

impl Conductor {
    /// Create a conductor; nothing runs until [`Conductor::boot`]
    pub fn new(
        config: ConductorConfig,
        host: Host,
        tx: mpsc::UnboundedSender<AgentMessage>,
    ) -> Self {
        Self {
            ctx: AgentContext::new(config, host, tx),
            behavior: BehaviorScheduler::new(),
            sleep: SleepCycle::new(),
            tutorial: TutorialGuide::new(),
            booted: false,
        }
    }

    /// Arm the loops and decide whether to start, offer or skip the tutorial
    ///
    /// Calling it again is a no-op.
    pub fn boot(&mut self) {
        if self.booted {
            return;
        }
        self.booted = true;
        tracing::info!(
            profile = ?self.ctx.config().profile,
            x = self.ctx.position().x,
            y = self.ctx.position().y,
            "Conductor booting"
        );
        self.behavior.start(&mut self.ctx);
        self.sleep.start(&mut self.ctx);
        self.tutorial.boot(&mut self.ctx);
        self.drain_settled();
        self.run_due();
    }

    // ============================================
    // Time
    // ============================================

    /// Current engine time
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.ctx.now_ms()
    }

    /// Earliest pending timer deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.ctx.next_deadline()
    }

    /// Run every timer due up to `now_ms`, in deadline order
    ///
    /// Time moves to each deadline before its timer fires, so timers armed by
    /// a callback are measured from the instant that callback was due.
    /// Earlier times than the current engine time are ignored.
    pub fn advance_to(&mut self, now_ms: u64) {
        while let Some(due) = self.ctx.pop_due(now_ms) {
            self.ctx.set_now(due.deadline_ms);
            self.dispatch(due);
        }
        self.ctx.set_now(now_ms);
    }

    /// Advance engine time by `delta_ms`
    pub fn advance(&mut self, delta_ms: u64) {
        let target = self.ctx.now_ms().saturating_add(delta_ms);
        self.advance_to(target);
    }

    fn run_due(&mut self) {
        let now = self.ctx.now_ms();
        self.advance_to(now);
    }

    fn suppression(&self) -> Suppression {
        Suppression {
            sleep_phase: self.sleep.phase(),
            tutorial_active: self.tutorial.is_active(),
        }
    }

    fn dispatch(&mut self, due: DueTimer) {
        match due.kind {
            TimerKind::AnimationFrame(id) => self.ctx.on_animation_frame(due.id, id),
            TimerKind::Behavior(timer) => {
                let suppression = self.suppression();
                self.behavior
                    .on_timer(&mut self.ctx, due.id, timer, suppression);
            }
            TimerKind::Sleep(timer) => {
                let tutorial_active = self.tutorial.is_active();
                self.sleep
                    .on_timer(&mut self.ctx, due.id, timer, tutorial_active);
            }
            TimerKind::Tutorial(timer) => self.tutorial.on_timer(&mut self.ctx, due.id, timer),
        }
        self.drain_settled();
    }

    /// Deliver settled moves to whoever asked for them
    fn drain_settled(&mut self) {
        while let Some(settled) = self.ctx.take_settled() {
            tracing::trace!(id = ?settled.id, outcome = ?settled.outcome, "Move settled");
            match settled.follow_up {
                FollowUp::None => {}
                FollowUp::Notify(reply) => {
                    // The requester may have stopped waiting
                    let _ = reply.send(settled.outcome);
                }
                FollowUp::Behavior(follow_up) => {
                    self.behavior
                        .on_move_settled(&mut self.ctx, follow_up, settled.outcome);
                }
                FollowUp::Tutorial(follow_up) => {
                    self.tutorial
                        .on_move_settled(&mut self.ctx, follow_up, settled.outcome);
                }
            }
        }
    }

    // ============================================
    // Input
    // ============================================

    /// Handle a host event at the current engine time
    ///
    /// Every event counts as an interaction: it resets the interaction clock
    /// and startles a dozing or sleeping agent before it is routed.
    pub fn handle_event(&mut self, event: AgentEvent) {
        tracing::debug!(event = event.name(), now_ms = self.ctx.now_ms(), "Event");
        self.ctx.record_interaction();
        self.sleep.on_interaction(&mut self.ctx);

        if let AgentEvent::Drag { x, y } = event {
            self.ctx.jump_to(Point::new(x, y));
        }
        self.tutorial.on_event(&mut self.ctx, &event);
        self.drain_settled();
        self.run_due();
    }

    /// Move the agent on behalf of an outside caller
    pub fn move_to(&mut self, target: Point, duration_ms: u64) -> MoveId {
        let id = self.ctx.move_agent(target, duration_ms, FollowUp::None);
        self.drain_settled();
        id
    }

    /// Move the agent and report how the move settled on `reply`
    pub fn move_to_notify(
        &mut self,
        target: Point,
        duration_ms: u64,
        reply: oneshot::Sender<MoveOutcome>,
    ) -> MoveId {
        let id = self
            .ctx
            .move_agent(target, duration_ms, FollowUp::Notify(reply));
        self.drain_settled();
        id
    }

    // ============================================
    // State
    // ============================================

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &ConductorConfig {
        self.ctx.config()
    }

    /// Agent position
    #[must_use]
    pub fn position(&self) -> Point {
        self.ctx.position()
    }

    /// Agent mood
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.ctx.mood()
    }

    /// Sleep phase
    #[must_use]
    pub fn sleep_phase(&self) -> SleepPhase {
        self.sleep.phase()
    }

    /// Tutorial progress
    #[must_use]
    pub fn tutorial_progress(&self) -> &TutorialProgress {
        self.tutorial.progress()
    }

    /// Whether the tutorial resume prompt is waiting for an answer
    #[must_use]
    pub fn is_awaiting_resume(&self) -> bool {
        self.tutorial.is_awaiting_resume()
    }

    /// Whether an idle behavior or approach is in flight
    #[must_use]
    pub fn is_behavior_busy(&self) -> bool {
        self.behavior.is_busy()
    }

    /// Whether a move is in flight
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.ctx.is_moving()
    }

    /// Whether collaborators may proactively prompt the user right now
    ///
    /// False while the tutorial runs or the agent is not awake.
    #[must_use]
    pub fn may_solicit_prompt(&self) -> bool {
        !self.tutorial.is_active() && self.sleep.phase() == SleepPhase::Awake
    }

    /// Point-in-time view of the engine
    #[must_use]
    pub fn snapshot(&self) -> ConductorSnapshot {
        ConductorSnapshot {
            now_ms: self.ctx.now_ms(),
            position: self.ctx.position(),
            mood: self.ctx.mood(),
            sleep_phase: self.sleep.phase(),
            tutorial: self.tutorial.progress().clone(),
            behavior_busy: self.behavior.is_busy(),
            moving: self.ctx.is_moving(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::overlay::{VirtualOverlay, VirtualScreen};
    use crate::store::{MemoryStore, PersistedSettings};

    fn completed() -> PersistedSettings {
        let mut settings = PersistedSettings::default();
        settings.tutorial.completed_at = Some(DateTime::<Utc>::default());
        settings
    }

    fn conductor(
        settings: PersistedSettings,
    ) -> (Conductor, mpsc::UnboundedReceiver<AgentMessage>, MemoryStore) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = MemoryStore::new(settings);
        let screen = VirtualScreen::new(Size::new(1920, 1080));
        let overlay = VirtualOverlay::new(Point::default(), Size::new(160, 160));
        let config = ConductorConfig {
            seed: Some(11),
            ..Default::default()
        };
        let host = Host::new(overlay, screen, store.clone(), DateTime::<Utc>::default());
        (Conductor::new(config, host, tx), rx, store)
    }

    #[test]
    fn test_conductor_creation() {
        let (conductor, _rx, _store) = conductor(completed());
        assert_eq!(conductor.now_ms(), 0);
        assert_eq!(conductor.mood(), Mood::Idle);
        assert_eq!(conductor.sleep_phase(), SleepPhase::Awake);
        assert!(conductor.next_deadline().is_none());
        assert!(conductor.may_solicit_prompt());
    }

    #[test]
    fn test_boot_is_idempotent() {
        let (mut conductor, _rx, _store) = conductor(completed());
        conductor.boot();
        let first = conductor.next_deadline();
        conductor.boot();
        assert_eq!(conductor.next_deadline(), first);
        assert!(first.is_some());
    }

    #[test]
    fn test_time_never_goes_backwards() {
        let (mut conductor, _rx, _store) = conductor(completed());
        conductor.boot();
        conductor.advance_to(1000);
        conductor.advance_to(500);
        assert_eq!(conductor.now_ms(), 1000);
    }

    #[tokio::test]
    async fn test_move_to_notify_reports_supersede() {
        let (mut conductor, _rx, _store) = conductor(completed());
        let (tx, rx) = oneshot::channel();
        conductor.move_to_notify(Point::new(10, 10), 1000, tx);
        conductor.advance(100);
        conductor.move_to(Point::new(500, 500), 200);

        assert_eq!(rx.await.unwrap(), MoveOutcome::Superseded);
        conductor.advance(200);
        assert_eq!(conductor.position(), Point::new(500, 500));
    }

    #[test]
    fn test_move_completion_is_pending_until_arrival() {
        let (mut conductor, _rx, store) = conductor(completed());
        let (reply, rx) = oneshot::channel();
        let mut done = tokio_test::task::spawn(rx);

        conductor.move_to_notify(Point::new(40, 40), 300, reply);
        conductor.advance(299);
        tokio_test::assert_pending!(done.poll());

        conductor.advance(1);
        assert!(done.is_woken());
        let outcome = tokio_test::assert_ready!(done.poll());
        assert_eq!(outcome.unwrap(), MoveOutcome::Completed);
        assert_eq!(store.snapshot().pet.position, Some(Point::new(40, 40)));
    }

    #[test]
    fn test_headless_moves_resolve_in_place() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = Host::headless(
            VirtualScreen::new(Size::new(800, 600)),
            MemoryStore::new(completed()),
            DateTime::<Utc>::default(),
        );
        let mut conductor = Conductor::new(ConductorConfig::default(), host, tx);
        let start = conductor.position();

        let (reply, mut rx) = oneshot::channel();
        conductor.move_to_notify(Point::new(1, 1), 500, reply);
        assert_eq!(rx.try_recv().unwrap(), MoveOutcome::NoSurface);
        assert_eq!(conductor.position(), start);
    }

    #[test]
    fn test_snapshot_serializes() {
        let (mut conductor, _rx, _store) = conductor(completed());
        conductor.boot();
        let json = serde_json::to_value(conductor.snapshot()).unwrap();
        assert_eq!(json["sleepPhase"], "awake");
        assert_eq!(json["tutorial"]["isActive"], false);
    }
}
