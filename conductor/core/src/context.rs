//! Shared Agent Context
//!
//! Everything the orchestrators share lives here: engine time, the timer
//! queue, the animation controller, the agent's position and mood, the
//! interaction clock and the host collaborators. The conductor owns exactly
//! one context and lends it to one orchestrator at a time.
//!
//! Position changes only happen through [`AgentContext::move_agent`] and
//! [`AgentContext::jump_to`]; both go through the animation controller so an
//! in-flight move is always settled before the agent is placed elsewhere.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use crate::animation::{AnimationController, FollowUp, Frame, MoveId, Settled, FRAME_INTERVAL_MS};
use crate::avatar::{AgentState, Mood};
use crate::clock::InteractionClock;
use crate::conductor::Host;
use crate::config::ConductorConfig;
use crate::geometry::{Bounds, Point};
use crate::messages::AgentMessage;
use crate::overlay::{Overlay, ScreenGeometry};
use crate::store::{PersistedSettings, SettingsStore};
use crate::timers::{DueTimer, TimerId, TimerKind, TimerQueue};

/// State and collaborators shared by the orchestrators
pub struct AgentContext {
    now_ms: u64,
    timers: TimerQueue,
    animation: AnimationController,
    frame_timer: Option<TimerId>,
    settled: VecDeque<Settled>,
    agent: AgentState,
    interaction: InteractionClock,
    overlay: Option<Box<dyn Overlay>>,
    screen: Box<dyn ScreenGeometry>,
    store: Box<dyn SettingsStore>,
    settings: PersistedSettings,
    tx: mpsc::UnboundedSender<AgentMessage>,
    outbound_closed: bool,
    rng: StdRng,
    config: ConductorConfig,
    epoch: DateTime<Utc>,
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("now_ms", &self.now_ms)
            .field("agent", &self.agent)
            .field("pending_timers", &self.timers.len())
            .field("moving", &self.animation.is_moving())
            .field("has_overlay", &self.overlay.is_some())
            .finish_non_exhaustive()
    }
}

impl AgentContext {
    /// Build the context at engine time 0
    ///
    /// The agent starts at its persisted position (clamped to the work area)
    /// or at the resting spot.
    pub fn new(
        config: ConductorConfig,
        host: Host,
        tx: mpsc::UnboundedSender<AgentMessage>,
    ) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let settings = host.store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load settings, using defaults");
            PersistedSettings::default()
        });

        let mut ctx = Self {
            now_ms: 0,
            timers: TimerQueue::new(),
            animation: AnimationController::new(config.overlay.easing),
            frame_timer: None,
            settled: VecDeque::new(),
            agent: AgentState::default(),
            interaction: InteractionClock::new(0),
            overlay: host.overlay,
            screen: host.screen,
            store: host.store,
            settings,
            tx,
            outbound_closed: false,
            rng,
            config,
            epoch: host.epoch,
        };

        let bounds = ctx.bounds();
        let start = ctx
            .settings
            .pet
            .position
            .map_or_else(|| ctx.resting_position(), |p| bounds.clamp(p));
        ctx.place(start);
        ctx
    }

    // ============================================
    // Time and timers
    // ============================================

    /// Current engine time
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Move engine time forward (never backwards)
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Wall-clock time corresponding to the current engine time
    #[must_use]
    pub fn wall_now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::milliseconds(i64::try_from(self.now_ms).unwrap_or(i64::MAX));
        self.epoch
            .checked_add_signed(elapsed)
            .unwrap_or(self.epoch)
    }

    /// Arm a timer `delay_ms` from now
    pub fn schedule_in(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        self.timers
            .schedule(self.now_ms.saturating_add(delay_ms), kind)
    }

    /// Cancel the timer in `slot`, if any
    pub fn cancel(&mut self, slot: &mut Option<TimerId>) {
        self.timers.clear(slot);
    }

    /// Pop the next timer due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<DueTimer> {
        self.timers.pop_due(now_ms)
    }

    /// Earliest pending deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Number of armed timers
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // ============================================
    // Agent state
    // ============================================

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &ConductorConfig {
        &self.config
    }

    /// Random source for intervals and picks
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Interaction clock
    #[must_use]
    pub fn interaction(&self) -> &InteractionClock {
        &self.interaction
    }

    /// Record a user interaction now
    pub fn record_interaction(&mut self) {
        self.interaction.record(self.now_ms);
    }

    /// Current top-left position
    #[must_use]
    pub fn position(&self) -> Point {
        self.agent.position
    }

    /// Current mood
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.agent.mood
    }

    /// Set the mood, broadcasting only if it changed
    pub fn set_mood(&mut self, mood: Mood, reason: Option<&str>) -> bool {
        if !self.agent.set_mood(mood) {
            return false;
        }
        tracing::debug!(%mood, reason, "Mood changed");
        self.emit(AgentMessage::MoodChanged {
            state: mood,
            reason: reason.map(str::to_string),
        });
        true
    }

    /// Push a message to the presentation layer
    pub fn emit(&mut self, message: AgentMessage) {
        if self.tx.send(message).is_err() && !self.outbound_closed {
            self.outbound_closed = true;
            tracing::debug!("Presentation channel closed, dropping messages");
        }
    }

    // ============================================
    // Movement
    // ============================================

    /// Animate the agent to `target` over `duration_ms`
    ///
    /// Supersedes any move in flight. The request settles later through
    /// [`AgentContext::take_settled`]; without an overlay it settles at once
    /// as [`crate::animation::MoveOutcome::NoSurface`].
    pub fn move_agent(&mut self, target: Point, duration_ms: u64, follow_up: FollowUp) -> MoveId {
        if self.overlay.is_none() {
            let settled = self
                .animation
                .resolve_without_surface(self.agent.position, follow_up);
            let id = settled.id;
            tracing::trace!(?target, "No overlay surface, move resolved in place");
            self.settled.push_back(settled);
            return id;
        }

        let from = self.agent.position;
        let (id, superseded) =
            self.animation
                .begin(self.now_ms, from, target, duration_ms, follow_up);
        if let Some(superseded) = superseded {
            self.settled.push_back(superseded);
        }
        self.timers.clear(&mut self.frame_timer);

        if duration_ms == 0 {
            self.advance_frame(id);
        } else {
            let first = FRAME_INTERVAL_MS.min(duration_ms);
            self.frame_timer = Some(self.schedule_in(first, TimerKind::AnimationFrame(id)));
        }
        id
    }

    /// Frame timer `timer` for move `id` fired
    pub fn on_animation_frame(&mut self, timer: TimerId, id: MoveId) {
        if self.frame_timer == Some(timer) {
            self.frame_timer = None;
        }
        self.advance_frame(id);
    }

    fn advance_frame(&mut self, id: MoveId) {
        match self.animation.frame(self.now_ms, id) {
            Frame::Stale => {}
            Frame::Moving {
                position,
                next_frame_ms,
            } => {
                tracing::trace!(x = position.x, y = position.y, "Animation frame");
                self.place(position);
                self.emit(AgentMessage::Moving { moving: true });
                self.frame_timer = Some(
                    self.timers
                        .schedule(next_frame_ms, TimerKind::AnimationFrame(id)),
                );
            }
            Frame::Arrived(settled) => {
                let position = settled.position;
                self.place(position);
                self.emit(AgentMessage::Moving { moving: false });
                self.persist(|s| s.pet.position = Some(position));
                self.settled.push_back(settled);
            }
        }
    }

    /// Place the agent directly (drag), superseding any move in flight
    pub fn jump_to(&mut self, target: Point) {
        let target = self.bounds().clamp(target);
        let was_moving = self.animation.is_moving();
        if let Some(superseded) = self.animation.interrupt(target) {
            self.settled.push_back(superseded);
        }
        self.timers.clear(&mut self.frame_timer);
        self.place(target);
        if was_moving {
            self.emit(AgentMessage::Moving { moving: false });
        }
        self.persist(|s| s.pet.position = Some(target));
    }

    fn place(&mut self, position: Point) {
        self.agent.position = position;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_position(position);
        }
    }

    /// Next settled move awaiting its follow-up
    pub fn take_settled(&mut self) -> Option<Settled> {
        self.settled.pop_front()
    }

    /// Whether a move is in flight
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.animation.is_moving()
    }

    /// Target of the move in flight
    #[must_use]
    pub fn animation_target(&self) -> Option<Point> {
        self.animation.target()
    }

    // ============================================
    // Geometry
    // ============================================

    /// Placement bounds for the overlay at its current size
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let window = self
            .overlay
            .as_ref()
            .map_or(self.config.overlay.compact, |o| o.size());
        Bounds::new(self.screen.work_area(), window)
    }

    /// Bottom-right resting spot
    #[must_use]
    pub fn resting_position(&self) -> Point {
        self.bounds().resting(self.config.overlay.rest_margin)
    }

    /// Distance from the cursor to the center of the agent sprite
    #[must_use]
    pub fn cursor_distance(&self) -> f64 {
        let (dx, dy) = self.config.overlay.agent_size.half();
        self.screen
            .cursor()
            .distance_to(self.agent.position.offset(dx, dy))
    }

    /// Spot just below-right of the cursor, clamped on screen
    #[must_use]
    pub fn cursor_target(&self, offset: i32) -> Point {
        self.bounds()
            .clamp(self.screen.cursor().offset(offset, offset))
    }

    /// Grow the overlay to host the prompt bubble
    pub fn expand_overlay(&mut self) {
        let size = self.config.overlay.expanded;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_size(size);
        }
    }

    /// Shrink the overlay back to the agent alone
    pub fn contract_overlay(&mut self) {
        let size = self.config.overlay.compact;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_size(size);
        }
    }

    // ============================================
    // Settings
    // ============================================

    /// Reload the settings document, keeping the cached copy on failure
    pub fn live_settings(&mut self) -> PersistedSettings {
        match self.store.load() {
            Ok(settings) => {
                self.settings = settings;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload settings, using cached copy");
            }
        }
        self.settings.clone()
    }

    /// Apply `edit` to the latest settings document and save it
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn persist(&mut self, edit: impl FnOnce(&mut PersistedSettings)) {
        let mut settings = self.live_settings();
        edit(&mut settings);
        if let Err(e) = self.store.save(&settings) {
            tracing::warn!(error = %e, "Failed to save settings");
        }
        self.settings = settings;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::sync::mpsc;

    use super::AgentContext;
    use crate::conductor::Host;
    use crate::config::ConductorConfig;
    use crate::geometry::Size;
    use crate::messages::AgentMessage;
    use crate::overlay::{Overlay, VirtualOverlay, VirtualScreen};
    use crate::store::MemoryStore;

    /// A context wired to in-memory collaborators
    pub(crate) struct TestRig {
        pub ctx: AgentContext,
        pub store: MemoryStore,
        pub screen: VirtualScreen,
        pub overlay: VirtualOverlay,
        pub rx: mpsc::UnboundedReceiver<AgentMessage>,
    }

    impl TestRig {
        pub fn new(mut config: ConductorConfig) -> Self {
            config.seed.get_or_insert(7);
            let store = MemoryStore::default();
            let screen = VirtualScreen::new(Size::new(1920, 1080));
            let overlay = VirtualOverlay::new(Default::default(), config.overlay.compact);
            let (tx, rx) = mpsc::unbounded_channel();
            let host = Host::new(
                overlay.clone(),
                screen.clone(),
                store.clone(),
                chrono::DateTime::<chrono::Utc>::default(),
            );
            Self {
                ctx: AgentContext::new(config, host, tx),
                store,
                screen,
                overlay,
                rx,
            }
        }

        pub fn drain_messages(&mut self) -> Vec<AgentMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }

        pub fn overlay_size(&self) -> Size {
            self.overlay.size()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::TestRig;
    use super::*;
    use crate::animation::MoveOutcome;
    use crate::config::ConductorConfig;
    use crate::overlay::Overlay;

    fn run_frames(rig: &mut TestRig, until: u64) {
        while let Some(due) = rig.ctx.pop_due(until) {
            rig.ctx.set_now(due.deadline_ms);
            if let TimerKind::AnimationFrame(id) = due.kind {
                rig.ctx.on_animation_frame(due.id, id);
            }
        }
        rig.ctx.set_now(until);
    }

    #[test]
    fn test_starts_at_resting_position() {
        let rig = TestRig::new(ConductorConfig::default());
        assert_eq!(rig.ctx.position(), Point::new(1736, 896));
        assert_eq!(rig.overlay.position(), Point::new(1736, 896));
    }

    #[test]
    fn test_move_settles_at_target_and_persists() {
        let mut rig = TestRig::new(ConductorConfig::default());
        let id = rig.ctx.move_agent(Point::new(100, 200), 500, FollowUp::None);
        run_frames(&mut rig, 500);

        assert_eq!(rig.ctx.position(), Point::new(100, 200));
        assert_eq!(rig.store.snapshot().pet.position, Some(Point::new(100, 200)));
        let settled = rig.ctx.take_settled().expect("move settled");
        assert_eq!(settled.id, id);
        assert_eq!(settled.outcome, MoveOutcome::Completed);

        let messages = rig.drain_messages();
        assert_eq!(messages.last(), Some(&AgentMessage::Moving { moving: false }));
        assert!(messages[..messages.len() - 1]
            .iter()
            .all(|m| *m == AgentMessage::Moving { moving: true }));
    }

    #[test]
    fn test_drag_supersedes_move() {
        let mut rig = TestRig::new(ConductorConfig::default());
        let id = rig.ctx.move_agent(Point::new(0, 0), 1000, FollowUp::None);
        run_frames(&mut rig, 100);
        rig.ctx.jump_to(Point::new(400, 300));

        let settled = rig.ctx.take_settled().expect("superseded");
        assert_eq!((settled.id, settled.outcome), (id, MoveOutcome::Superseded));
        assert_eq!(rig.ctx.position(), Point::new(400, 300));
        assert_eq!(rig.ctx.pending_timers(), 0);
        assert_eq!(rig.store.snapshot().pet.position, Some(Point::new(400, 300)));
    }

    #[test]
    fn test_mood_broadcast_only_on_change() {
        let mut rig = TestRig::new(ConductorConfig::default());
        assert!(!rig.ctx.set_mood(Mood::Idle, None));
        assert!(rig.ctx.set_mood(Mood::Happy, Some("test")));
        assert_eq!(
            rig.drain_messages(),
            vec![AgentMessage::MoodChanged {
                state: Mood::Happy,
                reason: Some("test".into())
            }]
        );
    }

    #[test]
    fn test_wall_now_offsets_epoch() {
        let mut rig = TestRig::new(ConductorConfig::default());
        rig.ctx.set_now(1500);
        assert_eq!(rig.ctx.wall_now().timestamp_millis(), 1500);
    }
}
