//! Behavior Scheduler
//!
//! Two independent loops keep the agent looking alive:
//!
//! - **Idle loop**: every few seconds, pick a fidget from a weighted catalog
//!   (blink, look around, wander, ...) and perform it.
//! - **Attention loop**: every so often, if the cursor is far away, get
//!   excited and walk over to it.
//!
//! Both loops re-check [`Suppression`] when they fire. A suppressed fire just
//! reschedules, so the loops never stop while the engine runs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::animation::{FollowUp, MoveOutcome};
use crate::avatar::Mood;
use crate::context::AgentContext;
use crate::messages::AgentMessage;
use crate::sleep::SleepPhase;
use crate::timers::{TimerId, TimerKind};

/// Idle fidgets the agent can perform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Quick blink
    Blink,
    /// Glance to one side
    LookAround,
    /// Click claws together
    SnipClaws,
    /// Wiggle in place
    Wiggle,
    /// Big stretch
    Stretch,
    /// Yawn
    Yawn,
    /// Stroll to a nearby spot
    Wander,
}

/// Horizontal facing for directional fidgets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Facing left
    Left,
    /// Facing right
    Right,
}

/// One row of the fidget catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BehaviorCatalogEntry {
    /// Which fidget
    pub kind: BehaviorKind,
    /// Relative weight (catalog weights sum to 100)
    pub weight: u32,
    /// How long the fidget takes
    pub duration_ms: u64,
}

const fn entry(kind: BehaviorKind, weight: u32, duration_ms: u64) -> BehaviorCatalogEntry {
    BehaviorCatalogEntry {
        kind,
        weight,
        duration_ms,
    }
}

/// Fidget catalog
pub const BEHAVIOR_CATALOG: [BehaviorCatalogEntry; 7] = [
    entry(BehaviorKind::Blink, 25, 300),
    entry(BehaviorKind::LookAround, 20, 1500),
    entry(BehaviorKind::SnipClaws, 15, 1200),
    entry(BehaviorKind::Wiggle, 15, 800),
    entry(BehaviorKind::Stretch, 10, 2000),
    entry(BehaviorKind::Yawn, 10, 1800),
    entry(BehaviorKind::Wander, 5, 3000),
];

/// Sum of all catalog weights
pub const CATALOG_TOTAL_WEIGHT: u32 = 100;

/// Map a uniform roll in `[0, 100)` onto the cumulative-weight catalog
///
/// Rolls at or past the total land on the last entry.
#[must_use]
pub fn pick_behavior(roll: u32) -> &'static BehaviorCatalogEntry {
    let mut cumulative = 0;
    for entry in &BEHAVIOR_CATALOG {
        cumulative += entry.weight;
        if roll < cumulative {
            return entry;
        }
    }
    &BEHAVIOR_CATALOG[BEHAVIOR_CATALOG.len() - 1]
}

/// Behavior scheduler timers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviorTimer {
    /// Idle loop tick
    IdleFire,
    /// Release the busy flag set by fidget `generation`
    ClearBusy {
        /// Fidget the flag belongs to
        generation: u64,
    },
    /// Attention loop tick
    AttentionFire,
}

/// Continuations for behavior-initiated moves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviorFollowUp {
    /// The approach toward the cursor settled
    AttentionArrived {
        /// Behavior the move belongs to
        generation: u64,
    },
}

/// The other orchestrators' state, sampled at fire time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Suppression {
    /// Current sleep phase
    pub sleep_phase: SleepPhase,
    /// Whether the tutorial is driving the agent
    pub tutorial_active: bool,
}

impl Suppression {
    /// Why proactive behavior may not start right now, if it may not
    #[must_use]
    pub fn blocked_by(&self, ctx: &AgentContext) -> Option<&'static str> {
        if self.sleep_phase != SleepPhase::Awake {
            return Some("not-awake");
        }
        if self.tutorial_active {
            return Some("tutorial");
        }
        if ctx
            .interaction()
            .in_cooldown(ctx.now_ms(), ctx.config().behavior.interaction_cooldown_ms)
        {
            return Some("cooldown");
        }
        None
    }
}

/// Idle fidget and attention-seeking loops
#[derive(Debug, Default)]
pub struct BehaviorScheduler {
    idle_timer: Option<TimerId>,
    attention_timer: Option<TimerId>,
    clear_timer: Option<TimerId>,
    busy: bool,
    generation: u64,
}

impl BehaviorScheduler {
    /// Create an idle scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm both loops
    pub fn start(&mut self, ctx: &mut AgentContext) {
        self.schedule_idle(ctx);
        self.schedule_attention(ctx);
    }

    /// Whether a fidget or approach is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    fn schedule_idle(&mut self, ctx: &mut AgentContext) {
        let range = ctx.config().behavior.idle_interval;
        let delay = range.sample(ctx.rng());
        ctx.cancel(&mut self.idle_timer);
        self.idle_timer = Some(ctx.schedule_in(delay, TimerKind::Behavior(BehaviorTimer::IdleFire)));
    }

    fn schedule_attention(&mut self, ctx: &mut AgentContext) {
        let range = ctx.config().attention.interval(ctx.config().profile);
        let delay = range.sample(ctx.rng());
        ctx.cancel(&mut self.attention_timer);
        self.attention_timer = Some(ctx.schedule_in(
            delay,
            TimerKind::Behavior(BehaviorTimer::AttentionFire),
        ));
    }

    fn mark_busy(&mut self) -> u64 {
        self.busy = true;
        self.generation += 1;
        self.generation
    }

    /// Handle a behavior timer
    pub fn on_timer(
        &mut self,
        ctx: &mut AgentContext,
        id: TimerId,
        timer: BehaviorTimer,
        suppression: Suppression,
    ) {
        match timer {
            BehaviorTimer::IdleFire => {
                if self.idle_timer != Some(id) {
                    return;
                }
                self.idle_timer = None;
                self.fire_idle(ctx, suppression);
                self.schedule_idle(ctx);
            }
            BehaviorTimer::AttentionFire => {
                if self.attention_timer != Some(id) {
                    return;
                }
                self.attention_timer = None;
                self.fire_attention(ctx, suppression);
                self.schedule_attention(ctx);
            }
            BehaviorTimer::ClearBusy { generation } => {
                if self.clear_timer == Some(id) {
                    self.clear_timer = None;
                }
                if generation == self.generation {
                    self.busy = false;
                }
            }
        }
    }

    fn fire_idle(&mut self, ctx: &mut AgentContext, suppression: Suppression) {
        if let Some(reason) = suppression.blocked_by(ctx) {
            tracing::trace!(reason, "Idle behavior suppressed");
            return;
        }
        if self.busy {
            tracing::trace!("Idle behavior skipped, previous behavior still running");
            return;
        }

        let roll = ctx.rng().gen_range(0..CATALOG_TOTAL_WEIGHT);
        let picked = *pick_behavior(roll);
        let generation = self.mark_busy();

        let (direction, busy_for_ms) = match picked.kind {
            BehaviorKind::Wander => {
                let (dx, dy) = {
                    let cfg = &ctx.config().behavior;
                    (cfg.wander_dx, cfg.wander_dy)
                };
                let from = ctx.position();
                let offset_x = ctx.rng().gen_range(-dx..=dx);
                let offset_y = ctx.rng().gen_range(-dy..=dy);
                let target = ctx.bounds().clamp(from.offset(offset_x, offset_y));
                let direction = if target.x < from.x {
                    Direction::Left
                } else {
                    Direction::Right
                };
                ctx.move_agent(target, picked.duration_ms, FollowUp::None);
                (Some(direction), picked.duration_ms)
            }
            BehaviorKind::LookAround => {
                let direction = if ctx.rng().gen_bool(0.5) {
                    Direction::Left
                } else {
                    Direction::Right
                };
                (Some(direction), ctx.config().behavior.non_movement_grace_ms)
            }
            _ => (None, ctx.config().behavior.non_movement_grace_ms),
        };

        tracing::debug!(behavior = ?picked.kind, roll, "Idle behavior");
        ctx.emit(AgentMessage::IdleBehavior {
            behavior: picked.kind,
            direction,
        });

        ctx.cancel(&mut self.clear_timer);
        self.clear_timer = Some(ctx.schedule_in(
            busy_for_ms,
            TimerKind::Behavior(BehaviorTimer::ClearBusy { generation }),
        ));
    }

    fn fire_attention(&mut self, ctx: &mut AgentContext, suppression: Suppression) {
        if let Some(reason) = suppression.blocked_by(ctx) {
            tracing::trace!(reason, "Attention seeking suppressed");
            return;
        }
        if self.busy {
            tracing::trace!("Attention seeking skipped, behavior in flight");
            return;
        }
        if !ctx.live_settings().pet.attention_seeker {
            return;
        }

        let distance = ctx.cursor_distance();
        let (min_distance, offset, duration) = {
            let cfg = &ctx.config().attention;
            (cfg.min_distance_px, cfg.cursor_offset, cfg.move_duration_ms)
        };
        if distance <= min_distance {
            tracing::trace!(distance, "Cursor close enough, not seeking attention");
            return;
        }

        let generation = self.mark_busy();
        tracing::debug!(distance, "Seeking attention");
        ctx.set_mood(Mood::Excited, Some("attention"));
        let target = ctx.cursor_target(offset);
        ctx.move_agent(
            target,
            duration,
            FollowUp::Behavior(BehaviorFollowUp::AttentionArrived { generation }),
        );
    }

    /// Continue after a behavior-initiated move settles
    pub fn on_move_settled(
        &mut self,
        ctx: &mut AgentContext,
        follow_up: BehaviorFollowUp,
        outcome: MoveOutcome,
    ) {
        match follow_up {
            BehaviorFollowUp::AttentionArrived { generation } => {
                tracing::debug!(?outcome, "Attention move settled");
                if ctx.mood() == Mood::Excited {
                    ctx.set_mood(Mood::Idle, None);
                }
                if generation == self.generation {
                    self.busy = false;
                }
            }
        }
    }
}
