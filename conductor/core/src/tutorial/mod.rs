//! Tutorial Guide
//!
//! A linear, table-driven walkthrough of ten steps (see [`steps::STEPS`]).
//!
//! # Lifecycle
//!
//! ```text
//! start(n) ─► expand overlay, persist, move to center
//!                 │ (move settles)
//!                 ▼
//!         ┌─► activate(n) after delayBefore ──► step timers armed
//!         │       │ trigger / auto-advance / follow protocol
//!         │       ▼
//!         └── advance: clear step timers, n += 1 ── n > 10 ──► finish
//! ```
//!
//! Every run gets a generation number. Timers and move follow-ups carry the
//! run (and step) they were armed for and are ignored once it has moved on,
//! so a skip or restart can never be undone by a late callback.

pub mod steps;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::animation::{FollowUp, MoveOutcome};
use crate::avatar::Mood;
use crate::config::ResumePolicy;
use crate::context::AgentContext;
use crate::events::AgentEvent;
use crate::messages::AgentMessage;
use crate::timers::{TimerId, TimerKind};

pub use steps::{
    descriptor, display_accelerator, prompt_text, HintType, StepDescriptor, StepTrigger,
    FOLLOW_STEP, STEPS, TOTAL_STEPS,
};

/// Tutorial progress, mirrored to the settings store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialProgress {
    /// Step on screen; only meaningful while active
    pub current_step: Option<u8>,
    /// A run is in progress
    pub is_active: bool,
    /// A run was started and not finished
    pub was_interrupted: bool,
    /// Last step written to the store
    pub persisted_step: u8,
    /// When the tutorial was completed or skipped
    pub completed_at: Option<DateTime<Utc>>,
}

/// Tutorial timers; each carries the run it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TutorialTimer {
    /// Show `step` after its delay
    Activate {
        /// Run generation
        run: u64,
        /// Step to activate
        step: u8,
    },
    /// Show the hint for `step`
    Fallback {
        /// Run generation
        run: u64,
        /// Step the hint belongs to
        step: u8,
    },
    /// Move past `step` on its own
    AutoAdvance {
        /// Run generation
        run: u64,
        /// Step to leave
        step: u8,
    },
    /// Step 4: has the cursor moved away yet?
    CursorPoll {
        /// Run generation
        run: u64,
    },
    /// Step 4: should the agent follow the cursor?
    FollowCheck {
        /// Run generation
        run: u64,
    },
    /// Step 4: pause at center before advancing
    FollowSettle {
        /// Run generation
        run: u64,
    },
}

/// Continuations for tutorial-initiated moves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TutorialFollowUp {
    /// Reached center at the start of a run
    ArrivedAtCenter {
        /// Run generation
        run: u64,
        /// Step to activate
        from_step: u8,
    },
    /// A follow move toward the cursor settled
    FollowMoveDone {
        /// Run generation
        run: u64,
    },
    /// Back at center after following
    ReturnedToCenter {
        /// Run generation
        run: u64,
    },
}

/// Pending timers of the current step
#[derive(Debug, Default)]
struct StepTimers {
    activate: Option<TimerId>,
    fallback: Option<TimerId>,
    auto_advance: Option<TimerId>,
    cursor_poll: Option<TimerId>,
    follow_check: Option<TimerId>,
    follow_settle: Option<TimerId>,
}

impl StepTimers {
    fn clear_all(&mut self, ctx: &mut AgentContext) {
        ctx.cancel(&mut self.activate);
        ctx.cancel(&mut self.fallback);
        ctx.cancel(&mut self.auto_advance);
        ctx.cancel(&mut self.cursor_poll);
        ctx.cancel(&mut self.follow_check);
        ctx.cancel(&mut self.follow_settle);
    }
}

/// Step-4 follow protocol state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FollowState {
    #[default]
    Idle,
    /// Polling for the cursor to move away
    Waiting,
    /// Following; `cycles` checks done
    Following { cycles: u8 },
    /// Walking back to center
    Returning,
}

/// The tutorial state machine
#[derive(Debug, Default)]
pub struct TutorialGuide {
    progress: TutorialProgress,
    run: u64,
    awaiting_resume: bool,
    pending_step: Option<u8>,
    timers: StepTimers,
    follow: FollowState,
}

impl TutorialGuide {
    /// Create an inactive guide
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current progress
    #[must_use]
    pub fn progress(&self) -> &TutorialProgress {
        &self.progress
    }

    /// Whether a run is driving the agent
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.progress.is_active
    }

    /// Whether the resume prompt is waiting for an answer
    #[must_use]
    pub fn is_awaiting_resume(&self) -> bool {
        self.awaiting_resume
    }

    fn is_current(&self, run: u64) -> bool {
        self.progress.is_active && run == self.run
    }

    /// Decide what to do at process start from the persisted record
    pub fn boot(&mut self, ctx: &mut AgentContext) {
        let record = ctx.live_settings().tutorial;
        self.progress = TutorialProgress {
            current_step: None,
            is_active: false,
            was_interrupted: record.was_interrupted,
            persisted_step: record.last_step,
            completed_at: record.completed_at,
        };

        if record.completed_at.is_some() {
            tracing::debug!("Tutorial already completed");
            return;
        }
        if record.was_interrupted {
            tracing::info!(last_step = record.last_step, "Offering to resume tutorial");
            self.awaiting_resume = true;
            ctx.emit(AgentMessage::TutorialResumePrompt {
                last_step: record.last_step,
            });
            return;
        }
        if ctx.config().tutorial.auto_start {
            tracing::info!("First run, starting tutorial");
            self.start(ctx, 1);
        }
    }

    /// Begin a run at `from_step`
    pub fn start(&mut self, ctx: &mut AgentContext, from_step: u8) {
        let from_step = from_step.clamp(1, TOTAL_STEPS);
        self.timers.clear_all(ctx);
        self.run += 1;
        self.awaiting_resume = false;
        self.pending_step = Some(from_step);
        self.follow = FollowState::Idle;
        self.progress.is_active = true;
        self.progress.current_step = None;
        self.progress.was_interrupted = true;
        self.progress.persisted_step = from_step;

        ctx.persist(|s| {
            s.tutorial.was_interrupted = true;
            s.tutorial.last_step = from_step;
        });
        ctx.expand_overlay();

        tracing::info!(from_step, run = self.run, "Tutorial started");
        let center = ctx.bounds().center();
        let duration = ctx.config().tutorial.center_move_ms;
        ctx.move_agent(
            center,
            duration,
            FollowUp::Tutorial(TutorialFollowUp::ArrivedAtCenter {
                run: self.run,
                from_step,
            }),
        );
    }

    fn schedule_activation(&mut self, ctx: &mut AgentContext, step: u8) {
        let delay = descriptor(step).map_or(0, |d| d.delay_before_ms);
        self.pending_step = Some(step);
        ctx.cancel(&mut self.timers.activate);
        self.timers.activate = Some(ctx.schedule_in(
            delay,
            TimerKind::Tutorial(TutorialTimer::Activate {
                run: self.run,
                step,
            }),
        ));
    }

    fn activate(&mut self, ctx: &mut AgentContext, step: u8) {
        let Some(desc) = descriptor(step) else {
            return;
        };
        self.timers.clear_all(ctx);
        self.pending_step = None;
        self.follow = FollowState::Idle;
        self.progress.current_step = Some(step);
        self.progress.persisted_step = step;
        ctx.persist(|s| s.tutorial.last_step = step);

        let hotkeys = ctx.live_settings().hotkeys;
        tracing::debug!(step, "Tutorial step");
        ctx.emit(AgentMessage::TutorialStep {
            step,
            prompt_text: prompt_text(step, &hotkeys),
            total_steps: TOTAL_STEPS,
        });

        let run = self.run;
        if let Some((delay, _)) = desc.fallback.filter(|(delay, _)| *delay > 0) {
            self.timers.fallback = Some(ctx.schedule_in(
                delay,
                TimerKind::Tutorial(TutorialTimer::Fallback { run, step }),
            ));
        }
        if let Some(delay) = desc.auto_advance_ms {
            self.timers.auto_advance = Some(ctx.schedule_in(
                delay,
                TimerKind::Tutorial(TutorialTimer::AutoAdvance { run, step }),
            ));
        }
        if desc.trigger == StepTrigger::FollowCursor {
            self.follow = FollowState::Waiting;
            self.schedule_cursor_poll(ctx);
        }
        if let Some(mood) = desc.mood {
            ctx.set_mood(mood, Some("tutorial"));
        }
    }

    /// Leave the current step
    ///
    /// Ignored while the next step's activation is already pending.
    pub fn advance(&mut self, ctx: &mut AgentContext) {
        if !self.progress.is_active || self.pending_step.is_some() {
            return;
        }
        let Some(current) = self.progress.current_step else {
            return;
        };
        self.timers.clear_all(ctx);
        self.follow = FollowState::Idle;

        let next = current + 1;
        if next > TOTAL_STEPS {
            self.finish(ctx, false);
        } else {
            self.schedule_activation(ctx, next);
        }
    }

    fn finish(&mut self, ctx: &mut AgentContext, skipped: bool) {
        self.timers.clear_all(ctx);
        self.run += 1;
        self.awaiting_resume = false;
        self.pending_step = None;
        self.follow = FollowState::Idle;

        let completed_at = ctx.wall_now();
        self.progress.is_active = false;
        self.progress.current_step = None;
        self.progress.was_interrupted = false;
        self.progress.completed_at = Some(completed_at);
        ctx.persist(|s| {
            s.tutorial.completed_at = Some(completed_at);
            s.tutorial.was_interrupted = false;
        });

        ctx.contract_overlay();
        let resting = ctx.resting_position();
        let duration = ctx.config().tutorial.rest_move_ms;
        ctx.move_agent(resting, duration, FollowUp::None);
        if ctx.mood() == Mood::Proud {
            ctx.set_mood(Mood::Idle, Some("tutorial"));
        }

        tracing::info!(skipped, "Tutorial ended");
        ctx.emit(AgentMessage::TutorialEnded { skipped });
    }

    /// Skip the tutorial (also answers a pending resume prompt)
    pub fn skip(&mut self, ctx: &mut AgentContext) {
        if self.progress.is_active || self.awaiting_resume {
            self.finish(ctx, true);
        }
    }

    /// Accept the resume prompt
    pub fn resume(&mut self, ctx: &mut AgentContext) {
        if !self.awaiting_resume {
            return;
        }
        let from_step = match ctx.config().tutorial.resume_policy {
            ResumePolicy::RestartFromBeginning => 1,
            ResumePolicy::FromLastStep => self.progress.persisted_step.max(1),
        };
        self.start(ctx, from_step);
    }

    /// Reset progress and run again from step 1
    pub fn start_over(&mut self, ctx: &mut AgentContext) {
        if !self.progress.is_active && !self.awaiting_resume {
            return;
        }
        self.progress.persisted_step = 0;
        ctx.persist(|s| s.tutorial.last_step = 0);
        self.start(ctx, 1);
    }

    /// Run a finished tutorial again
    pub fn replay(&mut self, ctx: &mut AgentContext) {
        if self.progress.is_active {
            return;
        }
        self.progress.completed_at = None;
        self.progress.persisted_step = 0;
        ctx.persist(|s| {
            s.tutorial.completed_at = None;
            s.tutorial.last_step = 0;
        });
        self.start(ctx, 1);
    }

    /// Route a host event
    pub fn on_event(&mut self, ctx: &mut AgentContext, event: &AgentEvent) {
        match event {
            AgentEvent::TutorialSkip => self.skip(ctx),
            AgentEvent::TutorialResume => self.resume(ctx),
            AgentEvent::TutorialStartOver => self.start_over(ctx),
            AgentEvent::TutorialReplay => self.replay(ctx),
            _ => {
                let Some(step) = self.progress.current_step.filter(|_| self.is_active()) else {
                    return;
                };
                let accepted = descriptor(step).is_some_and(|d| d.trigger.accepts(event));
                if accepted {
                    tracing::debug!(step, event = event.name(), "Step completed by event");
                    self.advance(ctx);
                }
            }
        }
    }

    /// Handle a tutorial timer
    pub fn on_timer(&mut self, ctx: &mut AgentContext, id: TimerId, timer: TutorialTimer) {
        match timer {
            TutorialTimer::Activate { run, step } => {
                if self.timers.activate != Some(id) {
                    return;
                }
                self.timers.activate = None;
                if self.is_current(run) && self.pending_step == Some(step) {
                    self.activate(ctx, step);
                }
            }
            TutorialTimer::Fallback { run, step } => {
                if self.timers.fallback != Some(id) {
                    return;
                }
                self.timers.fallback = None;
                if !self.is_current(run) || self.progress.current_step != Some(step) {
                    return;
                }
                if let Some((_, hint_type)) = descriptor(step).and_then(|d| d.fallback) {
                    tracing::debug!(step, ?hint_type, "Tutorial hint");
                    ctx.emit(AgentMessage::TutorialHint { step, hint_type });
                }
            }
            TutorialTimer::AutoAdvance { run, step } => {
                if self.timers.auto_advance != Some(id) {
                    return;
                }
                self.timers.auto_advance = None;
                if self.is_current(run) && self.progress.current_step == Some(step) {
                    self.advance(ctx);
                }
            }
            TutorialTimer::CursorPoll { run } => {
                if self.timers.cursor_poll != Some(id) {
                    return;
                }
                self.timers.cursor_poll = None;
                if !self.is_current(run) || self.follow != FollowState::Waiting {
                    return;
                }
                let distance = ctx.cursor_distance();
                if distance > ctx.config().tutorial.follow.trigger_distance_px {
                    tracing::debug!(distance, "Cursor moved away, following");
                    self.follow = FollowState::Following { cycles: 0 };
                    let delay = ctx.config().tutorial.follow.first_check_ms;
                    self.schedule_follow_check(ctx, delay);
                } else {
                    self.schedule_cursor_poll(ctx);
                }
            }
            TutorialTimer::FollowCheck { run } => {
                if self.timers.follow_check != Some(id) {
                    return;
                }
                self.timers.follow_check = None;
                if self.is_current(run) && matches!(self.follow, FollowState::Following { .. }) {
                    self.follow_check(ctx);
                }
            }
            TutorialTimer::FollowSettle { run } => {
                if self.timers.follow_settle != Some(id) {
                    return;
                }
                self.timers.follow_settle = None;
                if self.is_current(run) && self.progress.current_step == Some(FOLLOW_STEP) {
                    self.advance(ctx);
                }
            }
        }
    }

    /// Continue after a tutorial-initiated move settles
    pub fn on_move_settled(
        &mut self,
        ctx: &mut AgentContext,
        follow_up: TutorialFollowUp,
        outcome: MoveOutcome,
    ) {
        match follow_up {
            TutorialFollowUp::ArrivedAtCenter { run, from_step } => {
                if self.is_current(run) && self.pending_step == Some(from_step) {
                    tracing::debug!(?outcome, from_step, "Tutorial reached center");
                    self.schedule_activation(ctx, from_step);
                }
            }
            TutorialFollowUp::FollowMoveDone { run } => {
                if self.is_current(run) && matches!(self.follow, FollowState::Following { .. }) {
                    self.count_follow_cycle(ctx);
                }
            }
            TutorialFollowUp::ReturnedToCenter { run } => {
                if self.is_current(run) && self.follow == FollowState::Returning {
                    self.follow = FollowState::Idle;
                    let delay = ctx.config().tutorial.follow.settle_ms;
                    ctx.cancel(&mut self.timers.follow_settle);
                    self.timers.follow_settle = Some(ctx.schedule_in(
                        delay,
                        TimerKind::Tutorial(TutorialTimer::FollowSettle { run }),
                    ));
                }
            }
        }
    }

    fn schedule_cursor_poll(&mut self, ctx: &mut AgentContext) {
        let interval = ctx.config().tutorial.follow.poll_interval_ms;
        ctx.cancel(&mut self.timers.cursor_poll);
        self.timers.cursor_poll = Some(ctx.schedule_in(
            interval,
            TimerKind::Tutorial(TutorialTimer::CursorPoll { run: self.run }),
        ));
    }

    fn schedule_follow_check(&mut self, ctx: &mut AgentContext, delay_ms: u64) {
        ctx.cancel(&mut self.timers.follow_check);
        self.timers.follow_check = Some(ctx.schedule_in(
            delay_ms,
            TimerKind::Tutorial(TutorialTimer::FollowCheck { run: self.run }),
        ));
    }

    /// One follow check: catch up with a far cursor, or count the cycle
    fn follow_check(&mut self, ctx: &mut AgentContext) {
        let follow = ctx.config().tutorial.follow.clone();
        let distance = ctx.cursor_distance();
        if distance < follow.close_distance_px {
            self.return_to_center(ctx);
            return;
        }
        // Checks keep a fixed cadence; a follow move does not push the next one back
        self.schedule_follow_check(ctx, follow.check_interval_ms);
        if distance > follow.follow_distance_px {
            let target = ctx.cursor_target(follow.cursor_offset);
            tracing::debug!(distance, "Following cursor");
            ctx.move_agent(
                target,
                follow.move_duration_ms,
                FollowUp::Tutorial(TutorialFollowUp::FollowMoveDone { run: self.run }),
            );
            return;
        }
        self.count_follow_cycle(ctx);
    }

    fn count_follow_cycle(&mut self, ctx: &mut AgentContext) {
        let FollowState::Following { cycles } = self.follow else {
            return;
        };
        let cycles = cycles + 1;
        self.follow = FollowState::Following { cycles };

        let follow = ctx.config().tutorial.follow.clone();
        let distance = ctx.cursor_distance();
        if distance < follow.close_distance_px || cycles >= follow.max_cycles {
            tracing::debug!(cycles, distance, "Follow loop done");
            self.return_to_center(ctx);
        }
    }

    fn return_to_center(&mut self, ctx: &mut AgentContext) {
        self.follow = FollowState::Returning;
        ctx.cancel(&mut self.timers.follow_check);
        let center = ctx.bounds().center();
        let duration = ctx.config().tutorial.return_move_ms;
        ctx.move_agent(
            center,
            duration,
            FollowUp::Tutorial(TutorialFollowUp::ReturnedToCenter { run: self.run }),
        );
    }
}
