//! Animation Controller
//!
//! Interpolates the agent's position toward a target over time. Only one move
//! is ever in flight: starting a new move supersedes the old one.
//!
//! # Settlement
//!
//! Every move request gets a [`MoveId`] and settles exactly once:
//!
//! ```text
//! begin ──► Moving (frame every 16 ms) ──► Arrived   => MoveOutcome::Completed
//!   │                 │
//!   │                 └─ superseded/interrupted     => MoveOutcome::Superseded
//!   └─ no overlay surface                           => MoveOutcome::NoSurface
//! ```
//!
//! The controller is pure bookkeeping: the conductor context owns the frame
//! timers, applies positions to the overlay and routes each [`Settled`] value
//! to the component that asked for the move.

mod timing;

pub use timing::EasingFunction;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::behavior::BehaviorFollowUp;
use crate::geometry::Point;
use crate::tutorial::TutorialFollowUp;

/// Frame interval for position moves (~60 Hz)
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Identifier of one move request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoveId(pub u64);

/// How a move request settled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveOutcome {
    /// Reached its target
    Completed,
    /// Replaced by a newer move (or a drag) before arriving
    Superseded,
    /// No overlay surface to move; resolved without moving
    NoSurface,
}

/// What should happen once a move settles
#[derive(Debug, Default)]
pub enum FollowUp {
    /// Nothing
    #[default]
    None,
    /// Resolve an external completion signal
    Notify(oneshot::Sender<MoveOutcome>),
    /// Continue a behavior scheduler flow
    Behavior(BehaviorFollowUp),
    /// Continue a tutorial flow
    Tutorial(TutorialFollowUp),
}

/// A move that has settled
#[derive(Debug)]
pub struct Settled {
    /// Which move
    pub id: MoveId,
    /// How it settled
    pub outcome: MoveOutcome,
    /// Agent position at settlement
    pub position: Point,
    /// Continuation to run
    pub follow_up: FollowUp,
}

/// Result of advancing the active move to a frame boundary
#[derive(Debug)]
pub enum Frame {
    /// Frame belongs to a move that is no longer active
    Stale,
    /// Still moving
    Moving {
        /// Interpolated position for this frame
        position: Point,
        /// When the next frame is due
        next_frame_ms: u64,
    },
    /// Reached the target
    Arrived(Settled),
}

#[derive(Debug)]
struct ActiveMove {
    id: MoveId,
    from: Point,
    to: Point,
    started_at_ms: u64,
    duration_ms: u64,
    follow_up: FollowUp,
}

impl ActiveMove {
    fn settle(self, outcome: MoveOutcome, position: Point) -> Settled {
        Settled {
            id: self.id,
            outcome,
            position,
            follow_up: self.follow_up,
        }
    }
}

/// Single-flight position animation state
#[derive(Debug, Default)]
pub struct AnimationController {
    active: Option<ActiveMove>,
    next_id: u64,
    easing: EasingFunction,
}

impl AnimationController {
    /// Create a controller using `easing` for every move
    #[must_use]
    pub fn new(easing: EasingFunction) -> Self {
        Self {
            active: None,
            next_id: 0,
            easing,
        }
    }

    fn allocate_id(&mut self) -> MoveId {
        self.next_id += 1;
        MoveId(self.next_id)
    }

    /// Start a move from `from` to `to`
    ///
    /// Returns the new move's id and, if a move was already in flight, its
    /// settlement as [`MoveOutcome::Superseded`] at `from`.
    pub fn begin(
        &mut self,
        now_ms: u64,
        from: Point,
        to: Point,
        duration_ms: u64,
        follow_up: FollowUp,
    ) -> (MoveId, Option<Settled>) {
        let superseded = self.interrupt(from);
        let id = self.allocate_id();
        self.active = Some(ActiveMove {
            id,
            from,
            to,
            started_at_ms: now_ms,
            duration_ms,
            follow_up,
        });
        (id, superseded)
    }

    /// Stop the active move where it is, settling it as superseded
    pub fn interrupt(&mut self, at: Point) -> Option<Settled> {
        self.active
            .take()
            .map(|m| m.settle(MoveOutcome::Superseded, at))
    }

    /// Settle a request immediately because there is no surface to move
    pub fn resolve_without_surface(&mut self, at: Point, follow_up: FollowUp) -> Settled {
        Settled {
            id: self.allocate_id(),
            outcome: MoveOutcome::NoSurface,
            position: at,
            follow_up,
        }
    }

    /// Advance move `id` to `now_ms`
    pub fn frame(&mut self, now_ms: u64, id: MoveId) -> Frame {
        let Some(active) = self.active.as_ref() else {
            return Frame::Stale;
        };
        if active.id != id {
            return Frame::Stale;
        }

        let elapsed = now_ms.saturating_sub(active.started_at_ms);
        if elapsed >= active.duration_ms {
            let to = active.to;
            return match self.active.take() {
                Some(m) => Frame::Arrived(m.settle(MoveOutcome::Completed, to)),
                None => Frame::Stale,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let progress = elapsed as f64 / active.duration_ms as f64;
        let position = interpolate(active.from, active.to, self.easing.apply(progress));
        let arrival = active.started_at_ms + active.duration_ms;
        Frame::Moving {
            position,
            next_frame_ms: (now_ms + FRAME_INTERVAL_MS).min(arrival),
        }
    }

    /// Whether a move is in flight
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    /// Target of the move in flight
    #[must_use]
    pub fn target(&self) -> Option<Point> {
        self.active.as_ref().map(|m| m.to)
    }
}

/// Linear interpolation between two points at eased progress `eased`
#[must_use]
pub fn interpolate(from: Point, to: Point, eased: f64) -> Point {
    #[allow(clippy::cast_possible_truncation)]
    let lerp =
        |a: i32, b: i32| (f64::from(a) + (f64::from(b) - f64::from(a)) * eased).round() as i32;
    Point::new(lerp(from.x, to.x), lerp(from.y, to.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_arrives_exactly_at_target() {
        let mut c = AnimationController::new(EasingFunction::EaseOutCubic);
        let (id, superseded) =
            c.begin(0, Point::new(0, 0), Point::new(333, -77), 100, FollowUp::None);
        assert!(superseded.is_none());

        let mut now = 0;
        loop {
            match c.frame(now, id) {
                Frame::Moving {
                    position,
                    next_frame_ms,
                } => {
                    assert!(position.x >= 0 && position.x <= 333);
                    assert!(next_frame_ms <= 100);
                    now = next_frame_ms;
                }
                Frame::Arrived(settled) => {
                    assert_eq!(settled.outcome, MoveOutcome::Completed);
                    assert_eq!(settled.position, Point::new(333, -77));
                    assert_eq!(now, 100);
                    break;
                }
                Frame::Stale => panic!("active move reported stale"),
            }
        }
        assert!(!c.is_moving());
    }

    #[test]
    fn test_new_move_supersedes_old_one() {
        let mut c = AnimationController::default();
        let (first, _) = c.begin(0, Point::new(0, 0), Point::new(100, 0), 500, FollowUp::None);
        let (second, superseded) =
            c.begin(50, Point::new(40, 0), Point::new(0, 100), 500, FollowUp::None);

        let superseded = superseded.expect("first move should settle");
        assert_eq!(superseded.id, first);
        assert_eq!(superseded.outcome, MoveOutcome::Superseded);
        assert_eq!(superseded.position, Point::new(40, 0));
        assert!(matches!(c.frame(60, first), Frame::Stale));
        assert!(matches!(c.frame(60, second), Frame::Moving { .. }));
    }

    #[test]
    fn test_zero_duration_arrives_on_first_frame() {
        let mut c = AnimationController::default();
        let (id, _) = c.begin(10, Point::new(5, 5), Point::new(9, 9), 0, FollowUp::None);
        assert!(matches!(c.frame(10, id), Frame::Arrived(s) if s.position == Point::new(9, 9)));
    }

    #[test]
    fn test_notify_follow_up_is_carried_through() {
        let mut c = AnimationController::default();
        let (tx, mut rx) = oneshot::channel();
        let settled = c.resolve_without_surface(Point::new(1, 2), FollowUp::Notify(tx));
        assert_eq!(settled.outcome, MoveOutcome::NoSurface);
        if let FollowUp::Notify(tx) = settled.follow_up {
            tx.send(settled.outcome).unwrap();
        }
        assert_eq!(rx.try_recv().unwrap(), MoveOutcome::NoSurface);
    }

    #[test]
    fn test_interpolate_midpoint_with_ease_out() {
        let p = interpolate(
            Point::new(0, 0),
            Point::new(800, 400),
            EasingFunction::EaseOutCubic.apply(0.5),
        );
        assert_eq!(p, Point::new(700, 350));
    }
}
