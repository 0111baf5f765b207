//! Easing Functions
//!
//! Maps linear progress (0.0 to 1.0) onto an eased curve. Position moves use
//! cubic ease-out so the agent darts off and settles gently.

use serde::{Deserialize, Serialize};

/// Easing functions for smooth movement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EasingFunction {
    /// No easing (constant speed)
    Linear,

    /// Quadratic ease out
    EaseOutQuad,

    /// Cubic ease out: `1 - (1 - t)^3`
    #[default]
    EaseOutCubic,

    /// Cubic ease in and out
    EaseInOutCubic,
}

impl EasingFunction {
    /// Apply the easing function to a progress value (clamped to 0.0..=1.0)
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}
