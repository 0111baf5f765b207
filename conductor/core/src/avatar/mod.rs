//! Agent State and Moods
//!
//! The agent is the on-screen avatar. The conductor owns its state (where it
//! is, what mood it shows); the presentation layer only renders what it is
//! told through [`crate::messages::AgentMessage`].
//!
//! Mood is broadcast rather than owned by one component: the behavior
//! scheduler, the sleep cycle and the tutorial all set it, and the suppression
//! rules decide which of them is allowed to drive at any moment.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Agent moods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Default resting state
    #[default]
    Idle,
    /// Pleased
    Happy,
    /// Interested and engaged
    Curious,
    /// Fully asleep
    Sleeping,
    /// Drifting off
    Dozing,
    /// Woken abruptly
    Startled,
    /// Deep in thought
    Thinking,
    /// Very excited (attention seeking)
    Excited,
    /// Annoyed
    Mad,
    /// Celebrating an accomplishment
    Proud,
    /// Playful spin
    Spin,
}

impl Mood {
    /// Wire name of the mood
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Happy => "happy",
            Self::Curious => "curious",
            Self::Sleeping => "sleeping",
            Self::Dozing => "dozing",
            Self::Startled => "startled",
            Self::Thinking => "thinking",
            Self::Excited => "excited",
            Self::Mad => "mad",
            Self::Proud => "proud",
            Self::Spin => "spin",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared mutable agent state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentState {
    /// Current top-left position of the overlay
    pub position: Point,
    /// Current mood
    pub mood: Mood,
}

impl AgentState {
    /// Set the mood; returns whether it changed
    pub fn set_mood(&mut self, mood: Mood) -> bool {
        if self.mood == mood {
            return false;
        }
        self.mood = mood;
        true
    }
}
