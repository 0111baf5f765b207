//! Presentation Messages
//!
//! Messages pushed from the conductor to the presentation layer. The
//! presentation layer has no business logic: it draws the agent, the prompt
//! bubble and hints from these messages alone.
//!
//! On the wire each message is a JSON object tagged by `event`, with the
//! field names the presentation layer expects (`promptText`, `hintType`, ...).

use serde::{Deserialize, Serialize};

use crate::avatar::Mood;
use crate::behavior::{BehaviorKind, Direction};
use crate::tutorial::HintType;

/// Messages from the conductor to the presentation layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AgentMessage {
    // ============================================
    // Tutorial
    // ============================================
    /// A tutorial step became current
    TutorialStep {
        /// Step index (1-based)
        step: u8,
        /// Prompt to show in the bubble, already resolved
        #[serde(rename = "promptText")]
        prompt_text: String,
        /// Number of steps in the tutorial
        #[serde(rename = "totalSteps")]
        total_steps: u8,
    },

    /// The user seems stuck on a step; show a cue
    TutorialHint {
        /// Step the hint belongs to
        step: u8,
        /// Kind of cue
        #[serde(rename = "hintType")]
        hint_type: HintType,
    },

    /// The tutorial finished or was skipped
    TutorialEnded {
        /// Whether the user skipped it
        skipped: bool,
    },

    /// A previous run was interrupted; ask whether to resume
    TutorialResumePrompt {
        /// Last step reached in the interrupted run
        #[serde(rename = "lastStep")]
        last_step: u8,
    },

    // ============================================
    // Agent
    // ============================================
    /// The agent's mood changed
    MoodChanged {
        /// New mood
        state: Mood,
        /// Why it changed
        #[serde(skip_serializing_if = "Option::is_none", default)]
        reason: Option<String>,
    },

    /// The agent started/stopped moving (sent every frame while moving)
    Moving {
        /// Whether a move is in flight
        moving: bool,
    },

    /// An idle fidget started
    IdleBehavior {
        /// Which fidget
        #[serde(rename = "type")]
        behavior: BehaviorKind,
        /// Facing direction, for directional fidgets
        #[serde(skip_serializing_if = "Option::is_none", default)]
        direction: Option<Direction>,
    },
}
