//! Interaction Events
//!
//! Events delivered to the conductor by the host: raw pointer/keyboard input
//! on the agent and signals raised by the presentation layer's tutorial UI.
//!
//! Every event is user-originated, so every event also resets the
//! interaction clock and can startle a dozing agent.

use serde::{Deserialize, Serialize};

/// Logical action a global hotkey is bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HotkeyAction {
    /// Show/hide the chat window
    ToggleChat,
    /// Show/hide the side panel
    TogglePanel,
}

/// Events from the host to the conductor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    // ============================================
    // Direct input on the agent
    // ============================================
    /// User clicked the agent
    Click,

    /// User dragged the agent to a new position
    Drag {
        /// New top-left x
        x: i32,
        /// New top-left y
        y: i32,
    },

    /// A global hotkey fired
    Hotkey {
        /// Logical action of the hotkey
        action: HotkeyAction,
    },

    // ============================================
    // Tutorial UI signals
    // ============================================
    /// "Next" pressed in the prompt bubble
    TutorialNext,

    /// "Skip tutorial" pressed
    TutorialSkip,

    /// "Resume" chosen on the resume prompt
    TutorialResume,

    /// "Start over" chosen on the resume prompt
    TutorialStartOver,

    /// Replay the tutorial from settings
    TutorialReplay,

    /// The side panel was opened from the UI
    OpenPanel,
}

impl AgentEvent {
    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Drag { .. } => "drag",
            Self::Hotkey { .. } => "hotkey",
            Self::TutorialNext => "tutorial-next",
            Self::TutorialSkip => "tutorial-skip",
            Self::TutorialResume => "tutorial-resume",
            Self::TutorialStartOver => "tutorial-start-over",
            Self::TutorialReplay => "tutorial-replay",
            Self::OpenPanel => "open-panel",
        }
    }
}
