//! Tutorial step table and prompt text

use serde::{Deserialize, Serialize};

use crate::avatar::Mood;
use crate::events::{AgentEvent, HotkeyAction};
use crate::store::HotkeyBindings;

/// Number of tutorial steps
pub const TOTAL_STEPS: u8 = 10;

/// Step the cursor-follow protocol runs on
pub const FOLLOW_STEP: u8 = 4;

/// Cues shown when the user seems stuck on a step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintType {
    /// Pulse the agent to invite a click
    Pulse,
    /// Arrow showing where to move the cursor
    Direction,
    /// Show the hotkey on a keycap
    Hotkey,
    /// Point at the panel button
    OpenPanel,
}

/// What completes a step (besides "next", which completes any step)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepTrigger {
    /// Completes on its own timer
    Auto,
    /// Only "next"
    Next,
    /// A click on the agent
    Click,
    /// The cursor-follow protocol
    FollowCursor,
    /// A hotkey bound to this action
    Hotkey(HotkeyAction),
    /// The panel hotkey or the panel being opened from the UI
    PanelOpened,
}

impl StepTrigger {
    /// Whether `event` completes a step with this trigger
    #[must_use]
    pub fn accepts(&self, event: &AgentEvent) -> bool {
        match (self, event) {
            (_, AgentEvent::TutorialNext) => true,
            (Self::Click, AgentEvent::Click) => true,
            (Self::Hotkey(wanted), AgentEvent::Hotkey { action }) => wanted == action,
            (
                Self::PanelOpened,
                AgentEvent::Hotkey {
                    action: HotkeyAction::TogglePanel,
                }
                | AgentEvent::OpenPanel,
            ) => true,
            _ => false,
        }
    }
}

/// One row of the step table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepDescriptor {
    /// Step index, 1-based
    pub index: u8,
    /// Prompt template; `{toggleChat}` and `{togglePanel}` expand to hotkeys
    pub prompt: &'static str,
    /// Pause between leaving the previous step and showing this one
    pub delay_before_ms: u64,
    /// Hint shown if the step is still current after the delay
    pub fallback: Option<(u64, HintType)>,
    /// Advance on its own after this delay
    pub auto_advance_ms: Option<u64>,
    /// What completes the step
    pub trigger: StepTrigger,
    /// Mood set on activation
    pub mood: Option<Mood>,
}

const fn step(
    index: u8,
    prompt: &'static str,
    delay_before_ms: u64,
    fallback: Option<(u64, HintType)>,
    auto_advance_ms: Option<u64>,
    trigger: StepTrigger,
) -> StepDescriptor {
    StepDescriptor {
        index,
        prompt,
        delay_before_ms,
        fallback,
        auto_advance_ms,
        trigger,
        mood: None,
    }
}

/// The tutorial, in order
pub const STEPS: [StepDescriptor; TOTAL_STEPS as usize] = [
    step(
        1,
        "Hi, I'm Pinchy! Let me show you around.",
        500,
        None,
        Some(2500),
        StepTrigger::Auto,
    ),
    step(
        2,
        "Click me to say hello!",
        300,
        Some((5000, HintType::Pulse)),
        None,
        StepTrigger::Click,
    ),
    step(
        3,
        "You can drag me anywhere on your screen.",
        300,
        None,
        None,
        StepTrigger::Next,
    ),
    step(
        4,
        "Now move your cursor away from me...",
        300,
        Some((6000, HintType::Direction)),
        None,
        StepTrigger::FollowCursor,
    ),
    step(
        5,
        "If you leave me alone for a while, I doze off. Any interaction wakes me up.",
        300,
        None,
        Some(5000),
        StepTrigger::Auto,
    ),
    step(
        6,
        "Every now and then I'll come find you if you wander off.",
        300,
        None,
        None,
        StepTrigger::Next,
    ),
    step(
        7,
        "Press {toggleChat} to open the chat.",
        300,
        Some((8000, HintType::Hotkey)),
        None,
        StepTrigger::Hotkey(HotkeyAction::ToggleChat),
    ),
    step(
        8,
        "Ask me anything in the chat.",
        300,
        None,
        None,
        StepTrigger::Next,
    ),
    step(
        9,
        "Press {togglePanel} to open the side panel.",
        300,
        Some((8000, HintType::OpenPanel)),
        None,
        StepTrigger::PanelOpened,
    ),
    StepDescriptor {
        mood: Some(Mood::Proud),
        ..step(
            10,
            "You're all set! I'll be around.",
            300,
            None,
            Some(4000),
            StepTrigger::Auto,
        )
    },
];

/// Look up a step (1-based)
#[must_use]
pub fn descriptor(step: u8) -> Option<&'static StepDescriptor> {
    STEPS.get(usize::from(step).checked_sub(1)?)
}

/// Human-readable form of an accelerator string
///
/// `CommandOrControl+Shift+Space` becomes `Ctrl+Shift+Space`.
#[must_use]
pub fn display_accelerator(accelerator: &str) -> String {
    accelerator
        .split('+')
        .map(|key| match key.trim() {
            "CommandOrControl" | "CmdOrCtrl" | "CmdOrControl" | "Control" => "Ctrl",
            "Command" | "Cmd" => "Cmd",
            other => other,
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Resolve the prompt for `step` against the current hotkey bindings
#[must_use]
pub fn prompt_text(step: u8, hotkeys: &HotkeyBindings) -> String {
    let Some(desc) = descriptor(step) else {
        return String::new();
    };
    desc.prompt
        .replace(
            "{toggleChat}",
            &display_accelerator(hotkeys.binding(HotkeyAction::ToggleChat)),
        )
        .replace(
            "{togglePanel}",
            &display_accelerator(hotkeys.binding(HotkeyAction::TogglePanel)),
        )
}
