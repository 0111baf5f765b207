//! Shared harness for the engine integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use pinchy_conductor::{
    AgentEvent, AgentMessage, Conductor, ConductorConfig, Host, MemoryStore, PersistedSettings,
    Point, Size, VirtualOverlay, VirtualScreen,
};

/// Work area used by every scenario
pub const WORK_AREA: Size = Size::new(1920, 1080);

/// A conductor wired to in-memory collaborators, with a message log
pub struct Harness {
    pub conductor: Conductor,
    pub store: MemoryStore,
    pub screen: VirtualScreen,
    pub overlay: VirtualOverlay,
    rx: mpsc::UnboundedReceiver<AgentMessage>,
    pub log: Vec<AgentMessage>,
}

impl Harness {
    pub fn new(settings: PersistedSettings) -> Self {
        Self::with_config(settings, ConductorConfig::default())
    }

    pub fn with_config(settings: PersistedSettings, mut config: ConductorConfig) -> Self {
        config.seed.get_or_insert(1234);
        let store = MemoryStore::new(settings);
        let screen = VirtualScreen::new(WORK_AREA);
        let overlay = VirtualOverlay::new(Point::default(), config.overlay.compact);
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Host::new(
            overlay.clone(),
            screen.clone(),
            store.clone(),
            DateTime::<Utc>::default(),
        );
        Self {
            conductor: Conductor::new(config, host, tx),
            store,
            screen,
            overlay,
            rx,
            log: Vec::new(),
        }
    }

    /// Settings for an install that already finished the tutorial
    pub fn completed_settings() -> PersistedSettings {
        let mut settings = PersistedSettings::default();
        settings.tutorial.completed_at = Some(DateTime::<Utc>::default());
        settings
    }

    /// Collect messages emitted since the last call
    pub fn drain(&mut self) -> Vec<AgentMessage> {
        let mut fresh = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            fresh.push(msg);
        }
        self.log.extend(fresh.iter().cloned());
        fresh
    }

    pub fn advance_to(&mut self, now_ms: u64) -> Vec<AgentMessage> {
        self.conductor.advance_to(now_ms);
        self.drain()
    }

    pub fn advance(&mut self, delta_ms: u64) -> Vec<AgentMessage> {
        self.conductor.advance(delta_ms);
        self.drain()
    }

    pub fn send(&mut self, event: AgentEvent) -> Vec<AgentMessage> {
        self.conductor.handle_event(event);
        self.drain()
    }

    pub fn persisted_step(&self) -> u8 {
        self.store.snapshot().tutorial.last_step
    }
}

/// Step numbers of the `tutorial-step` messages in `messages`
pub fn steps(messages: &[AgentMessage]) -> Vec<u8> {
    messages
        .iter()
        .filter_map(|m| match m {
            AgentMessage::TutorialStep { step, .. } => Some(*step),
            _ => None,
        })
        .collect()
}

/// Whether any step or hint message is in `messages`
pub fn has_step_or_hint(messages: &[AgentMessage]) -> bool {
    messages.iter().any(|m| {
        matches!(
            m,
            AgentMessage::TutorialStep { .. } | AgentMessage::TutorialHint { .. }
        )
    })
}
