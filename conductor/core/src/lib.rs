//! Conductor Core - Behavior Engine for the Pinchy Desktop Agent
//!
//! This crate provides the orchestration logic behind the Pinchy overlay
//! agent, completely independent of any window system. It decides where the
//! agent goes, what mood it shows, when it dozes off and how the first-use
//! tutorial unfolds; a host process supplies the window, the screen geometry
//! and the settings store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Host Process                              │
//! │   Overlay window   Screen/cursor   Settings store   Presentation  │
//! └──────┬───────────────────┬──────────────┬──────────────▲─────────┘
//!        │                   │              │              │
//!        │        AgentEvent (up)           │     AgentMessage (down)
//!        │                   │              │              │
//! ┌──────┴───────────────────┴──────────────┴──────────────┴─────────┐
//! │                        CONDUCTOR CORE                             │
//! │  ┌─────────────────────────────────────────────────────────────┐ │
//! │  │                        Conductor                             │ │
//! │  │  ┌────────────┐  ┌────────────┐  ┌────────────────────────┐ │ │
//! │  │  │  Behavior  │  │   Sleep    │  │     Tutorial Guide     │ │ │
//! │  │  │ Scheduler  │  │   Cycle    │  │                        │ │ │
//! │  │  └─────┬──────┘  └─────┬──────┘  └───────────┬────────────┘ │ │
//! │  │        └───────────────┼─────────────────────┘              │ │
//! │  │                  AgentContext                                │ │
//! │  │    timers · animation · position · mood · interaction clock  │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: Owns the agent and dispatches timers and events
//! - [`AgentEvent`]: Input from the host (clicks, drags, hotkeys, tutorial UI)
//! - [`AgentMessage`]: Output to the presentation layer
//! - [`EngineRuntime`] / [`EngineHandle`]: Run the conductor on a tokio task
//!
//! # Quick Start
//!
//! ```ignore
//! use pinchy_conductor::{
//!     load_config, Conductor, EngineRuntime, Host, JsonFileStore, VirtualOverlay,
//!     VirtualScreen, Point, Size,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!
//!     let host = Host::new(
//!         VirtualOverlay::new(Point::default(), config.overlay.compact),
//!         VirtualScreen::new(Size::new(1920, 1080)),
//!         JsonFileStore::new("settings.json"),
//!         chrono::Utc::now(),
//!     );
//!     let (runtime, handle) = EngineRuntime::new(Conductor::new(config, host, tx), 64);
//!     tokio::spawn(runtime.run());
//!
//!     while let Some(message) = rx.recv().await {
//!         // Render message
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`animation`]: Single-flight position animation and easing
//! - [`avatar`]: Agent moods and shared state
//! - [`behavior`]: Idle fidgets and attention seeking
//! - [`clock`]: Time since last interaction
//! - [`conductor`]: The owning scheduler
//! - [`config`]: TOML/env configuration
//! - [`context`]: State shared by the orchestrators
//! - [`events`]: Events from the host
//! - [`geometry`]: Points, sizes and on-screen clamping
//! - [`messages`]: Messages to the presentation layer
//! - [`overlay`]: Overlay window and screen seams
//! - [`runtime`]: tokio actor hosting the conductor
//! - [`sleep`]: Sleep/wake cycle
//! - [`store`]: Persisted settings
//! - [`timers`]: Virtual-time timer queue
//! - [`tutorial`]: First-use tutorial
//!
//! # No Window-System Dependencies
//!
//! The engine never touches a real window or the wall clock. Everything runs
//! on host-supplied time, which keeps every state machine deterministic.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod avatar;
pub mod behavior;
pub mod clock;
pub mod conductor;
pub mod config;
pub mod context;
pub mod events;
pub mod geometry;
pub mod messages;
pub mod overlay;
pub mod runtime;
pub mod sleep;
pub mod store;
pub mod timers;
pub mod tutorial;

// Re-exports for convenience
pub use animation::{AnimationController, EasingFunction, MoveId, MoveOutcome};
pub use avatar::{AgentState, Mood};
pub use behavior::{pick_behavior, BehaviorKind, BehaviorScheduler, Direction, BEHAVIOR_CATALOG};
pub use clock::InteractionClock;
pub use conductor::{Conductor, ConductorSnapshot, Host};
pub use context::AgentContext;
pub use events::{AgentEvent, HotkeyAction};
pub use geometry::{Bounds, Point, Size};
pub use messages::AgentMessage;
pub use overlay::{Overlay, ScreenGeometry, VirtualOverlay, VirtualScreen};
pub use runtime::{EngineCommand, EngineHandle, EngineRuntime, RuntimeError};
pub use sleep::{SleepCycle, SleepPhase};
pub use store::{
    HotkeyBindings, JsonFileStore, MemoryStore, PersistedSettings, PetSettings, SettingsStore,
    StoreError, TutorialRecord,
};
pub use timers::{TimerId, TimerKind, TimerQueue};
pub use tutorial::{prompt_text, HintType, TutorialGuide, TutorialProgress, TOTAL_STEPS};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env,
    ConductorConfig, ConductorToml, ConfigError, ConfigOverrides, ConfigSource, Profile,
    ResumePolicy,
};
