//! Runtime Actor
//!
//! Hosts a [`Conductor`] on a tokio task. The task is the conductor's only
//! owner: commands arrive over an mpsc channel and are handled one at a time,
//! and between commands the task sleeps until the next timer deadline.
//!
//! Engine milliseconds are measured from the tokio [`Instant`] at which
//! [`EngineRuntime::run`] starts, so paused tokio time drives the engine
//! deterministically in tests.

use std::future::Future;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};

use crate::animation::MoveOutcome;
use crate::conductor::{Conductor, ConductorSnapshot};
use crate::events::AgentEvent;
use crate::geometry::Point;

/// Errors from an [`EngineHandle`]
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime task has stopped
    #[error("Engine runtime has stopped")]
    Closed,
}

/// Commands accepted by the runtime
#[derive(Debug)]
pub enum EngineCommand {
    /// Deliver a host event
    Event(AgentEvent),
    /// Move the agent and report the outcome
    MoveTo {
        /// Destination
        target: Point,
        /// Duration of the move
        duration_ms: u64,
        /// Where to report the outcome
        reply: oneshot::Sender<MoveOutcome>,
    },
    /// Report the engine state
    Snapshot(oneshot::Sender<ConductorSnapshot>),
    /// Stop the runtime
    Shutdown,
}

/// Cloneable handle to a running engine
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Deliver a host event
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Closed`] if the runtime has stopped.
    pub async fn send(&self, event: AgentEvent) -> Result<(), RuntimeError> {
        self.tx
            .send(EngineCommand::Event(event))
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    /// Move the agent; resolves once the move settles
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Closed`] if the runtime stops first.
    pub async fn move_to(
        &self,
        target: Point,
        duration_ms: u64,
    ) -> Result<MoveOutcome, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::MoveTo {
                target,
                duration_ms,
                reply,
            })
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// Current engine state
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Closed`] if the runtime has stopped.
    pub async fn snapshot(&self) -> Result<ConductorSnapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Snapshot(reply))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    /// Ask the runtime to stop
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Closed`] if the runtime had already stopped.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| RuntimeError::Closed)
    }
}

/// Tokio task owning a [`Conductor`]
#[derive(Debug)]
pub struct EngineRuntime {
    conductor: Conductor,
    rx: mpsc::Receiver<EngineCommand>,
}

impl EngineRuntime {
    /// Wrap `conductor`; `capacity` bounds the command queue
    #[must_use]
    pub fn new(conductor: Conductor, capacity: usize) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { conductor, rx }, EngineHandle { tx })
    }

    /// Run until shutdown or until every handle is dropped
    ///
    /// Boots the conductor if needed and returns it when done.
    pub async fn run(mut self) -> Conductor {
        let origin = Instant::now();
        let base_ms = self.conductor.now_ms();
        let engine_now = move || {
            let elapsed = u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX);
            base_ms.saturating_add(elapsed)
        };

        self.conductor.boot();
        tracing::info!("Engine runtime started");

        loop {
            self.conductor.advance_to(engine_now());
            let wake_at = self
                .conductor
                .next_deadline()
                .map(|deadline| origin + Duration::from_millis(deadline.saturating_sub(base_ms)));

            tokio::select! {
                command = self.rx.recv() => {
                    self.conductor.advance_to(engine_now());
                    match command {
                        None | Some(EngineCommand::Shutdown) => break,
                        Some(command) => self.handle(command),
                    }
                }
                () = sleep_until(wake_at) => {}
            }
        }

        tracing::info!(now_ms = self.conductor.now_ms(), "Engine runtime stopped");
        self.conductor
    }

    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Event(event) => self.conductor.handle_event(event),
            EngineCommand::MoveTo {
                target,
                duration_ms,
                reply,
            } => {
                self.conductor.move_to_notify(target, duration_ms, reply);
            }
            EngineCommand::Snapshot(reply) => {
                let _ = reply.send(self.conductor.snapshot());
            }
            EngineCommand::Shutdown => {}
        }
    }
}

fn sleep_until(at: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::Host;
    use crate::config::ConductorConfig;
    use crate::geometry::Size;
    use crate::messages::AgentMessage;
    use crate::overlay::{VirtualOverlay, VirtualScreen};
    use crate::store::{MemoryStore, PersistedSettings};
    use chrono::{DateTime, Utc};

    fn runtime() -> (
        EngineRuntime,
        EngineHandle,
        mpsc::UnboundedReceiver<AgentMessage>,
    ) {
        let mut settings = PersistedSettings::default();
        settings.tutorial.completed_at = Some(DateTime::<Utc>::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Host::new(
            VirtualOverlay::new(Point::default(), Size::new(160, 160)),
            VirtualScreen::new(Size::new(1920, 1080)),
            MemoryStore::new(settings),
            DateTime::<Utc>::default(),
        );
        let config = ConductorConfig {
            seed: Some(5),
            ..Default::default()
        };
        let (runtime, handle) = EngineRuntime::new(Conductor::new(config, host, tx), 16);
        (runtime, handle, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_runs_on_tokio_time() {
        let (runtime, handle, mut rx) = runtime();
        let task = tokio::spawn(runtime.run());

        handle.send(AgentEvent::TutorialReplay).await.unwrap();
        // 800 ms to center, then 500 ms before step 1
        tokio::time::sleep(Duration::from_millis(1400)).await;

        let mut steps = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let AgentMessage::TutorialStep { step, .. } = msg {
                steps.push(step);
            }
        }
        assert_eq!(steps, vec![1]);

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.tutorial.is_active);
        assert_eq!(snapshot.tutorial.current_step, Some(1));

        handle.shutdown().await.unwrap();
        let conductor = task.await.unwrap();
        assert!(conductor.now_ms() >= 1400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_to_resolves_when_move_completes() {
        let (runtime, handle, _rx) = runtime();
        let task = tokio::spawn(runtime.run());

        let outcome = handle.move_to(Point::new(300, 300), 500).await.unwrap();
        assert_eq!(outcome, MoveOutcome::Completed);
        assert_eq!(handle.snapshot().await.unwrap().position, Point::new(300, 300));

        drop(handle);
        let conductor = task.await.unwrap();
        assert_eq!(conductor.position(), Point::new(300, 300));
    }

    #[tokio::test]
    async fn test_handle_reports_closed_runtime() {
        let (runtime, handle, _rx) = runtime();
        drop(runtime);
        assert!(matches!(
            handle.send(AgentEvent::Click).await,
            Err(RuntimeError::Closed)
        ));
    }
}
