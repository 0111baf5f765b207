//! JSON-lines Host Bridge
//!
//! The daemon speaks one JSON object per line. Inbound lines are either host
//! geometry updates (`cursor`, `work-area`) or [`AgentEvent`]s. Outbound lines
//! are either [`AgentMessage`]s or overlay window commands that the real
//! window process applies.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pinchy_conductor::{AgentEvent, AgentMessage, Overlay, Point, Size, VirtualScreen};

/// Geometry updates from the host
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostInput {
    /// Cursor moved
    Cursor { x: i32, y: i32 },
    /// Primary display work area changed
    WorkArea { width: u32, height: u32 },
}

impl HostInput {
    /// Apply to the shared screen
    pub fn apply(&self, screen: &VirtualScreen) {
        match *self {
            Self::Cursor { x, y } => screen.set_cursor(Point::new(x, y)),
            Self::WorkArea { width, height } => screen.set_work_area(Size::new(width, height)),
        }
    }
}

/// One inbound line
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    /// Geometry update, handled by the bridge
    Host(HostInput),
    /// Event for the conductor
    Event(AgentEvent),
}

/// Parse an inbound line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<Inbound>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Window commands for the overlay process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum OverlayCommand {
    /// Move the window
    OverlayPosition { x: i32, y: i32 },
    /// Resize the window
    OverlaySize { width: u32, height: u32 },
}

/// One outbound line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    /// Presentation message from the conductor
    Message(AgentMessage),
    /// Window command
    Overlay(OverlayCommand),
}

impl Outbound {
    /// Serialize as a single line, without the newline
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Overlay that forwards every change as an [`OverlayCommand`]
///
/// Remembers the last commanded frame so the conductor can read it back.
#[derive(Debug)]
pub struct LineOverlay {
    position: Point,
    size: Size,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl LineOverlay {
    pub fn new(position: Point, size: Size, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { position, size, tx }
    }

    fn send(&self, command: OverlayCommand) {
        if self.tx.send(Outbound::Overlay(command)).is_err() {
            tracing::trace!(?command, "Output closed, dropping overlay command");
        }
    }
}

impl Overlay for LineOverlay {
    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        if position == self.position {
            return;
        }
        self.position = position;
        self.send(OverlayCommand::OverlayPosition {
            x: position.x,
            y: position.y,
        });
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.send(OverlayCommand::OverlaySize {
            width: size.width,
            height: size.height,
        });
    }
}
