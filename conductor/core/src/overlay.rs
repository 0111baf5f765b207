//! Host Surface Seams
//!
//! The overlay window and the screen are owned by the host process. The
//! conductor talks to them through two small traits so that it can run
//! against a real window, a stdio bridge, or the in-memory doubles below.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::geometry::{Point, Size};

/// Handle to the transparent overlay window hosting the agent
pub trait Overlay: Send {
    /// Current top-left position
    fn position(&self) -> Point;
    /// Move the window
    fn set_position(&mut self, position: Point);
    /// Current window size
    fn size(&self) -> Size;
    /// Resize the window
    fn set_size(&mut self, size: Size);
}

/// Primary display geometry and live cursor position
pub trait ScreenGeometry: Send {
    /// Work area of the primary display
    fn work_area(&self) -> Size;
    /// Current cursor position
    fn cursor(&self) -> Point;
}

#[derive(Debug)]
struct OverlayFrame {
    position: Point,
    size: Size,
}

/// In-memory overlay; clones observe the same window
#[derive(Clone, Debug)]
pub struct VirtualOverlay {
    frame: Arc<RwLock<OverlayFrame>>,
}

impl VirtualOverlay {
    /// Overlay at `position` with `size`
    #[must_use]
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            frame: Arc::new(RwLock::new(OverlayFrame {
                position,
                size,
            })),
        }
    }
}

impl Overlay for VirtualOverlay {
    fn position(&self) -> Point {
        self.frame.read().position
    }

    fn set_position(&mut self, position: Point) {
        self.frame.write().position = position;
    }

    fn size(&self) -> Size {
        self.frame.read().size
    }

    fn set_size(&mut self, size: Size) {
        self.frame.write().size = size;
    }
}

#[derive(Debug)]
struct ScreenState {
    work_area: Size,
    cursor: Point,
}

/// In-memory screen; clones observe the same cursor
#[derive(Clone, Debug)]
pub struct VirtualScreen {
    state: Arc<RwLock<ScreenState>>,
}

impl VirtualScreen {
    /// Screen with the given work area, cursor at the origin
    #[must_use]
    pub fn new(work_area: Size) -> Self {
        Self {
            state: Arc::new(RwLock::new(ScreenState {
                work_area,
                cursor: Point::default(),
            })),
        }
    }

    /// Move the cursor
    pub fn set_cursor(&self, cursor: Point) {
        self.state.write().cursor = cursor;
    }

    /// Change the work area (display reconfigured)
    pub fn set_work_area(&self, work_area: Size) {
        self.state.write().work_area = work_area;
    }
}

impl ScreenGeometry for VirtualScreen {
    fn work_area(&self) -> Size {
        self.state.read().work_area
    }

    fn cursor(&self) -> Point {
        self.state.read().cursor
    }
}
