//! Screen Geometry Primitives
//!
//! Pixel-space points and sizes shared by every orchestrator, plus the
//! clamping rules that keep the overlay inside the primary work area.

use serde::{Deserialize, Serialize};

/// A point in screen pixels (origin top-left of the primary work area)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl Point {
    /// Create a point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by an offset, saturating at the `i32` range
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

/// A size in screen pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Offset from a box's top-left corner to its center
    #[must_use]
    pub fn half(self) -> (i32, i32) {
        (to_i32(self.width / 2), to_i32(self.height / 2))
    }
}

/// Placement rules for a box of `window` size inside `work_area`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    /// Primary display work area
    pub work_area: Size,
    /// Size of the overlay window being placed
    pub window: Size,
}

impl Bounds {
    /// Create placement bounds
    #[must_use]
    pub const fn new(work_area: Size, window: Size) -> Self {
        Self { work_area, window }
    }

    /// Largest legal top-left coordinate
    fn max_origin(self) -> Point {
        Point::new(
            (to_i32(self.work_area.width) - to_i32(self.window.width)).max(0),
            (to_i32(self.work_area.height) - to_i32(self.window.height)).max(0),
        )
    }

    /// Clamp a top-left position so the window stays fully on screen
    #[must_use]
    pub fn clamp(self, p: Point) -> Point {
        let max = self.max_origin();
        Point::new(p.x.clamp(0, max.x), p.y.clamp(0, max.y))
    }

    /// Top-left position that centers the window in the work area
    #[must_use]
    pub fn center(self) -> Point {
        let max = self.max_origin();
        Point::new(max.x / 2, max.y / 2)
    }

    /// Resting position: bottom-right corner, `margin` pixels in from the edges
    #[must_use]
    pub fn resting(self, margin: i32) -> Point {
        let max = self.max_origin();
        self.clamp(Point::new(
            max.x.saturating_sub(margin),
            max.y.saturating_sub(margin),
        ))
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}
