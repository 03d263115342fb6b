//! Axis-aligned bounds and canvas clamping.
//!
//! Pure geometry — no side effects, no error paths. Malformed negative
//! dimensions pass through unchanged; callers sanitize at construction.

use crate::model::DesignElement;
use serde::{Deserialize, Serialize};

/// The fixed-size artboard coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 3840.0,
            height: 2160.0,
        }
    }
}

impl Canvas {
    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Clamp a top-left position so an element of the given size stays
    /// fully inside the canvas: `0 ≤ x ≤ width − w`, same for y.
    pub fn clamp_position(&self, x: f32, y: f32, w: f32, h: f32) -> (f32, f32) {
        (
            x.clamp(0.0, (self.width - w).max(0.0)),
            y.clamp(0.0, (self.height - h).max(0.0)),
        )
    }
}

/// Edges and center of an element's axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl Bounds {
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            right: x + width,
            top: y,
            bottom: y + height,
            center_x: x + width / 2.0,
            center_y: y + height / 2.0,
        }
    }

    pub fn of(el: &DesignElement) -> Self {
        Self::from_rect(el.x, el.y, el.width, el.height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.left && px <= self.right && py >= self.top && py <= self.bottom
    }

    /// Full containment of `other` (marquee selection semantics —
    /// containment, not intersection).
    pub fn contains_rect(&self, other: &Bounds) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }
}
