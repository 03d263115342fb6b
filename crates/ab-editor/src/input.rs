//! Input abstraction layer.
//!
//! Normalizes host pointer events (mouse, touch, stylus) into the small
//! surface the interaction controller consumes. Coordinates are
//! screen-space; the controller maps them into canvas space using its pan
//! offset and zoom. No pointer path is fallible — hosts that cannot produce
//! a coordinate (e.g. a missing bounding rect) pass the (0, 0) default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    /// Whether the multi-select / marquee modifier is held.
    pub fn multi_select(&self) -> bool {
        self.shift
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

/// A normalized pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x: sanitize(x),
            y: sanitize(y),
            ..Default::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn secondary(mut self) -> Self {
        self.button = PointerButton::Secondary;
        self
    }
}

/// Degenerate coordinates (NaN/infinite) degrade to 0.0 rather than
/// poisoning downstream geometry.
fn sanitize(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}
