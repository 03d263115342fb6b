//! Sparse partial-update patches for elements.
//!
//! Hosts mutate elements through `ElementPatch` rather than free-form
//! objects: every optional field is spelled out, and `apply` merges
//! field-by-field per variant, so the compiler covers every combination.
//! Variant-specific blocks are ignored when the element is another kind.

use crate::model::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A property name as recorded by the animation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    X,
    Y,
    Width,
    Height,
    Rotation,
    Opacity,
    Fill,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
    pub border_radius: Option<f32>,
    pub opacity: Option<f32>,
    pub shadow: Option<Shadow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypographyPatch {
    pub family: Option<String>,
    pub size: Option<f32>,
    pub weight: Option<u16>,
    pub align: Option<TextAlign>,
    pub line_height: Option<f32>,
    pub letter_spacing: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinePatch {
    pub points: Option<Vec<Point>>,
    pub arrow_start: Option<bool>,
    pub arrow_end: Option<bool>,
    pub dash: Option<Vec<f32>>,
    pub cap: Option<LineCap>,
    pub join: Option<LineJoin>,
    pub trim_start: Option<f32>,
    pub trim_end: Option<f32>,
}

/// A sparse update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub name: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub style: Option<StylePatch>,
    /// Content for Text/Button/ChatBubble elements.
    pub text: Option<String>,
    pub typography: Option<TypographyPatch>,
    pub line: Option<LinePatch>,
}

impl ElementPatch {
    /// A pure move patch.
    pub fn move_to(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    /// A pure resize patch. Negative dimensions clamp on apply.
    pub fn resize(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// Merge this patch into `el`. Width/height clamp to zero; variant
    /// blocks apply only to the matching kind.
    pub fn apply(&self, el: &mut DesignElement) {
        if let Some(name) = &self.name {
            el.name = name.clone();
        }
        if let Some(x) = self.x {
            el.x = x;
        }
        if let Some(y) = self.y {
            el.y = y;
        }
        if let Some(w) = self.width {
            el.width = w.max(0.0);
        }
        if let Some(h) = self.height {
            el.height = h.max(0.0);
        }
        if let Some(r) = self.rotation {
            el.rotation = r;
        }
        if let Some(v) = self.visible {
            el.visible = v;
        }
        if let Some(l) = self.locked {
            el.locked = l;
        }
        if let Some(style) = &self.style {
            apply_style(style, &mut el.style);
        }
        if let Some(text) = &self.text {
            match &mut el.kind {
                ElementKind::Text { content, .. } => *content = text.clone(),
                ElementKind::Button { label, .. } => *label = text.clone(),
                ElementKind::ChatBubble { text: t, .. } => *t = text.clone(),
                _ => {}
            }
        }
        if let Some(typo) = &self.typography {
            match &mut el.kind {
                ElementKind::Text { typography, .. }
                | ElementKind::Button { typography, .. }
                | ElementKind::ChatBubble { typography, .. } => apply_typography(typo, typography),
                _ => {}
            }
        }
        if let Some(line) = &self.line
            && let ElementKind::Line { options } = &mut el.kind
        {
            apply_line(line, options);
        }
    }

    /// Which animatable properties this patch touches. Feeds keyframe
    /// recording on manipulation end.
    pub fn touched(&self) -> SmallVec<[PropertyKey; 4]> {
        let mut keys = SmallVec::new();
        if self.x.is_some() {
            keys.push(PropertyKey::X);
        }
        if self.y.is_some() {
            keys.push(PropertyKey::Y);
        }
        if self.width.is_some() {
            keys.push(PropertyKey::Width);
        }
        if self.height.is_some() {
            keys.push(PropertyKey::Height);
        }
        if self.rotation.is_some() {
            keys.push(PropertyKey::Rotation);
        }
        if let Some(style) = &self.style {
            if style.opacity.is_some() {
                keys.push(PropertyKey::Opacity);
            }
            if style.fill.is_some() {
                keys.push(PropertyKey::Fill);
            }
        }
        keys
    }
}

fn apply_style(src: &StylePatch, dst: &mut Style) {
    if let Some(fill) = src.fill {
        dst.fill = fill;
    }
    if let Some(stroke) = src.stroke {
        dst.stroke = stroke;
    }
    if let Some(w) = src.stroke_width {
        dst.stroke_width = w.max(0.0);
    }
    if let Some(r) = src.border_radius {
        dst.border_radius = r.max(0.0);
    }
    if let Some(o) = src.opacity {
        dst.opacity = o.clamp(0.0, 1.0);
    }
    if let Some(shadow) = src.shadow {
        dst.shadow = Some(shadow);
    }
}

fn apply_typography(src: &TypographyPatch, dst: &mut Typography) {
    if let Some(family) = &src.family {
        dst.family = family.clone();
    }
    if let Some(size) = src.size {
        dst.size = size;
    }
    if let Some(weight) = src.weight {
        dst.weight = weight;
    }
    if let Some(align) = src.align {
        dst.align = align;
    }
    if let Some(lh) = src.line_height {
        dst.line_height = lh;
    }
    if let Some(ls) = src.letter_spacing {
        dst.letter_spacing = ls;
    }
}

fn apply_line(src: &LinePatch, dst: &mut LineOptions) {
    if let Some(points) = &src.points {
        dst.points = points.clone();
    }
    if let Some(a) = src.arrow_start {
        dst.arrow_start = a;
    }
    if let Some(a) = src.arrow_end {
        dst.arrow_end = a;
    }
    if let Some(dash) = &src.dash {
        dst.dash = dash.clone();
    }
    if let Some(cap) = src.cap {
        dst.cap = cap;
    }
    if let Some(join) = src.join {
        dst.join = join;
    }
    if let Some(t) = src.trim_start {
        dst.trim_start = t.clamp(0.0, 1.0);
    }
    if let Some(t) = src.trim_end {
        dst.trim_end = t.clamp(0.0, 1.0);
    }
}
