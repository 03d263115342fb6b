//! Element data model for the artboard.
//!
//! A `DesignElement` is a positioned, stylable node: rectangle, circle,
//! text, line, button, chat bubble, or group. Coordinates are canvas-space
//! for top-level elements and **parent-relative** for group children (the
//! tree in [`crate::tree`] resolves absolute positions). Width and height
//! are never negative; construction helpers clamp.

use crate::id::ElementId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─── Color ───────────────────────────────────────────────────────────────

/// RGBA color stored as 4 × u8, serialized as a hex string (`#RRGGBB` or
/// `#RRGGBBAA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RGB`, `#RRGGBB`, or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex.strip_prefix('#').unwrap_or(hex).as_bytes();
        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 | 8 => {
                let mut ch = [0u8; 4];
                ch[3] = 255;
                for (i, pair) in bytes.chunks(2).enumerate() {
                    ch[i] = hex_val(pair[0])? << 4 | hex_val(pair[1])?;
                }
                Some(Self::rgba(ch[0], ch[1], ch[2], ch[3]))
            }
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color: {s}")))
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Drop shadow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub blur: f32,
    pub x: f32,
    pub y: f32,
    pub color: Color,
}

/// Visual style shared by every element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f32,
    pub border_radius: f32,
    /// 0.0 (transparent) .. 1.0 (opaque).
    pub opacity: f32,
    pub shadow: Option<Shadow>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Color::rgb(0xD9, 0xD9, 0xD9),
            stroke: Color::rgb(0x00, 0x00, 0x00),
            stroke_width: 0.0,
            border_radius: 0.0,
            opacity: 1.0,
            shadow: None,
        }
    }
}

// ─── Typography ──────────────────────────────────────────────────────────

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typography {
    pub family: String,
    pub size: f32,
    pub weight: u16, // 100..900
    pub align: TextAlign,
    pub line_height: f32,
    pub letter_spacing: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            family: "Inter".into(),
            size: 16.0,
            weight: 400,
            align: TextAlign::Center,
            line_height: 1.2,
            letter_spacing: 0.0,
        }
    }
}

// ─── Lines ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Settings specific to line elements: an ordered point list (element-local
/// coordinates) plus arrowhead/dash/cap/join/trim options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineOptions {
    pub points: Vec<Point>,
    pub arrow_start: bool,
    pub arrow_end: bool,
    /// Dash pattern (on/off run lengths). Empty = solid.
    pub dash: Vec<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Trim fractions in [0, 1]: how much of the path is drawn.
    pub trim_start: f32,
    pub trim_end: f32,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            arrow_start: false,
            arrow_end: false,
            dash: Vec::new(),
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            trim_start: 0.0,
            trim_end: 1.0,
        }
    }
}

// ─── Element kinds ───────────────────────────────────────────────────────

/// The element variants placeable on the artboard. Group children live in
/// the [`crate::tree::ElementTree`], not embedded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Rect,
    Circle,
    Text {
        content: String,
        typography: Typography,
    },
    Line {
        options: LineOptions,
    },
    Button {
        label: String,
        typography: Typography,
    },
    ChatBubble {
        text: String,
        typography: Typography,
        /// Whether the speech tail is drawn.
        tail: bool,
    },
    Group,
}

impl ElementKind {
    /// Short kind name, used for auto-generated ids and layer labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Text { .. } => "text",
            Self::Line { .. } => "line",
            Self::Button { .. } => "button",
            Self::ChatBubble { .. } => "chat_bubble",
            Self::Group => "group",
        }
    }
}

// ─── DesignElement ───────────────────────────────────────────────────────

/// A positioned, stylable node on the artboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignElement {
    pub id: ElementId,
    pub name: String,

    /// Top-left corner. Canvas-space for top-level elements,
    /// parent-relative for group children.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, clockwise.
    pub rotation: f32,

    pub visible: bool,
    /// Locked elements are not moved or resized by interaction, but can
    /// still be selected for inspection.
    pub locked: bool,

    pub style: Style,
    pub kind: ElementKind,
}

impl DesignElement {
    pub fn new(id: ElementId, name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id,
            name: name.into(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            visible: true,
            locked: false,
            style: Style::default(),
            kind,
        }
    }

    /// Set position and size. Negative dimensions clamp to zero.
    pub fn with_geometry(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.x = x;
        self.y = y;
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ElementKind::Group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert_eq!(c2.a, 0x80);
        assert_eq!(c2.to_hex(), "#FF000080");

        let short = Color::from_hex("fff").unwrap();
        assert_eq!(short, Color::rgb(255, 255, 255));
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn geometry_clamps_negative_dims() {
        let el = DesignElement::new(ElementId::intern("r1"), "Rect", ElementKind::Rect)
            .with_geometry(10.0, 20.0, -5.0, 30.0);
        assert_eq!(el.width, 0.0);
        assert_eq!(el.height, 30.0);
    }

    #[test]
    fn element_json_roundtrip() {
        let el = DesignElement::new(
            ElementId::intern("t1"),
            "Label",
            ElementKind::Text {
                content: "hello".into(),
                typography: Typography::default(),
            },
        )
        .with_geometry(5.0, 6.0, 120.0, 32.0);

        let json = serde_json::to_string(&el).unwrap();
        let back: DesignElement = serde_json::from_str(&json).unwrap();
        assert_eq!(el, back);
    }
}
