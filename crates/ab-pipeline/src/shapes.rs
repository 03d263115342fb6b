//! Intermediate pipeline artifacts and their validators.
//!
//! `HighLevelShape` is the rough plan (what goes roughly where);
//! `LowLevelShape` is the detailed settings object produced per shape.
//! Each high-level shape maps 1:1 by index to a low-level shape and
//! ultimately to one `DesignElement`.
//!
//! Validators are stateless and accumulation-style: they return every
//! problem as a human-readable string instead of failing on the first,
//! so callers can report all issues at once. `repair_low_level_shape` is
//! total: any input comes back structurally valid.

use ab_core::model::{LineOptions, Style, Typography};
use serde::{Deserialize, Serialize};

/// Shape types the placement stage knows how to map.
pub const KNOWN_SHAPE_TYPES: &[&str] = &[
    "rect",
    "rectangle",
    "circle",
    "ellipse",
    "text",
    "line",
    "button",
    "chat_bubble",
];

/// Rough plan entry from the structuring stage. Position is required;
/// everything else is a hint the detailing stage may refine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighLevelShape {
    #[serde(rename = "type")]
    pub shape_type: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    /// Content hint for text-bearing shapes.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

/// Text settings block carried by text-bearing low-level shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub content: String,
    #[serde(default)]
    pub typography: Typography,
}

/// Detailed per-shape settings from the detailing stage. Every field the
/// service may omit is optional; `repair_low_level_shape` fills the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LowLevelShape {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shape_type: Option<String>,
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub rotation: Option<f32>,
    #[serde(default)]
    pub text: Option<TextBlock>,
    #[serde(default)]
    pub line: Option<LineOptions>,
}

pub const DEFAULT_SHAPE_SIZE: f32 = 100.0;

// ─── Validators ─────────────────────────────────────────────────────────

/// Structural check for one plan entry: a known type and a finite
/// position, at minimum.
pub fn validate_high_level_shape(shape: &HighLevelShape) -> Vec<String> {
    let mut errors = Vec::new();
    if shape.shape_type.trim().is_empty() {
        errors.push("missing shape type".to_string());
    } else if !KNOWN_SHAPE_TYPES.contains(&shape.shape_type.to_lowercase().as_str()) {
        errors.push(format!("unknown shape type '{}'", shape.shape_type));
    }
    if !shape.x.is_finite() || !shape.y.is_finite() {
        errors.push(format!(
            "non-finite position ({}, {})",
            shape.x, shape.y
        ));
    }
    if let Some(w) = shape.width
        && (!w.is_finite() || w < 0.0)
    {
        errors.push(format!("invalid width {w}"));
    }
    if let Some(h) = shape.height
        && (!h.is_finite() || h < 0.0)
    {
        errors.push(format!("invalid height {h}"));
    }
    errors
}

/// Filters a parsed plan down to its valid subset. Invalid entries are
/// dropped from the plan; their problems come back as indexed error
/// strings so the pipeline can log what was discarded.
pub fn validate_high_level_array(
    shapes: Vec<HighLevelShape>,
) -> (Vec<HighLevelShape>, Vec<String>) {
    let mut valid = Vec::with_capacity(shapes.len());
    let mut errors = Vec::new();
    for (index, shape) in shapes.into_iter().enumerate() {
        let problems = validate_high_level_shape(&shape);
        if problems.is_empty() {
            valid.push(shape);
        } else {
            for problem in problems {
                errors.push(format!("shape {index}: {problem}"));
            }
        }
    }
    (valid, errors)
}

/// Required-field check on a detailing result. An empty list means the
/// shape is usable as-is; otherwise it goes through repair.
pub fn validate_low_level_shape(shape: &LowLevelShape) -> Vec<String> {
    let mut errors = Vec::new();
    if shape.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        errors.push("missing name".to_string());
    }
    match shape.shape_type.as_deref() {
        None => errors.push("missing shape type".to_string()),
        Some(t) if !KNOWN_SHAPE_TYPES.contains(&t.to_lowercase().as_str()) => {
            errors.push(format!("unknown shape type '{t}'"));
        }
        Some(_) => {}
    }
    if shape.style.is_none() {
        errors.push("missing style".to_string());
    }
    match shape.dimensions {
        None => errors.push("missing dimensions".to_string()),
        Some(d) if !(d.width.is_finite() && d.height.is_finite()) || d.width < 0.0 || d.height < 0.0 => {
            errors.push(format!("invalid dimensions {}x{}", d.width, d.height));
        }
        Some(_) => {}
    }
    errors
}

/// Total repair: fills every missing field with a documented default so
/// the result always passes [`validate_low_level_shape`]. Never discards
/// data the service did provide.
pub fn repair_low_level_shape(mut shape: LowLevelShape) -> LowLevelShape {
    if shape.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        shape.name = Some("Generated shape".to_string());
    }
    let known = shape
        .shape_type
        .as_deref()
        .is_some_and(|t| KNOWN_SHAPE_TYPES.contains(&t.to_lowercase().as_str()));
    if !known {
        shape.shape_type = Some("rect".to_string());
    }
    if shape.style.is_none() {
        shape.style = Some(Style::default());
    }
    let dims_ok = shape.dimensions.is_some_and(|d| {
        d.width.is_finite() && d.height.is_finite() && d.width >= 0.0 && d.height >= 0.0
    });
    if !dims_ok {
        shape.dimensions = Some(Dimensions {
            width: DEFAULT_SHAPE_SIZE,
            height: DEFAULT_SHAPE_SIZE,
        });
    }
    if shape.scale.is_none_or(|s| !s.is_finite() || s <= 0.0) {
        shape.scale = Some(1.0);
    }
    if shape.rotation.is_none_or(|r| !r.is_finite()) {
        shape.rotation = Some(0.0);
    }
    shape
}

// ─── JSON extraction from free-form service replies ─────────────────────

/// Pulls the first balanced JSON array out of free-form text. The service
/// wraps its payloads in prose and code fences more often than not.
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_balanced(text, '[', ']')
}

/// Pulls the first balanced JSON object out of free-form text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_balanced(text, '{', '}')
}

fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + offset + ch.len_utf8()]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan(shape_type: &str, x: f32, y: f32) -> HighLevelShape {
        HighLevelShape {
            shape_type: shape_type.to_string(),
            x,
            y,
            width: None,
            height: None,
            content: None,
        }
    }

    #[test]
    fn high_level_array_keeps_valid_subset() {
        let shapes = vec![
            plan("rect", 10.0, 10.0),
            plan("hexagon", 0.0, 0.0),
            plan("circle", f32::NAN, 5.0),
            plan("text", 50.0, 80.0),
        ];
        let (valid, errors) = validate_high_level_array(shapes);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].shape_type, "rect");
        assert_eq!(valid[1].shape_type, "text");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("shape 1"));
        assert!(errors[1].contains("shape 2"));
    }

    #[test]
    fn repair_of_empty_shape_passes_validation() {
        let repaired = repair_low_level_shape(LowLevelShape::default());
        assert_eq!(validate_low_level_shape(&repaired), Vec::<String>::new());
        assert_eq!(repaired.shape_type.as_deref(), Some("rect"));
        assert_eq!(
            repaired.dimensions,
            Some(Dimensions {
                width: DEFAULT_SHAPE_SIZE,
                height: DEFAULT_SHAPE_SIZE,
            })
        );
    }

    #[test]
    fn repair_preserves_provided_fields() {
        let shape = LowLevelShape {
            name: Some("Hero card".to_string()),
            dimensions: Some(Dimensions {
                width: 320.0,
                height: 180.0,
            }),
            ..LowLevelShape::default()
        };
        let repaired = repair_low_level_shape(shape);
        assert_eq!(repaired.name.as_deref(), Some("Hero card"));
        assert_eq!(repaired.dimensions.unwrap().width, 320.0);
    }

    #[test]
    fn extracts_array_from_fenced_prose() {
        let reply = "Here is your plan:\n```json\n[{\"type\": \"rect\", \"x\": 1, \"y\": 2}]\n```\nEnjoy!";
        let json = extract_json_array(reply).unwrap();
        let parsed: Vec<HighLevelShape> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].x, 1.0);
    }

    #[test]
    fn extraction_ignores_brackets_inside_strings() {
        let reply = r#"{"name": "odd ] name", "shape_type": "rect"}"#;
        let json = extract_json_object(reply).unwrap();
        assert_eq!(json, reply);
    }

    #[test]
    fn extraction_returns_none_without_payload() {
        assert_eq!(extract_json_array("no json here"), None);
        assert_eq!(extract_json_object("still nothing"), None);
    }
}
