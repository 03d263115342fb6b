//! Alignment snap detection and guide-line synthesis.
//!
//! Given a candidate top-left position for a moving element, decide per axis
//! whether to pull it onto a nearby alignment target — canvas edges, the
//! canvas center, or sibling edges/centers/stacking positions — and produce
//! the guide lines the host renders for feedback.
//!
//! The snap tolerance is screen-constant: the canvas-space threshold is
//! `base_threshold / zoom`, so zooming in shrinks the pull distance.
//!
//! Tie-break: axes are decided independently; within one axis the **nearest
//! candidate** wins (smallest correction), with ties broken by category
//! order (canvas edge, canvas center, sibling edge/stack, sibling center)
//! and then sibling list order. One guide is emitted per snapped axis.

use ab_core::bounds::{Bounds, Canvas};
use ab_core::id::ElementId;
use ab_core::model::{Color, Point};
use serde::{Deserialize, Serialize};

/// Snap pull distance in canvas pixels at zoom 1.
pub const BASE_SNAP_THRESHOLD: f32 = 8.0;

/// Extra length added to each end of a sibling-alignment guide.
pub const GUIDE_PADDING: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct SnapConfig {
    pub base_threshold: f32,
    pub zoom: f32,
    /// Canvas-edge and canvas-center checks only run when set.
    pub canvas: Option<Canvas>,
    pub guide_padding: f32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            base_threshold: BASE_SNAP_THRESHOLD,
            zoom: 1.0,
            canvas: Some(Canvas::default()),
            guide_padding: GUIDE_PADDING,
        }
    }
}

impl SnapConfig {
    /// Effective canvas-space threshold at the current zoom.
    pub fn threshold(&self) -> f32 {
        self.base_threshold / self.zoom.max(0.01)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideAxis {
    /// A vertical line (constant x) produced by an x-axis snap.
    Vertical,
    /// A horizontal line (constant y) produced by a y-axis snap.
    Horizontal,
}

/// Where a snap match came from; drives the guide color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideKind {
    CanvasEdge,
    CanvasCenter,
    ElementEdge,
    ElementCenter,
}

impl GuideKind {
    pub fn color(&self) -> Color {
        match self {
            Self::CanvasEdge => Color::rgb(0x38, 0xBD, 0xF8),
            Self::CanvasCenter => Color::rgb(0xF4, 0x72, 0xB6),
            Self::ElementEdge => Color::rgb(0xFB, 0x71, 0x85),
            Self::ElementCenter => Color::rgb(0xA7, 0x8B, 0xFA),
        }
    }

    /// Category rank for tie-breaking equal-distance candidates.
    fn rank(&self) -> u8 {
        match self {
            Self::CanvasEdge => 0,
            Self::CanvasCenter => 1,
            Self::ElementEdge => 2,
            Self::ElementCenter => 3,
        }
    }
}

/// A transient alignment line, recomputed every pointer-move and replaced
/// wholesale. The id is stable only within one frame (render keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapGuide {
    pub id: String,
    pub axis: GuideAxis,
    /// Canvas coordinate of the line (x for vertical, y for horizontal).
    pub position: f32,
    /// Extent along the perpendicular axis.
    pub start: f32,
    pub end: f32,
    pub kind: GuideKind,
    /// Marker points drawn along the guide (aligned edge midpoints).
    pub markers: Vec<Point>,
    /// Bounds of the sibling the guide aligns to, when any.
    pub target: Option<Bounds>,
}

/// Outcome of one detection pass. `x`/`y` are set only when they differ
/// from the proposed coordinates; absence means "use the proposed value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub guides: Vec<SnapGuide>,
}

struct Candidate {
    /// The corrected top-left coordinate on this axis.
    snapped: f32,
    /// |proposed edge − target| — the pull distance.
    distance: f32,
    kind: GuideKind,
    /// Canvas coordinate of the guide line.
    line: f32,
    target: Option<Bounds>,
}

/// Detect snaps for `moving` (excluded from sibling checks by id) proposed
/// at `(proposed_x, proposed_y)`. `siblings` carry canvas-space bounds of
/// every other **visible** element; callers filter hidden ones.
pub fn detect_snaps(
    moving: ElementId,
    width: f32,
    height: f32,
    proposed_x: f32,
    proposed_y: f32,
    siblings: &[(ElementId, Bounds)],
    config: &SnapConfig,
    enabled: bool,
) -> SnapResult {
    if !enabled {
        return SnapResult::default();
    }

    let threshold = config.threshold();
    let mb = Bounds::from_rect(proposed_x, proposed_y, width, height);
    let mut best_x: Option<Candidate> = None;
    let mut best_y: Option<Candidate> = None;

    if let Some(canvas) = &config.canvas {
        let (ccx, ccy) = canvas.center();

        // Canvas edges
        consider(&mut best_x, threshold, mb.left, 0.0, 0.0, GuideKind::CanvasEdge, None);
        consider(
            &mut best_x,
            threshold,
            mb.right,
            canvas.width,
            canvas.width - width,
            GuideKind::CanvasEdge,
            None,
        );
        consider(&mut best_y, threshold, mb.top, 0.0, 0.0, GuideKind::CanvasEdge, None);
        consider(
            &mut best_y,
            threshold,
            mb.bottom,
            canvas.height,
            canvas.height - height,
            GuideKind::CanvasEdge,
            None,
        );

        // Canvas center
        consider(
            &mut best_x,
            threshold,
            mb.center_x,
            ccx,
            ccx - width / 2.0,
            GuideKind::CanvasCenter,
            None,
        );
        consider(
            &mut best_y,
            threshold,
            mb.center_y,
            ccy,
            ccy - height / 2.0,
            GuideKind::CanvasCenter,
            None,
        );
    }

    for (id, sb) in siblings {
        if *id == moving {
            continue;
        }
        let target = Some(*sb);

        // Edge-to-edge and stacking, x axis
        consider(&mut best_x, threshold, mb.left, sb.left, sb.left, GuideKind::ElementEdge, target);
        consider(
            &mut best_x,
            threshold,
            mb.right,
            sb.right,
            sb.right - width,
            GuideKind::ElementEdge,
            target,
        );
        consider(&mut best_x, threshold, mb.left, sb.right, sb.right, GuideKind::ElementEdge, target);
        consider(
            &mut best_x,
            threshold,
            mb.right,
            sb.left,
            sb.left - width,
            GuideKind::ElementEdge,
            target,
        );
        consider(
            &mut best_x,
            threshold,
            mb.center_x,
            sb.center_x,
            sb.center_x - width / 2.0,
            GuideKind::ElementCenter,
            target,
        );

        // Same, y axis
        consider(&mut best_y, threshold, mb.top, sb.top, sb.top, GuideKind::ElementEdge, target);
        consider(
            &mut best_y,
            threshold,
            mb.bottom,
            sb.bottom,
            sb.bottom - height,
            GuideKind::ElementEdge,
            target,
        );
        consider(&mut best_y, threshold, mb.top, sb.bottom, sb.bottom, GuideKind::ElementEdge, target);
        consider(
            &mut best_y,
            threshold,
            mb.bottom,
            sb.top,
            sb.top - height,
            GuideKind::ElementEdge,
            target,
        );
        consider(
            &mut best_y,
            threshold,
            mb.center_y,
            sb.center_y,
            sb.center_y - height / 2.0,
            GuideKind::ElementCenter,
            target,
        );
    }

    let mut result = SnapResult::default();

    if let Some(c) = best_x {
        // Guide reflects the snapped bounds, not the raw proposal
        let snapped_bounds = Bounds::from_rect(c.snapped, proposed_y, width, height);
        result.guides.push(make_guide(GuideAxis::Vertical, &c, &snapped_bounds, config));
        if c.snapped != proposed_x {
            result.x = Some(c.snapped);
        }
    }
    if let Some(c) = best_y {
        let x = result.x.unwrap_or(proposed_x);
        let snapped_bounds = Bounds::from_rect(x, c.snapped, width, height);
        result
            .guides
            .push(make_guide(GuideAxis::Horizontal, &c, &snapped_bounds, config));
        if c.snapped != proposed_y {
            result.y = Some(c.snapped);
        }
    }

    result
}

/// Keep `candidate` when it is within threshold and nearer than the current
/// best (category rank breaks exact-distance ties).
fn consider(
    best: &mut Option<Candidate>,
    threshold: f32,
    edge: f32,
    target_line: f32,
    snapped: f32,
    kind: GuideKind,
    target: Option<Bounds>,
) {
    let distance = (edge - target_line).abs();
    if distance > threshold {
        return;
    }
    let better = match best {
        None => true,
        Some(b) => distance < b.distance || (distance == b.distance && kind.rank() < b.kind.rank()),
    };
    if better {
        *best = Some(Candidate {
            snapped,
            distance,
            kind,
            line: target_line,
            target,
        });
    }
}

fn make_guide(axis: GuideAxis, c: &Candidate, moving: &Bounds, config: &SnapConfig) -> SnapGuide {
    let (start, end) = guide_extent(axis, c, moving, config);
    let markers = match axis {
        GuideAxis::Vertical => vec![
            Point::new(c.line, moving.center_y),
            Point::new(c.line, c.target.map_or(moving.center_y, |t| t.center_y)),
        ],
        GuideAxis::Horizontal => vec![
            Point::new(moving.center_x, c.line),
            Point::new(c.target.map_or(moving.center_x, |t| t.center_x), c.line),
        ],
    };
    SnapGuide {
        id: format!(
            "{}-{}-{}",
            match axis {
                GuideAxis::Vertical => "v",
                GuideAxis::Horizontal => "h",
            },
            c.kind.rank(),
            c.line as i64
        ),
        axis,
        position: c.line,
        start,
        end,
        kind: c.kind,
        markers,
        target: c.target,
    }
}

/// Sibling guides span the union of the moving and target bounds plus
/// padding; canvas guides span the full canvas dimension.
fn guide_extent(axis: GuideAxis, c: &Candidate, moving: &Bounds, config: &SnapConfig) -> (f32, f32) {
    match (c.target, &config.canvas) {
        (Some(t), _) => {
            let pad = config.guide_padding;
            match axis {
                GuideAxis::Vertical => (moving.top.min(t.top) - pad, moving.bottom.max(t.bottom) + pad),
                GuideAxis::Horizontal => {
                    (moving.left.min(t.left) - pad, moving.right.max(t.right) + pad)
                }
            }
        }
        (None, Some(canvas)) => match axis {
            GuideAxis::Vertical => (0.0, canvas.height),
            GuideAxis::Horizontal => (0.0, canvas.width),
        },
        (None, None) => (moving.top, moving.bottom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sib(id: &str, x: f32, y: f32, w: f32, h: f32) -> (ElementId, Bounds) {
        (ElementId::intern(id), Bounds::from_rect(x, y, w, h))
    }

    fn mover() -> ElementId {
        ElementId::intern("snap_mover")
    }

    #[test]
    fn disabled_is_a_no_op() {
        let r = detect_snaps(
            mover(),
            100.0,
            100.0,
            3.0,
            3.0,
            &[sib("s", 0.0, 0.0, 50.0, 50.0)],
            &SnapConfig::default(),
            false,
        );
        assert_eq!(r, SnapResult::default());
        assert!(r.guides.is_empty());
    }

    #[test]
    fn left_canvas_edge_snap() {
        // 3840x2160 canvas, 100x100 element proposed at (6, 20):
        // left edge within threshold of 0, top edge (20) outside.
        let r = detect_snaps(mover(), 100.0, 100.0, 6.0, 20.0, &[], &SnapConfig::default(), true);
        assert_eq!(r.x, Some(0.0));
        assert_eq!(r.y, None);
        assert_eq!(r.guides.len(), 1);
        let g = &r.guides[0];
        assert_eq!(g.axis, GuideAxis::Vertical);
        assert_eq!(g.position, 0.0);
        assert_eq!(g.kind, GuideKind::CanvasEdge);
        assert_eq!((g.start, g.end), (0.0, 2160.0));
    }

    #[test]
    fn both_axes_snap_independently() {
        let r = detect_snaps(mover(), 100.0, 100.0, 6.0, 6.0, &[], &SnapConfig::default(), true);
        assert_eq!(r.x, Some(0.0));
        assert_eq!(r.y, Some(0.0));
        assert_eq!(r.guides.len(), 2);
    }

    #[test]
    fn right_edge_snap_to_canvas_width() {
        let r = detect_snaps(
            mover(),
            100.0,
            100.0,
            3745.0,
            500.0,
            &[],
            &SnapConfig::default(),
            true,
        );
        // right edge 3845 within 8 of 3840 → x = 3740
        assert_eq!(r.x, Some(3740.0));
    }

    #[test]
    fn canvas_center_snap() {
        // center_x at 1925, canvas center 1920, within threshold
        let r = detect_snaps(
            mover(),
            100.0,
            100.0,
            1875.0,
            500.0,
            &[],
            &SnapConfig::default(),
            true,
        );
        assert_eq!(r.x, Some(1870.0));
        assert_eq!(r.guides[0].kind, GuideKind::CanvasCenter);
        assert_eq!(r.guides[0].position, 1920.0);
    }

    #[test]
    fn stacking_snap_against_sibling_right_edge() {
        // Sibling at x=200 w=100 (right edge 300); mover w=50 proposed x=305
        // → snaps to 300 with a vertical guide at 300.
        let r = detect_snaps(
            mover(),
            50.0,
            50.0,
            305.0,
            500.0,
            &[sib("stack_target", 200.0, 430.0, 100.0, 100.0)],
            &SnapConfig::default(),
            true,
        );
        assert_eq!(r.x, Some(300.0));
        assert_eq!(r.y, None);
        let g = r.guides.iter().find(|g| g.axis == GuideAxis::Vertical).unwrap();
        assert_eq!(g.position, 300.0);
        assert_eq!(g.kind, GuideKind::ElementEdge);
        // Extent spans union of mover (500..550) and target (430..530) plus padding
        assert_eq!(g.start, 430.0 - GUIDE_PADDING);
        assert_eq!(g.end, 550.0 + GUIDE_PADDING);
    }

    #[test]
    fn nearest_candidate_wins_per_axis() {
        // Two siblings: edges at x=100 (5 away) and x=103 (2 away).
        let r = detect_snaps(
            mover(),
            50.0,
            50.0,
            105.0,
            1000.0,
            &[
                sib("near_a", 100.0, 1000.0, 40.0, 40.0),
                sib("near_b", 103.0, 1000.0, 40.0, 40.0),
            ],
            &SnapConfig::default(),
            true,
        );
        assert_eq!(r.x, Some(103.0));
    }

    #[test]
    fn threshold_scales_with_zoom() {
        let config = SnapConfig {
            zoom: 2.0,
            ..Default::default()
        };
        // 6 px off: within threshold at zoom 1 (8), outside at zoom 2 (4)
        let r = detect_snaps(mover(), 100.0, 100.0, 6.0, 500.0, &[], &config, true);
        assert_eq!(r.x, None);
        assert!(r.guides.is_empty());
    }

    #[test]
    fn exact_alignment_returns_guide_but_no_correction() {
        // Already at 0: no x correction, but the guide still renders.
        let r = detect_snaps(mover(), 100.0, 100.0, 0.0, 500.0, &[], &SnapConfig::default(), true);
        assert_eq!(r.x, None);
        assert_eq!(r.guides.len(), 1);
    }

    #[test]
    fn moving_element_excluded_from_sibling_checks() {
        let me = mover();
        let r = detect_snaps(
            me,
            50.0,
            50.0,
            505.0,
            505.0,
            &[(me, Bounds::from_rect(500.0, 500.0, 50.0, 50.0))],
            &SnapConfig {
                canvas: None,
                ..Default::default()
            },
            true,
        );
        assert_eq!(r, SnapResult::default());
    }
}
