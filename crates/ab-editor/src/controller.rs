//! Canvas interaction controller.
//!
//! Owns the pointer-driven state machine (panning, marquee selection,
//! pending selection clear, element drag/resize delegation) and composes
//! the snap detector with grid snapping and canvas clamping. The controller
//! never mutates elements itself — it reads the [`ElementTree`] and emits
//! [`ControllerAction`]s the host applies through its `ElementStore`.
//!
//! The update path for any position change is snap → grid snap → clamp, in
//! that order, so clamping always wins at the canvas boundary. No method
//! here is fallible: malformed input degrades to a safe no-op.

use crate::input::{PointerButton, PointerEvent};
use crate::snap::{BASE_SNAP_THRESHOLD, GUIDE_PADDING, SnapConfig, SnapGuide, detect_snaps};
use crate::timeline::Timeline;
use ab_core::bounds::{Bounds, Canvas};
use ab_core::grid::GridSettings;
use ab_core::id::ElementId;
use ab_core::patch::{ElementPatch, PropertyKey};
use ab_core::tree::ElementTree;
use std::collections::{HashMap, HashSet};

/// An effect the host applies; `UpdateElement` maps to the store's
/// `update_element`, the rest to the host callback surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerAction {
    UpdateElement {
        id: ElementId,
        patch: ElementPatch,
    },
    SelectionChanged {
        selected: Vec<ElementId>,
    },
    ManipulationStarted {
        id: ElementId,
    },
    ManipulationEnded {
        id: ElementId,
    },
    ContextMenu {
        id: Option<ElementId>,
        x: f32,
        y: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InteractionState {
    Idle,
    /// Empty-canvas press without modifier: clears selection on release
    /// unless movement turns it into a pan first.
    PendingClear {
        screen: (f32, f32),
    },
    Panning {
        last_screen: (f32, f32),
    },
    Marquee {
        start: (f32, f32),
    },
    Dragging {
        id: ElementId,
        /// Pointer offset from the element's top-left at grab time.
        grab: (f32, f32),
    },
    Resizing {
        id: ElementId,
    },
}

pub struct CanvasController {
    pub canvas: Canvas,
    pub grid: GridSettings,
    pub zoom: f32,
    /// Screen-space pan offset.
    pub pan: (f32, f32),
    /// Master switch for alignment snapping (grid snapping is governed by
    /// `grid.snap_enabled` independently).
    pub snap_enabled: bool,
    pub timeline: Timeline,
    /// Whether manipulation-end records keyframes.
    pub authoring: bool,

    state: InteractionState,
    selection: Vec<ElementId>,
    /// Elements under live manipulation — hosts suppress animated value
    /// overrides for these. Cleared unconditionally on every end/abort.
    manipulating: HashSet<ElementId>,
    /// Properties touched per element during the current gesture.
    touched: HashMap<ElementId, HashSet<PropertyKey>>,
    guides: Vec<SnapGuide>,
    marquee: Option<Bounds>,
}

impl CanvasController {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            grid: GridSettings::default(),
            zoom: 1.0,
            pan: (0.0, 0.0),
            snap_enabled: true,
            timeline: Timeline::new(),
            authoring: false,
            state: InteractionState::Idle,
            selection: Vec::new(),
            manipulating: HashSet::new(),
            touched: HashMap::new(),
            guides: Vec::new(),
            marquee: None,
        }
    }

    // ─── Read surface for the host ───────────────────────────────────────

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    /// Whether an element is being manipulated right now (animated value
    /// overrides must not fight the user's pointer).
    pub fn is_manipulating(&self, id: ElementId) -> bool {
        self.manipulating.contains(&id)
    }

    /// Guides from the latest drag frame, replaced wholesale per move.
    pub fn guides(&self) -> &[SnapGuide] {
        &self.guides
    }

    /// The current marquee rectangle, when marquee-selecting.
    pub fn marquee(&self) -> Option<Bounds> {
        self.marquee
    }

    fn to_canvas(&self, ev: PointerEvent) -> (f32, f32) {
        let zoom = self.zoom.max(0.01);
        ((ev.x - self.pan.0) / zoom, (ev.y - self.pan.1) / zoom)
    }

    fn snap_config(&self) -> SnapConfig {
        SnapConfig {
            base_threshold: BASE_SNAP_THRESHOLD,
            zoom: self.zoom,
            canvas: Some(self.canvas),
            guide_padding: GUIDE_PADDING,
        }
    }

    // ─── Pointer state machine ───────────────────────────────────────────

    pub fn pointer_down(&mut self, ev: PointerEvent, tree: &ElementTree) -> Vec<ControllerAction> {
        let mut actions = Vec::new();
        let (cx, cy) = self.to_canvas(ev);
        let hit = self.hit_test(tree, cx, cy);

        if ev.button == PointerButton::Secondary {
            if let Some(id) = hit
                && !self.selection.contains(&id)
            {
                self.selection = vec![id];
                actions.push(ControllerAction::SelectionChanged {
                    selected: self.selection.clone(),
                });
            }
            actions.push(ControllerAction::ContextMenu { id: hit, x: cx, y: cy });
            return actions;
        }

        match hit {
            Some(id) => {
                if ev.modifiers.multi_select() {
                    // Toggle membership; a deselecting shift-click does
                    // not begin a drag
                    if let Some(pos) = self.selection.iter().position(|s| *s == id) {
                        self.selection.remove(pos);
                        actions.push(ControllerAction::SelectionChanged {
                            selected: self.selection.clone(),
                        });
                        return actions;
                    }
                    self.selection.push(id);
                    actions.push(ControllerAction::SelectionChanged {
                        selected: self.selection.clone(),
                    });
                } else if !self.selection.contains(&id) {
                    self.selection = vec![id];
                    actions.push(ControllerAction::SelectionChanged {
                        selected: self.selection.clone(),
                    });
                }

                // Dragging a group child moves the whole group: retarget
                // the drag to the top-level ancestor.
                let target = tree.top_level_ancestor(id).unwrap_or(id);
                let leaf_locked = tree.get(id).is_some_and(|el| el.locked);
                let target_locked = tree.get(target).is_some_and(|el| el.locked);
                if leaf_locked || target_locked {
                    // Locked: selectable for inspection, never dragged
                    return actions;
                }
                if let Some(el) = tree.get(target) {
                    self.state = InteractionState::Dragging {
                        id: target,
                        grab: (cx - el.x, cy - el.y),
                    };
                    self.manipulating.insert(target);
                    actions.push(ControllerAction::ManipulationStarted { id: target });
                }
            }
            None => {
                let outside = cx < 0.0 || cy < 0.0 || cx > self.canvas.width || cy > self.canvas.height;
                if outside {
                    self.state = InteractionState::Panning {
                        last_screen: (ev.x, ev.y),
                    };
                } else if ev.modifiers.multi_select() {
                    self.state = InteractionState::Marquee { start: (cx, cy) };
                    self.marquee = Some(Bounds::from_rect(cx, cy, 0.0, 0.0));
                } else {
                    self.state = InteractionState::PendingClear {
                        screen: (ev.x, ev.y),
                    };
                }
            }
        }
        actions
    }

    pub fn pointer_move(&mut self, ev: PointerEvent, tree: &ElementTree) -> Vec<ControllerAction> {
        match self.state {
            InteractionState::Idle | InteractionState::Resizing { .. } => Vec::new(),
            InteractionState::PendingClear { screen } => {
                if (ev.x, ev.y) != screen {
                    // Movement suppresses the clear and becomes a pan
                    self.state = InteractionState::Panning {
                        last_screen: screen,
                    };
                    return self.pointer_move(ev, tree);
                }
                Vec::new()
            }
            InteractionState::Panning { last_screen } => {
                // Pan is applied in screen space: raw pointer delta,
                // not scaled by zoom.
                self.pan.0 += ev.x - last_screen.0;
                self.pan.1 += ev.y - last_screen.1;
                self.state = InteractionState::Panning {
                    last_screen: (ev.x, ev.y),
                };
                Vec::new()
            }
            InteractionState::Marquee { start } => {
                let (cx, cy) = self.to_canvas(ev);
                let rect = normalize_rect(start, (cx, cy));
                self.marquee = Some(clamp_rect(rect, &self.canvas));
                Vec::new()
            }
            InteractionState::Dragging { id, grab } => {
                let (cx, cy) = self.to_canvas(ev);
                self.drag_update(id, cx - grab.0, cy - grab.1, tree)
            }
        }
    }

    pub fn pointer_up(&mut self, _ev: PointerEvent, tree: &ElementTree) -> Vec<ControllerAction> {
        let mut actions = Vec::new();
        match self.state {
            InteractionState::PendingClear { .. } => {
                if !self.selection.is_empty() {
                    self.selection.clear();
                    actions.push(ControllerAction::SelectionChanged { selected: Vec::new() });
                }
            }
            InteractionState::Marquee { .. } => {
                if let Some(rect) = self.marquee.take() {
                    self.selection = contained_top_level(tree, &rect);
                    actions.push(ControllerAction::SelectionChanged {
                        selected: self.selection.clone(),
                    });
                }
            }
            InteractionState::Dragging { id, .. } | InteractionState::Resizing { id } => {
                actions.extend(self.end_manipulation(id));
            }
            InteractionState::Panning { .. } | InteractionState::Idle => {}
        }
        self.state = InteractionState::Idle;
        actions
    }

    /// Abnormal termination (pointer-cancel, pointer left the window).
    /// Clears every piece of gesture state so no element stays suppressed.
    pub fn pointer_cancel(&mut self) -> Vec<ControllerAction> {
        let mut actions = Vec::new();
        if let InteractionState::Dragging { id, .. } | InteractionState::Resizing { id } = self.state
        {
            actions.push(ControllerAction::ManipulationEnded { id });
        }
        self.manipulating.clear();
        self.touched.clear();
        self.guides.clear();
        self.marquee = None;
        self.state = InteractionState::Idle;
        actions
    }

    // ─── Drag / resize update paths ──────────────────────────────────────

    fn drag_update(
        &mut self,
        id: ElementId,
        proposed_x: f32,
        proposed_y: f32,
        tree: &ElementTree,
    ) -> Vec<ControllerAction> {
        let Some(el) = tree.get(id) else {
            return Vec::new();
        };
        let (w, h) = (el.width, el.height);

        // Alignment snap against canvas and visible siblings
        let siblings: Vec<(ElementId, Bounds)> = tree
            .top_level()
            .into_iter()
            .filter(|other| *other != id)
            .filter(|other| tree.get(*other).is_some_and(|e| e.visible))
            .filter_map(|other| tree.absolute_bounds(other).map(|b| (other, b)))
            .collect();
        let snap = detect_snaps(
            id,
            w,
            h,
            proposed_x,
            proposed_y,
            &siblings,
            &self.snap_config(),
            self.snap_enabled,
        );
        self.guides = snap.guides;
        let (x, y) = (snap.x.unwrap_or(proposed_x), snap.y.unwrap_or(proposed_y));

        // Grid snap, then clamp — clamp wins at the boundary
        let (x, y) = self.grid.snap_position(x, y, &self.canvas);
        let (x, y) = self.canvas.clamp_position(x, y, w, h);

        let patch = ElementPatch::move_to(x, y);
        self.touched.entry(id).or_default().extend(patch.touched());
        vec![ControllerAction::UpdateElement { id, patch }]
    }

    /// A per-element resize handle took over the gesture.
    pub fn begin_resize(&mut self, id: ElementId, tree: &ElementTree) -> Vec<ControllerAction> {
        if tree.get(id).is_none_or(|el| el.locked) {
            return Vec::new();
        }
        self.state = InteractionState::Resizing { id };
        self.manipulating.insert(id);
        vec![ControllerAction::ManipulationStarted { id }]
    }

    /// Resize update from the delegated handle. Grid-snaps the size, then
    /// shrinks it so the element stays inside the canvas.
    pub fn resize_to(&mut self, width: f32, height: f32, tree: &ElementTree) -> Vec<ControllerAction> {
        let InteractionState::Resizing { id } = self.state else {
            return Vec::new();
        };
        let Some(el) = tree.get(id) else {
            return Vec::new();
        };
        let (w, h) = self
            .grid
            .snap_size(width.max(0.0), height.max(0.0), &self.canvas);
        let w = w.min(self.canvas.width - el.x);
        let h = h.min(self.canvas.height - el.y);

        let patch = ElementPatch::resize(w, h);
        self.touched.entry(id).or_default().extend(patch.touched());
        vec![ControllerAction::UpdateElement { id, patch }]
    }

    fn end_manipulation(&mut self, id: ElementId) -> Vec<ControllerAction> {
        self.manipulating.remove(&id);
        self.guides.clear();
        if let Some(keys) = self.touched.remove(&id)
            && self.authoring
        {
            for key in keys {
                if self.timeline.record(id, key) {
                    log::debug!("keyframe recorded for {id} {key:?} at {}", self.timeline.time);
                }
            }
        }
        vec![ControllerAction::ManipulationEnded { id }]
    }

    // ─── Hit testing ─────────────────────────────────────────────────────

    /// Topmost visible element at a canvas position. Children are checked
    /// before their group (flatten is z-ordered, reversed here).
    fn hit_test(&self, tree: &ElementTree, x: f32, y: f32) -> Option<ElementId> {
        tree.flatten().into_iter().rev().find(|&id| {
            tree.get(id).is_some_and(|el| el.visible)
                && tree
                    .absolute_bounds(id)
                    .is_some_and(|b| b.contains_point(x, y))
        })
    }
}

fn normalize_rect(a: (f32, f32), b: (f32, f32)) -> Bounds {
    Bounds::from_rect(
        a.0.min(b.0),
        a.1.min(b.1),
        (b.0 - a.0).abs(),
        (b.1 - a.1).abs(),
    )
}

fn clamp_rect(rect: Bounds, canvas: &Canvas) -> Bounds {
    let left = rect.left.clamp(0.0, canvas.width);
    let top = rect.top.clamp(0.0, canvas.height);
    let right = rect.right.clamp(0.0, canvas.width);
    let bottom = rect.bottom.clamp(0.0, canvas.height);
    Bounds::from_rect(left, top, right - left, bottom - top)
}

/// Top-level visible elements whose full bounds lie inside `rect`
/// (containment, not intersection).
fn contained_top_level(tree: &ElementTree, rect: &Bounds) -> Vec<ElementId> {
    tree.top_level()
        .into_iter()
        .filter(|&id| tree.get(id).is_some_and(|el| el.visible))
        .filter(|&id| {
            tree.absolute_bounds(id)
                .is_some_and(|b| rect.contains_rect(&b))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use ab_core::model::{DesignElement, ElementKind};

    fn tree_with(rects: &[(&str, f32, f32, f32, f32)]) -> ElementTree {
        let mut tree = ElementTree::new();
        for (id, x, y, w, h) in rects {
            tree.insert(
                None,
                DesignElement::new(ElementId::intern(id), *id, ElementKind::Rect)
                    .with_geometry(*x, *y, *w, *h),
            );
        }
        tree
    }

    #[test]
    fn click_selects_topmost() {
        let tree = tree_with(&[
            ("under", 0.0, 0.0, 100.0, 100.0),
            ("over", 50.0, 50.0, 100.0, 100.0),
        ]);
        let mut ctl = CanvasController::new(Canvas::default());
        let actions = ctl.pointer_down(PointerEvent::at(75.0, 75.0), &tree);
        assert!(actions.contains(&ControllerAction::SelectionChanged {
            selected: vec![ElementId::intern("over")],
        }));
    }

    #[test]
    fn empty_click_clears_selection_only_without_movement() {
        let tree = tree_with(&[("lone", 0.0, 0.0, 50.0, 50.0)]);
        let mut ctl = CanvasController::new(Canvas::default());
        ctl.pointer_down(PointerEvent::at(25.0, 25.0), &tree);
        ctl.pointer_up(PointerEvent::at(25.0, 25.0), &tree);
        assert_eq!(ctl.selection(), &[ElementId::intern("lone")]);

        // Press empty space then move: becomes a pan, selection survives
        ctl.pointer_down(PointerEvent::at(500.0, 500.0), &tree);
        ctl.pointer_move(PointerEvent::at(520.0, 510.0), &tree);
        ctl.pointer_up(PointerEvent::at(520.0, 510.0), &tree);
        assert_eq!(ctl.selection(), &[ElementId::intern("lone")]);
        assert_eq!(ctl.pan, (20.0, 10.0));

        // Press empty space and release in place: cleared
        ctl.pointer_down(PointerEvent::at(500.0, 500.0), &tree);
        let actions = ctl.pointer_up(PointerEvent::at(500.0, 500.0), &tree);
        assert!(actions.contains(&ControllerAction::SelectionChanged { selected: vec![] }));
        assert!(ctl.selection().is_empty());
    }

    #[test]
    fn locked_elements_select_but_never_drag() {
        let mut tree = tree_with(&[]);
        let mut el = DesignElement::new(ElementId::intern("locked"), "Locked", ElementKind::Rect)
            .with_geometry(10.0, 10.0, 50.0, 50.0);
        el.locked = true;
        tree.insert(None, el);

        let mut ctl = CanvasController::new(Canvas::default());
        let actions = ctl.pointer_down(PointerEvent::at(20.0, 20.0), &tree);
        assert_eq!(ctl.selection(), &[ElementId::intern("locked")]);
        assert!(
            !actions
                .iter()
                .any(|a| matches!(a, ControllerAction::ManipulationStarted { .. }))
        );
        let actions = ctl.pointer_move(PointerEvent::at(80.0, 80.0), &tree);
        assert!(actions.is_empty());
    }

    #[test]
    fn drag_emits_clamped_updates() {
        let tree = tree_with(&[("drag_me", 10.0, 10.0, 100.0, 100.0)]);
        let mut ctl = CanvasController::new(Canvas::default());
        ctl.snap_enabled = false;

        ctl.pointer_down(PointerEvent::at(60.0, 60.0), &tree);
        assert!(ctl.is_manipulating(ElementId::intern("drag_me")));

        // Drag far past the left edge: position clamps to 0
        let actions = ctl.pointer_move(PointerEvent::at(-500.0, 60.0), &tree);
        match &actions[0] {
            ControllerAction::UpdateElement { patch, .. } => {
                assert_eq!(patch.x, Some(0.0));
                assert_eq!(patch.y, Some(10.0));
            }
            other => panic!("expected UpdateElement, got {other:?}"),
        }

        let actions = ctl.pointer_up(PointerEvent::at(-500.0, 60.0), &tree);
        assert!(actions.contains(&ControllerAction::ManipulationEnded {
            id: ElementId::intern("drag_me"),
        }));
        assert!(!ctl.is_manipulating(ElementId::intern("drag_me")));
    }

    #[test]
    fn dragging_child_moves_whole_group() {
        let mut tree = ElementTree::new();
        let gid = tree
            .insert(
                None,
                DesignElement::new(ElementId::intern("ctl_grp"), "Group", ElementKind::Group)
                    .with_geometry(100.0, 100.0, 200.0, 200.0),
            )
            .unwrap();
        tree.insert(
            Some(gid),
            DesignElement::new(ElementId::intern("ctl_child"), "Rect", ElementKind::Rect)
                .with_geometry(20.0, 20.0, 50.0, 50.0),
        );

        let mut ctl = CanvasController::new(Canvas::default());
        ctl.snap_enabled = false;
        // Pointer over the child (absolute 120..170)
        ctl.pointer_down(PointerEvent::at(130.0, 130.0), &tree);
        let actions = ctl.pointer_move(PointerEvent::at(140.0, 135.0), &tree);
        match &actions[0] {
            ControllerAction::UpdateElement { id, patch } => {
                // The group, not the child, receives the move
                assert_eq!(*id, gid);
                assert_eq!(patch.x, Some(110.0));
                assert_eq!(patch.y, Some(105.0));
            }
            other => panic!("expected UpdateElement, got {other:?}"),
        }
    }

    #[test]
    fn marquee_selects_contained_only() {
        let tree = tree_with(&[
            ("inside", 100.0, 100.0, 50.0, 50.0),
            ("partial", 180.0, 180.0, 100.0, 100.0),
            ("outside", 600.0, 600.0, 50.0, 50.0),
        ]);
        let mut ctl = CanvasController::new(Canvas::default());
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        ctl.pointer_down(PointerEvent::at(50.0, 50.0).with_modifiers(shift), &tree);
        ctl.pointer_move(PointerEvent::at(200.0, 200.0).with_modifiers(shift), &tree);
        let actions = ctl.pointer_up(PointerEvent::at(200.0, 200.0), &tree);
        assert!(actions.contains(&ControllerAction::SelectionChanged {
            selected: vec![ElementId::intern("inside")],
        }));
    }

    #[test]
    fn cancel_clears_suppression_set() {
        let tree = tree_with(&[("c_rect", 10.0, 10.0, 100.0, 100.0)]);
        let mut ctl = CanvasController::new(Canvas::default());
        ctl.pointer_down(PointerEvent::at(50.0, 50.0), &tree);
        assert!(ctl.is_manipulating(ElementId::intern("c_rect")));

        let actions = ctl.pointer_cancel();
        assert!(actions.contains(&ControllerAction::ManipulationEnded {
            id: ElementId::intern("c_rect"),
        }));
        assert!(!ctl.is_manipulating(ElementId::intern("c_rect")));
        assert!(ctl.guides().is_empty());
    }

    #[test]
    fn release_records_keyframe_only_into_existing_track() {
        let tree = tree_with(&[("kf_rect", 10.0, 10.0, 100.0, 100.0)]);
        let id = ElementId::intern("kf_rect");
        let mut ctl = CanvasController::new(Canvas::default());
        ctl.snap_enabled = false;
        ctl.authoring = true;
        ctl.timeline.ensure_track(id, PropertyKey::X);

        ctl.pointer_down(PointerEvent::at(50.0, 50.0), &tree);
        ctl.pointer_move(PointerEvent::at(80.0, 50.0), &tree);
        ctl.pointer_up(PointerEvent::at(80.0, 50.0), &tree);

        // X had a track → keyframe; Y did not → nothing
        assert_eq!(ctl.timeline.keyframes(id, PropertyKey::X).len(), 1);
        assert!(ctl.timeline.keyframes(id, PropertyKey::Y).is_empty());

        // Re-releasing without moving does not duplicate
        ctl.pointer_down(PointerEvent::at(80.0, 50.0), &tree);
        ctl.pointer_up(PointerEvent::at(80.0, 50.0), &tree);
        assert_eq!(ctl.timeline.keyframes(id, PropertyKey::X).len(), 1);
    }
}
