//! The element tree — an arena of design elements.
//!
//! Backed by a `petgraph::StableDiGraph` where edges are parent → child
//! containment. Group children store **parent-relative** coordinates;
//! [`ElementTree::absolute_position`] resolves canvas-space positions by
//! summing ancestor offsets. Ids are unique across the whole tree; inserts
//! with a duplicate id are rejected.

use crate::bounds::Bounds;
use crate::id::ElementId;
use crate::model::{DesignElement, ElementKind};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

pub struct ElementTree {
    graph: StableDiGraph<DesignElement, ()>,
    root: NodeIndex,
    id_index: HashMap<ElementId, NodeIndex>,
    /// Explicit child ordering, maintained by inserts and z-order moves.
    /// When absent for a parent, children fall back to `NodeIndex` order.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl ElementTree {
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_id = ElementId::intern("__root");
        let root = graph.add_node(DesignElement::new(root_id, "root", ElementKind::Group));

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);

        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
        }
    }

    /// Insert an element under `parent` (or at the top level when `None`).
    /// Returns `None` if the id already exists or the parent is missing.
    pub fn insert(
        &mut self,
        parent: Option<ElementId>,
        element: DesignElement,
    ) -> Option<ElementId> {
        let id = element.id;
        if self.id_index.contains_key(&id) {
            log::warn!("rejecting duplicate element id {id}");
            return None;
        }
        let parent_idx = match parent {
            Some(pid) => *self.id_index.get(&pid)?,
            None => self.root,
        };
        let idx = self.graph.add_node(element);
        self.graph.add_edge(parent_idx, idx, ());
        self.id_index.insert(id, idx);
        self.child_order.entry(parent_idx).or_default().push(idx);
        Some(id)
    }

    /// Remove an element and its whole subtree. Returns the removed root
    /// element.
    pub fn remove(&mut self, id: ElementId) -> Option<DesignElement> {
        let idx = *self.id_index.get(&id)?;
        if idx == self.root {
            return None;
        }
        for child in self.child_indices(idx) {
            let child_id = self.graph[child].id;
            self.remove(child_id);
        }
        if let Some(parent_idx) = self.parent_index(idx)
            && let Some(order) = self.child_order.get_mut(&parent_idx)
        {
            order.retain(|&i| i != idx);
        }
        self.child_order.remove(&idx);
        let removed = self.graph.remove_node(idx);
        if removed.is_some() {
            self.id_index.remove(&id);
        }
        removed
    }

    pub fn get(&self, id: ElementId) -> Option<&DesignElement> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut DesignElement> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id) && id != self.graph[self.root].id
    }

    /// Parent element id, or `None` for top-level elements.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        let idx = *self.id_index.get(&id)?;
        let parent_idx = self.parent_index(idx)?;
        if parent_idx == self.root {
            None
        } else {
            Some(self.graph[parent_idx].id)
        }
    }

    /// Children of an element, in z-order (later = on top).
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        match self.id_index.get(&id) {
            Some(&idx) => self
                .child_indices(idx)
                .into_iter()
                .map(|i| self.graph[i].id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Top-level elements in z-order.
    pub fn top_level(&self) -> Vec<ElementId> {
        self.child_indices(self.root)
            .into_iter()
            .map(|i| self.graph[i].id)
            .collect()
    }

    /// Every element id, depth-first in z-order.
    pub fn flatten(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.id_index.len().saturating_sub(1));
        self.flatten_into(self.root, &mut out);
        out
    }

    fn flatten_into(&self, idx: NodeIndex, out: &mut Vec<ElementId>) {
        for child in self.child_indices(idx) {
            out.push(self.graph[child].id);
            self.flatten_into(child, out);
        }
    }

    /// Number of elements (excluding the synthetic root).
    pub fn len(&self) -> usize {
        self.id_index.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canvas-space position: the element's own (x, y) plus every ancestor
    /// group's offset.
    pub fn absolute_position(&self, id: ElementId) -> Option<(f32, f32)> {
        let mut idx = *self.id_index.get(&id)?;
        let mut x = self.graph[idx].x;
        let mut y = self.graph[idx].y;
        while let Some(parent_idx) = self.parent_index(idx) {
            if parent_idx == self.root {
                break;
            }
            x += self.graph[parent_idx].x;
            y += self.graph[parent_idx].y;
            idx = parent_idx;
        }
        Some((x, y))
    }

    /// Canvas-space bounds of an element.
    pub fn absolute_bounds(&self, id: ElementId) -> Option<Bounds> {
        let (x, y) = self.absolute_position(id)?;
        let el = self.get(id)?;
        Some(Bounds::from_rect(x, y, el.width, el.height))
    }

    /// Move an element by a delta (in its own coordinate space).
    pub fn translate(&mut self, id: ElementId, dx: f32, dy: f32) {
        if let Some(el) = self.get_mut(id) {
            el.x += dx;
            el.y += dy;
        }
    }

    /// The top-level ancestor of an element (itself if already top-level).
    pub fn top_level_ancestor(&self, id: ElementId) -> Option<ElementId> {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        self.contains(current).then_some(current)
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    /// Swap with the previous sibling. Returns true if the order changed.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        self.shift_sibling(id, |pos, _| pos.checked_sub(1))
    }

    /// Swap with the next sibling. Returns true if the order changed.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        self.shift_sibling(id, |pos, last| (pos < last).then_some(pos + 1))
    }

    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.shift_sibling(id, |pos, _| (pos > 0).then_some(0))
    }

    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.shift_sibling(id, |pos, last| (pos < last).then_some(last))
    }

    fn shift_sibling(
        &mut self,
        id: ElementId,
        target: impl Fn(usize, usize) -> Option<usize>,
    ) -> bool {
        let idx = match self.id_index.get(&id) {
            Some(&i) => i,
            None => return false,
        };
        let parent_idx = match self.parent_index(idx) {
            Some(p) => p,
            None => return false,
        };
        let siblings = self.child_indices(parent_idx);
        let pos = match siblings.iter().position(|&s| s == idx) {
            Some(p) => p,
            None => return false,
        };
        let to = match target(pos, siblings.len() - 1) {
            Some(t) if t != pos => t,
            _ => return false,
        };
        let mut order = siblings;
        let moved = order.remove(pos);
        order.insert(to, moved);
        self.child_order.insert(parent_idx, order);
        true
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    fn child_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        if let Some(order) = self.child_order.get(&idx) {
            return order.clone();
        }
        // Sort by NodeIndex so iteration is deterministic across targets.
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;

    fn rect(id: &str, x: f32, y: f32) -> DesignElement {
        DesignElement::new(ElementId::intern(id), id, ElementKind::Rect)
            .with_geometry(x, y, 100.0, 50.0)
    }

    #[test]
    fn insert_get_remove() {
        let mut tree = ElementTree::new();
        let id = tree.insert(None, rect("a", 10.0, 10.0)).unwrap();
        assert!(tree.contains(id));
        assert_eq!(tree.len(), 1);

        let removed = tree.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(!tree.contains(id));
        assert!(tree.is_empty());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut tree = ElementTree::new();
        assert!(tree.insert(None, rect("dup", 0.0, 0.0)).is_some());
        assert!(tree.insert(None, rect("dup", 5.0, 5.0)).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn group_children_are_parent_relative() {
        let mut tree = ElementTree::new();
        let group = DesignElement::new(ElementId::intern("grp"), "Group", ElementKind::Group)
            .with_geometry(100.0, 200.0, 300.0, 300.0);
        let gid = tree.insert(None, group).unwrap();
        let cid = tree.insert(Some(gid), rect("child", 10.0, 20.0)).unwrap();

        assert_eq!(tree.absolute_position(cid), Some((110.0, 220.0)));
        assert_eq!(tree.parent(cid), Some(gid));
        assert_eq!(tree.top_level_ancestor(cid), Some(gid));

        // Translating the group moves the child's absolute position
        tree.translate(gid, 5.0, -5.0);
        assert_eq!(tree.absolute_position(cid), Some((115.0, 215.0)));
    }

    #[test]
    fn remove_takes_subtree() {
        let mut tree = ElementTree::new();
        let gid = tree
            .insert(
                None,
                DesignElement::new(ElementId::intern("g2"), "Group", ElementKind::Group),
            )
            .unwrap();
        let cid = tree.insert(Some(gid), rect("c2", 0.0, 0.0)).unwrap();
        tree.remove(gid);
        assert!(!tree.contains(gid));
        assert!(!tree.contains(cid));
    }

    #[test]
    fn z_order_moves() {
        let mut tree = ElementTree::new();
        let a = tree.insert(None, rect("z_a", 0.0, 0.0)).unwrap();
        let b = tree.insert(None, rect("z_b", 0.0, 0.0)).unwrap();
        let c = tree.insert(None, rect("z_c", 0.0, 0.0)).unwrap();
        assert_eq!(tree.top_level(), vec![a, b, c]);

        assert!(tree.bring_to_front(a));
        assert_eq!(tree.top_level(), vec![b, c, a]);

        assert!(tree.send_backward(c));
        assert_eq!(tree.top_level(), vec![c, b, a]);

        // Already at back
        assert!(!tree.send_backward(c));
    }
}
