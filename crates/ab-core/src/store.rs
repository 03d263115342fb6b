//! The host mutation surface for element collections.
//!
//! The interaction controller and the generation pipeline never reach into
//! element storage directly — they go through this trait, so hosts can back
//! it with their own state management. `ElementTree` implements it for
//! in-process use and tests.

use crate::id::ElementId;
use crate::model::DesignElement;
use crate::patch::ElementPatch;
use crate::tree::ElementTree;

pub trait ElementStore {
    /// Add a single top-level element. Returns false if rejected
    /// (e.g. duplicate id).
    fn add_element(&mut self, element: DesignElement) -> bool;

    /// Add a batch of top-level elements in order. Preferred over repeated
    /// `add_element` — the batch appears atomically to the next render.
    /// Returns the number actually added.
    fn add_many(&mut self, elements: Vec<DesignElement>) -> usize {
        let mut added = 0;
        for el in elements {
            if self.add_element(el) {
                added += 1;
            }
        }
        added
    }

    /// Apply a sparse patch to an element. Returns false if unknown.
    fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool;

    /// Delete an element (and, for groups, its subtree). Returns false if
    /// unknown.
    fn delete_element(&mut self, id: ElementId) -> bool;
}

impl ElementStore for ElementTree {
    fn add_element(&mut self, element: DesignElement) -> bool {
        self.insert(None, element).is_some()
    }

    fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        match self.get_mut(id) {
            Some(el) => {
                patch.apply(el);
                true
            }
            None => false,
        }
    }

    fn delete_element(&mut self, id: ElementId) -> bool {
        self.remove(id).is_some()
    }
}
