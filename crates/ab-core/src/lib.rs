pub mod bounds;
pub mod grid;
pub mod id;
pub mod model;
pub mod patch;
pub mod project;
pub mod store;
pub mod tree;

pub use bounds::{Bounds, Canvas};
pub use grid::{GridSettings, MIN_GRID_DIVISIONS};
pub use id::ElementId;
pub use model::*;
pub use patch::{ElementPatch, LinePatch, PropertyKey, StylePatch, TypographyPatch};
pub use project::{Project, ProjectElement, validate_project};
pub use store::ElementStore;
pub use tree::ElementTree;
