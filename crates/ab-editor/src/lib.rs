pub mod controller;
pub mod input;
pub mod snap;
pub mod timeline;

pub use controller::{CanvasController, ControllerAction};
pub use input::{Modifiers, PointerButton, PointerEvent};
pub use snap::{
    BASE_SNAP_THRESHOLD, GUIDE_PADDING, GuideAxis, GuideKind, SnapConfig, SnapGuide, SnapResult,
    detect_snaps,
};
pub use timeline::Timeline;
