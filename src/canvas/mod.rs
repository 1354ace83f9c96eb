//! Positioned-variable canvas

mod layout;
mod widget;

pub use layout::{CanvasEvent, CanvasLayout, DragState, HitZone, DELETE_HANDLE_SIZE};
pub use widget::CanvasView;
