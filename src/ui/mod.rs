//! UI components for LexDoka
//!
//! Chrome around the two views: the formatting toolbar and the capsule
//! configuration panel.

mod config_panel;
mod toolbar;

pub use config_panel::{CapsuleConfigPanel, ConfigPanelOutput};
pub use toolbar::{FormatCommand, Toolbar, ToolbarAction, ToolbarState};
