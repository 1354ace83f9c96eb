//! User settings and preferences for LexDoka
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Available color themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

impl Theme {
    /// Cycle Light → Dark → System → Light.
    pub fn next(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
            Theme::System => Theme::Light,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Who is working on the document.
///
/// - `Author`: structural edits (text, variable insertion, canvas layout)
/// - `Filler`: value entry only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Author,
    Filler,
}

impl Role {
    /// Toggle between Author and Filler.
    pub fn toggle(&self) -> Self {
        match self {
            Role::Author => Role::Filler,
            Role::Filler => Role::Author,
        }
    }

    /// Get a display label for the role.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Author => "Author",
            Role::Filler => "Filler",
        }
    }

    /// Whether structural edits are permitted.
    pub fn is_author(&self) -> bool {
        matches!(self, Role::Author)
    }

    /// Whether only value entry is permitted.
    pub fn is_filler(&self) -> bool {
        matches!(self, Role::Filler)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Active View Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which representation of the variables is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    /// Rich-text document with inline embeddings
    #[default]
    Document,
    /// Free-form positioned form
    Canvas,
}

impl ActiveView {
    /// Get a display label for the view.
    pub fn label(&self) -> &'static str {
        match self {
            ActiveView::Document => "Document",
            ActiveView::Canvas => "Form (canvas)",
        }
    }

    /// Get an icon for the view tab.
    pub fn icon(&self) -> &'static str {
        match self {
            ActiveView::Document => "📄",
            ActiveView::Canvas => "🗒",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Window Size Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Window dimensions and position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    /// Window width in pixels
    pub width: f32,
    /// Window height in pixels
    pub height: f32,
    /// Window X position (optional, for restoring position)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Window Y position (optional, for restoring position)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Whether the window was maximized
    #[serde(default)]
    pub maximized: bool,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1100.0,
            height: 760.0,
            x: None,
            y: None,
            maximized: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences and application settings.
///
/// Serialized to JSON in the user's config directory. Every field has a
/// default via `#[serde(default)]`, so older or partial files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Appearance
    // ─────────────────────────────────────────────────────────────────────────
    /// Color theme (light, dark, or system)
    pub theme: Theme,

    /// How long save notifications stay on screen
    pub toast_duration_secs: f32,

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────
    /// Role the application starts in
    pub default_role: Role,

    /// View shown at start-up
    pub default_view: ActiveView,

    /// Write the state file on every filler value edit
    pub auto_save_values: bool,

    /// Overrides the location of the persisted state file
    pub state_file: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────────────────
    // Canvas
    // ─────────────────────────────────────────────────────────────────────────
    /// Canvas surface width in points
    pub canvas_width: f32,

    /// Canvas surface height in points
    pub canvas_height: f32,

    // ─────────────────────────────────────────────────────────────────────────
    // Window State
    // ─────────────────────────────────────────────────────────────────────────
    /// Window size and position
    pub window_size: WindowSize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            toast_duration_secs: 1.8,

            default_role: Role::default(),
            default_view: ActiveView::default(),
            auto_save_values: true,
            state_file: None,

            canvas_width: 760.0,
            canvas_height: 420.0,

            window_size: WindowSize::default(),
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum canvas width.
    pub const MIN_CANVAS_WIDTH: f32 = 200.0;
    /// Minimum canvas height.
    pub const MIN_CANVAS_HEIGHT: f32 = 120.0;
    /// Maximum canvas extent in either direction.
    pub const MAX_CANVAS_EXTENT: f32 = 4000.0;
    /// Minimum toast duration.
    pub const MIN_TOAST_SECS: f32 = 0.5;
    /// Maximum toast duration.
    pub const MAX_TOAST_SECS: f32 = 10.0;

    /// Clamp every numeric field into its valid range.
    ///
    /// Non-finite values fall back to the defaults before clamping.
    pub fn sanitize(&mut self) {
        let defaults = Settings::default();

        if !self.canvas_width.is_finite() {
            self.canvas_width = defaults.canvas_width;
        }
        if !self.canvas_height.is_finite() {
            self.canvas_height = defaults.canvas_height;
        }
        if !self.toast_duration_secs.is_finite() {
            self.toast_duration_secs = defaults.toast_duration_secs;
        }

        self.canvas_width = self
            .canvas_width
            .clamp(Self::MIN_CANVAS_WIDTH, Self::MAX_CANVAS_EXTENT);
        self.canvas_height = self
            .canvas_height
            .clamp(Self::MIN_CANVAS_HEIGHT, Self::MAX_CANVAS_EXTENT);
        self.toast_duration_secs = self
            .toast_duration_secs
            .clamp(Self::MIN_TOAST_SECS, Self::MAX_TOAST_SECS);

        if self.window_size.width < 400.0 {
            self.window_size.width = 400.0;
        }
        if self.window_size.height < 300.0 {
            self.window_size.height = 300.0;
        }
    }

    /// Parse settings from JSON and sanitize the result.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
