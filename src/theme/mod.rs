//! Theme management for LexDoka
//!
//! Turns the `Theme` setting into egui `Visuals` and applies them, following
//! the system preference when `Theme::System` is selected.

use crate::config::Theme;
use eframe::egui::{Color32, Context, Rounding, Stroke, Visuals};
use log::{debug, info};

/// Accent used for selections in both palettes.
const ACCENT: Color32 = Color32::from_rgb(0, 120, 215);

/// Light palette.
pub fn light_visuals() -> Visuals {
    let mut visuals = Visuals::light();
    visuals.panel_fill = Color32::from_rgb(255, 255, 255);
    visuals.window_fill = Color32::from_rgb(255, 255, 255);
    visuals.faint_bg_color = Color32::from_rgb(246, 246, 248);
    visuals.code_bg_color = Color32::from_rgb(240, 240, 244);
    visuals.selection.bg_fill = Color32::from_rgb(200, 220, 245);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.inactive.rounding = Rounding::same(4.0);
    visuals.widgets.hovered.rounding = Rounding::same(4.0);
    visuals
}

/// Dark palette.
pub fn dark_visuals() -> Visuals {
    let mut visuals = Visuals::dark();
    visuals.panel_fill = Color32::from_rgb(30, 30, 30);
    visuals.window_fill = Color32::from_rgb(30, 30, 30);
    visuals.faint_bg_color = Color32::from_rgb(37, 37, 40);
    visuals.code_bg_color = Color32::from_rgb(45, 45, 50);
    visuals.selection.bg_fill = Color32::from_rgb(40, 70, 110);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.inactive.rounding = Rounding::same(4.0);
    visuals.widgets.hovered.rounding = Rounding::same(4.0);
    visuals
}

/// Holds the theme preference and applies it to the egui context.
#[derive(Debug, Clone)]
pub struct ThemeManager {
    current_theme: Theme,
    needs_apply: bool,
    /// Last seen system dark mode, for `Theme::System`
    last_system_dark_mode: Option<bool>,
}

impl ThemeManager {
    pub fn new(theme: Theme) -> Self {
        info!("ThemeManager initialized with theme: {:?}", theme);
        Self {
            current_theme: theme,
            needs_apply: true,
            last_system_dark_mode: None,
        }
    }

    pub fn current_theme(&self) -> Theme {
        self.current_theme
    }

    /// Set the theme. It takes effect on the next `apply_if_needed`.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.current_theme != theme {
            info!("Theme changed from {:?} to {:?}", self.current_theme, theme);
            self.current_theme = theme;
            self.needs_apply = true;
        }
    }

    /// Light → Dark → System → Light. Returns the new theme.
    pub fn cycle(&mut self) -> Theme {
        let next = self.current_theme.next();
        self.set_theme(next);
        next
    }

    /// Visuals for the current theme, given the system preference.
    pub fn visuals(&self, system_dark: bool) -> Visuals {
        match self.current_theme {
            Theme::Light => light_visuals(),
            Theme::Dark => dark_visuals(),
            Theme::System if system_dark => dark_visuals(),
            Theme::System => light_visuals(),
        }
    }

    /// Apply the theme if it changed, or if the system preference changed
    /// while following it. Returns `true` if applied.
    pub fn apply_if_needed(&mut self, ctx: &Context, system_dark: Option<bool>) -> bool {
        if self.current_theme == Theme::System {
            let dark = system_dark.unwrap_or_else(|| ctx.style().visuals.dark_mode);
            if self.last_system_dark_mode != Some(dark) {
                self.last_system_dark_mode = Some(dark);
                self.needs_apply = true;
                debug!("System dark mode changed to: {}", dark);
            }
        }

        if !self.needs_apply {
            return false;
        }
        let dark = self.last_system_dark_mode.unwrap_or(false);
        ctx.set_visuals(self.visuals(dark));
        self.needs_apply = false;
        debug!("Applied theme: {:?}", self.current_theme);
        true
    }
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}
