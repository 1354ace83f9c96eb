//! Toolbar UI Component for LexDoka
//!
//! Icon-based controls in logical groups: session (role, save, theme), views
//! (document / canvas tabs) and, for the author in the document view,
//! formatting and the variable insert menu.

use crate::config::{ActiveView, Role};
use crate::document::InsertMenuItem;
use eframe::egui::{self, Color32, Response, RichText, Ui, Vec2};

/// Height of the toolbar in expanded state.
const TOOLBAR_HEIGHT_EXPANDED: f32 = 40.0;

/// Height of the toolbar in collapsed state.
const TOOLBAR_HEIGHT_COLLAPSED: f32 = 28.0;

/// Size of icon buttons.
const ICON_BUTTON_SIZE: Vec2 = Vec2::new(32.0, 28.0);

/// Formatting commands for the document editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    InlineCode,
    Paragraph,
    Heading(u8),
    CodeBlock,
    BulletList,
    OrderedList,
    Blockquote,
    /// Lift the block out of its list or quote
    Lift,
    HorizontalRule,
}

impl FormatCommand {
    /// Get the tooltip text for this command.
    pub fn tooltip(&self) -> String {
        match self {
            FormatCommand::Bold => "Bold (Ctrl+B)".to_string(),
            FormatCommand::Italic => "Italic (Ctrl+I)".to_string(),
            FormatCommand::InlineCode => "Inline code".to_string(),
            FormatCommand::Paragraph => "Paragraph".to_string(),
            FormatCommand::Heading(level) => format!("Heading {}", level),
            FormatCommand::CodeBlock => "Code block".to_string(),
            FormatCommand::BulletList => "Bullet list".to_string(),
            FormatCommand::OrderedList => "Numbered list".to_string(),
            FormatCommand::Blockquote => "Blockquote".to_string(),
            FormatCommand::Lift => "Lift out of list or quote".to_string(),
            FormatCommand::HorizontalRule => "Horizontal rule".to_string(),
        }
    }
}

/// Actions that can be triggered from the toolbar.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarAction {
    /// Switch between author and filler role
    ToggleRole,
    /// Show a view
    SwitchView(ActiveView),
    /// Write the session state
    Save,
    /// Cycle through themes
    CycleTheme,
    /// Apply a formatting command at the caret
    Format(FormatCommand),
    /// Insert an available variable by id
    Insert(String),
    /// Toggle toolbar collapsed state
    ToggleCollapse,
}

/// What the toolbar needs to know about the session.
#[derive(Debug, Clone, Copy)]
pub struct ToolbarState<'a> {
    pub role: Role,
    pub view: ActiveView,
    pub dirty: bool,
    pub has_selection: bool,
    pub menu: &'a [InsertMenuItem],
}

/// Toolbar UI state and rendering.
#[derive(Debug, Clone)]
pub struct Toolbar {
    collapsed: bool,
}

impl Default for Toolbar {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolbar {
    pub fn new() -> Self {
        Self { collapsed: false }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
    }

    pub fn height(&self) -> f32 {
        if self.collapsed {
            TOOLBAR_HEIGHT_COLLAPSED
        } else {
            TOOLBAR_HEIGHT_EXPANDED
        }
    }

    /// Render the toolbar and return any triggered action.
    pub fn show(&mut self, ui: &mut Ui, state: ToolbarState<'_>) -> Option<ToolbarAction> {
        let mut action: Option<ToolbarAction> = None;
        let is_dark = ui.visuals().dark_mode;

        let toolbar_bg = if is_dark {
            Color32::from_rgb(40, 40, 40)
        } else {
            Color32::from_rgb(248, 248, 248)
        };
        let separator_color = if is_dark {
            Color32::from_rgb(70, 70, 70)
        } else {
            Color32::from_rgb(210, 210, 210)
        };
        let muted = if is_dark {
            Color32::from_rgb(140, 140, 140)
        } else {
            Color32::from_rgb(120, 120, 120)
        };

        ui.painter()
            .rect_filled(ui.available_rect_before_wrap(), 0.0, toolbar_bg);

        ui.horizontal(|ui| {
            ui.set_height(self.height());
            ui.spacing_mut().item_spacing.x = 2.0;

            let collapse_icon = if self.collapsed { "▶" } else { "◀" };
            let collapse_tooltip = if self.collapsed {
                "Expand toolbar"
            } else {
                "Collapse toolbar"
            };
            if icon_button(ui, collapse_icon, collapse_tooltip, true, is_dark).clicked() {
                action = Some(ToolbarAction::ToggleCollapse);
            }

            ui.add_space(4.0);
            vertical_separator(ui, separator_color, self.height() - 8.0);
            ui.add_space(4.0);

            // ═══════════════════════════════════════════════════════════════════
            // Session Group
            // ═══════════════════════════════════════════════════════════════════
            let role_icon = match state.role {
                Role::Author => "✏",
                Role::Filler => "📝",
            };
            let role_text = format!("{} {}", role_icon, state.role.label());
            if ui
                .add(egui::Button::new(RichText::new(role_text).size(13.0)).min_size(ICON_BUTTON_SIZE))
                .on_hover_text("Switch role (Ctrl+E)")
                .clicked()
            {
                action = Some(ToolbarAction::ToggleRole);
            }

            let save_tooltip = if state.dirty {
                "Save (Ctrl+S), unsaved changes"
            } else {
                "Save (Ctrl+S)"
            };
            if icon_button(ui, "💾", save_tooltip, true, is_dark).clicked() {
                action = Some(ToolbarAction::Save);
            }

            if icon_button(ui, "🎨", "Cycle theme", true, is_dark).clicked() {
                action = Some(ToolbarAction::CycleTheme);
            }

            ui.add_space(4.0);
            vertical_separator(ui, separator_color, self.height() - 8.0);
            ui.add_space(4.0);

            // ═══════════════════════════════════════════════════════════════════
            // View Group
            // ═══════════════════════════════════════════════════════════════════
            for view in [ActiveView::Document, ActiveView::Canvas] {
                let text = if self.collapsed {
                    view.icon().to_string()
                } else {
                    format!("{} {}", view.icon(), view.label())
                };
                if ui.selectable_label(state.view == view, text).clicked() && state.view != view {
                    action = Some(ToolbarAction::SwitchView(view));
                }
            }

            // ═══════════════════════════════════════════════════════════════════
            // Format + Insert Groups (author, document view)
            // ═══════════════════════════════════════════════════════════════════
            if state.role.is_author() && state.view == ActiveView::Document {
                ui.add_space(4.0);
                vertical_separator(ui, separator_color, self.height() - 8.0);
                ui.add_space(4.0);

                if !self.collapsed {
                    ui.label(RichText::new("Format").size(10.0).color(muted));
                }
                if let Some(cmd) = self.format_group(ui, state.has_selection, is_dark) {
                    action = Some(ToolbarAction::Format(cmd));
                }

                ui.add_space(4.0);
                vertical_separator(ui, separator_color, self.height() - 8.0);
                ui.add_space(4.0);

                ui.add_enabled_ui(!state.menu.is_empty(), |ui| {
                    ui.menu_button("➕ Variable", |ui| {
                        for item in state.menu {
                            if ui.button(&item.title).clicked() {
                                action = Some(ToolbarAction::Insert(item.id.clone()));
                                ui.close_menu();
                            }
                        }
                    })
                    .response
                    .on_hover_text("Insert a variable at the caret")
                    .on_disabled_hover_text("Add variables on the canvas first");
                });
            }
        });

        action
    }

    fn format_group(&self, ui: &mut Ui, has_selection: bool, is_dark: bool) -> Option<FormatCommand> {
        let mut command = None;

        let marks = [
            (FormatCommand::Bold, "B"),
            (FormatCommand::Italic, "I"),
            (FormatCommand::InlineCode, "`"),
        ];
        for (cmd, icon) in marks {
            if format_button(ui, icon, &cmd.tooltip(), has_selection, is_dark).clicked() {
                command = Some(cmd);
            }
        }

        let blocks = [
            (FormatCommand::Paragraph, "¶"),
            (FormatCommand::Heading(1), "H1"),
            (FormatCommand::Heading(2), "H2"),
            (FormatCommand::Heading(3), "H3"),
            (FormatCommand::CodeBlock, "{}"),
            (FormatCommand::BulletList, "•"),
            (FormatCommand::OrderedList, "1."),
            (FormatCommand::Blockquote, "❝"),
            (FormatCommand::Lift, "⇤"),
            (FormatCommand::HorizontalRule, "―"),
        ];
        for (cmd, icon) in blocks {
            if self.collapsed && matches!(cmd, FormatCommand::Heading(2) | FormatCommand::Heading(3)) {
                continue;
            }
            if format_button(ui, icon, &cmd.tooltip(), true, is_dark).clicked() {
                command = Some(cmd);
            }
        }

        command
    }
}

/// Render an icon button with hover background.
fn icon_button(ui: &mut Ui, icon: &str, tooltip: &str, enabled: bool, is_dark: bool) -> Response {
    let text_color = if enabled {
        if is_dark {
            Color32::from_rgb(220, 220, 220)
        } else {
            Color32::from_rgb(50, 50, 50)
        }
    } else if is_dark {
        Color32::from_rgb(100, 100, 100)
    } else {
        Color32::from_rgb(160, 160, 160)
    };

    let hover_bg = if is_dark {
        Color32::from_rgb(60, 60, 60)
    } else {
        Color32::from_rgb(220, 220, 220)
    };

    let btn = ui.add_enabled(
        enabled,
        egui::Button::new(RichText::new(" ").size(16.0))
            .frame(false)
            .min_size(ICON_BUTTON_SIZE),
    );

    if btn.hovered() && enabled {
        ui.painter()
            .rect_filled(btn.rect, egui::Rounding::same(3.0), hover_bg);
    }

    ui.painter().text(
        btn.rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(16.0),
        text_color,
    );

    btn.on_hover_text(tooltip)
}

/// Render a compact text button for formatting commands.
fn format_button(ui: &mut Ui, icon: &str, tooltip: &str, enabled: bool, is_dark: bool) -> Response {
    let text_color = if enabled {
        if is_dark {
            Color32::from_rgb(220, 220, 220)
        } else {
            Color32::from_rgb(50, 50, 50)
        }
    } else if is_dark {
        Color32::from_rgb(100, 100, 100)
    } else {
        Color32::from_rgb(160, 160, 160)
    };

    let btn = ui.add_enabled(
        enabled,
        egui::Button::new(RichText::new(icon).size(12.0).color(text_color))
            .frame(false)
            .min_size(Vec2::new(24.0, 22.0)),
    );
    btn.on_hover_text(tooltip)
}

/// Draw a vertical separator line.
fn vertical_separator(ui: &mut Ui, color: Color32, height: f32) {
    let (rect, _response) = ui.allocate_exact_size(Vec2::new(1.0, height), egui::Sense::hover());
    ui.painter().line_segment(
        [rect.center_top(), rect.center_bottom()],
        egui::Stroke::new(1.0, color),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolbar_toggle_collapsed() {
        let mut toolbar = Toolbar::new();
        assert!(!toolbar.is_collapsed());
        assert_eq!(toolbar.height(), TOOLBAR_HEIGHT_EXPANDED);

        toolbar.toggle_collapsed();
        assert!(toolbar.is_collapsed());
        assert_eq!(toolbar.height(), TOOLBAR_HEIGHT_COLLAPSED);
    }

    #[test]
    fn test_format_tooltips() {
        assert_eq!(FormatCommand::Heading(2).tooltip(), "Heading 2");
        assert!(FormatCommand::Bold.tooltip().contains("Ctrl+B"));
    }

    #[test]
    fn test_toolbar_renders_headless() {
        let ctx = egui::Context::default();
        let mut toolbar = Toolbar::new();
        let menu = vec![InsertMenuItem {
            id: "a".to_string(),
            title: "Insert Name (text)".to_string(),
        }];
        let mut action = None;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
                action = toolbar.show(
                    ui,
                    ToolbarState {
                        role: Role::Author,
                        view: ActiveView::Document,
                        dirty: true,
                        has_selection: false,
                        menu: &menu,
                    },
                );
            });
        });
        assert!(action.is_none());
    }
}
