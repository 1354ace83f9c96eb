//! Main application module for LexDoka
//!
//! This module implements the eframe App trait: it owns the session and the
//! widgets, routes toolbar and keyboard actions, and shows transient
//! notifications in the status bar.

use crate::config::{save_config_silent, ActiveView, Settings, WindowSize};
use crate::canvas::CanvasView;
use crate::document::{
    BlockKind, DocumentAdapter, DocumentEditor, DocumentEditorOutput, Mark, TextSelection, Wrapper,
};
use crate::session::{CoreEvent, SessionController};
use crate::storage::{FileStateStore, MemoryStateStore, StateStore};
use crate::theme::ThemeManager;
use crate::ui::{CapsuleConfigPanel, FormatCommand, Toolbar, ToolbarAction, ToolbarState};
use chrono::Local;
use eframe::egui;
use log::{debug, info, warn};

/// Keyboard shortcut actions that need to be deferred.
///
/// These actions are detected in the input handling closure and executed
/// afterwards to avoid borrow conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyboardAction {
    /// Save state (Ctrl+S)
    Save,
    /// Switch between author and filler (Ctrl+E)
    ToggleRole,
    /// Switch between document and canvas (Ctrl+Shift+V)
    ToggleView,
    /// Cycle theme (Ctrl+Shift+T)
    CycleTheme,
}

/// A status bar message with its expiry time.
#[derive(Debug, Clone)]
struct Toast {
    message: String,
    expires_at: f64,
}

/// The main application struct that holds all state and implements eframe::App.
pub struct LexdokaApp {
    settings: Settings,
    /// Settings changed since the last write
    settings_dirty: bool,
    theme_manager: ThemeManager,
    session: SessionController,
    toolbar: Toolbar,
    document_editor: DocumentEditor,
    canvas_view: CanvasView,
    config_panel: CapsuleConfigPanel,
    toast: Option<Toast>,
    /// Last known window size (for detecting changes)
    last_window_size: Option<egui::Vec2>,
    /// Last known window position (for detecting changes)
    last_window_pos: Option<egui::Pos2>,
    /// Application start time for timing toast messages
    start_time: std::time::Instant,
}

impl LexdokaApp {
    /// Create the application from loaded settings.
    ///
    /// A state file that cannot be located falls back to an in-memory store,
    /// so the session still runs but nothing survives a restart.
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        info!("Initializing LexDoka");

        let store: Box<dyn StateStore> = match FileStateStore::open(settings.state_file.as_deref()) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!("{}; changes will not be kept after exit", e);
                Box::new(MemoryStateStore::new())
            }
        };
        let session = SessionController::new(store, &settings);

        let mut theme_manager = ThemeManager::new(settings.theme);
        theme_manager.apply_if_needed(&cc.egui_ctx, None);

        Self {
            settings_dirty: false,
            theme_manager,
            session,
            toolbar: Toolbar::new(),
            document_editor: DocumentEditor::new(),
            canvas_view: CanvasView,
            config_panel: CapsuleConfigPanel::new(),
            toast: None,
            last_window_size: None,
            last_window_pos: None,
            start_time: std::time::Instant::now(),
            settings,
        }
    }

    /// Get elapsed time since app start in seconds.
    fn get_app_time(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn show_toast(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("Toast: {}", message);
        self.toast = Some(Toast {
            message,
            expires_at: self.get_app_time() + f64::from(self.settings.toast_duration_secs),
        });
    }

    /// Update window size in settings if changed.
    ///
    /// Returns `true` if the window state was updated.
    fn update_window_state(&mut self, ctx: &egui::Context) -> bool {
        let Some(rect) = ctx.input(|i| i.viewport().outer_rect) else {
            return false;
        };
        let size = rect.size();
        let pos = rect.min;

        let size_changed = self
            .last_window_size
            .map(|s| (s - size).length() > 1.0)
            .unwrap_or(true);
        let pos_changed = self
            .last_window_pos
            .map(|p| (p - pos).length() > 1.0)
            .unwrap_or(true);
        if !size_changed && !pos_changed {
            return false;
        }

        self.last_window_size = Some(size);
        self.last_window_pos = Some(pos);
        let maximized = ctx.input(|i| i.viewport().maximized.unwrap_or(false));
        self.settings.window_size = WindowSize {
            width: size.x,
            height: size.y,
            x: Some(pos.x),
            y: Some(pos.y),
            maximized,
        };
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        let action = ctx.input(|i| {
            if !i.modifiers.command {
                return None;
            }
            if i.modifiers.shift && i.key_pressed(egui::Key::T) {
                return Some(KeyboardAction::CycleTheme);
            }
            if i.modifiers.shift && i.key_pressed(egui::Key::V) {
                return Some(KeyboardAction::ToggleView);
            }
            if !i.modifiers.shift && i.key_pressed(egui::Key::S) {
                return Some(KeyboardAction::Save);
            }
            if !i.modifiers.shift && i.key_pressed(egui::Key::E) {
                return Some(KeyboardAction::ToggleRole);
            }
            None
        });

        if let Some(action) = action {
            debug!("Keyboard shortcut: {:?}", action);
            match action {
                KeyboardAction::Save => self.handle_toolbar_action(ToolbarAction::Save),
                KeyboardAction::ToggleRole => self.handle_toolbar_action(ToolbarAction::ToggleRole),
                KeyboardAction::ToggleView => {
                    let next = match self.session.view() {
                        ActiveView::Document => ActiveView::Canvas,
                        ActiveView::Canvas => ActiveView::Document,
                    };
                    self.handle_toolbar_action(ToolbarAction::SwitchView(next));
                }
                KeyboardAction::CycleTheme => self.handle_toolbar_action(ToolbarAction::CycleTheme),
            }
        }
    }

    fn handle_toolbar_action(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::ToggleRole => {
                self.session.toggle_role();
                self.show_toast(format!("{} mode", self.session.role().label()));
            }
            ToolbarAction::SwitchView(view) => self.session.set_view(view),
            ToolbarAction::Save => {
                if self.session.save().is_ok() {
                    self.show_toast("Saved");
                }
            }
            ToolbarAction::CycleTheme => {
                self.settings.theme = self.theme_manager.cycle();
                self.settings_dirty = true;
            }
            ToolbarAction::Format(cmd) => {
                let selection = self.document_editor.last_selection().cloned();
                let changed = apply_format(self.session.document_mut(), selection.as_ref(), cmd);
                self.session.handle_document_output(DocumentEditorOutput {
                    changed,
                    ..Default::default()
                });
            }
            ToolbarAction::Insert(id) => {
                let changed = self.session.document_mut().insert_available(&id);
                if !changed {
                    self.show_toast("Cannot insert a variable here");
                }
                self.session.handle_document_output(DocumentEditorOutput {
                    changed,
                    ..Default::default()
                });
            }
            ToolbarAction::ToggleCollapse => self.toolbar.toggle_collapsed(),
        }
    }

    /// Drain session events, surfacing the ones the user should see.
    fn process_session_events(&mut self) {
        for event in self.session.take_events() {
            match event {
                CoreEvent::SaveFailed(message) => self.show_toast(format!("Save failed: {}", message)),
                CoreEvent::ModifiedCapsule(meta) => debug!("Variable {} reconfigured", meta.id),
                CoreEvent::CapsuleSelect(variable) => debug!("Configuring {}", variable.id),
                CoreEvent::CapsulesChange(list) => debug!("{} variables on canvas", list.len()),
                CoreEvent::CapsuleValueChange { id, .. } => debug!("Value of {} changed", id),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(self.session.role().label()).strong());
                ui.separator();
                ui.label(format!("{} {}", self.session.view().icon(), self.session.view().label()));
                if self.session.is_dirty() {
                    ui.separator();
                    ui.label("●").on_hover_text("Unsaved changes");
                }

                if let Some(toast) = &self.toast {
                    ui.with_layout(
                        egui::Layout::centered_and_justified(egui::Direction::LeftToRight),
                        |ui| {
                            ui.label(egui::RichText::new(&toast.message).italics());
                        },
                    );
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(error) = self.session.last_save_error() {
                        let color = ui.visuals().error_fg_color;
                        ui.colored_label(color, "Save failed")
                            .on_hover_text(error);
                    } else if let Some(saved) = self.session.state().last_saved_at {
                        let local = saved.with_timezone(&Local);
                        ui.label(format!("Saved {}", local.format("%H:%M:%S")))
                            .on_hover_text(self.session.store().location());
                    }
                });
            });
        });
    }

    fn render_central(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| match self.session.view() {
            ActiveView::Document => {
                let output = egui::ScrollArea::vertical()
                    .id_source("document_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.document_editor.show(ui, self.session.document_mut())
                    })
                    .inner;
                self.session.handle_document_output(output);
            }
            ActiveView::Canvas => {
                let (width, height) = (self.settings.canvas_width, self.settings.canvas_height);
                if self.session.canvas().bounds() != (width, height) {
                    self.session.canvas_mut().set_bounds(width, height);
                }
                egui::ScrollArea::both()
                    .id_source("canvas_scroll")
                    .show(ui, |ui| {
                        self.canvas_view.show(ui, self.session.canvas_mut());
                    });
                self.session.pump();
            }
        });
    }
}

/// Apply a toolbar format command to the document.
///
/// Marks need a selection; block commands act on the caret's block.
fn apply_format(
    adapter: &mut DocumentAdapter,
    selection: Option<&TextSelection>,
    cmd: FormatCommand,
) -> bool {
    let mark = match cmd {
        FormatCommand::Bold => Some(Mark::Strong),
        FormatCommand::Italic => Some(Mark::Em),
        FormatCommand::InlineCode => Some(Mark::Code),
        _ => None,
    };
    if let Some(mark) = mark {
        return match selection {
            Some(sel) if sel.from < sel.to => adapter.toggle_mark(&sel.path, sel.from, sel.to, mark),
            _ => false,
        };
    }

    match cmd {
        FormatCommand::Paragraph => adapter.set_block_type(BlockKind::Paragraph),
        FormatCommand::Heading(level) => adapter.set_block_type(BlockKind::Heading(level)),
        FormatCommand::CodeBlock => adapter.set_block_type(BlockKind::CodeBlock),
        FormatCommand::BulletList => adapter.wrap_in(Wrapper::BulletList),
        FormatCommand::OrderedList => adapter.wrap_in(Wrapper::OrderedList),
        FormatCommand::Blockquote => adapter.wrap_in(Wrapper::Blockquote),
        FormatCommand::Lift => adapter.lift(),
        FormatCommand::HorizontalRule => adapter.insert_horizontal_rule(),
        FormatCommand::Bold | FormatCommand::Italic | FormatCommand::InlineCode => false,
    }
}

impl eframe::App for LexdokaApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let system_dark = frame.info().system_theme.map(|t| t == eframe::Theme::Dark);
        self.theme_manager.apply_if_needed(ctx, system_dark);

        if self
            .toast
            .as_ref()
            .is_some_and(|t| self.get_app_time() >= t.expires_at)
        {
            self.toast = None;
        }
        if self.update_window_state(ctx) {
            self.settings_dirty = true;
        }

        let toolbar_state = ToolbarState {
            role: self.session.role(),
            view: self.session.view(),
            dirty: self.session.is_dirty(),
            has_selection: self
                .document_editor
                .last_selection()
                .is_some_and(|s| s.from < s.to),
            menu: self.session.document().menu(),
        };
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .exact_height(self.toolbar.height())
            .show(ctx, |ui| self.toolbar.show(ui, toolbar_state))
            .inner;

        self.render_status_bar(ctx);

        let config = self.config_panel.show(ctx, self.session.config_target());
        if let Some(meta) = config.saved {
            let label = meta.label.clone();
            if self.session.save_config(meta).is_ok() {
                self.show_toast(format!("Saved \"{}\"", label));
            }
        } else if config.closed {
            self.session.close_config();
        }

        self.render_central(ctx);

        if let Some(action) = toolbar_action {
            self.handle_toolbar_action(action);
        }
        self.handle_keyboard_shortcuts(ctx);
        self.session.flush_auto_save();
        self.process_session_events();

        if self.toast.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }

    /// Called when the application is about to close.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application exiting");
        self.session.shutdown();
        if self.settings_dirty {
            save_config_silent(&self.settings);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Role;
    use crate::document::TextPosition;
    use serde_json::json;

    fn author_adapter() -> DocumentAdapter {
        let mut adapter = DocumentAdapter::new(Role::Author);
        adapter.load_document(Some(&json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "Hello world" }] }]
        })));
        adapter.set_cursor(TextPosition::new(vec![0], 2));
        adapter
    }

    #[test]
    fn test_bold_needs_a_selection() {
        let mut adapter = author_adapter();
        assert!(!apply_format(&mut adapter, None, FormatCommand::Bold));

        let collapsed = TextSelection { path: vec![0], from: 3, to: 3 };
        assert!(!apply_format(&mut adapter, Some(&collapsed), FormatCommand::Bold));

        let range = TextSelection { path: vec![0], from: 0, to: 5 };
        assert!(apply_format(&mut adapter, Some(&range), FormatCommand::Bold));
        let exported = adapter.export_document();
        assert_eq!(exported["content"][0]["content"][0]["marks"][0]["type"], "strong");
    }

    #[test]
    fn test_heading_changes_caret_block() {
        let mut adapter = author_adapter();
        assert!(apply_format(&mut adapter, None, FormatCommand::Heading(2)));
        let exported = adapter.export_document();
        assert_eq!(exported["content"][0]["type"], "heading");
        assert_eq!(exported["content"][0]["attrs"]["level"], 2);
    }

    #[test]
    fn test_wrap_then_lift() {
        let mut adapter = author_adapter();
        assert!(apply_format(&mut adapter, None, FormatCommand::Blockquote));
        assert_eq!(adapter.export_document()["content"][0]["type"], "blockquote");
        assert!(apply_format(&mut adapter, None, FormatCommand::Lift));
        assert_eq!(adapter.export_document()["content"][0]["type"], "paragraph");
    }

    #[test]
    fn test_filler_cannot_format() {
        let mut adapter = author_adapter();
        adapter.set_role(Role::Filler);
        assert!(!apply_format(&mut adapter, None, FormatCommand::HorizontalRule));
    }
}
