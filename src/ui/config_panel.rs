//! Capsule Configuration Panel
//!
//! Side panel where the author edits a variable's label, help text and type.
//! Edits stay in a draft until Save; Cancel or Escape discards them.

use crate::variables::{Variable, VariableMetadata, VariableType};
use eframe::egui::{self, Key, RichText, TextEdit};

/// Default width of the panel.
const PANEL_WIDTH: f32 = 280.0;

/// Result of showing the configuration panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPanelOutput {
    /// Metadata to apply, when Save was pressed
    pub saved: Option<VariableMetadata>,
    /// Cancel, Escape or the close button
    pub closed: bool,
}

/// Configuration panel state.
#[derive(Debug, Clone, Default)]
pub struct CapsuleConfigPanel {
    draft: Option<VariableMetadata>,
}

impl CapsuleConfigPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The metadata being edited, if the panel is open.
    pub fn draft(&self) -> Option<&VariableMetadata> {
        self.draft.as_ref()
    }

    /// Start editing `target` unless it is already being edited.
    fn sync_target(&mut self, target: Option<&Variable>) {
        match target {
            None => self.draft = None,
            Some(variable) => {
                if self.draft.as_ref().map(|d| d.id.as_str()) != Some(variable.id.as_str()) {
                    self.draft = Some(variable.metadata());
                }
            }
        }
    }

    /// Show the panel for `target`. Nothing is drawn when it is `None`.
    pub fn show(&mut self, ctx: &egui::Context, target: Option<&Variable>) -> ConfigPanelOutput {
        let mut output = ConfigPanelOutput::default();
        self.sync_target(target);
        let Some(draft) = self.draft.as_mut() else {
            return output;
        };

        egui::SidePanel::right("capsule_config_panel")
            .resizable(false)
            .exact_width(PANEL_WIDTH)
            .show(ctx, |ui| {
                if ui.input(|i| i.key_pressed(Key::Escape)) {
                    output.closed = true;
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.heading("Configure variable");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").on_hover_text("Close (Esc)").clicked() {
                            output.closed = true;
                        }
                    });
                });
                ui.label(RichText::new(&draft.id).small().weak());
                ui.separator();

                egui::Grid::new("capsule_config_grid")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Label");
                        ui.add(
                            TextEdit::singleline(&mut draft.label)
                                .hint_text("Shown on the chip and as placeholder")
                                .desired_width(170.0),
                        );
                        ui.end_row();

                        ui.label("Help text");
                        ui.add(
                            TextEdit::multiline(&mut draft.help_text)
                                .hint_text("Tooltip for the filler")
                                .desired_rows(3)
                                .desired_width(170.0),
                        );
                        ui.end_row();

                        ui.label("Type");
                        egui::ComboBox::from_id_source("capsule_config_type")
                            .selected_text(draft.kind.label())
                            .show_ui(ui, |ui| {
                                for kind in VariableType::all() {
                                    ui.selectable_value(&mut draft.kind, *kind, kind.label());
                                }
                            });
                        ui.end_row();
                    });

                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        output.saved = Some(draft.clone());
                    }
                    if ui.button("Cancel").clicked() {
                        output.closed = true;
                    }
                });
            });

        if output.saved.is_some() || output.closed {
            self.draft = None;
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(id: &str, label: &str) -> Variable {
        Variable {
            id: id.to_string(),
            label: label.to_string(),
            ..Default::default()
        }
    }

    fn run(panel: &mut CapsuleConfigPanel, target: Option<&Variable>) -> ConfigPanelOutput {
        let ctx = egui::Context::default();
        let mut output = ConfigPanelOutput::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            output = panel.show(ctx, target);
        });
        output
    }

    #[test]
    fn test_closed_panel_draws_nothing() {
        let mut panel = CapsuleConfigPanel::new();
        assert_eq!(run(&mut panel, None), ConfigPanelOutput::default());
        assert!(panel.draft().is_none());
    }

    #[test]
    fn test_draft_follows_target() {
        let mut panel = CapsuleConfigPanel::new();
        let a = variable("a", "Name");
        run(&mut panel, Some(&a));
        assert_eq!(panel.draft().map(|d| d.label.as_str()), Some("Name"));

        let b = variable("b", "Due");
        run(&mut panel, Some(&b));
        assert_eq!(panel.draft().map(|d| d.id.as_str()), Some("b"));

        run(&mut panel, None);
        assert!(panel.draft().is_none());
    }

    #[test]
    fn test_draft_survives_frames_for_same_target() {
        let mut panel = CapsuleConfigPanel::new();
        let a = variable("a", "Name");
        panel.sync_target(Some(&a));
        if let Some(draft) = panel.draft.as_mut() {
            draft.label = "Edited".to_string();
        }
        panel.sync_target(Some(&a));
        assert_eq!(panel.draft().map(|d| d.label.as_str()), Some("Edited"));
    }

    #[test]
    fn test_escape_closes() {
        let mut panel = CapsuleConfigPanel::new();
        let a = variable("a", "Name");
        let ctx = egui::Context::default();
        let mut input = egui::RawInput::default();
        input.events.push(egui::Event::Key {
            key: Key::Escape,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        });
        let mut output = ConfigPanelOutput::default();
        let _ = ctx.run(input, |ctx| {
            output = panel.show(ctx, Some(&a));
        });
        assert!(output.closed);
        assert!(output.saved.is_none());
        assert!(panel.draft().is_none());
    }
}
