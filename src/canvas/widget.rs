//! Canvas renderer
//!
//! Paints the capsules of a `CanvasLayout` and feeds pointer input into its
//! state machine. In filler role every capsule hosts an input matched to its
//! variable type; in author role capsules are labelled chips with a delete
//! handle, and a toolbar adds new ones.

use super::layout::{CanvasLayout, DragState, DELETE_HANDLE_SIZE};
use crate::config::Role;
use crate::variables::{is_valid_date, CanvasCapsule, VariableType};
use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, Response, RichText, Sense, Stroke, TextEdit, Ui,
    Vec2,
};

/// Canvas colors derived from the active visuals.
#[derive(Debug, Clone)]
struct CanvasColors {
    background: Color32,
    border: Color32,
    capsule: Color32,
    capsule_border: Color32,
    dragging: Color32,
    text: Color32,
    badge: Color32,
    delete: Color32,
    warning: Color32,
}

impl CanvasColors {
    fn from_visuals(visuals: &egui::Visuals) -> Self {
        if visuals.dark_mode {
            Self {
                background: Color32::from_rgb(30, 30, 34),
                border: Color32::from_rgb(70, 70, 76),
                capsule: Color32::from_rgb(40, 70, 110),
                capsule_border: Color32::from_rgb(80, 120, 170),
                dragging: Color32::from_rgb(120, 180, 255),
                text: Color32::from_rgb(220, 235, 255),
                badge: Color32::from_rgb(150, 170, 200),
                delete: Color32::from_rgb(230, 110, 110),
                warning: Color32::from_rgb(230, 160, 60),
            }
        } else {
            Self {
                background: Color32::from_rgb(250, 250, 252),
                border: Color32::from_rgb(200, 200, 206),
                capsule: Color32::from_rgb(215, 230, 250),
                capsule_border: Color32::from_rgb(120, 160, 210),
                dragging: Color32::from_rgb(0, 100, 200),
                text: Color32::from_rgb(20, 60, 120),
                badge: Color32::from_rgb(90, 110, 140),
                delete: Color32::from_rgb(200, 60, 60),
                warning: Color32::from_rgb(200, 120, 0),
            }
        }
    }
}

/// Renders a canvas layout.
#[derive(Debug, Clone, Default)]
pub struct CanvasView;

impl CanvasView {
    pub fn new() -> Self {
        Self
    }

    /// Draw the toolbar (author only) and the canvas.
    pub fn show(&mut self, ui: &mut Ui, layout: &mut CanvasLayout) -> Response {
        if layout.role().is_author() {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Add field:").weak());
                for kind in VariableType::all() {
                    if ui.button(format!("+ {}", kind.label())).clicked() {
                        layout.add_capsule(*kind);
                    }
                }
            });
            ui.add_space(6.0);
        }

        let colors = CanvasColors::from_visuals(ui.visuals());
        let (width, height) = layout.bounds();
        let (response, painter) = ui.allocate_painter(Vec2::new(width, height), Sense::click_and_drag());
        let origin = response.rect.min;

        painter.rect_filled(response.rect, 4.0, colors.background);
        painter.rect_stroke(response.rect, 4.0, Stroke::new(1.0, colors.border));

        handle_pointer(ui, &response, layout, origin);

        let dragging_id = match layout.drag_state() {
            DragState::Dragging { id, .. } => Some(id.clone()),
            DragState::Idle => None,
        };
        let focus_request = layout.take_focus_request();

        let capsules: Vec<CanvasCapsule> = layout.capsules().to_vec();
        for capsule in &capsules {
            let rect = Rect::from_min_size(
                origin + Vec2::new(capsule.x, capsule.y),
                Vec2::new(capsule.width, capsule.height),
            );
            if layout.role().is_author() {
                let dragging = dragging_id.as_deref() == Some(capsule.id());
                paint_author_capsule(&painter, &colors, capsule, rect, dragging);
            } else {
                let focus = focus_request.as_deref() == Some(capsule.id());
                filler_input(ui, &colors, layout, capsule, rect, focus);
            }
        }

        response
    }
}

/// Translate raw pointer input into layout events, in canvas coordinates.
fn handle_pointer(ui: &Ui, response: &Response, layout: &mut CanvasLayout, origin: Pos2) {
    let (pressed, released, pos) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
        )
    });
    let local = pos.map(|p| (p.x - origin.x, p.y - origin.y));

    // Filler inputs sit on top of the canvas and take the hover, so the
    // press is hit-tested by position instead.
    let over_canvas = match layout.role() {
        Role::Author => response.hovered(),
        Role::Filler => pos.is_some_and(|p| response.rect.contains(p)),
    };
    if pressed && over_canvas {
        if let Some((x, y)) = local {
            layout.press(x, y);
        }
    }

    if layout.is_dragging() {
        if !response.contains_pointer() {
            layout.leave();
        } else if let Some((x, y)) = local {
            layout.drag_to(x, y);
        }
    }

    if released {
        layout.release();
    }
}

fn paint_author_capsule(
    painter: &egui::Painter,
    colors: &CanvasColors,
    capsule: &CanvasCapsule,
    rect: Rect,
    dragging: bool,
) {
    let border = if dragging {
        Stroke::new(2.0, colors.dragging)
    } else {
        Stroke::new(1.0, colors.capsule_border)
    };
    painter.rect_filled(rect, 6.0, colors.capsule);
    painter.rect_stroke(rect, 6.0, border);

    painter.text(
        rect.left_center() + Vec2::new(8.0, 0.0),
        Align2::LEFT_CENTER,
        capsule.variable.display_label(),
        FontId::proportional(14.0),
        colors.text,
    );
    painter.text(
        rect.right_center() - Vec2::new(DELETE_HANDLE_SIZE + 6.0, 0.0),
        Align2::RIGHT_CENTER,
        capsule.variable.kind.as_str(),
        FontId::proportional(11.0),
        colors.badge,
    );

    let handle = Rect::from_min_size(
        Pos2::new(rect.right() - DELETE_HANDLE_SIZE, rect.top()),
        Vec2::splat(DELETE_HANDLE_SIZE),
    );
    painter.text(
        handle.center(),
        Align2::CENTER_CENTER,
        "×",
        FontId::proportional(13.0),
        colors.delete,
    );
}

fn filler_input(
    ui: &mut Ui,
    colors: &CanvasColors,
    layout: &mut CanvasLayout,
    capsule: &CanvasCapsule,
    rect: Rect,
    focus: bool,
) {
    let variable = &capsule.variable;
    let id = ui.make_persistent_id(("canvas_input", variable.id.as_str()));
    let mut value = variable.value.clone();

    let response = match variable.kind {
        VariableType::Text => ui.put(
            rect,
            TextEdit::singleline(&mut value)
                .id(id)
                .hint_text(variable.display_label()),
        ),
        VariableType::Date => {
            let response = ui.put(
                rect,
                TextEdit::singleline(&mut value).id(id).hint_text("YYYY-MM-DD"),
            );
            if !value.is_empty() && !is_valid_date(&value) {
                ui.painter().text(
                    rect.right_center() - Vec2::new(6.0, 0.0),
                    Align2::RIGHT_CENTER,
                    "⚠",
                    FontId::proportional(13.0),
                    colors.warning,
                );
            }
            response
        }
        VariableType::RichText => ui.put(
            rect,
            TextEdit::multiline(&mut value)
                .id(id)
                .hint_text(variable.display_label()),
        ),
    };

    let tooltip = if variable.help_text.is_empty() {
        variable.display_label()
    } else {
        variable.help_text.clone()
    };
    let response = response.on_hover_text(tooltip);

    if focus {
        ui.memory_mut(|m| m.request_focus(id));
    }
    if response.gained_focus() || response.clicked() {
        layout.activate(&variable.id);
    }
    if response.changed() {
        layout.input_value(&variable.id, &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(layout: &mut CanvasLayout) {
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                CanvasView::new().show(ui, layout);
            });
        });
    }

    #[test]
    fn test_author_frame_without_input_changes_nothing() {
        let mut layout = CanvasLayout::new(Role::Author, 400.0, 300.0);
        layout.add_capsule(VariableType::Text);
        layout.add_capsule(VariableType::RichText);
        layout.take_events();

        run_frame(&mut layout);

        assert_eq!(layout.capsules().len(), 2);
        assert!(layout.take_events().is_empty());
    }

    fn pointer_frame(ctx: &egui::Context, layout: &mut CanvasLayout, events: Vec<egui::Event>) {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                CanvasView::new().show(ui, layout);
            });
        });
    }

    fn button(pos: Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn test_filler_press_over_input_sets_fill_target() {
        let mut layout = CanvasLayout::new(Role::Author, 400.0, 300.0);
        let id = layout.add_capsule(VariableType::Text).unwrap();
        layout.set_role(Role::Filler);
        layout.take_events();

        // The capsule spans (20, 20)..(220, 52) inside the panel margin.
        let ctx = egui::Context::default();
        let over_capsule = Pos2::new(110.0, 44.0);
        pointer_frame(&ctx, &mut layout, vec![egui::Event::PointerMoved(over_capsule)]);
        pointer_frame(&ctx, &mut layout, vec![button(over_capsule, true)]);
        pointer_frame(&ctx, &mut layout, vec![button(over_capsule, false)]);
        assert_eq!(layout.fill_target(), Some(id.as_str()));

        let empty = Pos2::new(300.0, 250.0);
        pointer_frame(&ctx, &mut layout, vec![egui::Event::PointerMoved(empty)]);
        pointer_frame(&ctx, &mut layout, vec![button(empty, true)]);
        pointer_frame(&ctx, &mut layout, vec![button(empty, false)]);
        assert_eq!(layout.fill_target(), None);
    }

    #[test]
    fn test_filler_frame_renders_inputs() {
        let mut layout = CanvasLayout::new(Role::Author, 400.0, 300.0);
        layout.add_capsule(VariableType::Date);
        layout.set_role(Role::Filler);
        layout.take_events();

        run_frame(&mut layout);

        assert!(layout.take_events().is_empty());
        assert!(!layout.is_dragging());
    }
}
