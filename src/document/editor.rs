//! Document editor widget
//!
//! Renders the mounted document with one of two strategies:
//!
//! - **Author**: every text run is an inline `TextEdit`, embeddings are
//!   clickable chips, Enter splits the block and Backspace at the start of a
//!   block joins it backward.
//! - **Filler**: text is read-only and every embedding becomes an input
//!   matched to its variable type.
//!
//! The widget renders from a snapshot of the tree and collects edits as
//! actions, which are applied to the adapter after the frame's layout.

use super::adapter::{DocumentAdapter, ValueEdit};
use super::node::{Block, EmbeddingLocation, Inline, Mark, TextPosition};
use crate::config::Role;
use crate::variables::{is_valid_date, Variable, VariableType};
use eframe::egui::{
    self, text::CCursor, text::CCursorRange, Color32, FontId, Id, Key, RichText, TextEdit, Ui,
};
use log::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

/// What happened in the editor this frame.
#[derive(Debug, Clone, Default)]
pub struct DocumentEditorOutput {
    /// The author changed text or structure.
    pub changed: bool,
    /// Filler value edits, one per keystroke.
    pub value_edits: Vec<ValueEdit>,
    /// An embedding chip was clicked in author role.
    pub selected: Option<Variable>,
}

/// A selected range inside one textblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSelection {
    pub path: Vec<usize>,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone)]
enum EditorAction {
    ReplaceRun {
        path: Vec<usize>,
        index: usize,
        text: String,
    },
    AppendText {
        path: Vec<usize>,
        text: String,
    },
    SetCode {
        path: Vec<usize>,
        text: String,
    },
    Split,
    JoinBackward(Vec<usize>),
    RemoveEmbedding {
        path: Vec<usize>,
        index: usize,
    },
    Select(String),
    SetValue {
        loc: EmbeddingLocation,
        value: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct EditorColors {
    text: Color32,
    heading: Color32,
    link: Color32,
    muted: Color32,
    chip_bg: Color32,
    chip_text: Color32,
    warning: Color32,
}

impl EditorColors {
    fn from_visuals(visuals: &egui::Visuals) -> Self {
        if visuals.dark_mode {
            Self {
                text: Color32::from_rgb(220, 220, 220),
                heading: Color32::from_rgb(100, 180, 255),
                link: Color32::from_rgb(120, 170, 255),
                muted: Color32::from_rgb(120, 120, 120),
                chip_bg: Color32::from_rgb(40, 70, 110),
                chip_text: Color32::from_rgb(220, 235, 255),
                warning: Color32::from_rgb(230, 160, 60),
            }
        } else {
            Self {
                text: Color32::from_rgb(30, 30, 30),
                heading: Color32::from_rgb(0, 100, 180),
                link: Color32::from_rgb(0, 90, 200),
                muted: Color32::from_rgb(150, 150, 150),
                chip_bg: Color32::from_rgb(215, 230, 250),
                chip_text: Color32::from_rgb(20, 60, 120),
                warning: Color32::from_rgb(200, 120, 0),
            }
        }
    }
}

fn heading_size(base: f32, level: u8) -> f32 {
    match level {
        1 => base * 2.0,
        2 => base * 1.6,
        3 => base * 1.35,
        4 => base * 1.2,
        5 => base * 1.1,
        _ => base,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Editor
// ─────────────────────────────────────────────────────────────────────────────

/// The document editor. Holds only view state; the tree lives in the adapter.
#[derive(Debug, Clone)]
pub struct DocumentEditor {
    font_size: f32,
    last_selection: Option<TextSelection>,
}

impl Default for DocumentEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame rendering state.
struct RenderCtx<'a> {
    role: Role,
    generation: u64,
    font_size: f32,
    colors: EditorColors,
    focus: Option<TextPosition>,
    actions: &'a mut Vec<EditorAction>,
    cursor: Option<TextPosition>,
    selection: Option<TextSelection>,
}

impl RenderCtx<'_> {
    fn widget_id(&self, ui: &Ui, kind: &str, path: &[usize], index: usize) -> Id {
        ui.make_persistent_id((kind, self.generation, path, index))
    }

    /// Give focus to `id` if the pending focus position falls in its range.
    fn apply_focus(&mut self, ui: &Ui, id: Id, path: &[usize], start: usize, end: usize) {
        let Some(focus) = &self.focus else {
            return;
        };
        if focus.path != path || focus.offset < start || focus.offset > end {
            return;
        }
        let local = focus.offset - start;
        let mut state = egui::text_edit::TextEditState::load(ui.ctx(), id).unwrap_or_default();
        state
            .cursor
            .set_char_range(Some(CCursorRange::one(CCursor::new(local))));
        state.store(ui.ctx(), id);
        ui.memory_mut(|m| m.request_focus(id));
        self.focus = None;
    }
}

impl DocumentEditor {
    pub fn new() -> Self {
        Self {
            font_size: 15.0,
            last_selection: None,
        }
    }

    /// Set the base font size.
    #[must_use]
    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// The last text range selected in author role.
    pub fn last_selection(&self) -> Option<&TextSelection> {
        self.last_selection.as_ref()
    }

    fn focus_key(ui: &Ui) -> Id {
        ui.make_persistent_id("document_editor_focus")
    }

    /// Render the document and apply this frame's edits to the adapter.
    pub fn show(&mut self, ui: &mut Ui, adapter: &mut DocumentAdapter) -> DocumentEditorOutput {
        let doc = adapter.document().clone();
        let focus_key = Self::focus_key(ui);
        let focus = ui.data_mut(|d| {
            let pos = d.get_temp::<TextPosition>(focus_key);
            d.remove::<TextPosition>(focus_key);
            pos
        });

        let mut actions = Vec::new();
        let mut ctx = RenderCtx {
            role: adapter.role(),
            generation: adapter.generation(),
            font_size: self.font_size,
            colors: EditorColors::from_visuals(ui.visuals()),
            focus,
            actions: &mut actions,
            cursor: None,
            selection: None,
        };

        egui::ScrollArea::vertical()
            .id_source("document_editor_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (i, block) in doc.blocks.iter().enumerate() {
                    render_block(ui, &mut ctx, block, &[i]);
                }
            });

        let cursor = ctx.cursor.take();
        if let Some(selection) = ctx.selection.take() {
            self.last_selection = Some(selection);
        }
        if let Some(cursor) = cursor {
            adapter.set_cursor(cursor);
        }

        let output = apply_actions(adapter, actions);
        if output.changed {
            if let Some(next) = adapter.cursor().cloned() {
                ui.data_mut(|d| d.insert_temp(focus_key, next));
            }
        }
        output
    }
}

fn apply_actions(adapter: &mut DocumentAdapter, actions: Vec<EditorAction>) -> DocumentEditorOutput {
    let mut output = DocumentEditorOutput::default();
    for action in actions {
        match action {
            EditorAction::ReplaceRun { path, index, text } => {
                output.changed |= adapter.replace_run_text(&path, index, &text);
            }
            EditorAction::AppendText { path, text } => {
                output.changed |= adapter.append_text(&path, &text);
            }
            EditorAction::SetCode { path, text } => {
                output.changed |= adapter.set_code_text(&path, &text);
            }
            EditorAction::Split => {
                output.changed |= adapter.split_at_cursor();
            }
            EditorAction::JoinBackward(path) => {
                output.changed |= adapter.join_backward(&path);
            }
            EditorAction::RemoveEmbedding { path, index } => {
                output.changed |= adapter.delete_inline(&path, index);
            }
            EditorAction::Select(id) => {
                output.selected = adapter.selection_for(&id);
            }
            EditorAction::SetValue { loc, value } => {
                if let Some(edit) = adapter.set_embedding_value(&loc, &value) {
                    output.value_edits.push(edit);
                }
            }
        }
    }
    if output.changed {
        debug!("Document edited (version {})", adapter.version());
    }
    output
}

// ─────────────────────────────────────────────────────────────────────────────
// Block Rendering
// ─────────────────────────────────────────────────────────────────────────────

fn child(path: &[usize], idx: usize) -> Vec<usize> {
    let mut p = path.to_vec();
    p.push(idx);
    p
}

fn render_block(ui: &mut Ui, ctx: &mut RenderCtx, block: &Block, path: &[usize]) {
    match block {
        Block::Paragraph(content) => {
            render_textblock(ui, ctx, content, path, ctx.font_size, ctx.colors.text);
            ui.add_space(4.0);
        }
        Block::Heading { level, content } => {
            ui.add_space(6.0);
            let size = heading_size(ctx.font_size, *level);
            render_textblock(ui, ctx, content, path, size, ctx.colors.heading);
            ui.add_space(4.0);
        }
        Block::CodeBlock(code) => render_code_block(ui, ctx, code, path),
        Block::HorizontalRule => {
            ui.separator();
        }
        Block::Blockquote(children) => {
            ui.horizontal(|ui| {
                ui.label(RichText::new("▍").color(ctx.colors.muted));
                ui.vertical(|ui| {
                    for (i, b) in children.iter().enumerate() {
                        render_block(ui, ctx, b, &child(path, i));
                    }
                });
            });
        }
        Block::BulletList(items) => render_list(ui, ctx, items, path, None),
        Block::OrderedList { order, items } => render_list(ui, ctx, items, path, Some(*order)),
        Block::ListItem(children) => {
            ui.vertical(|ui| {
                for (i, b) in children.iter().enumerate() {
                    render_block(ui, ctx, b, &child(path, i));
                }
            });
        }
    }
}

fn render_list(ui: &mut Ui, ctx: &mut RenderCtx, items: &[Block], path: &[usize], order: Option<u32>) {
    for (i, item) in items.iter().enumerate() {
        let marker = match order {
            Some(start) => format!("{}.", start as usize + i),
            None => "•".to_string(),
        };
        ui.horizontal(|ui| {
            ui.label(RichText::new(marker).color(ctx.colors.muted));
            ui.vertical(|ui| render_block(ui, ctx, item, &child(path, i)));
        });
    }
}

fn render_code_block(ui: &mut Ui, ctx: &mut RenderCtx, code: &str, path: &[usize]) {
    match ctx.role {
        Role::Author => {
            let id = ctx.widget_id(ui, "code", path, 0);
            ctx.apply_focus(ui, id, path, 0, code.chars().count());
            let mut buf = code.to_string();
            let output = TextEdit::multiline(&mut buf)
                .id(id)
                .code_editor()
                .desired_rows(2)
                .desired_width(f32::INFINITY)
                .show(ui);
            if output.response.changed() {
                ctx.actions.push(EditorAction::SetCode {
                    path: path.to_vec(),
                    text: buf,
                });
            }
            if output.response.has_focus() {
                if let Some(range) = output.cursor_range {
                    ctx.cursor = Some(TextPosition::new(path.to_vec(), range.primary.ccursor.index));
                }
            }
        }
        Role::Filler => {
            ui.label(RichText::new(code).monospace());
        }
    }
    ui.add_space(4.0);
}

fn render_textblock(
    ui: &mut Ui,
    ctx: &mut RenderCtx,
    content: &[Inline],
    path: &[usize],
    size: f32,
    color: Color32,
) {
    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        let mut start = 0;
        for (index, inline) in content.iter().enumerate() {
            let len = inline.node_size();
            match ctx.role {
                Role::Author => author_inline(ui, ctx, inline, path, index, start, size, color),
                Role::Filler => filler_inline(ui, ctx, inline, path, index, size, color),
            }
            start += len;
        }

        if ctx.role == Role::Author && content.last().map_or(true, Inline::is_atom) {
            trailing_slot(ui, ctx, path, start, size, content.is_empty());
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Author Strategy
// ─────────────────────────────────────────────────────────────────────────────

fn text_width(ui: &Ui, text: &str, font: &FontId) -> f32 {
    ui.fonts(|f| {
        f.layout_no_wrap(text.to_owned(), font.clone(), Color32::PLACEHOLDER)
            .size()
            .x
    })
}

#[allow(clippy::too_many_arguments)]
fn author_inline(
    ui: &mut Ui,
    ctx: &mut RenderCtx,
    inline: &Inline,
    path: &[usize],
    index: usize,
    start: usize,
    size: f32,
    color: Color32,
) {
    match inline {
        Inline::Text { text, marks } => {
            let font = if marks.contains(&Mark::Code) {
                FontId::monospace(size)
            } else {
                FontId::proportional(size)
            };
            let color = if marks.iter().any(|m| matches!(m, Mark::Link { .. })) {
                ctx.colors.link
            } else {
                color
            };
            let id = ctx.widget_id(ui, "run", path, index);
            let len = text.chars().count();
            ctx.apply_focus(ui, id, path, start, start + len);

            let mut buf = text.clone();
            let width = text_width(ui, text, &font) + 4.0;
            let output = TextEdit::singleline(&mut buf)
                .id(id)
                .frame(false)
                .font(font)
                .text_color(color)
                .desired_width(width)
                .show(ui);

            if output.response.changed() {
                ctx.actions.push(EditorAction::ReplaceRun {
                    path: path.to_vec(),
                    index,
                    text: buf,
                });
            }
            track_cursor(ui, ctx, &output, path, start);
        }
        Inline::Variable(v) => {
            let chip = egui::Button::new(
                RichText::new(v.display_label())
                    .color(ctx.colors.chip_text)
                    .size(size * 0.9),
            )
            .fill(ctx.colors.chip_bg)
            .rounding(8.0);
            let hover = if v.help_text.is_empty() {
                v.kind.label().to_string()
            } else {
                format!("{} · {}", v.kind.label(), v.help_text)
            };
            let response = ui.add(chip).on_hover_text(hover);
            if response.clicked() {
                ctx.actions.push(EditorAction::Select(v.id.clone()));
            }
            response.context_menu(|ui| {
                if ui.button("Configure…").clicked() {
                    ctx.actions.push(EditorAction::Select(v.id.clone()));
                    ui.close_menu();
                }
                if ui.button("Remove from document").clicked() {
                    ctx.actions.push(EditorAction::RemoveEmbedding {
                        path: path.to_vec(),
                        index,
                    });
                    ui.close_menu();
                }
            });
        }
        Inline::HardBreak => ui.end_row(),
        Inline::Image { src, alt, .. } => {
            ui.label(RichText::new(format!("🖼 {}", alt.as_deref().unwrap_or(src))).color(ctx.colors.muted));
        }
    }
}

/// Editable slot after a trailing atom, or in an empty block.
fn trailing_slot(ui: &mut Ui, ctx: &mut RenderCtx, path: &[usize], start: usize, size: f32, empty: bool) {
    let id = ctx.widget_id(ui, "slot", path, start);
    ctx.apply_focus(ui, id, path, start, start);
    let mut buf = String::new();
    let mut edit = TextEdit::singleline(&mut buf)
        .id(id)
        .frame(false)
        .font(FontId::proportional(size))
        .desired_width(if empty { 240.0 } else { 24.0 });
    if empty {
        edit = edit.hint_text(RichText::new("Type here…").color(ctx.colors.muted));
    }
    let output = edit.show(ui);
    if output.response.changed() && !buf.is_empty() {
        ctx.actions.push(EditorAction::AppendText {
            path: path.to_vec(),
            text: buf,
        });
    }
    track_cursor(ui, ctx, &output, path, start);
}

/// Record caret and selection, and turn Enter / Backspace-at-start into
/// structural actions.
fn track_cursor(
    ui: &Ui,
    ctx: &mut RenderCtx,
    output: &egui::text_edit::TextEditOutput,
    path: &[usize],
    start: usize,
) {
    let Some(range) = output.cursor_range else {
        return;
    };
    let primary = range.primary.ccursor.index;
    let secondary = range.secondary.ccursor.index;

    if output.response.has_focus() {
        ctx.cursor = Some(TextPosition::new(path.to_vec(), start + primary));
        if primary != secondary {
            ctx.selection = Some(TextSelection {
                path: path.to_vec(),
                from: start + primary.min(secondary),
                to: start + primary.max(secondary),
            });
        }
        if start == 0 && primary == 0 && ui.input(|i| i.key_pressed(Key::Backspace)) {
            ctx.actions.push(EditorAction::JoinBackward(path.to_vec()));
        }
    }

    if output.response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
        ctx.cursor = Some(TextPosition::new(path.to_vec(), start + primary));
        ctx.actions.push(EditorAction::Split);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filler Strategy
// ─────────────────────────────────────────────────────────────────────────────

fn marked_text(text: &str, marks: &[Mark], size: f32, color: Color32, link: Color32) -> RichText {
    let mut rich = RichText::new(text).size(size).color(color);
    for mark in marks {
        rich = match mark {
            Mark::Strong => rich.strong(),
            Mark::Em => rich.italics(),
            Mark::Code => rich.code(),
            Mark::Link { .. } => rich.color(link).underline(),
        };
    }
    rich
}

fn filler_inline(
    ui: &mut Ui,
    ctx: &mut RenderCtx,
    inline: &Inline,
    path: &[usize],
    index: usize,
    size: f32,
    color: Color32,
) {
    match inline {
        Inline::Text { text, marks } => {
            ui.label(marked_text(text, marks, size, color, ctx.colors.link));
        }
        Inline::HardBreak => ui.end_row(),
        Inline::Image { src, alt, .. } => {
            ui.label(RichText::new(format!("🖼 {}", alt.as_deref().unwrap_or(src))).color(ctx.colors.muted));
        }
        Inline::Variable(v) => {
            let id = ctx.widget_id(ui, "embedding", path, index);
            let mut value = v.value.clone();
            let response = match v.kind {
                VariableType::Text => ui.add(
                    TextEdit::singleline(&mut value)
                        .id(id)
                        .hint_text(v.display_label())
                        .desired_width(160.0),
                ),
                VariableType::Date => {
                    let response = ui.add(
                        TextEdit::singleline(&mut value)
                            .id(id)
                            .hint_text("YYYY-MM-DD")
                            .desired_width(100.0),
                    );
                    if !value.is_empty() && !is_valid_date(&value) {
                        ui.colored_label(ctx.colors.warning, "⚠")
                            .on_hover_text("Expected a date as YYYY-MM-DD");
                    }
                    response
                }
                VariableType::RichText => ui.add(
                    TextEdit::multiline(&mut value)
                        .id(id)
                        .hint_text(v.display_label())
                        .desired_rows(3)
                        .desired_width(f32::INFINITY),
                ),
            };
            let response = if v.help_text.is_empty() {
                response.on_hover_text(v.display_label())
            } else {
                response.on_hover_text(&v.help_text)
            };
            if response.changed() {
                ctx.actions.push(EditorAction::SetValue {
                    loc: EmbeddingLocation {
                        path: path.to_vec(),
                        index,
                    },
                    value,
                });
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
