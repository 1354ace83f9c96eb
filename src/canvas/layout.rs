//! Canvas field layout
//!
//! The ordered list of positioned capsules plus the pointer state machine
//! that drags, deletes and selects them. Coordinates are canvas-local, with
//! the origin at the top-left corner.
//!
//! Every mutation that changes the list queues `CanvasEvent::CapsulesChanged`
//! with the full new list; the host drains events with `take_events`.

use crate::config::Role;
use crate::sync::{Subscription, SyncBridge};
use crate::variables::{
    create_canvas_capsule, CanvasCapsule, CanvasOverrides, Variable, VariableMetadata,
    VariableType, DEFAULT_HEIGHT, DEFAULT_WIDTH, DEFAULT_X, DEFAULT_Y,
};
use log::debug;
use std::collections::HashSet;

/// Side length of the delete handle in a capsule's top-right corner.
pub const DELETE_HANDLE_SIZE: f32 = 16.0;

/// Vertical distance between creation slots.
const SLOT_SPACING: f32 = 40.0;

/// Horizontal gap between creation columns.
const COLUMN_GAP: f32 = 20.0;

// ─────────────────────────────────────────────────────────────────────────────
// State & Events
// ─────────────────────────────────────────────────────────────────────────────

/// Pointer drag state. Only the author can drag.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        id: String,
        /// Pointer offset from the capsule's top-left at press time
        dx: f32,
        dy: f32,
        /// Whether any move was accepted since the press
        moved: bool,
    },
}

/// What a canvas point lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitZone {
    /// Delete handle of the capsule at this index
    Delete(usize),
    /// Body of the capsule at this index
    Body(usize),
    Miss,
}

/// Notifications for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    CapsulesChanged(Vec<CanvasCapsule>),
    CapsuleSelected(Variable),
    ValueChanged { id: String, value: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CanvasLayout {
    capsules: Vec<CanvasCapsule>,
    role: Role,
    drag: DragState,
    width: f32,
    height: f32,
    /// Capsule whose input is active in filler role
    fill_target: Option<String>,
    /// Set when a press asks the renderer to focus an input
    focus_request: Option<String>,
    events: Vec<CanvasEvent>,
    subscription: Option<Subscription>,
}

impl CanvasLayout {
    pub fn new(role: Role, width: f32, height: f32) -> Self {
        Self {
            capsules: Vec::new(),
            role,
            drag: DragState::Idle,
            width: width.max(0.0),
            height: height.max(0.0),
            fill_target: None,
            focus_request: None,
            events: Vec::new(),
            subscription: None,
        }
    }

    pub fn capsules(&self) -> &[CanvasCapsule] {
        &self.capsules
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn fill_target(&self) -> Option<&str> {
        self.fill_target.as_deref()
    }

    /// Drain queued events, oldest first.
    pub fn take_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn take_focus_request(&mut self) -> Option<String> {
        self.focus_request.take()
    }

    fn emit_changed(&mut self) {
        self.events
            .push(CanvasEvent::CapsulesChanged(self.capsules.clone()));
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.capsules.iter().position(|c| c.id() == id)
    }

    /// Switch role. Any drag in progress and the fill target are dropped.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        self.drag = DragState::Idle;
        self.fill_target = None;
    }

    /// Replace the list from props.
    ///
    /// Keeps the first capsule of each id and clamps every capsule into the
    /// bounds. Emits nothing; the caller already owns the list.
    pub fn set_capsules(&mut self, capsules: Vec<CanvasCapsule>) {
        let mut seen = HashSet::new();
        self.capsules = capsules
            .into_iter()
            .filter(|c| seen.insert(c.id().to_string()))
            .collect();
        for capsule in &mut self.capsules {
            clamp_into(capsule, self.width, self.height);
        }
        if let DragState::Dragging { id, .. } = &self.drag {
            if self.index_of(id).is_none() {
                self.drag = DragState::Idle;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hit Testing
    // ─────────────────────────────────────────────────────────────────────────

    /// Topmost capsule first; the delete handle wins over the body in author
    /// role and does not exist in filler role.
    pub fn hit_test(&self, px: f32, py: f32) -> HitZone {
        for (i, capsule) in self.capsules.iter().enumerate().rev() {
            if !capsule.contains(px, py) {
                continue;
            }
            if self.role.is_author() && in_delete_handle(capsule, px, py) {
                return HitZone::Delete(i);
            }
            return HitZone::Body(i);
        }
        HitZone::Miss
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pointer Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Primary button pressed at a canvas point.
    pub fn press(&mut self, px: f32, py: f32) {
        if self.is_dragging() {
            return;
        }
        let hit = self.hit_test(px, py);
        match self.role {
            Role::Author => match hit {
                HitZone::Delete(i) => {
                    let id = self.capsules[i].id().to_string();
                    self.delete_capsule(&id);
                }
                HitZone::Body(i) => {
                    let capsule = &self.capsules[i];
                    self.drag = DragState::Dragging {
                        id: capsule.id().to_string(),
                        dx: px - capsule.x,
                        dy: py - capsule.y,
                        moved: false,
                    };
                }
                HitZone::Miss => {}
            },
            Role::Filler => match hit {
                HitZone::Body(i) | HitZone::Delete(i) => {
                    let id = self.capsules[i].id().to_string();
                    self.fill_target = Some(id.clone());
                    self.focus_request = Some(id);
                }
                HitZone::Miss => {
                    self.fill_target = None;
                }
            },
        }
    }

    /// A filler input took keyboard focus: its capsule becomes the fill
    /// target. Ignored in author role and for unknown ids.
    pub fn activate(&mut self, id: &str) -> bool {
        if !self.role.is_filler() || self.index_of(id).is_none() {
            return false;
        }
        if self.fill_target.as_deref() != Some(id) {
            debug!("Fill target: {}", id);
            self.fill_target = Some(id.to_string());
        }
        true
    }

    /// Pointer moved while pressed. Returns whether the move was accepted.
    ///
    /// A move that would put any edge of the capsule outside the canvas is
    /// rejected and leaves the state unchanged.
    pub fn drag_to(&mut self, px: f32, py: f32) -> bool {
        let DragState::Dragging { id, dx, dy, moved } = &mut self.drag else {
            return false;
        };
        let Some(capsule) = self.capsules.iter_mut().find(|c| c.variable.id == *id) else {
            return false;
        };

        let x = px - *dx;
        let y = py - *dy;
        if x < 0.0 || y < 0.0 || x + capsule.width > self.width || y + capsule.height > self.height
        {
            return false;
        }
        if x == capsule.x && y == capsule.y {
            return true;
        }

        capsule.x = x;
        capsule.y = y;
        *moved = true;
        self.emit_changed();
        true
    }

    /// Primary button released. A press without any accepted move selects
    /// the capsule.
    pub fn release(&mut self) {
        if let DragState::Dragging { id, moved, .. } = std::mem::take(&mut self.drag) {
            if moved {
                debug!("Capsule {} dropped", id);
            } else if let Some(i) = self.index_of(&id) {
                self.events.push(CanvasEvent::CapsuleSelected(
                    self.capsules[i].to_variable(),
                ));
            }
        }
    }

    /// Pointer left the canvas. Ends a drag without selecting.
    pub fn leave(&mut self) {
        if self.is_dragging() {
            debug!("Drag cancelled: pointer left the canvas");
            self.drag = DragState::Idle;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capsule Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a capsule of `kind` at the first free creation slot.
    ///
    /// Author only. Returns the new id.
    pub fn add_capsule(&mut self, kind: VariableType) -> Option<String> {
        if !self.role.is_author() {
            return None;
        }
        let (x, y) = self.free_slot();
        let mut capsule = create_canvas_capsule(
            kind,
            CanvasOverrides {
                x: Some(x),
                y: Some(y),
                ..Default::default()
            },
        );
        clamp_into(&mut capsule, self.width, self.height);
        let id = capsule.id().to_string();
        debug!("Added {} capsule {} at ({}, {})", kind.as_str(), id, capsule.x, capsule.y);
        self.capsules.push(capsule);
        self.emit_changed();
        Some(id)
    }

    fn slot_position(&self, slot: usize) -> (f32, f32) {
        let usable = self.height - DEFAULT_Y - DEFAULT_HEIGHT;
        let rows = if usable < 0.0 {
            1
        } else {
            (usable / SLOT_SPACING).floor() as usize + 1
        };
        let column = slot / rows;
        let row = slot % rows;
        (
            DEFAULT_X + column as f32 * (DEFAULT_WIDTH + COLUMN_GAP),
            DEFAULT_Y + row as f32 * SLOT_SPACING,
        )
    }

    /// First slot whose rectangle overlaps no existing capsule.
    fn free_slot(&self) -> (f32, f32) {
        // A capsule can overlap at most four slots.
        let limit = self.capsules.len() * 4 + 1;
        (0..limit)
            .map(|slot| self.slot_position(slot))
            .find(|&(x, y)| {
                !self.capsules.iter().any(|c| {
                    x < c.x + c.width
                        && c.x < x + DEFAULT_WIDTH
                        && y < c.y + c.height
                        && c.y < y + DEFAULT_HEIGHT
                })
            })
            .unwrap_or_else(|| self.slot_position(self.capsules.len()))
    }

    /// Remove a capsule. Author only.
    pub fn delete_capsule(&mut self, id: &str) -> bool {
        if !self.role.is_author() {
            return false;
        }
        let Some(i) = self.index_of(id) else {
            return false;
        };
        self.capsules.remove(i);
        if self.fill_target.as_deref() == Some(id) {
            self.fill_target = None;
        }
        debug!("Deleted capsule {}", id);
        self.emit_changed();
        true
    }

    /// Resize the canvas and pull resting capsules back inside.
    pub fn set_bounds(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        let mut moved = false;
        for capsule in &mut self.capsules {
            moved |= clamp_into(capsule, self.width, self.height);
        }
        if moved {
            self.emit_changed();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Values & Metadata
    // ─────────────────────────────────────────────────────────────────────────

    /// A filler typed into a capsule input.
    pub fn input_value(&mut self, id: &str, value: &str) -> bool {
        if !self.role.is_filler() || !self.apply_value(id, value) {
            return false;
        }
        self.events.push(CanvasEvent::ValueChanged {
            id: id.to_string(),
            value: value.to_string(),
        });
        true
    }

    /// Set a capsule value silently, e.g. when propagated from the document.
    pub fn apply_value(&mut self, id: &str, value: &str) -> bool {
        match self.capsules.iter_mut().find(|c| c.variable.id == id) {
            Some(capsule) if capsule.variable.value != value => {
                capsule.variable.value = value.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn update_metadata(&mut self, meta: &VariableMetadata) -> bool {
        self.capsules
            .iter_mut()
            .find(|c| c.variable.id == meta.id)
            .is_some_and(|c| c.variable.apply_metadata(meta))
    }

    pub fn attach(&mut self, bridge: &mut SyncBridge) {
        self.subscription = Some(bridge.subscribe());
    }

    /// Apply every pending metadata edit. Returns the capsules changed.
    pub fn absorb(&mut self, bridge: &mut SyncBridge) -> usize {
        let Some(subscription) = &self.subscription else {
            return 0;
        };
        let edits = bridge.take(subscription);
        edits
            .iter()
            .filter(|meta| self.update_metadata(meta))
            .count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geometry Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn in_delete_handle(capsule: &CanvasCapsule, px: f32, py: f32) -> bool {
    px >= capsule.x + capsule.width - DELETE_HANDLE_SIZE && py <= capsule.y + DELETE_HANDLE_SIZE
}

/// Fit a capsule inside `width` x `height`, shrinking it if it is larger
/// than the canvas. Returns whether its geometry changed.
fn clamp_into(capsule: &mut CanvasCapsule, width: f32, height: f32) -> bool {
    let w = fit_extent(capsule.width, DEFAULT_WIDTH, width);
    let h = fit_extent(capsule.height, DEFAULT_HEIGHT, height);
    let x = finite_or_zero(capsule.x).min(width - w).max(0.0);
    let y = finite_or_zero(capsule.y).min(height - h).max(0.0);

    let changed = x != capsule.x || y != capsule.y || w != capsule.width || h != capsule.height;
    capsule.x = x;
    capsule.y = y;
    capsule.width = w;
    capsule.height = h;
    changed
}

/// A positive size no larger than `limit`; unusable sizes take `default`.
fn fit_extent(size: f32, default: f32, limit: f32) -> f32 {
    let size = if size.is_finite() && size > 0.0 { size } else { default };
    size.min(limit)
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableOverrides;

    fn capsule_at(label: &str, x: f32, y: f32) -> CanvasCapsule {
        create_canvas_capsule(
            VariableType::Text,
            CanvasOverrides {
                variable: VariableOverrides {
                    label: Some(label.to_string()),
                    ..Default::default()
                },
                x: Some(x),
                y: Some(y),
                ..Default::default()
            },
        )
    }

    fn layout_with(role: Role, capsules: Vec<CanvasCapsule>) -> CanvasLayout {
        let mut layout = CanvasLayout::new(role, 760.0, 420.0);
        layout.set_capsules(capsules);
        layout
    }

    fn in_bounds(layout: &CanvasLayout) -> bool {
        let (w, h) = layout.bounds();
        layout
            .capsules()
            .iter()
            .all(|c| c.x >= 0.0 && c.y >= 0.0 && c.x + c.width <= w && c.y + c.height <= h)
    }

    #[test]
    fn test_drag_to_negative_x_is_rejected() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.press(30.0, 30.0);
        assert!(layout.is_dragging());
        assert!(!layout.drag_to(5.0, 30.0));
        assert_eq!((layout.capsules()[0].x, layout.capsules()[0].y), (20.0, 20.0));
        assert!(layout.take_events().is_empty());
    }

    #[test]
    fn test_drag_past_right_and_bottom_edges_is_rejected() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.press(30.0, 30.0);
        // x + 200 would exceed 760
        assert!(!layout.drag_to(575.0, 30.0));
        // y + 32 would exceed 420
        assert!(!layout.drag_to(30.0, 400.0));
        assert_eq!(layout.capsules()[0].x, 20.0);
    }

    #[test]
    fn test_accepted_drag_emits_changes_and_no_selection() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.press(30.0, 30.0);
        assert!(layout.drag_to(110.0, 60.0));
        layout.release();

        assert_eq!((layout.capsules()[0].x, layout.capsules()[0].y), (100.0, 50.0));
        let events = layout.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], CanvasEvent::CapsulesChanged(list) if list[0].x == 100.0));
        assert_eq!(*layout.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_click_without_move_selects() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.press(30.0, 30.0);
        layout.release();
        let events = layout.take_events();
        assert!(matches!(&events[..], [CanvasEvent::CapsuleSelected(v)] if v.label == "A"));
    }

    #[test]
    fn test_leave_ends_drag_without_selection() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.press(30.0, 30.0);
        layout.leave();
        assert!(!layout.is_dragging());
        assert!(layout.take_events().is_empty());
    }

    #[test]
    fn test_moves_while_idle_are_ignored() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        assert!(!layout.drag_to(100.0, 100.0));
        layout.release();
        assert!(layout.take_events().is_empty());
    }

    #[test]
    fn test_delete_handle_removes_without_selecting() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        // top-right corner of a 200x32 capsule at (20, 20)
        assert_eq!(layout.hit_test(215.0, 25.0), HitZone::Delete(0));
        layout.press(215.0, 25.0);
        assert!(layout.capsules().is_empty());
        assert!(!layout.is_dragging());
        let events = layout.take_events();
        assert_eq!(events, vec![CanvasEvent::CapsulesChanged(Vec::new())]);
    }

    #[test]
    fn test_topmost_capsule_wins_hit_test() {
        let mut layout = layout_with(
            Role::Author,
            vec![capsule_at("Below", 20.0, 20.0), capsule_at("Above", 40.0, 30.0)],
        );
        assert_eq!(layout.hit_test(50.0, 40.0), HitZone::Body(1));
        assert_eq!(layout.hit_test(25.0, 22.0), HitZone::Body(0));
        assert_eq!(layout.hit_test(700.0, 400.0), HitZone::Miss);
        layout.set_role(Role::Filler);
        assert_eq!(layout.hit_test(235.0, 35.0), HitZone::Body(1));
    }

    #[test]
    fn test_filler_cannot_drag_delete_or_add() {
        let mut layout = layout_with(Role::Filler, vec![capsule_at("A", 20.0, 20.0)]);
        layout.press(215.0, 25.0);
        assert!(!layout.is_dragging());
        assert_eq!(layout.capsules().len(), 1);
        assert!(layout.add_capsule(VariableType::Date).is_none());
        let id = layout.capsules()[0].id().to_string();
        assert!(!layout.delete_capsule(&id));
    }

    #[test]
    fn test_filler_press_sets_and_clears_fill_target() {
        let mut layout = layout_with(Role::Filler, vec![capsule_at("A", 20.0, 20.0)]);
        let id = layout.capsules()[0].id().to_string();
        layout.press(30.0, 30.0);
        assert_eq!(layout.fill_target(), Some(id.as_str()));
        assert_eq!(layout.take_focus_request(), Some(id));
        layout.press(600.0, 300.0);
        assert_eq!(layout.fill_target(), None);
    }

    #[test]
    fn test_activate_sets_fill_target_for_filler_only() {
        let capsule = capsule_at("A", 20.0, 20.0);
        let id = capsule.id().to_string();
        let mut layout = layout_with(Role::Author, vec![capsule]);
        assert!(!layout.activate(&id));
        assert_eq!(layout.fill_target(), None);

        layout.set_role(Role::Filler);
        assert!(!layout.activate("missing"));
        assert!(layout.activate(&id));
        assert_eq!(layout.fill_target(), Some(id.as_str()));
        assert_eq!(layout.take_focus_request(), None);
    }

    #[test]
    fn test_filler_input_emits_every_keystroke() {
        let mut layout = layout_with(Role::Filler, vec![capsule_at("A", 20.0, 20.0)]);
        let id = layout.capsules()[0].id().to_string();
        for prefix in ["A", "Al", "Ali", "Alic", "Alice"] {
            assert!(layout.input_value(&id, prefix));
        }
        let values: Vec<String> = layout
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                CanvasEvent::ValueChanged { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec!["A", "Al", "Ali", "Alic", "Alice"]);
    }

    #[test]
    fn test_add_capsule_uses_free_slots_and_wraps_columns() {
        let mut layout = CanvasLayout::new(Role::Author, 760.0, 140.0);
        // rows per column: floor((140 - 20 - 32) / 40) + 1 = 3
        for _ in 0..4 {
            layout.add_capsule(VariableType::Text);
        }
        let positions: Vec<(f32, f32)> = layout.capsules().iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            positions,
            vec![(20.0, 20.0), (20.0, 60.0), (20.0, 100.0), (240.0, 20.0)]
        );
        assert_eq!(layout.take_events().len(), 4);
    }

    #[test]
    fn test_add_capsule_skips_occupied_slot() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 60.0)]);
        layout.add_capsule(VariableType::Text);
        layout.add_capsule(VariableType::Text);
        let ys: Vec<f32> = layout.capsules().iter().map(|c| c.y).collect();
        assert_eq!(ys, vec![60.0, 20.0, 100.0]);
    }

    #[test]
    fn test_set_capsules_keeps_one_per_id() {
        let a = capsule_at("A", 20.0, 20.0);
        let mut dup = a.clone();
        dup.x = 300.0;
        let layout = layout_with(Role::Author, vec![a, dup]);
        assert_eq!(layout.capsules().len(), 1);
        assert_eq!(layout.capsules()[0].x, 20.0);
    }

    #[test]
    fn test_set_bounds_reclamps() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 500.0, 300.0)]);
        layout.set_bounds(400.0, 200.0);
        assert_eq!((layout.capsules()[0].x, layout.capsules()[0].y), (200.0, 168.0));
        assert_eq!(layout.take_events().len(), 1);

        layout.set_bounds(400.0, 200.0);
        assert!(layout.take_events().is_empty());
    }

    #[test]
    fn test_oversized_and_negative_capsules_are_fitted() {
        let mut wide = capsule_at("Wide", 20.0, 20.0);
        wide.width = 5000.0;
        let mut neg = capsule_at("Neg", 100.0, 100.0);
        neg.width = -50.0;
        neg.height = -10.0;
        let mut layout = layout_with(Role::Author, vec![wide, neg]);

        assert!(in_bounds(&layout));
        assert_eq!((layout.capsules()[0].x, layout.capsules()[0].width), (0.0, 760.0));
        assert_eq!(
            (layout.capsules()[1].width, layout.capsules()[1].height),
            (DEFAULT_WIDTH, DEFAULT_HEIGHT)
        );

        layout.press(110.0, 110.0);
        assert!(layout.is_dragging());
    }

    #[test]
    fn test_set_bounds_shrinks_capsules_wider_than_canvas() {
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.set_bounds(150.0, 200.0);
        assert!(in_bounds(&layout));
        assert_eq!(layout.capsules()[0].width, 150.0);
        assert_eq!(layout.take_events().len(), 1);
    }

    #[test]
    fn test_drag_sequence_stays_in_bounds() {
        let mut layout = layout_with(
            Role::Author,
            vec![capsule_at("A", 20.0, 20.0), capsule_at("B", 300.0, 200.0)],
        );
        let points = [
            (-50.0, 10.0),
            (900.0, 30.0),
            (120.0, 500.0),
            (400.0, 250.0),
            (759.0, 419.0),
            (0.0, 0.0),
        ];
        for start in [(30.0, 30.0), (310.0, 210.0)] {
            layout.press(start.0, start.1);
            for (px, py) in points {
                layout.drag_to(px, py);
                assert!(in_bounds(&layout));
            }
            layout.release();
        }
        assert!(in_bounds(&layout));
    }

    #[test]
    fn test_absorb_updates_matching_capsule() {
        let mut bridge = SyncBridge::new();
        let mut layout = layout_with(Role::Author, vec![capsule_at("A", 20.0, 20.0)]);
        layout.attach(&mut bridge);
        let mut meta = layout.capsules()[0].variable.metadata();
        meta.label = "Renamed".to_string();
        meta.kind = VariableType::Date;
        bridge.publish(meta);

        assert_eq!(layout.absorb(&mut bridge), 1);
        assert_eq!(layout.capsules()[0].variable.label, "Renamed");
        assert_eq!(layout.capsules()[0].variable.kind, VariableType::Date);
        assert_eq!(layout.absorb(&mut bridge), 0);
    }
}
