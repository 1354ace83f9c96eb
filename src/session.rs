//! Session controller
//!
//! Owns the role, the active view and the canonical persisted state, and
//! routes events between the document adapter, the canvas layout, the sync
//! bridge and the state store. Only the session writes to durable storage.

use crate::canvas::{CanvasEvent, CanvasLayout};
use crate::config::{ActiveView, Role, Settings};
use crate::document::{DocumentAdapter, DocumentEditorOutput, LoadOutcome};
use crate::error::{Result, ResultExt};
use crate::storage::{PersistedState, StateStore};
use crate::sync::SyncBridge;
use crate::variables::{CanvasCapsule, Variable, VariableMetadata};
use chrono::Utc;
use log::{debug, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Notifications for the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A variable was selected for configuration
    CapsuleSelect(Variable),
    /// The canonical list changed (add, delete, move)
    CapsulesChange(Vec<CanvasCapsule>),
    /// A filler edited a value
    CapsuleValueChange { id: String, value: String },
    /// Author metadata was saved from the configuration panel
    ModifiedCapsule(VariableMetadata),
    /// Writing the state failed; the in-memory state is kept
    SaveFailed(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Controller
// ─────────────────────────────────────────────────────────────────────────────

pub struct SessionController {
    role: Role,
    view: ActiveView,
    state: PersistedState,
    document: DocumentAdapter,
    canvas: CanvasLayout,
    bridge: SyncBridge,
    store: Box<dyn StateStore>,
    events: Vec<CoreEvent>,
    /// Variable shown in the configuration panel
    config_target: Option<Variable>,
    auto_save: bool,
    /// Filler values changed since the last auto-save
    auto_save_pending: bool,
    /// Unsaved structural changes
    dirty: bool,
    last_save_error: Option<String>,
}

impl SessionController {
    /// Load the stored state and mount both components.
    ///
    /// A store that cannot be read leaves the session empty with a warning.
    pub fn new(store: Box<dyn StateStore>, settings: &Settings) -> Self {
        let mut state = store
            .load()
            .unwrap_or_warn_default(PersistedState::default(), "Failed to load saved state");
        let role = settings.default_role;

        let mut canvas = CanvasLayout::new(role, settings.canvas_width, settings.canvas_height);
        canvas.set_capsules(std::mem::take(&mut state.positioned_variables));
        state.positioned_variables = canvas.capsules().to_vec();

        let mut document = DocumentAdapter::new(role);
        if let LoadOutcome::Recovered { reason } = document.load_document(state.document_tree.as_ref()) {
            warn!("Saved document could not be restored: {}", reason);
        }
        document.set_available_variables(state.available_variables());

        let mut bridge = SyncBridge::new();
        document.attach(&mut bridge);
        canvas.attach(&mut bridge);

        info!(
            "Session started as {} from {} ({} variables)",
            role.label(),
            store.location(),
            state.positioned_variables.len()
        );

        Self {
            role,
            view: settings.default_view,
            state,
            document,
            canvas,
            bridge,
            store,
            events: Vec::new(),
            config_target: None,
            auto_save: settings.auto_save_values,
            auto_save_pending: false,
            dirty: false,
            last_save_error: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn view(&self) -> ActiveView {
        self.view
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn document(&self) -> &DocumentAdapter {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut DocumentAdapter {
        &mut self.document
    }

    pub fn canvas(&self) -> &CanvasLayout {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasLayout {
        &mut self.canvas
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub fn config_target(&self) -> Option<&Variable> {
        self.config_target.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save = enabled;
    }

    /// The canonical variables without positions.
    pub fn available_variables(&self) -> Vec<Variable> {
        self.state.available_variables()
    }

    /// Drain host events, oldest first.
    pub fn take_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role & View
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch role for both components.
    ///
    /// The document is remounted through a snapshot, so text typed but not
    /// saved survives. An open configuration panel is closed.
    pub fn set_role(&mut self, role: Role) {
        if role == self.role {
            return;
        }
        let snapshot = self.document.set_role(role);
        self.state.document_tree = Some(snapshot);
        self.canvas.set_role(role);
        self.config_target = None;
        self.role = role;
        info!("Switched to {} role", role.label());
    }

    pub fn toggle_role(&mut self) {
        self.set_role(self.role.toggle());
    }

    pub fn set_view(&mut self, view: ActiveView) {
        if view == self.view {
            return;
        }
        self.state.document_tree = Some(self.document.export_document());
        self.view = view;
        debug!("Active view: {}", view.label());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Routing
    // ─────────────────────────────────────────────────────────────────────────

    /// Route pending canvas events and configuration requests.
    pub fn pump(&mut self) {
        for event in self.canvas.take_events() {
            match event {
                CanvasEvent::CapsulesChanged(list) => self.on_capsules_changed(list),
                CanvasEvent::CapsuleSelected(variable) => self.select_for_config(variable),
                CanvasEvent::ValueChanged { id, value } => self.on_value_changed(&id, &value),
            }
        }
        if let Some(variable) = self.bridge.take_configuration_request() {
            if self.role.is_author() {
                debug!("Opening configuration for {}", variable.id);
                self.config_target = Some(variable.clone());
                self.events.push(CoreEvent::CapsuleSelect(variable));
            }
        }
    }

    /// Route what the document editor reported this frame.
    pub fn handle_document_output(&mut self, output: DocumentEditorOutput) {
        if output.changed {
            self.dirty = true;
        }
        for edit in output.value_edits {
            self.on_value_changed(&edit.id, &edit.value);
        }
        if let Some(variable) = output.selected {
            self.select_for_config(variable);
        }
        self.pump();
    }

    /// The canvas list changed: it becomes canonical and feeds the insert menu.
    pub fn on_capsules_changed(&mut self, capsules: Vec<CanvasCapsule>) {
        self.state.positioned_variables = capsules.clone();
        self.document
            .set_available_variables(self.state.available_variables());
        self.dirty = true;
        self.events.push(CoreEvent::CapsulesChange(capsules));
    }

    /// A filler edited a value, in either view.
    ///
    /// The canonical variable, the canvas capsule and every document
    /// embedding of the id take the value. In filler role an auto-save is
    /// scheduled for the next `flush_auto_save`.
    pub fn on_value_changed(&mut self, id: &str, value: &str) {
        if let Some(capsule) = self
            .state
            .positioned_variables
            .iter_mut()
            .find(|c| c.variable.id == id)
        {
            capsule.variable.value = value.to_string();
        }
        self.canvas.apply_value(id, value);
        self.document.apply_value(id, value);
        self.events.push(CoreEvent::CapsuleValueChange {
            id: id.to_string(),
            value: value.to_string(),
        });

        if self.role.is_filler() && self.auto_save {
            self.auto_save_pending = true;
        }
    }

    /// Write scheduled filler values, at most once per call. The host calls
    /// this once per frame. Returns whether a write was attempted.
    pub fn flush_auto_save(&mut self) -> bool {
        if !std::mem::take(&mut self.auto_save_pending) {
            return false;
        }
        if let Err(e) = self.write_state(false) {
            debug!("Auto-save failed: {}", e);
        }
        true
    }

    /// Ask for the configuration panel. Author only.
    pub fn select_for_config(&mut self, variable: Variable) {
        if !self.role.is_author() {
            return;
        }
        self.bridge.request_configuration(variable);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply metadata saved from the configuration panel everywhere, then
    /// persist.
    pub fn save_config(&mut self, meta: VariableMetadata) -> Result<()> {
        for capsule in self
            .state
            .positioned_variables
            .iter_mut()
            .filter(|c| c.variable.id == meta.id)
        {
            capsule.variable.apply_metadata(&meta);
        }

        self.bridge.publish(meta.clone());
        let on_canvas = self.canvas.absorb(&mut self.bridge);
        let in_document = self.document.absorb(&mut self.bridge);
        self.document
            .set_available_variables(self.state.available_variables());
        debug!(
            "Metadata of {} applied to {} capsules and {} embeddings",
            meta.id, on_canvas, in_document
        );

        self.config_target = None;
        self.events.push(CoreEvent::ModifiedCapsule(meta));
        self.save()
    }

    pub fn close_config(&mut self) {
        self.config_target = None;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Write the state: current document, canonical list and a timestamp.
    ///
    /// On failure the in-memory state is kept and `SaveFailed` is queued.
    pub fn save(&mut self) -> Result<()> {
        self.write_state(true)
    }

    /// Auto-saves report a failure only once until a write succeeds again.
    fn write_state(&mut self, explicit: bool) -> Result<()> {
        self.state.document_tree = Some(self.document.export_document());
        self.state.last_saved_at = Some(Utc::now());

        match self.store.save(&self.state) {
            Ok(()) => {
                self.dirty = false;
                self.auto_save_pending = false;
                self.last_save_error = None;
                debug!("State saved to {}", self.store.location());
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                let first_failure = self.last_save_error.is_none();
                if explicit || first_failure {
                    warn!("Failed to save state: {}", message);
                    self.events.push(CoreEvent::SaveFailed(message.clone()));
                }
                self.last_save_error = Some(message);
                Err(e)
            }
        }
    }

    /// Best-effort save on exit.
    pub fn shutdown(&mut self) {
        self.state.document_tree = Some(self.document.suspend());
        if self.dirty || self.auto_save_pending {
            if let Err(e) = self.save() {
                warn!("Unsaved changes lost on exit: {}", e);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
