//! Document adapter
//!
//! Owns the live document tree while it is mounted and enforces the role
//! rules around it: the author edits structure, the filler only edits
//! embedding values. Loading never fails; exporting never loses content.

use super::commands::{self, BlockKind, Wrapper};
use super::node::{Block, Document, EmbeddingLocation, Inline, Mark, TextPosition};
use crate::config::Role;
use crate::error::Error;
use crate::sync::{Subscription, SyncBridge};
use crate::variables::{Variable, VariableMetadata};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

/// What `load_document` ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The tree was converted in full.
    Loaded,
    /// No tree was given; the document starts empty.
    Empty,
    /// The tree did not match the schema; the document starts empty.
    Recovered { reason: String },
}

/// A filler value edit, to be propagated by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEdit {
    pub id: String,
    pub value: String,
}

/// One entry in the insert menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertMenuItem {
    pub id: String,
    pub title: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// The mounted document with its role, caret and insert menu.
#[derive(Debug)]
pub struct DocumentAdapter {
    doc: Document,
    role: Role,
    cursor: Option<TextPosition>,
    available: Vec<Variable>,
    menu: Vec<InsertMenuItem>,
    /// Bumped on every structural edit.
    version: u64,
    /// Bumped on every resume; widget ids are salted with it.
    generation: u64,
    subscription: Option<Subscription>,
}

impl DocumentAdapter {
    pub fn new(role: Role) -> Self {
        Self {
            doc: Document::empty(),
            role,
            cursor: None,
            available: Vec::new(),
            menu: Vec::new(),
            version: 0,
            generation: 0,
            subscription: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cursor(&self) -> Option<&TextPosition> {
        self.cursor.as_ref()
    }

    /// Move the caret. Positions outside a textblock are ignored.
    pub fn set_cursor(&mut self, pos: TextPosition) {
        if let Some(block) = self.doc.block(&pos.path) {
            if block.is_textblock() {
                let offset = pos.offset.min(block.content_size());
                self.cursor = Some(TextPosition::new(pos.path, offset));
            }
        }
    }

    /// The caret, or the end of the document when none is set.
    fn insertion_point(&self) -> Option<TextPosition> {
        self.cursor
            .clone()
            .filter(|pos| self.doc.block(&pos.path).is_some_and(Block::is_textblock))
            .or_else(|| self.doc.end_position())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Load / Export
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the content with a portable tree.
    ///
    /// `None` or JSON `null` gives an empty document. A tree that does not
    /// match the schema is logged and replaced by an empty document.
    pub fn load_document(&mut self, tree: Option<&Value>) -> LoadOutcome {
        self.cursor = None;
        self.version += 1;

        let tree = match tree {
            None | Some(Value::Null) => {
                self.doc = Document::empty();
                return LoadOutcome::Empty;
            }
            Some(tree) => tree,
        };

        match Document::from_portable(tree) {
            Ok(doc) => {
                debug!(
                    "Loaded document with {} blocks and {} embeddings",
                    doc.blocks.len(),
                    doc.embeddings().len()
                );
                self.doc = doc;
                LoadOutcome::Loaded
            }
            Err(e) => {
                let err = Error::from(e);
                warn!("{}; starting empty", err);
                self.doc = Document::empty();
                LoadOutcome::Recovered {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn export_document(&self) -> Value {
        self.doc.to_portable()
    }

    /// Ordered snapshots of every embedding.
    pub fn embeddings(&self) -> Vec<Variable> {
        self.doc
            .embeddings()
            .into_iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Surrender the content as a portable snapshot.
    pub fn suspend(&mut self) -> Value {
        debug!("Suspending document (generation {})", self.generation);
        self.cursor = None;
        self.export_document()
    }

    /// Remount from a snapshot taken by `suspend`.
    pub fn resume(&mut self, snapshot: Value) -> LoadOutcome {
        self.generation += 1;
        self.load_document(Some(&snapshot))
    }

    /// Switch role through a suspend/resume cycle. Returns the snapshot.
    pub fn set_role(&mut self, role: Role) -> Value {
        let snapshot = self.suspend();
        self.role = role;
        let outcome = self.resume(snapshot.clone());
        info!(
            "Document remounted as {} ({:?})",
            role.label(),
            outcome
        );
        snapshot
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Embeddings
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an embedding at the caret.
    ///
    /// Fails in filler role and inside code blocks. Block-level types get a
    /// line of their own.
    pub fn insert_variable_embedding(&mut self, variable: &Variable) -> bool {
        if self.role.is_filler() {
            debug!("Ignoring insert of {} in filler role", variable.id);
            return false;
        }
        let Some(pos) = self.insertion_point() else {
            return false;
        };
        if commands::in_code_block(&self.doc, &pos) {
            debug!("Ignoring insert of {} inside a code block", variable.id);
            return false;
        }

        let next = if variable.kind.is_block() {
            commands::insert_block_embedding(&mut self.doc, &pos, variable.clone())
        } else {
            commands::insert_inline(&mut self.doc, &pos, Inline::Variable(variable.clone()))
        };

        match next {
            Some(next) => {
                debug!("Inserted embedding of {}", variable.id);
                self.cursor = Some(next);
                self.version += 1;
                true
            }
            None => false,
        }
    }

    /// Insert one of the available variables by id (from the insert menu).
    pub fn insert_available(&mut self, id: &str) -> bool {
        match self.available.iter().find(|v| v.id == id).cloned() {
            Some(variable) => self.insert_variable_embedding(&variable),
            None => false,
        }
    }

    /// Rewrite label, help text and type of every embedding of `meta.id`.
    ///
    /// Values and positions are kept. Returns how many embeddings changed.
    pub fn update_embedding_metadata(&mut self, meta: &VariableMetadata) -> usize {
        let updated = self.doc.for_each_embedding_mut(|v| {
            v.id == meta.id && v.apply_metadata(meta)
        });
        if updated > 0 {
            debug!("Updated {} embeddings of {}", updated, meta.id);
        }
        updated
    }

    /// Set the value of the embedding at `loc` and of every other embedding
    /// of the same variable. Allowed in filler role only.
    ///
    /// The tree shape is untouched, so no version bump happens and widgets
    /// keep their identity.
    pub fn set_embedding_value(&mut self, loc: &EmbeddingLocation, value: &str) -> Option<ValueEdit> {
        if !self.role.is_filler() {
            return None;
        }
        let id = self.doc.embedding_mut(loc)?.id.clone();
        self.apply_value(&id, value);
        Some(ValueEdit {
            id,
            value: value.to_string(),
        })
    }

    /// Set the value of every embedding of `id`, whatever the role.
    pub fn apply_value(&mut self, id: &str, value: &str) -> usize {
        self.doc.for_each_embedding_mut(|v| {
            if v.id == id && v.value != value {
                v.value = value.to_string();
                true
            } else {
                false
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Available Variables
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the insertable variables and rebuild the menu.
    pub fn set_available_variables(&mut self, variables: Vec<Variable>) {
        let mut seen = HashSet::new();
        self.available = variables
            .into_iter()
            .filter(|v| seen.insert(v.id.clone()))
            .collect();
        self.rebuild_menu();
    }

    fn rebuild_menu(&mut self) {
        self.menu = self
            .available
            .iter()
            .map(|v| InsertMenuItem {
                id: v.id.clone(),
                title: format!("Insert {} ({})", v.display_label(), v.kind.as_str()),
            })
            .collect();
    }

    pub fn menu(&self) -> &[InsertMenuItem] {
        &self.menu
    }

    /// The variable to configure for `id`: the canonical one if available,
    /// else the first embedding's snapshot.
    pub fn selection_for(&self, id: &str) -> Option<Variable> {
        self.available
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .or_else(|| {
                self.doc
                    .embeddings()
                    .into_iter()
                    .find(|(_, v)| v.id == id)
                    .map(|(_, v)| v.clone())
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bridge
    // ─────────────────────────────────────────────────────────────────────────

    pub fn attach(&mut self, bridge: &mut SyncBridge) {
        self.subscription = Some(bridge.subscribe());
    }

    /// Apply every pending metadata edit. Returns the embeddings changed.
    pub fn absorb(&mut self, bridge: &mut SyncBridge) -> usize {
        let Some(subscription) = &self.subscription else {
            return 0;
        };
        let edits = bridge.take(subscription);
        if edits.is_empty() {
            return 0;
        }

        let mut changed = 0;
        for meta in &edits {
            changed += self.update_embedding_metadata(meta);
            for v in self.available.iter_mut().filter(|v| v.id == meta.id) {
                v.apply_metadata(meta);
            }
        }
        self.rebuild_menu();
        changed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authoring
    // ─────────────────────────────────────────────────────────────────────────

    fn author_edit<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut Document, Option<TextPosition>) -> Option<Option<TextPosition>>,
    {
        if !self.role.is_author() {
            return false;
        }
        let cursor = self.cursor.clone();
        match edit(&mut self.doc, cursor) {
            Some(next) => {
                if next.is_some() {
                    self.cursor = next;
                }
                self.version += 1;
                true
            }
            None => false,
        }
    }

    pub fn replace_run_text(&mut self, path: &[usize], index: usize, text: &str) -> bool {
        self.author_edit(|doc, _| {
            commands::replace_run_text(doc, path, index, text).then_some(None)
        })
    }

    pub fn set_code_text(&mut self, path: &[usize], text: &str) -> bool {
        self.author_edit(|doc, _| commands::set_code_text(doc, path, text).then_some(None))
    }

    /// Type text at the end of a textblock.
    pub fn append_text(&mut self, path: &[usize], text: &str) -> bool {
        self.author_edit(|doc, _| {
            let offset = doc.block(path)?.content_size();
            commands::insert_text(doc, &TextPosition::new(path.to_vec(), offset), text).map(Some)
        })
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        let Some(pos) = self.insertion_point() else {
            return false;
        };
        self.author_edit(|doc, _| commands::insert_text(doc, &pos, text).map(Some))
    }

    pub fn split_at_cursor(&mut self) -> bool {
        let Some(pos) = self.insertion_point() else {
            return false;
        };
        self.author_edit(|doc, _| commands::split_block(doc, &pos).map(Some))
    }

    pub fn join_backward(&mut self, path: &[usize]) -> bool {
        self.author_edit(|doc, _| commands::join_backward(doc, path).map(Some))
    }

    /// Change the type of the block holding the caret.
    pub fn set_block_type(&mut self, kind: BlockKind) -> bool {
        self.author_edit(|doc, cursor| {
            let path = cursor?.path;
            commands::set_block_type(doc, &path, kind).then_some(None)
        })
    }

    pub fn toggle_mark(&mut self, path: &[usize], from: usize, to: usize, mark: Mark) -> bool {
        self.author_edit(|doc, _| commands::toggle_mark(doc, path, from, to, mark).then_some(None))
    }

    pub fn insert_horizontal_rule(&mut self) -> bool {
        let Some(pos) = self.insertion_point() else {
            return false;
        };
        self.author_edit(|doc, _| commands::insert_horizontal_rule(doc, &pos).map(Some))
    }

    /// Wrap the block holding the caret.
    pub fn wrap_in(&mut self, wrapper: Wrapper) -> bool {
        self.author_edit(|doc, cursor| {
            let pos = cursor?;
            let path = commands::wrap_in(doc, &pos.path, wrapper)?;
            Some(Some(TextPosition::new(path, pos.offset)))
        })
    }

    /// Lift the block holding the caret out of its wrapper.
    pub fn lift(&mut self) -> bool {
        self.author_edit(|doc, cursor| {
            let pos = cursor?;
            let path = commands::lift(doc, &pos.path)?;
            Some(Some(TextPosition::new(path, pos.offset)))
        })
    }

    pub fn delete_inline(&mut self, path: &[usize], index: usize) -> bool {
        self.author_edit(|doc, _| commands::delete_inline(doc, path, index).then_some(None))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{create_variable, VariableOverrides, VariableType};
    use serde_json::json;

    fn var(kind: VariableType, label: &str) -> Variable {
        create_variable(
            kind,
            VariableOverrides {
                label: Some(label.to_string()),
                ..Default::default()
            },
        )
    }

    fn author_with_text(text: &str) -> DocumentAdapter {
        let mut adapter = DocumentAdapter::new(Role::Author);
        adapter.load_document(Some(&json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": text }] }]
        })));
        adapter
    }

    #[test]
    fn test_load_none_and_null_give_empty() {
        let mut adapter = DocumentAdapter::new(Role::Author);
        assert_eq!(adapter.load_document(None), LoadOutcome::Empty);
        assert!(adapter.document().is_blank());
        assert_eq!(adapter.load_document(Some(&Value::Null)), LoadOutcome::Empty);
    }

    #[test]
    fn test_load_malformed_recovers_empty() {
        let mut adapter = author_with_text("keep?");
        let outcome = adapter.load_document(Some(&json!({
            "type": "doc",
            "content": [{ "type": "paragraph" }, { "type": "table" }]
        })));
        match outcome {
            LoadOutcome::Recovered { reason } => {
                assert!(reason.starts_with("Document schema mismatch"));
                assert!(reason.contains("table"));
            }
            other => panic!("expected recovery, got {:?}", other),
        }
        assert!(adapter.document().is_blank());
    }

    #[test]
    fn test_insert_inline_at_cursor() {
        let mut adapter = author_with_text("Dear ");
        adapter.set_cursor(TextPosition::new(vec![0], 5));
        let v = var(VariableType::Text, "Name");
        assert!(adapter.insert_variable_embedding(&v));
        assert_eq!(adapter.document().plain_text(), "Dear {Name}");
        assert_eq!(adapter.cursor(), Some(&TextPosition::new(vec![0], 6)));
    }

    #[test]
    fn test_insert_without_cursor_goes_to_end() {
        let mut adapter = author_with_text("Hi ");
        let v = var(VariableType::Date, "When");
        assert!(adapter.insert_variable_embedding(&v));
        assert_eq!(adapter.document().plain_text(), "Hi {When}");
    }

    #[test]
    fn test_insert_rejected_in_filler_role() {
        let mut adapter = DocumentAdapter::new(Role::Filler);
        let v = var(VariableType::Text, "Name");
        assert!(!adapter.insert_variable_embedding(&v));
        assert!(adapter.embeddings().is_empty());
    }

    #[test]
    fn test_insert_rejected_in_code_block() {
        let mut adapter = DocumentAdapter::new(Role::Author);
        adapter.load_document(Some(&json!({
            "type": "doc", "content": [{ "type": "code_block" }]
        })));
        adapter.set_cursor(TextPosition::new(vec![0], 0));
        assert!(!adapter.insert_variable_embedding(&var(VariableType::Text, "X")));
    }

    #[test]
    fn test_rich_text_inserted_on_own_line() {
        let mut adapter = author_with_text("abcd");
        adapter.set_cursor(TextPosition::new(vec![0], 2));
        let v = var(VariableType::RichText, "Clause");
        assert!(adapter.insert_variable_embedding(&v));
        let blocks = &adapter.document().blocks;
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], Block::Paragraph(vec![Inline::Variable(v)]));
    }

    #[test]
    fn test_relabel_updates_all_embeddings() {
        let mut adapter = author_with_text("x");
        let v1 = var(VariableType::Text, "Name");
        let v2 = var(VariableType::Text, "Other");
        adapter.insert_variable_embedding(&v1);
        adapter.insert_variable_embedding(&v2);
        adapter.insert_variable_embedding(&v1);

        let mut meta = v1.metadata();
        meta.label = "Full Name".to_string();
        assert_eq!(adapter.update_embedding_metadata(&meta), 2);

        let exported = adapter.export_document();
        let labels: Vec<&str> = exported["content"][0]["content"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["type"] == "variableCapsule")
            .map(|n| n["attrs"]["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Full Name", "Other", "Full Name"]);
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let mut adapter = author_with_text("x");
        let before = adapter.export_document();
        let ghost = var(VariableType::Text, "Ghost");
        assert_eq!(adapter.update_embedding_metadata(&ghost.metadata()), 0);
        assert_eq!(adapter.export_document(), before);
    }

    #[test]
    fn test_update_preserves_values() {
        let mut adapter = author_with_text("x");
        let v = var(VariableType::Text, "Name");
        adapter.insert_variable_embedding(&v);
        adapter.apply_value(&v.id, "Alice");
        let mut meta = v.metadata();
        meta.kind = VariableType::Date;
        adapter.update_embedding_metadata(&meta);
        let snap = &adapter.embeddings()[0];
        assert_eq!(snap.value, "Alice");
        assert_eq!(snap.kind, VariableType::Date);
    }

    #[test]
    fn test_export_load_preserves_embedding_sequence() {
        let mut adapter = author_with_text("a");
        for (kind, label) in [
            (VariableType::Text, "One"),
            (VariableType::Date, "Two"),
            (VariableType::RichText, "Three"),
        ] {
            adapter.insert_variable_embedding(&var(kind, label));
        }
        let before = adapter.embeddings();
        let exported = adapter.export_document();

        let mut other = DocumentAdapter::new(Role::Filler);
        assert_eq!(other.load_document(Some(&exported)), LoadOutcome::Loaded);
        assert_eq!(other.embeddings(), before);
    }

    #[test]
    fn test_filler_value_edit_in_place() {
        let mut adapter = author_with_text("x");
        let v = var(VariableType::Text, "Name");
        adapter.insert_variable_embedding(&v);
        adapter.insert_variable_embedding(&v);
        adapter.set_role(Role::Filler);

        let version = adapter.version();
        let loc = adapter.document().embeddings()[0].0.clone();
        let mut emitted = Vec::new();
        for prefix in ["A", "Al", "Ali", "Alic", "Alice"] {
            emitted.push(adapter.set_embedding_value(&loc, prefix).unwrap());
        }

        assert_eq!(adapter.version(), version);
        assert_eq!(emitted.last().unwrap().value, "Alice");
        assert!(emitted.iter().all(|e| e.id == v.id));
        assert!(adapter.embeddings().iter().all(|e| e.value == "Alice"));
    }

    #[test]
    fn test_author_cannot_set_value() {
        let mut adapter = author_with_text("x");
        let v = var(VariableType::Text, "Name");
        adapter.insert_variable_embedding(&v);
        let loc = adapter.document().embeddings()[0].0.clone();
        assert!(adapter.set_embedding_value(&loc, "nope").is_none());
    }

    #[test]
    fn test_role_switch_preserves_uncommitted_text() {
        let mut adapter = author_with_text("Hello");
        adapter.append_text(&[0], " world");
        let generation = adapter.generation();

        adapter.set_role(Role::Filler);

        assert_eq!(adapter.role(), Role::Filler);
        assert_eq!(adapter.generation(), generation + 1);
        assert_eq!(adapter.document().plain_text(), "Hello world");
    }

    #[test]
    fn test_filler_cannot_edit_structure() {
        let mut adapter = author_with_text("Hello");
        adapter.set_role(Role::Filler);
        assert!(!adapter.append_text(&[0], "!"));
        assert!(!adapter.replace_run_text(&[0], 0, "Bye"));
        assert_eq!(adapter.document().plain_text(), "Hello");
    }

    #[test]
    fn test_menu_is_deduplicated() {
        let mut adapter = DocumentAdapter::new(Role::Author);
        let v = var(VariableType::Date, "Due");
        adapter.set_available_variables(vec![v.clone(), v.clone()]);
        assert_eq!(adapter.menu().len(), 1);
        assert_eq!(adapter.menu()[0].title, "Insert Due (date)");
        assert!(adapter.insert_available(&v.id));
        assert!(!adapter.insert_available("missing"));
    }

    #[test]
    fn test_absorb_applies_each_edit_once() {
        let mut bridge = SyncBridge::new();
        let mut adapter = author_with_text("x");
        adapter.attach(&mut bridge);
        let v = var(VariableType::Text, "Name");
        adapter.set_available_variables(vec![v.clone()]);
        adapter.insert_variable_embedding(&v);

        let mut meta = v.metadata();
        meta.label = "Full Name".to_string();
        bridge.publish(meta.clone());
        bridge.publish(meta);

        assert_eq!(adapter.absorb(&mut bridge), 1);
        assert_eq!(adapter.absorb(&mut bridge), 0);
        assert_eq!(adapter.menu()[0].title, "Insert Full Name (text)");
    }

    #[test]
    fn test_selection_prefers_available_then_snapshot() {
        let mut adapter = author_with_text("x");
        let v = var(VariableType::Text, "Snapshot");
        adapter.insert_variable_embedding(&v);
        assert_eq!(adapter.selection_for(&v.id).unwrap().label, "Snapshot");

        let mut canonical = v.clone();
        canonical.label = "Canonical".to_string();
        adapter.set_available_variables(vec![canonical]);
        assert_eq!(adapter.selection_for(&v.id).unwrap().label, "Canonical");
    }

    #[test]
    fn test_authoring_commands_through_cursor() {
        let mut adapter = author_with_text("Title");
        adapter.set_cursor(TextPosition::new(vec![0], 5));
        assert!(adapter.set_block_type(BlockKind::Heading(1)));
        assert!(adapter.split_at_cursor());
        assert!(adapter.insert_text("body"));
        assert!(adapter.wrap_in(Wrapper::BulletList));
        assert_eq!(adapter.cursor().unwrap().path, vec![1, 0, 0]);
        assert!(adapter.lift());
        assert!(adapter.insert_horizontal_rule());
        assert_eq!(adapter.document().blocks.len(), 4);
    }
}
