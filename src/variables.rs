//! Variable model
//!
//! A variable ("capsule") is a named, typed placeholder with a current value.
//! The same variable can be embedded in the document any number of times and
//! placed on the canvas at most once; its `id` ties every occurrence together.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Label given to freshly created variables.
pub const DEFAULT_LABEL: &str = "New variable";

/// Default canvas placement for a new capsule.
pub const DEFAULT_X: f32 = 20.0;
pub const DEFAULT_Y: f32 = 20.0;
pub const DEFAULT_WIDTH: f32 = 200.0;
pub const DEFAULT_HEIGHT: f32 = 32.0;

const ID_PREFIX: &str = "capsule";
const ID_SUFFIX_LEN: usize = 7;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Process-wide counter so ids minted within the same millisecond differ.
static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

// ─────────────────────────────────────────────────────────────────────────────
// Variable Type
// ─────────────────────────────────────────────────────────────────────────────

/// The kind of value a variable holds.
///
/// Deserialization is lossy: an unrecognized name becomes `Text`, so files
/// written by newer builds still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum VariableType {
    /// Single-line free text
    #[default]
    Text,
    /// Calendar date, `YYYY-MM-DD`
    Date,
    /// Multi-line, block-level text
    RichText,
}

impl VariableType {
    /// Wire name used in persisted JSON and document attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Text => "text",
            VariableType::Date => "date",
            VariableType::RichText => "richText",
        }
    }

    /// Parse a wire name. Unknown names degrade to `Text`.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "date" => VariableType::Date,
            "richText" => VariableType::RichText,
            _ => VariableType::Text,
        }
    }

    /// Human-readable name for menus and selectors.
    pub fn label(&self) -> &'static str {
        match self {
            VariableType::Text => "Text",
            VariableType::Date => "Date",
            VariableType::RichText => "Rich text",
        }
    }

    /// Whether embeddings of this type occupy their own block line.
    pub fn is_block(&self) -> bool {
        matches!(self, VariableType::RichText)
    }

    /// All types, in selector order.
    pub fn all() -> &'static [VariableType] {
        &[VariableType::Text, VariableType::Date, VariableType::RichText]
    }
}

impl From<String> for VariableType {
    fn from(s: String) -> Self {
        VariableType::parse_lossy(&s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variable
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical identity unit shared by the document and the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VariableType,
    pub label: String,
    pub help_text: String,
    pub value: String,
}

/// The author-editable part of a variable, as published on the sync bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMetadata {
    pub id: String,
    pub label: String,
    pub help_text: String,
    pub kind: VariableType,
}

impl Variable {
    /// Label for chips and placeholders; `[type]` when the label is empty.
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            format!("[{}]", self.kind.as_str())
        } else {
            self.label.clone()
        }
    }

    pub fn metadata(&self) -> VariableMetadata {
        VariableMetadata {
            id: self.id.clone(),
            label: self.label.clone(),
            help_text: self.help_text.clone(),
            kind: self.kind,
        }
    }

    /// Overwrite label, help text and type. Identity and value are kept.
    ///
    /// Returns `true` if anything changed.
    pub fn apply_metadata(&mut self, meta: &VariableMetadata) -> bool {
        if self.label == meta.label && self.help_text == meta.help_text && self.kind == meta.kind
        {
            return false;
        }
        self.label = meta.label.clone();
        self.help_text = meta.help_text.clone();
        self.kind = meta.kind;
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canvas Capsule
// ─────────────────────────────────────────────────────────────────────────────

/// A variable placed on the canvas, top-left plus size in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasCapsule {
    #[serde(flatten)]
    pub variable: Variable,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_height")]
    pub height: f32,
}

fn default_width() -> f32 {
    DEFAULT_WIDTH
}

fn default_height() -> f32 {
    DEFAULT_HEIGHT
}

impl CanvasCapsule {
    pub fn id(&self) -> &str {
        &self.variable.id
    }

    /// The variable without its position.
    pub fn to_variable(&self) -> Variable {
        self.variable.clone()
    }

    /// Whether a canvas-local point lies inside the capsule.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Constructors
// ─────────────────────────────────────────────────────────────────────────────

/// Optional field overrides for `create_variable`.
#[derive(Debug, Clone, Default)]
pub struct VariableOverrides {
    pub label: Option<String>,
    pub help_text: Option<String>,
    pub value: Option<String>,
}

/// Optional field overrides for `create_canvas_capsule`.
#[derive(Debug, Clone, Default)]
pub struct CanvasOverrides {
    pub variable: VariableOverrides,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Whether a date value is a valid `YYYY-MM-DD` calendar date.
///
/// Used for input feedback only; invalid values are still stored.
pub fn is_valid_date(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Mint a fresh id: `capsule_<millis>_<seq>_<base36>`.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{}_{}_{}_{}", ID_PREFIX, millis, seq, suffix)
}

/// Build a new variable of the given type with a unique id.
pub fn create_variable(kind: VariableType, overrides: VariableOverrides) -> Variable {
    Variable {
        id: generate_id(),
        kind,
        label: overrides
            .label
            .unwrap_or_else(|| DEFAULT_LABEL.to_string()),
        help_text: overrides.help_text.unwrap_or_default(),
        value: overrides.value.unwrap_or_default(),
    }
}

/// Build a new canvas capsule at the default slot unless overridden.
pub fn create_canvas_capsule(kind: VariableType, overrides: CanvasOverrides) -> CanvasCapsule {
    CanvasCapsule {
        variable: create_variable(kind, overrides.variable),
        x: overrides.x.unwrap_or(DEFAULT_X),
        y: overrides.y.unwrap_or(DEFAULT_Y),
        width: overrides.width.unwrap_or(DEFAULT_WIDTH),
        height: overrides.height.unwrap_or(DEFAULT_HEIGHT),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
