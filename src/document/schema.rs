//! Portable document format
//!
//! Converts between the owned tree and the JSON node form used for
//! persistence: `{"type", "attrs", "content", "text", "marks"}`.
//!
//! Conversion is all-or-nothing. Missing attributes take their defaults,
//! unknown attributes are ignored, and an unknown variable type degrades to
//! `text`. Unknown node or mark types fail the whole conversion.

use super::node::{canonical_marks, normalize_inlines, Block, Document, Inline, Mark};
use crate::variables::{Variable, VariableType};
use serde_json::{json, Map, Value};
use std::fmt;

/// Node type name of the variable embedding.
pub const VARIABLE_NODE: &str = "variableCapsule";

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a portable tree could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Node `type` not known to this schema
    UnknownNodeType(String),
    /// Mark `type` not known to this schema
    UnknownMarkType(String),
    /// A node appeared where its kind is not allowed
    InvalidContent { expected: &'static str, found: String },
    /// A text node without text
    MissingText,
    /// Structurally not a node (not an object, `content` not an array, ...)
    Malformed(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnknownNodeType(name) => write!(f, "unknown node type '{}'", name),
            SchemaError::UnknownMarkType(name) => write!(f, "unknown mark type '{}'", name),
            SchemaError::InvalidContent { expected, found } => {
                write!(f, "expected {} content, found '{}'", expected, found)
            }
            SchemaError::MissingText => write!(f, "text node without text"),
            SchemaError::Malformed(msg) => write!(f, "malformed node: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {}

type SchemaResult<T> = std::result::Result<T, SchemaError>;

// ─────────────────────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────────────────────

const INLINE_TYPES: &[&str] = &["text", "hard_break", "image", VARIABLE_NODE];
const BLOCK_TYPES: &[&str] = &[
    "paragraph",
    "heading",
    "code_block",
    "horizontal_rule",
    "blockquote",
    "bullet_list",
    "ordered_list",
    "list_item",
];

fn as_node(value: &Value) -> SchemaResult<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::Malformed(format!("expected object, found {}", value)))
}

fn node_type(node: &Map<String, Value>) -> SchemaResult<&str> {
    node.get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::Malformed("node without a type".to_string()))
}

fn content(node: &Map<String, Value>) -> SchemaResult<&[Value]> {
    match node.get("content") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(SchemaError::Malformed(format!(
            "content must be an array, found {}",
            other
        ))),
    }
}

fn attr_str(node: &Map<String, Value>, key: &str) -> Option<String> {
    node.get("attrs")?.get(key)?.as_str().map(str::to_string)
}

fn attr_u64(node: &Map<String, Value>, key: &str) -> Option<u64> {
    node.get("attrs")?.get(key)?.as_u64()
}

fn parse_mark(value: &Value) -> SchemaResult<Mark> {
    let mark = as_node(value)?;
    match node_type(mark)? {
        "strong" => Ok(Mark::Strong),
        "em" => Ok(Mark::Em),
        "code" => Ok(Mark::Code),
        "link" => Ok(Mark::Link {
            href: attr_str(mark, "href").unwrap_or_default(),
            title: attr_str(mark, "title"),
        }),
        other => Err(SchemaError::UnknownMarkType(other.to_string())),
    }
}

fn parse_variable(node: &Map<String, Value>) -> Variable {
    Variable {
        id: attr_str(node, "id").unwrap_or_default(),
        kind: attr_str(node, "type")
            .map(|t| VariableType::parse_lossy(&t))
            .unwrap_or_default(),
        label: attr_str(node, "label").unwrap_or_default(),
        help_text: attr_str(node, "helpText").unwrap_or_default(),
        value: attr_str(node, "value").unwrap_or_default(),
    }
}

fn parse_inline(value: &Value) -> SchemaResult<Inline> {
    let node = as_node(value)?;
    match node_type(node)? {
        "text" => {
            let text = node
                .get("text")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .ok_or(SchemaError::MissingText)?;
            let marks = match node.get("marks") {
                Some(Value::Array(items)) => {
                    let mut marks = items.iter().map(parse_mark).collect::<SchemaResult<Vec<_>>>()?;
                    canonical_marks(&mut marks);
                    marks
                }
                _ => Vec::new(),
            };
            Ok(Inline::Text {
                text: text.to_string(),
                marks,
            })
        }
        "hard_break" => Ok(Inline::HardBreak),
        "image" => Ok(Inline::Image {
            src: attr_str(node, "src").unwrap_or_default(),
            alt: attr_str(node, "alt"),
            title: attr_str(node, "title"),
        }),
        VARIABLE_NODE => Ok(Inline::Variable(parse_variable(node))),
        other if BLOCK_TYPES.contains(&other) => Err(SchemaError::InvalidContent {
            expected: "inline",
            found: other.to_string(),
        }),
        other => Err(SchemaError::UnknownNodeType(other.to_string())),
    }
}

fn parse_inlines(node: &Map<String, Value>) -> SchemaResult<Vec<Inline>> {
    let mut inlines = content(node)?
        .iter()
        .map(parse_inline)
        .collect::<SchemaResult<Vec<_>>>()?;
    normalize_inlines(&mut inlines);
    Ok(inlines)
}

fn parse_blocks(node: &Map<String, Value>) -> SchemaResult<Vec<Block>> {
    content(node)?.iter().map(parse_block).collect()
}

fn parse_list_items(node: &Map<String, Value>) -> SchemaResult<Vec<Block>> {
    let items = parse_blocks(node)?;
    if let Some(bad) = items.iter().find(|b| !matches!(b, Block::ListItem(_))) {
        return Err(SchemaError::InvalidContent {
            expected: "list_item",
            found: bad.type_name().to_string(),
        });
    }
    Ok(items)
}

fn parse_block(value: &Value) -> SchemaResult<Block> {
    let node = as_node(value)?;
    match node_type(node)? {
        "paragraph" => Ok(Block::Paragraph(parse_inlines(node)?)),
        "heading" => Ok(Block::Heading {
            level: attr_u64(node, "level").unwrap_or(1).clamp(1, 6) as u8,
            content: parse_inlines(node)?,
        }),
        "code_block" => {
            let mut text = String::new();
            for child in content(node)? {
                match parse_inline(child)? {
                    Inline::Text { text: t, .. } => text.push_str(&t),
                    other => {
                        return Err(SchemaError::InvalidContent {
                            expected: "text",
                            found: inline_type_name(&other).to_string(),
                        })
                    }
                }
            }
            Ok(Block::CodeBlock(text))
        }
        "horizontal_rule" => Ok(Block::HorizontalRule),
        "blockquote" => Ok(Block::Blockquote(parse_blocks(node)?)),
        "bullet_list" => Ok(Block::BulletList(parse_list_items(node)?)),
        "ordered_list" => Ok(Block::OrderedList {
            order: attr_u64(node, "order").unwrap_or(1).min(u32::MAX as u64) as u32,
            items: parse_list_items(node)?,
        }),
        "list_item" => Ok(Block::ListItem(parse_blocks(node)?)),
        other if INLINE_TYPES.contains(&other) => Err(SchemaError::InvalidContent {
            expected: "block",
            found: other.to_string(),
        }),
        other => Err(SchemaError::UnknownNodeType(other.to_string())),
    }
}

fn inline_type_name(inline: &Inline) -> &'static str {
    match inline {
        Inline::Text { .. } => "text",
        Inline::HardBreak => "hard_break",
        Inline::Image { .. } => "image",
        Inline::Variable(_) => VARIABLE_NODE,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writing
// ─────────────────────────────────────────────────────────────────────────────

fn mark_to_portable(mark: &Mark) -> Value {
    match mark {
        Mark::Link { href, title } => json!({
            "type": "link",
            "attrs": { "href": href, "title": title },
        }),
        other => json!({ "type": other.name() }),
    }
}

fn inline_to_portable(inline: &Inline) -> Value {
    match inline {
        Inline::Text { text, marks } => {
            let mut node = json!({ "type": "text", "text": text });
            if !marks.is_empty() {
                node["marks"] = Value::Array(marks.iter().map(mark_to_portable).collect());
            }
            node
        }
        Inline::HardBreak => json!({ "type": "hard_break" }),
        Inline::Image { src, alt, title } => json!({
            "type": "image",
            "attrs": { "src": src, "alt": alt, "title": title },
        }),
        Inline::Variable(v) => json!({
            "type": VARIABLE_NODE,
            "attrs": {
                "id": v.id,
                "type": v.kind.as_str(),
                "label": v.label,
                "helpText": v.help_text,
                "value": v.value,
            },
        }),
    }
}

fn with_content(mut node: Value, content: Vec<Value>) -> Value {
    if !content.is_empty() {
        node["content"] = Value::Array(content);
    }
    node
}

fn block_to_portable(block: &Block) -> Value {
    match block {
        Block::Paragraph(content) => with_content(
            json!({ "type": "paragraph" }),
            content.iter().map(inline_to_portable).collect(),
        ),
        Block::Heading { level, content } => with_content(
            json!({ "type": "heading", "attrs": { "level": level } }),
            content.iter().map(inline_to_portable).collect(),
        ),
        Block::CodeBlock(text) => {
            let content = if text.is_empty() {
                Vec::new()
            } else {
                vec![json!({ "type": "text", "text": text })]
            };
            with_content(json!({ "type": "code_block" }), content)
        }
        Block::HorizontalRule => json!({ "type": "horizontal_rule" }),
        Block::OrderedList { order, items } => with_content(
            json!({ "type": "ordered_list", "attrs": { "order": order } }),
            items.iter().map(block_to_portable).collect(),
        ),
        Block::Blockquote(children) | Block::BulletList(children) | Block::ListItem(children) => {
            with_content(
                json!({ "type": block.type_name() }),
                children.iter().map(block_to_portable).collect(),
            )
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document Conversion
// ─────────────────────────────────────────────────────────────────────────────

impl Document {
    /// Build a document from its portable JSON form.
    pub fn from_portable(value: &Value) -> SchemaResult<Document> {
        let node = as_node(value)?;
        match node_type(node)? {
            "doc" => Ok(Document::new(parse_blocks(node)?)),
            other => Err(SchemaError::InvalidContent {
                expected: "doc",
                found: other.to_string(),
            }),
        }
    }

    /// Serialize the document to its portable JSON form.
    pub fn to_portable(&self) -> Value {
        json!({
            "type": "doc",
            "content": self.blocks.iter().map(block_to_portable).collect::<Vec<_>>(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
