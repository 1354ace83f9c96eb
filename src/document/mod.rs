//! Document model, portable format, editing commands and editor widget

mod adapter;
pub mod commands;
mod editor;
mod node;
mod schema;

pub use adapter::{DocumentAdapter, InsertMenuItem, LoadOutcome, ValueEdit};
pub use commands::{BlockKind, Wrapper};
pub use editor::{DocumentEditor, DocumentEditorOutput, TextSelection};
pub use node::{Block, Document, EmbeddingLocation, Inline, Mark, TextPosition};
pub use schema::{SchemaError, VARIABLE_NODE};
