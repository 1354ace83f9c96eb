//! Document tree
//!
//! An owned rich-text tree of blocks. Container blocks hold blocks; textblocks
//! (paragraph, heading, code block) hold inline content.
//!
//! Positions inside a textblock count each character of text as one unit and
//! every inline atom (hard break, image, variable embedding) as exactly one
//! unit. A block is addressed by its path: the index in the document's top
//! level followed by the index inside each enclosing container.

use crate::variables::Variable;

// ─────────────────────────────────────────────────────────────────────────────
// Marks
// ─────────────────────────────────────────────────────────────────────────────

/// Inline formatting applied to a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Em,
    Code,
    Link { href: String, title: Option<String> },
}

impl Mark {
    /// Schema name of the mark.
    pub fn name(&self) -> &'static str {
        match self {
            Mark::Strong => "strong",
            Mark::Em => "em",
            Mark::Code => "code",
            Mark::Link { .. } => "link",
        }
    }

    /// Canonical ordering; two marks with the same rank are the same kind.
    fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Em => 1,
            Mark::Strong => 2,
            Mark::Code => 3,
        }
    }

    pub fn same_kind(&self, other: &Mark) -> bool {
        self.rank() == other.rank()
    }
}

/// Sort marks into canonical order and keep one mark per kind.
pub fn canonical_marks(marks: &mut Vec<Mark>) {
    marks.sort_by_key(Mark::rank);
    marks.dedup_by(|a, b| a.same_kind(b));
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Content
// ─────────────────────────────────────────────────────────────────────────────

/// Inline node inside a paragraph or heading.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text { text: String, marks: Vec<Mark> },
    HardBreak,
    Image {
        src: String,
        alt: Option<String>,
        title: Option<String>,
    },
    /// Atomic embedding of a variable; a denormalized snapshot.
    Variable(Variable),
}

impl Inline {
    /// Unmarked text run.
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Number of position units this node occupies.
    pub fn node_size(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::HardBreak | Inline::Image { .. } | Inline::Variable(_) => 1,
        }
    }

    pub fn is_atom(&self) -> bool {
        !matches!(self, Inline::Text { .. })
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Inline::Variable(v) => Some(v),
            _ => None,
        }
    }
}

/// Total position units of an inline sequence.
pub fn inline_size(content: &[Inline]) -> usize {
    content.iter().map(Inline::node_size).sum()
}

/// Byte index of the `char_idx`-th character, or the string length.
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Split inline content at a position. Atoms are never split.
pub fn split_inlines(content: Vec<Inline>, offset: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut pos = 0;

    for inline in content {
        let size = inline.node_size();
        if pos + size <= offset {
            head.push(inline);
        } else if pos >= offset {
            tail.push(inline);
        } else if let Inline::Text { text, marks } = inline {
            let byte = char_to_byte(&text, offset - pos);
            let (a, b) = text.split_at(byte);
            head.push(Inline::Text {
                text: a.to_string(),
                marks: marks.clone(),
            });
            tail.push(Inline::Text {
                text: b.to_string(),
                marks,
            });
        }
        pos += size;
    }

    (head, tail)
}

/// Drop empty text runs and merge adjacent runs with identical marks.
pub fn normalize_inlines(content: &mut Vec<Inline>) {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for inline in content.drain(..) {
        match inline {
            Inline::Text { text, .. } if text.is_empty() => {}
            Inline::Text { text, mut marks } => {
                canonical_marks(&mut marks);
                if let Some(Inline::Text {
                    text: prev,
                    marks: prev_marks,
                }) = out.last_mut()
                {
                    if *prev_marks == marks {
                        prev.push_str(&text);
                        continue;
                    }
                }
                out.push(Inline::Text { text, marks });
            }
            other => out.push(other),
        }
    }
    *content = out;
}

/// Marks a character typed at `offset` should inherit.
///
/// Prefers the run to the left of the position, then the run to the right.
pub fn marks_at(content: &[Inline], offset: usize) -> Vec<Mark> {
    let mut pos = 0;
    let mut right = None;
    for inline in content {
        let size = inline.node_size();
        if let Inline::Text { marks, .. } = inline {
            if offset > pos && offset <= pos + size {
                return marks.clone();
            }
            if offset == pos && right.is_none() {
                right = Some(marks.clone());
            }
        }
        pos += size;
    }
    right.unwrap_or_default()
}

/// Convert plain text to inline content, newlines becoming hard breaks.
pub fn inlines_from_plain(text: &str) -> Vec<Inline> {
    let mut content = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            content.push(Inline::HardBreak);
        }
        if !line.is_empty() {
            content.push(Inline::text(line));
        }
    }
    content
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocks
// ─────────────────────────────────────────────────────────────────────────────

/// Block-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock(String),
    HorizontalRule,
    Blockquote(Vec<Block>),
    BulletList(Vec<Block>),
    OrderedList { order: u32, items: Vec<Block> },
    ListItem(Vec<Block>),
}

impl Block {
    pub fn empty_paragraph() -> Self {
        Block::Paragraph(Vec::new())
    }

    /// Schema name of the node.
    pub fn type_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading { .. } => "heading",
            Block::CodeBlock(_) => "code_block",
            Block::HorizontalRule => "horizontal_rule",
            Block::Blockquote(_) => "blockquote",
            Block::BulletList(_) => "bullet_list",
            Block::OrderedList { .. } => "ordered_list",
            Block::ListItem(_) => "list_item",
        }
    }

    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            Block::Paragraph(_) | Block::Heading { .. } | Block::CodeBlock(_)
        )
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Block::CodeBlock(_))
    }

    pub fn inlines(&self) -> Option<&Vec<Inline>> {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn inlines_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&Vec<Block>> {
        match self {
            Block::Blockquote(children)
            | Block::BulletList(children)
            | Block::ListItem(children)
            | Block::OrderedList {
                items: children, ..
            } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::Blockquote(children)
            | Block::BulletList(children)
            | Block::ListItem(children)
            | Block::OrderedList {
                items: children, ..
            } => Some(children),
            _ => None,
        }
    }

    /// Position units of a textblock's content; 0 for other blocks.
    pub fn content_size(&self) -> usize {
        match self {
            Block::Paragraph(content) | Block::Heading { content, .. } => inline_size(content),
            Block::CodeBlock(text) => text.chars().count(),
            _ => 0,
        }
    }

    /// Same kind of textblock with different inline content.
    ///
    /// Code blocks are returned unchanged.
    pub fn with_inlines(&self, content: Vec<Inline>) -> Block {
        match self {
            Block::Heading { level, .. } => Block::Heading {
                level: *level,
                content,
            },
            Block::CodeBlock(_) => self.clone(),
            _ => Block::Paragraph(content),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Positions
// ─────────────────────────────────────────────────────────────────────────────

/// A caret position inside a textblock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Where a variable embedding lives: textblock path plus inline index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddingLocation {
    pub path: Vec<usize>,
    pub index: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// The root of the tree. Never has zero blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// A document holding a single empty paragraph.
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::empty_paragraph()],
        }
    }

    pub fn new(blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            Self::empty()
        } else {
            Self { blocks }
        }
    }

    /// Whether this is the single-empty-paragraph document.
    pub fn is_blank(&self) -> bool {
        matches!(self.blocks.as_slice(), [Block::Paragraph(c)] if c.is_empty())
    }

    /// Children of the block at `parent`; the top level when `parent` is empty.
    pub fn siblings(&self, parent: &[usize]) -> Option<&Vec<Block>> {
        if parent.is_empty() {
            Some(&self.blocks)
        } else {
            self.block(parent)?.children()
        }
    }

    pub fn siblings_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Block>> {
        if parent.is_empty() {
            Some(&mut self.blocks)
        } else {
            self.block_mut(parent)?.children_mut()
        }
    }

    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get(*first)?;
        for idx in rest {
            block = block.children()?.get(*idx)?;
        }
        Some(block)
    }

    pub fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get_mut(*first)?;
        for idx in rest {
            block = block.children_mut()?.get_mut(*idx)?;
        }
        Some(block)
    }

    /// Paths of every textblock, in document order.
    pub fn textblock_paths(&self) -> Vec<Vec<usize>> {
        fn walk(blocks: &[Block], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            for (i, block) in blocks.iter().enumerate() {
                prefix.push(i);
                if block.is_textblock() {
                    out.push(prefix.clone());
                } else if let Some(children) = block.children() {
                    walk(children, prefix, out);
                }
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.blocks, &mut Vec::new(), &mut out);
        out
    }

    /// Every variable embedding, in document order.
    pub fn embeddings(&self) -> Vec<(EmbeddingLocation, &Variable)> {
        let mut out = Vec::new();
        for path in self.textblock_paths() {
            if let Some(content) = self.block(&path).and_then(Block::inlines) {
                for (index, inline) in content.iter().enumerate() {
                    if let Inline::Variable(v) = inline {
                        out.push((
                            EmbeddingLocation {
                                path: path.clone(),
                                index,
                            },
                            v,
                        ));
                    }
                }
            }
        }
        out
    }

    /// Visit every embedding mutably. Returns how many the closure changed.
    pub fn for_each_embedding_mut<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&mut Variable) -> bool,
    {
        fn walk<F: FnMut(&mut Variable) -> bool>(blocks: &mut [Block], f: &mut F) -> usize {
            let mut changed = 0;
            for block in blocks {
                if let Some(content) = block.inlines_mut() {
                    for inline in content.iter_mut() {
                        if let Inline::Variable(v) = inline {
                            if f(v) {
                                changed += 1;
                            }
                        }
                    }
                } else if let Some(children) = block.children_mut() {
                    changed += walk(children, f);
                }
            }
            changed
        }
        walk(&mut self.blocks, &mut f)
    }

    /// Embedding at a location, if it still holds one.
    pub fn embedding_mut(&mut self, loc: &EmbeddingLocation) -> Option<&mut Variable> {
        match self.block_mut(&loc.path)?.inlines_mut()?.get_mut(loc.index)? {
            Inline::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// End of the last textblock.
    pub fn end_position(&self) -> Option<TextPosition> {
        let path = self.textblock_paths().pop()?;
        let offset = self.block(&path)?.content_size();
        Some(TextPosition::new(path, offset))
    }

    /// Plain text of the document, one line per textblock; atoms render as
    /// `{label}`.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for path in self.textblock_paths() {
            let mut line = String::new();
            match self.block(&path) {
                Some(Block::CodeBlock(text)) => line.push_str(text),
                Some(block) => {
                    for inline in block.inlines().map(Vec::as_slice).unwrap_or(&[]) {
                        match inline {
                            Inline::Text { text, .. } => line.push_str(text),
                            Inline::HardBreak => line.push('\n'),
                            Inline::Image { alt, .. } => {
                                line.push_str(alt.as_deref().unwrap_or("[image]"))
                            }
                            Inline::Variable(v) => {
                                line.push('{');
                                line.push_str(&v.display_label());
                                line.push('}');
                            }
                        }
                    }
                }
                None => {}
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{create_variable, VariableOverrides, VariableType};

    fn var(label: &str) -> Variable {
        create_variable(
            VariableType::Text,
            VariableOverrides {
                label: Some(label.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_empty_document_is_blank() {
        let doc = Document::empty();
        assert!(doc.is_blank());
        assert_eq!(Document::new(Vec::new()), doc);
    }

    #[test]
    fn test_atoms_count_as_one_unit() {
        let content = vec![
            Inline::text("héllo"),
            Inline::Variable(var("Name")),
            Inline::HardBreak,
        ];
        assert_eq!(inline_size(&content), 7);
    }

    #[test]
    fn test_split_inlines_inside_text() {
        let content = vec![Inline::text("abcdef"), Inline::Variable(var("V"))];
        let (head, tail) = split_inlines(content, 3);
        assert_eq!(head, vec![Inline::text("abc")]);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0], Inline::text("def"));
    }

    #[test]
    fn test_split_inlines_around_atom() {
        let v = var("V");
        let content = vec![
            Inline::text("ab"),
            Inline::Variable(v.clone()),
            Inline::text("cd"),
        ];
        let (head, tail) = split_inlines(content, 3);
        assert_eq!(head.len(), 2);
        assert_eq!(head[1], Inline::Variable(v));
        assert_eq!(tail, vec![Inline::text("cd")]);
    }

    #[test]
    fn test_split_inlines_multibyte() {
        let (head, tail) = split_inlines(vec![Inline::text("ñandú")], 2);
        assert_eq!(head, vec![Inline::text("ña")]);
        assert_eq!(tail, vec![Inline::text("ndú")]);
    }

    #[test]
    fn test_normalize_merges_and_drops_empty() {
        let mut content = vec![
            Inline::text("a"),
            Inline::text(""),
            Inline::text("b"),
            Inline::Text {
                text: "c".to_string(),
                marks: vec![Mark::Strong],
            },
        ];
        normalize_inlines(&mut content);
        assert_eq!(content.len(), 2);
        assert_eq!(content[0], Inline::text("ab"));
    }

    #[test]
    fn test_canonical_marks_dedups_kinds() {
        let mut marks = vec![
            Mark::Strong,
            Mark::Em,
            Mark::Strong,
            Mark::Link {
                href: "a".to_string(),
                title: None,
            },
        ];
        canonical_marks(&mut marks);
        assert_eq!(marks.len(), 3);
        assert_eq!(marks[0].name(), "link");
    }

    #[test]
    fn test_marks_at_prefers_left_run() {
        let content = vec![
            Inline::Text {
                text: "ab".to_string(),
                marks: vec![Mark::Em],
            },
            Inline::text("cd"),
        ];
        assert_eq!(marks_at(&content, 2), vec![Mark::Em]);
        assert_eq!(marks_at(&content, 0), vec![Mark::Em]);
        assert!(marks_at(&content, 3).is_empty());
    }

    #[test]
    fn test_block_paths_and_embeddings_order() {
        let a = var("A");
        let b = var("B");
        let doc = Document::new(vec![
            Block::Paragraph(vec![Inline::Variable(a.clone())]),
            Block::BulletList(vec![Block::ListItem(vec![Block::Paragraph(vec![
                Inline::text("x"),
                Inline::Variable(b.clone()),
            ])])]),
            Block::HorizontalRule,
        ]);
        assert_eq!(doc.textblock_paths(), vec![vec![0], vec![1, 0, 0]]);
        let ids: Vec<&str> = doc.embeddings().iter().map(|(_, v)| v.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
        let (loc, _) = &doc.embeddings()[1];
        assert_eq!(loc.path, vec![1, 0, 0]);
        assert_eq!(loc.index, 1);
    }

    #[test]
    fn test_for_each_embedding_mut_counts_changes() {
        let a = var("A");
        let mut doc = Document::new(vec![Block::Paragraph(vec![
            Inline::Variable(a.clone()),
            Inline::Variable(var("B")),
            Inline::Variable(a.clone()),
        ])]);
        let changed = doc.for_each_embedding_mut(|v| {
            if v.id == a.id {
                v.value = "set".to_string();
                true
            } else {
                false
            }
        });
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_inlines_from_plain() {
        let content = inlines_from_plain("a\n\nb");
        assert_eq!(
            content,
            vec![
                Inline::text("a"),
                Inline::HardBreak,
                Inline::HardBreak,
                Inline::text("b")
            ]
        );
    }

    #[test]
    fn test_plain_text_renders_embeddings() {
        let doc = Document::new(vec![Block::Paragraph(vec![
            Inline::text("Dear "),
            Inline::Variable(var("Name")),
        ])]);
        assert_eq!(doc.plain_text(), "Dear {Name}");
    }
}
