//! Structural editing commands
//!
//! Each command takes the document and a position or block path, performs one
//! edit, and reports whether it applied. A command that does not apply leaves
//! the document untouched.
//!
//! # Commands
//! - **Text**: insert text at a position, replace the text of a run
//! - **Blocks**: split (Enter), join backward (Backspace at block start),
//!   change block type, insert a horizontal rule
//! - **Marks**: toggle strong/em/code/link over a range of one textblock
//! - **Wrapping**: wrap in a list or blockquote, lift out of a wrapper
//! - **Atoms**: insert inline or block-level embeddings, delete an atom

use super::node::{
    char_to_byte, inline_size, inlines_from_plain, marks_at, normalize_inlines, split_inlines,
    Block, Document, Inline, Mark, TextPosition,
};
use crate::variables::Variable;

/// Target type for `set_block_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    CodeBlock,
}

/// Container for `wrap_in`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    BulletList,
    OrderedList,
    Blockquote,
}

fn split_path(path: &[usize]) -> Option<(&[usize], usize)> {
    let (last, parent) = path.split_last()?;
    Some((parent, *last))
}

fn child_path(parent: &[usize], idx: usize) -> Vec<usize> {
    let mut path = parent.to_vec();
    path.push(idx);
    path
}

/// Whether the position lies inside a code block.
pub fn in_code_block(doc: &Document, pos: &TextPosition) -> bool {
    doc.block(&pos.path).is_some_and(Block::is_code)
}

// ─────────────────────────────────────────────────────────────────────────────
// Text
// ─────────────────────────────────────────────────────────────────────────────

/// Insert text, inheriting the marks of the surrounding run.
pub fn insert_text(doc: &mut Document, pos: &TextPosition, text: &str) -> Option<TextPosition> {
    if text.is_empty() {
        return None;
    }
    let block = doc.block_mut(&pos.path)?;
    let added = text.chars().count();

    if let Block::CodeBlock(code) = block {
        let byte = char_to_byte(code, pos.offset);
        code.insert_str(byte, text);
        return Some(TextPosition::new(pos.path.clone(), pos.offset + added));
    }

    let content = block.inlines_mut()?;
    let offset = pos.offset.min(inline_size(content));
    let marks = marks_at(content, offset);
    let (mut head, tail) = split_inlines(std::mem::take(content), offset);
    head.push(Inline::Text {
        text: text.to_string(),
        marks,
    });
    head.extend(tail);
    normalize_inlines(&mut head);
    *content = head;
    Some(TextPosition::new(pos.path.clone(), offset + added))
}

/// Insert an inline node at a position. Not allowed in code blocks.
pub fn insert_inline(doc: &mut Document, pos: &TextPosition, inline: Inline) -> Option<TextPosition> {
    let content = doc.block_mut(&pos.path)?.inlines_mut()?;
    let offset = pos.offset.min(inline_size(content));
    let (mut head, tail) = split_inlines(std::mem::take(content), offset);
    head.push(inline);
    head.extend(tail);
    normalize_inlines(&mut head);
    *content = head;
    Some(TextPosition::new(pos.path.clone(), offset + 1))
}

/// Replace the text of the run at `index`. An empty string removes the run.
pub fn replace_run_text(doc: &mut Document, path: &[usize], index: usize, text: &str) -> bool {
    let Some(content) = doc.block_mut(path).and_then(Block::inlines_mut) else {
        return false;
    };
    match content.get_mut(index) {
        Some(Inline::Text { text: run, .. }) => {
            if run == text {
                return false;
            }
            *run = text.to_string();
            normalize_inlines(content);
            true
        }
        _ => false,
    }
}

/// Replace the whole text of a code block.
pub fn set_code_text(doc: &mut Document, path: &[usize], text: &str) -> bool {
    match doc.block_mut(path) {
        Some(Block::CodeBlock(code)) if code != text => {
            *code = text.to_string();
            true
        }
        _ => false,
    }
}

/// Remove an inline atom (embedding, image, hard break).
pub fn delete_inline(doc: &mut Document, path: &[usize], index: usize) -> bool {
    let Some(content) = doc.block_mut(path).and_then(Block::inlines_mut) else {
        return false;
    };
    if !content.get(index).is_some_and(Inline::is_atom) {
        return false;
    }
    content.remove(index);
    normalize_inlines(content);
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Block Splitting and Joining
// ─────────────────────────────────────────────────────────────────────────────

/// Split a paragraph or heading into two blocks at `offset`.
///
/// The tail of a heading becomes a paragraph when it is empty.
fn split_textblock(block: &Block, offset: usize) -> Option<(Block, Block)> {
    let content = block.inlines()?.clone();
    let (head, tail) = split_inlines(content, offset);
    let tail_block = match block {
        Block::Heading { level, .. } if inline_size(&tail) > 0 => Block::Heading {
            level: *level,
            content: tail,
        },
        _ => Block::Paragraph(tail),
    };
    Some((block.with_inlines(head), tail_block))
}

/// Split the block at the caret (Enter).
///
/// In a code block this inserts a newline. Inside a list item the item
/// itself is split; Enter in an empty single-paragraph item lifts it out of
/// the list.
pub fn split_block(doc: &mut Document, pos: &TextPosition) -> Option<TextPosition> {
    let block = doc.block(&pos.path)?.clone();
    if block.is_code() {
        return insert_text(doc, pos, "\n");
    }
    let (parent, idx) = split_path(&pos.path)?;
    let (head, tail) = split_textblock(&block, pos.offset)?;

    if let Some(Block::ListItem(children)) = doc.block(parent) {
        let children = children.clone();
        let (list_path, item_idx) = split_path(parent)?;

        if children.len() == 1 && block.content_size() == 0 {
            let new_path = lift(doc, &pos.path)?;
            return Some(TextPosition::new(new_path, 0));
        }

        let mut first: Vec<Block> = children[..idx].to_vec();
        first.push(head);
        let mut second = vec![tail];
        second.extend_from_slice(&children[idx + 1..]);

        let items = doc.block_mut(list_path)?.children_mut()?;
        items.splice(
            item_idx..=item_idx,
            [Block::ListItem(first), Block::ListItem(second)],
        );
        let mut path = child_path(list_path, item_idx + 1);
        path.push(0);
        return Some(TextPosition::new(path, 0));
    }

    let siblings = doc.siblings_mut(parent)?;
    siblings.splice(idx..=idx, [head, tail]);
    Some(TextPosition::new(child_path(parent, idx + 1), 0))
}

/// Join the block at `path` into the one before it (Backspace at start).
///
/// A horizontal rule before the block is removed instead. The first block of
/// a wrapper is lifted out of it.
pub fn join_backward(doc: &mut Document, path: &[usize]) -> Option<TextPosition> {
    let (parent, idx) = split_path(path)?;
    if idx == 0 {
        if parent.is_empty() {
            return None;
        }
        let new_path = lift(doc, path)?;
        return Some(TextPosition::new(new_path, 0));
    }

    let siblings = doc.siblings_mut(parent)?;
    if matches!(siblings.get(idx - 1)?, Block::HorizontalRule) {
        siblings.remove(idx - 1);
        return Some(TextPosition::new(child_path(parent, idx - 1), 0));
    }

    let current = siblings.get(idx)?.clone();
    let previous = siblings.get_mut(idx - 1)?;
    let offset = match &current {
        Block::CodeBlock(code) => {
            let Block::CodeBlock(prev) = previous else {
                return None;
            };
            let offset = prev.chars().count();
            prev.push_str(code);
            offset
        }
        _ => {
            let tail = current.inlines()?.clone();
            let prev_content = previous.inlines_mut()?;
            let offset = inline_size(prev_content);
            prev_content.extend(tail);
            normalize_inlines(prev_content);
            offset
        }
    };
    siblings.remove(idx);
    Some(TextPosition::new(child_path(parent, idx - 1), offset))
}

// ─────────────────────────────────────────────────────────────────────────────
// Block Types and Rules
// ─────────────────────────────────────────────────────────────────────────────

/// Change a textblock into another textblock type.
///
/// Converting to a code block strips marks and fails when the block holds
/// embeddings or images.
pub fn set_block_type(doc: &mut Document, path: &[usize], kind: BlockKind) -> bool {
    let Some(block) = doc.block_mut(path) else {
        return false;
    };

    let content = match block {
        Block::Paragraph(content) | Block::Heading { content, .. } => content.clone(),
        Block::CodeBlock(text) => inlines_from_plain(text),
        _ => return false,
    };

    let replacement = match kind {
        BlockKind::Paragraph => Block::Paragraph(content),
        BlockKind::Heading(level) => Block::Heading {
            level: level.clamp(1, 6),
            content,
        },
        BlockKind::CodeBlock => {
            let mut code = String::new();
            for inline in &content {
                match inline {
                    Inline::Text { text, .. } => code.push_str(text),
                    Inline::HardBreak => code.push('\n'),
                    Inline::Image { .. } | Inline::Variable(_) => return false,
                }
            }
            Block::CodeBlock(code)
        }
    };

    if *block == replacement {
        return false;
    }
    *block = replacement;
    true
}

/// Insert a horizontal rule at the caret, splitting the block if needed.
///
/// Returns the start of the block after the rule.
pub fn insert_horizontal_rule(doc: &mut Document, pos: &TextPosition) -> Option<TextPosition> {
    let (parent, idx) = split_path(&pos.path)?;
    let block = doc.block(&pos.path)?.clone();
    let size = block.content_size();

    let mut replacement = Vec::new();
    let cursor_idx;
    if pos.offset == 0 && size > 0 {
        replacement.push(Block::HorizontalRule);
        replacement.push(block);
        cursor_idx = idx + 1;
    } else if pos.offset >= size || block.is_code() {
        replacement.push(block);
        replacement.push(Block::HorizontalRule);
        replacement.push(Block::empty_paragraph());
        cursor_idx = idx + 2;
    } else {
        let (head, tail) = split_textblock(&block, pos.offset)?;
        replacement.push(head);
        replacement.push(Block::HorizontalRule);
        replacement.push(tail);
        cursor_idx = idx + 2;
    }

    let siblings = doc.siblings_mut(parent)?;
    siblings.splice(idx..=idx, replacement);
    Some(TextPosition::new(child_path(parent, cursor_idx), 0))
}

/// Insert a block-level embedding on its own line at the caret.
///
/// The textblock is split at the caret; an empty head is dropped and the
/// tail always survives to hold the caret.
pub fn insert_block_embedding(
    doc: &mut Document,
    pos: &TextPosition,
    variable: Variable,
) -> Option<TextPosition> {
    let (parent, idx) = split_path(&pos.path)?;
    let block = doc.block(&pos.path)?.clone();
    let (head, tail) = split_textblock(&block, pos.offset)?;

    let mut replacement = Vec::new();
    if head.content_size() > 0 {
        replacement.push(head);
    }
    replacement.push(Block::Paragraph(vec![Inline::Variable(variable)]));
    let cursor_idx = idx + replacement.len();
    replacement.push(tail);

    let siblings = doc.siblings_mut(parent)?;
    siblings.splice(idx..=idx, replacement);
    Some(TextPosition::new(child_path(parent, cursor_idx), 0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Marks
// ─────────────────────────────────────────────────────────────────────────────

/// Toggle a mark over `from..to` inside one paragraph or heading.
///
/// Removes the mark when every text run in the range already carries it,
/// otherwise adds it. Atoms in the range are left alone.
pub fn toggle_mark(doc: &mut Document, path: &[usize], from: usize, to: usize, mark: Mark) -> bool {
    let Some(content) = doc.block_mut(path).and_then(Block::inlines_mut) else {
        return false;
    };
    let size = inline_size(content);
    let (from, to) = (from.min(size), to.min(size));
    if from >= to {
        return false;
    }

    let (mut head, rest) = split_inlines(content.clone(), from);
    let (mut middle, tail) = split_inlines(rest, to - from);

    let runs: Vec<&Vec<Mark>> = middle
        .iter()
        .filter_map(|inline| match inline {
            Inline::Text { marks, .. } => Some(marks),
            _ => None,
        })
        .collect();
    if runs.is_empty() {
        return false;
    }
    let all_have = runs
        .iter()
        .all(|marks| marks.iter().any(|m| m.same_kind(&mark)));

    for inline in middle.iter_mut() {
        if let Inline::Text { marks, .. } = inline {
            marks.retain(|m| !m.same_kind(&mark));
            if !all_have {
                marks.push(mark.clone());
            }
        }
    }

    head.append(&mut middle);
    head.extend(tail);
    normalize_inlines(&mut head);
    *content = head;
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Wrapping
// ─────────────────────────────────────────────────────────────────────────────

/// Wrap the block at `path` in a list or blockquote.
///
/// Lists only wrap paragraphs. Returns the block's new path.
pub fn wrap_in(doc: &mut Document, path: &[usize], wrapper: Wrapper) -> Option<Vec<usize>> {
    let (parent, idx) = split_path(path)?;
    let block = doc.block(path)?;
    if matches!(block, Block::ListItem(_)) {
        return None;
    }
    if wrapper != Wrapper::Blockquote && !matches!(block, Block::Paragraph(_)) {
        return None;
    }

    let siblings = doc.siblings_mut(parent)?;
    let inner = std::mem::replace(&mut siblings[idx], Block::HorizontalRule);
    let (wrapped, depth) = match wrapper {
        Wrapper::Blockquote => (Block::Blockquote(vec![inner]), 1),
        Wrapper::BulletList => (Block::BulletList(vec![Block::ListItem(vec![inner])]), 2),
        Wrapper::OrderedList => (
            Block::OrderedList {
                order: 1,
                items: vec![Block::ListItem(vec![inner])],
            },
            2,
        ),
    };
    siblings[idx] = wrapped;

    let mut new_path = path.to_vec();
    new_path.extend(std::iter::repeat(0).take(depth));
    Some(new_path)
}

/// Move the block at `path` out of its nearest blockquote or list.
///
/// The wrapper is split around the block. Returns the block's new path.
pub fn lift(doc: &mut Document, path: &[usize]) -> Option<Vec<usize>> {
    let (parent, idx) = split_path(path)?;
    if parent.is_empty() {
        return None;
    }

    match doc.block(parent)?.clone() {
        Block::Blockquote(children) => {
            let (grandparent, quote_idx) = split_path(parent)?;
            let before = children[..idx].to_vec();
            let target = children.get(idx)?.clone();
            let after = children[idx + 1..].to_vec();

            let mut replacement = Vec::new();
            if !before.is_empty() {
                replacement.push(Block::Blockquote(before));
            }
            let new_idx = quote_idx + replacement.len();
            replacement.push(target);
            if !after.is_empty() {
                replacement.push(Block::Blockquote(after));
            }

            doc.siblings_mut(grandparent)?
                .splice(quote_idx..=quote_idx, replacement);
            Some(child_path(grandparent, new_idx))
        }
        Block::ListItem(children) => {
            let (list_path, item_idx) = split_path(parent)?;
            let (grandparent, list_idx) = split_path(list_path)?;
            let list = doc.block(list_path)?.clone();
            let items = list.children()?;

            let mut before: Vec<Block> = items[..item_idx].to_vec();
            let mut after: Vec<Block> = items[item_idx + 1..].to_vec();
            if idx > 0 {
                before.push(Block::ListItem(children[..idx].to_vec()));
            }
            if idx + 1 < children.len() {
                after.insert(0, Block::ListItem(children[idx + 1..].to_vec()));
            }
            let target = children.get(idx)?.clone();

            let rebuild = |items: Vec<Block>, order_shift: usize| match &list {
                Block::OrderedList { order, .. } => Block::OrderedList {
                    order: order.saturating_add(order_shift as u32),
                    items,
                },
                _ => Block::BulletList(items),
            };

            let mut replacement = Vec::new();
            let before_len = before.len();
            if !before.is_empty() {
                replacement.push(rebuild(before, 0));
            }
            let new_idx = list_idx + replacement.len();
            replacement.push(target);
            if !after.is_empty() {
                replacement.push(rebuild(after, before_len));
            }

            doc.siblings_mut(grandparent)?
                .splice(list_idx..=list_idx, replacement);
            Some(child_path(grandparent, new_idx))
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
