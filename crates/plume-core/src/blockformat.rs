//! Block-level shorthand recognition.
//!
//! Runs only when the inline transformer found nothing. Inspects the full
//! text of the block holding the caret (zero-width joiners stripped) and,
//! when a marker is anchored at the start, swaps the whole block for its
//! semantic replacement. The matched prefix is removed from the remaining
//! text and the caret offset is reduced by the prefix length, clamped at
//! zero.

use serde_json::Value;

use crate::autoformat::strip_zero_width;
use crate::core::{Attrs, ElementNode, Node, Point, Selection};
use crate::list::{self, ListType};
use crate::ops::{Op, Transaction};
use crate::plugin::{
    TransactionTransform, callout_node, is_callout_kind, node_at_path, point_for_global_offset,
    point_global_offset, replace_node_ops,
};

pub(crate) struct BlockShorthandTransform;

enum BlockMatch {
    Heading(u64),
    Blockquote,
    List { list_type: ListType, start: u64 },
    CodeBlock { language: String },
    Callout { kind: String },
    MathDisplay { expression: String },
}

impl TransactionTransform for BlockShorthandTransform {
    fn id(&self) -> &'static str {
        "autoformat.block_shorthand"
    }

    fn transform(&self, editor: &crate::core::Editor, tx: &Transaction) -> Option<Transaction> {
        let source = tx.meta.source.as_deref()?;
        if source != "ime:replace_text" {
            return None;
        }

        let preview = editor.preview_transaction(tx).ok()?;
        if !preview.selection.is_collapsed() {
            return None;
        }

        let focus = &preview.selection.focus;
        let (leaf_ix, block_path) = focus.path.split_last()?;
        if block_path.is_empty() {
            return None;
        }

        let Node::Element(block_el) = node_at_path(&preview.doc, block_path)? else {
            return None;
        };
        // Only plain paragraphs reformat; fences typed inside a code block
        // or a heading stay literal.
        if block_el.kind != "paragraph" {
            return None;
        }

        let raw_text = block_el.plain_text();
        let text = strip_zero_width(&raw_text);
        let caret_global = point_global_offset(&block_el.children, *leaf_ix, focus.offset);

        let (found, prefix_len) = recognize(&text)?;

        let remaining_caret = caret_global.saturating_sub(prefix_len);
        let remaining = remaining_text_children(block_el, prefix_len);

        let mut ops = tx.ops.clone();
        let mut selection_after = None;

        match found {
            BlockMatch::Heading(level) => {
                let mut attrs = block_el.attrs.clone();
                attrs.insert(
                    "level".to_string(),
                    Value::Number(serde_json::Number::from(level)),
                );
                let node = Node::Element(ElementNode {
                    kind: "heading".to_string(),
                    attrs,
                    children: remaining.clone(),
                });
                ops.extend(replace_node_ops(block_path, node));
                selection_after = Some(point_for_global_offset(
                    block_path,
                    &remaining,
                    remaining_caret,
                ));
            }
            BlockMatch::Blockquote => {
                let para = Node::Element(ElementNode {
                    kind: "paragraph".to_string(),
                    attrs: Attrs::default(),
                    children: remaining.clone(),
                });
                let quote = Node::Element(ElementNode {
                    kind: "blockquote".to_string(),
                    attrs: block_el.attrs.clone(),
                    children: vec![para],
                });
                ops.extend(replace_node_ops(block_path, quote));
                let mut inner_path = block_path.to_vec();
                inner_path.push(0);
                selection_after = Some(point_for_global_offset(
                    &inner_path,
                    &remaining,
                    remaining_caret,
                ));
            }
            BlockMatch::List { list_type, start } => {
                let node = list::list_node(list_type, start, remaining.clone());
                ops.extend(replace_node_ops(block_path, node));
                let mut item_path = block_path.to_vec();
                item_path.push(0);
                selection_after = Some(point_for_global_offset(
                    &item_path,
                    &remaining,
                    remaining_caret,
                ));
            }
            BlockMatch::CodeBlock { language } => {
                let mut attrs = Attrs::default();
                attrs.insert("language".to_string(), Value::String(language));
                let node = Node::Element(ElementNode {
                    kind: "code_block".to_string(),
                    attrs,
                    children: remaining.clone(),
                });
                ops.extend(replace_node_ops(block_path, node));
                selection_after = Some(point_for_global_offset(
                    block_path,
                    &remaining,
                    remaining_caret,
                ));
            }
            BlockMatch::Callout { kind } => {
                let title = plain_of(&remaining);
                let node = callout_node(&kind, &title, Vec::new());
                ops.extend(replace_node_ops(block_path, node));
                let mut title_path = block_path.to_vec();
                title_path.extend([0, 0]);
                selection_after = Some(Point::new(
                    title_path,
                    remaining_caret.min(title.len()),
                ));
            }
            BlockMatch::MathDisplay { expression } => {
                ops.extend(replace_node_ops(
                    block_path,
                    Node::math_span(expression, true),
                ));
                let mut after_path = block_path.to_vec();
                *after_path.last_mut()? += 1;
                ops.push(Op::InsertNode {
                    path: after_path.clone(),
                    node: Node::paragraph(""),
                });
                after_path.push(0);
                selection_after = Some(Point::new(after_path, 0));
            }
        }

        let mut out = Transaction::new(ops);
        out.meta = tx.meta.clone();
        out.selection_after = selection_after.map(Selection::collapsed);
        Some(out)
    }
}

/// Match a shorthand anchored at the start of `text`. Returns the match
/// and the byte length of the prefix to strip.
fn recognize(text: &str) -> Option<(BlockMatch, usize)> {
    // The display-math form matches on the whole trimmed block, not on a
    // prefix; everything it covers is consumed.
    let trimmed = text.trim();
    if let Some(inner) = trimmed
        .strip_prefix("[math]")
        .and_then(|rest| rest.strip_suffix("[/math]"))
    {
        return Some((
            BlockMatch::MathDisplay {
                expression: inner.to_string(),
            },
            text.len(),
        ));
    }

    let hashes = text.chars().take_while(|c| *c == '#').count();
    if (1..=4).contains(&hashes) && text[hashes..].starts_with(' ') {
        return Some((BlockMatch::Heading(hashes as u64), hashes + 1));
    }

    if text.starts_with("> ") {
        return Some((BlockMatch::Blockquote, 2));
    }

    if text.starts_with("* ") || text.starts_with("- ") {
        return Some((
            BlockMatch::List {
                list_type: ListType::Bullet,
                start: 1,
            },
            2,
        ));
    }

    if let Some(found) = match_ordered_marker(text) {
        return Some(found);
    }

    if let Some(rest) = text.strip_prefix("```") {
        let space = rest.find(' ')?;
        let language = &rest[..space];
        if language.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '#') {
            let language = if language.is_empty() { "text" } else { language };
            return Some((
                BlockMatch::CodeBlock {
                    language: language.to_string(),
                },
                3 + space + 1,
            ));
        }
        return None;
    }

    if let Some(rest) = text.strip_prefix("[!") {
        let close = rest.find(']')?;
        let kind = &rest[..close];
        if is_callout_kind(kind) && rest[close + 1..].starts_with(' ') {
            return Some((
                BlockMatch::Callout {
                    kind: kind.to_string(),
                },
                2 + close + 2,
            ));
        }
        return None;
    }

    None
}

/// Ordered-list markers: `N.`/`N)`, single alpha letters, the lowercase
/// roman forms `i`/`v`/`x` (checked ahead of plain alpha), and single
/// Bengali consonants, each followed by `. ` or `) `.
fn match_ordered_marker(text: &str) -> Option<(BlockMatch, usize)> {
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &text[digits..];
        if rest.starts_with(". ") || rest.starts_with(") ") {
            let start: u64 = text[..digits].parse().ok()?;
            return Some((
                BlockMatch::List {
                    list_type: ListType::Decimal,
                    start: start.max(1),
                },
                digits + 2,
            ));
        }
        return None;
    }

    let first = text.chars().next()?;
    let rest = &text[first.len_utf8()..];
    if !(rest.starts_with(". ") || rest.starts_with(") ")) {
        return None;
    }
    let prefix_len = first.len_utf8() + 2;

    if matches!(first, 'i' | 'v' | 'x') {
        let start = match first {
            'i' => 1,
            'v' => 5,
            _ => 10,
        };
        return Some((
            BlockMatch::List {
                list_type: ListType::LowerRoman,
                start,
            },
            prefix_len,
        ));
    }

    if first.is_ascii_lowercase() {
        return Some((
            BlockMatch::List {
                list_type: ListType::LowerAlpha,
                start: (first as u64) - ('a' as u64) + 1,
            },
            prefix_len,
        ));
    }
    if first.is_ascii_uppercase() {
        return Some((
            BlockMatch::List {
                list_type: ListType::UpperAlpha,
                start: (first as u64) - ('A' as u64) + 1,
            },
            prefix_len,
        ));
    }

    if let Some(pos) = list::bangla_ordinal(first) {
        return Some((
            BlockMatch::List {
                list_type: ListType::Bangla,
                start: pos,
            },
            prefix_len,
        ));
    }

    None
}

/// The block's inline children with `prefix_len` characters of visible
/// text (and any zero-width characters inside that span) consumed from the
/// front.
fn remaining_text_children(block: &ElementNode, prefix_len: usize) -> Vec<Node> {
    let mut remaining = prefix_len;
    let mut out: Vec<Node> = Vec::new();

    for child in &block.children {
        match child {
            Node::Text(t) if remaining > 0 => {
                let mut consumed = 0usize;
                for ch in t.text.chars() {
                    if remaining == 0 {
                        break;
                    }
                    consumed += ch.len_utf8();
                    if !matches!(ch, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}') {
                        remaining -= ch.len_utf8().min(remaining);
                    }
                }
                let rest = &t.text[consumed..];
                if !rest.is_empty() {
                    out.push(Node::text(rest, t.marks.clone()));
                }
            }
            other => out.push(other.clone()),
        }
    }

    if out.is_empty()
        || !out.iter().any(|n| matches!(n, Node::Text(_)))
    {
        out.insert(0, Node::text("", crate::core::Marks::default()));
    }
    out
}

fn plain_of(children: &[Node]) -> String {
    let mut out = String::new();
    for child in children {
        if let Node::Text(t) = child {
            out.push_str(&t.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(text: &str) -> Option<&'static str> {
        recognize(text).map(|(m, _)| match m {
            BlockMatch::Heading(_) => "heading",
            BlockMatch::Blockquote => "blockquote",
            BlockMatch::List { .. } => "list",
            BlockMatch::CodeBlock { .. } => "code_block",
            BlockMatch::Callout { .. } => "callout",
            BlockMatch::MathDisplay { .. } => "math_display",
        })
    }

    #[test]
    fn heading_needs_one_to_four_hashes() {
        assert_eq!(kind_of("# t"), Some("heading"));
        assert_eq!(kind_of("#### t"), Some("heading"));
        assert_eq!(kind_of("##### t"), None);
        assert_eq!(kind_of("#t"), None);
    }

    #[test]
    fn roman_singles_win_over_alpha() {
        let Some((BlockMatch::List { list_type, start }, _)) = recognize("i. ") else {
            panic!("expected list");
        };
        assert_eq!(list_type, ListType::LowerRoman);
        assert_eq!(start, 1);

        let Some((BlockMatch::List { list_type, start }, _)) = recognize("x) ") else {
            panic!("expected list");
        };
        assert_eq!(list_type, ListType::LowerRoman);
        assert_eq!(start, 10);

        let Some((BlockMatch::List { list_type, .. }, _)) = recognize("b. ") else {
            panic!("expected list");
        };
        assert_eq!(list_type, ListType::LowerAlpha);
    }

    #[test]
    fn decimal_marker_keeps_its_start() {
        let Some((BlockMatch::List { list_type, start }, len)) = recognize("7) go") else {
            panic!("expected list");
        };
        assert_eq!(list_type, ListType::Decimal);
        assert_eq!(start, 7);
        assert_eq!(len, 3);
    }

    #[test]
    fn empty_fence_language_defaults_to_text() {
        let Some((BlockMatch::CodeBlock { language }, _)) = recognize("``` ") else {
            panic!("expected code block");
        };
        assert_eq!(language, "text");
    }

    #[test]
    fn unknown_callout_kind_stays_literal() {
        assert_eq!(kind_of("[!note] hm"), Some("callout"));
        assert_eq!(kind_of("[!shrug] hm"), None);
    }

    #[test]
    fn math_block_matches_whole_text() {
        assert_eq!(kind_of("[math]x^2[/math]"), Some("math_display"));
        assert_eq!(kind_of("[math]x^2"), None);
    }

    #[test]
    fn bangla_consonant_starts_a_list() {
        let Some((BlockMatch::List { list_type, start }, _)) = recognize("ক. ") else {
            panic!("expected list");
        };
        assert_eq!(list_type, ListType::Bangla);
        assert_eq!(start, 1);
    }
}
