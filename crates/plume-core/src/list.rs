//! List structure and numbering.
//!
//! A list element owns its items and a `counter` attr holding the next
//! ordinal to assign. The counter only increases; removing items never
//! rewinds it. Creation/continuation/exit/merge are driven by the keyboard
//! dispatch table; indentation is a separate per-block attribute and never
//! touches list structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::autoformat::strip_zero_width;
use crate::caret;
use crate::core::{Attrs, ElementNode, Node, Point, Selection};
use crate::ops::{Op, Transaction};
use crate::plugin::{
    ChildConstraint, CommandError, CommandSpec, NodeRole, NodeSpec, NormalizePass, PlumePlugin,
    PluginRegistry, QuerySpec, apply_or_noop, focus_block_path, node_at_path,
    point_for_global_offset, replace_node_ops,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    Bullet,
    Bangla,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Decimal => "decimal",
            ListType::LowerAlpha => "lower_alpha",
            ListType::UpperAlpha => "upper_alpha",
            ListType::LowerRoman => "lower_roman",
            ListType::Bullet => "bullet",
            ListType::Bangla => "bangla",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "decimal" => Some(ListType::Decimal),
            "lower_alpha" => Some(ListType::LowerAlpha),
            "upper_alpha" => Some(ListType::UpperAlpha),
            "lower_roman" => Some(ListType::LowerRoman),
            "bullet" => Some(ListType::Bullet),
            "bangla" => Some(ListType::Bangla),
            _ => None,
        }
    }
}

pub const BULLET_GLYPH: &str = "•";

/// The 32 base consonants used for bangla ordinals, dictionary order.
pub const BANGLA_CONSONANTS: [char; 32] = [
    'ক', 'খ', 'গ', 'ঘ', 'ঙ', 'চ', 'ছ', 'জ', 'ঝ', 'ঞ', 'ট', 'ঠ', 'ড', 'ঢ', 'ণ', 'ত', 'থ',
    'দ', 'ধ', 'ন', 'প', 'ফ', 'ব', 'ভ', 'ম', 'য', 'র', 'ল', 'শ', 'ষ', 'স', 'হ',
];

/// 1-based position of a consonant in the bangla ordinal set.
pub fn bangla_ordinal(ch: char) -> Option<u64> {
    BANGLA_CONSONANTS
        .iter()
        .position(|c| *c == ch)
        .map(|ix| ix as u64 + 1)
}

/// Rendered marker for ordinal `n` of a list of type `list_type`.
pub fn marker(list_type: ListType, n: u64) -> String {
    let n = n.max(1);
    match list_type {
        ListType::Bullet => BULLET_GLYPH.to_string(),
        ListType::Decimal => format!("{n}."),
        ListType::LowerAlpha => format!("{}.", to_alpha(n)),
        ListType::UpperAlpha => format!("{}.", to_alpha(n).to_ascii_uppercase()),
        ListType::LowerRoman => format!("{}.", to_roman(n)),
        ListType::Bangla => {
            let glyph = BANGLA_CONSONANTS
                .get((n - 1) as usize)
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("({n})"));
            format!("{glyph}.")
        }
    }
}

/// `a, b, …, z, aa, ab, …` for 1-based `n`.
fn to_alpha(mut n: u64) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}

/// Standard subtractive-notation roman numeral, lowercase.
fn to_roman(mut n: u64) -> String {
    const TABLE: [(u64, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, glyphs) in TABLE {
        while n >= value {
            out.push_str(glyphs);
            n -= value;
        }
    }
    out
}

/// A fresh single-item list. The item takes ordinal `start`; the list's
/// counter is already advanced past it.
pub fn list_node(list_type: ListType, start: u64, item_children: Vec<Node>) -> Node {
    let mut attrs = Attrs::default();
    attrs.insert(
        "list_type".to_string(),
        Value::String(list_type.as_str().to_string()),
    );
    attrs.insert(
        "counter".to_string(),
        Value::Number(serde_json::Number::from(start + 1)),
    );
    Node::Element(ElementNode {
        kind: "list".to_string(),
        attrs,
        children: vec![list_item(start, item_children)],
    })
}

fn list_item(index: u64, children: Vec<Node>) -> Node {
    let mut attrs = Attrs::default();
    attrs.insert(
        "index".to_string(),
        Value::Number(serde_json::Number::from(index)),
    );
    let children = if children.is_empty() {
        vec![Node::text("", crate::core::Marks::default())]
    } else {
        children
    };
    Node::Element(ElementNode {
        kind: "list_item".to_string(),
        attrs,
        children,
    })
}

pub struct ListPlugin;

impl PlumePlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec {
                kind: "list".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::BlockOnly,
            },
            NodeSpec {
                kind: "list_item".to_string(),
                role: NodeRole::Block,
                is_void: false,
                children: ChildConstraint::InlineOnly,
            },
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeListStructure)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.insert", "Insert list", |editor, args| {
                let list_type = args
                    .as_ref()
                    .and_then(|v| v.get("list_type"))
                    .and_then(|v| v.as_str())
                    .and_then(ListType::parse)
                    .unwrap_or(ListType::Bullet);
                let Some(block_path) = focus_block_path(editor) else {
                    return Err(CommandError::new("No active block"));
                };
                let Some(Node::Element(el)) = node_at_path(editor.doc(), &block_path) else {
                    return Err(CommandError::new("Focus is not inside an element"));
                };
                if el.kind != "paragraph" {
                    return Err(CommandError::new(format!(
                        "Cannot convert a {} block into a list",
                        el.kind
                    )));
                }
                let node = list_node(list_type, 1, el.children.clone());
                let mut caret_path = block_path.clone();
                caret_path.extend([0, 0]);
                let tx = Transaction::new(replace_node_ops(&block_path, node))
                    .selection_after(Selection::collapsed(Point::new(caret_path, 0)));
                apply_or_noop(editor, tx)
            })
            .description("Turn the active paragraph into a single-item list.")
            .keywords(["list", "bullet", "numbered", "ordered"])
            .args_example(serde_json::json!({ "list_type": "decimal" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec {
            id: "list.active_type".to_string(),
            handler: std::sync::Arc::new(|editor, _args| {
                let Some(ctx) = focus_list_context(editor) else {
                    return Ok(Value::Null);
                };
                let Some(Node::Element(list)) = node_at_path(editor.doc(), &ctx.list_path) else {
                    return Ok(Value::Null);
                };
                Ok(list
                    .attrs
                    .get("list_type")
                    .cloned()
                    .unwrap_or(Value::String("bullet".to_string())))
            }),
        }]
    }
}

struct NormalizeListStructure;

impl NormalizePass for NormalizeListStructure {
    fn id(&self) -> &'static str {
        "list.normalize_structure"
    }

    fn run(&self, doc: &crate::core::Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        crate::plugin::walk_elements(doc, registry, &mut |el, path| {
            if el.kind != "list" {
                return;
            }
            // One structural removal per pass; the normalize loop runs the
            // pass again with fresh paths.
            let removing = ops
                .iter()
                .any(|op| matches!(op, Op::RemoveNode { .. }));
            if removing {
                return;
            }

            if el.children.is_empty() {
                ops.push(Op::RemoveNode {
                    path: path.to_vec(),
                });
                return;
            }

            // Anything that is not a list item does not belong here.
            for (ix, child) in el.children.iter().enumerate() {
                let keep = matches!(child, Node::Element(item) if item.kind == "list_item");
                if !keep {
                    let mut child_path = path.to_vec();
                    child_path.push(ix);
                    ops.push(Op::RemoveNode { path: child_path });
                    return;
                }
            }

            if el
                .attr_str("list_type")
                .and_then(ListType::parse)
                .is_none()
            {
                let mut set = Attrs::default();
                set.insert(
                    "list_type".to_string(),
                    Value::String(ListType::Bullet.as_str().to_string()),
                );
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: crate::core::AttrPatch {
                        set,
                        remove: Vec::new(),
                    },
                });
            }

            // The counter never rewinds: it stays at least one past the
            // highest ordinal in use.
            let max_index = el
                .children
                .iter()
                .filter_map(|child| match child {
                    Node::Element(item) => item.attr_u64("index"),
                    _ => None,
                })
                .max()
                .unwrap_or(el.children.len() as u64);
            let counter = el.attr_u64("counter").unwrap_or(0);
            if counter < max_index + 1 {
                let mut set = Attrs::default();
                set.insert(
                    "counter".to_string(),
                    Value::Number(serde_json::Number::from(max_index + 1)),
                );
                ops.push(Op::SetNodeAttrs {
                    path: path.to_vec(),
                    patch: crate::core::AttrPatch {
                        set,
                        remove: Vec::new(),
                    },
                });
            }

            // Items missing an ordinal continue from their predecessor.
            let mut previous = 0u64;
            for (ix, child) in el.children.iter().enumerate() {
                let Node::Element(item) = child else {
                    continue;
                };
                match item.attr_u64("index") {
                    Some(index) => previous = index,
                    None => {
                        let mut set = Attrs::default();
                        set.insert(
                            "index".to_string(),
                            Value::Number(serde_json::Number::from(previous + 1)),
                        );
                        let mut item_path = path.to_vec();
                        item_path.push(ix);
                        ops.push(Op::SetNodeAttrs {
                            path: item_path,
                            patch: crate::core::AttrPatch {
                                set,
                                remove: Vec::new(),
                            },
                        });
                        previous += 1;
                    }
                }
            }
        });
        ops
    }
}

pub(crate) struct ListContext {
    pub list_path: Vec<usize>,
    pub item_ix: usize,
    /// Focus path relative to the item element.
    pub rel_path: Vec<usize>,
}

pub(crate) fn focus_list_context(editor: &crate::core::Editor) -> Option<ListContext> {
    let path = &editor.selection().focus.path;
    for depth in (1..path.len()).rev() {
        let Some(Node::Element(el)) = node_at_path(editor.doc(), &path[..depth]) else {
            continue;
        };
        if el.kind != "list_item" {
            continue;
        }
        let list_path = path[..depth - 1].to_vec();
        let Some(Node::Element(parent)) = node_at_path(editor.doc(), &list_path) else {
            continue;
        };
        if parent.kind != "list" {
            continue;
        }
        return Some(ListContext {
            list_path,
            item_ix: path[depth - 1],
            rel_path: path[depth..].to_vec(),
        });
    }
    None
}

fn item_at<'a>(
    editor: &'a crate::core::Editor,
    ctx: &ListContext,
) -> Option<&'a ElementNode> {
    let mut item_path = ctx.list_path.clone();
    item_path.push(ctx.item_ix);
    match node_at_path(editor.doc(), &item_path) {
        Some(Node::Element(el)) => Some(el),
        _ => None,
    }
}

/// Enter inside a list item: exit on an empty item, continue otherwise.
pub fn on_enter(editor: &crate::core::Editor) -> Option<Transaction> {
    let ctx = focus_list_context(editor)?;
    let item = item_at(editor, &ctx)?;
    let Some(Node::Element(list)) = node_at_path(editor.doc(), &ctx.list_path) else {
        return None;
    };

    let mut item_path = ctx.list_path.clone();
    item_path.push(ctx.item_ix);

    if strip_zero_width(&item.plain_text()).is_empty() {
        // Exit: drop the item, drop the list too once it has no items, and
        // land the caret in a fresh paragraph.
        if list.children.len() <= 1 {
            let mut caret_path = ctx.list_path.clone();
            caret_path.push(0);
            return Some(
                Transaction::new(replace_node_ops(&ctx.list_path, Node::paragraph("")))
                    .selection_after(Selection::collapsed(Point::new(caret_path, 0))),
            );
        }

        let mut after_list = ctx.list_path.clone();
        *after_list.last_mut()? += 1;
        let mut caret_path = after_list.clone();
        caret_path.push(0);
        return Some(
            Transaction::new(vec![
                Op::RemoveNode { path: item_path },
                Op::InsertNode {
                    path: after_list,
                    node: Node::paragraph(""),
                },
            ])
            .selection_after(Selection::collapsed(Point::new(caret_path, 0))),
        );
    }

    // Continue: the new item takes the list's current counter as its
    // ordinal, and the counter moves on.
    let counter = list
        .attr_u64("counter")
        .unwrap_or(list.children.len() as u64 + 1);
    let mut set = Attrs::default();
    set.insert(
        "counter".to_string(),
        Value::Number(serde_json::Number::from(counter + 1)),
    );

    let mut new_item_path = ctx.list_path.clone();
    new_item_path.push(ctx.item_ix + 1);
    let mut caret_path = new_item_path.clone();
    caret_path.push(0);

    Some(
        Transaction::new(vec![
            Op::SetNodeAttrs {
                path: ctx.list_path.clone(),
                patch: crate::core::AttrPatch {
                    set,
                    remove: Vec::new(),
                },
            },
            Op::InsertNode {
                path: new_item_path,
                node: list_item(counter, Vec::new()),
            },
        ])
        .selection_after(Selection::collapsed(Point::new(caret_path, 0))),
    )
}

/// Backspace at the very start of an empty list item: merge into the
/// previous item, or unwrap the list entirely.
pub fn on_backspace(editor: &crate::core::Editor) -> Option<Transaction> {
    let ctx = focus_list_context(editor)?;
    let item = item_at(editor, &ctx)?;

    let at_start = caret::save(
        &item.children,
        &ctx.rel_path,
        editor.selection().focus.offset,
    ) == 0;
    if !at_start {
        return None;
    }
    if !strip_zero_width(&item.plain_text()).is_empty() {
        return None;
    }

    let mut item_path = ctx.list_path.clone();
    item_path.push(ctx.item_ix);

    if ctx.item_ix > 0 {
        let mut prev_path = ctx.list_path.clone();
        prev_path.push(ctx.item_ix - 1);
        let Some(Node::Element(prev)) = node_at_path(editor.doc(), &prev_path) else {
            return None;
        };
        let end = caret::content_len(&prev.children);
        let caret_point = point_for_global_offset(&prev_path, &prev.children, end);
        return Some(
            Transaction::new(vec![Op::RemoveNode { path: item_path }])
                .selection_after(Selection::collapsed(caret_point)),
        );
    }

    // First item: the whole list goes away.
    let list_ix = *ctx.list_path.last()?;
    if list_ix > 0 {
        let mut prev_block_path = ctx.list_path.clone();
        *prev_block_path.last_mut()? -= 1;
        if let Some(Node::Element(prev)) = node_at_path(editor.doc(), &prev_block_path) {
            let end = caret::content_len(&prev.children);
            let caret_point = point_for_global_offset(&prev_block_path, &prev.children, end);
            return Some(
                Transaction::new(vec![Op::RemoveNode {
                    path: ctx.list_path.clone(),
                }])
                .selection_after(Selection::collapsed(caret_point)),
            );
        }
    }

    // Nothing before the list: leave a paragraph in its place.
    let mut caret_path = ctx.list_path.clone();
    caret_path.push(0);
    Some(
        Transaction::new(replace_node_ops(&ctx.list_path, Node::paragraph("")))
            .selection_after(Selection::collapsed(Point::new(caret_path, 0))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_markers() {
        assert_eq!(marker(ListType::Decimal, 1), "1.");
        assert_eq!(marker(ListType::Decimal, 12), "12.");
    }

    #[test]
    fn alpha_markers_roll_over_base_26() {
        assert_eq!(marker(ListType::LowerAlpha, 1), "a.");
        assert_eq!(marker(ListType::LowerAlpha, 26), "z.");
        assert_eq!(marker(ListType::LowerAlpha, 27), "aa.");
        assert_eq!(marker(ListType::LowerAlpha, 28), "ab.");
        assert_eq!(marker(ListType::UpperAlpha, 2), "B.");
    }

    #[test]
    fn roman_markers_use_subtractive_notation() {
        assert_eq!(marker(ListType::LowerRoman, 4), "iv.");
        assert_eq!(marker(ListType::LowerRoman, 9), "ix.");
        assert_eq!(marker(ListType::LowerRoman, 14), "xiv.");
        assert_eq!(marker(ListType::LowerRoman, 40), "xl.");
    }

    #[test]
    fn bangla_markers_fall_back_past_the_consonants() {
        assert_eq!(marker(ListType::Bangla, 1), "ক.");
        assert_eq!(marker(ListType::Bangla, 32), "হ.");
        assert_eq!(marker(ListType::Bangla, 33), "(33).");
    }

    #[test]
    fn bullet_marker_is_constant() {
        assert_eq!(marker(ListType::Bullet, 1), BULLET_GLYPH);
        assert_eq!(marker(ListType::Bullet, 99), BULLET_GLYPH);
    }
}
