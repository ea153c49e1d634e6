//! Inline shorthand recognition.
//!
//! Watches text-insert transactions and rewrites completed marker pairs in
//! the text node holding the caret into styled spans. Unmatched sequences
//! are left as literal text; this is a best-effort recognizer, not a
//! validator.

use crate::core::{ElementNode, Marks, Node, Point, Selection};
use crate::ops::Transaction;
use crate::plugin::{
    PlumePlugin, TransactionTransform, element_is_text_block, node_at_path, replace_node_ops,
};

/// Inserted after every styled span so the caret has a plain-text landing
/// position. Stripped back out whenever block text is inspected.
pub const JOINER: char = '\u{200D}';

pub(crate) fn strip_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
        .collect()
}

/// Named colors the `::name::text::` shorthand accepts.
pub const TEXT_COLORS: [&str; 10] = [
    "red", "orange", "yellow", "green", "teal", "blue", "purple", "pink", "brown", "gray",
];

/// Named highlights the `==name==text==` shorthand accepts.
pub const HIGHLIGHT_COLORS: [&str; 8] = [
    "yellow", "green", "blue", "pink", "orange", "purple", "red", "gray",
];

pub const DEFAULT_HIGHLIGHT: &str = "yellow";

pub const MIN_FONT_SIZE: u32 = 1;
pub const MAX_FONT_SIZE: u32 = 999;

pub struct AutoformatPlugin;

impl PlumePlugin for AutoformatPlugin {
    fn id(&self) -> &'static str {
        "autoformat"
    }

    fn transaction_transforms(&self) -> Vec<Box<dyn TransactionTransform>> {
        vec![
            Box::new(InlineMarkTransform),
            Box::new(crate::blockformat::BlockShorthandTransform),
        ]
    }
}

/// What a recognized marker produces.
enum InlineResult {
    Styled(Marks),
    Math,
}

struct InlineMatch {
    /// Byte offset of the opening marker in the leaf text.
    start: usize,
    /// Inner text between the markers.
    inner: String,
    result: InlineResult,
}

pub(crate) struct InlineMarkTransform;

impl TransactionTransform for InlineMarkTransform {
    fn id(&self) -> &'static str {
        "autoformat.inline_marks"
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
        let leaf_ix = *leaf_ix;
        if block_path.is_empty() {
            return None;
        }

        let Node::Element(block_el) = node_at_path(&preview.doc, block_path)? else {
            return None;
        };
        if block_el.kind == "code_block" {
            return None;
        }
        if !element_is_text_block(block_el, editor.registry()) {
            return None;
        }

        let Some(Node::Text(leaf)) = block_el.children.get(leaf_ix) else {
            return None;
        };
        let caret = focus.offset.min(leaf.text.len());
        if !leaf.text.is_char_boundary(caret) {
            return None;
        }
        let typed = &leaf.text[..caret];

        let found = recognize(typed)?;

        // When the produced marks equal the leaf's marks (clearing styling
        // on already-plain text), the split leaves would immediately merge
        // back together under normalization; emit the merged leaf directly
        // so the caret has a stable home.
        let merged = matches!(&found.result, InlineResult::Styled(marks) if *marks == leaf.marks);

        let mut children: Vec<Node> = Vec::new();
        let mut caret_point = None;
        for (ix, child) in block_el.children.iter().enumerate() {
            if ix != leaf_ix {
                children.push(child.clone());
                continue;
            }

            if merged {
                let mut text = String::new();
                text.push_str(&leaf.text[..found.start]);
                text.push_str(&found.inner);
                text.push(JOINER);
                let caret_offset = text.len();
                text.push_str(&leaf.text[caret..]);
                children.push(Node::text(text, leaf.marks.clone()));
                let mut caret_path = block_path.to_vec();
                caret_path.push(children.len() - 1);
                caret_point = Some(Point::new(caret_path, caret_offset));
                continue;
            }

            let before = &leaf.text[..found.start];
            if !before.is_empty() {
                children.push(Node::text(before, leaf.marks.clone()));
            }

            match &found.result {
                InlineResult::Styled(marks) => {
                    children.push(Node::text(found.inner.clone(), marks.clone()));
                }
                InlineResult::Math => {
                    children.push(Node::math_span(found.inner.clone(), false));
                }
            }

            // Caret lands just after the joiner in the trailing leaf.
            let mut after = String::new();
            after.push(JOINER);
            after.push_str(&leaf.text[caret..]);
            children.push(Node::text(after, leaf.marks.clone()));
            let mut caret_path = block_path.to_vec();
            caret_path.push(children.len() - 1);
            caret_point = Some(Point::new(caret_path, JOINER.len_utf8()));
        }

        let caret_point = caret_point?;

        let node = Node::Element(ElementNode {
            kind: block_el.kind.clone(),
            attrs: block_el.attrs.clone(),
            children,
        });

        let mut ops = tx.ops.clone();
        ops.extend(replace_node_ops(block_path, node));

        let mut out = Transaction::new(ops);
        out.meta = tx.meta.clone();
        out.selection_after = Some(Selection::collapsed(caret_point));
        Some(out)
    }
}

/// Try every marker family against `typed`, in priority order. Returns the
/// first match; at most one transform fires per keystroke.
fn recognize(typed: &str) -> Option<InlineMatch> {
    if let Some(m) = match_pair(typed, "~~") {
        return Some(styled(m, |marks| marks.strikethrough = true));
    }
    if let Some(m) = match_pair(typed, "**") {
        return Some(styled(m, |marks| marks.bold = true));
    }
    if let Some(m) = match_pair(typed, "__") {
        return Some(styled(m, |marks| marks.underline = true));
    }
    if let Some(m) = match_single(typed, '_') {
        return Some(styled(m, |marks| marks.italic = true));
    }
    if let Some(m) = match_pair(typed, "^") {
        return Some(styled(m, |marks| marks.superscript = true));
    }
    if let Some(m) = match_single(typed, '~') {
        return Some(styled(m, |marks| marks.subscript = true));
    }
    if let Some((name, m)) = match_named(typed, "::") {
        if TEXT_COLORS.contains(&name.as_str()) {
            return Some(styled(m, |marks| marks.color = Some(name)));
        }
    }
    if let Some((digits, m)) = match_named(typed, ";;") {
        if let Ok(size) = digits.parse::<u32>() {
            if (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
                return Some(styled(m, |marks| marks.font_size = Some(size)));
            }
        }
    }
    if let Some((name, m)) = match_named(typed, "==") {
        if HIGHLIGHT_COLORS.contains(&name.as_str()) {
            return Some(styled(m, |marks| marks.highlight = Some(name)));
        }
    }
    if let Some(m) = match_pair(typed, "==") {
        return Some(styled(m, |marks| {
            marks.highlight = Some(DEFAULT_HIGHLIGHT.to_string())
        }));
    }
    if let Some(m) = match_pair(typed, "$") {
        return Some(InlineMatch {
            start: m.0,
            inner: m.1,
            result: InlineResult::Math,
        });
    }
    if let Some(m) = match_pair(typed, "!!") {
        return Some(InlineMatch {
            start: m.0,
            inner: m.1,
            result: InlineResult::Styled(Marks::default()),
        });
    }
    None
}

fn styled(m: (usize, String), apply: impl FnOnce(&mut Marks)) -> InlineMatch {
    let mut marks = Marks::default();
    apply(&mut marks);
    InlineMatch {
        start: m.0,
        inner: m.1,
        result: InlineResult::Styled(marks),
    }
}

fn inner_is_valid(inner: &str) -> bool {
    !inner.is_empty() && !inner.contains('\n')
}

/// `<delim>inner<delim>` where `typed` ends with the closing delimiter and
/// the opener appears earlier on the same line.
fn match_pair(typed: &str, delim: &str) -> Option<(usize, String)> {
    let closer = typed.len().checked_sub(delim.len())?;
    if &typed[closer..] != delim {
        return None;
    }
    let opener = typed[..closer].rfind(delim)?;
    let inner = &typed[opener + delim.len()..closer];
    if !inner_is_valid(inner) {
        return None;
    }
    Some((opener, inner.to_string()))
}

/// Single-character pair (`_x_`, `~x~`) that must not be part of the
/// doubled form: neither marker may touch another copy of the character.
fn match_single(typed: &str, delim: char) -> Option<(usize, String)> {
    let delim_len = delim.len_utf8();
    let closer = typed.len().checked_sub(delim_len)?;
    if !typed[closer..].starts_with(delim) {
        return None;
    }
    if typed[..closer].ends_with(delim) {
        return None;
    }

    let mut search_end = closer;
    loop {
        let opener = typed[..search_end].rfind(delim)?;
        let before_ok = !typed[..opener].ends_with(delim);
        let after_ok = !typed[opener + delim_len..].starts_with(delim);
        if before_ok && after_ok {
            let inner = &typed[opener + delim_len..closer];
            if !inner_is_valid(inner) {
                return None;
            }
            return Some((opener, inner.to_string()));
        }
        if opener == 0 {
            return None;
        }
        search_end = opener;
    }
}

/// `<delim>name<delim>inner<delim>` (color, font-size, named highlight).
/// The caller validates `name` against its table.
fn match_named(typed: &str, delim: &str) -> Option<(String, (usize, String))> {
    let closer = typed.len().checked_sub(delim.len())?;
    if &typed[closer..] != delim {
        return None;
    }
    let mid = typed[..closer].rfind(delim)?;
    let inner = &typed[mid + delim.len()..closer];
    if !inner_is_valid(inner) {
        return None;
    }
    let opener = typed[..mid].rfind(delim)?;
    let name = &typed[opener + delim.len()..mid];
    if name.is_empty() || name.contains('\n') || name.contains(delim) {
        return None;
    }
    Some((name.to_string(), (opener, inner.to_string())))
}

/// Fixed CSS value for a named text color. Paint-time lookup used by the
/// markup writer.
pub fn color_css(name: &str) -> Option<&'static str> {
    match name {
        "red" => Some("#e03131"),
        "orange" => Some("#e8590c"),
        "yellow" => Some("#f08c00"),
        "green" => Some("#2f9e44"),
        "teal" => Some("#099268"),
        "blue" => Some("#1971c2"),
        "purple" => Some("#6741d9"),
        "pink" => Some("#c2255c"),
        "brown" => Some("#8d6e4a"),
        "gray" => Some("#868e96"),
        _ => None,
    }
}

pub fn highlight_css(name: &str) -> Option<&'static str> {
    match name {
        "yellow" => Some("#fff3bf"),
        "green" => Some("#d3f9d8"),
        "blue" => Some("#d0ebff"),
        "pink" => Some("#ffdeeb"),
        "orange" => Some("#ffe8cc"),
        "purple" => Some("#e5dbff"),
        "red" => Some("#ffe3e3"),
        "gray" => Some("#e9ecef"),
        _ => None,
    }
}
