//! Keyboard dispatch.
//!
//! Key handling is a flat table keyed by (key, shift, context) mapping to
//! pure transition functions that return a transaction or decline. The
//! table is scanned in order; the first transition that produces a
//! transaction wins. A declined event falls through to the host's default
//! text editing.

use serde::{Deserialize, Serialize};

use crate::autoformat::strip_zero_width;
use crate::core::{Editor, Node, Point, Selection};
use crate::list;
use crate::ops::{Op, Transaction};
use crate::plugin::{adjust_indent, node_at_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Backspace,
    Tab,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shift(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// Where the caret currently sits, as far as key handling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContext {
    Body,
    ListItem,
    CodeBlock,
    CalloutTitle,
    CalloutBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handled: bool,
}

type Transition = fn(&Editor) -> Option<Transaction>;

struct Binding {
    key: Key,
    /// `None` matches either shift state.
    shift: Option<bool>,
    /// `None` matches every context.
    context: Option<KeyContext>,
    transition: Transition,
}

pub struct Dispatcher {
    bindings: Vec<Binding>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::authoring()
    }
}

impl Dispatcher {
    pub fn authoring() -> Self {
        let bindings = vec![
            // Code blocks keep the caret inside for plain editing keys.
            Binding {
                key: Key::Tab,
                shift: Some(false),
                context: Some(KeyContext::CodeBlock),
                transition: code_tab,
            },
            Binding {
                key: Key::Enter,
                shift: Some(false),
                context: Some(KeyContext::CodeBlock),
                transition: code_newline,
            },
            Binding {
                key: Key::Enter,
                shift: Some(true),
                context: Some(KeyContext::CodeBlock),
                transition: exit_enclosing_widget,
            },
            Binding {
                key: Key::Escape,
                shift: None,
                context: Some(KeyContext::CodeBlock),
                transition: exit_enclosing_widget,
            },
            // Callout navigation.
            Binding {
                key: Key::Enter,
                shift: Some(false),
                context: Some(KeyContext::CalloutTitle),
                transition: callout_title_enter,
            },
            Binding {
                key: Key::Enter,
                shift: Some(false),
                context: Some(KeyContext::CalloutBody),
                transition: callout_body_enter,
            },
            Binding {
                key: Key::Enter,
                shift: Some(true),
                context: Some(KeyContext::CalloutTitle),
                transition: exit_enclosing_widget,
            },
            Binding {
                key: Key::Enter,
                shift: Some(true),
                context: Some(KeyContext::CalloutBody),
                transition: exit_enclosing_widget,
            },
            Binding {
                key: Key::Escape,
                shift: None,
                context: Some(KeyContext::CalloutTitle),
                transition: exit_enclosing_widget,
            },
            Binding {
                key: Key::Escape,
                shift: None,
                context: Some(KeyContext::CalloutBody),
                transition: exit_enclosing_widget,
            },
            // List creation/continuation/exit.
            Binding {
                key: Key::Enter,
                shift: Some(false),
                context: Some(KeyContext::ListItem),
                transition: list::on_enter,
            },
            Binding {
                key: Key::Backspace,
                shift: Some(false),
                context: Some(KeyContext::ListItem),
                transition: list::on_backspace,
            },
            // Indentation applies to any top-level block.
            Binding {
                key: Key::Tab,
                shift: Some(false),
                context: None,
                transition: indent_in,
            },
            Binding {
                key: Key::Tab,
                shift: Some(true),
                context: None,
                transition: indent_out,
            },
        ];
        Self { bindings }
    }

    /// Apply the first matching transition. Mutates the editor when a
    /// transition produces a transaction.
    pub fn dispatch(&self, editor: &mut Editor, event: KeyEvent) -> DispatchOutcome {
        let context = key_context(editor);
        for binding in &self.bindings {
            if binding.key != event.key {
                continue;
            }
            if let Some(shift) = binding.shift {
                if shift != event.shift {
                    continue;
                }
            }
            if let Some(wanted) = binding.context {
                if wanted != context {
                    continue;
                }
            }
            if let Some(tx) = (binding.transition)(editor) {
                if editor.apply(tx).is_ok() {
                    return DispatchOutcome { handled: true };
                }
            }
        }
        DispatchOutcome { handled: false }
    }
}

/// The innermost ancestor of the focus that owns key handling.
pub fn key_context(editor: &Editor) -> KeyContext {
    let path = &editor.selection().focus.path;
    for depth in (1..=path.len()).rev() {
        let Some(Node::Element(el)) = node_at_path(editor.doc(), &path[..depth]) else {
            continue;
        };
        match el.kind.as_str() {
            "code_block" => return KeyContext::CodeBlock,
            "callout_title" => return KeyContext::CalloutTitle,
            "callout_body" => return KeyContext::CalloutBody,
            "list_item" => return KeyContext::ListItem,
            _ => {}
        }
    }
    KeyContext::Body
}

/// Path of the innermost ancestor element with the given kind.
fn ancestor_path(editor: &Editor, kinds: &[&str]) -> Option<Vec<usize>> {
    let path = &editor.selection().focus.path;
    for depth in (1..=path.len()).rev() {
        let Some(Node::Element(el)) = node_at_path(editor.doc(), &path[..depth]) else {
            continue;
        };
        if kinds.contains(&el.kind.as_str()) {
            return Some(path[..depth].to_vec());
        }
    }
    None
}

/// Tab inside a code block types two literal spaces.
fn code_tab(editor: &Editor) -> Option<Transaction> {
    let focus = editor.selection().focus.clone();
    Some(Transaction::new(vec![Op::InsertText {
        path: focus.path,
        offset: focus.offset,
        text: "  ".to_string(),
    }]))
}

/// Plain Enter inside a code block is an ordinary newline in the raw text.
fn code_newline(editor: &Editor) -> Option<Transaction> {
    let focus = editor.selection().focus.clone();
    Some(Transaction::new(vec![Op::InsertText {
        path: focus.path,
        offset: focus.offset,
        text: "\n".to_string(),
    }]))
}

/// Leave the enclosing widget: a fresh paragraph is inserted right after
/// it and the caret moves there.
fn exit_enclosing_widget(editor: &Editor) -> Option<Transaction> {
    let widget_path = ancestor_path(editor, &["code_block", "callout"])?;
    let mut after_path = widget_path.clone();
    *after_path.last_mut()? += 1;
    let mut caret_path = after_path.clone();
    caret_path.push(0);
    Some(
        Transaction::new(vec![Op::InsertNode {
            path: after_path,
            node: Node::paragraph(""),
        }])
        .selection_after(Selection::collapsed(Point::new(caret_path, 0))),
    )
}

/// Enter in the title never inserts a newline; it moves focus to the
/// start of the body instead.
fn callout_title_enter(editor: &Editor) -> Option<Transaction> {
    let callout_path = ancestor_path(editor, &["callout"])?;
    let Some(Node::Element(callout)) = node_at_path(editor.doc(), &callout_path) else {
        return None;
    };
    let Some(Node::Element(_body)) = callout.children.get(1) else {
        return None;
    };
    let mut caret_path = callout_path;
    caret_path.extend([1, 0, 0]);
    Some(
        Transaction::new(Vec::new())
            .selection_after(Selection::collapsed(Point::new(caret_path, 0))),
    )
}

/// Enter in an empty body exits the widget; with content it declines and
/// the host inserts a plain newline.
fn callout_body_enter(editor: &Editor) -> Option<Transaction> {
    let body_path = ancestor_path(editor, &["callout_body"])?;
    let Some(Node::Element(body)) = node_at_path(editor.doc(), &body_path) else {
        return None;
    };
    if !strip_zero_width(&body.plain_text()).is_empty() {
        return None;
    }
    exit_enclosing_widget(editor)
}

fn indent_in(editor: &Editor) -> Option<Transaction> {
    let tx = adjust_indent(editor, 1);
    Some(tx)
}

fn indent_out(editor: &Editor) -> Option<Transaction> {
    let tx = adjust_indent(editor, -1);
    Some(tx)
}
