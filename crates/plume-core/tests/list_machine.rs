use plume_core::keymap::{Dispatcher, Key, KeyEvent};
use plume_core::list::{ListType, marker};
use plume_core::{Document, Editor, Node, Op, PluginRegistry, Point, Selection, Transaction};

fn editor_with_empty_paragraph() -> Editor {
    let doc = Document {
        children: vec![Node::paragraph("")],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::authoring())
}

fn type_text(editor: &mut Editor, text: &str) {
    let focus = editor.selection().focus.clone();
    let tx = Transaction::new(vec![Op::InsertText {
        path: focus.path,
        offset: focus.offset,
        text: text.to_string(),
    }])
    .source("ime:replace_text");
    editor.apply(tx).unwrap();
}

fn list_el(editor: &Editor, ix: usize) -> &plume_core::ElementNode {
    let Node::Element(el) = &editor.doc().children[ix] else {
        panic!("expected element block");
    };
    assert_eq!(el.kind, "list");
    el
}

#[test]
fn enter_with_content_continues_the_numbering() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "1. ");
    type_text(&mut editor, "alpha");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);
    type_text(&mut editor, "beta");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);
    type_text(&mut editor, "gamma");

    let list = list_el(&editor, 0);
    assert_eq!(list.children.len(), 3);
    assert_eq!(list.attrs.get("counter").and_then(|v| v.as_u64()), Some(4));

    let texts: Vec<String> = list
        .children
        .iter()
        .map(|item| {
            let Node::Element(item) = item else {
                panic!("expected list item");
            };
            item.plain_text()
        })
        .collect();
    assert_eq!(texts, ["alpha", "beta", "gamma"]);

    let markers: Vec<String> = list
        .children
        .iter()
        .map(|item| {
            let Node::Element(item) = item else {
                panic!("expected list item");
            };
            marker(
                ListType::Decimal,
                item.attrs.get("index").and_then(|v| v.as_u64()).unwrap(),
            )
        })
        .collect();
    assert_eq!(markers, ["1.", "2.", "3."]);
}

#[test]
fn enter_on_the_only_empty_item_unwraps_the_list() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "* ");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);

    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected block");
    };
    assert_eq!(el.kind, "paragraph");
    assert_eq!(el.plain_text(), "");
    assert_eq!(editor.selection().focus.path, vec![0, 0]);
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn enter_on_a_trailing_empty_item_exits_past_the_list() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "- ");
    type_text(&mut editor, "one");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);
    // Second item left empty; Enter exits.
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);

    let list = list_el(&editor, 0);
    assert_eq!(list.children.len(), 1);

    let Node::Element(after) = &editor.doc().children[1] else {
        panic!("expected paragraph after list");
    };
    assert_eq!(after.kind, "paragraph");
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
}

#[test]
fn backspace_on_empty_item_merges_into_previous() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "1. ");
    type_text(&mut editor, "one");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);
    assert!(
        keys.dispatch(&mut editor, KeyEvent::new(Key::Backspace))
            .handled
    );

    let list = list_el(&editor, 0);
    assert_eq!(list.children.len(), 1);
    // Caret lands at the end of the previous item's content.
    assert_eq!(editor.selection().focus.path, vec![0, 0, 0]);
    assert_eq!(editor.selection().focus.offset, 3);
}

#[test]
fn backspace_on_the_first_empty_item_removes_the_list() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "* ");
    assert!(
        keys.dispatch(&mut editor, KeyEvent::new(Key::Backspace))
            .handled
    );

    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected block");
    };
    assert_eq!(el.kind, "paragraph");
}

#[test]
fn backspace_with_content_is_left_to_the_host() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "* ");
    type_text(&mut editor, "keep");
    let outcome = keys.dispatch(&mut editor, KeyEvent::new(Key::Backspace));
    assert!(!outcome.handled);

    let list = list_el(&editor, 0);
    assert_eq!(list.children.len(), 1);
}

#[test]
fn counter_never_rewinds_after_item_removal() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "1. ");
    type_text(&mut editor, "one");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);
    type_text(&mut editor, "two");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);
    // Remove the trailing empty item, then continue the list again.
    assert!(
        keys.dispatch(&mut editor, KeyEvent::new(Key::Backspace))
            .handled
    );
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);

    let list = list_el(&editor, 0);
    let last = match list.children.last() {
        Some(Node::Element(item)) => item,
        _ => panic!("expected list item"),
    };
    // The third ordinal was consumed by the removed item; the new one
    // moves on rather than reusing it.
    assert_eq!(last.attrs.get("index").and_then(|v| v.as_u64()), Some(4));
    assert_eq!(list.attrs.get("counter").and_then(|v| v.as_u64()), Some(5));
}

#[test]
fn tab_indents_every_selected_top_level_block() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "hello");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Tab)).handled);
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Tab)).handled);

    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected block");
    };
    assert_eq!(el.attrs.get("indent").and_then(|v| v.as_u64()), Some(2));

    assert!(
        keys.dispatch(&mut editor, KeyEvent::shift(Key::Tab))
            .handled
    );
    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected block");
    };
    assert_eq!(el.attrs.get("indent").and_then(|v| v.as_u64()), Some(1));
}

#[test]
fn indent_clamps_at_the_top_level_bounds() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    for _ in 0..12 {
        keys.dispatch(&mut editor, KeyEvent::new(Key::Tab));
    }
    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected block");
    };
    assert_eq!(el.attrs.get("indent").and_then(|v| v.as_u64()), Some(8));

    for _ in 0..12 {
        keys.dispatch(&mut editor, KeyEvent::shift(Key::Tab));
    }
    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected block");
    };
    assert_eq!(el.attrs.get("indent"), None);
}

#[test]
fn tab_does_not_change_list_structure() {
    let mut editor = editor_with_empty_paragraph();
    let keys = Dispatcher::authoring();

    type_text(&mut editor, "1. ");
    type_text(&mut editor, "one");
    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Tab)).handled);

    let list = list_el(&editor, 0);
    assert_eq!(list.attrs.get("indent").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(list.children.len(), 1);
    assert_eq!(
        list.attrs.get("list_type").and_then(|v| v.as_str()),
        Some("decimal")
    );
}
