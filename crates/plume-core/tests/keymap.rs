use plume_core::keymap::{Dispatcher, Key, KeyContext, KeyEvent, key_context};
use plume_core::{
    Document, Editor, Node, Op, PluginRegistry, Point, Selection, Transaction, callout_node,
};

fn editor_with(doc: Document, focus: Point) -> Editor {
    let selection = Selection::collapsed(focus);
    Editor::new(doc, selection, PluginRegistry::authoring())
}

fn editor_with_code_block(raw: &str) -> Editor {
    let mut attrs = plume_core::Attrs::default();
    attrs.insert(
        "language".to_string(),
        serde_json::Value::String("js".to_string()),
    );
    let doc = Document {
        children: vec![Node::Element(plume_core::ElementNode {
            kind: "code_block".to_string(),
            attrs,
            children: vec![Node::text(raw, plume_core::Marks::default())],
        })],
    };
    editor_with(doc, Point::new(vec![0, 0], raw.len()))
}

fn editor_with_callout(title: &str, body_text: &str) -> Editor {
    let doc = Document {
        children: vec![callout_node(
            "info",
            title,
            vec![Node::paragraph(body_text)],
        )],
    };
    editor_with(doc, Point::new(vec![0, 0, 0], title.len()))
}

#[test]
fn context_tracks_the_innermost_ancestor() {
    let editor = editor_with_code_block("x");
    assert_eq!(key_context(&editor), KeyContext::CodeBlock);

    let editor = editor_with_callout("t", "b");
    assert_eq!(key_context(&editor), KeyContext::CalloutTitle);
}

#[test]
fn tab_in_code_inserts_two_spaces() {
    let mut editor = editor_with_code_block("let x = 1;");
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Tab)).handled);

    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected code block");
    };
    assert_eq!(el.plain_text(), "let x = 1;  ");
}

#[test]
fn plain_enter_in_code_is_a_newline() {
    let mut editor = editor_with_code_block("line");
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);

    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected code block");
    };
    assert_eq!(el.plain_text(), "line\n");
    assert_eq!(el.kind, "code_block");
}

#[test]
fn escape_exits_the_code_block() {
    let mut editor = editor_with_code_block("done");
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Escape)).handled);

    let Node::Element(after) = &editor.doc().children[1] else {
        panic!("expected trailing paragraph");
    };
    assert_eq!(after.kind, "paragraph");
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn shift_enter_exits_the_code_block() {
    let mut editor = editor_with_code_block("done");
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::shift(Key::Enter)).handled);

    let Node::Element(after) = &editor.doc().children[1] else {
        panic!("expected trailing paragraph");
    };
    assert_eq!(after.kind, "paragraph");
    // The code block itself is untouched.
    let Node::Element(code) = &editor.doc().children[0] else {
        panic!("expected code block");
    };
    assert_eq!(code.plain_text(), "done");
}

#[test]
fn enter_in_callout_title_moves_to_body_start() {
    let mut editor = editor_with_callout("heads up", "body");
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);

    // No newline entered the title.
    let Node::Element(callout) = &editor.doc().children[0] else {
        panic!("expected callout");
    };
    let Node::Element(title) = &callout.children[0] else {
        panic!("expected title");
    };
    assert_eq!(title.plain_text(), "heads up");

    assert_eq!(key_context(&editor), KeyContext::CalloutBody);
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn enter_in_non_empty_body_passes_through() {
    let mut editor = editor_with_callout("t", "content");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 7)));
    let keys = Dispatcher::authoring();

    let outcome = keys.dispatch(&mut editor, KeyEvent::new(Key::Enter));
    assert!(!outcome.handled);
}

#[test]
fn enter_in_empty_body_exits_the_callout() {
    let mut editor = editor_with_callout("t", "");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 0)));
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Enter)).handled);

    let Node::Element(after) = &editor.doc().children[1] else {
        panic!("expected trailing paragraph");
    };
    assert_eq!(after.kind, "paragraph");
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
}

#[test]
fn shift_enter_always_exits_the_callout() {
    let mut editor = editor_with_callout("t", "full body");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0, 0], 4)));
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::shift(Key::Enter)).handled);

    let Node::Element(after) = &editor.doc().children[1] else {
        panic!("expected trailing paragraph");
    };
    assert_eq!(after.kind, "paragraph");

    // Body content survives the exit.
    let Node::Element(callout) = &editor.doc().children[0] else {
        panic!("expected callout");
    };
    let Node::Element(body) = &callout.children[1] else {
        panic!("expected body");
    };
    assert_eq!(body.plain_text(), "full body");
}

#[test]
fn escape_exits_from_the_title_too() {
    let mut editor = editor_with_callout("t", "b");
    let keys = Dispatcher::authoring();

    assert!(keys.dispatch(&mut editor, KeyEvent::new(Key::Escape)).handled);
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
}

#[test]
fn keys_without_bindings_fall_through() {
    let doc = Document {
        children: vec![Node::paragraph("plain")],
    };
    let mut editor = editor_with(doc, Point::new(vec![0, 0], 5));
    let keys = Dispatcher::authoring();

    let outcome = keys.dispatch(&mut editor, KeyEvent::new(Key::Enter));
    assert!(!outcome.handled);
    let outcome = keys.dispatch(&mut editor, KeyEvent::new(Key::Backspace));
    assert!(!outcome.handled);

    // The transaction log should not have advanced.
    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(el.plain_text(), "plain");
}

#[test]
fn revision_bumps_only_when_handled() {
    let mut editor = editor_with_code_block("x");
    let keys = Dispatcher::authoring();
    let before = editor.revision();

    keys.dispatch(&mut editor, KeyEvent::new(Key::Tab));
    assert_eq!(editor.revision(), before + 1);

    keys.dispatch(&mut editor, KeyEvent::new(Key::Backspace));
    assert_eq!(editor.revision(), before + 1);
}
