use plume_core::{
    Document, Editor, Node, Op, PluginRegistry, Point, Selection, Transaction,
};
use serde_json::Value;

fn editor_with_paragraph(text: &str) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::authoring())
}

fn type_at(editor: &mut Editor, path: Vec<usize>, offset: usize, text: &str) {
    let tx = Transaction::new(vec![Op::InsertText {
        path,
        offset,
        text: text.to_string(),
    }])
    .source("ime:replace_text");
    editor.apply(tx).unwrap();
}

fn first_element(editor: &Editor) -> &plume_core::ElementNode {
    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    el
}

#[test]
fn hashes_and_space_into_heading() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "## ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "heading");
    assert_eq!(el.attrs.get("level"), Some(&Value::Number(2u64.into())));
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn heading_prefix_keeps_remaining_text() {
    let mut editor = editor_with_paragraph("hello");
    type_at(&mut editor, vec![0, 0], 0, "# ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "heading");
    assert_eq!(el.plain_text(), "hello");
    // Caret offset shrinks by the stripped prefix, clamped at zero.
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn five_hashes_stay_literal() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "##### ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "paragraph");
    assert_eq!(el.plain_text(), "##### ");
}

#[test]
fn greater_than_space_into_blockquote() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "> ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "blockquote");
    let Node::Element(inner) = &el.children[0] else {
        panic!("expected inner paragraph");
    };
    assert_eq!(inner.kind, "paragraph");
    assert_eq!(editor.selection().focus.path, vec![0, 0, 0]);
}

#[test]
fn ordered_entry_starts_counter_past_the_marker() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "1. ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "list");
    assert_eq!(
        el.attrs.get("list_type").and_then(|v| v.as_str()),
        Some("decimal")
    );
    assert_eq!(el.attrs.get("counter").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(el.children.len(), 1);
    let Node::Element(item) = &el.children[0] else {
        panic!("expected list item");
    };
    assert_eq!(item.kind, "list_item");
    assert_eq!(item.attrs.get("index").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(item.plain_text(), "");
}

#[test]
fn decimal_entry_can_start_anywhere() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "7) ");

    let el = first_element(&editor);
    assert_eq!(el.attrs.get("counter").and_then(|v| v.as_u64()), Some(8));
    let Node::Element(item) = &el.children[0] else {
        panic!("expected list item");
    };
    assert_eq!(item.attrs.get("index").and_then(|v| v.as_u64()), Some(7));
}

#[test]
fn roman_single_precedes_plain_alpha() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "i. ");

    let el = first_element(&editor);
    assert_eq!(
        el.attrs.get("list_type").and_then(|v| v.as_str()),
        Some("lower_roman")
    );

    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "c. ");
    let el = first_element(&editor);
    assert_eq!(
        el.attrs.get("list_type").and_then(|v| v.as_str()),
        Some("lower_alpha")
    );
    let Node::Element(item) = &el.children[0] else {
        panic!("expected list item");
    };
    assert_eq!(item.attrs.get("index").and_then(|v| v.as_u64()), Some(3));
}

#[test]
fn bangla_consonant_starts_a_bangla_list() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "খ. ");

    let el = first_element(&editor);
    assert_eq!(
        el.attrs.get("list_type").and_then(|v| v.as_str()),
        Some("bangla")
    );
    let Node::Element(item) = &el.children[0] else {
        panic!("expected list item");
    };
    assert_eq!(item.attrs.get("index").and_then(|v| v.as_u64()), Some(2));
}

#[test]
fn code_fence_with_language_and_focus_inside() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "```js ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "code_block");
    assert_eq!(
        el.attrs.get("language").and_then(|v| v.as_str()),
        Some("js")
    );
    assert_eq!(el.plain_text(), "");
    assert_eq!(editor.selection().focus.path, vec![0, 0]);
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn bare_code_fence_defaults_to_text() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "``` ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "code_block");
    assert_eq!(
        el.attrs.get("language").and_then(|v| v.as_str()),
        Some("text")
    );
}

#[test]
fn callout_marker_into_callout_widget() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "[!warning] ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "callout");
    assert_eq!(
        el.attrs.get("kind").and_then(|v| v.as_str()),
        Some("warning")
    );
    assert_eq!(el.attrs.get("folded").and_then(|v| v.as_bool()), Some(false));
    let Node::Element(title) = &el.children[0] else {
        panic!("expected title");
    };
    assert_eq!(title.kind, "callout_title");
    let Node::Element(body) = &el.children[1] else {
        panic!("expected body");
    };
    assert_eq!(body.kind, "callout_body");
}

#[test]
fn unknown_callout_kind_stays_a_paragraph() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "[!shrug] ");

    assert_eq!(first_element(&editor).kind, "paragraph");
}

#[test]
fn math_block_swaps_in_display_math_and_a_trailing_paragraph() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "[math]\\frac{a}{b}[/math]");

    let Node::Void(math) = &editor.doc().children[0] else {
        panic!("expected math display void");
    };
    assert_eq!(math.kind, "math_display");
    assert_eq!(
        math.attrs.get("expression").and_then(|v| v.as_str()),
        Some("\\frac{a}{b}")
    );

    let Node::Element(after) = &editor.doc().children[1] else {
        panic!("expected trailing paragraph");
    };
    assert_eq!(after.kind, "paragraph");
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
    assert_eq!(editor.selection().focus.offset, 0);
}

#[test]
fn fences_inside_a_code_block_stay_literal() {
    let mut editor = editor_with_paragraph("");
    type_at(&mut editor, vec![0, 0], 0, "```js ");
    type_at(&mut editor, vec![0, 0], 0, "```py ");

    let el = first_element(&editor);
    assert_eq!(el.kind, "code_block");
    assert_eq!(
        el.attrs.get("language").and_then(|v| v.as_str()),
        Some("js")
    );
    assert_eq!(el.plain_text(), "```py ");
}
