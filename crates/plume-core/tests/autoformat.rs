use plume_core::{
    Document, Editor, JOINER, Marks, Node, Op, PluginRegistry, Point, Selection, Transaction,
};

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

fn block_children(editor: &Editor) -> &[Node] {
    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    &el.children
}

fn styled_leaf(editor: &Editor, ix: usize) -> (&str, &Marks) {
    let Node::Text(t) = &block_children(editor)[ix] else {
        panic!("expected text leaf at {ix}");
    };
    (&t.text, &t.marks)
}

#[test]
fn double_star_into_bold_span() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "**hello**");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "hello");
    assert!(marks.bold);

    // Caret sits just after the joiner in the trailing plain leaf.
    let (after, after_marks) = styled_leaf(&editor, 1);
    assert!(after.starts_with(JOINER));
    assert!(after_marks.is_plain());
    assert_eq!(editor.selection().focus.path, vec![0, 1]);
    assert_eq!(editor.selection().focus.offset, JOINER.len_utf8());
}

#[test]
fn typing_after_a_bold_span_stays_plain() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "**hi**");
    type_text(&mut editor, " there");

    let (after, marks) = styled_leaf(&editor, 1);
    assert_eq!(after.trim_start_matches(JOINER), " there");
    assert!(marks.is_plain());
}

#[test]
fn tildes_into_strikethrough_not_subscript() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "~~gone~~");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "gone");
    assert!(marks.strikethrough);
    assert!(!marks.subscript);
}

#[test]
fn single_tilde_into_subscript() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "H~2~");

    let (text, marks) = styled_leaf(&editor, 1);
    assert_eq!(text, "2");
    assert!(marks.subscript);
}

#[test]
fn double_underscore_into_underline_not_italic() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "__title__");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "title");
    assert!(marks.underline);
    assert!(!marks.italic);
}

#[test]
fn single_underscore_into_italic() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "so _very_");

    let (text, marks) = styled_leaf(&editor, 1);
    assert_eq!(text, "very");
    assert!(marks.italic);
}

#[test]
fn caret_into_superscript() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "x^2^");

    let (text, marks) = styled_leaf(&editor, 1);
    assert_eq!(text, "2");
    assert!(marks.superscript);
}

#[test]
fn named_color_from_the_fixed_table() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "::red::hot::");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "hot");
    assert_eq!(marks.color.as_deref(), Some("red"));
}

#[test]
fn unknown_color_name_stays_literal() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "::crimson::x::");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "::crimson::x::");
    assert!(marks.is_plain());
    assert_eq!(block_children(&editor).len(), 1);
}

#[test]
fn font_size_in_pixels() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, ";;24;;big;;");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "big");
    assert_eq!(marks.font_size, Some(24));
}

#[test]
fn font_size_out_of_range_stays_literal() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, ";;1000;;big;;");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, ";;1000;;big;;");
    assert!(marks.is_plain());
}

#[test]
fn default_highlight() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "==mark==");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "mark");
    assert_eq!(marks.highlight.as_deref(), Some("yellow"));
}

#[test]
fn named_highlight() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "==green==mark==");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "mark");
    assert_eq!(marks.highlight.as_deref(), Some("green"));
}

#[test]
fn dollar_pair_into_inline_math_span() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "$E=mc^2$");

    let Node::Void(math) = &block_children(&editor)[0] else {
        panic!("expected math void");
    };
    assert_eq!(math.kind, "math");
    assert_eq!(
        math.attrs.get("expression").and_then(|v| v.as_str()),
        Some("E=mc^2")
    );
    assert_eq!(
        math.attrs.get("status").and_then(|v| v.as_str()),
        Some("pending")
    );
}

#[test]
fn bang_pair_clears_styling() {
    let doc = Document {
        children: vec![Node::Element(plume_core::ElementNode {
            kind: "paragraph".to_string(),
            attrs: Default::default(),
            children: vec![Node::text(
                "",
                Marks {
                    bold: true,
                    ..Marks::default()
                },
            )],
        })],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    let mut editor = Editor::new(doc, selection, PluginRegistry::authoring());
    type_text(&mut editor, "!!plain!!");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "plain");
    assert!(marks.is_plain());
}

#[test]
fn marker_with_newline_between_does_not_fire() {
    let mut editor = editor_with_empty_paragraph();
    type_text(&mut editor, "**a\nb**");

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "**a\nb**");
    assert!(marks.is_plain());
}

#[test]
fn transform_does_not_run_for_marked_text_updates() {
    let mut editor = editor_with_empty_paragraph();
    let tx = Transaction::new(vec![Op::InsertText {
        path: vec![0, 0],
        offset: 0,
        text: "**x**".to_string(),
    }])
    .source("ime:replace_and_mark_text");
    editor.apply(tx).unwrap();

    let (text, marks) = styled_leaf(&editor, 0);
    assert_eq!(text, "**x**");
    assert!(marks.is_plain());
}
