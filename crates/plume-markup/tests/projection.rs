use plume_core::{Attrs, Document, ElementNode, Marks, Node};
use plume_markup::{parse_document, project_read_mode, write_document};
use plume_widgets::ThemeMode;
use pretty_assertions::assert_eq;
use serde_json::Value;

fn code_doc(language: &str, raw: &str) -> Document {
    let mut attrs = Attrs::default();
    attrs.insert(
        "language".to_string(),
        Value::String(language.to_string()),
    );
    Document {
        children: vec![Node::Element(ElementNode {
            kind: "code_block".to_string(),
            attrs,
            children: vec![Node::text(raw, Marks::default())],
        })],
    }
}

#[test]
fn projected_code_loses_the_overlay_but_keeps_the_raw_text() {
    let raw = "const x = \"<div>\";\nexport default x;";
    let projection = project_read_mode(&code_doc("js", raw), ThemeMode::Light);

    assert!(projection.markup.contains("data-processed=\"true\""));
    assert!(!projection.markup.contains("textarea"));
    assert_eq!(projection.copy_sources, vec![raw.to_string()]);
}

#[test]
fn projected_raw_text_is_recoverable_exactly() {
    let raw = "fn main() {\n    println!(\"100% < done >\");\n}";
    let projection = project_read_mode(&code_doc("rust", raw), ThemeMode::Dark);

    let parsed = parse_document(&projection.markup).expect("parse projection");
    let Node::Element(code) = &parsed.children[0] else {
        panic!("expected code block");
    };
    assert_eq!(code.kind, "code_block");
    assert_eq!(code.plain_text(), raw);
    assert_eq!(code.attr_bool("processed"), Some(true));
}

#[test]
fn reprojecting_a_parsed_projection_is_stable() {
    let doc = Document {
        children: vec![
            Node::paragraph("intro"),
            code_doc("js", "let a = 1;").children[0].clone(),
            plume_core::callout_node("tip", "remember", vec![Node::paragraph("the body")]),
            Node::Element(ElementNode {
                kind: "list".to_string(),
                attrs: {
                    let mut attrs = Attrs::default();
                    attrs.insert(
                        "list_type".to_string(),
                        Value::String("lower_roman".to_string()),
                    );
                    attrs.insert("counter".to_string(), Value::Number(3u64.into()));
                    attrs
                },
                children: vec![
                    Node::Element(ElementNode {
                        kind: "list_item".to_string(),
                        attrs: {
                            let mut attrs = Attrs::default();
                            attrs.insert("index".to_string(), Value::Number(1u64.into()));
                            attrs
                        },
                        children: vec![Node::text("first", Marks::default())],
                    }),
                    Node::Element(ElementNode {
                        kind: "list_item".to_string(),
                        attrs: {
                            let mut attrs = Attrs::default();
                            attrs.insert("index".to_string(), Value::Number(2u64.into()));
                            attrs
                        },
                        children: vec![Node::text("second", Marks::default())],
                    }),
                ],
            }),
            Node::Element(ElementNode {
                kind: "paragraph".to_string(),
                attrs: Attrs::default(),
                children: vec![
                    Node::text("see ", Marks::default()),
                    Node::math_span("x^2", false),
                ],
            }),
        ],
    };

    let first = project_read_mode(&doc, ThemeMode::Light);
    let reparsed = parse_document(&first.markup).expect("parse projection");
    let second = project_read_mode(&reparsed, ThemeMode::Light);

    assert_eq!(second.markup, first.markup);
    assert_eq!(second.copy_sources, first.copy_sources);
    assert_eq!(second.pending_math, first.pending_math);
}

#[test]
fn list_markers_render_per_type() {
    let projection = {
        let mut attrs = Attrs::default();
        attrs.insert(
            "list_type".to_string(),
            Value::String("lower_roman".to_string()),
        );
        let doc = Document {
            children: vec![Node::Element(ElementNode {
                kind: "list".to_string(),
                attrs,
                children: (1..=4)
                    .map(|n| {
                        Node::Element(ElementNode {
                            kind: "list_item".to_string(),
                            attrs: {
                                let mut attrs = Attrs::default();
                                attrs.insert("index".to_string(), Value::Number(n.into()));
                                attrs
                            },
                            children: vec![Node::text("x", Marks::default())],
                        })
                    })
                    .collect(),
            })],
        };
        project_read_mode(&doc, ThemeMode::Light)
    };

    for marker in ["i.", "ii.", "iii.", "iv."] {
        assert!(
            projection
                .markup
                .contains(&format!("<span class=\"list-marker\">{marker}</span>")),
            "missing marker {marker}"
        );
    }
}

#[test]
fn folded_callout_body_is_hidden_not_dropped() {
    let mut callout = plume_core::callout_node("note", "t", vec![Node::paragraph("kept")]);
    if let Node::Element(el) = &mut callout {
        el.attrs
            .insert("folded".to_string(), Value::Bool(true));
    }
    let doc = Document {
        children: vec![callout],
    };

    let projection = project_read_mode(&doc, ThemeMode::Light);
    assert!(projection.markup.contains("display:none"));
    assert!(projection.markup.contains("kept"));
}

#[test]
fn pending_math_is_counted_for_rehydration() {
    let doc = Document {
        children: vec![
            Node::Element(ElementNode {
                kind: "paragraph".to_string(),
                attrs: Attrs::default(),
                children: vec![Node::math_span("a", false), Node::math_span("b", false)],
            }),
            Node::math_span("c", true),
        ],
    };

    let projection = project_read_mode(&doc, ThemeMode::Light);
    assert_eq!(projection.pending_math, 3);
    assert!(projection.markup.contains("math-pending"));
}

#[test]
fn rendered_math_markup_is_emitted_as_is() {
    let mut span = Node::math_span("x", false);
    if let Node::Void(void) = &mut span {
        void.attrs.insert(
            "status".to_string(),
            Value::String("done".to_string()),
        );
        void.attrs.insert(
            "markup".to_string(),
            Value::String("<mi>x</mi>".to_string()),
        );
    }
    let doc = Document {
        children: vec![Node::Element(ElementNode {
            kind: "paragraph".to_string(),
            attrs: Attrs::default(),
            children: vec![span],
        })],
    };

    let projection = project_read_mode(&doc, ThemeMode::Light);
    assert_eq!(projection.pending_math, 0);
    assert!(projection.markup.contains("<mi>x</mi>"));
    assert!(projection.markup.contains("data-status=\"done\""));
}

#[test]
fn authoring_markup_differs_from_projection_for_widgets() {
    let doc = code_doc("js", "x");
    let authoring = write_document(&doc);
    let projection = project_read_mode(&doc, ThemeMode::Light);

    assert!(authoring.contains("<pre>"));
    assert!(!authoring.contains("data-processed"));
    assert!(projection.markup.contains("data-processed=\"true\""));
}
