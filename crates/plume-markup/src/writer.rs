//! Serializing a document to the authoring markup dialect.
//!
//! The dialect is what the article API stores and what the editor is
//! rehydrated from: lists carry their type and counter, code blocks their
//! language and raw text, callouts their kind and fold flag, and math
//! spans the percent-encoded source expression. The writer is total; any
//! document the model can hold serializes.

use html_escape::{encode_double_quoted_attribute, encode_text};

use plume_core::{ElementNode, Marks, Node, VoidNode};
use plume_widgets::encode_expression;

pub fn write_document(doc: &plume_core::Document) -> String {
    let mut out = String::new();
    write_blocks(&doc.children, &mut out);
    out
}

pub(crate) fn write_blocks(children: &[Node], out: &mut String) {
    for node in children {
        match node {
            Node::Element(el) => write_block_element(el, out),
            Node::Void(void) => write_void(void, true, out),
            // A loose text leaf at block level serializes as a paragraph.
            Node::Text(t) => {
                out.push_str("<p>");
                out.push_str(&encode_text(&t.text));
                out.push_str("</p>");
            }
        }
    }
}

fn push_common_attrs(el: &ElementNode, out: &mut String) {
    if let Some(indent) = el.attr_u64("indent") {
        if indent > 0 {
            out.push_str(&format!(" data-indent=\"{indent}\""));
        }
    }
    if let Some(align) = el.attr_str("align") {
        out.push_str(&format!(
            " data-align=\"{}\"",
            encode_double_quoted_attribute(align)
        ));
    }
}

fn write_block_element(el: &ElementNode, out: &mut String) {
    match el.kind.as_str() {
        "paragraph" => {
            out.push_str("<p");
            push_common_attrs(el, out);
            out.push('>');
            write_inline(&el.children, out);
            out.push_str("</p>");
        }
        "heading" => {
            let level = el.attr_u64("level").unwrap_or(1).clamp(1, 4);
            out.push_str(&format!("<h{level}"));
            push_common_attrs(el, out);
            out.push('>');
            write_inline(&el.children, out);
            out.push_str(&format!("</h{level}>"));
        }
        "pre_line" => {
            out.push_str("<div class=\"pre-line\"");
            push_common_attrs(el, out);
            out.push('>');
            write_inline(&el.children, out);
            out.push_str("</div>");
        }
        "blockquote" => {
            out.push_str("<blockquote");
            push_common_attrs(el, out);
            out.push('>');
            write_blocks(&el.children, out);
            out.push_str("</blockquote>");
        }
        "list" => {
            let list_type = el.attr_str("list_type").unwrap_or("bullet");
            let tag = if list_type == "bullet" { "ul" } else { "ol" };
            out.push_str(&format!(
                "<{tag} data-list-type=\"{}\"",
                encode_double_quoted_attribute(list_type)
            ));
            if let Some(counter) = el.attr_u64("counter") {
                out.push_str(&format!(" data-counter=\"{counter}\""));
            }
            push_common_attrs(el, out);
            out.push('>');
            for item in &el.children {
                let Node::Element(item) = item else {
                    continue;
                };
                out.push_str("<li");
                if let Some(index) = item.attr_u64("index") {
                    out.push_str(&format!(" data-index=\"{index}\""));
                }
                out.push('>');
                write_inline(&item.children, out);
                out.push_str("</li>");
            }
            out.push_str(&format!("</{tag}>"));
        }
        "code_block" => {
            let language = el.attr_str("language").unwrap_or("text");
            let raw = el.plain_text();
            out.push_str(&format!(
                "<div class=\"code-block\" data-language=\"{}\" data-raw=\"{}\"",
                encode_double_quoted_attribute(language),
                encode_double_quoted_attribute(&raw)
            ));
            if el.attr_bool("processed") == Some(true) {
                out.push_str(" data-processed=\"true\"");
            }
            push_common_attrs(el, out);
            out.push_str("><pre>");
            out.push_str(&encode_text(&raw));
            out.push_str("</pre></div>");
        }
        "callout" => {
            let kind = el.attr_str("kind").unwrap_or("note");
            let folded = el.attr_bool("folded").unwrap_or(false);
            out.push_str(&format!(
                "<div class=\"callout\" data-kind=\"{}\" data-folded=\"{folded}\"",
                encode_double_quoted_attribute(kind)
            ));
            push_common_attrs(el, out);
            out.push('>');
            for child in &el.children {
                let Node::Element(child) = child else {
                    continue;
                };
                match child.kind.as_str() {
                    "callout_title" => {
                        out.push_str("<div class=\"callout-title\">");
                        write_inline(&child.children, out);
                        out.push_str("</div>");
                    }
                    "callout_body" => {
                        out.push_str("<div class=\"callout-body\">");
                        write_blocks(&child.children, out);
                        out.push_str("</div>");
                    }
                    _ => {}
                }
            }
            out.push_str("</div>");
        }
        // Unknown blocks serialize their text content so nothing is lost.
        _ => {
            out.push_str("<p>");
            write_inline(&el.children, out);
            out.push_str("</p>");
        }
    }
}

fn write_void(void: &VoidNode, block_level: bool, out: &mut String) {
    match void.kind.as_str() {
        "math" | "math_display" => {
            let expression = void
                .attrs
                .get("expression")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let status = void
                .attrs
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("pending");
            let display = void.kind == "math_display";
            let (tag, class) = if display {
                ("div", "math-display")
            } else {
                ("span", "math")
            };
            out.push_str(&format!(
                "<{tag} class=\"{class}\" data-expression=\"{}\" data-display=\"{display}\" data-status=\"{status}\">",
                encode_expression(expression)
            ));
            match void.attrs.get("markup").and_then(|v| v.as_str()) {
                // Typeset markup is emitted as-is; the expression attr is
                // the recoverable source of truth.
                Some(markup) => out.push_str(markup),
                None => out.push_str(&encode_text(expression)),
            }
            out.push_str(&format!("</{tag}>"));
        }
        _ => {
            if block_level {
                out.push_str("<p></p>");
            }
        }
    }
}

pub(crate) fn write_inline(children: &[Node], out: &mut String) {
    for node in children {
        match node {
            Node::Text(t) => write_marked_text(&t.text, &t.marks, out),
            Node::Void(void) => write_void(void, false, out),
            // Nested elements do not occur in inline position; recover by
            // flattening to text.
            Node::Element(el) => out.push_str(&encode_text(&el.plain_text())),
        }
    }
}

fn write_marked_text(text: &str, marks: &Marks, out: &mut String) {
    let mut open: Vec<String> = Vec::new();
    let mut close: Vec<&'static str> = Vec::new();

    if marks.bold {
        open.push("<strong>".to_string());
        close.push("</strong>");
    }
    if marks.italic {
        open.push("<em>".to_string());
        close.push("</em>");
    }
    if marks.underline {
        open.push("<u>".to_string());
        close.push("</u>");
    }
    if marks.strikethrough {
        open.push("<s>".to_string());
        close.push("</s>");
    }
    if marks.superscript {
        open.push("<sup>".to_string());
        close.push("</sup>");
    }
    if marks.subscript {
        open.push("<sub>".to_string());
        close.push("</sub>");
    }
    if let Some(color) = &marks.color {
        open.push(format!(
            "<span data-color=\"{}\">",
            encode_double_quoted_attribute(color)
        ));
        close.push("</span>");
    }
    if let Some(size) = marks.font_size {
        open.push(format!("<span data-font-size=\"{size}\">"));
        close.push("</span>");
    }
    if let Some(highlight) = &marks.highlight {
        open.push(format!(
            "<mark data-highlight=\"{}\">",
            encode_double_quoted_attribute(highlight)
        ));
        close.push("</mark>");
    }

    for tag in &open {
        out.push_str(tag);
    }
    out.push_str(&encode_text(text));
    for tag in close.iter().rev() {
        out.push_str(tag);
    }
}
