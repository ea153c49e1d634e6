//! Read-mode projection.
//!
//! Turns authored content into the static markup published articles use:
//! structurally equivalent, but with the editable affordances gone. Code
//! and callout widgets keep their raw payloads in attributes, so
//! rehydration (re-attaching copy handlers, re-rendering math) never has
//! to re-derive content from rendered text.

use html_escape::{encode_double_quoted_attribute, encode_text};

use plume_core::{ElementNode, Marks, Node, VoidNode, color_css, highlight_css};
use plume_widgets::{
    CalloutKind, CalloutPaint, CodeBlock, ThemeMode, callout, clipboard::COPY_LABEL,
    encode_expression, palette, render_to_string,
};

const INDENT_STEP_PX: u32 = 24;

/// The projected markup plus everything rehydration needs: the raw text
/// behind each copy control (handlers do not survive serialization) and
/// how many math spans are still waiting on the typesetter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub markup: String,
    pub copy_sources: Vec<String>,
    pub pending_math: usize,
}

pub fn project_read_mode(doc: &plume_core::Document, mode: ThemeMode) -> Projection {
    let mut projection = Projection {
        markup: String::new(),
        copy_sources: Vec::new(),
        pending_math: 0,
    };
    project_blocks(&doc.children, mode, &mut projection);
    projection
}

fn project_blocks(children: &[Node], mode: ThemeMode, out: &mut Projection) {
    for node in children {
        match node {
            Node::Element(el) => project_block_element(el, mode, out),
            Node::Void(void) => project_math(void, true, out),
            Node::Text(t) => {
                out.markup.push_str("<p>");
                out.markup.push_str(&encode_text(&t.text));
                out.markup.push_str("</p>");
            }
        }
    }
}

fn block_style(el: &ElementNode) -> String {
    let mut style = String::new();
    if let Some(indent) = el.attr_u64("indent") {
        if indent > 0 {
            style.push_str(&format!("margin-left:{}px;", indent as u32 * INDENT_STEP_PX));
        }
    }
    if let Some(align) = el.attr_str("align") {
        style.push_str(&format!("text-align:{align};"));
    }
    style
}

fn open_tag(tag: &str, class: Option<&str>, el: &ElementNode, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    if let Some(class) = class {
        out.push_str(&format!(" class=\"{class}\""));
    }
    let style = block_style(el);
    if !style.is_empty() {
        out.push_str(&format!(" style=\"{style}\""));
    }
    out.push('>');
}

fn project_block_element(el: &ElementNode, mode: ThemeMode, out: &mut Projection) {
    match el.kind.as_str() {
        "paragraph" => {
            open_tag("p", None, el, &mut out.markup);
            project_inline(&el.children, out);
            out.markup.push_str("</p>");
        }
        "heading" => {
            let level = el.attr_u64("level").unwrap_or(1).clamp(1, 4);
            let tag = format!("h{level}");
            open_tag(&tag, None, el, &mut out.markup);
            project_inline(&el.children, out);
            out.markup.push_str(&format!("</{tag}>"));
        }
        "pre_line" => {
            open_tag("div", Some("pre-line"), el, &mut out.markup);
            project_inline(&el.children, out);
            out.markup.push_str("</div>");
        }
        "blockquote" => {
            open_tag("blockquote", None, el, &mut out.markup);
            project_blocks(&el.children, mode, out);
            out.markup.push_str("</blockquote>");
        }
        "list" => project_list(el, out),
        "code_block" => {
            let language = el.attr_str("language").unwrap_or("text");
            let raw = el.plain_text();
            let block = CodeBlock::new(language, raw.clone());
            out.markup
                .push_str(&block.materialize_read(palette(mode), COPY_LABEL));
            // Handlers never survive serialization; rehydration re-binds
            // the copy action to this exact text.
            out.copy_sources.push(raw);
        }
        "callout" => project_callout(el, mode, out),
        _ => {
            out.markup.push_str("<p>");
            out.markup.push_str(&encode_text(&el.plain_text()));
            out.markup.push_str("</p>");
        }
    }
}

fn project_list(el: &ElementNode, out: &mut Projection) {
    let list_type_name = el.attr_str("list_type").unwrap_or("bullet");
    let list_type =
        plume_core::list::ListType::parse(list_type_name).unwrap_or(plume_core::list::ListType::Bullet);
    let tag = if list_type_name == "bullet" { "ul" } else { "ol" };

    out.markup.push_str(&format!(
        "<{tag} data-list-type=\"{}\"",
        encode_double_quoted_attribute(list_type_name)
    ));
    if let Some(counter) = el.attr_u64("counter") {
        out.markup.push_str(&format!(" data-counter=\"{counter}\""));
    }
    let style = block_style(el);
    if !style.is_empty() {
        out.markup.push_str(&format!(" style=\"{style}\""));
    }
    out.markup.push('>');

    for (ix, item) in el.children.iter().enumerate() {
        let Node::Element(item) = item else {
            continue;
        };
        let index = item.attr_u64("index").unwrap_or(ix as u64 + 1);
        out.markup
            .push_str(&format!("<li data-index=\"{index}\">"));
        out.markup.push_str(&format!(
            "<span class=\"list-marker\">{}</span>",
            encode_text(&plume_core::list::marker(list_type, index))
        ));
        project_inline(&item.children, out);
        out.markup.push_str("</li>");
    }
    out.markup.push_str(&format!("</{tag}>"));
}

fn project_callout(el: &ElementNode, mode: ThemeMode, out: &mut Projection) {
    let kind_name = el.attr_str("kind").unwrap_or("note");
    let kind = CalloutKind::parse(kind_name).unwrap_or(CalloutKind::Note);
    let folded = el.attr_bool("folded").unwrap_or(false);
    let paint = CalloutPaint::new(kind, mode);

    out.markup.push_str(&format!(
        "<div class=\"callout\" data-kind=\"{}\" data-folded=\"{folded}\" style=\"{}\">",
        encode_double_quoted_attribute(kind_name),
        paint.style_attr()
    ));

    out.markup.push_str("<div class=\"callout-header\">");
    out.markup.push_str(&format!(
        "<span class=\"callout-icon\">{}</span>",
        kind.icon()
    ));
    out.markup.push_str("<span class=\"callout-title\">");
    if let Some(Node::Element(title)) = el.children.first() {
        project_inline(&title.children, out);
    }
    out.markup.push_str("</span></div>");

    out.markup.push_str(&format!(
        "<div class=\"callout-body\" style=\"display:{}\">",
        callout::body_display(folded)
    ));
    if let Some(Node::Element(body)) = el.children.get(1) {
        project_blocks(&body.children, mode, out);
    }
    out.markup.push_str("</div></div>");
}

fn project_math(void: &VoidNode, block_level: bool, out: &mut Projection) {
    let expression = void
        .attrs
        .get("expression")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let display = void.kind == "math_display";
    let (tag, class) = if display {
        ("div", "math-display")
    } else {
        ("span", "math")
    };

    match void.attrs.get("markup").and_then(|v| v.as_str()) {
        Some(markup) if void.attrs.get("status").and_then(|v| v.as_str()) == Some("done") => {
            out.markup.push_str(&format!(
                "<{tag} class=\"{class}\" data-expression=\"{}\" data-display=\"{display}\" data-status=\"done\">{markup}</{tag}>",
                encode_expression(expression)
            ));
        }
        _ => {
            let rendered = render_to_string(None, expression, display);
            if block_level {
                out.markup.push_str(&format!(
                    "<div class=\"math-display\" data-expression=\"{}\" data-display=\"true\" data-status=\"pending\">{}</div>",
                    encode_expression(expression),
                    encode_text(expression)
                ));
            } else {
                out.markup.push_str(&rendered.markup);
            }
            out.pending_math += 1;
        }
    }
}

fn project_inline(children: &[Node], out: &mut Projection) {
    for node in children {
        match node {
            Node::Text(t) => project_marked_text(&t.text, &t.marks, &mut out.markup),
            Node::Void(void) => project_math(void, false, out),
            Node::Element(el) => out.markup.push_str(&encode_text(&el.plain_text())),
        }
    }
}

fn project_marked_text(text: &str, marks: &Marks, out: &mut String) {
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
        let css = color_css(color).unwrap_or("inherit");
        open.push(format!(
            "<span data-color=\"{}\" style=\"color:{css}\">",
            encode_double_quoted_attribute(color)
        ));
        close.push("</span>");
    }
    if let Some(size) = marks.font_size {
        open.push(format!(
            "<span data-font-size=\"{size}\" style=\"font-size:{size}px\">"
        ));
        close.push("</span>");
    }
    if let Some(highlight) = &marks.highlight {
        let css = highlight_css(highlight).unwrap_or("#fff3bf");
        open.push(format!(
            "<mark data-highlight=\"{}\" style=\"background-color:{css}\">",
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
