//! Parsing the authoring markup dialect back into a document.
//!
//! The parser accepts everything the writer emits plus the read-mode
//! projection of it (the processed code widget markup round-trips through
//! its `data-raw` attribute, never by scraping rendered spans). Malformed
//! input surfaces as a typed error; nothing here panics.

use html_escape::decode_html_entities;
use serde_json::Value;
use thiserror::Error;

use plume_core::{Attrs, Document, ElementNode, Marks, Node, VoidNode};
use plume_widgets::decode_expression;

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("malformed tag at byte {0}")]
    MalformedTag(usize),
    #[error("unexpected end of input inside <{0}>")]
    UnexpectedEof(String),
    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),
    #[error("unsupported tag <{0}>")]
    UnsupportedTag(String),
}

pub fn parse_document(input: &str) -> Result<Document, MarkupError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, ix: 0 };
    let children = parser.parse_blocks(None)?;
    tracing::debug!(blocks = children.len(), "parsed authoring markup");
    Ok(Document { children })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, MarkupError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < input.len() {
        if bytes[i] != b'<' {
            let end = input[i..]
                .find('<')
                .map(|pos| i + pos)
                .unwrap_or(input.len());
            tokens.push(Token::Text(
                decode_html_entities(&input[i..end]).into_owned(),
            ));
            i = end;
            continue;
        }

        // Attribute values may carry raw `<`/`>` (code text travels in
        // data-raw), so the tag ends at the first `>` outside quotes.
        let close = tag_end(input, i).ok_or(MarkupError::MalformedTag(i))?;
        let inner = &input[i + 1..close];

        if let Some(name) = inner.strip_prefix('/') {
            let name = name.trim();
            if name.is_empty() || !name.chars().all(is_name_char) {
                return Err(MarkupError::MalformedTag(i));
            }
            tokens.push(Token::Close {
                name: name.to_ascii_lowercase(),
            });
            i = close + 1;
            continue;
        }

        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(rest) => (rest, true),
            None => (inner, false),
        };

        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_end];
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(MarkupError::MalformedTag(i));
        }

        let attrs = parse_attrs(&inner[name_end..], i)?;
        tokens.push(Token::Open {
            name: name.to_ascii_lowercase(),
            attrs,
            self_closing,
        });
        i = close + 1;
    }

    Ok(tokens)
}

fn tag_end(input: &str, open_at: usize) -> Option<usize> {
    let mut in_quotes = false;
    for (ix, c) in input[open_at..].char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '>' if !in_quotes => return Some(open_at + ix),
            _ => {}
        }
    }
    None
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

fn parse_attrs(mut rest: &str, tag_at: usize) -> Result<Vec<(String, String)>, MarkupError> {
    let mut attrs = Vec::new();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(attrs);
        }

        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        if name.is_empty() || !name.chars().all(|c| is_name_char(c) || c == '_') {
            return Err(MarkupError::MalformedTag(tag_at));
        }
        rest = rest[name_end..].trim_start();

        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let Some(body) = after_eq.strip_prefix('"') else {
                return Err(MarkupError::MalformedTag(tag_at));
            };
            let Some(end) = body.find('"') else {
                return Err(MarkupError::MalformedTag(tag_at));
            };
            attrs.push((
                name.to_ascii_lowercase(),
                decode_html_entities(&body[..end]).into_owned(),
            ));
            rest = &body[end + 1..];
        } else {
            attrs.push((name.to_ascii_lowercase(), String::new()));
        }
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn class_of(attrs: &[(String, String)]) -> &str {
    attr(attrs, "class").unwrap_or("")
}

fn has_class(attrs: &[(String, String)], class: &str) -> bool {
    class_of(attrs).split_whitespace().any(|c| c == class)
}

struct Parser {
    tokens: Vec<Token>,
    ix: usize,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.ix).cloned();
        if token.is_some() {
            self.ix += 1;
        }
        token
    }

    fn parse_blocks(&mut self, closing: Option<&str>) -> Result<Vec<Node>, MarkupError> {
        let mut blocks = Vec::new();

        loop {
            let Some(token) = self.next() else {
                return match closing {
                    None => Ok(blocks),
                    Some(tag) => Err(MarkupError::UnexpectedEof(tag.to_string())),
                };
            };

            match token {
                Token::Text(text) => {
                    if !text.trim().is_empty() {
                        blocks.push(Node::paragraph(text));
                    }
                }
                Token::Close { name } => {
                    if closing == Some(name.as_str()) {
                        return Ok(blocks);
                    }
                    return Err(MarkupError::UnexpectedClose(name));
                }
                Token::Open {
                    name,
                    attrs,
                    self_closing,
                } => {
                    blocks.push(self.parse_block(&name, &attrs, self_closing)?);
                }
            }
        }
    }

    fn parse_block(
        &mut self,
        name: &str,
        attrs: &[(String, String)],
        self_closing: bool,
    ) -> Result<Node, MarkupError> {
        match name {
            "p" => {
                let children = if self_closing {
                    vec![Node::text("", Marks::default())]
                } else {
                    self.parse_inline_until("p")?
                };
                Ok(element("paragraph", common_attrs(attrs), children))
            }
            "h1" | "h2" | "h3" | "h4" => {
                let level = name[1..].parse::<u64>().unwrap_or(1);
                let mut out = common_attrs(attrs);
                out.insert("level".to_string(), Value::Number(level.into()));
                let children = self.parse_inline_until(name)?;
                Ok(element("heading", out, children))
            }
            "blockquote" => {
                let children = self.parse_blocks(Some("blockquote"))?;
                Ok(element("blockquote", common_attrs(attrs), children))
            }
            "ul" | "ol" => self.parse_list(name, attrs),
            "span" if has_class(attrs, "math") => {
                // A math span sitting at block level gets its own paragraph.
                let void = self.parse_math(attrs, "span", false)?;
                Ok(element(
                    "paragraph",
                    Attrs::default(),
                    vec![void, Node::text("", Marks::default())],
                ))
            }
            "div" => {
                if has_class(attrs, "pre-line") {
                    let children = self.parse_inline_until("div")?;
                    return Ok(element("pre_line", common_attrs(attrs), children));
                }
                if has_class(attrs, "code-block") {
                    return self.parse_code_block(attrs);
                }
                if has_class(attrs, "callout") {
                    return self.parse_callout(attrs);
                }
                if has_class(attrs, "math-display") {
                    return self.parse_math(attrs, "div", true);
                }
                Err(MarkupError::UnsupportedTag(format!(
                    "div class=\"{}\"",
                    class_of(attrs)
                )))
            }
            other => Err(MarkupError::UnsupportedTag(other.to_string())),
        }
    }

    fn parse_list(
        &mut self,
        tag: &str,
        attrs: &[(String, String)],
    ) -> Result<Node, MarkupError> {
        let list_type = attr(attrs, "data-list-type")
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                if tag == "ul" { "bullet" } else { "decimal" }.to_string()
            });

        let mut list_attrs = common_attrs(attrs);
        list_attrs.insert("list_type".to_string(), Value::String(list_type));
        if let Some(counter) = attr(attrs, "data-counter").and_then(|v| v.parse::<u64>().ok()) {
            list_attrs.insert("counter".to_string(), Value::Number(counter.into()));
        }

        let mut items = Vec::new();
        loop {
            let Some(token) = self.next() else {
                return Err(MarkupError::UnexpectedEof(tag.to_string()));
            };
            match token {
                Token::Text(text) if text.trim().is_empty() => {}
                Token::Text(_) => return Err(MarkupError::UnsupportedTag("text in list".into())),
                Token::Close { name } if name == tag => break,
                Token::Close { name } => return Err(MarkupError::UnexpectedClose(name)),
                Token::Open { name, attrs, .. } if name == "li" => {
                    let mut item_attrs = Attrs::default();
                    if let Some(index) =
                        attr(&attrs, "data-index").and_then(|v| v.parse::<u64>().ok())
                    {
                        item_attrs.insert("index".to_string(), Value::Number(index.into()));
                    }
                    let children = self.parse_inline_until("li")?;
                    items.push(element("list_item", item_attrs, children));
                }
                Token::Open { name, .. } => return Err(MarkupError::UnsupportedTag(name)),
            }
        }

        Ok(element("list", list_attrs, items))
    }

    fn parse_code_block(&mut self, attrs: &[(String, String)]) -> Result<Node, MarkupError> {
        let language = attr(attrs, "data-language").unwrap_or("text").to_string();
        let from_attr = attr(attrs, "data-raw").map(|s| s.to_string());
        let processed = attr(attrs, "data-processed") == Some("true");

        // The subtree may be the simple <pre> form or the whole processed
        // widget; either way the raw text attribute wins, with the first
        // <pre> text as the fallback for hand-authored input.
        let pre_text = self.skip_div_capturing_pre()?;
        let raw = from_attr.or(pre_text).unwrap_or_default();

        let mut out = common_attrs(attrs);
        out.insert("language".to_string(), Value::String(language));
        if processed {
            out.insert("processed".to_string(), Value::Bool(true));
        }
        Ok(element("code_block", out, vec![Node::text(raw, Marks::default())]))
    }

    /// Consume the rest of a `<div>` subtree, returning the text found
    /// inside its first `<pre>` if any.
    fn skip_div_capturing_pre(&mut self) -> Result<Option<String>, MarkupError> {
        let mut div_depth = 1usize;
        let mut pre_depth = 0usize;
        let mut captured: Option<String> = None;

        loop {
            let Some(token) = self.next() else {
                return Err(MarkupError::UnexpectedEof("div".to_string()));
            };
            match token {
                Token::Open {
                    name, self_closing, ..
                } => {
                    if self_closing {
                        continue;
                    }
                    if name == "div" {
                        div_depth += 1;
                    } else if name == "pre" {
                        pre_depth += 1;
                    }
                }
                Token::Close { name } => {
                    if name == "div" {
                        div_depth -= 1;
                        if div_depth == 0 {
                            return Ok(captured);
                        }
                    } else if name == "pre" {
                        pre_depth = pre_depth.saturating_sub(1);
                    }
                }
                Token::Text(text) => {
                    if pre_depth > 0 && captured.is_none() {
                        captured = Some(text);
                    } else if pre_depth > 0 {
                        if let Some(buf) = captured.as_mut() {
                            buf.push_str(&text);
                        }
                    }
                }
            }
        }
    }

    fn parse_callout(&mut self, attrs: &[(String, String)]) -> Result<Node, MarkupError> {
        let kind = attr(attrs, "data-kind").unwrap_or("note").to_string();
        let folded = attr(attrs, "data-folded") == Some("true");

        let mut title: Vec<Node> = Vec::new();
        let mut body: Vec<Node> = Vec::new();

        loop {
            let Some(token) = self.next() else {
                return Err(MarkupError::UnexpectedEof("div".to_string()));
            };
            match token {
                Token::Text(text) if text.trim().is_empty() => {}
                Token::Close { name } if name == "div" => break,
                Token::Open { name, attrs, .. } if name == "div" => {
                    if has_class(&attrs, "callout-title") {
                        title = self.parse_inline_until("div")?;
                    } else if has_class(&attrs, "callout-body") {
                        body = self.parse_blocks(Some("div"))?;
                    } else if has_class(&attrs, "callout-header") {
                        // Projected form: the header wraps icon and title.
                        title = self.parse_header()?;
                    } else {
                        self.skip_div_capturing_pre()?;
                    }
                }
                Token::Close { name } => return Err(MarkupError::UnexpectedClose(name)),
                other => {
                    return Err(MarkupError::UnsupportedTag(format!("{other:?}")));
                }
            }
        }

        let mut out = Attrs::default();
        out.insert("kind".to_string(), Value::String(kind));
        out.insert("folded".to_string(), Value::Bool(folded));

        if title.is_empty() {
            title = vec![Node::text("", Marks::default())];
        }
        if body.is_empty() {
            body = vec![Node::paragraph("")];
        }

        Ok(Node::Element(ElementNode {
            kind: "callout".to_string(),
            attrs: out,
            children: vec![
                element("callout_title", Attrs::default(), title),
                element("callout_body", Attrs::default(), body),
            ],
        }))
    }

    /// Projected callout header: `<span class="callout-icon">…</span>`
    /// followed by `<span class="callout-title">…</span>`.
    fn parse_header(&mut self) -> Result<Vec<Node>, MarkupError> {
        let mut title = Vec::new();
        let mut depth = 1usize;

        loop {
            let Some(token) = self.next() else {
                return Err(MarkupError::UnexpectedEof("div".to_string()));
            };
            match token {
                Token::Open { name, attrs, .. } if name == "span" => {
                    if has_class(&attrs, "callout-title") {
                        title = self.parse_inline_until("span")?;
                    } else {
                        self.skip_named(&name)?;
                    }
                }
                Token::Open {
                    name, self_closing, ..
                } => {
                    if !self_closing && name == "div" {
                        depth += 1;
                    }
                }
                Token::Close { name } if name == "div" => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(title);
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_named(&mut self, tag: &str) -> Result<(), MarkupError> {
        let mut depth = 1usize;
        loop {
            let Some(token) = self.next() else {
                return Err(MarkupError::UnexpectedEof(tag.to_string()));
            };
            match token {
                Token::Open {
                    name, self_closing, ..
                } if name == tag && !self_closing => depth += 1,
                Token::Close { name } if name == tag => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_math(
        &mut self,
        attrs: &[(String, String)],
        tag: &str,
        display_default: bool,
    ) -> Result<Node, MarkupError> {
        let expression = attr(attrs, "data-expression")
            .map(decode_expression)
            .unwrap_or_default();
        let display = attr(attrs, "data-display")
            .map(|v| v == "true")
            .unwrap_or(display_default);
        let status = match attr(attrs, "data-status") {
            Some("done") => "done",
            _ => "pending",
        };

        self.skip_named(tag)?;

        let mut out = Attrs::default();
        out.insert("expression".to_string(), Value::String(expression));
        out.insert("display".to_string(), Value::Bool(display));
        out.insert("status".to_string(), Value::String(status.to_string()));
        Ok(Node::Void(VoidNode {
            kind: if display { "math_display" } else { "math" }.to_string(),
            attrs: out,
        }))
    }

    fn parse_inline_until(&mut self, closing: &str) -> Result<Vec<Node>, MarkupError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<(String, Marks)> = Vec::new();
        let mut current = Marks::default();

        loop {
            let Some(token) = self.next() else {
                return Err(MarkupError::UnexpectedEof(closing.to_string()));
            };

            match token {
                Token::Text(text) => {
                    nodes.push(Node::text(text, current.clone()));
                }
                Token::Open {
                    name,
                    attrs,
                    self_closing,
                } => {
                    if name == "span" && has_class(&attrs, "math") {
                        nodes.push(self.parse_math(&attrs, "span", false)?);
                        continue;
                    }
                    // Decorative spans from the read-mode projection carry
                    // no content of their own.
                    if name == "span"
                        && (has_class(&attrs, "list-marker") || has_class(&attrs, "callout-icon"))
                    {
                        if !self_closing {
                            self.skip_named("span")?;
                        }
                        continue;
                    }
                    if self_closing {
                        continue;
                    }
                    let mut next = current.clone();
                    match name.as_str() {
                        "strong" | "b" => next.bold = true,
                        "em" | "i" => next.italic = true,
                        "u" => next.underline = true,
                        "s" | "del" => next.strikethrough = true,
                        "sup" => next.superscript = true,
                        "sub" => next.subscript = true,
                        "span" => {
                            if let Some(color) = attr(&attrs, "data-color") {
                                next.color = Some(color.to_string());
                            }
                            if let Some(size) =
                                attr(&attrs, "data-font-size").and_then(|v| v.parse().ok())
                            {
                                next.font_size = Some(size);
                            }
                        }
                        "mark" => {
                            next.highlight = Some(
                                attr(&attrs, "data-highlight").unwrap_or("yellow").to_string(),
                            );
                        }
                        other => {
                            return Err(MarkupError::UnsupportedTag(other.to_string()));
                        }
                    }
                    stack.push((name, current));
                    current = next;
                }
                Token::Close { name } => {
                    if let Some((top, prev)) = stack.last().cloned() {
                        if top == name {
                            stack.pop();
                            current = prev;
                            continue;
                        }
                    }
                    if stack.is_empty() && name == closing {
                        if nodes.is_empty() {
                            nodes.push(Node::text("", Marks::default()));
                        }
                        return Ok(nodes);
                    }
                    return Err(MarkupError::UnexpectedClose(name));
                }
            }
        }
    }
}

fn element(kind: &str, attrs: Attrs, children: Vec<Node>) -> Node {
    Node::Element(ElementNode {
        kind: kind.to_string(),
        attrs,
        children,
    })
}

fn common_attrs(attrs: &[(String, String)]) -> Attrs {
    let mut out = Attrs::default();
    if let Some(indent) = attr(attrs, "data-indent").and_then(|v| v.parse::<u64>().ok()) {
        if indent > 0 {
            out.insert("indent".to_string(), Value::Number(indent.into()));
        }
    }
    if let Some(align) = attr(attrs, "data-align") {
        out.insert("align".to_string(), Value::String(align.to_string()));
    }
    out
}
