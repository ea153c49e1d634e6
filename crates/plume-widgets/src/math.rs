//! Math spans and the deferred render sweep.
//!
//! A span renders synchronously when the typesetter is already available,
//! and otherwise becomes an escaped placeholder carrying the
//! percent-encoded source, marked pending. Once the loader resolves, the
//! sweep renders pending spans in place and also picks up bare delimiter
//! syntax left in free text. Mobile layout can lag behind the load, so
//! the sweep runs on a short staggered schedule instead of once; every
//! pass is idempotent.

use html_escape::encode_text;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde_json::Value;
use tracing::debug;

use plume_core::{Document, Node};

use crate::schedule::{Scheduler, TimerTask};
use crate::typeset::Typesetter;

/// Sweep deadlines after the typesetter resolves, in milliseconds.
pub const SWEEP_SCHEDULE_MS: [u64; 3] = [150, 600, 1500];

/// Characters escaped when an expression travels inside an attribute.
/// `%` must be in the set for decode(encode(x)) == x.
const EXPRESSION_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'%')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'#')
    .add(b'+')
    .add(b'\\');

pub fn encode_expression(expression: &str) -> String {
    utf8_percent_encode(expression, EXPRESSION_SET).to_string()
}

pub fn decode_expression(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathStatus {
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMath {
    pub markup: String,
    pub status: MathStatus,
}

/// Render an expression to markup now if possible, or to a recoverable
/// placeholder if the capability has not arrived yet. A failed render
/// keeps the escaped source rather than emitting broken markup.
pub fn render_to_string(
    typesetter: Option<&dyn Typesetter>,
    expression: &str,
    display: bool,
) -> RenderedMath {
    let class = if display { "math math-display" } else { "math math-inline" };
    let encoded = encode_expression(expression);

    let Some(typesetter) = typesetter else {
        return RenderedMath {
            markup: format!(
                r#"<span class="{class} math-pending" data-expression="{encoded}" data-display="{display}">{}</span>"#,
                encode_text(expression)
            ),
            status: MathStatus::Pending,
        };
    };

    match typesetter.render(expression, display) {
        Ok(markup) => RenderedMath {
            markup: format!(
                r#"<span class="{class}" data-expression="{encoded}" data-display="{display}">{markup}</span>"#
            ),
            status: MathStatus::Done,
        },
        Err(err) => {
            debug!(%err, "math render failed, keeping source text");
            RenderedMath {
                markup: format!(
                    r#"<span class="{class} math-error" data-expression="{encoded}" data-display="{display}">{}</span>"#,
                    encode_text(expression)
                ),
                status: MathStatus::Done,
            }
        }
    }
}

/// Queue the staggered sweep passes. Call once when the loader resolves.
pub fn schedule_sweeps(scheduler: &mut Scheduler) {
    for delay in SWEEP_SCHEDULE_MS {
        scheduler.schedule(delay, TimerTask::MathSweep);
    }
}

/// One sweep pass: render every pending math void in place, then convert
/// delimiter syntax still sitting in free text (outside code regions).
/// Returns how many spans were rendered. Running it again once nothing is
/// pending changes nothing.
pub fn render_all_in_document(doc: &mut Document, typesetter: &dyn Typesetter) -> usize {
    let mut rendered = 0usize;
    sweep_children(&mut doc.children, typesetter, &mut rendered);
    rendered
}

fn sweep_children(children: &mut Vec<Node>, typesetter: &dyn Typesetter, rendered: &mut usize) {
    // First render the voids and recurse, then split any free-text
    // delimiters into fresh spans.
    for node in children.iter_mut() {
        match node {
            Node::Void(void) if void.kind == "math" || void.kind == "math_display" => {
                let pending = void.attrs.get("status").and_then(|v| v.as_str())
                    != Some("done")
                    || !void.attrs.contains_key("markup");
                if !pending {
                    continue;
                }
                let expression = void
                    .attrs
                    .get("expression")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let display = void.kind == "math_display"
                    || void.attrs.get("display").and_then(|v| v.as_bool()) == Some(true);
                match typesetter.render(&expression, display) {
                    Ok(markup) => {
                        void.attrs.insert("markup".to_string(), Value::String(markup));
                    }
                    Err(err) => {
                        debug!(%err, "math render failed, keeping source text");
                        void.attrs.insert(
                            "markup".to_string(),
                            Value::String(encode_text(&expression).into_owned()),
                        );
                    }
                }
                void.attrs
                    .insert("status".to_string(), Value::String("done".to_string()));
                *rendered += 1;
            }
            Node::Element(el) if el.kind != "code_block" => {
                sweep_children(&mut el.children, typesetter, rendered);
            }
            _ => {}
        }
    }

    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for node in children.drain(..) {
        match node {
            Node::Text(text) => {
                let segments = scan_free_math(&text.text);
                if segments.len() == 1 && matches!(segments[0], Segment::Text(_)) {
                    out.push(Node::Text(text));
                    continue;
                }
                for segment in segments {
                    match segment {
                        Segment::Text(t) => {
                            if !t.is_empty() {
                                out.push(Node::text(t, text.marks.clone()));
                            }
                        }
                        Segment::Math { expression, display } => {
                            let mut span = Node::math_span(expression.clone(), display);
                            if let Node::Void(void) = &mut span {
                                match typesetter.render(&expression, display) {
                                    Ok(markup) => {
                                        void.attrs
                                            .insert("markup".to_string(), Value::String(markup));
                                    }
                                    Err(_) => {
                                        void.attrs.insert(
                                            "markup".to_string(),
                                            Value::String(encode_text(&expression).into_owned()),
                                        );
                                    }
                                }
                                void.attrs.insert(
                                    "status".to_string(),
                                    Value::String("done".to_string()),
                                );
                            }
                            out.push(span);
                            *rendered += 1;
                        }
                    }
                }
            }
            other => out.push(other),
        }
    }
    *children = out;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Math { expression: String, display: bool },
}

/// Split free text around `$…$`, `$$…$$`, `\(…\)` and `\[…\]`.
fn scan_free_math(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut i = 0usize;

    while i < text.len() {
        let rest = &text[i..];

        let matched = if let Some(body) = rest.strip_prefix("$$") {
            body.find("$$").and_then(|end| {
                let inner = &body[..end];
                (!inner.trim().is_empty()).then(|| (inner.to_string(), true, end + 4))
            })
        } else if rest.starts_with('$') {
            rest[1..].find('$').and_then(|end| {
                let inner = &rest[1..1 + end];
                (!inner.is_empty() && !inner.contains('\n'))
                    .then(|| (inner.to_string(), false, end + 2))
            })
        } else if let Some(body) = rest.strip_prefix("\\(") {
            body.find("\\)")
                .map(|end| (body[..end].to_string(), false, end + 4))
        } else if let Some(body) = rest.strip_prefix("\\[") {
            body.find("\\]")
                .map(|end| (body[..end].to_string(), true, end + 4))
        } else {
            None
        };

        match matched {
            Some((expression, display, consumed)) => {
                if !plain.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut plain)));
                }
                segments.push(Segment::Math {
                    expression,
                    display,
                });
                i += consumed;
            }
            None => {
                let c = rest.chars().next().unwrap();
                plain.push(c);
                i += c.len_utf8();
            }
        }
    }

    if !plain.is_empty() || segments.is_empty() {
        segments.push(Segment::Text(plain));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_round_trips_arbitrary_expressions() {
        for expr in ["x^2", "a% + b%", "\\frac{ঢ}{2}", "100% \"done\" <now>"] {
            assert_eq!(decode_expression(&encode_expression(expr)), expr);
        }
    }

    #[test]
    fn scan_finds_inline_and_display_delimiters() {
        let segments = scan_free_math("a $x$ b $$y$$ c \\(z\\)");
        let math: Vec<_> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Math { expression, display } => Some((expression.as_str(), *display)),
                _ => None,
            })
            .collect();
        assert_eq!(math, [("x", false), ("y", true), ("z", false)]);
    }

    #[test]
    fn lone_dollar_is_plain_text() {
        let segments = scan_free_math("price: $5");
        assert_eq!(segments, vec![Segment::Text("price: $5".to_string())]);
    }
}
