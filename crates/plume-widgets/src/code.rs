//! The code block widget.
//!
//! A widget value is `(language, raw_text, processed)`; everything visible
//! is derived from it. The editing materialization pairs a highlighted
//! read layer with an overlay input surface whose metrics match, so the
//! invisible editable text stays aligned with the visible highlight; the
//! read-mode materialization drops the overlay and persists the raw text
//! in an attribute so rehydration never scrapes rendered markup.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::highlight::{highlight_lines, language_spec};
use crate::theme::ThemeTokens;

/// Overlay font metrics. The input surface and the read layer must agree
/// on these for the caret to line up with the highlighted text.
pub const LINE_HEIGHT_PX: u32 = 21;
pub const BLOCK_PADDING_PX: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub raw_text: String,
    pub processed: bool,
}

impl CodeBlock {
    pub fn new(language: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let language: String = language.into();
        Self {
            language: if language.is_empty() {
                "text".to_string()
            } else {
                language
            },
            raw_text: raw_text.into(),
            processed: false,
        }
    }

    /// A widget re-read from its read-mode markup.
    pub fn processed(language: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let mut block = Self::new(language, raw_text);
        block.processed = true;
        block
    }

    pub fn line_count(&self) -> usize {
        self.raw_text.split('\n').count().max(1)
    }

    /// Height the overlay input surface needs to cover the content.
    /// Recomputed after every edit.
    pub fn overlay_height_px(&self) -> u32 {
        self.line_count() as u32 * LINE_HEIGHT_PX + 2 * BLOCK_PADDING_PX
    }

    /// Highlighted read-layer lines. Pure in `(raw_text, language)`.
    pub fn highlighted_lines(&self) -> Vec<String> {
        highlight_lines(&self.raw_text, language_spec(&self.language))
    }

    /// Editing materialization: header, gutter, read layer, overlay input.
    pub fn materialize_edit(&self, tokens: &ThemeTokens, copy_label: &str) -> String {
        self.materialize(tokens, copy_label, false)
    }

    /// Read-mode materialization: same structure minus the overlay, plus
    /// the persisted raw text and the processed marker. Running it on an
    /// already-processed widget yields the same markup again.
    pub fn materialize_read(&self, tokens: &ThemeTokens, copy_label: &str) -> String {
        self.materialize(tokens, copy_label, true)
    }

    fn materialize(&self, tokens: &ThemeTokens, copy_label: &str, read_mode: bool) -> String {
        let mut out = String::new();

        out.push_str("<div class=\"code-block\"");
        out.push_str(&format!(
            " data-language=\"{}\"",
            encode_double_quoted_attribute(&self.language)
        ));
        if read_mode {
            out.push_str(" data-processed=\"true\"");
            out.push_str(&format!(
                " data-raw=\"{}\"",
                encode_double_quoted_attribute(&self.raw_text)
            ));
        }
        out.push_str(&format!(" style=\"{}\">", paint_style(tokens)));

        out.push_str("<div class=\"code-header\">");
        out.push_str(&format!(
            "<span class=\"code-language\">{}</span>",
            encode_text(&self.language)
        ));
        out.push_str(&format!(
            "<button type=\"button\" class=\"code-copy\">{}</button>",
            encode_text(copy_label)
        ));
        out.push_str("</div>");

        out.push_str("<div class=\"code-body\">");

        out.push_str("<div class=\"code-gutter\">");
        for n in 1..=self.line_count() {
            out.push_str(&format!("<span class=\"line-number\">{n}</span>"));
        }
        out.push_str("</div>");

        out.push_str("<pre class=\"code-lines\"><code>");
        let lines = self.highlighted_lines();
        for (ix, line) in lines.iter().enumerate() {
            if ix > 0 {
                out.push('\n');
            }
            out.push_str(&format!("<span class=\"code-line\">{line}</span>"));
        }
        out.push_str("</code></pre>");

        if !read_mode {
            out.push_str(&format!(
                "<textarea class=\"code-input\" spellcheck=\"false\" style=\"height:{}px\">{}</textarea>",
                self.overlay_height_px(),
                encode_text(&self.raw_text)
            ));
        }

        out.push_str("</div></div>");
        out
    }
}

/// Inline style written onto the widget wrapper. The theme synchronizer
/// rewrites exactly this attribute on repaint; nothing else changes.
pub fn paint_style(tokens: &ThemeTokens) -> String {
    format!(
        "--code-surface:{};--code-border:{};--code-header-bg:{};--code-header-border:{};\
         --code-text:{};--code-gutter:{};--code-gutter-bg:{};--tok-kw:{};--tok-str:{};\
         --tok-com:{};--tok-num:{};--tok-tag:{}",
        tokens.surface_background,
        tokens.surface_border,
        tokens.header_background,
        tokens.header_border,
        tokens.body_text,
        tokens.line_number,
        tokens.line_number_background,
        tokens.syntax_keyword,
        tokens.syntax_string,
        tokens.syntax_comment,
        tokens.syntax_number,
        tokens.syntax_markup,
    )
}

/// Mounted paint state for one code widget: the resolved token values its
/// wrapper style currently carries.
#[derive(Debug, Clone, PartialEq)]
pub struct CodePaint {
    pub tokens: ThemeTokens,
}

impl CodePaint {
    pub fn new(tokens: &ThemeTokens) -> Self {
        Self { tokens: *tokens }
    }

    pub fn repaint(&mut self, tokens: &ThemeTokens) {
        self.tokens = *tokens;
    }

    pub fn style_attr(&self) -> String {
        paint_style(&self.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{DARK, LIGHT};

    #[test]
    fn gutter_tracks_the_line_count() {
        let block = CodeBlock::new("js", "a\nb\nc");
        assert_eq!(block.line_count(), 3);
        let markup = block.materialize_edit(&LIGHT, "Copy");
        assert_eq!(markup.matches("line-number").count(), 3);
    }

    #[test]
    fn overlay_height_follows_content() {
        let one = CodeBlock::new("js", "x");
        let three = CodeBlock::new("js", "x\ny\nz");
        assert!(three.overlay_height_px() > one.overlay_height_px());
        assert_eq!(
            three.overlay_height_px(),
            3 * LINE_HEIGHT_PX + 2 * BLOCK_PADDING_PX
        );
    }

    #[test]
    fn empty_language_defaults_to_text() {
        let block = CodeBlock::new("", "raw");
        assert_eq!(block.language, "text");
    }

    #[test]
    fn read_mode_persists_the_raw_text_verbatim() {
        let raw = "let a = \"<b>\";\nconsole.log(a);";
        let block = CodeBlock::new("js", raw);
        let markup = block.materialize_read(&LIGHT, "Copy");
        assert!(markup.contains("data-processed=\"true\""));
        assert!(markup.contains("data-raw=\""));
        assert!(!markup.contains("textarea"));
    }

    #[test]
    fn edit_mode_has_the_overlay_and_no_processed_marker() {
        let block = CodeBlock::new("js", "x");
        let markup = block.materialize_edit(&LIGHT, "Copy");
        assert!(markup.contains("textarea"));
        assert!(!markup.contains("data-processed"));
    }

    #[test]
    fn repaint_only_changes_the_style_attribute() {
        let block = CodeBlock::new("js", "const x = 1;");
        let light = block.materialize_read(&LIGHT, "Copy");
        let dark = block.materialize_read(&DARK, "Copy");

        let strip = |s: &str| {
            let start = s.find("style=\"").unwrap();
            let end = s[start + 7..].find('"').unwrap();
            format!("{}{}", &s[..start], &s[start + 7 + end..])
        };
        assert_ne!(light, dark);
        assert_eq!(strip(&light), strip(&dark));
    }
}
