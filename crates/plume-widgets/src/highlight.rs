//! Syntax highlighting for code blocks.
//!
//! One canonical highlighter serves both the authoring overlay and the
//! read-mode projection. It is a pure function of `(raw_text, language)`:
//! HTML-sensitive characters are escaped, then string literals, comments,
//! numeric literals and per-language keywords are wrapped in classed
//! spans. Markup and style languages additionally colorize tag and
//! attribute names. Colors are not applied here; the widget wrapper maps
//! the token classes to the active palette at paint time.

use html_escape::encode_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    Code,
    Markup,
    Stylesheet,
}

#[derive(Debug)]
pub struct LanguageSpec {
    pub name: &'static str,
    keywords: &'static [&'static str],
    line_comment: Option<&'static str>,
    block_comment: Option<(&'static str, &'static str)>,
    string_delimiters: &'static [char],
    mode: ScanMode,
}

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
    "delete", "do", "else", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "null", "of", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "yield",
];

const TS_KEYWORDS: &[&str] = &[
    "any", "as", "async", "await", "boolean", "break", "case", "catch", "class", "const",
    "continue", "declare", "default", "delete", "do", "else", "enum", "export", "extends",
    "false", "finally", "for", "function", "if", "implements", "import", "in", "interface",
    "let", "namespace", "never", "new", "null", "number", "of", "private", "public",
    "readonly", "return", "static", "string", "super", "switch", "this", "throw", "true",
    "try", "type", "typeof", "undefined", "unknown", "var", "void", "while", "yield",
];

const PY_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return",
    "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned",
    "void", "volatile", "while",
];

const CPP_KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "catch", "char", "class", "const", "constexpr",
    "continue", "default", "delete", "do", "double", "else", "enum", "explicit", "false",
    "float", "for", "friend", "if", "inline", "int", "long", "namespace", "new", "nullptr",
    "operator", "private", "protected", "public", "return", "short", "signed", "sizeof",
    "static", "struct", "switch", "template", "this", "throw", "true", "try", "typedef",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "while",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "super", "switch", "synchronized", "this", "throw", "throws", "true",
    "try", "void", "volatile", "while",
];

const SH_KEYWORDS: &[&str] = &[
    "case", "do", "done", "elif", "else", "esac", "fi", "for", "function", "if", "in",
    "local", "return", "select", "then", "until", "while",
];

const SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        name: "text",
        keywords: &[],
        line_comment: None,
        block_comment: None,
        string_delimiters: &[],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "javascript",
        keywords: JS_KEYWORDS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"', '\'', '`'],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "typescript",
        keywords: TS_KEYWORDS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"', '\'', '`'],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "python",
        keywords: PY_KEYWORDS,
        line_comment: Some("#"),
        block_comment: None,
        string_delimiters: &['"', '\''],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "rust",
        keywords: RUST_KEYWORDS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"'],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "c",
        keywords: C_KEYWORDS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"', '\''],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "cpp",
        keywords: CPP_KEYWORDS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"', '\''],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "java",
        keywords: JAVA_KEYWORDS,
        line_comment: Some("//"),
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"', '\''],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "bash",
        keywords: SH_KEYWORDS,
        line_comment: Some("#"),
        block_comment: None,
        string_delimiters: &['"', '\''],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "json",
        keywords: &["true", "false", "null"],
        line_comment: None,
        block_comment: None,
        string_delimiters: &['"'],
        mode: ScanMode::Code,
    },
    LanguageSpec {
        name: "html",
        keywords: &[],
        line_comment: None,
        block_comment: Some(("<!--", "-->")),
        string_delimiters: &['"', '\''],
        mode: ScanMode::Markup,
    },
    LanguageSpec {
        name: "css",
        keywords: &[],
        line_comment: None,
        block_comment: Some(("/*", "*/")),
        string_delimiters: &['"', '\''],
        mode: ScanMode::Stylesheet,
    },
];

/// Lookup by language tag; unknown tags fall back to plain text.
pub fn language_spec(name: &str) -> &'static LanguageSpec {
    let lowered = name.to_ascii_lowercase();
    let canonical = match lowered.as_str() {
        "js" | "jsx" | "javascript" => "javascript",
        "ts" | "tsx" | "typescript" => "typescript",
        "py" | "python" => "python",
        "rs" | "rust" => "rust",
        "c" | "h" => "c",
        "cpp" | "c++" | "cc" | "hpp" => "cpp",
        "java" => "java",
        "sh" | "bash" | "shell" | "zsh" => "bash",
        "json" => "json",
        "html" | "xml" | "svg" | "vue" => "html",
        "css" | "scss" | "less" => "css",
        other => other,
    };
    SPECS
        .iter()
        .find(|spec| spec.name == canonical)
        .unwrap_or(&SPECS[0])
}

fn span(class: &str, raw: &str) -> String {
    format!(r#"<span class="{class}">{}</span>"#, encode_text(raw))
}

/// Highlight `raw` into one HTML string per source line.
pub fn highlight_lines(raw: &str, spec: &LanguageSpec) -> Vec<String> {
    let mut in_block_comment = false;
    raw.split('\n')
        .map(|line| match spec.mode {
            ScanMode::Code => scan_code_line(line, spec, &mut in_block_comment),
            ScanMode::Markup => scan_markup_line(line, spec, &mut in_block_comment),
            ScanMode::Stylesheet => scan_stylesheet_line(line, spec, &mut in_block_comment),
        })
        .collect()
}

/// Convenience wrapper joining highlighted lines back together.
pub fn highlight(raw: &str, spec: &LanguageSpec) -> String {
    highlight_lines(raw, spec).join("\n")
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Consume a string literal starting at `start` (which holds `delim`).
/// Returns the byte index just past the closing delimiter, or the end of
/// the line when unterminated.
fn string_end(line: &str, start: usize, delim: char) -> usize {
    let mut escaped = false;
    for (ix, c) in line[start + delim.len_utf8()..].char_indices() {
        let at = start + delim.len_utf8() + ix;
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == delim {
            return at + delim.len_utf8();
        }
    }
    line.len()
}

fn number_end(line: &str, start: usize) -> usize {
    let mut end = start;
    for (ix, c) in line[start..].char_indices() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            end = start + ix + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

fn scan_code_line(line: &str, spec: &LanguageSpec, in_block_comment: &mut bool) -> String {
    let mut out = String::new();
    let mut i = 0usize;
    let mut prev_ident = false;

    while i < line.len() {
        let rest = &line[i..];

        if *in_block_comment {
            let end = spec.block_comment.map(|(_, e)| e).unwrap_or("*/");
            match rest.find(end) {
                Some(pos) => {
                    out.push_str(&span("tok-com", &rest[..pos + end.len()]));
                    i += pos + end.len();
                    *in_block_comment = false;
                }
                None => {
                    out.push_str(&span("tok-com", rest));
                    i = line.len();
                }
            }
            prev_ident = false;
            continue;
        }

        if let Some((start, end)) = spec.block_comment {
            if rest.starts_with(start) {
                match rest[start.len()..].find(end) {
                    Some(pos) => {
                        let stop = start.len() + pos + end.len();
                        out.push_str(&span("tok-com", &rest[..stop]));
                        i += stop;
                    }
                    None => {
                        out.push_str(&span("tok-com", rest));
                        i = line.len();
                        *in_block_comment = true;
                    }
                }
                prev_ident = false;
                continue;
            }
        }

        if let Some(marker) = spec.line_comment {
            if rest.starts_with(marker) {
                out.push_str(&span("tok-com", rest));
                break;
            }
        }

        let c = rest.chars().next().unwrap();

        if spec.string_delimiters.contains(&c) {
            let end = string_end(line, i, c);
            out.push_str(&span("tok-str", &line[i..end]));
            i = end;
            prev_ident = false;
            continue;
        }

        if c.is_ascii_digit() && !prev_ident {
            let end = number_end(line, i);
            out.push_str(&span("tok-num", &line[i..end]));
            i = end;
            prev_ident = false;
            continue;
        }

        if is_ident_start(c) {
            let mut end = i;
            for (ix, ic) in rest.char_indices() {
                if is_ident_continue(ic) {
                    end = i + ix + ic.len_utf8();
                } else {
                    break;
                }
            }
            let word = &line[i..end];
            if spec.keywords.contains(&word) {
                out.push_str(&span("tok-kw", word));
            } else {
                out.push_str(&encode_text(word));
            }
            i = end;
            prev_ident = true;
            continue;
        }

        let mut buf = [0u8; 4];
        out.push_str(&encode_text(c.encode_utf8(&mut buf)));
        i += c.len_utf8();
        prev_ident = false;
    }

    out
}

fn scan_markup_line(line: &str, spec: &LanguageSpec, in_block_comment: &mut bool) -> String {
    let mut out = String::new();
    let mut i = 0usize;
    let mut in_tag = false;

    while i < line.len() {
        let rest = &line[i..];

        if *in_block_comment {
            match rest.find("-->") {
                Some(pos) => {
                    out.push_str(&span("tok-com", &rest[..pos + 3]));
                    i += pos + 3;
                    *in_block_comment = false;
                }
                None => {
                    out.push_str(&span("tok-com", rest));
                    i = line.len();
                }
            }
            continue;
        }

        if rest.starts_with("<!--") {
            match rest[4..].find("-->") {
                Some(pos) => {
                    out.push_str(&span("tok-com", &rest[..4 + pos + 3]));
                    i += 4 + pos + 3;
                }
                None => {
                    out.push_str(&span("tok-com", rest));
                    i = line.len();
                    *in_block_comment = true;
                }
            }
            continue;
        }

        let c = rest.chars().next().unwrap();

        if !in_tag {
            if c == '<' {
                in_tag = true;
                let mut end = i + 1;
                if line[end..].starts_with('/') {
                    end += 1;
                }
                let name_start = end;
                for (ix, nc) in line[name_start..].char_indices() {
                    if nc.is_ascii_alphanumeric() || nc == '-' || nc == ':' {
                        end = name_start + ix + nc.len_utf8();
                    } else {
                        break;
                    }
                }
                out.push_str(&encode_text(&line[i..name_start]));
                if end > name_start {
                    out.push_str(&span("tok-tag", &line[name_start..end]));
                }
                i = end;
                continue;
            }
            out.push_str(&encode_text(c.encode_utf8(&mut [0u8; 4])));
            i += c.len_utf8();
            continue;
        }

        // Inside a tag: attribute names, strings, and the closing bracket.
        if c == '>' {
            in_tag = false;
            out.push_str(&encode_text(">"));
            i += 1;
            continue;
        }
        if spec.string_delimiters.contains(&c) {
            let end = string_end(line, i, c);
            out.push_str(&span("tok-str", &line[i..end]));
            i = end;
            continue;
        }
        if is_ident_start(c) {
            let mut end = i;
            for (ix, ic) in rest.char_indices() {
                if ic.is_ascii_alphanumeric() || ic == '-' || ic == '_' {
                    end = i + ix + ic.len_utf8();
                } else {
                    break;
                }
            }
            out.push_str(&span("tok-attr", &line[i..end]));
            i = end;
            continue;
        }
        out.push_str(&encode_text(c.encode_utf8(&mut [0u8; 4])));
        i += c.len_utf8();
    }

    out
}

fn scan_stylesheet_line(line: &str, spec: &LanguageSpec, in_block_comment: &mut bool) -> String {
    let mut out = String::new();
    let mut i = 0usize;

    while i < line.len() {
        let rest = &line[i..];

        if *in_block_comment {
            match rest.find("*/") {
                Some(pos) => {
                    out.push_str(&span("tok-com", &rest[..pos + 2]));
                    i += pos + 2;
                    *in_block_comment = false;
                }
                None => {
                    out.push_str(&span("tok-com", rest));
                    i = line.len();
                }
            }
            continue;
        }

        if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(pos) => {
                    out.push_str(&span("tok-com", &rest[..2 + pos + 2]));
                    i += 2 + pos + 2;
                }
                None => {
                    out.push_str(&span("tok-com", rest));
                    i = line.len();
                    *in_block_comment = true;
                }
            }
            continue;
        }

        let c = rest.chars().next().unwrap();

        if spec.string_delimiters.contains(&c) {
            let end = string_end(line, i, c);
            out.push_str(&span("tok-str", &line[i..end]));
            i = end;
            continue;
        }

        if c.is_ascii_digit() {
            let end = number_end(line, i);
            out.push_str(&span("tok-num", &line[i..end]));
            i = end;
            continue;
        }

        if is_ident_start(c) || c == '-' || c == '.' || c == '#' {
            let word_start = i;
            let base = i + c.len_utf8();
            let mut end = base;
            for (ix, ic) in line[base..].char_indices() {
                if ic.is_ascii_alphanumeric() || ic == '-' || ic == '_' {
                    end = base + ix + ic.len_utf8();
                } else {
                    break;
                }
            }
            let word = &line[word_start..end];
            // Property names are followed by a colon; selectors are not.
            let next_meaningful = line[end..].chars().find(|ch| !ch.is_whitespace());
            if next_meaningful == Some(':') {
                out.push_str(&span("tok-attr", word));
            } else {
                out.push_str(&span("tok-tag", word));
            }
            i = end;
            continue;
        }

        out.push_str(&encode_text(c.encode_utf8(&mut [0u8; 4])));
        i += c.len_utf8();
    }

    out
}
