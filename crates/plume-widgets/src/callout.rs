//! The callout widget.
//!
//! Twelve named kinds, each with a fixed icon and color triple. The
//! triple is recombined against the active theme at paint time rather
//! than stored per instance, so switching themes never touches content.
//! Folding flips a display flag on the body; the content stays put.

use serde::{Deserialize, Serialize};

use crate::theme::ThemeMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalloutKind {
    Note,
    Abstract,
    Info,
    Tip,
    Success,
    Question,
    Warning,
    Failure,
    Danger,
    Bug,
    Example,
    Quote,
}

pub const ALL_KINDS: [CalloutKind; 12] = [
    CalloutKind::Note,
    CalloutKind::Abstract,
    CalloutKind::Info,
    CalloutKind::Tip,
    CalloutKind::Success,
    CalloutKind::Question,
    CalloutKind::Warning,
    CalloutKind::Failure,
    CalloutKind::Danger,
    CalloutKind::Bug,
    CalloutKind::Example,
    CalloutKind::Quote,
];

impl CalloutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalloutKind::Note => "note",
            CalloutKind::Abstract => "abstract",
            CalloutKind::Info => "info",
            CalloutKind::Tip => "tip",
            CalloutKind::Success => "success",
            CalloutKind::Question => "question",
            CalloutKind::Warning => "warning",
            CalloutKind::Failure => "failure",
            CalloutKind::Danger => "danger",
            CalloutKind::Bug => "bug",
            CalloutKind::Example => "example",
            CalloutKind::Quote => "quote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|k| k.as_str() == value)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CalloutKind::Note => "✏️",
            CalloutKind::Abstract => "📋",
            CalloutKind::Info => "ℹ️",
            CalloutKind::Tip => "🔥",
            CalloutKind::Success => "✅",
            CalloutKind::Question => "❓",
            CalloutKind::Warning => "⚠️",
            CalloutKind::Failure => "❌",
            CalloutKind::Danger => "⚡",
            CalloutKind::Bug => "🐞",
            CalloutKind::Example => "🧪",
            CalloutKind::Quote => "💬",
        }
    }

    /// Base accent for the kind; header and body tints derive from it per
    /// theme in `colors`.
    fn accents(&self) -> (&'static str, &'static str) {
        // (light accent, dark accent)
        match self {
            CalloutKind::Note => ("#448aff", "#82b1ff"),
            CalloutKind::Abstract => ("#00b0ff", "#80d8ff"),
            CalloutKind::Info => ("#00b8d4", "#84ffff"),
            CalloutKind::Tip => ("#00bfa5", "#64ffda"),
            CalloutKind::Success => ("#00c853", "#b9f6ca"),
            CalloutKind::Question => ("#64dd17", "#ccff90"),
            CalloutKind::Warning => ("#ff9100", "#ffd180"),
            CalloutKind::Failure => ("#ff5252", "#ff8a80"),
            CalloutKind::Danger => ("#ff1744", "#ff8a80"),
            CalloutKind::Bug => ("#f50057", "#ff80ab"),
            CalloutKind::Example => ("#7c4dff", "#b388ff"),
            CalloutKind::Quote => ("#9e9e9e", "#e0e0e0"),
        }
    }
}

/// The resolved color triple a callout paints with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalloutColors {
    pub accent: &'static str,
    pub header_background: &'static str,
    pub body_background: &'static str,
}

/// Combine the kind's fixed accents with the active theme.
pub fn colors(kind: CalloutKind, mode: ThemeMode) -> CalloutColors {
    let (light, dark) = kind.accents();
    match mode {
        ThemeMode::Light => CalloutColors {
            accent: light,
            header_background: "#f1f3f5",
            body_background: "#ffffff",
        },
        ThemeMode::Dark => CalloutColors {
            accent: dark,
            header_background: "#25262b",
            body_background: "#1a1b1e",
        },
    }
}

/// Mounted paint state for one callout.
#[derive(Debug, Clone, PartialEq)]
pub struct CalloutPaint {
    pub kind: CalloutKind,
    pub colors: CalloutColors,
}

impl CalloutPaint {
    pub fn new(kind: CalloutKind, mode: ThemeMode) -> Self {
        Self {
            kind,
            colors: colors(kind, mode),
        }
    }

    pub fn repaint(&mut self, mode: ThemeMode) {
        self.colors = colors(self.kind, mode);
    }

    /// Inline style for the widget wrapper, rewritten on repaint.
    pub fn style_attr(&self) -> String {
        format!(
            "--callout-accent:{};--callout-header-bg:{};--callout-body-bg:{}",
            self.colors.accent, self.colors.header_background, self.colors.body_background,
        )
    }
}

/// Folding only flips the body's display flag.
pub fn body_display(folded: bool) -> &'static str {
    if folded { "none" } else { "block" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_twelve_kinds_round_trip_their_names() {
        assert_eq!(ALL_KINDS.len(), 12);
        for kind in ALL_KINDS {
            assert_eq!(CalloutKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(CalloutKind::parse("shrug"), None);
    }

    #[test]
    fn repaint_recombines_against_the_theme() {
        let mut paint = CalloutPaint::new(CalloutKind::Warning, ThemeMode::Light);
        let light = paint.style_attr();
        paint.repaint(ThemeMode::Dark);
        let dark = paint.style_attr();
        assert_ne!(light, dark);

        paint.repaint(ThemeMode::Light);
        assert_eq!(paint.style_attr(), light);
    }

    #[test]
    fn folding_never_discards_content() {
        assert_eq!(body_display(true), "none");
        assert_eq!(body_display(false), "block");
    }
}
