//! Theme palettes and the widget repaint loop.
//!
//! Two fixed palettes map the same semantic token names to concrete
//! colors. Which one is active resolves, in order, from an explicit root
//! attribute, a stored preference, and the OS color scheme. Observed
//! changes only ever repaint mounted widgets; document structure is never
//! touched, so repeating a repaint is always safe.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::callout::CalloutPaint;
use crate::code::CodePaint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

/// The semantic token set both widget families paint from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeTokens {
    pub surface_background: &'static str,
    pub surface_border: &'static str,
    pub header_background: &'static str,
    pub header_border: &'static str,
    pub body_text: &'static str,
    pub line_number: &'static str,
    pub line_number_background: &'static str,
    pub syntax_keyword: &'static str,
    pub syntax_string: &'static str,
    pub syntax_comment: &'static str,
    pub syntax_number: &'static str,
    pub syntax_markup: &'static str,
}

pub const LIGHT: ThemeTokens = ThemeTokens {
    surface_background: "#f8f9fa",
    surface_border: "#dee2e6",
    header_background: "#e9ecef",
    header_border: "#ced4da",
    body_text: "#212529",
    line_number: "#868e96",
    line_number_background: "#f1f3f5",
    syntax_keyword: "#d6336c",
    syntax_string: "#2b8a3e",
    syntax_comment: "#868e96",
    syntax_number: "#5f3dc4",
    syntax_markup: "#1971c2",
};

pub const DARK: ThemeTokens = ThemeTokens {
    surface_background: "#1a1b1e",
    surface_border: "#373a40",
    header_background: "#25262b",
    header_border: "#2c2e33",
    body_text: "#e9ecef",
    line_number: "#5c5f66",
    line_number_background: "#141517",
    syntax_keyword: "#faa2c1",
    syntax_string: "#8ce99a",
    syntax_comment: "#5c5f66",
    syntax_number: "#b197fc",
    syntax_markup: "#74c0fc",
};

pub fn palette(mode: ThemeMode) -> &'static ThemeTokens {
    match mode {
        ThemeMode::Light => &LIGHT,
        ThemeMode::Dark => &DARK,
    }
}

/// A change observed on one of the three theme inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeSignal {
    /// Explicit attribute/class on the document root; `None` clears it.
    RootAttribute(Option<ThemeMode>),
    /// Stored preference string; `None` when unset or unreadable.
    StoredPreference(Option<ThemeMode>),
    /// OS-level color-scheme preference.
    OsPreference(ThemeMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeState {
    pub root: Option<ThemeMode>,
    pub stored: Option<ThemeMode>,
    pub os: ThemeMode,
}

impl ThemeState {
    pub fn new(os: ThemeMode) -> Self {
        Self {
            root: None,
            stored: None,
            os,
        }
    }

    /// Root attribute wins, then the stored preference, then the OS.
    pub fn resolve(&self) -> ThemeMode {
        self.root.or(self.stored).unwrap_or(self.os)
    }

    fn apply(&mut self, signal: ThemeSignal) {
        match signal {
            ThemeSignal::RootAttribute(mode) => self.root = mode,
            ThemeSignal::StoredPreference(mode) => self.stored = mode,
            ThemeSignal::OsPreference(mode) => self.os = mode,
        }
    }
}

pub type WidgetId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetPaint {
    Code(CodePaint),
    Callout(CalloutPaint),
}

impl WidgetPaint {
    fn repaint(&mut self, mode: ThemeMode) {
        match self {
            WidgetPaint::Code(paint) => paint.repaint(palette(mode)),
            WidgetPaint::Callout(paint) => paint.repaint(mode),
        }
    }
}

/// Handle returned for every observed widget; dropping it does nothing by
/// itself; the surface calls `unmount` with it when the widget leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountHandle(WidgetId);

impl MountHandle {
    pub fn id(&self) -> WidgetId {
        self.0
    }
}

/// The process-wide theme observer. Created once at surface startup and
/// dropped at shutdown; both its observer inputs arrive through
/// `observe`.
#[derive(Debug)]
pub struct ThemeSync {
    state: ThemeState,
    mounted: BTreeMap<WidgetId, WidgetPaint>,
    next_widget: WidgetId,
}

impl ThemeSync {
    pub fn new(os: ThemeMode) -> Self {
        Self {
            state: ThemeState::new(os),
            mounted: BTreeMap::new(),
            next_widget: 1,
        }
    }

    pub fn active_mode(&self) -> ThemeMode {
        self.state.resolve()
    }

    pub fn active_palette(&self) -> &'static ThemeTokens {
        palette(self.active_mode())
    }

    pub fn mount(&mut self, mut paint: WidgetPaint) -> MountHandle {
        paint.repaint(self.active_mode());
        let id = self.next_widget;
        self.next_widget += 1;
        self.mounted.insert(id, paint);
        MountHandle(id)
    }

    pub fn unmount(&mut self, handle: MountHandle) {
        self.mounted.remove(&handle.0);
    }

    pub fn mounted_len(&self) -> usize {
        self.mounted.len()
    }

    pub fn paint_of(&self, handle: MountHandle) -> Option<&WidgetPaint> {
        self.mounted.get(&handle.0)
    }

    /// Fold an observed change in and repaint every mounted widget.
    /// Returns the mode now active. Repaints run even when the resolved
    /// mode did not change; they are idempotent.
    pub fn observe(&mut self, signal: ThemeSignal) -> ThemeMode {
        self.state.apply(signal);
        let mode = self.state.resolve();
        debug!(?signal, ?mode, widgets = self.mounted.len(), "theme repaint");
        for paint in self.mounted.values_mut() {
            paint.repaint(mode);
        }
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_prefers_root_then_stored_then_os() {
        let mut state = ThemeState::new(ThemeMode::Light);
        assert_eq!(state.resolve(), ThemeMode::Light);

        state.apply(ThemeSignal::StoredPreference(Some(ThemeMode::Dark)));
        assert_eq!(state.resolve(), ThemeMode::Dark);

        state.apply(ThemeSignal::RootAttribute(Some(ThemeMode::Light)));
        assert_eq!(state.resolve(), ThemeMode::Light);

        state.apply(ThemeSignal::RootAttribute(None));
        assert_eq!(state.resolve(), ThemeMode::Dark);

        state.apply(ThemeSignal::StoredPreference(None));
        state.apply(ThemeSignal::OsPreference(ThemeMode::Dark));
        assert_eq!(state.resolve(), ThemeMode::Dark);
    }

    #[test]
    fn palettes_share_the_token_set() {
        assert_ne!(LIGHT.surface_background, DARK.surface_background);
        assert_ne!(LIGHT.syntax_keyword, DARK.syntax_keyword);
    }
}
