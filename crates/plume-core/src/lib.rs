mod autoformat;
mod blockformat;
pub mod caret;
mod core;
pub mod keymap;
pub mod list;
mod ops;
mod plugin;
mod serde_value;

pub use crate::autoformat::{
    DEFAULT_HIGHLIGHT, HIGHLIGHT_COLORS, JOINER, MAX_FONT_SIZE, MIN_FONT_SIZE, TEXT_COLORS,
    color_css, highlight_css,
};
pub use crate::core::*;
pub use crate::ops::*;
pub use crate::plugin::{
    CALLOUT_KINDS, ChildConstraint, CommandError, CommandSpec, NodeRole, NodeSpec, NormalizePass,
    PluginRegistry, PlumePlugin, QueryError, QuerySpec, TransactionPreview, TransactionTransform,
    adjust_indent, callout_node, is_callout_kind,
};
pub use crate::serde_value::*;
