pub mod callout;
pub mod clipboard;
pub mod code;
pub mod highlight;
pub mod math;
pub mod schedule;
pub mod theme;
pub mod typeset;

pub use crate::callout::{ALL_KINDS, CalloutColors, CalloutKind, CalloutPaint};
pub use crate::clipboard::{Clipboard, ClipboardError, CopyControl, CopyOutcome};
pub use crate::code::{CodeBlock, CodePaint};
pub use crate::highlight::{LanguageSpec, highlight, highlight_lines, language_spec};
pub use crate::math::{
    MathStatus, RenderedMath, decode_expression, encode_expression, render_all_in_document,
    render_to_string, schedule_sweeps,
};
pub use crate::schedule::{Scheduler, TimerId, TimerTask};
pub use crate::theme::{
    MountHandle, ThemeMode, ThemeSignal, ThemeState, ThemeSync, ThemeTokens, WidgetPaint, palette,
};
pub use crate::typeset::{
    LoadState, SourceError, TypesetError, TypesetLoader, TypesetSource, Typesetter,
};
