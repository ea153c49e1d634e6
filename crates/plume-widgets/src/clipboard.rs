//! Clipboard access for the code widget's copy control.
//!
//! The platform clipboard and the legacy fallback (an off-screen text
//! field driven through the old copy command) are both host-provided
//! implementations of the same trait; the widget only sequences them.
//! A failed copy is logged and otherwise swallowed; surfacing it is the
//! host page's business.

use thiserror::Error;
use tracing::{debug, warn};

use crate::schedule::{Scheduler, TimerId, TimerTask};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Primary,
    Legacy,
    Failed,
}

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

/// How long the acknowledgment label stays up before reverting.
pub const ACK_REVERT_MS: u64 = 2000;

/// Per-widget copy button state. The label flips to an acknowledgment on
/// any successful path and reverts when the scheduled timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyControl {
    widget: u64,
    label: &'static str,
    ack_timer: Option<TimerId>,
}

impl CopyControl {
    pub fn new(widget: u64) -> Self {
        Self {
            widget,
            label: COPY_LABEL,
            ack_timer: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn trigger(
        &mut self,
        primary: &mut dyn Clipboard,
        legacy: &mut dyn Clipboard,
        text: &str,
        scheduler: &mut Scheduler,
    ) -> CopyOutcome {
        let outcome = match primary.write_text(text) {
            Ok(()) => CopyOutcome::Primary,
            Err(err) => {
                debug!(%err, "platform clipboard write failed, trying legacy copy");
                match legacy.write_text(text) {
                    Ok(()) => CopyOutcome::Legacy,
                    Err(err) => {
                        warn!(%err, "legacy copy failed too");
                        CopyOutcome::Failed
                    }
                }
            }
        };

        if outcome != CopyOutcome::Failed {
            self.label = COPIED_LABEL;
            if let Some(old) = self.ack_timer.take() {
                scheduler.cancel(old);
            }
            self.ack_timer =
                Some(scheduler.schedule(ACK_REVERT_MS, TimerTask::CopyAckRevert(self.widget)));
        }

        outcome
    }

    /// Handle the acknowledgment timer for this widget.
    pub fn on_timer(&mut self, task: TimerTask) {
        if task == TimerTask::CopyAckRevert(self.widget) {
            self.label = COPY_LABEL;
            self.ack_timer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Working(Vec<String>);

    impl Clipboard for Working {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl Clipboard for Broken {
        fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable("insecure context".into()))
        }
    }

    #[test]
    fn primary_path_acknowledges_and_reverts() {
        let mut scheduler = Scheduler::new();
        let mut control = CopyControl::new(7);
        let mut primary = Working(Vec::new());
        let mut legacy = Working(Vec::new());

        let outcome = control.trigger(&mut primary, &mut legacy, "code", &mut scheduler);
        assert_eq!(outcome, CopyOutcome::Primary);
        assert_eq!(primary.0, ["code"]);
        assert!(legacy.0.is_empty());
        assert_eq!(control.label(), COPIED_LABEL);

        for task in scheduler.advance(ACK_REVERT_MS) {
            control.on_timer(task);
        }
        assert_eq!(control.label(), COPY_LABEL);
    }

    #[test]
    fn legacy_fallback_still_acknowledges() {
        let mut scheduler = Scheduler::new();
        let mut control = CopyControl::new(1);
        let mut legacy = Working(Vec::new());

        let outcome = control.trigger(&mut Broken, &mut legacy, "text", &mut scheduler);
        assert_eq!(outcome, CopyOutcome::Legacy);
        assert_eq!(legacy.0, ["text"]);
        assert_eq!(control.label(), COPIED_LABEL);
    }

    #[test]
    fn total_failure_is_swallowed_without_acknowledgment() {
        let mut scheduler = Scheduler::new();
        let mut control = CopyControl::new(1);

        let outcome = control.trigger(&mut Broken, &mut Broken, "text", &mut scheduler);
        assert_eq!(outcome, CopyOutcome::Failed);
        assert_eq!(control.label(), COPY_LABEL);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn rapid_copies_keep_a_single_pending_revert() {
        let mut scheduler = Scheduler::new();
        let mut control = CopyControl::new(1);
        let mut primary = Working(Vec::new());
        let mut legacy = Working(Vec::new());

        control.trigger(&mut primary, &mut legacy, "a", &mut scheduler);
        scheduler.advance(500);
        control.trigger(&mut primary, &mut legacy, "b", &mut scheduler);
        assert_eq!(scheduler.pending_len(), 1);

        // The first revert deadline passes without reverting the label.
        for task in scheduler.advance(1600) {
            control.on_timer(task);
        }
        assert_eq!(control.label(), COPIED_LABEL);
        for task in scheduler.advance(400) {
            control.on_timer(task);
        }
        assert_eq!(control.label(), COPY_LABEL);
    }
}
