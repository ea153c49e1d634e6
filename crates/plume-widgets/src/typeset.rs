//! Loading the external typesetting capability.
//!
//! Sources are tried in order; all of them failing buys one delayed final
//! probe before the load is declared failed. Failure is recoverable: the
//! in-flight state is cleared so a later call starts a fresh attempt. At
//! most one attempt chain is in flight at a time; callers arriving while
//! it runs simply join it.

use thiserror::Error;
use tracing::{debug, warn};

use crate::schedule::{Scheduler, TimerTask};

#[derive(Debug, Error)]
pub enum TypesetError {
    #[error("typesetting failed: {0}")]
    Render(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unreachable: {0}")]
    Unreachable(String),
    #[error("capability missing after load: {0}")]
    Missing(String),
}

/// The loaded capability: expression in, markup out. Render failures are
/// soft; callers preserve the escaped source instead.
pub trait Typesetter {
    fn render(&self, expression: &str, display: bool) -> Result<String, TypesetError>;
}

/// One external provider of the capability (a script + stylesheet pair in
/// the host environment). Interchangeable; any or all may be down.
pub trait TypesetSource {
    fn name(&self) -> &str;
    fn fetch(&mut self) -> Result<Box<dyn Typesetter>, SourceError>;
}

/// Delay before the last availability check after every source failed.
pub const FINAL_PROBE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    /// An attempt chain is in flight (waiting on the final probe timer).
    Loading,
    Loaded,
    /// The last attempt failed; the next `load` starts over.
    Failed,
}

pub struct TypesetLoader {
    sources: Vec<Box<dyn TypesetSource>>,
    typesetter: Option<Box<dyn Typesetter>>,
    state: LoadState,
}

impl TypesetLoader {
    pub fn new(sources: Vec<Box<dyn TypesetSource>>) -> Self {
        Self {
            sources,
            typesetter: None,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn typesetter(&self) -> Option<&dyn Typesetter> {
        self.typesetter.as_deref()
    }

    /// Drive a load attempt. Returns the state after the call; `Loading`
    /// means the caller joined an attempt that is waiting on its final
    /// probe.
    pub fn load(&mut self, scheduler: &mut Scheduler) -> LoadState {
        match self.state {
            LoadState::Loaded => LoadState::Loaded,
            LoadState::Loading => LoadState::Loading,
            LoadState::Idle | LoadState::Failed => {
                if self.try_sources() {
                    self.state = LoadState::Loaded;
                } else {
                    self.state = LoadState::Loading;
                    scheduler.schedule(FINAL_PROBE_DELAY_MS, TimerTask::TypesetFinalProbe);
                }
                self.state
            }
        }
    }

    /// The delayed last check. One more pass over the sources; if nothing
    /// answers, the load fails and the in-flight state clears.
    pub fn on_final_probe(&mut self) -> LoadState {
        if self.state != LoadState::Loading {
            return self.state;
        }
        if self.try_sources() {
            self.state = LoadState::Loaded;
        } else {
            warn!("typesetting unavailable from every source");
            self.state = LoadState::Failed;
        }
        self.state
    }

    fn try_sources(&mut self) -> bool {
        for source in &mut self.sources {
            match source.fetch() {
                Ok(typesetter) => {
                    debug!(source = source.name(), "typesetting capability loaded");
                    self.typesetter = Some(typesetter);
                    return true;
                }
                Err(err) => {
                    debug!(source = source.name(), %err, "typesetting source failed");
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTypesetter;

    impl Typesetter for EchoTypesetter {
        fn render(&self, expression: &str, display: bool) -> Result<String, TypesetError> {
            Ok(format!("[{display}:{expression}]"))
        }
    }

    struct FlakySource {
        name: &'static str,
        failures_left: u32,
    }

    impl TypesetSource for FlakySource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&mut self) -> Result<Box<dyn Typesetter>, SourceError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(SourceError::Unreachable("offline".into()));
            }
            Ok(Box::new(EchoTypesetter))
        }
    }

    #[test]
    fn first_healthy_source_wins() {
        let mut scheduler = Scheduler::new();
        let mut loader = TypesetLoader::new(vec![
            Box::new(FlakySource {
                name: "primary",
                failures_left: u32::MAX,
            }),
            Box::new(FlakySource {
                name: "mirror",
                failures_left: 0,
            }),
        ]);

        assert_eq!(loader.load(&mut scheduler), LoadState::Loaded);
        assert!(loader.is_loaded());
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn concurrent_callers_join_the_in_flight_attempt() {
        let mut scheduler = Scheduler::new();
        let mut loader = TypesetLoader::new(vec![Box::new(FlakySource {
            name: "only",
            failures_left: u32::MAX,
        })]);

        assert_eq!(loader.load(&mut scheduler), LoadState::Loading);
        assert_eq!(loader.load(&mut scheduler), LoadState::Loading);
        // Only the first call scheduled a probe.
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn final_probe_can_still_succeed() {
        let mut scheduler = Scheduler::new();
        let mut loader = TypesetLoader::new(vec![Box::new(FlakySource {
            name: "slow",
            failures_left: 1,
        })]);

        assert_eq!(loader.load(&mut scheduler), LoadState::Loading);
        let due = scheduler.advance(FINAL_PROBE_DELAY_MS);
        assert_eq!(due, vec![TimerTask::TypesetFinalProbe]);
        assert_eq!(loader.on_final_probe(), LoadState::Loaded);
    }

    #[test]
    fn failure_is_recoverable_on_the_next_load() {
        let mut scheduler = Scheduler::new();
        let mut loader = TypesetLoader::new(vec![Box::new(FlakySource {
            name: "cdn",
            failures_left: 3,
        })]);

        assert_eq!(loader.load(&mut scheduler), LoadState::Loading);
        scheduler.advance(FINAL_PROBE_DELAY_MS);
        assert_eq!(loader.on_final_probe(), LoadState::Failed);

        // Two failures consumed; the retry's first pass eats the third
        // and the probe succeeds.
        assert_eq!(loader.load(&mut scheduler), LoadState::Loading);
        scheduler.advance(FINAL_PROBE_DELAY_MS);
        assert_eq!(loader.on_final_probe(), LoadState::Loaded);
        assert!(loader.typesetter().is_some());
    }
}
