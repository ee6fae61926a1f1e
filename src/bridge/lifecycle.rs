//! Load lifecycle of the embedded runtime.

use std::time::Duration;

use crate::config::ConfigError;

/// How long a load may take before the watchdog fails it.
///
/// Valid range is 1 to 120 seconds; the default is 10 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTimeout(Duration);

impl LoadTimeout {
    pub const MIN_SECS: u64 = 1;
    pub const MAX_SECS: u64 = 120;
    pub const DEFAULT_SECS: u64 = 10;

    pub fn new(duration: Duration) -> Result<Self, ConfigError> {
        let secs = duration.as_secs();
        if duration < Duration::from_secs(Self::MIN_SECS) || secs > Self::MAX_SECS {
            return Err(ConfigError::InvalidLoadTimeout {
                secs,
                min: Self::MIN_SECS,
                max: Self::MAX_SECS,
            });
        }
        Ok(Self(duration))
    }

    pub fn from_secs(secs: u64) -> Result<Self, ConfigError> {
        Self::new(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl Default for LoadTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(Self::DEFAULT_SECS))
    }
}

/// Where the runtime is in its load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    /// Timed out or reported a loading error; a new `load` starts over.
    Failed,
}

/// Mutable load bookkeeping, guarded by the bridge's lifecycle mutex.
///
/// `generation` increments on every load so a watchdog armed for an earlier
/// load can tell it is stale. Both slots belong to the current generation: a
/// new load drops whatever the previous one left behind.
pub(crate) struct LoadLifecycle<H, R> {
    pub(crate) state: LoadState,
    pub(crate) generation: u64,
    pub(crate) error_slot: Option<H>,
    pub(crate) ready_slot: Option<R>,
}

impl<H, R> LoadLifecycle<H, R> {
    pub(crate) fn new() -> Self {
        Self {
            state: LoadState::NotLoaded,
            generation: 0,
            error_slot: None,
            ready_slot: None,
        }
    }

    /// Begin a new load, returning its generation.
    pub(crate) fn begin(&mut self, on_error: H, on_ready: Option<R>) -> u64 {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.error_slot = Some(on_error);
        self.ready_slot = on_ready;
        self.generation
    }

    /// Move a loading runtime to `Failed`, handing back the stored handler.
    ///
    /// Returns `None` in the outer option when no load is in progress.
    pub(crate) fn fail(&mut self) -> Option<Option<H>> {
        if self.state != LoadState::Loading {
            return None;
        }
        self.state = LoadState::Failed;
        self.ready_slot = None;
        Some(self.error_slot.take())
    }

    /// Mark loaded, handing back the ready continuation of this load.
    ///
    /// Returns `None` in the outer option if the current load already failed.
    pub(crate) fn complete(&mut self) -> Option<Option<R>> {
        if self.state == LoadState::Failed {
            return None;
        }
        self.state = LoadState::Loaded;
        self.error_slot = None;
        Some(self.ready_slot.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_ten_seconds() {
        assert_eq!(LoadTimeout::default().as_secs(), 10);
    }

    #[test]
    fn timeout_bounds_are_enforced() {
        assert!(LoadTimeout::from_secs(0).is_err());
        assert!(LoadTimeout::from_secs(1).is_ok());
        assert!(LoadTimeout::from_secs(120).is_ok());
        assert!(LoadTimeout::from_secs(121).is_err());
        assert!(LoadTimeout::new(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn begin_bumps_generation() {
        let mut lifecycle = LoadLifecycle::<u8, u8>::new();
        assert_eq!(lifecycle.begin(1, Some(10)), 1);
        assert_eq!(lifecycle.begin(2, None), 2);
        assert_eq!(lifecycle.state, LoadState::Loading);
        assert_eq!(lifecycle.error_slot, Some(2));
        // the first load's ready continuation does not carry over
        assert_eq!(lifecycle.ready_slot, None);
    }

    #[test]
    fn fail_only_applies_while_loading() {
        let mut lifecycle = LoadLifecycle::<u8, u8>::new();
        assert!(lifecycle.fail().is_none());

        lifecycle.begin(7, Some(70));
        assert_eq!(lifecycle.fail(), Some(Some(7)));
        assert_eq!(lifecycle.state, LoadState::Failed);
        assert_eq!(lifecycle.ready_slot, None);
        assert!(lifecycle.fail().is_none());
    }

    #[test]
    fn complete_after_failure_is_refused() {
        let mut lifecycle = LoadLifecycle::<u8, u8>::new();
        lifecycle.begin(1, Some(10));
        lifecycle.fail();
        assert_eq!(lifecycle.complete(), None);
        assert_eq!(lifecycle.state, LoadState::Failed);

        lifecycle.begin(2, Some(20));
        assert_eq!(lifecycle.complete(), Some(Some(20)));
        assert_eq!(lifecycle.state, LoadState::Loaded);
        assert_eq!(lifecycle.error_slot, None);
    }

    #[test]
    fn ready_continuation_is_handed_out_once() {
        let mut lifecycle = LoadLifecycle::<u8, u8>::new();
        lifecycle.begin(1, Some(10));

        assert_eq!(lifecycle.complete(), Some(Some(10)));
        // a duplicate load-succeeded finds nothing left to run
        assert_eq!(lifecycle.complete(), Some(None));
    }
}
