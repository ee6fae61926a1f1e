//! Correlation ids for in-flight runtime calls.
//!
//! Each promise-style call gets a `CallId`, from which the two named channels
//! the runtime answers on are derived: `success_<id>` and `error_<id>`.

use std::fmt;

use ulid::{Generator, Ulid};

const SUCCESS_PREFIX: &str = "success_";
const ERROR_PREFIX: &str = "error_";

/// Correlation id linking an issued call to its response channels.
///
/// Wraps a ULID so the id is printable as a valid script identifier suffix
/// (Crockford base32, no separators) and sortable by issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(Ulid);

impl CallId {
    /// Name of the channel the runtime posts a fulfilled result to.
    pub fn success_channel(&self) -> String {
        format!("{SUCCESS_PREFIX}{}", self.0)
    }

    /// Name of the channel the runtime posts a rejection to.
    pub fn error_channel(&self) -> String {
        format!("{ERROR_PREFIX}{}", self.0)
    }

    /// Recover the id and outcome from an inbound channel name.
    ///
    /// Returns `None` for names that are not continuation channels.
    pub fn from_channel(name: &str) -> Option<(Self, CallOutcome)> {
        if let Some(raw) = name.strip_prefix(SUCCESS_PREFIX) {
            Ulid::from_string(raw)
                .ok()
                .map(|ulid| (Self(ulid), CallOutcome::Fulfilled))
        } else if let Some(raw) = name.strip_prefix(ERROR_PREFIX) {
            Ulid::from_string(raw)
                .ok()
                .map(|ulid| (Self(ulid), CallOutcome::Rejected))
        } else {
            None
        }
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two continuation channels a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Fulfilled,
    Rejected,
}

/// Monotonic id source.
///
/// Owned by the pending-call table and only used under its lock, so
/// allocation never races with insertion.
pub(crate) struct CallIdAllocator {
    generator: Generator,
}

impl CallIdAllocator {
    pub(crate) fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    /// Allocate the next id.
    ///
    /// The monotonic generator only fails when the random component of a
    /// single millisecond overflows; fall back to a fresh random ULID then.
    pub(crate) fn next(&mut self) -> CallId {
        CallId(self.generator.generate().unwrap_or_else(|_| Ulid::new()))
    }
}
