//! core::ops::retry
//!
//! Bounded immediate retry for transport-touching steps.
//!
//! A unit of work is retried only when it fails with a *transient* error
//! (as reported by [`Retryable::is_transient`]). Any other failure is
//! returned on first occurrence. When every attempt fails transiently, the
//! last error is converted with [`Retryable::exhausted`] so the caller sees
//! an operational failure that still carries the original cause.
//!
//! # Example
//!
//! ```
//! use registry_vcs::core::ops::retry::{RetryPolicy, Retryable};
//!
//! #[derive(Debug, PartialEq)]
//! enum Flaky { Net, GaveUp(u32) }
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{self:?}") }
//! }
//!
//! impl Retryable for Flaky {
//!     fn is_transient(&self) -> bool { matches!(self, Flaky::Net) }
//!     fn exhausted(self, attempts: u32, _what: &str) -> Self { Flaky::GaveUp(attempts) }
//! }
//!
//! let policy = RetryPolicy::default();
//! let result: Result<(), Flaky> = policy.invoke("fetch", || Err(Flaky::Net));
//! assert_eq!(result, Err(Flaky::GaveUp(3)));
//! ```

use tracing::{error, warn};

/// Default number of total attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors that know whether they are worth retrying.
pub trait Retryable: Sized {
    /// Whether this failure is a transient transport failure.
    fn is_transient(&self) -> bool;

    /// Convert the final transient failure after `attempts` tries.
    fn exhausted(self, attempts: u32, what: &str) -> Self;
}

/// Immediate retry with a fixed attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` total attempts (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, retrying immediately on transient failure.
    ///
    /// `what` names the step for logs and for the exhaustion error.
    pub fn invoke<T, E, F>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    error!(step = what, attempts = attempt, error = %err, "retries exhausted");
                    return Err(err.exhausted(attempt, what));
                }
                Err(err) => {
                    warn!(step = what, attempt, error = %err, "transient failure, retrying");
                    attempt += 1;
                }
            }
        }
    }
}
