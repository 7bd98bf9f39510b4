//! Fixed-delay retry loop.
//!
//! Only [`SyncError::is_transient`] failures are retried. After every failed
//! attempt the caller-supplied `recheck` runs; it is where the quota check
//! lives, so an exhausted quota ends the loop at once instead of burning the
//! remaining attempts.

use std::time::Duration;

use plugpin_core::RetryConfig;

use crate::error::SyncError;
use crate::quota::QuotaState;

/// Attempt ceiling and the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            delay,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy::new(cfg.attempts, cfg.delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or the policy runs out.
///
/// `quota` is handed to both closures on each call so neither has to hold
/// on to it.
pub fn retry<T>(
    policy: &RetryPolicy,
    what: &str,
    quota: &mut QuotaState,
    mut op: impl FnMut(&mut QuotaState) -> Result<T, SyncError>,
    mut recheck: impl FnMut(&mut QuotaState) -> Result<(), SyncError>,
) -> Result<Attempted<T>, SyncError> {
    let max = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        if attempt > 1 {
            tracing::info!("{what}: attempt {attempt}/{max}");
        }
        match op(quota) {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                })
            }
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                tracing::warn!("{what} failed (attempt {attempt}/{max}): {err}");
                recheck(quota)?;
                if attempt >= max {
                    return Err(SyncError::RetryCeilingExceeded {
                        what: what.to_string(),
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
                attempt += 1;
            }
        }
    }
}
