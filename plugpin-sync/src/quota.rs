//! API quota state.
//!
//! [`QuotaState`] is a plain value. The pipeline creates it with a
//! `/rate_limit` check at the start of a run and passes it `&mut` through
//! every network call. Each response's `x-ratelimit-*` headers refresh it,
//! and each failed attempt triggers a fresh check.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::github::RateLimitResource;
use crate::http::HttpResponse;

/// Remaining call budget and when it resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub limit: u64,
    pub remaining: u64,
    pub reset: DateTime<Utc>,
}

impl QuotaState {
    pub fn from_resource(resource: RateLimitResource) -> Self {
        QuotaState {
            limit: resource.limit,
            remaining: resource.remaining,
            reset: timestamp(resource.reset),
        }
    }

    /// State for servers that do not rate limit.
    pub fn unlimited() -> Self {
        QuotaState {
            limit: u64::MAX,
            remaining: u64::MAX,
            reset: DateTime::<Utc>::default(),
        }
    }

    /// Read `x-ratelimit-{limit,remaining,reset}`; `None` unless all three parse.
    pub fn from_headers(response: &HttpResponse) -> Option<Self> {
        let limit = response.header("x-ratelimit-limit")?.trim().parse().ok()?;
        let remaining = response.header("x-ratelimit-remaining")?.trim().parse().ok()?;
        let reset: i64 = response.header("x-ratelimit-reset")?.trim().parse().ok()?;
        Some(QuotaState {
            limit,
            remaining,
            reset: timestamp(reset),
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// `Err(QuotaExhausted)` when no calls remain.
    pub fn ensure_available(&self, authenticated: bool) -> Result<(), SyncError> {
        if self.is_exhausted() {
            return Err(SyncError::QuotaExhausted {
                reset: self.reset,
                authenticated,
            });
        }
        Ok(())
    }
}

impl fmt::Display for QuotaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} calls remaining, resets at {}",
            self.remaining,
            self.limit,
            self.reset.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
