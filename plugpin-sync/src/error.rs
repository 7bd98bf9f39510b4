//! Error types for plugpin-sync.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use plugpin_core::{CoreError, RepositoryTarget};
use plugpin_renderer::RenderError;

use crate::auth::AUTH_ENV;

/// All errors that can arise from a pipeline run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error reading rules or configuration.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced an HTTP response.
    #[error("network error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// `404 Not Found`. Never retried.
    #[error("{url} not found")]
    NotFound { url: String },

    /// `401 Unauthorized`. Never retried.
    #[error("{url} rejected the request (HTTP 401). {}", credentials_hint(.authenticated))]
    Unauthorized { url: String, authenticated: bool },

    /// The response body was not the JSON we expected.
    #[error("malformed response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The downloaded archive could not be unpacked.
    #[error("unreadable archive from {url}: {message}")]
    Archive { url: String, message: String },

    /// No API calls remain until `reset`. Never retried.
    #[error("GitHub API quota exhausted until {reset}. {}", remediation(.authenticated))]
    QuotaExhausted {
        reset: DateTime<Utc>,
        authenticated: bool,
    },

    /// A transient failure outlived the retry budget.
    #[error("{what} still failing after {attempts} attempts: {last}")]
    RetryCeilingExceeded {
        what: String,
        attempts: u32,
        last: Box<SyncError>,
    },

    /// The target has no tag that qualifies as a release.
    #[error("no release tag found for {target}")]
    NoReleaseFound { target: RepositoryTarget },

    /// Two targets derive the same plugin name.
    #[error("plugin name '{name}' is produced by both {first} and {second}")]
    DuplicateName {
        name: String,
        first: RepositoryTarget,
        second: RepositoryTarget,
    },
}

impl SyncError {
    /// `true` for failures worth another attempt.
    ///
    /// Client errors other than throttling (`403`, `408`, `429`) mean the
    /// request itself is wrong and would fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Status { status, .. } => {
                *status >= 500 || matches!(*status, 403 | 408 | 429)
            }
            SyncError::Transport { .. } | SyncError::Json { .. } | SyncError::Archive { .. } => true,
            _ => false,
        }
    }
}

fn credentials_hint(authenticated: &bool) -> String {
    if *authenticated {
        format!("Check the credentials in {AUTH_ENV}.")
    } else {
        format!("Set {AUTH_ENV}=<user>:<token> if the resource needs authentication.")
    }
}

fn remediation(authenticated: &bool) -> String {
    if *authenticated {
        "Wait for the reset before running again.".to_string()
    } else {
        format!(
            "Wait for the reset, or set {AUTH_ENV}=<user>:<token> to use the authenticated quota."
        )
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_shaped_errors_are_transient() {
        let transient = SyncError::Status {
            url: "u".into(),
            status: 502,
        };
        assert!(transient.is_transient());

        let fatal = SyncError::QuotaExhausted {
            reset: Utc::now(),
            authenticated: false,
        };
        assert!(!fatal.is_transient());
        assert!(!SyncError::NotFound { url: "u".into() }.is_transient());
    }

    #[test]
    fn client_errors_are_not_retried_except_throttling() {
        let status = |status| SyncError::Status {
            url: "u".into(),
            status,
        };
        assert!(!status(400).is_transient());
        assert!(!status(422).is_transient());
        assert!(status(403).is_transient());
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());

        let unauthorized = SyncError::Unauthorized {
            url: "u".into(),
            authenticated: true,
        };
        assert!(!unauthorized.is_transient());
        assert!(unauthorized.to_string().contains(AUTH_ENV));
    }

    #[test]
    fn quota_message_mentions_credentials_when_anonymous() {
        let err = SyncError::QuotaExhausted {
            reset: Utc::now(),
            authenticated: false,
        };
        assert!(err.to_string().contains(AUTH_ENV));

        let err = SyncError::QuotaExhausted {
            reset: Utc::now(),
            authenticated: true,
        };
        assert!(!err.to_string().contains(AUTH_ENV));
    }
}
