//! # plugpin-sync
//!
//! Network side of plugpin and the transactional artifact update.
//!
//! Build a [`Pipeline`] over a [`GitHubClient`] and call [`Pipeline::run`]
//! to regenerate the artifact, or [`Pipeline::diff`] for a dry run. Every
//! request goes through the quota-aware [`retry`] loop; a failed run leaves
//! the artifact exactly as it was.

pub mod auth;
pub mod client;
pub mod diff;
pub mod digest;
pub mod error;
pub mod github;
pub mod http;
pub mod pipeline;
pub mod quota;
pub mod retry;
pub mod transaction;
pub mod writer;

pub use auth::{Credentials, AUTH_ENV};
pub use client::GitHubClient;
pub use error::SyncError;
pub use github::Endpoints;
pub use http::{HttpResponse, Request, RequestKind, Transport, TransportError, UreqTransport};
pub use pipeline::{Artifact, Collected, DiffReport, Pipeline, RunReport};
pub use quota::QuotaState;
pub use retry::{retry, Attempted, RetryPolicy};
pub use transaction::ArtifactTransaction;
pub use writer::{atomic_write, WriteResult};
