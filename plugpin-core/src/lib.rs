//! plugpin core library: domain types, rule parsing, tag ordering, config.
//!
//! Public API surface:
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`CoreError`]
//! - [`rules`]: selection-rule file parsing
//! - [`tags`]: tag-ref cleanup and version ordering
//! - [`naming`]: plugin name/version derivation and org repo filtering
//! - [`config`]: optional YAML configuration

pub mod config;
pub mod error;
pub mod naming;
pub mod rules;
pub mod tags;
pub mod types;

pub use config::{Config, DigestMode, MissingRelease, RetryConfig};
pub use error::CoreError;
pub use types::{ArchiveDigest, PluginEntry, ReleaseTag, RepositoryTarget, SelectionRule};
