//! Optional YAML configuration.
//!
//! Every field has a default, so an absent file and an empty file both
//! yield [`Config::default`].
//!
//! ```yaml
//! api_url: https://api.github.com
//! archive_url: https://github.com
//! per_page: 100
//! retry:
//!   attempts: 30
//!   delay_secs: 5
//! missing_release: fail   # or: skip
//! digest: unpacked        # or: flat
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_ARCHIVE_URL: &str = "https://github.com";
pub const DEFAULT_USER_AGENT: &str = "plugpin";
pub const DEFAULT_HEADER: &str = "Generated by plugpin. Do not edit by hand; rerun `plugpin update`.";

/// What to do with a target that has no qualifying release tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingRelease {
    /// Abort the run and roll the artifact back.
    #[default]
    Fail,
    /// Warn and leave the target out of the artifact.
    Skip,
}

/// How the release archive is turned into a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestMode {
    /// NAR hash of the unpacked tree, Nix base-32 (`nix-prefetch-url --unpack`).
    #[default]
    Unpacked,
    /// SHA-256 of the raw tarball bytes, hex.
    Flat,
}

/// Fixed-delay retry budget shared by every network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 30,
            delay_secs: 5,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_url: String,
    pub archive_url: String,
    pub user_agent: String,
    pub per_page: u32,
    pub retry: RetryConfig,
    pub missing_release: MissingRelease,
    pub digest: DigestMode,
    /// First line of the generated artifact (without the comment marker).
    pub header: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            per_page: 100,
            retry: RetryConfig::default(),
            missing_release: MissingRelease::default(),
            digest: DigestMode::default(),
            header: DEFAULT_HEADER.to_string(),
        }
    }
}

impl Config {
    /// Load the config at `path`.
    ///
    /// Returns `CoreError::Io` if unreadable, `CoreError::Config` (with path +
    /// line context) if malformed.
    pub fn load(path: &Path) -> Result<Config, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| CoreError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// [`Config::load`] when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, CoreError> {
        match path {
            Some(path) => Config::load(path),
            None => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_reference_behaviour() {
        let cfg = Config::default();
        assert_eq!(cfg.retry.attempts, 30);
        assert_eq!(cfg.retry.delay(), Duration::from_secs(5));
        assert_eq!(cfg.per_page, 100);
        assert_eq!(cfg.missing_release, MissingRelease::Fail);
        assert_eq!(cfg.digest, DigestMode::Unpacked);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugpin.yaml");
        std::fs::write(&path, "missing_release: skip\nretry:\n  attempts: 3\n").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.missing_release, MissingRelease::Skip);
        assert_eq!(cfg.retry.attempts, 3);
        assert_eq!(cfg.retry.delay_secs, 5);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn empty_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugpin.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn unknown_field_is_rejected_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugpin.yaml");
        std::fs::write(&path, "retries: 3\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
        assert!(err.to_string().contains("plugpin.yaml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(&tmp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
