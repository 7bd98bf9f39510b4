//! Error types for plugpin-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from reading rules and configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A selection rule line could not be parsed. `line` is 1-based.
    #[error("invalid rule on line {line}: {message}")]
    Rule { line: usize, message: String },

    /// YAML parse error on config load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
