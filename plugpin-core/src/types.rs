//! Domain types for plugpin.
//!
//! Every value here is plain data: resolved once per run, never persisted
//! except through the rendered artifact.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A release tag as published upstream, e.g. `v1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseTag(pub String);

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ReleaseTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReleaseTag {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Content hash of a release archive, already encoded for the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveDigest(pub String);

impl fmt::Display for ArchiveDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ArchiveDigest {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Targets and rules
// ---------------------------------------------------------------------------

/// A concrete `owner/repo` pair to pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryTarget {
    pub owner: String,
    pub repo: String,
}

impl RepositoryTarget {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One non-comment line of the rules file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRule {
    /// `owner/repo`: exactly one target.
    Explicit(RepositoryTarget),
    /// `org [include] [exclude]`: every repo of `org` whose name contains
    /// `include` and does not contain `exclude`.
    Organization {
        org: String,
        include: Option<String>,
        exclude: Option<String>,
    },
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::Explicit(target) => target.fmt(f),
            SelectionRule::Organization {
                org,
                include,
                exclude,
            } => {
                write!(f, "{org}")?;
                if let Some(include) = include {
                    write!(f, " +{include}")?;
                }
                if let Some(exclude) = exclude {
                    write!(f, " -{exclude}")?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output record
// ---------------------------------------------------------------------------

/// One pinned release, as written to the generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    pub owner: String,
    pub repo: String,
    pub version: String,
    pub sha256: String,
}

impl PluginEntry {
    /// Build the entry for `target` pinned at `tag`, deriving `name` and
    /// `version` with [`naming::plugin_name`] and [`naming::plugin_version`].
    pub fn new(target: &RepositoryTarget, tag: &ReleaseTag, digest: ArchiveDigest) -> Self {
        Self {
            name: naming::plugin_name(&target.repo).to_string(),
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            version: naming::plugin_version(tag).to_string(),
            sha256: digest.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
