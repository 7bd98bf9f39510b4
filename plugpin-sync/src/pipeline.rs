//! The fetch-update pipeline shared by `plugpin update` and `plugpin diff`.
//!
//! Rules are processed strictly in order, one request at a time:
//!
//! 1. check the quota,
//! 2. resolve each rule to targets,
//! 3. per target: latest tag → archive digest → append entry,
//! 4. render, then commit through an [`ArtifactTransaction`].
//!
//! Any error before the commit drops the transaction, which restores the
//! artifact to its pre-run bytes.

use std::path::{Path, PathBuf};

use plugpin_core::{
    naming, tags, ArchiveDigest, Config, MissingRelease, PluginEntry, ReleaseTag,
    RepositoryTarget, SelectionRule,
};
use plugpin_renderer::Renderer;

use crate::client::GitHubClient;
use crate::diff::unified_diff;
use crate::error::SyncError;
use crate::http::Transport;
use crate::quota::QuotaState;
use crate::transaction::ArtifactTransaction;
use crate::writer::WriteResult;

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// In-progress artifact: entries in processing order, names unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    entries: Vec<PluginEntry>,
}

impl Artifact {
    pub fn new() -> Self {
        Artifact::default()
    }

    /// Append `entry`, rejecting a name that is already taken.
    pub fn append_entry(&mut self, entry: PluginEntry) -> Result<(), SyncError> {
        if let Some(existing) = self.entries.iter().find(|e| e.name == entry.name) {
            return Err(SyncError::DuplicateName {
                name: entry.name.clone(),
                first: RepositoryTarget::new(&existing.owner, &existing.repo),
                second: RepositoryTarget::new(entry.owner, entry.repo),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Everything fetched for a set of rules, before anything is written.
#[derive(Debug)]
pub struct Collected {
    pub artifact: Artifact,
    /// Targets left out under `missing_release: skip`.
    pub skipped: Vec<RepositoryTarget>,
    pub quota: QuotaState,
}

/// Outcome of a successful `run`.
#[derive(Debug)]
pub struct RunReport {
    pub entries: Vec<PluginEntry>,
    pub skipped: Vec<RepositoryTarget>,
    pub write: WriteResult,
    /// Attempts beyond the first, over all requests.
    pub retries: u32,
    pub quota: QuotaState,
}

/// Outcome of a dry run.
#[derive(Debug)]
pub struct DiffReport {
    pub path: PathBuf,
    pub entries: Vec<PluginEntry>,
    pub skipped: Vec<RepositoryTarget>,
    /// `None` when the artifact is already up to date.
    pub unified_diff: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Resolve → fetch → hash → emit, over one [`GitHubClient`].
pub struct Pipeline<T> {
    client: GitHubClient<T>,
    config: Config,
    renderer: Renderer,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(client: GitHubClient<T>, config: Config, renderer: Renderer) -> Self {
        Pipeline {
            client,
            config,
            renderer,
        }
    }

    pub fn client(&self) -> &GitHubClient<T> {
        &self.client
    }

    /// Probe the quota; fatal if exhausted.
    pub fn check_quota(&self) -> Result<QuotaState, SyncError> {
        self.client.start_quota()
    }

    /// Expand `rule` into concrete targets.
    pub fn resolve_targets(
        &self,
        rule: &SelectionRule,
        quota: &mut QuotaState,
    ) -> Result<Vec<RepositoryTarget>, SyncError> {
        match rule {
            SelectionRule::Explicit(target) => Ok(vec![target.clone()]),
            SelectionRule::Organization {
                org,
                include,
                exclude,
            } => {
                let names = self.client.list_repos(org, quota)?;
                let total = names.len();
                let kept = naming::filter_repos(names, include.as_deref(), exclude.as_deref());
                tracing::info!("{rule}: {} of {total} repositories selected", kept.len());
                Ok(kept
                    .into_iter()
                    .map(|repo| RepositoryTarget::new(org.as_str(), repo))
                    .collect())
            }
        }
    }

    /// Highest well-formed tag of `target`.
    pub fn latest_tag(
        &self,
        target: &RepositoryTarget,
        quota: &mut QuotaState,
    ) -> Result<ReleaseTag, SyncError> {
        let all = self.client.list_tags(target, quota)?;
        tracing::debug!("{target}: {} tags", all.len());
        tags::latest(&all).ok_or_else(|| SyncError::NoReleaseFound {
            target: target.clone(),
        })
    }

    /// Digest of the source archive of `tag`.
    pub fn digest_archive(
        &self,
        target: &RepositoryTarget,
        tag: &ReleaseTag,
        quota: &mut QuotaState,
    ) -> Result<ArchiveDigest, SyncError> {
        self.client
            .digest_archive(target, tag, self.config.digest, quota)
    }

    /// Fetch every entry for `rules` without touching the filesystem.
    pub fn collect(&self, rules: &[SelectionRule]) -> Result<Collected, SyncError> {
        let mut quota = self.check_quota()?;
        tracing::info!("quota: {quota}");

        let mut artifact = Artifact::new();
        let mut skipped = Vec::new();

        for rule in rules {
            let targets = self.resolve_targets(rule, &mut quota)?;
            for target in targets {
                let tag = match self.latest_tag(&target, &mut quota) {
                    Ok(tag) => tag,
                    Err(SyncError::NoReleaseFound { target })
                        if self.config.missing_release == MissingRelease::Skip =>
                    {
                        tracing::warn!("{target}: no release tag, skipping");
                        skipped.push(target);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let digest = self.digest_archive(&target, &tag, &mut quota)?;
                tracing::info!(
                    "[{}] {target} {tag} sha256={digest}",
                    artifact.len() + 1
                );
                artifact.append_entry(PluginEntry::new(&target, &tag, digest))?;
            }
        }

        Ok(Collected {
            artifact,
            skipped,
            quota,
        })
    }

    /// Render `entries` with the configured header.
    pub fn render(&self, entries: &[PluginEntry]) -> Result<String, SyncError> {
        Ok(self.renderer.render(&self.config.header, entries)?)
    }

    /// Full run: regenerate `output`, or leave it byte-identical on failure.
    pub fn run(&self, rules: &[SelectionRule], output: &Path) -> Result<RunReport, SyncError> {
        let tx = ArtifactTransaction::begin(output)?;

        let collected = self.collect(rules)?;
        let rendered = self.render(collected.artifact.entries())?;
        let write = tx.commit(&rendered)?;

        Ok(RunReport {
            entries: collected.artifact.entries().to_vec(),
            skipped: collected.skipped,
            write,
            retries: self.client.retries(),
            quota: collected.quota,
        })
    }

    /// Dry run: everything `run` does except writing.
    pub fn diff(&self, rules: &[SelectionRule], output: &Path) -> Result<DiffReport, SyncError> {
        let collected = self.collect(rules)?;
        let rendered = self.render(collected.artifact.entries())?;
        let unified_diff = unified_diff(output, &rendered)?;

        Ok(DiffReport {
            path: output.to_path_buf(),
            entries: collected.artifact.entries().to_vec(),
            skipped: collected.skipped,
            unified_diff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, repo: &str) -> PluginEntry {
        PluginEntry {
            name: name.to_string(),
            owner: "nix-community".to_string(),
            repo: repo.to_string(),
            version: "1.0".to_string(),
            sha256: "x".to_string(),
        }
    }

    #[test]
    fn append_keeps_order() {
        let mut artifact = Artifact::new();
        artifact.append_entry(entry("zeta", "nixops-zeta")).unwrap();
        artifact.append_entry(entry("aws", "nixops-aws")).unwrap();
        let names: Vec<_> = artifact.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "aws"]);
    }

    #[test]
    fn duplicate_name_is_rejected_with_both_sources() {
        let mut artifact = Artifact::new();
        artifact.append_entry(entry("aws", "nixops-aws")).unwrap();
        let err = artifact.append_entry(entry("aws", "legacy-aws")).unwrap_err();
        match err {
            SyncError::DuplicateName { name, first, second } => {
                assert_eq!(name, "aws");
                assert_eq!(first.repo, "nixops-aws");
                assert_eq!(second.repo, "legacy-aws");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(artifact.len(), 1);
    }
}
