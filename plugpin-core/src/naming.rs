//! Plugin name/version derivation and organization repo filtering.

use crate::types::ReleaseTag;

/// Single-character prefix removed from tags to form the stored version.
pub const VERSION_PREFIX: char = 'v';

/// Strip the first `-`-separated segment: `nixops-aws` → `aws`.
///
/// Names without a `-`, or with nothing after the first `-`, are returned
/// unchanged.
pub fn plugin_name(repo: &str) -> &str {
    match repo.split_once('-') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => repo,
    }
}

/// `v1.2.3` → `1.2.3`. Tags without the prefix are returned unchanged.
pub fn plugin_version(tag: &ReleaseTag) -> &str {
    tag.0.strip_prefix(VERSION_PREFIX).unwrap_or(&tag.0)
}

/// Keep names containing `include` (if given), drop names containing
/// `exclude` (if given), and sort what remains. Matching is case-sensitive.
pub fn filter_repos<I, S>(names: I, include: Option<&str>, exclude: Option<&str>) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut kept: Vec<String> = names
        .into_iter()
        .map(Into::into)
        .filter(|name| include.map_or(true, |inc| name.contains(inc)))
        .filter(|name| exclude.map_or(true, |exc| !name.contains(exc)))
        .collect();
    kept.sort();
    kept
}
