//! Selection-rule file parsing.
//!
//! # Format
//!
//! ```text
//! # comments run to end of line; blank lines are ignored
//! owner/repo
//! org [include] [exclude]
//! ```
//!
//! Fields are whitespace-separated. In an organization rule `-` stands for
//! "no filter", so `nix-community - gce` excludes without including.

use std::path::Path;

use crate::error::{io_err, CoreError};
use crate::types::{RepositoryTarget, SelectionRule};

/// Placeholder for an absent include/exclude filter.
pub const NO_FILTER: &str = "-";

/// Parse every rule in `src`, in file order.
pub fn parse_rules(src: &str) -> Result<Vec<SelectionRule>, CoreError> {
    let mut rules = Vec::new();
    for (idx, raw) in src.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let rule = parse_line(line).map_err(|message| CoreError::Rule {
            line: idx + 1,
            message,
        })?;
        rules.push(rule);
    }
    Ok(rules)
}

/// Read and parse the rules file at `path`.
pub fn load_rules(path: &Path) -> Result<Vec<SelectionRule>, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_rules(&contents)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn parse_line(line: &str) -> Result<SelectionRule, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let first = fields[0];

    if let Some((owner, repo)) = first.split_once('/') {
        if fields.len() > 1 {
            return Err(format!(
                "'{first}' names a single repository and takes no filters"
            ));
        }
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(format!("expected 'owner/repo', got '{first}'"));
        }
        return Ok(SelectionRule::Explicit(RepositoryTarget::new(owner, repo)));
    }

    if fields.len() > 3 {
        return Err(format!(
            "expected 'org [include] [exclude]', got {} fields",
            fields.len()
        ));
    }

    Ok(SelectionRule::Organization {
        org: first.to_string(),
        include: filter_field(fields.get(1).copied()),
        exclude: filter_field(fields.get(2).copied()),
    })
}

fn filter_field(field: Option<&str>) -> Option<String> {
    field.filter(|f| *f != NO_FILTER).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_comment_is_stripped() {
        assert_eq!(strip_comment("nixos/nixops-aws # pinned"), "nixos/nixops-aws ");
        assert_eq!(strip_comment("# whole line"), "");
        assert_eq!(strip_comment("plain"), "plain");
    }

    #[test]
    fn placeholder_means_no_filter() {
        assert_eq!(filter_field(Some("-")), None);
        assert_eq!(filter_field(Some("gce")), Some("gce".to_string()));
        assert_eq!(filter_field(None), None);
    }
}
