//! Dry-run unified diff support for `plugpin diff`.

use std::io::ErrorKind;
use std::path::Path;

use similar::TextDiff;

use crate::error::{io_err, SyncError};

/// Diff `rendered` against what is on disk at `path`.
///
/// Returns `None` when they match. A missing file diffs as empty.
pub fn unified_diff(path: &Path, rendered: &str) -> Result<Option<String>, SyncError> {
    let existing = read_existing_or_empty(path)?;
    let rendered = normalize_line_endings(rendered);
    if existing == rendered {
        return Ok(None);
    }

    let old_header = format!("a/{}", path.display());
    let new_header = format!("b/{}", path.display());
    let unified = TextDiff::from_lines(&existing, &rendered)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();
    Ok(Some(unified))
}

fn read_existing_or_empty(path: &Path) -> Result<String, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(normalize_line_endings(&content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}

fn normalize_line_endings(s: &str) -> String {
    s.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn identical_content_has_no_diff() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugins.nix");
        std::fs::write(&path, "a\r\nb\r\n").unwrap();
        assert_eq!(unified_diff(&path, "a\nb\n").unwrap(), None);
    }

    #[test]
    fn changed_line_shows_up() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugins.nix");
        std::fs::write(&path, "version = \"1.0\";\n").unwrap();

        let diff = unified_diff(&path, "version = \"1.1\";\n").unwrap().unwrap();
        assert!(diff.contains("-version = \"1.0\";"));
        assert!(diff.contains("+version = \"1.1\";"));
    }

    #[test]
    fn missing_file_diffs_against_empty() {
        let tmp = TempDir::new().unwrap();
        let diff = unified_diff(&tmp.path().join("absent.nix"), "new\n").unwrap().unwrap();
        assert!(diff.contains("+new"));
    }
}
