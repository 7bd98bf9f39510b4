//! Tag-ref cleanup and version ordering.
//!
//! Ordering follows the Debian/GNU `sort -V` rules: strings are split into
//! alternating non-digit and digit runs. Digit runs compare numerically.
//! Non-digit runs compare character by character, with `~` before the end of
//! the run and letters before every other character. Ties are broken by plain
//! byte order so the result is a total order.

use std::cmp::Ordering;

use crate::types::ReleaseTag;

/// Prefix of every tag ref returned by the refs API.
pub const REF_PREFIX: &str = "refs/tags/";

/// Substring that marks a tag as malformed (e.g. `v.1`).
pub const MALFORMED_MARKER: &str = "v.";

/// `refs/tags/v1.0` → `v1.0`. Anything without the prefix is returned as-is.
pub fn strip_ref_prefix(git_ref: &str) -> &str {
    git_ref.strip_prefix(REF_PREFIX).unwrap_or(git_ref)
}

/// `true` for tags that must never be selected as a release.
pub fn is_malformed(tag: &str) -> bool {
    tag.contains(MALFORMED_MARKER)
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (mut a_rest, mut b_rest) = (a.as_bytes(), b.as_bytes());

    while !a_rest.is_empty() || !b_rest.is_empty() {
        let (a_text, a_tail) = split_run(a_rest, |c| !c.is_ascii_digit());
        let (b_text, b_tail) = split_run(b_rest, |c| !c.is_ascii_digit());
        let ord = compare_text(a_text, b_text);
        if ord != Ordering::Equal {
            return ord;
        }

        let (a_num, a_tail) = split_run(a_tail, |c| c.is_ascii_digit());
        let (b_num, b_tail) = split_run(b_tail, |c| c.is_ascii_digit());
        let ord = compare_numeric(a_num, b_num);
        if ord != Ordering::Equal {
            return ord;
        }

        a_rest = a_tail;
        b_rest = b_tail;
    }

    a.cmp(b)
}

/// Pick the highest non-malformed tag, or `None` when nothing qualifies.
pub fn latest<I, S>(tags: I) -> Option<ReleaseTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().to_string())
        .filter(|t| !t.is_empty() && !is_malformed(t))
        .max_by(|a, b| compare_versions(a, b))
        .map(ReleaseTag)
}

fn split_run(s: &[u8], pred: impl Fn(u8) -> bool) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !pred(*c)).unwrap_or(s.len());
    s.split_at(end)
}

fn char_order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

fn compare_text(a: &[u8], b: &[u8]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = char_order(a.get(i).copied()).cmp(&char_order(b.get(i).copied()));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = trim_leading_zeros(a);
    let b = trim_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|c| *c != b'0').unwrap_or(s.len());
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ref_prefix() {
        assert_eq!(strip_ref_prefix("refs/tags/v1.0"), "v1.0");
        assert_eq!(strip_ref_prefix("v1.0"), "v1.0");
    }

    #[test]
    fn malformed_tags_are_detected() {
        assert!(is_malformed("v.1"));
        assert!(is_malformed("release-v.2"));
        assert!(!is_malformed("v1.0"));
    }

    #[test]
    fn latest_skips_malformed_and_orders_by_version() {
        let got = latest(["v1.0", "v.1", "v2.0", "v1.5"]).unwrap();
        assert_eq!(got, ReleaseTag::from("v2.0"));
    }

    #[test]
    fn numeric_runs_compare_as_numbers() {
        assert_eq!(compare_versions("v1.10", "v1.9"), Ordering::Greater);
        assert_eq!(compare_versions("v1.2.3", "v1.2.3"), Ordering::Equal);
        assert_eq!(compare_versions("v2", "v10"), Ordering::Less);
    }

    #[test]
    fn tilde_sorts_before_release_and_suffix_after() {
        assert_eq!(compare_versions("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0-rc1", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0a", "1.0+"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_only_break_ties() {
        assert_eq!(compare_versions("v1.01", "v1.1"), "v1.01".cmp("v1.1"));
        assert_eq!(compare_versions("v1.01", "v1.2"), Ordering::Less);
    }

    #[test]
    fn latest_of_nothing_is_none() {
        assert_eq!(latest(Vec::<String>::new()), None);
        assert_eq!(latest(["v.1", "v.2"]), None);
    }
}
