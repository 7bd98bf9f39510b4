//! GitHub REST v3 endpoints and payloads.

use serde::Deserialize;

use plugpin_core::{Config, ReleaseTag, RepositoryTarget};

/// URL builders for every endpoint the pipeline touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_url: String,
    archive_url: String,
    per_page: u32,
}

impl Endpoints {
    pub fn new(api_url: &str, archive_url: &str, per_page: u32) -> Self {
        Endpoints {
            api_url: api_url.trim_end_matches('/').to_string(),
            archive_url: archive_url.trim_end_matches('/').to_string(),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Endpoints::new(&cfg.api_url, &cfg.archive_url, cfg.per_page)
    }

    pub fn rate_limit(&self) -> String {
        format!("{}/rate_limit", self.api_url)
    }

    /// First page of an organization's repositories.
    pub fn org_repos(&self, org: &str) -> String {
        format!("{}/orgs/{org}/repos?per_page={}", self.api_url, self.per_page)
    }

    /// First page of a user account's repositories.
    pub fn user_repos(&self, user: &str) -> String {
        format!("{}/users/{user}/repos?per_page={}", self.api_url, self.per_page)
    }

    /// First page of tag refs.
    pub fn tag_refs(&self, target: &RepositoryTarget) -> String {
        format!(
            "{}/repos/{}/{}/git/matching-refs/tags?per_page={}",
            self.api_url, target.owner, target.repo, self.per_page
        )
    }

    /// Source tarball for `tag`.
    pub fn archive(&self, target: &RepositoryTarget, tag: &ReleaseTag) -> String {
        format!(
            "{}/{}/{}/archive/{}.tar.gz",
            self.archive_url, target.owner, target.repo, tag
        )
    }
}

/// One element of a repository listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoListing {
    pub name: String,
}

/// One element of a refs listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub git_ref: String,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    #[serde(default)]
    pub resources: Option<RateLimitResources>,
    #[serde(default)]
    pub rate: Option<RateLimitResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitResource {
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds.
    pub reset: i64,
}

impl RateLimitResponse {
    /// The quota that applies to REST calls.
    pub fn core(&self) -> Option<RateLimitResource> {
        self.resources.as_ref().map(|r| r.core).or(self.rate)
    }
}

/// Extract the `rel="next"` URL from a `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let url = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        url.strip_prefix('<')
            .and_then(|u| u.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_next_link() {
        let src = r#"<https://api.github.com/orgs/x/repos?page=2>; rel="next", <https://api.github.com/orgs/x/repos?page=3>; rel="last""#;
        assert_eq!(
            parse_next_link(src).as_deref(),
            Some("https://api.github.com/orgs/x/repos?page=2")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let src = r#"<https://api.github.com/orgs/x/repos?page=1>; rel="prev", <https://api.github.com/orgs/x/repos?page=1>; rel="first""#;
        assert_eq!(parse_next_link(src), None);
    }

    #[test]
    fn endpoints_trim_trailing_slash_and_clamp_page_size() {
        let ep = Endpoints::new("https://api.example/", "https://example/", 500);
        let target = RepositoryTarget::new("o", "r");
        assert_eq!(ep.org_repos("nix"), "https://api.example/orgs/nix/repos?per_page=100");
        assert_eq!(
            ep.tag_refs(&target),
            "https://api.example/repos/o/r/git/matching-refs/tags?per_page=100"
        );
        assert_eq!(
            ep.archive(&target, &ReleaseTag::from("v1.0")),
            "https://example/o/r/archive/v1.0.tar.gz"
        );
        assert_eq!(ep.rate_limit(), "https://api.example/rate_limit");
    }

    #[test]
    fn rate_limit_prefers_core_resource() {
        let body = r#"{"resources":{"core":{"limit":60,"remaining":7,"reset":1700000000}},"rate":{"limit":60,"remaining":9,"reset":1700000000}}"#;
        let parsed: RateLimitResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.core().unwrap().remaining, 7);

        let legacy = r#"{"rate":{"limit":60,"remaining":9,"reset":1700000000}}"#;
        let parsed: RateLimitResponse = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.core().unwrap().remaining, 9);
    }
}
