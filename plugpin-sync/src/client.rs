//! Quota-aware GitHub client.
//!
//! Every call takes the run's [`QuotaState`] by `&mut`. Responses refresh it
//! from their rate-limit headers, and failed attempts re-query `/rate_limit`
//! through [`GitHubClient::check_quota`].

use std::cell::Cell;
use std::collections::HashSet;

use serde::de::DeserializeOwned;

use plugpin_core::{tags, ArchiveDigest, Config, DigestMode, ReleaseTag, RepositoryTarget};

use crate::digest;
use crate::error::SyncError;
use crate::github::{parse_next_link, Endpoints, GitRef, RateLimitResponse, RepoListing};
use crate::http::{HttpResponse, Request, Transport};
use crate::quota::QuotaState;
use crate::retry::{retry, RetryPolicy};

/// GitHub REST client over any [`Transport`].
pub struct GitHubClient<T> {
    transport: T,
    endpoints: Endpoints,
    policy: RetryPolicy,
    authenticated: bool,
    retries: Cell<u32>,
}

impl<T: Transport> GitHubClient<T> {
    pub fn new(transport: T, endpoints: Endpoints, policy: RetryPolicy, authenticated: bool) -> Self {
        GitHubClient {
            transport,
            endpoints,
            policy,
            authenticated,
            retries: Cell::new(0),
        }
    }

    pub fn from_config(transport: T, cfg: &Config, authenticated: bool) -> Self {
        GitHubClient::new(
            transport,
            Endpoints::from_config(cfg),
            RetryPolicy::from(&cfg.retry),
            authenticated,
        )
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Attempts beyond the first, summed over every call so far.
    pub fn retries(&self) -> u32 {
        self.retries.get()
    }

    // -----------------------------------------------------------------------
    // Quota
    // -----------------------------------------------------------------------

    /// Probe `/rate_limit`. `QuotaExhausted` if nothing remains.
    ///
    /// The `/rate_limit` call itself does not count against the quota.
    pub fn check_quota(&self) -> Result<QuotaState, SyncError> {
        let url = self.endpoints.rate_limit();
        let response = self.send(&Request::api(url.clone()))?;
        let response = match self.classify(&url, response) {
            // GitHub Enterprise answers 404 when rate limiting is disabled.
            Err(SyncError::NotFound { .. }) => return Ok(QuotaState::unlimited()),
            other => other?,
        };
        let body: RateLimitResponse = response.json(&url)?;
        let quota = body
            .core()
            .map(QuotaState::from_resource)
            .or_else(|| QuotaState::from_headers(&response))
            .ok_or_else(|| SyncError::Status {
                url: url.clone(),
                status: response.status,
            })?;
        tracing::debug!("quota: {quota}");
        quota.ensure_available(self.authenticated)?;
        Ok(quota)
    }

    /// Initial quota check, retried like any other call.
    pub fn start_quota(&self) -> Result<QuotaState, SyncError> {
        let mut unused = QuotaState::unlimited();
        let done = retry(
            &self.policy,
            "quota check",
            &mut unused,
            |_| self.check_quota(),
            |_| Ok(()),
        )?;
        self.retries.set(self.retries.get() + done.attempts - 1);
        Ok(done.value)
    }

    fn recheck_quota(&self, quota: &mut QuotaState) -> Result<(), SyncError> {
        match self.check_quota() {
            Ok(fresh) => {
                *quota = fresh;
                Ok(())
            }
            Err(e) if e.is_transient() => {
                tracing::debug!("quota re-check failed, keeping last known state: {e}");
                quota.ensure_available(self.authenticated)
            }
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    fn send(&self, request: &Request) -> Result<HttpResponse, SyncError> {
        tracing::debug!("GET {}", request.url);
        self.transport
            .get(request)
            .map_err(|e| SyncError::Transport {
                url: request.url.clone(),
                message: e.0,
            })
    }

    /// Map non-success statuses onto the error taxonomy.
    fn classify(&self, url: &str, response: HttpResponse) -> Result<HttpResponse, SyncError> {
        if response.is_success() {
            return Ok(response);
        }
        if response.status == 404 {
            return Err(SyncError::NotFound {
                url: url.to_string(),
            });
        }
        if response.status == 401 {
            return Err(SyncError::Unauthorized {
                url: url.to_string(),
                authenticated: self.authenticated,
            });
        }
        if matches!(response.status, 403 | 429) {
            if let Some(quota) = QuotaState::from_headers(&response) {
                quota.ensure_available(self.authenticated)?;
            }
        }
        Err(SyncError::Status {
            url: url.to_string(),
            status: response.status,
        })
    }

    /// Send `request`, retrying transient failures under the policy.
    ///
    /// `decode` turns a successful response into the caller's value. A
    /// transient decode failure (malformed JSON, unreadable archive) is
    /// retried like a network error.
    pub fn fetch_with_retry<V>(
        &self,
        request: &Request,
        quota: &mut QuotaState,
        mut decode: impl FnMut(&HttpResponse) -> Result<V, SyncError>,
    ) -> Result<V, SyncError> {
        let done = retry(
            &self.policy,
            &request.url,
            quota,
            |quota| {
                let response = self.fetch_once(request, quota)?;
                decode(&response)
            },
            |quota| self.recheck_quota(quota),
        )?;
        self.retries.set(self.retries.get() + done.attempts - 1);
        Ok(done.value)
    }

    fn fetch_once(&self, request: &Request, quota: &mut QuotaState) -> Result<HttpResponse, SyncError> {
        let response = self.send(request)?;
        if let Some(fresh) = QuotaState::from_headers(&response) {
            *quota = fresh;
        }
        self.classify(&request.url, response)
    }

    /// Fetch and decode every page starting at `first_url`, following
    /// `Link: rel="next"` until it is absent or points at a page already seen.
    pub fn fetch_all_pages<I: DeserializeOwned>(
        &self,
        first_url: String,
        quota: &mut QuotaState,
    ) -> Result<Vec<I>, SyncError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(first_url);

        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                tracing::warn!("pagination loops back to {url}, stopping");
                break;
            }
            let (page, link) = self.fetch_with_retry(&Request::api(url.clone()), quota, |response| {
                let page: Vec<I> = response.json(&url)?;
                Ok((page, response.header("link").and_then(parse_next_link)))
            })?;
            items.extend(page);
            next = link;
        }

        tracing::debug!("fetched {} items over {} page(s)", items.len(), seen.len());
        Ok(items)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Every repository name of `owner`. Falls back to the user endpoint
    /// when `owner` is not an organization.
    pub fn list_repos(&self, owner: &str, quota: &mut QuotaState) -> Result<Vec<String>, SyncError> {
        let listing: Vec<RepoListing> =
            match self.fetch_all_pages(self.endpoints.org_repos(owner), quota) {
                Err(SyncError::NotFound { .. }) => {
                    tracing::debug!("{owner} is not an organization, listing as a user");
                    self.fetch_all_pages(self.endpoints.user_repos(owner), quota)?
                }
                other => other?,
            };
        Ok(listing.into_iter().map(|r| r.name).collect())
    }

    /// Every tag name of `target` (ref prefix stripped, unfiltered).
    pub fn list_tags(
        &self,
        target: &RepositoryTarget,
        quota: &mut QuotaState,
    ) -> Result<Vec<String>, SyncError> {
        let refs: Vec<GitRef> = match self.fetch_all_pages(self.endpoints.tag_refs(target), quota) {
            Err(SyncError::NotFound { .. }) => Vec::new(),
            other => other?,
        };
        Ok(refs
            .iter()
            .map(|r| tags::strip_ref_prefix(&r.git_ref).to_string())
            .collect())
    }

    /// Download and digest the source archive of `tag`. A download that
    /// does not unpack is retried like a network failure.
    pub fn digest_archive(
        &self,
        target: &RepositoryTarget,
        tag: &ReleaseTag,
        mode: DigestMode,
        quota: &mut QuotaState,
    ) -> Result<ArchiveDigest, SyncError> {
        let url = self.endpoints.archive(target, tag);
        self.fetch_with_retry(&Request::download(url.clone()), quota, |response| {
            tracing::debug!("downloaded {} bytes from {url}", response.body.len());
            digest::digest_archive(&response.body, mode).map_err(|e| SyncError::Archive {
                url: url.clone(),
                message: e.0,
            })
        })
    }
}
