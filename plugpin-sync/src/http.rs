//! Blocking HTTP transport.
//!
//! [`Transport`] is the seam between the pipeline and the network. The
//! production implementation is [`UreqTransport`]; tests script responses.

use std::io::Read;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::auth::Credentials;
use crate::error::SyncError;

/// `Accept` header for GitHub REST v3.
pub const GITHUB_JSON: &str = "application/vnd.github.v3+json";

/// Upper bound on a single response body.
const MAX_BODY_BYTES: u64 = 512 * 1024 * 1024;

/// What a request is for. Credentials are only attached to API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Api,
    Download,
}

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub kind: RequestKind,
}

impl Request {
    pub fn api(url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            kind: RequestKind::Api,
        }
    }

    pub fn download(url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            kind: RequestKind::Download,
        }
    }

    pub fn accept(&self) -> &'static str {
        match self.kind {
            RequestKind::Api => GITHUB_JSON,
            RequestKind::Download => "*/*",
        }
    }
}

/// A fully-read HTTP response. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SyncError> {
        serde_json::from_slice(&self.body).map_err(|source| SyncError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// The request could not be completed (DNS, TLS, connection reset, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

/// Something that can perform blocking GET requests.
pub trait Transport {
    /// Send `request`. Non-2xx statuses are `Ok` responses, not errors.
    fn get(&self, request: &Request) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, request: &Request) -> Result<HttpResponse, TransportError> {
        (**self).get(request)
    }
}

/// [`Transport`] backed by a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    authorization: Option<String>,
}

impl UreqTransport {
    pub fn new(user_agent: &str, credentials: Option<&Credentials>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(120))
            .build();
        UreqTransport {
            agent,
            authorization: credentials.map(Credentials::authorization),
        }
    }
}

impl Transport for UreqTransport {
    fn get(&self, request: &Request) -> Result<HttpResponse, TransportError> {
        let mut req = self.agent.get(&request.url).set("Accept", request.accept());
        if request.kind == RequestKind::Api {
            if let Some(auth) = &self.authorization {
                req = req.set("Authorization", auth);
            }
        }

        let response = match req.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => return Err(TransportError(t.to_string())),
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name.to_ascii_lowercase(), value))
            })
            .collect();

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| TransportError(format!("reading body: {e}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
