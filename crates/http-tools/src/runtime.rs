//! Invocation executor.
//!
//! [`HttpInvoker`] sends one [`PlannedRequest`] and hands back the raw response. It never
//! retries; retry and backoff belong to whoever drives it.

use crate::request::PlannedRequest;
use crate::safety::{OutboundPolicy, redact_url, sanitize_reqwest_error};
use mime::Mime;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum HttpToolsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// Raw outcome of a successful (non-4xx/5xx) call.
#[derive(Debug, Clone)]
pub struct InvocationResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl InvocationResponse {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.parse::<Mime>().ok())
            .is_some_and(|m| {
                m.subtype() == mime::JSON || m.suffix().is_some_and(|s| s == mime::JSON)
            })
    }
}

#[derive(Clone)]
pub struct HttpInvoker {
    client: Client,
    timeout: Option<Duration>,
    policy: OutboundPolicy,
}

impl HttpInvoker {
    /// Invoker with a per-call timeout and a permissive outbound policy.
    ///
    /// A zero timeout disables the per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::new_with_policy(timeout, OutboundPolicy::permissive())
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built for the requested policy.
    pub fn new_with_policy(timeout: Duration, policy: OutboundPolicy) -> Result<Self> {
        let client = if policy.follow_redirects {
            Client::new()
        } else {
            Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(|e| HttpToolsError::Config(sanitize_reqwest_error(&e)))?
        };

        Ok(Self {
            client,
            timeout: (!timeout.is_zero()).then_some(timeout),
            policy,
        })
    }

    /// Send `request` once.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or blocked by policy, the transport fails or times
    /// out, the response exceeds the size limit, or the server answers with a 4xx/5xx status.
    pub async fn invoke(&self, request: &PlannedRequest) -> Result<InvocationResponse> {
        let url = Url::parse(&request.url)
            .map_err(|e| HttpToolsError::Http(format!("Invalid URL '{}': {e}", request.url)))?;
        self.policy.check_url(&url).await?;

        debug!(
            method = %request.method,
            url = %redact_url(&url),
            "executing API request"
        );

        let mut builder = self.client.request(request.method.to_reqwest(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = read_body_limited(response, self.policy.max_response_bytes).await?;

        if status.is_client_error() || status.is_server_error() {
            let reason = status.canonical_reason().unwrap_or("Unknown");
            return Err(HttpToolsError::Http(format!(
                "API returned {} {reason}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(InvocationResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>> {
    let Some(max) = max_bytes else {
        return Ok(response.bytes().await?.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(HttpToolsError::Http(format!(
            "Response too large: {len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(HttpToolsError::Http(format!(
                "Response too large: exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}
