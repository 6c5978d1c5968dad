//! Outbound HTTP policy (destination checks, response limits, redaction).
//!
//! The CLI runs with [`OutboundPolicy::permissive`] unless the operator narrows it; the
//! restricted preset is meant for hosting the invoker next to untrusted tool callers.

use crate::runtime::HttpToolsError;
use std::collections::HashSet;
use std::net::IpAddr;
use tokio::net::lookup_host;
use url::Url;

#[derive(Debug, Clone)]
pub struct OutboundPolicy {
    /// If set, only these hosts are allowed (compared lower-cased).
    pub allowed_hosts: Option<HashSet<String>>,
    /// Reject loopback, private, link-local and reserved destinations.
    pub block_private_networks: bool,
    /// Maximum response body size in bytes. `None` = unlimited.
    pub max_response_bytes: Option<usize>,
    pub follow_redirects: bool,
}

impl Default for OutboundPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

impl OutboundPolicy {
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allowed_hosts: None,
            block_private_networks: false,
            max_response_bytes: None,
            follow_redirects: true,
        }
    }

    #[must_use]
    pub fn restricted() -> Self {
        Self {
            allowed_hosts: None,
            block_private_networks: true,
            max_response_bytes: Some(1024 * 1024),
            follow_redirects: false,
        }
    }

    /// Restrict destinations to the given hosts.
    #[must_use]
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: HashSet<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self.allowed_hosts = (!set.is_empty()).then_some(set);
        self
    }

    /// Validate a destination before sending.
    ///
    /// # Errors
    ///
    /// Returns [`HttpToolsError::Http`] if the scheme is not `http(s)`, the host is not
    /// allowlisted, or (when private networks are blocked) the host is or resolves to a blocked
    /// address.
    pub async fn check_url(&self, url: &Url) -> Result<(), HttpToolsError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpToolsError::Http(format!(
                "Outbound HTTP blocked: unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| HttpToolsError::Http("Outbound HTTP blocked: missing URL host".into()))?;

        if let Some(allowed) = &self.allowed_hosts
            && !allowed.contains(&host.to_ascii_lowercase())
        {
            return Err(HttpToolsError::Http(format!(
                "Outbound HTTP blocked: host '{host}' not in allowlist"
            )));
        }

        if !self.block_private_networks {
            return Ok(());
        }

        let literal = host.trim_start_matches('[').trim_end_matches(']');
        let candidates: Vec<IpAddr> = if let Ok(ip) = literal.parse::<IpAddr>() {
            vec![ip]
        } else {
            let port = url.port_or_known_default().unwrap_or(443);
            lookup_host((host, port))
                .await
                .map_err(|e| HttpToolsError::Http(format!("DNS lookup failed for '{host}': {e}")))?
                .map(|addr| addr.ip())
                .collect()
        };

        if candidates.is_empty() {
            return Err(HttpToolsError::Http(format!(
                "DNS lookup returned no addresses for '{host}'"
            )));
        }

        if let Some(ip) = candidates.into_iter().find(|ip| is_blocked_ip(*ip)) {
            return Err(HttpToolsError::Http(format!(
                "Outbound HTTP blocked: '{host}' resolves to disallowed address {ip}"
            )));
        }

        Ok(())
    }
}

/// Drop credentials, query and fragment so a URL is safe to log.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let msg = e.to_string();
    match e.url() {
        Some(u) => msg.replace(u.as_str(), &redact_url(u)),
        None => msg,
    }
}

fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_multicast()
                // CGNAT 100.64.0.0/10
                || (a == 100 && (64..=127).contains(&b))
                || a >= 240
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
        }
    }
}
