//! Target URL safety policy.
//!
//! Every proxied target passes through [`SafetyPolicy::validate`] before any
//! outbound connection is attempted.
//!
//! Hostname checks are string based: an exact-match deny list plus a
//! `starts_with` prefix list. The prefix list is plain string matching, not
//! CIDR matching. With the default prefixes `172.` denies the whole
//! `172.0.0.0/8`, not just `172.16.0.0/12`, and link-local `169.254.` is
//! allowed unless configured.

use url::{Host, Url};

use crate::config::SecurityConfig;

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Immutable URL policy shared by every request.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    denied_hosts: Vec<String>,
    denied_prefixes: Vec<String>,
}

impl SafetyPolicy {
    pub fn new<H, P>(denied_hosts: H, denied_prefixes: P) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            denied_hosts: denied_hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
            denied_prefixes: denied_prefixes
                .into_iter()
                .map(|p| p.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            config.denied_hosts.iter().cloned(),
            config.denied_host_prefixes.iter().cloned(),
        )
    }

    /// Returns `true` when `raw` is an absolute http(s) URL whose host is not denied.
    ///
    /// Parse failures are an ordinary `false`.
    pub fn validate(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return false;
        }
        let Some(host) = hostname(&url) else {
            return false;
        };

        if self.denied_hosts.iter().any(|denied| denied_matches(denied, &host)) {
            return false;
        }
        !self
            .denied_prefixes
            .iter()
            .any(|prefix| host.starts_with(prefix.as_str()))
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

/// Host as compared against the deny lists. IPv6 literals lose their brackets.
fn hostname(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_ascii_lowercase()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

fn denied_matches(denied: &str, host: &str) -> bool {
    let denied = denied
        .strip_prefix('[')
        .and_then(|d| d.strip_suffix(']'))
        .unwrap_or(denied);
    denied == host
}
