//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Outbound request settings.
    pub upstream: UpstreamConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Target URL policy and response header filtering.
    pub security: SecurityConfig,

    /// How fetched responses are written back to the client.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Path to the site registry TOML. The built-in registry is used when unset.
    pub sites_path: Option<PathBuf>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Outbound request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Synthetic User-Agent sent on every upstream request.
    pub user_agent: String,

    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,

    /// URL fragments that mark a target as a JSON API endpoint.
    pub api_path_markers: Vec<String>,

    /// Accept header used in JSON mode when the caller sent none.
    pub json_accept: String,

    /// Accept header used in stream mode when the caller sent none.
    pub stream_accept: String,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` for outbound requests.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
            timeout_ms: 5000,
            api_path_markers: vec!["/api.php".to_string()],
            json_accept: "application/json".to_string(),
            stream_accept: "*/*".to_string(),
            use_system_proxy: true,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one fails at the transport level.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

/// Target URL policy and header filter list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Hostnames rejected on exact match.
    pub denied_hosts: Vec<String>,

    /// Hostname prefixes rejected on `starts_with`.
    pub denied_host_prefixes: Vec<String>,

    /// Response headers removed before relay (case-insensitive).
    pub stripped_response_headers: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            denied_hosts: ["localhost", "127.0.0.1", "0.0.0.0", "::1"]
                .into_iter()
                .map(String::from)
                .collect(),
            denied_host_prefixes: ["192.168.", "10.", "172."]
                .into_iter()
                .map(String::from)
                .collect(),
            stripped_response_headers: [
                "content-security-policy",
                "cookie",
                "set-cookie",
                "x-frame-options",
                "access-control-allow-origin",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Response dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Answer JSON-mode requests with the upstream status instead of 200.
    pub preserve_json_status: bool,

    /// When set, streamed responses carry `Cache-Control: public, max-age=N`.
    pub cache_max_age_secs: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
