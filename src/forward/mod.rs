//! Forwarding core.
//!
//! # Data Flow
//! ```text
//! ForwardRequest (target URL, caller Accept)
//!     → security::url_guard (reject unsafe targets, no upstream call)
//!     → fetcher.rs (GET with bounded retry, JSON or stream mode,
//!                   redirect hops re-checked against url_guard)
//!     → security::headers (strip configured response headers)
//!     → Fetched | ForwardError, handed to http::response for dispatch
//! ```
//!
//! # Design Decisions
//! - One pipeline serves both `/proxy/*` and the aggregation endpoints;
//!   aggregation calls [`Forwarder::forward`] in-process
//! - Stateless per request: nothing here is mutated after construction

pub mod error;
pub mod fetcher;

use axum::http::HeaderValue;

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::security::{HeaderFilterList, SafetyPolicy};

pub use error::{ForwardError, UpstreamBody};
pub use fetcher::{ByteStream, Fetched, FetchedBody, Fetcher, ResponseMode};

/// One proxied request. Lives for a single inbound call.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// Untrusted, caller-supplied target URL.
    pub target: String,
    /// Caller's Accept header, if any.
    pub accept: Option<HeaderValue>,
}

impl ForwardRequest {
    pub fn new(target: impl Into<String>, accept: Option<HeaderValue>) -> Self {
        Self {
            target: target.into(),
            accept,
        }
    }
}

/// Validate → fetch → sanitize.
#[derive(Debug, Clone)]
pub struct Forwarder {
    policy: SafetyPolicy,
    fetcher: Fetcher,
    filter: HeaderFilterList,
}

impl Forwarder {
    pub fn new(policy: SafetyPolicy, fetcher: Fetcher, filter: HeaderFilterList) -> Self {
        Self {
            policy,
            fetcher,
            filter,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let retry = RetryPolicy::from_config(&config.retries, &config.upstream);
        let policy = SafetyPolicy::from_config(&config.security);
        Ok(Self::new(
            policy.clone(),
            Fetcher::new(&config.upstream, retry, policy)?,
            HeaderFilterList::from_config(&config.security),
        ))
    }

    pub async fn forward(&self, request: ForwardRequest) -> Result<Fetched, ForwardError> {
        if !self.policy.validate(&request.target) {
            tracing::warn!(url = %request.target, "Rejected target URL");
            metrics::record_rejected();
            return Err(ForwardError::Rejected {
                url: request.target,
            });
        }

        let mut fetched = self.fetcher.fetch(&request).await?;
        fetched.headers = self.filter.sanitize(&fetched.headers);
        Ok(fetched)
    }
}
