//! Upstream fetch with bounded retry.
//!
//! # Responsibilities
//! - Pick JSON or stream mode for a target
//! - Issue the GET with the synthetic User-Agent and chosen Accept value
//! - Re-issue on transport failure or timeout, up to the retry bound
//! - Re-check every redirect hop against the URL policy
//!
//! # Design Decisions
//! - Callers validate the target first; the fetcher only checks redirect
//!   hops. A hop that fails the policy ends the fetch as
//!   [`ForwardError::Rejected`] and is never retried
//! - JSON bodies are read inside the attempt, so a body that stalls past the
//!   deadline is retried like any other timeout
//! - Stream bodies are handed back unread; only the response head is
//!   bounded by the deadline

use std::error::Error as _;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use futures_util::StreamExt;
use reqwest::redirect;
use serde_json::Value;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::forward::error::{ForwardError, UpstreamBody};
use crate::forward::ForwardRequest;
use crate::observability::metrics;
use crate::resilience::{retry, with_timeout, AttemptError, Exhausted, RetryPolicy};
use crate::security::SafetyPolicy;

pub use crate::forward::error::ByteStream;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// How the upstream body is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Buffer and parse, answer with a JSON document.
    Json,
    /// Relay bytes as they arrive.
    Stream,
}

/// Body of a successful fetch.
pub enum FetchedBody {
    Json(Value),
    Stream(ByteStream),
}

impl std::fmt::Debug for FetchedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchedBody::Json(v) => f.debug_tuple("Json").field(v).finish(),
            FetchedBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A 2xx upstream response.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: FetchedBody,
}

/// A redirect hop refused by the URL policy.
#[derive(Debug, Error)]
#[error("redirect to {0} rejected")]
struct RedirectRejected(String);

/// Raw result of one attempt, before the status is inspected.
struct Attempted {
    status: StatusCode,
    headers: HeaderMap,
    body: UpstreamBody,
}

/// Issues upstream GETs. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    api_markers: Vec<String>,
    json_accept: HeaderValue,
    stream_accept: HeaderValue,
}

impl Fetcher {
    /// `policy` is applied to every redirect hop the client would follow.
    pub fn new(
        config: &UpstreamConfig,
        retry: RetryPolicy,
        policy: SafetyPolicy,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy(policy));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            retry,
            api_markers: config
                .api_path_markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
            json_accept: HeaderValue::from_str(&config.json_accept)
                .unwrap_or_else(|_| HeaderValue::from_static("application/json")),
            stream_accept: HeaderValue::from_str(&config.stream_accept)
                .unwrap_or_else(|_| HeaderValue::from_static("*/*")),
        })
    }

    /// JSON when the target contains an API path marker or the caller asked
    /// for `application/json`; stream otherwise.
    pub fn mode_for(&self, target: &str, accept: Option<&HeaderValue>) -> ResponseMode {
        let api_target = self.api_markers.iter().any(|m| target.contains(m.as_str()));
        let wants_json = accept
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if api_target || wants_json {
            ResponseMode::Json
        } else {
            ResponseMode::Stream
        }
    }

    /// Fetch `request.target`, retrying transport failures.
    ///
    /// Only connection errors and timeouts are retried. Any upstream answer,
    /// 2xx or not, ends the loop: a non-2xx status is returned as
    /// [`ForwardError::Status`] from the attempt that produced it, so a
    /// [`ForwardError::Transport`] never carries an upstream status.
    pub async fn fetch(&self, request: &ForwardRequest) -> Result<Fetched, ForwardError> {
        let mode = self.mode_for(&request.target, request.accept.as_ref());
        let accept = request
            .accept
            .clone()
            .unwrap_or_else(|| match mode {
                ResponseMode::Json => self.json_accept.clone(),
                ResponseMode::Stream => self.stream_accept.clone(),
            });
        let url = request.target.as_str();

        let outcome = retry(
            &self.retry,
            |attempt| {
                let accept = accept.clone();
                async move {
                    tracing::debug!(url, attempt, ?mode, "Fetching upstream");
                    with_timeout(self.retry.attempt_timeout, self.attempt(url, accept, mode)).await
                }
            },
            |error| rejected_redirect(error).is_none(),
        )
        .await;

        let attempted = match outcome {
            Ok(attempted) => attempted,
            Err(Exhausted { error, attempts }) => {
                if let Some(hop) = rejected_redirect(&error) {
                    tracing::warn!(url, redirect = %hop, "Rejected redirect target");
                    metrics::record_rejected();
                    return Err(ForwardError::Rejected { url: hop });
                }
                tracing::error!(url, attempts, error = %error, "Upstream request failed");
                return Err(ForwardError::Transport {
                    attempts,
                    cause: error,
                });
            }
        };

        let Attempted {
            status,
            headers,
            body,
        } = attempted;

        if !status.is_success() {
            tracing::warn!(url, status = %status, "Upstream returned error status");
            return Err(ForwardError::Status { status, body });
        }

        let body = match body {
            UpstreamBody::Buffered(bytes) => FetchedBody::Json(parse_json(&bytes)),
            UpstreamBody::Stream(stream) => FetchedBody::Stream(stream),
        };

        tracing::debug!(url, status = %status, "Upstream responded");
        Ok(Fetched {
            status,
            headers,
            body,
        })
    }

    async fn attempt(
        &self,
        url: &str,
        accept: HeaderValue,
        mode: ResponseMode,
    ) -> Result<Attempted, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = match mode {
            ResponseMode::Json => UpstreamBody::Buffered(response.bytes().await?),
            ResponseMode::Stream => UpstreamBody::Stream(response.bytes_stream().boxed()),
        };

        Ok(Attempted {
            status,
            headers,
            body,
        })
    }
}

/// Follow at most [`MAX_REDIRECTS`] hops, each of which must pass `policy`.
fn redirect_policy(policy: SafetyPolicy) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if policy.validate(attempt.url().as_str()) {
            attempt.follow()
        } else {
            let hop = attempt.url().to_string();
            attempt.error(RedirectRejected(hop))
        }
    })
}

/// The refused hop, when `error` came from the redirect policy.
fn rejected_redirect(error: &AttemptError<reqwest::Error>) -> Option<String> {
    let AttemptError::Failed(error) = error else {
        return None;
    };
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(RedirectRejected(hop)) = cause.downcast_ref::<RedirectRejected>() {
            return Some(hop.clone());
        }
        source = cause.source();
    }
    None
}

/// Parse a JSON body. A body that is not JSON is kept as a JSON string.
fn parse_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
