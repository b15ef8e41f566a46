//! Aggregation composer.
//!
//! Builds an upstream API URL from the site registry and runs it through the
//! same forwarding pipeline a `/proxy/*` request uses. Every failure comes
//! back as one [`ErrorEnvelope`] shape.

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::registry::SiteRegistry;
use crate::forward::{FetchedBody, ForwardRequest, Forwarder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Detail,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Detail => "detail",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Operation::Search => "Search request failed",
            Operation::Detail => "Detail request failed",
        }
    }

    fn missing_message(self) -> &'static str {
        match self {
            Operation::Search => "Missing search keyword",
            Operation::Detail => "Missing video id",
        }
    }
}

/// Caller-supplied aggregation parameters.
#[derive(Debug, Clone, Default)]
pub struct AggregateQuery {
    /// Search keyword or detail id.
    pub value: String,
    /// Site key in the registry.
    pub source: Option<String>,
    /// API base overriding the registry lookup.
    pub custom_api: Option<String>,
}

/// Uniform failure body for aggregation callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorEnvelope {
    fn bad_request(msg: &str) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST.as_u16(),
            msg: msg.to_string(),
            error: None,
        }
    }

    fn failed(op: Operation, error: impl ToString) -> Self {
        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            msg: op.failure_message().to_string(),
            error: Some(error.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Resolves registry URLs and delegates them to the forwarder.
#[derive(Debug, Clone)]
pub struct Composer {
    registry: Arc<SiteRegistry>,
    forwarder: Arc<Forwarder>,
}

impl Composer {
    pub fn new(registry: Arc<SiteRegistry>, forwarder: Arc<Forwarder>) -> Self {
        Self {
            registry,
            forwarder,
        }
    }

    /// Build the upstream request for `op`.
    ///
    /// Base URL precedence: `custom_api`, then the named site, then the
    /// registry default.
    pub fn build_request(
        &self,
        op: Operation,
        query: &AggregateQuery,
    ) -> Result<ForwardRequest, ErrorEnvelope> {
        let custom = query.custom_api.as_deref().filter(|api| !api.trim().is_empty());

        let (base, site) = match custom {
            Some(api) => (api, None),
            None => {
                let (_, site) = self
                    .registry
                    .resolve(query.source.as_deref())
                    .ok_or_else(|| ErrorEnvelope::failed(op, "no site configured"))?;
                (site.api.as_str(), Some(site))
            }
        };

        let template = self.registry.template(site, op);
        let url = format!(
            "{}{}{}",
            base,
            template.path,
            urlencoding::encode(&query.value)
        );
        let accept = template
            .accept()
            .and_then(|v| HeaderValue::from_str(v).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));

        Ok(ForwardRequest::new(url, Some(accept)))
    }

    /// Run `op` and return the upstream JSON document.
    pub async fn compose(&self, op: Operation, query: &AggregateQuery) -> Result<Value, ErrorEnvelope> {
        check_value(op, &query.value)?;
        let request = self.build_request(op, query)?;

        tracing::info!(
            operation = op.as_str(),
            source = query.source.as_deref().unwrap_or("default"),
            url = %request.target,
            "Aggregation request"
        );

        match self.forwarder.forward(request).await {
            Ok(fetched) => match fetched.body {
                FetchedBody::Json(value) => Ok(value),
                FetchedBody::Stream(_) => Err(ErrorEnvelope::failed(
                    op,
                    "upstream did not return a JSON document",
                )),
            },
            Err(err) => {
                tracing::warn!(operation = op.as_str(), error = %err, "Aggregation request failed");
                Err(ErrorEnvelope::failed(op, err))
            }
        }
    }
}

fn check_value(op: Operation, value: &str) -> Result<(), ErrorEnvelope> {
    if value.trim().is_empty() {
        return Err(ErrorEnvelope::bad_request(op.missing_message()));
    }
    let valid_id = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if op == Operation::Detail && !valid_id {
        return Err(ErrorEnvelope::bad_request("Invalid video id"));
    }
    Ok(())
}
