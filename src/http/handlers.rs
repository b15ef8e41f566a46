//! Route handlers.

use std::time::Instant;

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use crate::aggregate::{AggregateQuery, Operation};
use crate::forward::ForwardRequest;
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /proxy/{*target}`
///
/// `target` arrives percent-decoded. A query string left unencoded by the
/// client lands in the proxy's own query and is re-attached.
pub async fn proxy(
    State(state): State<AppState>,
    Path(target): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let target = join_query(target, query.as_deref());
    let accept = headers.get(header::ACCEPT).cloned();

    let result = state
        .forwarder
        .forward(ForwardRequest::new(target, accept))
        .await;
    let response = state.dispatcher.dispatch(result);

    metrics::record_request("proxy", response.status().as_u16(), start);
    response
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub wd: String,
    pub source: Option<String>,
    #[serde(rename = "customApi")]
    pub custom_api: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    #[serde(default)]
    pub id: String,
    pub source: Option<String>,
    #[serde(rename = "customApi")]
    pub custom_api: Option<String>,
}

/// `GET /api/search`
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let query = AggregateQuery {
        value: params.wd,
        source: params.source,
        custom_api: params.custom_api,
    };
    aggregate(state, Operation::Search, query).await
}

/// `GET /api/detail`
pub async fn detail(State(state): State<AppState>, Query(params): Query<DetailParams>) -> Response {
    let query = AggregateQuery {
        value: params.id,
        source: params.source,
        custom_api: params.custom_api,
    };
    aggregate(state, Operation::Detail, query).await
}

async fn aggregate(state: AppState, op: Operation, query: AggregateQuery) -> Response {
    let start = Instant::now();
    let response = match state.composer.compose(op, &query).await {
        Ok(document) => Json(document).into_response(),
        Err(envelope) => (envelope.status(), Json(envelope)).into_response(),
    };
    metrics::record_request(op.as_str(), response.status().as_u16(), start);
    response
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn join_query(target: String, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(q) if target.contains('?') => format!("{}&{}", target, q),
        Some(q) => format!("{}?{}", target, q),
        None => target,
    }
}
