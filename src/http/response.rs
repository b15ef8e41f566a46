//! Response dispatch.
//!
//! # Responsibilities
//! - Turn a forwarding result into exactly one client response
//! - Relay streamed upstream bodies without buffering
//! - Map forwarding failures to status codes
//!
//! # Design Decisions
//! - JSON mode answers 200 unless `preserve_json_status` is set
//! - Hop-by-hop headers are dropped when a streamed response is rebuilt
//! - Upstream error statuses are relayed as-is, never turned into 500

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::config::DispatchConfig;
use crate::forward::{Fetched, FetchedBody, ForwardError, UpstreamBody};

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Writes forwarding results back to the client.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    preserve_json_status: bool,
    cache_control: Option<HeaderValue>,
}

impl Dispatcher {
    pub fn from_config(config: &DispatchConfig) -> Self {
        let cache_control = config.cache_max_age_secs.and_then(|secs| {
            HeaderValue::from_str(&format!("public, max-age={}", secs)).ok()
        });
        Self {
            preserve_json_status: config.preserve_json_status,
            cache_control,
        }
    }

    pub fn dispatch(&self, result: Result<Fetched, ForwardError>) -> Response {
        match result {
            Ok(fetched) => self.success(fetched),
            Err(err) => failure(err),
        }
    }

    fn success(&self, fetched: Fetched) -> Response {
        match fetched.body {
            FetchedBody::Json(value) => {
                let status = if self.preserve_json_status {
                    fetched.status
                } else {
                    StatusCode::OK
                };
                (status, Json(value)).into_response()
            }
            FetchedBody::Stream(stream) => {
                let mut response = Response::new(Body::from_stream(stream));
                *response.status_mut() = fetched.status;
                *response.headers_mut() = strip_hop_by_hop(fetched.headers);
                if let Some(value) = &self.cache_control {
                    response
                        .headers_mut()
                        .insert(header::CACHE_CONTROL, value.clone());
                }
                response
            }
        }
    }
}

fn failure(err: ForwardError) -> Response {
    match err {
        ForwardError::Rejected { .. } => (StatusCode::BAD_REQUEST, "Invalid URL").into_response(),
        ForwardError::Transport { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Proxy request failed: {}", err),
        )
            .into_response(),
        ForwardError::Status { status, body } => match body {
            UpstreamBody::Stream(stream) => (status, Body::from_stream(stream)).into_response(),
            UpstreamBody::Buffered(bytes) if bytes.is_empty() => {
                (status, "Request failed").into_response()
            }
            UpstreamBody::Buffered(bytes) => (status, bytes).into_response(),
        },
    }
}

/// Drop connection-scoped headers, plus any header named in `Connection`.
pub fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(named.iter()) {
        headers.remove(name);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::AttemptError;
    use axum::body::{to_bytes, Bytes};
    use futures_util::StreamExt;
    use std::time::Duration;

    fn stream_of(chunks: &'static [&'static str]) -> crate::forward::ByteStream {
        futures_util::stream::iter(chunks.iter().copied().map(|c| Ok(Bytes::from_static(c.as_bytes())))).boxed()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_json_mode_answers_200_by_default() {
        let fetched = Fetched {
            status: StatusCode::ACCEPTED,
            headers: HeaderMap::new(),
            body: FetchedBody::Json(serde_json::json!({"list": []})),
        };
        let response = Dispatcher::default().dispatch(Ok(fetched));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_string(response).await, r#"{"list":[]}"#);
    }

    #[tokio::test]
    async fn test_json_mode_can_preserve_status() {
        let dispatcher = Dispatcher::from_config(&DispatchConfig {
            preserve_json_status: true,
            cache_max_age_secs: None,
        });
        let fetched = Fetched {
            status: StatusCode::ACCEPTED,
            headers: HeaderMap::new(),
            body: FetchedBody::Json(serde_json::Value::Null),
        };
        assert_eq!(dispatcher.dispatch(Ok(fetched)).status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_stream_mode_relays_status_headers_and_bytes() {
        let dispatcher = Dispatcher::from_config(&DispatchConfig {
            preserve_json_status: false,
            cache_max_age_secs: Some(600),
        });
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        let fetched = Fetched {
            status: StatusCode::PARTIAL_CONTENT,
            headers,
            body: FetchedBody::Stream(stream_of(&["abc", "def"])),
        };

        let response = dispatcher.dispatch(Ok(fetched));
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "video/mp4");
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=600"
        );
        assert_eq!(body_string(response).await, "abcdef");
    }

    #[tokio::test]
    async fn test_failures_map_to_statuses() {
        let dispatcher = Dispatcher::default();

        let rejected = dispatcher.dispatch(Err(ForwardError::Rejected {
            url: "http://127.0.0.1/".into(),
        }));
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let transport = dispatcher.dispatch(Err(ForwardError::Transport {
            attempts: 3,
            cause: AttemptError::TimedOut(Duration::from_millis(5)),
        }));
        assert_eq!(transport.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = body_string(transport).await;
        assert!(message.contains("3 attempt(s)"), "{message}");

        let streamed = dispatcher.dispatch(Err(ForwardError::Status {
            status: StatusCode::NOT_FOUND,
            body: UpstreamBody::Stream(stream_of(&["missing"])),
        }));
        assert_eq!(streamed.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(streamed).await, "missing");

        let empty = dispatcher.dispatch(Err(ForwardError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: UpstreamBody::Buffered(Bytes::new()),
        }));
        assert_eq!(empty.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_string(empty).await, "Request failed");

        let buffered = dispatcher.dispatch(Err(ForwardError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: UpstreamBody::Buffered(Bytes::from_static(br#"{"err":1}"#)),
        }));
        assert_eq!(buffered.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(buffered).await, r#"{"err":1}"#);
    }

    #[test]
    fn test_strip_hop_by_hop_honours_connection_list() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session", HeaderValue::from_static("1"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));

        let out = strip_hop_by_hop(headers);
        assert_eq!(out.len(), 1);
        assert!(out.contains_key(header::CONTENT_LENGTH));
    }
}
