//! Forwarding failures.

use std::fmt;

use axum::body::Bytes;
use axum::http::StatusCode;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::resilience::AttemptError;

/// Live upstream body, relayed chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Upstream body as read by one attempt.
pub enum UpstreamBody {
    /// Read fully (JSON mode).
    Buffered(Bytes),
    /// Not yet read (stream mode).
    Stream(ByteStream),
}

impl fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamBody::Buffered(bytes) => f
                .debug_tuple("Buffered")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            UpstreamBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Every way a forwarded request can fail.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The target failed the URL policy. No upstream call was made.
    #[error("target URL rejected: {url}")]
    Rejected { url: String },

    /// No attempt produced an upstream response.
    #[error("upstream request failed after {attempts} attempt(s): {cause}")]
    Transport {
        attempts: u32,
        #[source]
        cause: AttemptError<reqwest::Error>,
    },

    /// The upstream answered with a non-2xx status.
    #[error("upstream responded with {status}")]
    Status {
        status: StatusCode,
        body: UpstreamBody,
    },
}
