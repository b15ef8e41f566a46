//! Forwarding proxy for video-site APIs and media streams.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /proxy/{url}          GET /api/search | /api/detail
//!            │                              │
//!            │                     ┌────────▼────────┐
//!            │                     │    aggregate    │  site registry →
//!            │                     │    composer     │  upstream URL
//!            │                     └────────┬────────┘
//!            ▼                              ▼
//!     ┌──────────────────────────────────────────────┐
//!     │                   forward                     │
//!     │  url_guard ─▶ fetcher (retry) ─▶ headers      │◀────▶ Upstream
//!     └──────────────────────┬───────────────────────┘
//!                            ▼
//!                  http::response (dispatch)
//!                            │
//!                            ▼
//!                    JSON document | byte stream
//! ```
//!
//! Cross-cutting: `config`, `observability`, `resilience`, `lifecycle`.

// Core subsystems
pub mod aggregate;
pub mod config;
pub mod forward;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
