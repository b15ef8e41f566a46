//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign request ID)
//!     → handlers.rs (extract target or aggregation params)
//!     → forward / aggregate (validate, fetch, sanitize)
//!     → response.rs (JSON document, byte stream, or error status)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::Dispatcher;
pub use server::{AppState, HttpServer};
