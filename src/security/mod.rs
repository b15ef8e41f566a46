//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied target URL:
//!     → url_guard.rs (scheme allow-list, denied hosts and prefixes)
//!     → Pass to fetcher
//!
//! Upstream response:
//!     → headers.rs (strip configured header names)
//!     → Pass to dispatcher
//! ```
//!
//! # Design Decisions
//! - Fail closed: a target that does not parse is rejected
//! - Both policies are immutable after startup and shared without locks
//! - No trust in client input

pub mod headers;
pub mod url_guard;

pub use headers::HeaderFilterList;
pub use url_guard::SafetyPolicy;
