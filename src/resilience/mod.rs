//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On transport failure or timeout: retries.rs (re-issue, bounded)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound attempt has a deadline
//! - Only GET is ever forwarded, so every attempt is safe to repeat
//! - An upstream that answers with any status is not retried

pub mod retries;
pub mod timeouts;

pub use retries::{retry, Exhausted, RetryPolicy};
pub use timeouts::{with_timeout, AttemptError};
