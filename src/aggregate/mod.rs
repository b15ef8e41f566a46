//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! /api/search?wd=..&source=..&customApi=..
//! /api/detail?id=..&source=..&customApi=..
//!     → composer.rs (resolve base URL, append path template + encoded value)
//!     → forward::Forwarder (validate → fetch → sanitize), called in-process
//!     → upstream JSON document, or ErrorEnvelope {code, msg, error}
//! ```
//!
//! # Design Decisions
//! - The registry is plain data loaded once at startup and never mutated
//! - No second copy of forwarding logic; the composer only builds URLs

pub mod composer;
pub mod registry;

pub use composer::{AggregateQuery, Composer, ErrorEnvelope, Operation};
pub use registry::{OperationTemplate, RegistryError, SiteEntry, SiteRegistry};
