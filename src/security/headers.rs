//! Response header sanitization.
//!
//! # Responsibilities
//! - Strip headers that would let an arbitrary upstream override the
//!   proxy's own security posture (CSP, frame options, CORS origin)
//! - Strip upstream cookie state
//!
//! # Design Decisions
//! - Names are compared as `HeaderName`, which is always lowercase, so
//!   matching is case-insensitive
//! - The input map is never modified; callers get a filtered copy

use axum::http::{HeaderMap, HeaderName};

use crate::config::SecurityConfig;

/// Header names removed from every upstream response before relay.
#[derive(Debug, Clone)]
pub struct HeaderFilterList {
    names: Vec<HeaderName>,
}

impl HeaderFilterList {
    /// Build from raw names. Names that are not valid header names are skipped;
    /// config validation reports them before this point.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .filter_map(|n| HeaderName::from_bytes(n.as_ref().trim().as_bytes()).ok())
            .collect();
        Self { names }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.stripped_response_headers)
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.names.contains(name)
    }

    /// Copy `headers`, dropping every filtered name. All values of a
    /// multi-valued header are kept for names that are not filtered.
    pub fn sanitize(&self, headers: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if !self.contains(name) {
                out.append(name.clone(), value.clone());
            }
        }
        out
    }
}

impl Default for HeaderFilterList {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}
