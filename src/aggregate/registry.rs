//! Site registry.
//!
//! Read-only mapping of site key → API base URL, loaded once from a TOML
//! data file. Operation path templates are registry-wide and a site may
//! override either of them. `Accept` is the only template header sent
//! upstream, so any other header name is refused at load time.
//!
//! ```toml
//! default = "heimuer"
//!
//! [operations.search]
//! path = "?ac=videolist&wd="
//! headers = { Accept = "application/json" }
//!
//! [sites.heimuer]
//! name = "Heimuer"
//! api = "https://json.heimuer.xyz/api.php/provide/vod"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::composer::Operation;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("default site `{0}` is not defined in [sites]")]
    UnknownDefault(String),

    #[error("site `{0}` has an empty api base URL")]
    EmptyApi(String),

    #[error("{scope}: header `{name}` is not supported, only Accept is sent")]
    UnsupportedHeader { scope: String, name: String },
}

/// Path template and request headers for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OperationTemplate {
    /// Appended to the site's API base, followed by the encoded parameter.
    pub path: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl OperationTemplate {
    fn json(path: &str) -> Self {
        Self {
            path: path.to_string(),
            headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
        }
    }

    /// Value of the `Accept` header, matched case-insensitively.
    pub fn accept(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("accept"))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Operations {
    pub search: OperationTemplate,
    pub detail: OperationTemplate,
}

impl Default for Operations {
    fn default() -> Self {
        Self {
            search: OperationTemplate::json("?ac=videolist&wd="),
            detail: OperationTemplate::json("?ac=videolist&ids="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteEntry {
    /// Display name.
    pub name: String,

    /// API base URL.
    pub api: String,

    #[serde(default)]
    pub search: Option<OperationTemplate>,

    #[serde(default)]
    pub detail: Option<OperationTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SiteRegistry {
    /// Key of the entry used when no site, or an unknown site, is requested.
    pub default: String,

    #[serde(default)]
    pub operations: Operations,

    pub sites: BTreeMap<String, SiteEntry>,
}

impl SiteRegistry {
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        let registry: SiteRegistry = toml::from_str(content)?;
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if !self.sites.contains_key(&self.default) {
            return Err(RegistryError::UnknownDefault(self.default.clone()));
        }
        if let Some((key, _)) = self.sites.iter().find(|(_, s)| s.api.trim().is_empty()) {
            return Err(RegistryError::EmptyApi(key.clone()));
        }

        let registry_wide = [
            ("operations.search".to_string(), &self.operations.search),
            ("operations.detail".to_string(), &self.operations.detail),
        ];
        let overrides = self.sites.iter().flat_map(|(key, site)| {
            [
                (format!("sites.{key}.search"), site.search.as_ref()),
                (format!("sites.{key}.detail"), site.detail.as_ref()),
            ]
            .into_iter()
            .filter_map(|(scope, template)| template.map(|t| (scope, t)))
        });
        for (scope, template) in registry_wide.into_iter().chain(overrides) {
            if let Some(name) = template.headers.keys().find(|n| !n.eq_ignore_ascii_case("accept")) {
                return Err(RegistryError::UnsupportedHeader {
                    scope,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Single-site registry used when no registry file is configured.
    pub fn builtin() -> Self {
        let site = SiteEntry {
            name: "Heimuer".to_string(),
            api: "https://json.heimuer.xyz/api.php/provide/vod".to_string(),
            search: None,
            detail: None,
        };
        Self {
            default: "heimuer".to_string(),
            operations: Operations::default(),
            sites: BTreeMap::from([("heimuer".to_string(), site)]),
        }
    }

    /// Look up `name`, falling back to the default entry when it is absent
    /// or unknown. Returns the key that was actually used.
    pub fn resolve(&self, name: Option<&str>) -> Option<(&str, &SiteEntry)> {
        name.and_then(|n| self.sites.get_key_value(n))
            .or_else(|| self.sites.get_key_value(&self.default))
            .map(|(key, site)| (key.as_str(), site))
    }

    /// Template for `op`, preferring the site's own override.
    pub fn template<'a>(&'a self, site: Option<&'a SiteEntry>, op: Operation) -> &'a OperationTemplate {
        let own = site.and_then(|s| match op {
            Operation::Search => s.search.as_ref(),
            Operation::Detail => s.detail.as_ref(),
        });
        own.unwrap_or(match op {
            Operation::Search => &self.operations.search,
            Operation::Detail => &self.operations.detail,
        })
    }
}
