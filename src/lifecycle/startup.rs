//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Load the site registry
//! - Build the server from both
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind last, after every component is built

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::aggregate::{RegistryError, SiteRegistry};
use crate::config::{load_config, load_from_env, ConfigError, ProxyConfig};
use crate::http::HttpServer;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("site registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration from `path` if given, otherwise defaults; env overrides apply to both.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, StartupError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    Ok(config)
}

/// Registry named by the config, or the built-in one.
pub fn load_registry(config: &ProxyConfig) -> Result<SiteRegistry, StartupError> {
    match &config.sites_path {
        Some(path) => {
            let registry = SiteRegistry::load(path)?;
            tracing::info!(
                path = %path.display(),
                sites = registry.sites.len(),
                default = %registry.default,
                "Site registry loaded"
            );
            Ok(registry)
        }
        None => {
            tracing::info!("No site registry configured, using built-in registry");
            Ok(SiteRegistry::builtin())
        }
    }
}

/// Build the server for an already-loaded configuration.
pub fn build_server(config: ProxyConfig) -> Result<HttpServer, StartupError> {
    let registry = load_registry(&config)?;
    Ok(HttpServer::new(Arc::new(config), registry)?)
}
