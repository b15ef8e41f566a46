//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: `{value}`")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied after the file is parsed and before
/// validation runs.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    finish(config, |var| std::env::var(var).ok())
}

/// Build the configuration from defaults plus the environment.
pub fn load_from_env() -> Result<ProxyConfig, ConfigError> {
    finish(ProxyConfig::default(), |var| std::env::var(var).ok())
}

fn finish<F>(mut config: ProxyConfig, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay process environment variables onto a parsed configuration.
///
/// List values are comma-separated. `lookup` is injected so tests don't
/// touch the real environment.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = parse_env("PORT", &port)?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }
    if let Some(v) = lookup("REQUEST_TIMEOUT") {
        config.upstream.timeout_ms = parse_env("REQUEST_TIMEOUT", &v)?;
    }
    if let Some(v) = lookup("MAX_RETRIES") {
        config.retries.max_retries = parse_env("MAX_RETRIES", &v)?;
    }
    if let Some(v) = lookup("USER_AGENT") {
        config.upstream.user_agent = v;
    }
    if let Some(v) = lookup("BLOCKED_HOSTS") {
        config.security.denied_hosts = split_list(&v);
    }
    if let Some(v) = lookup("BLOCKED_IP_PREFIXES") {
        config.security.denied_host_prefixes = split_list(&v);
    }
    if let Some(v) = lookup("CACHE_MAX_AGE") {
        config.dispatch.cache_max_age_secs = Some(parse_env("CACHE_MAX_AGE", &v)?);
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
