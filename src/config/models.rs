// src/config/models.rs
use crate::health::is_valid_name;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub health: HealthConfig,
    pub metrics: MetricsConfig,
    pub dependencies: DependenciesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    pub deadline_ms: u64,
}

impl HealthConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub path: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependenciesConfig {
    pub database: DependencyConfig,
    pub redis: DependencyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencyConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

impl DependencyConfig {
    /// The configured endpoint, treating an empty string as unset.
    pub fn endpoint(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("health.deadline_ms must be greater than zero")]
    ZeroDeadline,

    #[error("metrics.path must start with '/', got `{0}`")]
    InvalidMetricsPath(String),

    #[error("metrics.path `{0}` collides with a built-in route")]
    ReservedMetricsPath(String),

    #[error("metrics.namespace `{0}` is not a valid metric name prefix")]
    InvalidNamespace(String),

    #[error("dependency `{0}` is required but no url is configured")]
    MissingEndpoint(&'static str),

    #[error("dependency `{name}` has an invalid url: {reason}")]
    InvalidEndpoint { name: &'static str, reason: String },
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health.deadline_ms == 0 {
            return Err(ConfigError::ZeroDeadline);
        }

        if !self.metrics.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
        }
        if self.metrics.path == "/" || self.metrics.path == "/health" {
            return Err(ConfigError::ReservedMetricsPath(self.metrics.path.clone()));
        }
        if !self.metrics.namespace.is_empty() && !is_valid_name(&self.metrics.namespace) {
            return Err(ConfigError::InvalidNamespace(self.metrics.namespace.clone()));
        }

        validate_dependency("database", &self.dependencies.database, &["postgres", "postgresql"])?;
        validate_dependency("redis", &self.dependencies.redis, &["redis", "rediss"])?;

        Ok(())
    }
}

fn validate_dependency(
    name: &'static str,
    dependency: &DependencyConfig,
    schemes: &[&str],
) -> Result<(), ConfigError> {
    let Some(endpoint) = dependency.endpoint() else {
        if dependency.required {
            return Err(ConfigError::MissingEndpoint(name));
        }
        return Ok(());
    };

    // Parse errors from `url` never echo the input, so they are safe to report.
    let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
        name,
        reason: e.to_string(),
    })?;

    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidEndpoint {
            name,
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }

    Ok(())
}

/// `scheme://host:port` with credentials, path and query stripped.
pub fn redact_endpoint(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("unknown");
            match url.port() {
                Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
                None => format!("{}://{}", url.scheme(), host),
            }
        }
        Err(_) => "<invalid>".to_string(),
    }
}
