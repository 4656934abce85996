// src/probes/mod.rs
mod cache;
mod database;
mod process;

pub use cache::RedisProbe;
pub use database::PostgresProbe;
pub use process::ProcessProbe;

use crate::config::{redact_endpoint, Config};
use crate::health::{ProbeRegistry, RegistryError};
use tracing::info;

pub const NOT_CONFIGURED: &str = "not configured";

pub const APP: &str = "app";
pub const DATABASE: &str = "database";
pub const REDIS: &str = "redis";

#[derive(Debug, thiserror::Error)]
pub enum ProbeSetupError {
    #[error("invalid {0} endpoint")]
    InvalidEndpoint(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Registers the process itself followed by the datastore and the cache.
pub fn build_registry(config: &Config) -> Result<ProbeRegistry, ProbeSetupError> {
    let database = &config.dependencies.database;
    let redis = &config.dependencies.redis;

    log_endpoint(DATABASE, database.endpoint());
    log_endpoint(REDIS, redis.endpoint());

    let registry = ProbeRegistry::builder()
        .register(APP, ProcessProbe::new())
        .register(
            DATABASE,
            PostgresProbe::from_endpoint(
                database.endpoint(),
                database.max_connections,
                config.health.deadline(),
            )?,
        )
        .register(REDIS, RedisProbe::from_endpoint(redis.endpoint())?)
        .build()?;

    Ok(registry)
}

fn log_endpoint(name: &str, endpoint: Option<&str>) {
    match endpoint {
        Some(url) => info!("Dependency {} -> {}", name, redact_endpoint(url)),
        None => info!("Dependency {} not configured", name),
    }
}
