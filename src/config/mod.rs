// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use ::config::builder::DefaultState;
use ::config::{ConfigBuilder, Environment, File};
use std::path::Path;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Load configuration from defaults, an optional file (YAML, JSON or TOML by
/// extension), `HEALTHD_*` environment variables and the connection-string
/// variables, in increasing order of precedence.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let builder = defaults()?
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(
            Environment::with_prefix("HEALTHD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let endpoints = Endpoints {
        database: std::env::var(DATABASE_URL_ENV).ok(),
        redis: std::env::var(REDIS_URL_ENV).ok(),
    };

    finish(builder, endpoints)
}

/// Connection strings taken from the process environment.
#[derive(Debug, Default, Clone)]
pub struct Endpoints {
    pub database: Option<String>,
    pub redis: Option<String>,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let builder = ::config::Config::builder()
        .set_default("service.name", "service-health")?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000_i64)?
        .set_default("health.deadline_ms", 2000_i64)?
        .set_default("metrics.path", "/metrics")?
        .set_default("metrics.namespace", "healthd")?
        .set_default("dependencies.database.required", false)?
        .set_default("dependencies.database.max_connections", 4_i64)?
        .set_default("dependencies.redis.required", false)?
        .set_default("dependencies.redis.max_connections", 4_i64)?;
    Ok(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>, endpoints: Endpoints) -> Result<Config> {
    let config: Config = builder
        .set_override_option("dependencies.database.url", endpoints.database)?
        .set_override_option("dependencies.redis.url", endpoints.redis)?
        .build()
        .context("Failed to assemble configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    config.validate()?;
    Ok(config)
}
