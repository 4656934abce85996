// src/probes/database.rs
use super::{ProbeSetupError, NOT_CONFIGURED};
use crate::health::{DependencyProbe, ProbeContext, ProbeOutcome};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::io::ErrorKind;
use std::time::Duration;
use tracing::warn;

/// Runs `SELECT 1` against a pooled PostgreSQL connection.
#[derive(Debug, Clone)]
pub struct PostgresProbe {
    pool: Option<PgPool>,
}

impl PostgresProbe {
    pub fn unconfigured() -> Self {
        Self { pool: None }
    }

    /// Builds the pool without connecting; the first probe opens a connection.
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, ProbeSetupError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)
            .map_err(|_| ProbeSetupError::InvalidEndpoint("database"))?;

        Ok(Self { pool: Some(pool) })
    }

    pub fn from_endpoint(
        url: Option<&str>,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, ProbeSetupError> {
        match url {
            Some(url) => Self::connect_lazy(url, max_connections, acquire_timeout),
            None => Ok(Self::unconfigured()),
        }
    }
}

#[async_trait]
impl DependencyProbe for PostgresProbe {
    async fn probe(&self, ctx: &ProbeContext) -> ProbeOutcome {
        let Some(pool) = &self.pool else {
            return ProbeOutcome::unhealthy(NOT_CONFIGURED);
        };

        match ctx.run(sqlx::query("SELECT 1").execute(pool)).await {
            Some(Ok(_)) => ProbeOutcome::Healthy,
            Some(Err(e)) => {
                warn!(dependency = %ctx.dependency, error = %e, "datastore probe failed");
                ProbeOutcome::unhealthy(describe(&e))
            }
            None => ProbeOutcome::TimedOut,
        }
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

/// Client-safe summary of a driver error.
fn describe(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Io(io) if io.kind() == ErrorKind::ConnectionRefused => "connection refused",
        sqlx::Error::Io(_) => "connection failed",
        sqlx::Error::Tls(_) => "tls handshake failed",
        sqlx::Error::PoolTimedOut => "connection pool timed out",
        sqlx::Error::PoolClosed => "connection pool closed",
        sqlx::Error::Configuration(_) => "invalid configuration",
        // 28000 invalid_authorization_specification, 28P01 invalid_password
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("28000") | Some("28P01") => "authentication failed",
            _ => "query failed",
        },
        _ => "datastore error",
    }
}
