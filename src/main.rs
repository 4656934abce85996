// src/main.rs
use anyhow::{Context, Result};
use service_health::{
    config,
    health::HealthAggregator,
    metrics::MetricsRegistry,
    probes,
    server::{AppState, RequestHandler, ServerBuilder},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("service_health=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path)?;

    // Initialize metrics
    let metrics = MetricsRegistry::new(&config.metrics.namespace)?;
    let sink = metrics.sink();
    sink.set_gauge("up", "Application is running", 1.0);

    // Register probes; duplicate or invalid names stop startup here
    let registry = Arc::new(probes::build_registry(&config).context("Failed to register probes")?);
    info!(
        "Registered {} dependency probes with a {:?} deadline",
        registry.len(),
        config.health.deadline()
    );

    let aggregator = HealthAggregator::new(registry, sink);

    let state = Arc::new(AppState {
        service_name: config.service.name.clone(),
        aggregator,
        metrics,
        metrics_path: config.metrics.path.clone(),
        deadline: config.health.deadline(),
    });
    let handler = RequestHandler::new(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server.host `{}`", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);
    info!("Starting {} on {}", config.service.name, addr);

    ServerBuilder::new(addr)
        .with_handler(handler)
        .serve()
        .await?;

    info!("Server stopped");
    Ok(())
}
