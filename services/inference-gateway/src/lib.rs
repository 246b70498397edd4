//! Iris species prediction gateway: API key check, feature validation,
//! dispatch to one of two loaded classifiers, deferred prediction log.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod api;
pub mod auth;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod features;
pub mod metrics;
pub mod prediction_log;
pub mod registry;

pub use api::{router, AppState};
pub use config::GatewayConfig;

pub const SERVICE: &str = "inference-gateway";

pub async fn run() -> Result<()> {
    iris_core::init_tracing(SERVICE)?;
    let cfg = GatewayConfig::load()?;
    info!(?cfg, "config loaded");

    let secret = iris_core::SecretSources::default().load(&cfg.auth.secret_name)?;
    let auth = auth::ApiKeyGate::new(&cfg.auth.header, secret)?;
    info!(header = %auth.header(), "api key gate configured");
    let metrics = metrics::GatewayMetrics::new()?;

    let registry = Arc::new(registry::ModelRegistry::new());
    registry.populate(registry::ModelRegistry::load_artifacts(&cfg.models.artifact_sources())?)?;
    info!(models = ?registry.names(), "Models loaded successfully");

    let (log, log_worker) = prediction_log::PredictionLog::spawn(
        prediction_log::TracingSink,
        cfg.prediction_log.delay(),
        cfg.prediction_log.capacity,
        metrics.prediction_log_dropped_total.clone(),
    );
    let state = AppState::new(registry.clone(), auth, metrics, cfg.dispatch.delay(), log);

    let listener = tokio::net::TcpListener::bind(cfg.server.bind_addr()).await?;
    info!(target: SERVICE, addr = ?listener.local_addr()?, "Starting inference-gateway service");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(iris_core::shutdown_signal())
        .await?;

    registry.clear();
    info!("Shutting down...");
    let drain = cfg.prediction_log.delay() + Duration::from_secs(1);
    if tokio::time::timeout(drain, log_worker).await.is_err() {
        warn!(?drain, "prediction log not drained before shutdown");
    }
    Ok(())
}
