//! Core shared utilities for the iris gateway services.

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use once_cell::sync::OnceCell;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod lifecycle;
pub mod secrets;

pub use lifecycle::{LoadPhase, Lifecycle};
pub use secrets::{SecretError, SecretSources};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Env switch for JSON formatted log lines.
pub const JSON_LOG_ENV: &str = "IRIS_JSON_LOG";

pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let json = std::env::var(JSON_LOG_ENV).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let json_layer = json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
        });
        let text_layer = (!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
        });
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(text_layer)
            .try_init()?;
        Ok::<(), anyhow::Error>(())
    })?;
    info!(target: "iris-core", service, "Tracing initialized");
    Ok(())
}

/// Resolves once Ctrl-C is received.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=?e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown_signal_received");
}

/// Renders a prometheus registry in the text exposition format.
pub fn metrics_response(registry: &Registry) -> Response {
    let metric_families = registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buf) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response();
    }
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], buf).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntCounter, Opts};

    #[test]
    fn metrics_response_encodes_registered_counters() {
        let registry = Registry::new();
        let counter = IntCounter::with_opts(Opts::new("demo_total", "demo counter")).unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc();
        let resp = metrics_response(&registry);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain; version=0.0.4");
    }

    #[test]
    fn tracing_init_is_idempotent() {
        assert!(init_tracing("core-test").is_ok());
        assert!(init_tracing("core-test").is_ok());
    }
}
