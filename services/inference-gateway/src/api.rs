//! HTTP surface.
//!
//! Protected handlers take `Authorized` before `ValidFeatures` so the key is
//! checked before the body is looked at.

use crate::auth::{ApiKeyGate, Authorized};
use crate::dispatch::{Dispatcher, ModelFamily, PredictionResponse};
use crate::error::ApiError;
use crate::features::{FeatureVector, FieldError};
use crate::metrics::GatewayMetrics;
use crate::prediction_log::PredictionLog;
use crate::registry::ModelRegistry;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub auth: ApiKeyGate,
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: GatewayMetrics,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>, auth: ApiKeyGate, metrics: GatewayMetrics, dispatch_delay: Duration, log: PredictionLog) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), dispatch_delay, log, metrics.clone()));
        Self { registry, auth, dispatcher, metrics }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/models", get(available_models))
        .route("/predict/:model_name", post(predict))
        .route("/prediction/logistic_reg", post(predict_logistic))
        .route("/prediction/random_forest", post(predict_random_forest))
        .with_state(state)
}

/// Validated request body.
pub struct ValidFeatures(pub FeatureVector);

#[async_trait]
impl FromRequest<AppState> for ValidFeatures {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let parsed = match Bytes::from_request(req, state).await {
            Ok(body) => FeatureVector::from_json_slice(&body),
            Err(e) => Err(vec![FieldError::body(e.body_text(), "body_unreadable")]),
        };
        parsed.map(ValidFeatures).map_err(|errors| {
            state.metrics.validation_failures_total.inc();
            ApiError::Validation(errors)
        })
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Hello World"}))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}

async fn ready(State(state): State<AppState>) -> Response {
    let phase = state.registry.phase();
    let ready = state.registry.is_loaded();
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(json!({"ready": ready, "phase": phase.as_str()}))).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    iris_core::metrics_response(state.metrics.registry())
}

async fn available_models(State(state): State<AppState>, _: Authorized) -> Json<serde_json::Value> {
    Json(json!({"available_models": state.registry.names()}))
}

async fn predict(
    State(state): State<AppState>,
    _: Authorized,
    Path(model_name): Path<String>,
    ValidFeatures(features): ValidFeatures,
) -> Result<Json<PredictionResponse>, ApiError> {
    let family = ModelFamily::from_alias(&model_name).ok_or_else(|| ApiError::InvalidModel(model_name.clone()))?;
    let prediction = state.dispatcher.dispatch(family, &model_name, features).await?;
    Ok(Json(prediction.into()))
}

async fn predict_logistic(
    State(state): State<AppState>,
    _: Authorized,
    ValidFeatures(features): ValidFeatures,
) -> Result<Json<PredictionResponse>, ApiError> {
    predict_fixed(&state, "logistic_reg", features).await
}

async fn predict_random_forest(
    State(state): State<AppState>,
    _: Authorized,
    ValidFeatures(features): ValidFeatures,
) -> Result<Json<PredictionResponse>, ApiError> {
    predict_fixed(&state, "random_forest", features).await
}

async fn predict_fixed(state: &AppState, route_name: &str, features: FeatureVector) -> Result<Json<PredictionResponse>, ApiError> {
    let family = ModelFamily::from_route_name(route_name).ok_or_else(|| ApiError::InvalidModel(route_name.to_string()))?;
    let prediction = state.dispatcher.dispatch(family, route_name, features).await?;
    Ok(Json(prediction.into()))
}
