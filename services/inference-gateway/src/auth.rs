//! Static API key check.

use crate::api::AppState;
use crate::error::ApiError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{HeaderMap, HeaderName, InvalidHeaderName};
use axum::http::request::Parts;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ApiKeyGate {
    header: HeaderName,
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate").field("header", &self.header).finish_non_exhaustive()
    }
}

impl ApiKeyGate {
    pub fn new(header: &str, secret: impl Into<String>) -> Result<Self, InvalidHeaderName> {
        let header = HeaderName::try_from(header)?;
        Ok(Self { header, secret: Arc::from(secret.into().into_bytes()) })
    }

    pub fn header(&self) -> &HeaderName { &self.header }

    /// Absent and wrong keys are indistinguishable to the caller.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let provided = headers.get(&self.header).map(|v| v.as_bytes()).unwrap_or_default();
        if provided.is_empty() || !constant_time_eq(provided, &self.secret) {
            debug!(present = !provided.is_empty(), "api key rejected");
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Extractor marking a handler as protected. Must precede body extractors so
/// unauthenticated callers never see validation details.
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state.auth.verify(&parts.headers).map_err(|e| {
            state.metrics.auth_failures_total.inc();
            e
        })?;
        Ok(Authorized)
    }
}
