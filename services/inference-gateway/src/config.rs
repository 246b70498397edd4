use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::DEFAULT_API_KEY_HEADER;
use crate::dispatch::ModelFamily;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub auth: AuthConfig,
    pub dispatch: DispatchConfig,
    pub prediction_log: PredictionLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub dir: PathBuf,
    pub logistic_path: Option<PathBuf>,
    pub random_forest_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub header: String,
    /// Looked up as env `<NAME>` upper-cased, `/run/secrets/<name>`, `secrets/<name>.txt`.
    pub secret_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionLogConfig {
    pub delay_ms: u64,
    pub capacity: usize,
}

impl GatewayConfig {
    /// Defaults, then `IRIS_CONFIG_FILE`, then `IRIS__*` env. The unprefixed
    /// `MODELS_DIR`, `LOGISTIC_MODEL` and `RF_MODEL` variables win over both.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .set_override_option("models.dir", std::env::var("MODELS_DIR").ok())?
            .set_override_option("models.logistic_path", std::env::var("LOGISTIC_MODEL").ok())?
            .set_override_option("models.random_forest_path", std::env::var("RF_MODEL").ok())?;
        let cfg: Self = iris_core::config::layered(builder)?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Log entries are queued before the handler returns; only a non-zero
    /// delay keeps the write behind the response.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prediction_log.delay_ms == 0 {
            return Err(ConfigError::Message("prediction_log.delay_ms must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000_i64)?
            .set_default("models.dir", "models")?
            .set_default("auth.header", DEFAULT_API_KEY_HEADER)?
            .set_default("auth.secret_name", "api_key")?
            .set_default("dispatch.delay_ms", 1000_i64)?
            .set_default("prediction_log.delay_ms", 5000_i64)?
            .set_default("prediction_log.capacity", 1024_i64)
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

impl ModelsConfig {
    /// Registry name and artifact path for every served model family.
    pub fn artifact_sources(&self) -> Vec<(&'static str, PathBuf)> {
        ModelFamily::ALL
            .iter()
            .map(|family| {
                let explicit = match family {
                    ModelFamily::Logistic => self.logistic_path.clone(),
                    ModelFamily::RandomForest => self.random_forest_path.clone(),
                };
                let path = explicit.unwrap_or_else(|| self.dir.join(family.artifact_file()));
                (family.registry_name(), path)
            })
            .collect()
    }
}

impl DispatchConfig {
    pub fn delay(&self) -> Duration { Duration::from_millis(self.delay_ms) }
}

impl PredictionLogConfig {
    pub fn delay(&self) -> Duration { Duration::from_millis(self.delay_ms) }
}
