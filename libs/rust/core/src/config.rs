//! Layered configuration: caller defaults, then an optional file named by
//! `IRIS_CONFIG_FILE`, then `IRIS__`-prefixed environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};

pub const CONFIG_FILE_ENV: &str = "IRIS_CONFIG_FILE";
pub const ENV_PREFIX: &str = "IRIS";

pub fn layered(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    layer_sources(
        builder,
        std::env::var(CONFIG_FILE_ENV).ok(),
        Environment::with_prefix(ENV_PREFIX).separator("__"),
    )
}

pub fn layer_sources(
    builder: ConfigBuilder<DefaultState>,
    file: Option<String>,
    env: Environment,
) -> Result<Config, ConfigError> {
    let mut builder = builder;
    if let Some(file) = file {
        tracing::debug!(%file, "adding config file source");
        builder = builder.add_source(File::with_name(&file).required(false));
    }
    builder.add_source(env).build()
}
