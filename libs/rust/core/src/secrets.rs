//! Shared-secret lookup. Sources are tried in order and the first non-empty
//! value wins: environment variable (upper-cased name), mounted secret file,
//! local development file.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {0} not found")]
    NotFound(String),
    #[error("failed to read secret {name} from {path}: {source}")]
    Read {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SecretSources {
    /// Directory of mounted secrets, one file per secret.
    pub mounted_dir: PathBuf,
    /// Directory of `<name>.txt` files for local development.
    pub local_dir: PathBuf,
}

impl Default for SecretSources {
    fn default() -> Self {
        Self { mounted_dir: PathBuf::from("/run/secrets"), local_dir: PathBuf::from("secrets") }
    }
}

impl SecretSources {
    pub fn load(&self, name: &str) -> Result<String, SecretError> {
        self.resolve(name, std::env::var(name.to_uppercase()).ok())
    }

    pub fn resolve(&self, name: &str, env_value: Option<String>) -> Result<String, SecretError> {
        if let Some(v) = env_value.filter(|v| !v.is_empty()) {
            debug!(secret = name, source = "env", "secret resolved");
            return Ok(v);
        }
        let candidates = [self.mounted_dir.join(name), self.local_dir.join(format!("{name}.txt"))];
        for path in candidates.iter() {
            if let Some(v) = read_trimmed(name, path)? {
                debug!(secret = name, path = %path.display(), "secret resolved");
                return Ok(v);
            }
        }
        Err(SecretError::NotFound(name.to_string()))
    }
}

fn read_trimmed(name: &str, path: &Path) -> Result<Option<String>, SecretError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .map_err(|source| SecretError::Read { name: name.to_string(), path: path.to_path_buf(), source })?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
