//! Model registry: logical name -> loaded classifier.
//!
//! Populated once before the listener is bound and cleared after it stops.
//! Between those two points it is only read.

use crate::classifier::{ArtifactError, ModelArtifact, ModelHandle};
use iris_core::{Lifecycle, LoadPhase};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry cannot be populated in phase {0:?}")]
    NotEmpty(LoadPhase),
}

#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<BTreeMap<String, ModelHandle>>,
    lifecycle: RwLock<Lifecycle>,
}

impl ModelRegistry {
    pub fn new() -> Self { Self::default() }

    /// Reads every artifact; fails on the first unreadable or invalid one.
    pub fn load_artifacts(sources: &[(&str, PathBuf)]) -> Result<Vec<(String, ModelHandle)>, ArtifactError> {
        sources
            .iter()
            .map(|(name, path)| {
                let artifact = ModelArtifact::load(path)?;
                info!(model = %name, family = artifact.family(), path = %path.display(), "model artifact loaded");
                Ok((name.to_string(), artifact.into_handle()))
            })
            .collect()
    }

    /// Empty -> Loaded. Only valid once.
    pub fn populate<I>(&self, models: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (String, ModelHandle)>,
    {
        let mut lifecycle = self.lifecycle.write();
        if lifecycle.phase() != LoadPhase::Empty {
            return Err(RegistryError::NotEmpty(lifecycle.phase()));
        }
        self.models.write().extend(models);
        lifecycle.advance();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ModelHandle> {
        self.models.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.models.read().keys().cloned().collect()
    }

    pub fn phase(&self) -> LoadPhase { self.lifecycle.read().phase() }

    pub fn is_loaded(&self) -> bool { self.lifecycle.read().is_loaded() }

    /// Drops every handle and moves to the terminal phase.
    pub fn clear(&self) {
        let mut lifecycle = self.lifecycle.write();
        self.models.write().clear();
        while lifecycle.phase() != LoadPhase::Cleared {
            lifecycle.advance();
        }
        info!(uptime_ms = lifecycle.uptime().as_millis() as u64, phases = ?lifecycle.durations(), "model registry cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::features::FeatureVector;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Always(usize);
    impl Classifier for Always {
        fn classify(&self, _: &FeatureVector) -> usize { self.0 }
    }

    fn handle(i: usize) -> ModelHandle { Arc::new(Always(i)) }

    #[test]
    fn lifecycle_empty_loaded_cleared() {
        let reg = ModelRegistry::new();
        assert_eq!(reg.phase(), LoadPhase::Empty);
        assert!(reg.get("logistic").is_none());
        reg.populate([("logistic".to_string(), handle(0)), ("random_forest".to_string(), handle(1))]).unwrap();
        assert_eq!(reg.phase(), LoadPhase::Loaded);
        assert!(reg.is_loaded());
        assert_eq!(reg.names(), ["logistic", "random_forest"]);
        reg.clear();
        assert_eq!(reg.phase(), LoadPhase::Cleared);
        assert!(!reg.is_loaded());
        assert!(reg.names().is_empty());
    }

    #[test]
    fn second_populate_is_rejected() {
        let reg = ModelRegistry::new();
        reg.populate([("logistic".to_string(), handle(0))]).unwrap();
        assert!(matches!(reg.populate([("x".to_string(), handle(1))]), Err(RegistryError::NotEmpty(LoadPhase::Loaded))));
        assert_eq!(reg.names(), ["logistic"]);
    }

    #[test]
    fn clear_from_empty_is_terminal() {
        let reg = ModelRegistry::new();
        reg.clear();
        assert_eq!(reg.phase(), LoadPhase::Cleared);
        assert!(reg.populate([("logistic".to_string(), handle(0))]).is_err());
    }

    #[test]
    fn loads_bundled_artifacts() {
        let dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../models"));
        let loaded = ModelRegistry::load_artifacts(&[
            ("logistic", dir.join("logistic_regression.json")),
            ("random_forest", dir.join("random_forest.json")),
        ])
        .unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn missing_artifact_fails_load() {
        let err = ModelRegistry::load_artifacts(&[("logistic", PathBuf::from("/nonexistent/lr.json"))]).err();
        assert!(matches!(err, Some(ArtifactError::Io { .. })));
    }
}
