//! Prediction dispatch: route identifier -> registry entry -> label.

use crate::classifier::class_label;
use crate::error::ApiError;
use crate::features::FeatureVector;
use crate::metrics::GatewayMetrics;
use crate::prediction_log::{PredictionLog, PredictionLogEntry};
use crate::registry::ModelRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily { Logistic, RandomForest }

impl ModelFamily {
    pub const ALL: [ModelFamily; 2] = [ModelFamily::Logistic, ModelFamily::RandomForest];

    pub fn registry_name(self) -> &'static str {
        match self { ModelFamily::Logistic => "logistic", ModelFamily::RandomForest => "random_forest" }
    }

    pub fn artifact_file(self) -> &'static str {
        match self { ModelFamily::Logistic => "logistic_regression.json", ModelFamily::RandomForest => "random_forest.json" }
    }

    /// Short aliases accepted by `/predict/{model_name}`.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias { "lr" => Some(ModelFamily::Logistic), "rd" => Some(ModelFamily::RandomForest), _ => None }
    }

    /// Descriptive names used by the fixed `/prediction/...` routes.
    pub fn from_route_name(name: &str) -> Option<Self> {
        match name { "logistic_reg" => Some(ModelFamily::Logistic), "random_forest" => Some(ModelFamily::RandomForest), _ => None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub index: usize,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(rename = "prediction label")]
    pub prediction_label: usize,
    pub name: &'static str,
}

impl From<Prediction> for PredictionResponse {
    fn from(p: Prediction) -> Self { Self { prediction_label: p.index, name: p.label } }
}

pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    delay: Duration,
    log: PredictionLog,
    metrics: GatewayMetrics,
}

impl Dispatcher {
    pub fn new(registry: Arc<ModelRegistry>, delay: Duration, log: PredictionLog, metrics: GatewayMetrics) -> Self {
        Self { registry, delay, log, metrics }
    }

    /// Waits the configured delay, classifies, then queues the log entry.
    /// Dropping the future during the delay skips both inference and logging.
    pub async fn dispatch(&self, family: ModelFamily, requested_as: &str, features: FeatureVector) -> Result<Prediction, ApiError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let model = family.registry_name();
        let handle = self.registry.get(model).ok_or_else(|| ApiError::ModelNotLoaded(model.to_string()))?;
        let index = handle.classify(&features);
        let label = class_label(index).ok_or_else(|| ApiError::LabelOutOfRange { model: model.to_string(), index })?;
        debug!(model, requested_as, index, label, "prediction");
        self.metrics.predictions_total.with_label_values(&[model, label]).inc();
        self.log.record(PredictionLogEntry::new(index, label, model, requested_as));
        Ok(Prediction { index, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ModelHandle};
    use crate::prediction_log::PredictionSink;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct Always(usize);
    impl Classifier for Always {
        fn classify(&self, _: &FeatureVector) -> usize { self.0 }
    }

    struct ChannelSink(mpsc::UnboundedSender<PredictionLogEntry>);
    impl PredictionSink for ChannelSink {
        fn write(&mut self, entry: &PredictionLogEntry) -> anyhow::Result<()> {
            self.0.send(entry.clone())?;
            Ok(())
        }
    }

    fn dispatcher(models: Vec<(&str, usize)>) -> (Dispatcher, mpsc::UnboundedReceiver<PredictionLogEntry>, GatewayMetrics) {
        let registry = Arc::new(ModelRegistry::new());
        registry
            .populate(models.into_iter().map(|(n, i)| (n.to_string(), Arc::new(Always(i)) as ModelHandle)))
            .unwrap();
        let metrics = GatewayMetrics::new().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let (log, _worker) = PredictionLog::spawn(ChannelSink(tx), Duration::ZERO, 8, metrics.prediction_log_dropped_total.clone());
        (Dispatcher::new(registry, Duration::ZERO, log, metrics.clone()), rx, metrics)
    }

    fn features() -> FeatureVector { FeatureVector::new(5.1, 3.5, 1.4, 0.2).unwrap() }

    #[test]
    fn aliases_and_route_names_resolve_to_same_family() {
        assert_eq!(ModelFamily::from_alias("lr"), ModelFamily::from_route_name("logistic_reg"));
        assert_eq!(ModelFamily::from_alias("rd"), ModelFamily::from_route_name("random_forest"));
        assert_eq!(ModelFamily::from_alias("logistic_reg"), None);
        assert_eq!(ModelFamily::from_route_name("lr"), None);
        assert_eq!(ModelFamily::from_alias("LR"), None);
    }

    #[tokio::test]
    async fn dispatch_labels_and_logs() {
        let (d, mut rx, metrics) = dispatcher(vec![("logistic", 1), ("random_forest", 2)]);
        let p = d.dispatch(ModelFamily::Logistic, "lr", features()).await.unwrap();
        assert_eq!(p, Prediction { index: 1, label: "Versicolor" });
        let entry = rx.recv().await.unwrap();
        assert_eq!((entry.prediction, entry.model, entry.requested_as.as_str()), (1, "logistic", "lr"));
        assert_eq!(metrics.predictions_total.with_label_values(&["logistic", "Versicolor"]).get(), 1);
    }

    #[tokio::test]
    async fn missing_handle_fails_closed() {
        let (d, _rx, _) = dispatcher(vec![("logistic", 0)]);
        let err = d.dispatch(ModelFamily::RandomForest, "rd", features()).await.unwrap_err();
        assert!(matches!(err, ApiError::ModelNotLoaded(ref m) if m == "random_forest"));
    }

    #[tokio::test]
    async fn out_of_range_index_is_internal() {
        let (d, _rx, _) = dispatcher(vec![("logistic", 7)]);
        let err = d.dispatch(ModelFamily::Logistic, "lr", features()).await.unwrap_err();
        assert!(matches!(err, ApiError::LabelOutOfRange { index: 7, .. }));
    }

    #[test]
    fn response_uses_spaced_key() {
        let body = serde_json::to_value(PredictionResponse::from(Prediction { index: 2, label: "Virginica" })).unwrap();
        assert_eq!(body, serde_json::json!({"prediction label": 2, "name": "Virginica"}));
    }
}
