use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Gateway counters, registered on a registry owned by the app state.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    pub predictions_total: IntCounterVec,
    pub auth_failures_total: IntCounter,
    pub validation_failures_total: IntCounter,
    pub prediction_log_dropped_total: IntCounter,
}

impl GatewayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("iris".into()), None)?;
        let predictions_total = IntCounterVec::new(
            Opts::new("predictions_total", "Predictions served, by model and label"),
            &["model", "label"],
        )?;
        let auth_failures_total = IntCounter::with_opts(Opts::new("auth_failures_total", "Requests rejected by the API key check"))?;
        let validation_failures_total = IntCounter::with_opts(Opts::new("validation_failures_total", "Request bodies rejected by feature validation"))?;
        let prediction_log_dropped_total = IntCounter::with_opts(Opts::new("prediction_log_dropped_total", "Prediction log entries dropped before being written"))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(auth_failures_total.clone()))?;
        registry.register(Box::new(validation_failures_total.clone()))?;
        registry.register(Box::new(prediction_log_dropped_total.clone()))?;
        Ok(Self { registry, predictions_total, auth_failures_total, validation_failures_total, prediction_log_dropped_total })
    }

    pub fn registry(&self) -> &Registry { &self.registry }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_prefixed() {
        let m = GatewayMetrics::new().unwrap();
        m.predictions_total.with_label_values(&["logistic", "Setosa"]).inc();
        m.auth_failures_total.inc();
        let names: Vec<String> = m.registry().gather().iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"iris_predictions_total".to_string()));
        assert!(names.contains(&"iris_auth_failures_total".to_string()));
    }

    #[test]
    fn instances_do_not_share_state() {
        let a = GatewayMetrics::new().unwrap();
        let b = GatewayMetrics::new().unwrap();
        a.auth_failures_total.inc();
        assert_eq!(a.auth_failures_total.get(), 1);
        assert_eq!(b.auth_failures_total.get(), 0);
    }
}
