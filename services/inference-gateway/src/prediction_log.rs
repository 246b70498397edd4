//! Deferred prediction log.
//!
//! Handlers push entries onto a bounded queue and return immediately. A single
//! worker writes each entry no earlier than `delay` after it was queued, which
//! keeps the write behind the response it describes. Entries are FIFO so the
//! per-entry deadlines are monotonic and one worker never falls behind on
//! sleeping alone. A full or closed queue drops the entry; nothing here can
//! fail a request.

use chrono::{DateTime, Utc};
use prometheus::IntCounter;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionLogEntry {
    pub prediction: usize,
    pub label: &'static str,
    /// Registry name of the model that produced the prediction.
    pub model: &'static str,
    /// Identifier the caller used (`lr`, `rd`, `logistic_reg`, `random_forest`).
    pub requested_as: String,
    pub predicted_at: DateTime<Utc>,
}

impl PredictionLogEntry {
    pub fn new(prediction: usize, label: &'static str, model: &'static str, requested_as: impl Into<String>) -> Self {
        Self { prediction, label, model, requested_as: requested_as.into(), predicted_at: Utc::now() }
    }
}

pub trait PredictionSink: Send + 'static {
    fn write(&mut self, entry: &PredictionLogEntry) -> anyhow::Result<()>;
}

/// Emits each entry as a `prediction_log` tracing event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl PredictionSink for TracingSink {
    fn write(&mut self, entry: &PredictionLogEntry) -> anyhow::Result<()> {
        info!(
            target: "prediction_log",
            prediction = entry.prediction,
            label = entry.label,
            model = entry.model,
            requested_as = %entry.requested_as,
            predicted_at = %entry.predicted_at.to_rfc3339(),
            logged_at = %Utc::now().to_rfc3339(),
            "Logged prediction"
        );
        Ok(())
    }
}

struct Queued {
    entry: PredictionLogEntry,
    enqueued_at: Instant,
}

#[derive(Clone)]
pub struct PredictionLog {
    tx: mpsc::Sender<Queued>,
    dropped: IntCounter,
}

impl PredictionLog {
    /// Starts the worker. It exits once every `PredictionLog` clone is dropped
    /// and the queue is drained.
    pub fn spawn<S: PredictionSink>(sink: S, delay: Duration, capacity: usize, dropped: IntCounter) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(rx, sink, delay));
        (Self { tx, dropped }, worker)
    }

    /// Never waits.
    pub fn record(&self, entry: PredictionLogEntry) {
        let queued = Queued { entry, enqueued_at: Instant::now() };
        match self.tx.try_send(queued) {
            Ok(()) => {}
            Err(TrySendError::Full(q)) => {
                self.dropped.inc();
                warn!(model = q.entry.model, prediction = q.entry.prediction, "prediction log queue full, entry dropped");
            }
            Err(TrySendError::Closed(q)) => {
                self.dropped.inc();
                warn!(model = q.entry.model, "prediction log worker gone, entry dropped");
            }
        }
    }
}

async fn run_worker<S: PredictionSink>(mut rx: mpsc::Receiver<Queued>, mut sink: S, delay: Duration) {
    while let Some(q) = rx.recv().await {
        tokio::time::sleep_until(q.enqueued_at + delay).await;
        if let Err(e) = sink.write(&q.entry) {
            warn!(error = ?e, model = q.entry.model, "prediction log write failed");
        }
    }
    debug!("prediction log worker stopped");
}
