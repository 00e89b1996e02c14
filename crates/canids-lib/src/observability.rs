//! Observability infrastructure for the prediction stream
//!
//! Provides:
//! - Prometheus metrics (session counts, prediction latency, dataset load time)
//! - Structured JSON logging with tracing

use crate::models::Label;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-batch inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Histogram buckets for dataset load + preprocess time (in seconds)
const LOAD_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<StreamMetricsInner> = OnceLock::new();

struct StreamMetricsInner {
    sessions_started: IntCounter,
    sessions_active: IntGauge,
    sessions_completed: IntCounter,
    session_errors: IntCounterVec,
    intervals_emitted: IntCounter,
    batches_classified: IntCounter,
    prediction_latency_seconds: Histogram,
    dataset_load_seconds: Histogram,
    model_info: GaugeVec,
}

impl StreamMetricsInner {
    fn new() -> Self {
        Self {
            sessions_started: register_int_counter!(
                "canids_sessions_started_total",
                "Total number of stream sessions opened"
            )
            .expect("Failed to register sessions_started"),

            sessions_active: register_int_gauge!(
                "canids_sessions_active",
                "Number of stream sessions currently running"
            )
            .expect("Failed to register sessions_active"),

            sessions_completed: register_int_counter!(
                "canids_sessions_completed_total",
                "Total number of sessions that delivered a final verdict"
            )
            .expect("Failed to register sessions_completed"),

            session_errors: register_int_counter_vec!(
                "canids_session_errors_total",
                "Total number of sessions ended by an error, by kind",
                &["kind"]
            )
            .expect("Failed to register session_errors"),

            intervals_emitted: register_int_counter!(
                "canids_intervals_emitted_total",
                "Total number of interval predictions sent to clients"
            )
            .expect("Failed to register intervals_emitted"),

            batches_classified: register_int_counter!(
                "canids_batches_classified_total",
                "Total number of row batches run through the classifier"
            )
            .expect("Failed to register batches_classified"),

            prediction_latency_seconds: register_histogram!(
                "canids_prediction_latency_seconds",
                "Time spent classifying one row batch",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            dataset_load_seconds: register_histogram!(
                "canids_dataset_load_seconds",
                "Time spent loading and preprocessing a session dataset",
                LOAD_BUCKETS.to_vec()
            )
            .expect("Failed to register dataset_load_seconds"),

            model_info: register_gauge_vec!(
                "canids_model_info",
                "Information about the loaded classifier",
                &["model"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Stream metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct StreamMetrics {
    _private: (),
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMetrics").finish()
    }
}

impl StreamMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StreamMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &StreamMetricsInner {
        GLOBAL_METRICS.get_or_init(StreamMetricsInner::new)
    }

    /// A session started running
    pub fn session_opened(&self) {
        self.inner().sessions_started.inc();
        self.inner().sessions_active.inc();
    }

    /// A session released its resources
    pub fn session_closed(&self) {
        self.inner().sessions_active.dec();
    }

    pub fn inc_sessions_completed(&self) {
        self.inner().sessions_completed.inc();
    }

    pub fn inc_session_errors(&self, kind: &str) {
        self.inner().session_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_intervals_emitted(&self) {
        self.inner().intervals_emitted.inc();
    }

    pub fn inc_batches_classified(&self) {
        self.inner().batches_classified.inc();
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_dataset_load(&self, duration_secs: f64) {
        self.inner().dataset_load_seconds.observe(duration_secs);
    }

    /// Update classifier identity
    pub fn set_model_info(&self, model: &str) {
        self.inner().model_info.reset();
        self.inner().model_info.with_label_values(&[model]).set(1.0);
    }
}

/// Structured logger for stream events
///
/// Provides consistent JSON-formatted logging for session lifecycle
/// events and server startup/shutdown.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model: &str, categories: usize) {
        info!(
            event = "server_started",
            instance = %self.instance,
            version = %version,
            model = %model,
            categories = categories,
            "Prediction stream server started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Prediction stream server shutting down"
        );
    }

    pub fn log_session_started(&self, session_id: u64) {
        info!(
            event = "session_started",
            instance = %self.instance,
            session_id = session_id,
            "Stream session opened"
        );
    }

    pub fn log_dataset_loaded(
        &self,
        session_id: u64,
        category: &str,
        rows: usize,
        columns: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "dataset_loaded",
            instance = %self.instance,
            session_id = session_id,
            category = %category,
            rows = rows,
            columns = columns,
            elapsed_ms = elapsed_ms,
            "Dataset loaded and preprocessed"
        );
    }

    pub fn log_interval(&self, session_id: u64, interval: usize, batches: usize, prediction: Label) {
        info!(
            event = "interval_emitted",
            instance = %self.instance,
            session_id = session_id,
            interval = interval,
            batches = batches,
            prediction = prediction,
            "Interval prediction sent"
        );
    }

    pub fn log_session_completed(
        &self,
        session_id: u64,
        intervals: usize,
        rows_consumed: usize,
        verdict: Option<Label>,
    ) {
        info!(
            event = "session_completed",
            instance = %self.instance,
            session_id = session_id,
            intervals = intervals,
            rows_consumed = rows_consumed,
            verdict = ?verdict,
            "Stream session completed"
        );
    }

    pub fn log_session_failed(&self, session_id: u64, kind: &str, error: &str) {
        warn!(
            event = "session_failed",
            instance = %self.instance,
            session_id = session_id,
            kind = %kind,
            error = %error,
            "Stream session failed"
        );
    }

    /// Client went away; nothing was sent
    pub fn log_session_abandoned(&self, session_id: u64, intervals: usize) {
        info!(
            event = "session_abandoned",
            instance = %self.instance,
            session_id = session_id,
            intervals = intervals,
            "Client disconnected, session abandoned"
        );
    }
}
