//! Observability infrastructure for the detection engine
//!
//! Prometheus instruments behind a process-global handle. Registration
//! happens once no matter how many engine instances exist; the exposition
//! endpoint belongs to the embedding process.

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    evaluation_latency_seconds: Histogram,
    readings_evaluated: IntCounter,
    threshold_alerts: IntCounter,
    outliers_flagged: IntCounter,
    model_retrains: IntCounter,
    outlier_cycles_skipped: IntCounter,
    model_age_seconds: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "wq_engine_evaluation_latency_seconds",
                "Time spent running one evaluation cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            readings_evaluated: register_int_counter!(
                "wq_engine_readings_evaluated_total",
                "Total readings passed through evaluation"
            )
            .expect("Failed to register readings_evaluated_total"),

            threshold_alerts: register_int_counter!(
                "wq_engine_threshold_alerts_total",
                "Total windowed-average threshold alerts emitted"
            )
            .expect("Failed to register threshold_alerts_total"),

            outliers_flagged: register_int_counter!(
                "wq_engine_outliers_flagged_total",
                "Total readings labeled as multivariate outliers"
            )
            .expect("Failed to register outliers_flagged_total"),

            model_retrains: register_int_counter!(
                "wq_engine_model_retrains_total",
                "Total successful outlier-model retrains"
            )
            .expect("Failed to register model_retrains_total"),

            outlier_cycles_skipped: register_int_counter!(
                "wq_engine_outlier_cycles_skipped_total",
                "Evaluation cycles that ran without a multivariate assessment"
            )
            .expect("Failed to register outlier_cycles_skipped_total"),

            model_age_seconds: register_int_gauge!(
                "wq_engine_model_age_seconds",
                "Age of the currently held outlier model"
            )
            .expect("Failed to register model_age_seconds"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying instruments.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a metrics handle, initializing the global instruments if needed
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record one evaluation cycle's latency
    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    /// Count readings passed through evaluation
    pub fn add_readings_evaluated(&self, count: u64) {
        self.inner().readings_evaluated.inc_by(count);
    }

    /// Count threshold alerts emitted
    pub fn add_threshold_alerts(&self, count: u64) {
        self.inner().threshold_alerts.inc_by(count);
    }

    /// Count readings labeled as outliers
    pub fn add_outliers_flagged(&self, count: u64) {
        self.inner().outliers_flagged.inc_by(count);
    }

    /// Count a successful model retrain
    pub fn inc_model_retrains(&self) {
        self.inner().model_retrains.inc();
    }

    /// Count a cycle that ran without a multivariate assessment
    pub fn inc_outlier_cycles_skipped(&self) {
        self.inner().outlier_cycles_skipped.inc();
    }

    /// Update the model-age gauge
    pub fn set_model_age_seconds(&self, age: i64) {
        self.inner().model_age_seconds.set(age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handle_usable() {
        let metrics = EngineMetrics::new();

        metrics.observe_evaluation_latency(0.002);
        metrics.add_readings_evaluated(100);
        metrics.add_threshold_alerts(2);
        metrics.add_outliers_flagged(5);
        metrics.inc_model_retrains();
        metrics.inc_outlier_cycles_skipped();
        metrics.set_model_age_seconds(3600);
    }
}
