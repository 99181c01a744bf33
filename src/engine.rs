//! Evaluation pipeline
//!
//! Ties the detectors together: one call runs the threshold path, ensures a
//! fresh outlier model, scores the batch, and aggregates alert records for
//! the presentation layer. Also provides the bounded reading buffer a
//! long-running caller feeds between cycles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::anomaly::{aggregate, AlertRecord, ThresholdAlert, ThresholdDetector};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::Reading;
use crate::observability::EngineMetrics;
use crate::outlier::{score, ForestParams, ModelLifecycle, OutlierLabel};
use crate::ranges::RangeTable;

/// Default retention horizon for buffered readings (24 hours)
const RETENTION_HOURS: i64 = 24;

/// Outcome of one evaluation cycle
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Windowed-average threshold alerts, in parameter order
    pub threshold_alerts: Vec<ThresholdAlert>,
    /// One label per input reading, in input order; `None` when the outlier
    /// path was skipped this cycle
    pub outlier_labels: Option<Vec<OutlierLabel>>,
    /// Why the outlier path was skipped, when it was
    pub outlier_skipped: Option<String>,
    /// Uniform alert records from both detectors
    pub alerts: Vec<AlertRecord>,
    /// Cycle time the evaluation ran against
    pub evaluated_at: DateTime<Utc>,
}

/// Anomaly-detection engine for one logical stream of readings
pub struct AnomalyEngine {
    ranges: RangeTable,
    detector: ThresholdDetector,
    lifecycle: ModelLifecycle,
    metrics: EngineMetrics,
    last_model_serial: AtomicU64,
}

impl AnomalyEngine {
    /// Build an engine from validated configuration.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let ranges = config.range_table()?;

        let detector = ThresholdDetector::new(ranges.clone()).with_window(config.window());
        let lifecycle = ModelLifecycle::new(ForestParams {
            tree_count: config.tree_count,
            contamination: config.contamination,
            seed: config.seed,
        })
        .with_retrain_interval(config.retrain_interval())
        .with_min_training_samples(config.min_training_samples);

        Ok(Self {
            ranges,
            detector,
            lifecycle,
            metrics: EngineMetrics::new(),
            last_model_serial: AtomicU64::new(0),
        })
    }

    /// Evaluate a batch against both detectors at the current wall clock.
    pub async fn evaluate(&self, batch: &[Reading]) -> Result<EvaluationReport, EngineError> {
        self.evaluate_at(batch, Utc::now()).await
    }

    /// Evaluate with an explicit cycle time.
    ///
    /// The batch serves as both scoring input and training history for a
    /// retrain, so the load-or-train-then-predict flow is a single path. A
    /// cycle without enough history for training still runs the threshold
    /// path and reports the outlier path as skipped, never as "no
    /// anomalies".
    pub async fn evaluate_at(
        &self,
        batch: &[Reading],
        now: DateTime<Utc>,
    ) -> Result<EvaluationReport, EngineError> {
        let start = Instant::now();

        let threshold_alerts = self.detector.detect(batch, now);

        let (outlier_labels, outlier_skipped) =
            match self.lifecycle.current_model(batch, now).await {
                Ok(model) => {
                    if self.last_model_serial.swap(model.serial, Ordering::Relaxed) != model.serial
                    {
                        self.metrics.inc_model_retrains();
                    }
                    self.metrics.set_model_age_seconds(model.age(now).num_seconds());
                    let labels = score(&model, batch)?;
                    (Some(labels), None)
                }
                Err(err @ EngineError::InsufficientData { .. }) => {
                    warn!(error = %err, "outlier path skipped this cycle");
                    self.metrics.inc_outlier_cycles_skipped();
                    (None, Some(err.to_string()))
                }
                Err(err) => return Err(err),
            };

        let alerts = aggregate(
            &threshold_alerts,
            batch,
            outlier_labels.as_deref().unwrap_or(&[]),
            &self.ranges,
            now,
        );

        let outliers_flagged = outlier_labels
            .as_ref()
            .map(|labels| labels.iter().filter(|l| l.is_outlier).count())
            .unwrap_or(0);

        self.metrics.add_readings_evaluated(batch.len() as u64);
        self.metrics.add_threshold_alerts(threshold_alerts.len() as u64);
        self.metrics.add_outliers_flagged(outliers_flagged as u64);
        self.metrics
            .observe_evaluation_latency(start.elapsed().as_secs_f64());

        debug!(
            readings = batch.len(),
            threshold_alerts = threshold_alerts.len(),
            outliers_flagged,
            outlier_skipped = outlier_skipped.is_some(),
            "evaluation cycle completed"
        );

        Ok(EvaluationReport {
            threshold_alerts,
            outlier_labels,
            outlier_skipped,
            alerts,
            evaluated_at: now,
        })
    }

    /// The healthy-range table in force
    pub fn ranges(&self) -> &RangeTable {
        &self.ranges
    }

    /// Age of the held outlier model, if any
    pub async fn model_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.lifecycle.model_age(now).await
    }
}

/// Bounded history of readings for evaluation and training
///
/// Keeps only the trailing retention window so long-running deployments do
/// not grow without bound. Insertion preserves chronological order even
/// when readings arrive slightly out of order.
#[derive(Debug, Clone)]
pub struct ReadingBuffer {
    readings: Vec<Reading>,
    retention: Duration,
}

impl ReadingBuffer {
    /// Create a buffer with the default 24-hour retention horizon
    pub fn new() -> Self {
        Self {
            readings: Vec::new(),
            retention: Duration::hours(RETENTION_HOURS),
        }
    }

    /// Create a buffer with a custom retention horizon
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            readings: Vec::new(),
            retention,
        }
    }

    /// Insert a reading, then drop everything older than the retention
    /// horizon relative to the newest timestamp held.
    pub fn push(&mut self, reading: Reading) {
        let at = self
            .readings
            .iter()
            .rposition(|r| r.timestamp <= reading.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.readings.insert(at, reading);

        let newest = self.readings.last().map(|r| r.timestamp);
        if let Some(newest) = newest {
            let cutoff = newest - self.retention;
            self.readings.retain(|r| r.timestamp >= cutoff);
        }
    }

    /// The retained readings, oldest first
    pub fn snapshot(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl Default for ReadingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
