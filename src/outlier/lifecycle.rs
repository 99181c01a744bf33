//! Outlier-model lifecycle
//!
//! Owns the fitted ensemble and its training timestamp. Accessors see a
//! two-state machine: a fresh model is returned as-is; an absent or stale
//! model triggers a retrain. Retrains are serialized so that concurrent
//! staleness checks never duplicate training work.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::forest::{ForestParams, IsolationForest};
use crate::error::EngineError;
use crate::models::Reading;

/// Default maximum model age before retraining (24 hours)
pub const DEFAULT_RETRAIN_INTERVAL_HOURS: i64 = 24;

/// Default minimum readings required to fit a model
pub const DEFAULT_MIN_TRAINING_SAMPLES: usize = 10;

/// A fitted ensemble plus its training metadata
///
/// Replaced wholesale on retrain, never mutated.
#[derive(Debug, Clone)]
pub struct FittedModel {
    forest: IsolationForest,
    /// When the model was fitted
    pub trained_at: DateTime<Utc>,
    /// Incremented on every successful retrain
    pub serial: u64,
}

impl FittedModel {
    /// The fitted ensemble
    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    /// Age of the model relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.trained_at
    }
}

/// Guarded owner of the current outlier model
pub struct ModelLifecycle {
    params: ForestParams,
    retrain_interval: Duration,
    min_training_samples: usize,
    model: RwLock<Option<Arc<FittedModel>>>,
    /// Serializes retrains; never held while a fresh model is served
    retrain: Mutex<()>,
}

impl ModelLifecycle {
    /// Create a lifecycle manager with the default 24-hour retrain interval
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            retrain_interval: Duration::hours(DEFAULT_RETRAIN_INTERVAL_HOURS),
            min_training_samples: DEFAULT_MIN_TRAINING_SAMPLES,
            model: RwLock::new(None),
            retrain: Mutex::new(()),
        }
    }

    /// Set a custom retrain interval
    pub fn with_retrain_interval(mut self, interval: Duration) -> Self {
        self.retrain_interval = interval;
        self
    }

    /// Set a custom minimum training floor
    pub fn with_min_training_samples(mut self, floor: usize) -> Self {
        self.min_training_samples = floor;
        self
    }

    /// Return the current model, retraining first if absent or older than
    /// the retrain interval.
    ///
    /// Idempotent inside the freshness window. A concurrent caller that
    /// finds a retrain in flight waits on it and receives the freshly
    /// stored model instead of starting its own.
    pub async fn current_model(
        &self,
        training: &[Reading],
        now: DateTime<Utc>,
    ) -> Result<Arc<FittedModel>, EngineError> {
        if let Some(model) = self.fresh_model(now).await {
            return Ok(model);
        }

        let _guard = self.retrain.lock().await;
        // Re-check under the guard: another caller may have finished the
        // retrain while we waited
        if let Some(model) = self.fresh_model(now).await {
            return Ok(model);
        }

        match self.fit(training, now).await {
            Ok(model) => {
                let model = Arc::new(model);
                *self.model.write().await = Some(model.clone());
                info!(
                    serial = model.serial,
                    samples = training.len(),
                    "outlier model trained"
                );
                Ok(model)
            }
            Err(err) => {
                // A failed retrain keeps the previous model in service
                let previous = self.model.read().await.clone();
                match previous {
                    Some(model) => {
                        warn!(
                            error = %err,
                            serial = model.serial,
                            "retrain failed, keeping previous model"
                        );
                        Ok(model)
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// The held model when it is younger than the retrain interval
    async fn fresh_model(&self, now: DateTime<Utc>) -> Option<Arc<FittedModel>> {
        let guard = self.model.read().await;
        guard
            .as_ref()
            .filter(|model| model.age(now) <= self.retrain_interval)
            .cloned()
    }

    async fn fit(&self, training: &[Reading], now: DateTime<Utc>) -> Result<FittedModel, EngineError> {
        if training.len() < self.min_training_samples {
            return Err(EngineError::InsufficientData {
                required: self.min_training_samples,
                actual: training.len(),
            });
        }

        let rows = training
            .iter()
            .enumerate()
            .map(|(index, reading)| {
                reading
                    .feature_vector()
                    .map_err(|parameter| EngineError::MissingFeature { parameter, index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let forest = IsolationForest::fit(&rows, &self.params)?;
        let serial = self.model.read().await.as_ref().map(|m| m.serial).unwrap_or(0) + 1;

        Ok(FittedModel {
            forest,
            trained_at: now,
            serial,
        })
    }

    /// Age of the held model, if any
    pub async fn model_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.model.read().await.as_ref().map(|model| model.age(now))
    }

    /// Whether any model has been fitted yet
    pub async fn has_model(&self) -> bool {
        self.model.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    fn training_batch(count: usize, now: DateTime<Utc>) -> Vec<Reading> {
        (0..count)
            .map(|i| Reading {
                timestamp: now - Duration::seconds((count - i) as i64 * 10),
                ph: 7.2 + (i % 10) as f64 * 0.01,
                tds: 50.0 + (i % 10) as f64 * 0.5,
                turbidity: 0.5 + (i % 10) as f64 * 0.01,
                flow: 1.0 + (i % 10) as f64 * 0.01,
                temperature: 25.0 + (i % 10) as f64 * 0.05,
            })
            .collect()
    }

    fn lifecycle() -> ModelLifecycle {
        ModelLifecycle::new(ForestParams {
            tree_count: 20,
            contamination: 0.05,
            seed: Some(42),
        })
    }

    #[tokio::test]
    async fn test_first_access_trains() {
        let lifecycle = lifecycle();
        let now = Utc::now();
        assert!(!lifecycle.has_model().await);

        let model = lifecycle.current_model(&training_batch(20, now), now).await.unwrap();
        assert_eq!(model.serial, 1);
        assert_eq!(model.trained_at, now);
        assert!(lifecycle.has_model().await);
    }

    #[tokio::test]
    async fn test_fresh_model_is_idempotent() {
        let lifecycle = lifecycle();
        let now = Utc::now();
        let batch = training_batch(20, now);

        let first = lifecycle.current_model(&batch, now).await.unwrap();
        let later = now + Duration::hours(23);
        let second = lifecycle.current_model(&batch, later).await.unwrap();

        assert_eq!(second.serial, first.serial);
        assert!(StdArc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_stale_model_retrains_once() {
        let lifecycle = lifecycle();
        let now = Utc::now();
        let batch = training_batch(20, now);

        let first = lifecycle.current_model(&batch, now).await.unwrap();
        assert_eq!(first.serial, 1);

        let stale = now + Duration::hours(25);
        let later_batch = training_batch(20, stale);

        // Two concurrent accesses against a stale model: exactly one retrain
        let (a, b) = tokio::join!(
            lifecycle.current_model(&later_batch, stale),
            lifecycle.current_model(&later_batch, stale),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.serial, 2);
        assert_eq!(b.serial, 2);
        assert_eq!(a.trained_at, stale);
    }

    #[tokio::test]
    async fn test_insufficient_training_data() {
        let lifecycle = lifecycle();
        let now = Utc::now();

        let err = lifecycle.current_model(&training_batch(5, now), now).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientData { required: 10, actual: 5 }
        ));
        assert!(!lifecycle.has_model().await);
    }

    #[tokio::test]
    async fn test_training_floor_is_configurable() {
        let lifecycle = lifecycle().with_min_training_samples(30);
        let now = Utc::now();

        assert!(lifecycle.current_model(&training_batch(20, now), now).await.is_err());
        assert!(lifecycle.current_model(&training_batch(30, now), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_retrain_keeps_previous_model() {
        let lifecycle = lifecycle();
        let now = Utc::now();

        let first = lifecycle.current_model(&training_batch(20, now), now).await.unwrap();
        assert_eq!(first.serial, 1);

        // Stale, and the new training batch is too small: degrade gracefully
        let stale = now + Duration::hours(25);
        let model = lifecycle.current_model(&training_batch(3, stale), stale).await.unwrap();
        assert_eq!(model.serial, 1);
        assert_eq!(model.trained_at, now);
    }

    #[tokio::test]
    async fn test_training_rejects_non_finite_features() {
        let lifecycle = lifecycle();
        let now = Utc::now();
        let mut batch = training_batch(20, now);
        batch[7].turbidity = f64::NAN;

        let err = lifecycle.current_model(&batch, now).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingFeature { parameter: crate::models::Parameter::Turbidity, index: 7 }
        ));
    }

    #[tokio::test]
    async fn test_model_age_tracking() {
        let lifecycle = lifecycle();
        let now = Utc::now();
        assert!(lifecycle.model_age(now).await.is_none());

        lifecycle.current_model(&training_batch(20, now), now).await.unwrap();
        let age = lifecycle.model_age(now + Duration::hours(3)).await.unwrap();
        assert_eq!(age, Duration::hours(3));
    }
}
