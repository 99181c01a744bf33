//! Batch scoring against a fitted model

use serde::{Deserialize, Serialize};

use super::lifecycle::FittedModel;
use crate::error::EngineError;
use crate::models::Reading;

/// Outlier verdict for one reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierLabel {
    pub is_outlier: bool,
    /// Continuous isolation score in (0, 1); higher isolates faster
    pub score: f64,
}

/// Label every reading in the batch against the fitted model.
///
/// Output is positional: one label per reading, in input order. A reading
/// with a non-finite feature is rejected with `MissingFeature` rather than
/// silently zero-filled.
pub fn score(model: &FittedModel, batch: &[Reading]) -> Result<Vec<OutlierLabel>, EngineError> {
    let mut labels = Vec::with_capacity(batch.len());
    for (index, reading) in batch.iter().enumerate() {
        let row = reading
            .feature_vector()
            .map_err(|parameter| EngineError::MissingFeature { parameter, index })?;
        let score = model.forest().score(&row);
        labels.push(OutlierLabel {
            is_outlier: score > model.forest().threshold(),
            score,
        });
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Parameter;
    use crate::outlier::{ForestParams, ModelLifecycle};
    use chrono::{Duration, Utc};

    fn clean_reading(offset: usize, now: chrono::DateTime<Utc>) -> Reading {
        Reading {
            timestamp: now - Duration::seconds(offset as i64 * 10),
            ph: 7.2 + (offset % 10) as f64 * 0.01,
            tds: 50.0 + (offset % 10) as f64 * 0.5,
            turbidity: 0.5 + (offset % 10) as f64 * 0.01,
            flow: 1.0,
            temperature: 25.0,
        }
    }

    async fn fitted_model(now: chrono::DateTime<Utc>) -> std::sync::Arc<FittedModel> {
        let training: Vec<Reading> = (0..100).map(|i| clean_reading(i, now)).collect();
        ModelLifecycle::new(ForestParams {
            tree_count: 50,
            contamination: 0.05,
            seed: Some(42),
        })
        .current_model(&training, now)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_one_label_per_reading_in_order() {
        let now = Utc::now();
        let model = fitted_model(now).await;
        let batch: Vec<Reading> = (0..7).map(|i| clean_reading(i, now)).collect();

        let labels = score(&model, &batch).unwrap();
        assert_eq!(labels.len(), batch.len());
    }

    #[tokio::test]
    async fn test_contaminated_reading_flagged() {
        let now = Utc::now();
        let model = fitted_model(now).await;

        let mut batch: Vec<Reading> = (0..10).map(|i| clean_reading(i, now)).collect();
        batch.push(Reading {
            timestamp: now,
            ph: 5.5,
            tds: 900.0,
            turbidity: 30.0,
            flow: 1.0,
            temperature: 25.0,
        });

        let labels = score(&model, &batch).unwrap();
        assert!(labels.last().unwrap().is_outlier);
        assert!(labels.last().unwrap().score > labels[0].score);
    }

    #[tokio::test]
    async fn test_missing_feature_surfaced_with_position() {
        let now = Utc::now();
        let model = fitted_model(now).await;

        let mut batch: Vec<Reading> = (0..5).map(|i| clean_reading(i, now)).collect();
        batch[3].flow = f64::NAN;

        let err = score(&model, &batch).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingFeature { parameter: Parameter::Flow, index: 3 }
        ));
    }
}
