//! Multivariate outlier detection
//!
//! This module provides:
//! - An isolation-forest ensemble fitted over the joint feature space
//! - The model lifecycle: freshness tracking and single-flight retraining
//! - Batch scoring that labels each reading inlier or outlier

mod forest;
mod lifecycle;
mod scorer;

pub use forest::{
    FeatureRow, ForestParams, IsolationForest, DEFAULT_CONTAMINATION, DEFAULT_TREE_COUNT,
};
pub use lifecycle::{
    FittedModel, ModelLifecycle, DEFAULT_MIN_TRAINING_SAMPLES, DEFAULT_RETRAIN_INTERVAL_HOURS,
};
pub use scorer::{score, OutlierLabel};
