//! Anomaly-detection engine for water-quality sensor streams
//!
//! This crate provides the core functionality for:
//! - Windowed-average threshold detection against healthy drinking-water ranges
//! - A periodically retrained isolation-forest outlier ensemble
//! - Model freshness lifecycle with single-flight retraining
//! - Uniform alert records for a presentation layer
//! - Water-quality-index summaries and observability

pub mod anomaly;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod outlier;
pub mod quality;
pub mod ranges;

pub use anomaly::{
    aggregate, AlertRecord, AlertStatus, AlertSuppressor, ThresholdAlert, ThresholdDetector,
};
pub use config::EngineConfig;
pub use engine::{AnomalyEngine, EvaluationReport, ReadingBuffer};
pub use error::EngineError;
pub use models::{Parameter, Reading, PARAMETER_COUNT};
pub use observability::EngineMetrics;
pub use outlier::{FittedModel, ForestParams, IsolationForest, ModelLifecycle, OutlierLabel};
pub use quality::{water_quality_index, WqiBand, WqiSummary};
pub use ranges::{HealthyRange, RangeBreach, RangeTable};
