//! Engine configuration

use anyhow::Result;
use chrono::Duration;
use serde::Deserialize;

use crate::error::EngineError;
use crate::models::Parameter;
use crate::ranges::{HealthyRange, RangeTable};

/// Detection-engine configuration
///
/// Every field has a sensible default, so an empty environment yields a
/// working engine. Healthy-range overrides are `[min, max]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Trailing window for threshold averaging, in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,

    /// Maximum outlier-model age before retraining, in hours
    #[serde(default = "default_retrain_interval_hours")]
    pub retrain_interval_hours: u64,

    /// Expected proportion of anomalous readings
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Minimum readings required to fit the outlier model
    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,

    /// Number of trees in the outlier ensemble
    #[serde(default = "default_tree_count")]
    pub tree_count: usize,

    /// Seed for the ensemble RNG; fresh entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub ph_range: Option<[f64; 2]>,
    #[serde(default)]
    pub tds_range: Option<[f64; 2]>,
    #[serde(default)]
    pub turbidity_range: Option<[f64; 2]>,
    #[serde(default)]
    pub flow_range: Option<[f64; 2]>,
    #[serde(default)]
    pub temperature_range: Option<[f64; 2]>,
}

fn default_window_minutes() -> u64 {
    5
}

fn default_retrain_interval_hours() -> u64 {
    24
}

fn default_contamination() -> f64 {
    0.03
}

fn default_min_training_samples() -> usize {
    10
}

fn default_tree_count() -> usize {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            retrain_interval_hours: default_retrain_interval_hours(),
            contamination: default_contamination(),
            min_training_samples: default_min_training_samples(),
            tree_count: default_tree_count(),
            seed: None,
            ph_range: None,
            tds_range: None,
            turbidity_range: None,
            flow_range: None,
            temperature_range: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (prefix `WQ_ENGINE`).
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("WQ_ENGINE"))
            .build()?;

        let config: EngineConfig = config.try_deserialize().unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_minutes == 0 {
            return Err(EngineError::InvalidConfiguration(
                "window_minutes must be positive".to_string(),
            ));
        }
        if self.retrain_interval_hours == 0 {
            return Err(EngineError::InvalidConfiguration(
                "retrain_interval_hours must be positive".to_string(),
            ));
        }
        if !(self.contamination > 0.0 && self.contamination < 0.5) {
            return Err(EngineError::InvalidConfiguration(format!(
                "contamination must be in (0, 0.5), got {}",
                self.contamination
            )));
        }
        if self.min_training_samples == 0 {
            return Err(EngineError::InvalidConfiguration(
                "min_training_samples must be positive".to_string(),
            ));
        }
        if self.tree_count == 0 {
            return Err(EngineError::InvalidConfiguration(
                "tree_count must be positive".to_string(),
            ));
        }
        self.range_table().map(|_| ())
    }

    /// Healthy-range table with any configured overrides applied.
    pub fn range_table(&self) -> Result<RangeTable, EngineError> {
        let overrides = [
            (Parameter::Ph, self.ph_range),
            (Parameter::Tds, self.tds_range),
            (Parameter::Turbidity, self.turbidity_range),
            (Parameter::Flow, self.flow_range),
            (Parameter::Temperature, self.temperature_range),
        ];

        let mut table = RangeTable::default();
        for (parameter, bounds) in overrides {
            if let Some([min, max]) = bounds {
                let range = HealthyRange::new(min, max).map_err(|_| {
                    EngineError::InvalidConfiguration(format!(
                        "invalid {parameter} range override: {min} - {max}"
                    ))
                })?;
                table = table.with_range(parameter, range);
            }
        }
        Ok(table)
    }

    /// Threshold-averaging window
    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes as i64)
    }

    /// Maximum model age before retraining
    pub fn retrain_interval(&self) -> Duration {
        Duration::hours(self.retrain_interval_hours as i64)
    }
}
