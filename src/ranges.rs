//! Healthy-range table for drinkable water
//!
//! Fixed per-parameter (min, max) bounds, set at startup and never mutated.
//! Both detectors consume this table: the threshold detector compares
//! windowed averages against it, the aggregator cross-references outlier
//! readings against it for operator triage.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{Parameter, Reading, PARAMETER_COUNT};

/// Acceptable interval for one water-quality parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthyRange {
    pub min: f64,
    pub max: f64,
}

impl HealthyRange {
    /// Build a range, rejecting inverted or non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, EngineError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(EngineError::InvalidConfiguration(format!(
                "healthy range bounds must be finite, got {min} - {max}"
            )));
        }
        if min > max {
            return Err(EngineError::InvalidConfiguration(format!(
                "healthy range min {min} exceeds max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Whether a value lies inside the range (inclusive on both ends)
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl std::fmt::Display for HealthyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

/// A parameter value outside its healthy range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBreach {
    pub parameter: Parameter,
    pub value: f64,
    pub range: HealthyRange,
}

/// Per-parameter healthy bounds for drinkable water
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeTable {
    ranges: [HealthyRange; PARAMETER_COUNT],
}

impl Default for RangeTable {
    fn default() -> Self {
        Self {
            ranges: [
                HealthyRange { min: 6.5, max: 8.5 },   // pH
                HealthyRange { min: 0.0, max: 1000.0 }, // TDS (mg/L)
                HealthyRange { min: 0.0, max: 1.0 },    // turbidity (NTU)
                HealthyRange { min: 0.5, max: 5.0 },    // flow (L/min)
                HealthyRange { min: 24.0, max: 26.0 },  // temperature (°C)
            ],
        }
    }
}

impl RangeTable {
    /// Bounds for one parameter
    pub fn get(&self, parameter: Parameter) -> HealthyRange {
        self.ranges[parameter.index()]
    }

    /// Override one parameter's bounds
    pub fn with_range(mut self, parameter: Parameter, range: HealthyRange) -> Self {
        self.ranges[parameter.index()] = range;
        self
    }

    /// Iterate bounds in the fixed parameter order
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, HealthyRange)> + '_ {
        Parameter::ALL
            .into_iter()
            .map(move |parameter| (parameter, self.get(parameter)))
    }

    /// Every parameter of the reading outside its bounds.
    ///
    /// Non-finite values count as breaches of nothing here; they are caught
    /// separately by the feature-vector accessor.
    pub fn breaches(&self, reading: &Reading) -> Vec<RangeBreach> {
        self.iter()
            .filter_map(|(parameter, range)| {
                let value = reading.value(parameter);
                (value.is_finite() && !range.contains(value)).then_some(RangeBreach {
                    parameter,
                    value,
                    range,
                })
            })
            .collect()
    }

    /// Reject any inverted or non-finite bounds.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (parameter, range) in self.iter() {
            HealthyRange::new(range.min, range.max).map_err(|_| {
                EngineError::InvalidConfiguration(format!(
                    "invalid healthy range for {parameter}: {range}"
                ))
            })?;
        }
        Ok(())
    }
}
