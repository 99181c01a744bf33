//! Core data models for the detection engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of sensor parameters carried by every reading
pub const PARAMETER_COUNT: usize = 5;

/// Water-quality parameters measured on every reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Ph,
    Tds,
    Turbidity,
    Flow,
    Temperature,
}

impl Parameter {
    /// All parameters in their fixed evaluation order
    pub const ALL: [Parameter; PARAMETER_COUNT] = [
        Parameter::Ph,
        Parameter::Tds,
        Parameter::Turbidity,
        Parameter::Flow,
        Parameter::Temperature,
    ];

    /// Display name as reported to operators
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Ph => "pH",
            Parameter::Tds => "TDS",
            Parameter::Turbidity => "turbidity",
            Parameter::Flow => "flow",
            Parameter::Temperature => "temperature",
        }
    }

    /// Position in the fixed feature-vector layout
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single multi-parameter sensor reading
///
/// Immutable once produced by the ingestion collaborator. Timestamps are
/// wall-clock UTC; batches are ordered by timestamp and may contain
/// duplicate timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "TDS")]
    pub tds: f64,
    pub turbidity: f64,
    pub flow: f64,
    pub temperature: f64,
}

impl Reading {
    /// Value of one parameter
    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Ph => self.ph,
            Parameter::Tds => self.tds,
            Parameter::Turbidity => self.turbidity,
            Parameter::Flow => self.flow,
            Parameter::Temperature => self.temperature,
        }
    }

    /// Feature vector in the fixed parameter order.
    ///
    /// A faulted sensor shows up as a non-finite value; the offending
    /// parameter is returned as the error so callers can surface it.
    pub fn feature_vector(&self) -> Result<[f64; PARAMETER_COUNT], Parameter> {
        let mut features = [0.0; PARAMETER_COUNT];
        for parameter in Parameter::ALL {
            let value = self.value(parameter);
            if !value.is_finite() {
                return Err(parameter);
            }
            features[parameter.index()] = value;
        }
        Ok(features)
    }
}
