//! Alert aggregation
//!
//! Merges one cycle's threshold alerts and outlier labels into a uniform
//! record stream for the presentation layer. Pure per call: no cross-cycle
//! state lives here, and identical inputs yield identical output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::threshold::ThresholdAlert;
use crate::models::{Parameter, Reading};
use crate::outlier::OutlierLabel;
use crate::ranges::{RangeBreach, RangeTable};

/// Uniform alert record emitted by one evaluation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertRecord {
    /// A windowed-average breach of a healthy range
    Threshold {
        timestamp: DateTime<Utc>,
        alert: ThresholdAlert,
    },
    /// A reading the outlier ensemble scored as jointly implausible
    Outlier {
        timestamp: DateTime<Utc>,
        reading: Reading,
        /// Continuous isolation score, kept for triage
        score: f64,
        /// Parameters of the reading outside their healthy range. May be
        /// empty: a reading can be an outlier without any single parameter
        /// breaching, in which case the record still carries its values.
        breaches: Vec<RangeBreach>,
    },
}

impl AlertRecord {
    /// When the flagged condition was observed
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AlertRecord::Threshold { timestamp, .. } => *timestamp,
            AlertRecord::Outlier { timestamp, .. } => *timestamp,
        }
    }

    /// Parameter/value pairs for uniform rendering
    pub fn values(&self) -> Vec<(Parameter, f64)> {
        match self {
            AlertRecord::Threshold { alert, .. } => vec![(alert.parameter, alert.value)],
            AlertRecord::Outlier { reading, .. } => Parameter::ALL
                .into_iter()
                .map(|parameter| (parameter, reading.value(parameter)))
                .collect(),
        }
    }
}

/// Merge threshold alerts and per-reading outlier labels into alert records.
///
/// `labels` is positional against `readings`, as produced by the scorer; an
/// empty slice means the outlier path was skipped this cycle. Threshold
/// records carry the cycle time `now`; outlier records carry the flagged
/// reading's own timestamp.
pub fn aggregate(
    threshold_alerts: &[ThresholdAlert],
    readings: &[Reading],
    labels: &[OutlierLabel],
    ranges: &RangeTable,
    now: DateTime<Utc>,
) -> Vec<AlertRecord> {
    let mut records = Vec::with_capacity(threshold_alerts.len());

    for alert in threshold_alerts {
        records.push(AlertRecord::Threshold {
            timestamp: now,
            alert: alert.clone(),
        });
    }

    for (reading, label) in readings.iter().zip(labels) {
        if !label.is_outlier {
            continue;
        }
        records.push(AlertRecord::Outlier {
            timestamp: reading.timestamp,
            reading: reading.clone(),
            score: label.score,
            breaches: ranges.breaches(reading),
        });
    }

    records
}
