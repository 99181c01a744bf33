//! Windowed threshold detection
//!
//! Flags parameters whose trailing-window average drifts outside the
//! healthy drinking-water bounds. Only the window average is checked:
//! a single transient excursion that does not move the average does not
//! alert, trading detection latency for stability against sensor flicker.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Parameter, Reading};
use crate::ranges::RangeTable;

/// Default detection window (5 minutes)
const DEFAULT_WINDOW_MINUTES: i64 = 5;

/// Side of the healthy range a windowed average breached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    High,
    Low,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::High => write!(f, "High"),
            AlertStatus::Low => write!(f, "Low"),
        }
    }
}

/// Alert for one parameter whose windowed average left its healthy range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAlert {
    pub parameter: Parameter,
    /// Windowed average, rounded to 2 decimals for reporting
    pub value: f64,
    pub status: AlertStatus,
    /// Expected range rendered as "{min} - {max}"
    pub range: String,
    /// Description of the evaluated window
    pub time_window: String,
}

/// Compares trailing-window averages against the healthy-range table
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    ranges: RangeTable,
    window: Duration,
}

impl ThresholdDetector {
    /// Create a detector with the default 5-minute window
    pub fn new(ranges: RangeTable) -> Self {
        Self {
            ranges,
            window: Duration::minutes(DEFAULT_WINDOW_MINUTES),
        }
    }

    /// Set a custom averaging window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Detect breaches over the trailing window ending at `now`.
    ///
    /// Window selection is a pure filter (`timestamp >= now - window`). A
    /// parameter with no finite sample in the window is skipped: an empty
    /// window means "cannot assess", never "healthy". Output follows the
    /// fixed parameter order; no parameter is privileged.
    pub fn detect(&self, batch: &[Reading], now: DateTime<Utc>) -> Vec<ThresholdAlert> {
        let cutoff = now - self.window;
        let mut alerts = Vec::new();

        for (parameter, range) in self.ranges.iter() {
            let mut sum = 0.0;
            let mut count = 0usize;
            for reading in batch.iter().filter(|r| r.timestamp >= cutoff) {
                let value = reading.value(parameter);
                if value.is_finite() {
                    sum += value;
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }

            // Bounds comparison at full precision; rounding is for reporting only
            let average = sum / count as f64;
            let status = if average > range.max {
                AlertStatus::High
            } else if average < range.min {
                AlertStatus::Low
            } else {
                continue;
            };

            alerts.push(ThresholdAlert {
                parameter,
                value: round2(average),
                status,
                range: range.to_string(),
                time_window: format!("Last {} minutes (Average)", self.window.num_minutes()),
            });
        }
        alerts
    }

    /// The configured averaging window
    pub fn window(&self) -> Duration {
        self.window
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading_at(now: DateTime<Utc>, age_secs: i64, ph: f64, tds: f64) -> Reading {
        Reading {
            timestamp: now - Duration::seconds(age_secs),
            ph,
            tds,
            turbidity: 0.5,
            flow: 1.0,
            temperature: 25.0,
        }
    }

    #[test]
    fn test_healthy_batch_has_no_alerts() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        let batch: Vec<Reading> = (0..20).map(|i| reading_at(now, i * 10, 7.2, 50.0)).collect();

        assert!(detector.detect(&batch, now).is_empty());
    }

    #[test]
    fn test_high_ph_average_alerts_once() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        let batch: Vec<Reading> = (0..20).map(|i| reading_at(now, i * 10, 9.0, 50.0)).collect();

        let alerts = detector.detect(&batch, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].parameter, Parameter::Ph);
        assert_eq!(alerts[0].status, AlertStatus::High);
        assert_eq!(alerts[0].value, 9.0);
        assert_eq!(alerts[0].range, "6.5 - 8.5");
        assert_eq!(alerts[0].time_window, "Last 5 minutes (Average)");
    }

    #[test]
    fn test_low_ph_average_alerts_low() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        let batch: Vec<Reading> = (0..20).map(|i| reading_at(now, i * 10, 5.5, 50.0)).collect();

        let alerts = detector.detect(&batch, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].status, AlertStatus::Low);
    }

    #[test]
    fn test_transient_excursion_does_not_alert() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        let mut batch: Vec<Reading> =
            (1..20).map(|i| reading_at(now, i * 10, 7.2, 50.0)).collect();
        // One flicker to pH 10; the window average stays inside the range
        batch.insert(0, reading_at(now, 5, 10.0, 50.0));

        assert!(detector.detect(&batch, now).is_empty());
    }

    #[test]
    fn test_empty_window_skips_parameter() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        // All readings fall outside the 5-minute window
        let batch: Vec<Reading> = (0..20)
            .map(|i| reading_at(now, 3600 + i * 10, 9.0, 50.0))
            .collect();

        assert!(detector.detect(&batch, now).is_empty());
    }

    #[test]
    fn test_non_finite_samples_excluded_from_average() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        let mut batch: Vec<Reading> = (0..10).map(|i| reading_at(now, i * 10, 9.0, 50.0)).collect();
        batch.push(reading_at(now, 50, f64::NAN, 50.0));

        let alerts = detector.detect(&batch, now);
        // The NaN sample neither poisons the average nor suppresses the alert
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].value, 9.0);
    }

    #[test]
    fn test_widening_window_only_adds_readings() {
        let now = Utc::now();
        // Contaminated readings 6-8 minutes old, clean ones in the last 5
        let mut batch: Vec<Reading> =
            (0..12).map(|i| reading_at(now, 360 + i * 10, 10.0, 50.0)).collect();
        batch.extend((0..12).map(|i| reading_at(now, i * 10, 7.2, 50.0)));
        batch.sort_by_key(|r| r.timestamp);

        let narrow = ThresholdDetector::new(RangeTable::default());
        assert!(narrow.detect(&batch, now).is_empty());

        let wide =
            ThresholdDetector::new(RangeTable::default()).with_window(Duration::minutes(10));
        let alerts = wide.detect(&batch, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].parameter, Parameter::Ph);
        // (10.0 + 7.2) / 2 averaged over equal counts
        assert_eq!(alerts[0].value, 8.6);
    }

    #[test]
    fn test_reported_value_rounded_to_two_decimals() {
        let detector = ThresholdDetector::new(RangeTable::default());
        let now = Utc::now();
        let batch = vec![
            reading_at(now, 10, 9.111, 50.0),
            reading_at(now, 20, 9.222, 50.0),
            reading_at(now, 30, 9.333, 50.0),
        ];

        let alerts = detector.detect(&batch, now);
        assert_eq!(alerts[0].value, 9.22);
    }
}
