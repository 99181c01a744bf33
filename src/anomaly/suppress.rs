//! Cross-cycle alert suppression
//!
//! The aggregator is pure per cycle, so a consumer polling every few
//! seconds would surface the same alert on every poll. This component
//! tracks recently emitted alert keys and drops repeats inside a
//! configurable window. Opt-in: the engine never applies it on its own.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::aggregator::AlertRecord;
use crate::models::Parameter;

/// Default suppression window (15 minutes)
const DEFAULT_SUPPRESS_WINDOW_SECS: u64 = 15 * 60;

/// Key for suppression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SuppressKey {
    Threshold(Parameter),
    Outlier(Option<Parameter>),
}

fn keys_for(record: &AlertRecord) -> Vec<SuppressKey> {
    match record {
        AlertRecord::Threshold { alert, .. } => vec![SuppressKey::Threshold(alert.parameter)],
        AlertRecord::Outlier { breaches, .. } => {
            if breaches.is_empty() {
                vec![SuppressKey::Outlier(None)]
            } else {
                breaches
                    .iter()
                    .map(|b| SuppressKey::Outlier(Some(b.parameter)))
                    .collect()
            }
        }
    }
}

/// Drops alert records whose keys were emitted within the window
pub struct AlertSuppressor {
    window: Duration,
    recent: RwLock<HashMap<SuppressKey, Instant>>,
}

impl AlertSuppressor {
    /// Create a suppressor with the default 15-minute window
    pub fn new() -> Self {
        Self {
            window: Duration::from_secs(DEFAULT_SUPPRESS_WINDOW_SECS),
            recent: RwLock::new(HashMap::new()),
        }
    }

    /// Set a custom suppression window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Whether every key of this record was emitted within the window
    pub fn should_suppress(&self, record: &AlertRecord) -> bool {
        let recent = self.recent.read().unwrap();
        keys_for(record).iter().all(|key| {
            recent
                .get(key)
                .map(|seen| seen.elapsed() < self.window)
                .unwrap_or(false)
        })
    }

    /// Record that this alert was emitted
    pub fn record(&self, record: &AlertRecord) {
        let mut recent = self.recent.write().unwrap();
        let now = Instant::now();
        for key in keys_for(record) {
            recent.insert(key, now);
        }
        recent.retain(|_, seen| seen.elapsed() < self.window);
    }

    /// Drop records already emitted within the window, recording the rest.
    pub fn filter(&self, records: Vec<AlertRecord>) -> Vec<AlertRecord> {
        records
            .into_iter()
            .filter(|record| {
                if self.should_suppress(record) {
                    return false;
                }
                self.record(record);
                true
            })
            .collect()
    }

    /// Clear expired entries
    pub fn cleanup(&self) {
        let mut recent = self.recent.write().unwrap();
        recent.retain(|_, seen| seen.elapsed() < self.window);
    }
}

impl Default for AlertSuppressor {
    fn default() -> Self {
        Self::new()
    }
}
