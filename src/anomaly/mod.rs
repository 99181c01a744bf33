//! Anomaly detection for water-quality readings
//!
//! This module provides:
//! - Windowed-average threshold detection against healthy ranges
//! - Aggregation of both detectors' findings into uniform alert records
//! - Optional cross-cycle alert suppression for polling consumers

mod aggregator;
mod suppress;
mod threshold;

pub use aggregator::{aggregate, AlertRecord};
pub use suppress::AlertSuppressor;
pub use threshold::{AlertStatus, ThresholdAlert, ThresholdDetector};
