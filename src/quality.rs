//! Water Quality Index summary
//!
//! Collapses pH, TDS and turbidity into a single 0-100 score with an
//! operational band for at-a-glance triage. The score is informational
//! only; alerting is the detectors' job.

use serde::{Deserialize, Serialize};

use crate::models::Reading;

/// Operational band for a WQI score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WqiBand {
    /// Score >= 90: system performing well
    Excellent,
    /// Score >= 80: filter cleanup recommended
    CleanupRecommended,
    /// Below 80: perform system maintenance
    MaintenanceRequired,
}

/// WQI score with its band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WqiSummary {
    /// 0-100, rounded to 2 decimals
    pub score: f64,
    pub band: WqiBand,
}

/// Compute the index from the three contributing parameters.
pub fn water_quality_index(ph: f64, tds: f64, turbidity: f64) -> WqiSummary {
    let score = (ph_index(ph) + tds_index(tds) + turbidity_index(turbidity)) / 3.0;
    let score = (score.min(100.0) * 100.0).round() / 100.0;

    let band = if score >= 90.0 {
        WqiBand::Excellent
    } else if score >= 80.0 {
        WqiBand::CleanupRecommended
    } else {
        WqiBand::MaintenanceRequired
    };

    WqiSummary { score, band }
}

/// Index for one reading's values.
pub fn for_reading(reading: &Reading) -> WqiSummary {
    water_quality_index(reading.ph, reading.tds, reading.turbidity)
}

fn ph_index(ph: f64) -> f64 {
    if (6.5..=8.5).contains(&ph) {
        return 100.0;
    }
    let distance = (ph - 7.0).abs().min((ph - 7.5).abs());
    (100.0 - distance * 30.0).clamp(0.0, 100.0)
}

fn tds_index(tds: f64) -> f64 {
    if tds < 300.0 {
        return 100.0;
    }
    (100.0 - tds * 0.1).clamp(0.0, 100.0)
}

fn turbidity_index(turbidity: f64) -> f64 {
    if turbidity < 1.0 {
        return 100.0;
    }
    (100.0 - (turbidity - 5.0) * 10.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_water_scores_excellent() {
        let summary = water_quality_index(7.2, 50.0, 0.5);
        assert_eq!(summary.score, 100.0);
        assert_eq!(summary.band, WqiBand::Excellent);
    }

    #[test]
    fn test_contaminated_water_needs_maintenance() {
        // pH 5.5, TDS 900 mg/L, turbidity 30 NTU
        let summary = water_quality_index(5.5, 900.0, 30.0);
        assert!(summary.score < 80.0, "score was {}", summary.score);
        assert_eq!(summary.band, WqiBand::MaintenanceRequired);
    }

    #[test]
    fn test_score_never_exceeds_bounds() {
        for (ph, tds, turbidity) in [(0.0, 5000.0, 100.0), (7.0, 0.0, 0.0), (14.0, 299.0, 0.9)] {
            let summary = water_quality_index(ph, tds, turbidity);
            assert!((0.0..=100.0).contains(&summary.score));
        }
    }

    #[test]
    fn test_moderate_degradation_flags_cleanup() {
        // Slightly elevated TDS pulls the score into the cleanup band
        let summary = water_quality_index(7.2, 500.0, 0.5);
        assert_eq!(summary.band, WqiBand::CleanupRecommended);
        assert!((80.0..90.0).contains(&summary.score), "score was {}", summary.score);
    }
}
