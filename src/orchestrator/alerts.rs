//! Alert Evaluation
//!
//! Threshold checks applied to every aggregated report. Thresholds come from
//! configuration with the crate-level defaults as fallback.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::alerts;
use crate::types::{Alert, ReportSummary, Scores};

/// Alerting thresholds, overridable via configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub min_success_rate: f64,
    pub min_performance_score: u8,
    pub min_accessibility_score: u8,
    pub min_security_score: u8,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_success_rate: alerts::MIN_SUCCESS_RATE,
            min_performance_score: alerts::MIN_PERFORMANCE_SCORE,
            min_accessibility_score: alerts::MIN_ACCESSIBILITY_SCORE,
            min_security_score: alerts::MIN_SECURITY_SCORE,
        }
    }
}

impl AlertConfig {
    /// Evaluate a report's summary and scores against the thresholds.
    /// Every breached threshold yields one alert; alerts are logged as they
    /// are raised.
    pub fn evaluate(&self, suite_id: &str, summary: &ReportSummary, scores: &Scores) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let mut raise = |code: &str, message: String| {
            warn!(suite = suite_id, code, "{}", message);
            alerts.push(Alert {
                code: code.to_string(),
                message,
            });
        };

        if summary.critical_errors > 0 {
            raise(
                "critical_errors",
                format!("{} critical finding(s) recorded", summary.critical_errors),
            );
        }
        if summary.success_rate < self.min_success_rate {
            raise(
                "low_success_rate",
                format!(
                    "Success rate {:.1}% below the {:.1}% floor",
                    summary.success_rate, self.min_success_rate
                ),
            );
        }
        if scores.performance < self.min_performance_score {
            raise(
                "low_performance",
                format!(
                    "Performance score {} below the {} floor",
                    scores.performance, self.min_performance_score
                ),
            );
        }
        if scores.accessibility < self.min_accessibility_score {
            raise(
                "low_accessibility",
                format!(
                    "Accessibility score {} below the {} floor",
                    scores.accessibility, self.min_accessibility_score
                ),
            );
        }
        if scores.security < self.min_security_score {
            raise(
                "low_security",
                format!(
                    "Security score {} below the {} floor",
                    scores.security, self.min_security_score
                ),
            );
        }

        alerts
    }
}
