//! Suite Reports and Recommendations
//!
//! A `SuiteReport` is the aggregated, immutable output of one suite
//! execution. It owns the run results it aggregates and is append-only once
//! created; trend computation always reads a snapshot.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::finding::Severity;
use super::run::RunResult;

/// Remediation priority, same total order as finding severity
pub type Priority = Severity;

/// Dimensional quality scores, each clamped to [0, 100]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Scores {
    pub quality: u8,
    pub accessibility: u8,
    pub performance: u8,
    pub security: u8,
}

/// Counts by status and severity across a suite run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_runs: usize,
    pub passed_runs: usize,
    pub failed_runs: usize,
    /// passed / total × 100; 0 when total is 0
    pub success_rate: f64,
    pub critical_errors: usize,
    pub high_errors: usize,
    pub medium_errors: usize,
    pub low_errors: usize,
    pub total_findings: usize,
}

/// One ranked remediation recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub title: String,
    pub description: String,
    /// Never empty
    pub action_items: Vec<String>,
    pub estimated_effort: String,
    pub impact: String,
}

/// Alert raised by threshold evaluation after aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub code: String,
    pub message: String,
}

/// Aggregated output of one suite execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub id: Uuid,
    pub suite_id: String,
    pub trigger: String,
    /// Caller-supplied context recorded with the trigger (commit, actor)
    #[serde(default)]
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub results: Vec<RunResult>,
    pub summary: ReportSummary,
    pub scores: Scores,
    pub recommendations: Vec<Recommendation>,
    pub alerts: Vec<Alert>,
}

impl SuiteReport {
    /// True when any run recorded a critical finding
    pub fn has_critical_errors(&self) -> bool {
        self.summary.critical_errors > 0
    }
}
