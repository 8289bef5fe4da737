//! Report History & Trend Analytics
//!
//! Append-only in-memory history of suite reports with rolling-window trend
//! queries and a health dashboard snapshot. Reports are immutable once
//! appended; every query reads a point-in-time snapshot under the lock, so
//! concurrent appends never skew a computation in progress.
//!
//! ## Modules
//!
//! - `archive`: SQLite persistence for reports across process restarts

pub mod archive;

pub use archive::ReportArchive;

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::trends::{
    DEFAULT_WINDOW, RED_SECURITY_SCORE, YELLOW_QUALITY_SCORE, YELLOW_SUCCESS_RATE,
};
use crate::types::{Result, Scores, SuiteReport};

/// Direction of the success-rate trend across the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

/// Raw per-score series across the window, most recent first. Empty when
/// the window is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreSeries {
    pub success_rate: Vec<f64>,
    pub quality: Vec<u8>,
    pub accessibility: Vec<u8>,
    pub performance: Vec<u8>,
    pub security: Vec<u8>,
}

/// Rolling-window series and averages over recent reports. All means are 0
/// when the window is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalytics {
    /// Window size the history was configured with
    pub window: usize,
    /// Reports actually present in the window
    pub reports_analyzed: usize,
    pub series: ScoreSeries,
    pub avg_success_rate: f64,
    pub avg_quality_score: f64,
    pub avg_accessibility_score: f64,
    pub avg_performance_score: f64,
    pub avg_security_score: f64,
    pub total_critical_errors: usize,
    pub direction: TrendDirection,
}

impl TrendAnalytics {
    fn empty(window: usize) -> Self {
        Self {
            window,
            reports_analyzed: 0,
            series: ScoreSeries::default(),
            avg_success_rate: 0.0,
            avg_quality_score: 0.0,
            avg_accessibility_score: 0.0,
            avg_performance_score: 0.0,
            avg_security_score: 0.0,
            total_critical_errors: 0,
            direction: TrendDirection::Stable,
        }
    }
}

/// Tri-state health classification for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

/// Point-in-time dashboard state derived from the latest report and trend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub status: HealthStatus,
    pub last_run: Option<DateTime<Utc>>,
    pub latest_scores: Option<Scores>,
    pub latest_success_rate: f64,
    /// Alerts on the latest report
    pub open_alerts: usize,
    /// Findings on the latest report, counted per kind
    pub findings_by_kind: BTreeMap<String, usize>,
    pub trend: TrendAnalytics,
}

/// Append-only suite report history
pub struct History {
    reports: RwLock<Vec<SuiteReport>>,
    window: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl History {
    pub fn new(window: usize) -> Self {
        Self {
            reports: RwLock::new(Vec::new()),
            window: window.max(1),
        }
    }

    /// Rebuild an in-memory history from archived reports, oldest first.
    pub fn from_archive(archive: &ReportArchive, window: usize) -> Result<Self> {
        let history = Self::new(window);
        let mut reports = archive.load_recent(window)?;
        reports.sort_by_key(|r| r.timestamp);
        {
            let mut guard = history.reports.write().expect("history lock poisoned");
            *guard = reports;
        }
        Ok(history)
    }

    pub fn append(&self, report: SuiteReport) {
        let mut reports = self.reports.write().expect("history lock poisoned");
        reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.read().expect("history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn latest(&self) -> Option<SuiteReport> {
        self.reports
            .read()
            .expect("history lock poisoned")
            .last()
            .cloned()
    }

    /// The most recent `n` reports, oldest first
    pub fn recent(&self, n: usize) -> Vec<SuiteReport> {
        let reports = self.reports.read().expect("history lock poisoned");
        let start = reports.len().saturating_sub(n);
        reports[start..].to_vec()
    }

    /// All reports for one suite, oldest first
    pub fn for_suite(&self, suite_id: &str) -> Vec<SuiteReport> {
        self.reports
            .read()
            .expect("history lock poisoned")
            .iter()
            .filter(|r| r.suite_id == suite_id)
            .cloned()
            .collect()
    }

    /// Rolling-window trend over the configured window
    pub fn trend(&self) -> TrendAnalytics {
        self.trend_over(self.window)
    }

    /// Rolling-window trend over the most recent `window` reports
    pub fn trend_over(&self, window: usize) -> TrendAnalytics {
        let recent = self.recent(window.max(1));
        if recent.is_empty() {
            return TrendAnalytics::empty(window);
        }

        let n = recent.len() as f64;
        let mean = |f: &dyn Fn(&SuiteReport) -> f64| recent.iter().map(|r| f(r)).sum::<f64>() / n;

        // Series are exposed most recent first.
        let newest_first = || recent.iter().rev();
        let series = ScoreSeries {
            success_rate: newest_first().map(|r| r.summary.success_rate).collect(),
            quality: newest_first().map(|r| r.scores.quality).collect(),
            accessibility: newest_first().map(|r| r.scores.accessibility).collect(),
            performance: newest_first().map(|r| r.scores.performance).collect(),
            security: newest_first().map(|r| r.scores.security).collect(),
        };

        TrendAnalytics {
            window,
            reports_analyzed: recent.len(),
            series,
            avg_success_rate: mean(&|r| r.summary.success_rate),
            avg_quality_score: mean(&|r| r.scores.quality as f64),
            avg_accessibility_score: mean(&|r| r.scores.accessibility as f64),
            avg_performance_score: mean(&|r| r.scores.performance as f64),
            avg_security_score: mean(&|r| r.scores.security as f64),
            total_critical_errors: recent.iter().map(|r| r.summary.critical_errors).sum(),
            direction: direction_of(&recent),
        }
    }

    /// Dashboard snapshot: tri-state health from the latest report, plus the
    /// rolling trend. An empty history reads green with a zeroed trend.
    pub fn dashboard(&self) -> DashboardSnapshot {
        let latest = self.latest();
        let trend = self.trend();

        let status = match &latest {
            None => HealthStatus::Green,
            Some(report) => classify(report),
        };

        let mut findings_by_kind = BTreeMap::new();
        if let Some(report) = &latest {
            for finding in report.results.iter().flat_map(|r| r.findings.iter()) {
                *findings_by_kind.entry(finding.kind.to_string()).or_insert(0) += 1;
            }
        }

        DashboardSnapshot {
            status,
            last_run: latest.as_ref().map(|r| r.timestamp),
            latest_scores: latest.as_ref().map(|r| r.scores),
            latest_success_rate: latest.as_ref().map(|r| r.summary.success_rate).unwrap_or(0.0),
            open_alerts: latest.as_ref().map(|r| r.alerts.len()).unwrap_or(0),
            findings_by_kind,
            trend,
        }
    }
}

/// Health classification for one report:
/// red on critical findings or a weak security score, yellow on a weak
/// success rate or quality score, green otherwise.
fn classify(report: &SuiteReport) -> HealthStatus {
    if report.summary.critical_errors > 0 || report.scores.security < RED_SECURITY_SCORE {
        HealthStatus::Red
    } else if report.summary.success_rate < YELLOW_SUCCESS_RATE
        || report.scores.quality < YELLOW_QUALITY_SCORE
    {
        HealthStatus::Yellow
    } else {
        HealthStatus::Green
    }
}

/// Success-rate direction: compare the two halves of the window with a small
/// dead band so noise reads as stable.
fn direction_of(reports: &[SuiteReport]) -> TrendDirection {
    if reports.len() < 4 {
        return TrendDirection::Stable;
    }
    let mid = reports.len() / 2;
    let half_mean = |slice: &[SuiteReport]| {
        slice.iter().map(|r| r.summary.success_rate).sum::<f64>() / slice.len() as f64
    };
    let older = half_mean(&reports[..mid]);
    let newer = half_mean(&reports[mid..]);
    if newer > older + 2.0 {
        TrendDirection::Improving
    } else if newer < older - 2.0 {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReportSummary, Scores};
    use std::time::Duration;
    use uuid::Uuid;

    fn report(success_rate: f64, critical: usize, scores: Scores) -> SuiteReport {
        SuiteReport {
            id: Uuid::new_v4(),
            suite_id: "smoke".into(),
            trigger: "manual".into(),
            metadata: serde_json::Value::Null,
            timestamp: Utc::now(),
            duration: Duration::from_secs(1),
            results: vec![],
            summary: ReportSummary {
                total_runs: 4,
                passed_runs: 4,
                failed_runs: 0,
                success_rate,
                critical_errors: critical,
                ..Default::default()
            },
            scores,
            recommendations: vec![],
            alerts: vec![],
        }
    }

    fn healthy_scores() -> Scores {
        Scores {
            quality: 95,
            accessibility: 95,
            performance: 95,
            security: 95,
        }
    }

    #[test]
    fn empty_history_trend_is_zeroed() {
        let history = History::default();
        let trend = history.trend();
        assert_eq!(trend.reports_analyzed, 0);
        assert_eq!(trend.avg_success_rate, 0.0);
        assert_eq!(trend.avg_quality_score, 0.0);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert!(trend.series.success_rate.is_empty());
        assert!(trend.series.quality.is_empty());
    }

    #[test]
    fn trend_only_covers_the_window() {
        let history = History::new(3);
        for rate in [10.0, 20.0, 90.0, 95.0, 100.0] {
            history.append(report(rate, 0, healthy_scores()));
        }
        let trend = history.trend();
        assert_eq!(trend.reports_analyzed, 3);
        assert!((trend.avg_success_rate - 95.0).abs() < 1e-9);
        // newest first
        assert_eq!(trend.series.success_rate, vec![100.0, 95.0, 90.0]);
        assert_eq!(trend.series.quality, vec![95, 95, 95]);
    }

    #[test]
    fn direction_tracks_success_halves() {
        let history = History::new(DEFAULT_WINDOW);
        for rate in [60.0, 60.0, 95.0, 95.0] {
            history.append(report(rate, 0, healthy_scores()));
        }
        assert_eq!(history.trend().direction, TrendDirection::Improving);

        let history = History::new(DEFAULT_WINDOW);
        for rate in [95.0, 95.0, 60.0, 60.0] {
            history.append(report(rate, 0, healthy_scores()));
        }
        assert_eq!(history.trend().direction, TrendDirection::Declining);
    }

    #[test]
    fn dashboard_empty_history_is_green() {
        let history = History::default();
        let snapshot = history.dashboard();
        assert_eq!(snapshot.status, HealthStatus::Green);
        assert!(snapshot.last_run.is_none());
        assert_eq!(snapshot.trend.reports_analyzed, 0);
    }

    #[test]
    fn dashboard_red_on_critical_errors() {
        let history = History::default();
        history.append(report(100.0, 1, healthy_scores()));
        assert_eq!(history.dashboard().status, HealthStatus::Red);
    }

    #[test]
    fn dashboard_red_on_weak_security() {
        let history = History::default();
        let scores = Scores {
            security: 70,
            ..healthy_scores()
        };
        history.append(report(100.0, 0, scores));
        assert_eq!(history.dashboard().status, HealthStatus::Red);
    }

    #[test]
    fn dashboard_yellow_on_weak_success_or_quality() {
        let history = History::default();
        history.append(report(85.0, 0, healthy_scores()));
        assert_eq!(history.dashboard().status, HealthStatus::Yellow);

        let history = History::default();
        let scores = Scores {
            quality: 70,
            ..healthy_scores()
        };
        history.append(report(100.0, 0, scores));
        assert_eq!(history.dashboard().status, HealthStatus::Yellow);
    }

    #[test]
    fn dashboard_green_when_everything_holds() {
        let history = History::default();
        history.append(report(100.0, 0, healthy_scores()));
        let snapshot = history.dashboard();
        assert_eq!(snapshot.status, HealthStatus::Green);
        assert!(snapshot.last_run.is_some());
    }

    #[test]
    fn status_reflects_latest_report_only() {
        let history = History::default();
        history.append(report(100.0, 3, healthy_scores()));
        history.append(report(100.0, 0, healthy_scores()));
        assert_eq!(history.dashboard().status, HealthStatus::Green);
    }

    #[test]
    fn dashboard_counts_latest_findings_per_kind() {
        use crate::types::{AgentKind, Finding, FindingKind, RunResult, Severity};

        let mut latest = report(100.0, 0, healthy_scores());
        latest.results = vec![RunResult::builder(AgentKind::Admin)
            .findings(vec![
                Finding::builder(FindingKind::Security, Severity::High)
                    .component("login_api")
                    .message("weak session policy")
                    .build(),
                Finding::builder(FindingKind::Security, Severity::Low)
                    .component("login_api")
                    .message("verbose error body")
                    .build(),
                Finding::builder(FindingKind::Performance, Severity::Medium)
                    .component("search_api")
                    .message("slow response")
                    .build(),
            ])
            .build()];

        let history = History::default();
        history.append(report(100.0, 0, healthy_scores()));
        history.append(latest);

        let snapshot = history.dashboard();
        assert_eq!(snapshot.findings_by_kind.get("security"), Some(&2));
        assert_eq!(snapshot.findings_by_kind.get("performance"), Some(&1));
        assert_eq!(snapshot.findings_by_kind.len(), 2);
    }

    #[test]
    fn recent_returns_oldest_first() {
        let history = History::default();
        for rate in [10.0, 20.0, 30.0] {
            history.append(report(rate, 0, healthy_scores()));
        }
        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].summary.success_rate, 20.0);
        assert_eq!(recent[1].summary.success_rate, 30.0);
    }

    #[test]
    fn for_suite_filters_by_id() {
        let history = History::default();
        history.append(report(100.0, 0, healthy_scores()));
        let mut other = report(100.0, 0, healthy_scores());
        other.suite_id = "full_qa".into();
        history.append(other);
        assert_eq!(history.for_suite("smoke").len(), 1);
        assert_eq!(history.for_suite("full_qa").len(), 1);
        assert!(history.for_suite("nope").is_empty());
    }
}
