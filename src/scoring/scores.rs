//! Dimensional Score Computation
//!
//! Pure functions from run results to clamped [0, 100] scores. Each score
//! starts at 100 and loses severity-weighted penalties; nothing here
//! performs I/O or consults shared state, so repeated calls over the same
//! input are identical.

use crate::constants::scoring::*;
use crate::types::{Finding, FindingKind, ReportSummary, RunResult, Scores, Severity};

fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

fn findings(results: &[RunResult]) -> impl Iterator<Item = &Finding> {
    results.iter().flat_map(|r| r.findings.iter())
}

/// Overall quality: 100 − 30·critical − 15·high − 5·medium
pub fn quality_score(results: &[RunResult]) -> u8 {
    let mut score = 100i32;
    for finding in findings(results) {
        score -= match finding.severity {
            Severity::Critical => QUALITY_CRITICAL_PENALTY,
            Severity::High => QUALITY_HIGH_PENALTY,
            Severity::Medium => QUALITY_MEDIUM_PENALTY,
            Severity::Low => 0,
        };
    }
    clamp_score(score)
}

/// Accessibility: mean of each run's own accessibility score. An empty
/// result set scores 100 (no evidence of problems).
pub fn accessibility_score(results: &[RunResult]) -> u8 {
    if results.is_empty() {
        return 100;
    }
    let sum: u32 = results.iter().map(|r| r.accessibility_score as u32).sum();
    let mean = sum as f64 / results.len() as f64;
    clamp_score(mean.round() as i32)
}

/// A single run's own accessibility score from its findings:
/// 100 − 25·critical − 10·high over accessibility findings, clamped.
/// Agents call this when building their RunResult.
pub fn run_accessibility_score(run_findings: &[Finding]) -> u8 {
    let mut score = 100i32;
    for finding in run_findings
        .iter()
        .filter(|f| f.kind == FindingKind::Accessibility)
    {
        score -= match finding.severity {
            Severity::Critical => A11Y_CRITICAL_PENALTY,
            Severity::High => A11Y_HIGH_PENALTY,
            _ => 0,
        };
    }
    clamp_score(score)
}

/// Performance: severity-weighted penalties over performance findings, plus
/// a slow-API penalty from the mean api_response_time across results.
pub fn performance_score(results: &[RunResult]) -> u8 {
    let mut score = 100i32;
    for finding in findings(results).filter(|f| f.kind == FindingKind::Performance) {
        score -= PERF_PENALTIES[finding.severity.rank() as usize];
    }

    let samples: Vec<f64> = results
        .iter()
        .filter_map(|r| r.performance_metrics.get("api_response_time").copied())
        .collect();
    if !samples.is_empty() {
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        if mean > PERF_SLOW_MS {
            score -= PERF_SLOW_PENALTY;
        }
        if mean > PERF_VERY_SLOW_MS {
            score -= PERF_VERY_SLOW_EXTRA_PENALTY;
        }
    }

    clamp_score(score)
}

/// Security: 100 − 50/25/10/5 per security finding by severity
pub fn security_score(results: &[RunResult]) -> u8 {
    let mut score = 100i32;
    for finding in findings(results).filter(|f| f.kind == FindingKind::Security) {
        score -= SECURITY_PENALTIES[finding.severity.rank() as usize];
    }
    clamp_score(score)
}

/// All four dimensional scores at once
pub fn compute_scores(results: &[RunResult]) -> Scores {
    Scores {
        quality: quality_score(results),
        accessibility: accessibility_score(results),
        performance: performance_score(results),
        security: security_score(results),
    }
}

/// Counts by status and severity; success_rate is 0 when there are no runs.
pub fn summarize(results: &[RunResult]) -> ReportSummary {
    let total_runs = results.len();
    let passed_runs = results.iter().filter(|r| r.success).count();
    let failed_runs = total_runs - passed_runs;
    let success_rate = if total_runs == 0 {
        0.0
    } else {
        passed_runs as f64 / total_runs as f64 * 100.0
    };

    let mut summary = ReportSummary {
        total_runs,
        passed_runs,
        failed_runs,
        success_rate,
        ..ReportSummary::default()
    };

    for finding in findings(results) {
        summary.total_findings += 1;
        match finding.severity {
            Severity::Critical => summary.critical_errors += 1,
            Severity::High => summary.high_errors += 1,
            Severity::Medium => summary.medium_errors += 1,
            Severity::Low => summary.low_errors += 1,
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentKind, Finding};

    fn result_with(findings: Vec<Finding>) -> RunResult {
        RunResult::builder(AgentKind::Admin).findings(findings).build()
    }

    fn finding(kind: FindingKind, severity: Severity) -> Finding {
        Finding::builder(kind, severity)
            .component("test_api")
            .message("probe failure")
            .build()
    }

    #[test]
    fn clean_results_score_perfect() {
        let results = vec![result_with(vec![]), result_with(vec![]), result_with(vec![])];
        let scores = compute_scores(&results);
        assert_eq!(scores.quality, 100);
        assert_eq!(scores.accessibility, 100);
        assert_eq!(scores.performance, 100);
        assert_eq!(scores.security, 100);
    }

    #[test]
    fn quality_penalties_by_severity() {
        let results = vec![result_with(vec![
            finding(FindingKind::Functionality, Severity::Critical),
            finding(FindingKind::Functionality, Severity::High),
            finding(FindingKind::Functionality, Severity::Medium),
            finding(FindingKind::Functionality, Severity::Low),
        ])];
        // 100 - 30 - 15 - 5 - 0
        assert_eq!(quality_score(&results), 50);
    }

    #[test]
    fn quality_clamps_at_zero() {
        let results = vec![result_with(
            (0..10)
                .map(|_| finding(FindingKind::Functionality, Severity::Critical))
                .collect(),
        )];
        assert_eq!(quality_score(&results), 0);
    }

    #[test]
    fn one_critical_security_finding_scores_fifty() {
        let results = vec![result_with(vec![finding(
            FindingKind::Security,
            Severity::Critical,
        )])];
        assert_eq!(security_score(&results), 50);
    }

    #[test]
    fn performance_slow_api_penalty_tiers() {
        let fast = vec![RunResult::builder(AgentKind::Load)
            .metric("api_response_time", 400.0)
            .build()];
        assert_eq!(performance_score(&fast), 100);

        let slow = vec![RunResult::builder(AgentKind::Load)
            .metric("api_response_time", 3500.0)
            .build()];
        assert_eq!(performance_score(&slow), 80);

        let very_slow = vec![RunResult::builder(AgentKind::Load)
            .metric("api_response_time", 6000.0)
            .build()];
        assert_eq!(performance_score(&very_slow), 50);
    }

    #[test]
    fn run_accessibility_only_counts_a11y_findings() {
        let findings = vec![
            finding(FindingKind::Accessibility, Severity::Critical),
            finding(FindingKind::Accessibility, Severity::High),
            finding(FindingKind::Security, Severity::Critical),
        ];
        // 100 - 25 - 10; the security finding does not count here
        assert_eq!(run_accessibility_score(&findings), 65);
    }

    #[test]
    fn accessibility_is_mean_of_runs() {
        let results = vec![
            RunResult::builder(AgentKind::UserJourney)
                .accessibility_score(80)
                .build(),
            RunResult::builder(AgentKind::UserJourney)
                .accessibility_score(100)
                .build(),
        ];
        assert_eq!(accessibility_score(&results), 90);
    }

    #[test]
    fn accessibility_mean_rounds_to_nearest() {
        let results = vec![
            RunResult::builder(AgentKind::UserJourney)
                .accessibility_score(99)
                .build(),
            RunResult::builder(AgentKind::UserJourney)
                .accessibility_score(100)
                .build(),
        ];
        assert_eq!(accessibility_score(&results), 100);
    }

    #[test]
    fn summary_success_rate_zero_without_runs() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_runs, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_severity() -> impl Strategy<Value = Severity> {
            prop_oneof![
                Just(Severity::Critical),
                Just(Severity::High),
                Just(Severity::Medium),
                Just(Severity::Low),
            ]
        }

        fn arb_kind() -> impl Strategy<Value = FindingKind> {
            prop_oneof![
                Just(FindingKind::Functionality),
                Just(FindingKind::Performance),
                Just(FindingKind::Accessibility),
                Just(FindingKind::Security),
                Just(FindingKind::AiQuality),
                Just(FindingKind::Usability),
            ]
        }

        fn arb_results() -> impl Strategy<Value = Vec<RunResult>> {
            proptest::collection::vec(
                proptest::collection::vec((arb_kind(), arb_severity()), 0..8),
                0..5,
            )
            .prop_map(|runs| {
                runs.into_iter()
                    .map(|specs| {
                        result_with(specs.into_iter().map(|(k, s)| finding(k, s)).collect())
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn scores_stay_in_range(results in arb_results()) {
                let scores = compute_scores(&results);
                prop_assert!(scores.quality <= 100);
                prop_assert!(scores.accessibility <= 100);
                prop_assert!(scores.performance <= 100);
                prop_assert!(scores.security <= 100);
            }

            #[test]
            fn extra_finding_never_raises_quality(
                results in arb_results(),
                severity in arb_severity(),
            ) {
                let before = quality_score(&results);
                let mut worse = results.clone();
                worse.push(result_with(vec![finding(FindingKind::Functionality, severity)]));
                prop_assert!(quality_score(&worse) <= before);
            }

            #[test]
            fn security_ignores_other_kinds(results in arb_results()) {
                let stripped: Vec<RunResult> = results
                    .iter()
                    .map(|r| {
                        result_with(
                            r.findings
                                .iter()
                                .filter(|f| f.kind == FindingKind::Security)
                                .cloned()
                                .collect(),
                        )
                    })
                    .collect();
                prop_assert_eq!(security_score(&results), security_score(&stripped));
            }

            #[test]
            fn summary_counts_add_up(results in arb_results()) {
                let summary = summarize(&results);
                prop_assert_eq!(
                    summary.total_findings,
                    summary.critical_errors
                        + summary.high_errors
                        + summary.medium_errors
                        + summary.low_errors
                );
                prop_assert_eq!(summary.total_runs, summary.passed_runs + summary.failed_runs);
            }
        }
    }

    #[test]
    fn summary_counts_by_severity() {
        let results = vec![
            result_with(vec![
                finding(FindingKind::Security, Severity::Critical),
                finding(FindingKind::Performance, Severity::Medium),
            ]),
            result_with(vec![finding(FindingKind::Usability, Severity::Low)]),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total_runs, 2);
        assert_eq!(summary.passed_runs, 1);
        assert_eq!(summary.failed_runs, 1);
        assert_eq!(summary.success_rate, 50.0);
        assert_eq!(summary.critical_errors, 1);
        assert_eq!(summary.medium_errors, 1);
        assert_eq!(summary.low_errors, 1);
        assert_eq!(summary.total_findings, 3);
    }
}
