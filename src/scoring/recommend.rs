//! Recommendation Generation
//!
//! Pure function from findings to a ranked, deduplicated remediation list.
//! One recommendation per finding kind with at least one finding, plus one
//! component-reliability recommendation per component accumulating three or
//! more findings, sorted by priority (ties preserve discovery order) and
//! truncated to the top ten.

use std::collections::HashMap;

use crate::constants::scoring::{COMPONENT_RELIABILITY_THRESHOLD, MAX_RECOMMENDATIONS};
use crate::types::{Finding, FindingKind, Priority, Recommendation, RunResult, Severity};

/// Generate the ranked recommendation list for a set of run results
pub fn generate_recommendations(results: &[RunResult]) -> Vec<Recommendation> {
    let all: Vec<&Finding> = results.iter().flat_map(|r| r.findings.iter()).collect();
    let mut recommendations = Vec::new();

    // Kind groups, in order of first appearance
    let mut kind_order: Vec<FindingKind> = Vec::new();
    let mut by_kind: HashMap<FindingKind, Vec<&Finding>> = HashMap::new();
    for finding in &all {
        if !by_kind.contains_key(&finding.kind) {
            kind_order.push(finding.kind);
        }
        by_kind.entry(finding.kind).or_default().push(finding);
    }

    for kind in kind_order {
        let group = &by_kind[&kind];
        let priority = dominant_severity(group);
        recommendations.push(kind_recommendation(kind, group.len(), priority));
    }

    // Component reliability, in order of first appearance
    let mut component_order: Vec<&str> = Vec::new();
    let mut by_component: HashMap<&str, Vec<&Finding>> = HashMap::new();
    for finding in &all {
        if !by_component.contains_key(finding.component.as_str()) {
            component_order.push(&finding.component);
        }
        by_component
            .entry(&finding.component)
            .or_default()
            .push(finding);
    }

    for component in component_order {
        let group = &by_component[component];
        if group.len() >= COMPONENT_RELIABILITY_THRESHOLD {
            let priority = dominant_severity(group);
            recommendations.push(Recommendation {
                priority,
                category: "component_reliability".to_string(),
                title: format!("Stabilize the '{}' component", component),
                description: format!(
                    "{} accumulated {} findings across agents in this run, suggesting a \
                     systemic reliability problem rather than isolated defects.",
                    component,
                    group.len()
                ),
                action_items: vec![
                    format!("Review recent changes touching {}", component),
                    "Add regression coverage for the failing paths".to_string(),
                    "Schedule a focused reliability review".to_string(),
                ],
                estimated_effort: "1-2 weeks".to_string(),
                impact: "Reduces repeat failures concentrated in one subsystem".to_string(),
            });
        }
    }

    // Stable sort keeps discovery order within equal priorities.
    recommendations.sort_by_key(|r| r.priority.rank());
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

/// The most severe severity present in a group
fn dominant_severity(group: &[&Finding]) -> Priority {
    group
        .iter()
        .map(|f| f.severity)
        .fold(Severity::Low, Severity::max)
}

fn kind_recommendation(kind: FindingKind, count: usize, priority: Priority) -> Recommendation {
    let (category, title, action_items, effort, impact) = match kind {
        FindingKind::Functionality => (
            "critical_errors",
            "Fix functional errors blocking user flows",
            vec![
                "Reproduce each failing flow from the recorded steps".to_string(),
                "Prioritize fixes for flows with critical findings".to_string(),
                "Add end-to-end coverage for the repaired flows".to_string(),
            ],
            "3-5 days",
            "Restores core user journeys",
        ),
        FindingKind::Accessibility => (
            "accessibility",
            "Resolve accessibility violations",
            vec![
                "Audit flagged views against WCAG 2.1 AA".to_string(),
                "Fix missing labels, contrast, and focus order issues".to_string(),
                "Re-run the accessibility sweep after fixes".to_string(),
            ],
            "1 week",
            "Opens the product to assistive-technology users",
        ),
        FindingKind::Performance => (
            "performance",
            "Address performance regressions",
            vec![
                "Profile the endpoints exceeding response thresholds".to_string(),
                "Add caching or indexes where measurements point to hot paths".to_string(),
                "Re-baseline the load scenarios".to_string(),
            ],
            "1-2 weeks",
            "Keeps the product responsive under expected load",
        ),
        FindingKind::AiQuality => (
            "ai_quality",
            "Improve AI response quality",
            vec![
                "Review low-scoring quality dimensions per scenario".to_string(),
                "Tighten prompt templates and safety guardrails".to_string(),
                "Re-score the scenario battery after prompt changes".to_string(),
            ],
            "3-5 days",
            "Raises coaching quality and keeps high-stakes prompts safe",
        ),
        FindingKind::Security => (
            "security",
            "Close security findings",
            vec![
                "Triage each finding with the security checklist".to_string(),
                "Patch injection, auth, and tenant-isolation gaps first".to_string(),
                "Re-run the security battery to confirm closure".to_string(),
            ],
            "1 week",
            "Protects user data and tenant isolation",
        ),
        FindingKind::Usability => (
            "usability",
            "Smooth out usability friction",
            vec![
                "Walk the flagged journeys as each persona".to_string(),
                "Fix confusing states and dead ends".to_string(),
            ],
            "3-5 days",
            "Reduces drop-off in everyday flows",
        ),
        FindingKind::VisualRegression => (
            "visual_regression",
            "Reconcile visual regressions",
            vec![
                "Compare flagged snapshots against their baselines".to_string(),
                "Accept intentional changes, fix unintentional drift".to_string(),
                "Refresh baselines once reconciled".to_string(),
            ],
            "1-2 days",
            "Keeps the UI consistent across viewports and targets",
        ),
    };

    Recommendation {
        priority,
        category: category.to_string(),
        title: title.to_string(),
        description: format!("{} {} finding(s) recorded in this run.", count, kind),
        action_items,
        estimated_effort: effort.to_string(),
        impact: impact.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentKind, RunResult};

    fn finding(kind: FindingKind, severity: Severity, component: &str) -> Finding {
        Finding::builder(kind, severity)
            .component(component)
            .message("probe failure")
            .build()
    }

    fn result_with(findings: Vec<Finding>) -> RunResult {
        RunResult::builder(AgentKind::Admin).findings(findings).build()
    }

    #[test]
    fn no_findings_no_recommendations() {
        let results = vec![result_with(vec![]), result_with(vec![])];
        assert!(generate_recommendations(&results).is_empty());
    }

    #[test]
    fn one_recommendation_per_kind() {
        let results = vec![result_with(vec![
            finding(FindingKind::Security, Severity::High, "auth"),
            finding(FindingKind::Security, Severity::Low, "auth"),
            finding(FindingKind::Performance, Severity::Medium, "api"),
        ])];
        let recs = generate_recommendations(&results);
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().any(|r| r.category == "security"));
        assert!(recs.iter().any(|r| r.category == "performance"));
    }

    #[test]
    fn critical_security_finding_yields_critical_priority() {
        let results = vec![result_with(vec![finding(
            FindingKind::Security,
            Severity::Critical,
            "auth",
        )])];
        let recs = generate_recommendations(&results);
        let security = recs.iter().find(|r| r.category == "security").unwrap();
        assert_eq!(security.priority, Priority::Critical);
    }

    #[test]
    fn component_reliability_fires_at_three_findings() {
        // Three medium findings on habits_api spread across two results
        let results = vec![
            result_with(vec![
                finding(FindingKind::Functionality, Severity::Medium, "habits_api"),
                finding(FindingKind::Performance, Severity::Medium, "habits_api"),
            ]),
            result_with(vec![finding(
                FindingKind::Usability,
                Severity::Medium,
                "habits_api",
            )]),
        ];
        let recs = generate_recommendations(&results);
        let reliability = recs
            .iter()
            .find(|r| r.category == "component_reliability")
            .expect("expected component reliability recommendation");
        assert!(reliability.title.contains("habits_api"));
    }

    #[test]
    fn sorted_by_priority_then_discovery_order() {
        let results = vec![result_with(vec![
            finding(FindingKind::Usability, Severity::Low, "a"),
            finding(FindingKind::Security, Severity::Critical, "b"),
            finding(FindingKind::Performance, Severity::Critical, "c"),
        ])];
        let recs = generate_recommendations(&results);
        assert_eq!(recs[0].category, "security");
        assert_eq!(recs[1].category, "performance");
        assert_eq!(recs[2].category, "usability");
    }

    #[test]
    fn truncated_to_top_ten() {
        // 7 kinds + several reliability components
        let mut findings = Vec::new();
        for kind in FindingKind::ALL {
            for i in 0..3 {
                findings.push(finding(kind, Severity::Medium, &format!("comp_{}", i)));
            }
        }
        let results = vec![result_with(findings)];
        let recs = generate_recommendations(&results);
        assert!(recs.len() <= MAX_RECOMMENDATIONS);
    }

    #[test]
    fn action_items_never_empty() {
        let results = vec![result_with(
            FindingKind::ALL
                .iter()
                .map(|&k| finding(k, Severity::High, "x"))
                .collect(),
        )];
        for rec in generate_recommendations(&results) {
            assert!(!rec.action_items.is_empty());
        }
    }
}
