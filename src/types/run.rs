//! Agent Run Results
//!
//! A `RunResult` is the immutable output of one agent execution: the
//! findings it recorded, performance measurements, and an accessibility
//! score. `success` is derived, never set directly: a run succeeds exactly
//! when it recorded no critical finding.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::finding::{Finding, Severity};

/// Agent variant discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    UserJourney,
    Admin,
    AiQuality,
    Load,
    Visual,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UserJourney => "user_journey",
            Self::Admin => "admin",
            Self::AiQuality => "ai_quality",
            Self::Load => "load",
            Self::Visual => "visual",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user_journey" | "journey" => Ok(Self::UserJourney),
            "admin" | "security" => Ok(Self::Admin),
            "ai_quality" | "ai" => Ok(Self::AiQuality),
            "load" => Ok(Self::Load),
            "visual" => Ok(Self::Visual),
            _ => Err(format!(
                "Unknown agent kind: {}. Valid values: user_journey, admin, ai_quality, load, visual",
                s
            )),
        }
    }
}

/// The output of one agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub agent_kind: AgentKind,
    pub persona: Option<String>,
    /// True iff no finding has severity critical
    pub success: bool,
    pub findings: Vec<Finding>,
    /// Named numeric measurements (response time, memory, request count, ...)
    pub performance_metrics: BTreeMap<String, f64>,
    /// Accessibility score in [0, 100]
    pub accessibility_score: u8,
    pub duration: Duration,
    /// Free-text remediation hints from the agent itself
    pub recommendations: Vec<String>,
    /// Set when the run was cut short by cancellation
    pub incomplete: bool,
}

impl RunResult {
    pub fn builder(agent_kind: AgentKind) -> RunResultBuilder {
        RunResultBuilder {
            agent_kind,
            persona: None,
            findings: Vec::new(),
            performance_metrics: BTreeMap::new(),
            accessibility_score: 100,
            duration: Duration::ZERO,
            recommendations: Vec::new(),
            incomplete: false,
        }
    }

    /// Count findings at a given severity
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

/// Builder enforcing the success and clamping invariants
#[derive(Debug)]
pub struct RunResultBuilder {
    agent_kind: AgentKind,
    persona: Option<String>,
    findings: Vec<Finding>,
    performance_metrics: BTreeMap<String, f64>,
    accessibility_score: u8,
    duration: Duration,
    recommendations: Vec<String>,
    incomplete: bool,
}

impl RunResultBuilder {
    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn finding(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }

    pub fn findings(mut self, findings: impl IntoIterator<Item = Finding>) -> Self {
        self.findings.extend(findings);
        self
    }

    /// Record a measurement; negative values are clamped to 0.
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.performance_metrics.insert(name.into(), value.max(0.0));
        self
    }

    /// Set the accessibility score; values above 100 are clamped.
    pub fn accessibility_score(mut self, score: u32) -> Self {
        self.accessibility_score = score.min(100) as u8;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn recommendation(mut self, text: impl Into<String>) -> Self {
        self.recommendations.push(text.into());
        self
    }

    pub fn incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }

    pub fn build(self) -> RunResult {
        let success = !self
            .findings
            .iter()
            .any(|f| f.severity == Severity::Critical);
        RunResult {
            agent_kind: self.agent_kind,
            persona: self.persona,
            success,
            findings: self.findings,
            performance_metrics: self.performance_metrics,
            accessibility_score: self.accessibility_score,
            duration: self.duration,
            recommendations: self.recommendations,
            incomplete: self.incomplete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::finding::FindingKind;

    fn finding(severity: Severity) -> Finding {
        Finding::builder(FindingKind::Functionality, severity)
            .component("test")
            .message("probe")
            .build()
    }

    #[test]
    fn success_derived_from_findings() {
        let passed = RunResult::builder(AgentKind::Admin)
            .finding(finding(Severity::High))
            .finding(finding(Severity::Low))
            .build();
        assert!(passed.success);

        let failed = RunResult::builder(AgentKind::Admin)
            .finding(finding(Severity::Critical))
            .build();
        assert!(!failed.success);
    }

    #[test]
    fn metrics_clamped_non_negative() {
        let result = RunResult::builder(AgentKind::Load)
            .metric("api_response_time", -12.0)
            .metric("throughput", 140.0)
            .build();
        assert_eq!(result.performance_metrics["api_response_time"], 0.0);
        assert_eq!(result.performance_metrics["throughput"], 140.0);
    }

    #[test]
    fn accessibility_score_clamped() {
        let result = RunResult::builder(AgentKind::UserJourney)
            .accessibility_score(250)
            .build();
        assert_eq!(result.accessibility_score, 100);
    }

    #[test]
    fn agent_kind_round_trip() {
        for kind in [
            AgentKind::UserJourney,
            AgentKind::Admin,
            AgentKind::AiQuality,
            AgentKind::Load,
            AgentKind::Visual,
        ] {
            let parsed: AgentKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
