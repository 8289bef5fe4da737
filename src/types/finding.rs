//! Finding Value Types
//!
//! A `Finding` is one structured observation of a problem recorded by an
//! agent check. Findings are immutable once recorded and always carry a
//! non-empty reproduction trail.

use serde::{Deserialize, Serialize};

/// Problem category a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Functionality,
    Accessibility,
    Performance,
    AiQuality,
    Security,
    Usability,
    VisualRegression,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Functionality => "functionality",
            Self::Accessibility => "accessibility",
            Self::Performance => "performance",
            Self::AiQuality => "ai_quality",
            Self::Security => "security",
            Self::Usability => "usability",
            Self::VisualRegression => "visual_regression",
        };
        write!(f, "{}", s)
    }
}

impl FindingKind {
    /// All kinds in a stable order (used for grouped recommendation output)
    pub const ALL: [FindingKind; 7] = [
        Self::Functionality,
        Self::Accessibility,
        Self::Performance,
        Self::AiQuality,
        Self::Security,
        Self::Usability,
        Self::VisualRegression,
    ];
}

/// Severity of a finding, totally ordered critical > high > medium > low
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Rank for sorting: critical first
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// The more severe of two severities
    pub fn max(self, other: Self) -> Self {
        if self.rank() <= other.rank() { self } else { other }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{}", s)
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    // "Greater" means more severe, so compare inverted ranks.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.rank().cmp(&self.rank())
    }
}

/// One structured observation of a problem (error/violation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    /// Subsystem under test that produced the observation
    pub component: String,
    pub message: String,
    pub expected: String,
    pub actual: String,
    /// Ordered reproduction trail; never empty
    pub reproduction_steps: Vec<String>,
}

impl Finding {
    /// Start building a finding
    pub fn builder(kind: FindingKind, severity: Severity) -> FindingBuilder {
        FindingBuilder {
            kind,
            severity,
            component: String::new(),
            message: String::new(),
            expected: String::new(),
            actual: String::new(),
            reproduction_steps: Vec::new(),
        }
    }
}

/// Builder that guarantees the non-empty reproduction-steps invariant
#[derive(Debug, Clone)]
pub struct FindingBuilder {
    kind: FindingKind,
    severity: Severity,
    component: String,
    message: String,
    expected: String,
    actual: String,
    reproduction_steps: Vec<String>,
}

impl FindingBuilder {
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = actual.into();
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.reproduction_steps.push(step.into());
        self
    }

    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reproduction_steps
            .extend(steps.into_iter().map(Into::into));
        self
    }

    /// Finalize the finding. A finding with no recorded steps gets a single
    /// synthesized step naming the component, so the non-empty invariant
    /// holds for every finding in the system.
    pub fn build(mut self) -> Finding {
        if self.reproduction_steps.is_empty() {
            self.reproduction_steps
                .push(format!("Re-run the '{}' check", self.component));
        }
        Finding {
            kind: self.kind,
            severity: self.severity,
            component: self.component,
            message: self.message,
            expected: self.expected,
            actual: self.actual,
            reproduction_steps: self.reproduction_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Critical.max(Severity::Low), Severity::Critical);
        assert_eq!(Severity::Medium.max(Severity::High), Severity::High);
    }

    #[test]
    fn builder_keeps_explicit_steps() {
        let finding = Finding::builder(FindingKind::Security, Severity::High)
            .component("auth_api")
            .message("token accepted after expiry")
            .step("Create a session token")
            .step("Wait past the expiry window")
            .step("Replay the token")
            .build();
        assert_eq!(finding.reproduction_steps.len(), 3);
    }

    #[test]
    fn builder_synthesizes_step_when_missing() {
        let finding = Finding::builder(FindingKind::Performance, Severity::Low)
            .component("habits_api")
            .message("slow response")
            .build();
        assert!(!finding.reproduction_steps.is_empty());
        assert!(finding.reproduction_steps[0].contains("habits_api"));
    }

    #[test]
    fn kind_display_matches_serde_names() {
        assert_eq!(FindingKind::AiQuality.to_string(), "ai_quality");
        assert_eq!(FindingKind::VisualRegression.to_string(), "visual_regression");
        let json = serde_json::to_string(&FindingKind::AiQuality).unwrap();
        assert_eq!(json, "\"ai_quality\"");
    }
}
