//! User-Journey Agent
//!
//! Replays named journeys — ordered sequences of navigate/click/input/wait/
//! verify/ai-interact steps — as a persona. A journey marked critical aborts
//! the remaining journeys on its first failing step and escalates that step
//! to a critical finding; non-critical journeys record the failure and move
//! on to the next journey.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Agent, AgentContext};
use crate::scoring::run_accessibility_score;
use crate::store::{Filter, row};
use crate::types::{AgentKind, Finding, FindingKind, RunResult, Severity};

const FIXTURE_OWNER: &str = "patrol_fixture";

/// One step inside a journey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Navigate,
    Click,
    Input,
    Wait,
    Verify,
    AiInteract,
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Input => "input",
            Self::Wait => "wait",
            Self::Verify => "verify",
            Self::AiInteract => "ai_interact",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub action: StepAction,
    pub target: String,
    pub value: Option<String>,
}

impl Step {
    fn new(action: StepAction, target: &str) -> Self {
        Self {
            action,
            target: target.to_string(),
            value: None,
        }
    }

    fn with_value(action: StepAction, target: &str, value: &str) -> Self {
        Self {
            action,
            target: target.to_string(),
            value: Some(value.to_string()),
        }
    }
}

/// A named, ordered sequence of steps
#[derive(Debug, Clone)]
pub struct Journey {
    pub name: String,
    /// Critical journeys abort the whole execution on first failure
    pub critical: bool,
    pub steps: Vec<Step>,
    /// Finding kind recorded for failures inside this journey
    kind: FindingKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct JourneyParams {
    /// Restrict execution to these journey names (all when empty)
    journeys: Vec<String>,
    /// Table used for CRUD fixture rows
    fixture_table: String,
}

impl Default for JourneyParams {
    fn default() -> Self {
        Self {
            journeys: Vec::new(),
            fixture_table: "habits".to_string(),
        }
    }
}

/// Replays persona journeys against the product surfaces
pub struct UserJourneyAgent {
    persona: String,
    params: JourneyParams,
}

impl UserJourneyAgent {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            params: JourneyParams::default(),
        }
    }

    pub fn from_params(persona: Option<String>, params: &Value) -> Self {
        Self {
            persona: persona.unwrap_or_else(|| "casual_user".to_string()),
            params: serde_json::from_value(params.clone()).unwrap_or_default(),
        }
    }

    /// The built-in journey battery for a persona
    fn journeys(&self) -> Vec<Journey> {
        let all = vec![
            Journey {
                name: "onboarding".to_string(),
                critical: true,
                kind: FindingKind::Functionality,
                steps: vec![
                    Step::new(StepAction::Navigate, "/signup"),
                    Step::with_value(StepAction::Input, "email_field", "qa@example.com"),
                    Step::new(StepAction::Click, "create_account"),
                    Step::new(StepAction::Verify, "dashboard_visible"),
                    Step::new(StepAction::Navigate, "/tour"),
                    Step::new(StepAction::Click, "finish_tour"),
                ],
            },
            Journey {
                name: "daily_usage".to_string(),
                critical: false,
                kind: FindingKind::Functionality,
                steps: vec![
                    Step::new(StepAction::Navigate, "/dashboard"),
                    Step::new(StepAction::Click, "habit_checkbox"),
                    Step::new(StepAction::Verify, "streak_counter"),
                    Step::new(StepAction::Navigate, "/tasks"),
                    Step::new(StepAction::Click, "complete_task"),
                    Step::new(StepAction::Verify, "progress_ring"),
                ],
            },
            Journey {
                name: "habit_crud".to_string(),
                critical: false,
                kind: FindingKind::Functionality,
                steps: vec![
                    Step::new(StepAction::Navigate, "/habits"),
                    Step::new(StepAction::Click, "new_habit"),
                    Step::with_value(StepAction::Input, "habit_name", "Evening stretch"),
                    Step::new(StepAction::Click, "save_habit"),
                    Step::new(StepAction::Verify, "habit_listed"),
                    Step::new(StepAction::Click, "delete_habit"),
                ],
            },
            Journey {
                name: "ai_checkin".to_string(),
                critical: false,
                kind: FindingKind::AiQuality,
                steps: vec![
                    Step::new(StepAction::Navigate, "/chat"),
                    Step::with_value(
                        StepAction::AiInteract,
                        "chat_input",
                        "I lost my streak and feel unmotivated",
                    ),
                    Step::new(StepAction::Verify, "response_rendered"),
                ],
            },
            Journey {
                name: "accessibility_sweep".to_string(),
                critical: false,
                kind: FindingKind::Accessibility,
                steps: vec![
                    Step::new(StepAction::Verify, "aria_labels"),
                    Step::new(StepAction::Verify, "keyboard_focus"),
                    Step::new(StepAction::Verify, "color_contrast"),
                    Step::new(StepAction::Verify, "landmarks"),
                ],
            },
            Journey {
                name: "responsive_sweep".to_string(),
                critical: false,
                kind: FindingKind::Usability,
                steps: vec![
                    Step::new(StepAction::Verify, "layout_375px"),
                    Step::new(StepAction::Verify, "layout_768px"),
                    Step::new(StepAction::Verify, "layout_1280px"),
                ],
            },
        ];

        if self.params.journeys.is_empty() {
            all
        } else {
            all.into_iter()
                .filter(|j| self.params.journeys.contains(&j.name))
                .collect()
        }
    }

    /// Severity for a failing step: critical journeys escalate, sweeps stay
    /// at their kind's natural level.
    fn failure_severity(journey: &Journey, step: &Step) -> Severity {
        if journey.critical {
            return Severity::Critical;
        }
        match journey.kind {
            FindingKind::Accessibility => match step.target.as_str() {
                "aria_labels" | "keyboard_focus" => Severity::High,
                _ => Severity::Medium,
            },
            FindingKind::Usability => Severity::Medium,
            _ => Severity::High,
        }
    }

    /// Run one step; Ok(true) means the step passed.
    async fn run_step(&self, ctx: &AgentContext, journey: &Journey, step: &Step) -> crate::types::Result<bool> {
        match step.action {
            StepAction::Wait => {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(true)
            }
            StepAction::AiInteract => {
                let prompt = step.value.as_deref().unwrap_or(&step.target);
                let context = json!({ "persona": self.persona, "journey": journey.name });
                let response = crate::llm::with_timeout(
                    Duration::from_secs(60),
                    ctx.llm.generate_response(prompt, &context),
                    "journey ai interaction",
                )
                .await?;
                Ok(!response.trim().is_empty())
            }
            StepAction::Input => {
                // Fixture write exercises the record-store path for CRUD steps.
                if journey.name == "habit_crud" {
                    ctx.store
                        .insert(
                            &self.params.fixture_table,
                            row(&[
                                ("name", json!(step.value.clone().unwrap_or_default())),
                                ("owner", json!(FIXTURE_OWNER)),
                                ("persona", json!(self.persona)),
                            ]),
                        )
                        .await?;
                }
                let outcome = ctx
                    .probe
                    .check(&format!("{}:{}:{}", journey.name, step.action, step.target))
                    .await?;
                Ok(outcome.passed)
            }
            _ => {
                let outcome = ctx
                    .probe
                    .check(&format!("{}:{}:{}", journey.name, step.action, step.target))
                    .await?;
                Ok(outcome.passed)
            }
        }
    }

    fn step_finding(&self, journey: &Journey, step: &Step, detail: &str) -> Finding {
        let severity = Self::failure_severity(journey, step);
        let steps: Vec<String> = journey
            .steps
            .iter()
            .take_while(|s| !std::ptr::eq(*s, step))
            .chain(std::iter::once(step))
            .map(|s| format!("{} {}", s.action, s.target))
            .collect();
        Finding::builder(journey.kind, severity)
            .component(format!("journey:{}", journey.name))
            .message(format!(
                "Step '{} {}' failed for persona '{}': {}",
                step.action, step.target, self.persona, detail
            ))
            .expected(format!("{} {} succeeds", step.action, step.target))
            .actual(detail.to_string())
            .steps(steps)
            .build()
    }

    async fn cleanup(&self, ctx: &AgentContext) {
        let filter = Filter::new().eq("owner", FIXTURE_OWNER);
        if let Err(e) = ctx.store.delete(&self.params.fixture_table, &filter).await {
            warn!(persona = %self.persona, "Journey fixture cleanup failed: {}", e);
        }
    }
}

#[async_trait]
impl Agent for UserJourneyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::UserJourney
    }

    fn persona(&self) -> Option<&str> {
        Some(&self.persona)
    }

    async fn execute(&self, ctx: &AgentContext) -> RunResult {
        let started = Instant::now();
        let mut findings = Vec::new();
        let mut journeys_run = 0usize;
        let mut cancelled = false;

        'journeys: for journey in self.journeys() {
            if ctx.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            debug!(persona = %self.persona, journey = %journey.name, "Replaying journey");
            journeys_run += 1;

            for step in &journey.steps {
                let passed = match self.run_step(ctx, &journey, step).await {
                    Ok(passed) => passed,
                    Err(e) => {
                        findings.push(self.step_finding(&journey, step, &e.to_string()));
                        if journey.critical {
                            break 'journeys;
                        }
                        // Check failure is absorbed; the journey itself is
                        // abandoned but the next journey still runs.
                        continue 'journeys;
                    }
                };
                if !passed {
                    findings.push(self.step_finding(&journey, step, "step did not pass"));
                    if journey.critical {
                        break 'journeys;
                    }
                    continue 'journeys;
                }
            }
        }

        // Cleanup runs on every exit path: success, partial failure, abort.
        self.cleanup(ctx).await;

        let page_load = ctx.probe.measure("page_load_time").await.unwrap_or(0.0);
        let api_time = ctx.probe.measure("api_response_time").await.unwrap_or(0.0);
        let a11y = run_accessibility_score(&findings);

        let mut builder = RunResult::builder(AgentKind::UserJourney)
            .persona(self.persona.clone())
            .findings(findings)
            .metric("page_load_time", page_load)
            .metric("api_response_time", api_time)
            .metric("journeys_run", journeys_run as f64)
            .accessibility_score(a11y as u32)
            .duration(started.elapsed());
        if cancelled {
            builder = builder.incomplete();
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{failing_context, passing_context};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn clean_run_has_no_findings() {
        let agent = UserJourneyAgent::new("casual_user");
        let result = agent.execute(&passing_context(11)).await;
        assert!(result.success);
        assert!(result.findings.is_empty());
        assert_eq!(result.accessibility_score, 100);
        assert_eq!(result.performance_metrics["journeys_run"], 6.0);
    }

    #[tokio::test]
    async fn critical_journey_failure_aborts_remaining() {
        let agent = UserJourneyAgent::new("casual_user");
        let result = agent.execute(&failing_context(11)).await;
        // Onboarding is first and critical: exactly one critical finding,
        // no later journeys executed.
        assert!(!result.success);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Critical);
        assert_eq!(result.performance_metrics["journeys_run"], 1.0);
    }

    #[tokio::test]
    async fn non_critical_journeys_continue_after_failure() {
        let agent = UserJourneyAgent::from_params(
            Some("power_user".to_string()),
            &json!({ "journeys": ["daily_usage", "accessibility_sweep", "responsive_sweep"] }),
        );
        let result = agent.execute(&failing_context(11)).await;
        // Every selected journey fails its first probe step but all still run.
        assert_eq!(result.performance_metrics["journeys_run"], 3.0);
        assert_eq!(result.findings.len(), 3);
        assert!(result.success, "no critical findings expected");
    }

    #[tokio::test]
    async fn accessibility_failures_lower_run_score() {
        let agent = UserJourneyAgent::from_params(
            Some("screen_reader_user".to_string()),
            &json!({ "journeys": ["accessibility_sweep"] }),
        );
        let result = agent.execute(&failing_context(11)).await;
        assert!(result.accessibility_score < 100);
    }

    #[tokio::test]
    async fn fixtures_cleaned_on_every_path() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let ctx = AgentContext::new(
            store.clone(),
            std::sync::Arc::new(crate::llm::ScriptedProvider::supportive()),
            std::sync::Arc::new(crate::probe::SimulatedProbe::always_pass(5)),
        );
        let agent = UserJourneyAgent::new("casual_user");
        let _ = agent.execute(&ctx).await;
        assert!(store.is_empty("habits"));
    }

    #[tokio::test]
    async fn cancellation_marks_result_incomplete() {
        let agent = UserJourneyAgent::new("casual_user");
        let ctx = passing_context(3);
        ctx.cancel.cancel();
        let result = agent.execute(&ctx).await;
        assert!(result.incomplete);
        assert_eq!(result.performance_metrics["journeys_run"], 0.0);
    }

    #[tokio::test]
    async fn every_finding_has_reproduction_steps() {
        let agent = UserJourneyAgent::new("casual_user");
        let result = agent.execute(&failing_context(17)).await;
        for finding in &result.findings {
            assert!(!finding.reproduction_steps.is_empty());
        }
    }
}
