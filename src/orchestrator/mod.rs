//! Suite Orchestrator
//!
//! Owns the suite registry and drives suite execution: resolve the suite,
//! take the single-flight slot for its id, run its agents sequentially in
//! declared order, aggregate, evaluate alerts, and append the report to
//! history. An agent that crashes or exceeds the per-agent timeout is
//! replaced by a synthetic failed result carrying one critical finding, and
//! the suite keeps going.
//!
//! ## Modules
//!
//! - `alerts`: threshold evaluation over aggregated reports
//! - `builtin`: the default suite catalog

mod alerts;
mod builtin;

pub use alerts::AlertConfig;
pub use builtin::builtin_suites;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{AgentContext, CancelToken, build_agent};
use crate::history::History;
use crate::llm::SharedProvider;
use crate::probe::SharedProbe;
use crate::scoring;
use crate::store::SharedStore;
use crate::types::{
    AgentConfig, Finding, FindingKind, PatrolError, Result, RunResult, Severity, SuiteConfig,
    SuiteReport,
};

const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Releases a suite's single-flight slot on every exit path.
#[derive(Debug)]
struct RunGuard {
    in_flight: Arc<DashMap<String, ()>>,
    suite_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.suite_id);
    }
}

/// Suite registry plus the execution engine
pub struct Orchestrator {
    suites: DashMap<String, SuiteConfig>,
    in_flight: Arc<DashMap<String, ()>>,
    store: SharedStore,
    llm: SharedProvider,
    probe: SharedProbe,
    history: Arc<History>,
    alert_config: AlertConfig,
    agent_timeout: Duration,
}

impl Orchestrator {
    pub fn new(store: SharedStore, llm: SharedProvider, probe: SharedProbe) -> Self {
        Self {
            suites: DashMap::new(),
            in_flight: Arc::new(DashMap::new()),
            store,
            llm,
            probe,
            history: Arc::new(History::default()),
            alert_config: AlertConfig::default(),
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
        }
    }

    pub fn with_history(mut self, history: Arc<History>) -> Self {
        self.history = history;
        self
    }

    pub fn with_alert_config(mut self, config: AlertConfig) -> Self {
        self.alert_config = config;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Register the default suite catalog
    pub fn with_builtin_suites(self) -> Self {
        for suite in builtin_suites() {
            self.register(suite);
        }
        self
    }

    /// Register or replace a suite
    pub fn register(&self, suite: SuiteConfig) {
        let id = suite.id.clone();
        if self.suites.insert(id.clone(), suite).is_some() {
            info!(suite_id = %id, "replacing registered suite");
        }
    }

    /// Registered suites, ordered by id
    pub fn suites(&self) -> Vec<SuiteConfig> {
        let mut suites: Vec<SuiteConfig> =
            self.suites.iter().map(|entry| entry.value().clone()).collect();
        suites.sort_by(|a, b| a.id.cmp(&b.id));
        suites
    }

    pub fn suite(&self, suite_id: &str) -> Option<SuiteConfig> {
        self.suites.get(suite_id).map(|entry| entry.value().clone())
    }

    pub fn is_running(&self, suite_id: &str) -> bool {
        self.in_flight.contains_key(suite_id)
    }

    pub fn history(&self) -> Arc<History> {
        self.history.clone()
    }

    /// Take the single-flight slot for a suite id
    fn begin(&self, suite_id: &str) -> Result<RunGuard> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(suite_id.to_string()) {
            Entry::Occupied(_) => Err(PatrolError::SuiteAlreadyRunning(suite_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(RunGuard {
                    in_flight: self.in_flight.clone(),
                    suite_id: suite_id.to_string(),
                })
            }
        }
    }

    /// Execute one suite end to end and append the report to history.
    ///
    /// The only hard errors are suite resolution: unknown id, disabled
    /// suite, or a run already in flight for the same id. Agent failures
    /// never surface here; they become findings inside the report.
    pub async fn run(&self, suite_id: &str, trigger: &str) -> Result<SuiteReport> {
        self.run_with_metadata(suite_id, trigger, Value::Null).await
    }

    /// [`Self::run`] with caller-supplied trigger context recorded on the
    /// report (commit hash, deploy actor, and the like).
    pub async fn run_with_metadata(
        &self,
        suite_id: &str,
        trigger: &str,
        metadata: Value,
    ) -> Result<SuiteReport> {
        let suite = self
            .suite(suite_id)
            .ok_or_else(|| PatrolError::SuiteNotFound(suite_id.to_string()))?;
        if !suite.enabled {
            return Err(PatrolError::SuiteDisabled(suite_id.to_string()));
        }
        let _guard = self.begin(suite_id)?;

        let started = Instant::now();
        info!(
            suite = suite_id,
            trigger,
            agents = suite.agents.len(),
            "Suite starting"
        );

        let mut results = Vec::with_capacity(suite.agents.len());
        for agent_config in &suite.agents {
            results.push(self.run_agent(agent_config).await);
        }

        let aggregation = scoring::aggregate(&results);
        let alerts =
            self.alert_config
                .evaluate(suite_id, &aggregation.summary, &aggregation.scores);

        let report = SuiteReport {
            id: Uuid::new_v4(),
            suite_id: suite.id.clone(),
            trigger: trigger.to_string(),
            metadata,
            timestamp: Utc::now(),
            duration: started.elapsed(),
            results,
            summary: aggregation.summary,
            scores: aggregation.scores,
            recommendations: aggregation.recommendations,
            alerts,
        };

        info!(
            suite = suite_id,
            quality = report.scores.quality,
            success_rate = format!("{:.1}", report.summary.success_rate),
            findings = report.summary.total_findings,
            alerts = report.alerts.len(),
            "Suite finished"
        );
        self.history.append(report.clone());
        Ok(report)
    }

    /// Run every enabled suite whose schedule matches the trigger, in id
    /// order, recording the shared trigger metadata on each report. A suite
    /// already in flight is skipped, not an error.
    pub async fn run_triggered(&self, trigger: &str, metadata: Value) -> Vec<SuiteReport> {
        let mut reports = Vec::new();
        for suite in self.suites() {
            if !suite.enabled || !suite.schedule.matches(trigger) {
                continue;
            }
            match self
                .run_with_metadata(&suite.id, trigger, metadata.clone())
                .await
            {
                Ok(report) => reports.push(report),
                Err(PatrolError::SuiteAlreadyRunning(id)) => {
                    warn!(suite = %id, trigger, "Skipping suite already in flight");
                }
                Err(e) => {
                    error!(suite = %suite.id, trigger, "Suite run failed: {}", e);
                }
            }
        }
        reports
    }

    /// Run one agent on its own task with the per-agent timeout. A panic or
    /// timeout becomes a synthetic failed result; the cancel token tells a
    /// timed-out agent to stop cooperatively.
    async fn run_agent(&self, config: &AgentConfig) -> RunResult {
        let agent = build_agent(config);
        let kind = config.kind;
        let cancel = CancelToken::new();
        let ctx = AgentContext::new(self.store.clone(), self.llm.clone(), self.probe.clone())
            .with_cancel(cancel.clone());

        let handle = tokio::spawn(async move { agent.execute(&ctx).await });
        match tokio::time::timeout(self.agent_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                error!(agent = %kind, "Agent crashed: {}", join_err);
                synthetic_failure(
                    config,
                    format!("Agent crashed mid-run: {}", join_err),
                    false,
                )
            }
            Err(_) => {
                cancel.cancel();
                warn!(agent = %kind, timeout = ?self.agent_timeout, "Agent timed out");
                synthetic_failure(
                    config,
                    format!("Agent exceeded the {:?} execution budget", self.agent_timeout),
                    true,
                )
            }
        }
    }
}

/// The result recorded for an agent that never produced one
fn synthetic_failure(config: &AgentConfig, detail: String, incomplete: bool) -> RunResult {
    let mut builder = RunResult::builder(config.kind)
        .finding(
            Finding::builder(FindingKind::Functionality, Severity::Critical)
                .component(format!("agent:{}", config.kind))
                .message(detail.clone())
                .expected("agent completes and returns a result")
                .actual(detail)
                .step(format!("Run the {} agent in this suite", config.kind))
                .build(),
        );
    if let Some(persona) = &config.persona {
        builder = builder.persona(persona.clone());
    }
    if incomplete {
        builder = builder.incomplete();
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;
    use crate::probe::SimulatedProbe;
    use crate::store::MemoryStore;
    use crate::types::AgentKind;

    fn orchestrator(probe: SimulatedProbe) -> Orchestrator {
        Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedProvider::supportive()),
            Arc::new(probe),
        )
        .with_builtin_suites()
    }

    #[tokio::test]
    async fn unknown_suite_is_a_hard_error() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        let err = orch.run("nope", "manual").await.unwrap_err();
        assert!(matches!(err, PatrolError::SuiteNotFound(_)));
    }

    #[tokio::test]
    async fn disabled_suite_is_a_hard_error() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        orch.register(SuiteConfig::new("dark", "Disabled Suite").disabled());
        let err = orch.run("dark", "manual").await.unwrap_err();
        assert!(matches!(err, PatrolError::SuiteDisabled(_)));
    }

    #[tokio::test]
    async fn single_flight_slot_blocks_second_entry() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        let guard = orch.begin("smoke").unwrap();
        assert!(orch.is_running("smoke"));
        let err = orch.begin("smoke").unwrap_err();
        assert!(matches!(err, PatrolError::SuiteAlreadyRunning(_)));
        // Different ids are independent.
        let _other = orch.begin("full_qa").unwrap();
        drop(guard);
        assert!(!orch.is_running("smoke"));
        assert!(orch.begin("smoke").is_ok());
    }

    #[tokio::test]
    async fn clean_run_produces_a_perfect_report() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        let report = orch.run("smoke", "manual").await.unwrap();
        assert_eq!(report.suite_id, "smoke");
        assert_eq!(report.trigger, "manual");
        assert_eq!(report.summary.total_runs, 2);
        assert_eq!(report.summary.success_rate, 100.0);
        assert_eq!(report.scores.quality, 100);
        assert!(report.alerts.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(orch.history().len(), 1);
        assert!(!orch.is_running("smoke"));
    }

    #[tokio::test]
    async fn results_preserve_agent_declaration_order() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        let report = orch.run("full_qa", "manual").await.unwrap();
        let kinds: Vec<AgentKind> = report.results.iter().map(|r| r.agent_kind).collect();
        assert_eq!(
            kinds,
            vec![
                AgentKind::UserJourney,
                AgentKind::UserJourney,
                AgentKind::Admin,
                AgentKind::AiQuality,
                AgentKind::Visual
            ]
        );
    }

    #[tokio::test]
    async fn failing_target_raises_alerts() {
        let orch = orchestrator(SimulatedProbe::always_fail(1));
        let report = orch.run("smoke", "manual").await.unwrap();
        assert!(report.has_critical_errors());
        assert!(report.alerts.iter().any(|a| a.code == "critical_errors"));
        assert!(!report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn timed_out_agent_becomes_a_synthetic_failure() {
        let orch = orchestrator(SimulatedProbe::always_pass(1))
            .with_agent_timeout(Duration::ZERO);
        let report = orch.run("smoke", "manual").await.unwrap();
        assert_eq!(report.summary.total_runs, 2);
        for result in &report.results {
            assert!(!result.success);
            assert!(result.incomplete);
            assert!(result.findings[0].message.contains("execution budget"));
        }
    }

    #[tokio::test]
    async fn triggered_runs_match_schedules() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        let reports = orch.run_triggered("deploy", Value::Null).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].suite_id, "smoke");

        let reports = orch.run_triggered("daily", Value::Null).await;
        let ids: Vec<&str> = reports.iter().map(|r| r.suite_id.as_str()).collect();
        assert_eq!(ids, vec!["ai_quality", "full_qa"]);
    }

    #[tokio::test]
    async fn trigger_metadata_lands_on_every_report() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        let metadata = serde_json::json!({ "commit": "abc123", "actor": "ci" });
        let reports = orch.run_triggered("deploy", metadata).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].metadata["commit"], "abc123");

        // Direct runs default to no metadata.
        let report = orch.run("smoke", "manual").await.unwrap();
        assert!(report.metadata.is_null());
    }

    #[tokio::test]
    async fn suite_can_run_again_after_completion() {
        let orch = orchestrator(SimulatedProbe::always_pass(1));
        orch.run("smoke", "manual").await.unwrap();
        orch.run("smoke", "manual").await.unwrap();
        assert_eq!(orch.history().len(), 2);
    }
}
