//! Admin Agent
//!
//! The adversarial half of the battery: security probes, performance
//! threshold checks, CRUD contract verification against the record store,
//! and a handful of edge cases (nulls, numeric extremes, date boundaries,
//! concurrent writes). Every check is isolated, so one failing or erroring
//! check never prevents the rest from running.

use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Agent, AgentContext};
use crate::store::{Filter, row};
use crate::types::{AgentKind, Finding, FindingKind, RunResult, Severity};

const FIXTURE_OWNER: &str = "patrol_admin_fixture";

/// Security probes and the severity a failure carries
const SECURITY_CHECKS: &[(&str, Severity)] = &[
    ("sql_injection", Severity::Critical),
    ("auth_bypass", Severity::Critical),
    ("cross_tenant_access", Severity::Critical),
    ("session_handling", Severity::High),
    ("data_encryption", Severity::High),
    ("rate_limiting", Severity::Medium),
];

/// Metric thresholds the target must stay under
const PERF_THRESHOLDS: &[(&str, f64)] = &[
    ("api_response_time", 1000.0),
    ("db_query_time", 200.0),
    ("page_load_time", 2000.0),
    ("memory_usage_mb", 512.0),
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct AdminParams {
    /// Tables whose CRUD contract gets verified
    tables: Vec<String>,
    /// Fan-out width for the concurrent-write race check
    concurrency: usize,
}

impl Default for AdminParams {
    fn default() -> Self {
        Self {
            tables: ["habits", "tasks", "goals", "chat_messages"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            concurrency: 8,
        }
    }
}

/// Security, performance, data-contract, and edge-case battery
pub struct AdminAgent {
    params: AdminParams,
}

impl AdminAgent {
    pub fn new() -> Self {
        Self {
            params: AdminParams::default(),
        }
    }

    pub fn from_params(params: &Value) -> Self {
        Self {
            params: serde_json::from_value(params.clone()).unwrap_or_default(),
        }
    }

    async fn security_battery(&self, ctx: &AgentContext, findings: &mut Vec<Finding>) {
        for (name, severity) in SECURITY_CHECKS {
            match ctx.probe.check(&format!("security:{}", name)).await {
                Ok(outcome) if outcome.passed => {}
                Ok(outcome) => findings.push(
                    Finding::builder(FindingKind::Security, *severity)
                        .component(format!("security:{}", name))
                        .message(format!("Security check '{}' failed", name))
                        .expected("check passes with no exposure")
                        .actual(outcome.detail)
                        .step(format!("Run the '{}' security probe", name))
                        .build(),
                ),
                Err(e) => findings.push(check_error_finding("security", name, &e)),
            }
        }
    }

    async fn performance_battery(
        &self,
        ctx: &AgentContext,
        findings: &mut Vec<Finding>,
        metrics: &mut Vec<(String, f64)>,
    ) {
        for (metric, threshold) in PERF_THRESHOLDS {
            match ctx.probe.measure(metric).await {
                Ok(value) => {
                    metrics.push((metric.to_string(), value));
                    if value > *threshold {
                        // Severity tracks how far past the threshold we are.
                        let severity = if value > threshold * 3.0 {
                            Severity::High
                        } else {
                            Severity::Medium
                        };
                        findings.push(
                            Finding::builder(FindingKind::Performance, severity)
                                .component(format!("perf:{}", metric))
                                .message(format!(
                                    "{} measured {:.0} against a {:.0} budget",
                                    metric, value, threshold
                                ))
                                .expected(format!("{} <= {:.0}", metric, threshold))
                                .actual(format!("{:.0}", value))
                                .step(format!("Measure '{}' under nominal conditions", metric))
                                .build(),
                        );
                    }
                }
                Err(e) => findings.push(check_error_finding("perf", metric, &e)),
            }
        }
    }

    /// Insert, read back, update, delete; any contract violation is a
    /// functionality finding against the table.
    async fn crud_contract(&self, ctx: &AgentContext, table: &str) -> Option<Finding> {
        let fixture = row(&[
            ("name", json!("contract probe")),
            ("owner", json!(FIXTURE_OWNER)),
        ]);
        let violation = |phase: &str, detail: String| {
            Some(
                Finding::builder(FindingKind::Functionality, Severity::High)
                    .component(format!("crud:{}", table))
                    .message(format!("CRUD contract broken at {} on '{}'", phase, table))
                    .expected(format!("{} round-trips through the store", phase))
                    .actual(detail)
                    .step(format!("Exercise create/read/update/delete on '{}'", table))
                    .build(),
            )
        };

        let inserted = match ctx.store.insert(table, fixture).await {
            Ok(r) => r,
            Err(e) => return violation("insert", e.to_string()),
        };
        let id = inserted.get("id").cloned().unwrap_or(Value::Null);
        if id.is_null() {
            return violation("insert", "stored row has no generated id".to_string());
        }

        let filter = Filter::new().eq("id", id.clone());
        match ctx.store.select(table, &filter).await {
            Ok(rows) if rows.len() == 1 => {}
            Ok(rows) => return violation("select", format!("{} rows returned, expected 1", rows.len())),
            Err(e) => return violation("select", e.to_string()),
        }

        let patch = row(&[("name", json!("contract probe updated"))]);
        match ctx.store.update(table, &filter, patch).await {
            Ok(1) => {}
            Ok(n) => return violation("update", format!("{} rows updated, expected 1", n)),
            Err(e) => return violation("update", e.to_string()),
        }

        match ctx.store.delete(table, &filter).await {
            Ok(1) => {}
            Ok(n) => return violation("delete", format!("{} rows deleted, expected 1", n)),
            Err(e) => return violation("delete", e.to_string()),
        }

        match ctx.store.select(table, &filter).await {
            Ok(rows) if rows.is_empty() => None,
            Ok(rows) => violation("delete", format!("{} rows survived deletion", rows.len())),
            Err(e) => violation("delete", e.to_string()),
        }
    }

    async fn edge_cases(&self, ctx: &AgentContext, findings: &mut Vec<Finding>) {
        let table = match self.params.tables.first() {
            Some(t) => t.as_str(),
            None => return,
        };

        // Null and extreme values must be stored and read back untouched.
        let awkward = [
            ("null_field", json!({ "note": Value::Null, "owner": FIXTURE_OWNER })),
            ("numeric_extremes", json!({ "count": i64::MAX, "ratio": f64::MIN_POSITIVE, "owner": FIXTURE_OWNER })),
            ("date_boundary", json!({ "due": "2024-02-29T23:59:59Z", "owner": FIXTURE_OWNER })),
            ("timezone_offset", json!({ "at": "2024-06-01T09:00:00+09:00", "owner": FIXTURE_OWNER })),
        ];
        for (case, payload) in awkward {
            let fixture = payload
                .as_object()
                .cloned()
                .unwrap_or_default();
            match ctx.store.insert(table, fixture.clone()).await {
                Ok(stored) => {
                    let intact = fixture.iter().all(|(k, v)| stored.get(k) == Some(v));
                    if !intact {
                        findings.push(
                            Finding::builder(FindingKind::Functionality, Severity::Medium)
                                .component(format!("edge:{}", case))
                                .message(format!("'{}' payload mutated on round-trip", case))
                                .expected("stored row preserves submitted fields")
                                .actual("one or more fields changed in storage")
                                .step(format!("Insert the '{}' payload into '{}'", case, table))
                                .build(),
                        );
                    }
                }
                Err(e) => findings.push(check_error_finding("edge", case, &e)),
            }
        }

        // Concurrent writes must all land; lost updates show up as a short count.
        let writes = (0..self.params.concurrency).map(|i| {
            let store = ctx.store.clone();
            let table = table.to_string();
            async move {
                store
                    .insert(
                        &table,
                        row(&[("seq", json!(i)), ("owner", json!(FIXTURE_OWNER)), ("race", json!(true))]),
                    )
                    .await
            }
        });
        let outcomes = join_all(writes).await;
        let landed = outcomes.iter().filter(|o| o.is_ok()).count();
        if landed < self.params.concurrency {
            findings.push(
                Finding::builder(FindingKind::Functionality, Severity::High)
                    .component("edge:concurrent_writes")
                    .message(format!(
                        "Only {} of {} concurrent writes landed",
                        landed, self.params.concurrency
                    ))
                    .expected("every concurrent write is persisted")
                    .actual(format!("{} writes lost", self.params.concurrency - landed))
                    .step(format!("Issue {} parallel inserts", self.params.concurrency))
                    .build(),
            );
        }
    }

    async fn cleanup(&self, ctx: &AgentContext) {
        let filter = Filter::new().eq("owner", FIXTURE_OWNER);
        for table in &self.params.tables {
            let _ = ctx.store.delete(table, &filter).await;
        }
    }
}

impl Default for AdminAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn check_error_finding(phase: &str, name: &str, error: &crate::types::PatrolError) -> Finding {
    Finding::builder(FindingKind::Functionality, Severity::High)
        .component(format!("{}:{}", phase, name))
        .message(format!("Check '{}' errored instead of completing: {}", name, error))
        .expected("check completes with a pass/fail outcome")
        .actual(error.to_string())
        .step(format!("Run the '{}' check", name))
        .build()
}

#[async_trait]
impl Agent for AdminAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Admin
    }

    async fn execute(&self, ctx: &AgentContext) -> RunResult {
        let started = Instant::now();
        let mut findings = Vec::new();
        let mut metrics = Vec::new();
        let mut cancelled = false;

        debug!(tables = self.params.tables.len(), "Admin battery starting");
        self.security_battery(ctx, &mut findings).await;

        if ctx.cancel.is_cancelled() {
            cancelled = true;
        } else {
            self.performance_battery(ctx, &mut findings, &mut metrics).await;
        }

        if !cancelled {
            for table in &self.params.tables {
                if ctx.cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                if let Some(finding) = self.crud_contract(ctx, table).await {
                    findings.push(finding);
                }
            }
        }

        if !cancelled && !ctx.cancel.is_cancelled() {
            self.edge_cases(ctx, &mut findings).await;
        } else {
            cancelled = true;
        }

        self.cleanup(ctx).await;

        let mut builder = RunResult::builder(AgentKind::Admin)
            .findings(findings)
            .duration(started.elapsed());
        for (metric, value) in metrics {
            builder = builder.metric(metric, value);
        }
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
    async fn clean_target_passes_everything() {
        let agent = AdminAgent::new();
        let result = agent.execute(&passing_context(42)).await;
        assert!(result.success);
        assert!(result.findings.is_empty());
        assert!(result.performance_metrics.contains_key("api_response_time"));
    }

    #[tokio::test]
    async fn failing_probes_surface_security_findings() {
        let agent = AdminAgent::new();
        let result = agent.execute(&failing_context(42)).await;
        let security: Vec<_> = result
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::Security)
            .collect();
        assert_eq!(security.len(), SECURITY_CHECKS.len());
        assert!(security.iter().any(|f| f.severity == Severity::Critical));
        assert!(!result.success);
    }

    #[tokio::test]
    async fn slow_metrics_become_performance_findings() {
        let ctx = AgentContext::new(
            std::sync::Arc::new(MemoryStore::new()),
            std::sync::Arc::new(crate::llm::ScriptedProvider::flat()),
            std::sync::Arc::new(
                crate::probe::SimulatedProbe::always_pass(9)
                    .with_baseline("api_response_time", 4000.0),
            ),
        );
        let result = AdminAgent::new().execute(&ctx).await;
        assert!(result
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::Performance && f.component == "perf:api_response_time"));
    }

    #[tokio::test]
    async fn crud_contract_holds_on_memory_store() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let ctx = AgentContext::new(
            store.clone(),
            std::sync::Arc::new(crate::llm::ScriptedProvider::flat()),
            std::sync::Arc::new(crate::probe::SimulatedProbe::always_pass(1)),
        );
        let result = AdminAgent::new().execute(&ctx).await;
        assert!(!result
            .findings
            .iter()
            .any(|f| f.component.starts_with("crud:")));
        // Fixture rows are gone afterwards.
        for table in ["habits", "tasks", "goals", "chat_messages"] {
            assert!(store.is_empty(table), "fixtures left in {}", table);
        }
    }

    #[tokio::test]
    async fn cancellation_short_circuits_later_phases() {
        let ctx = passing_context(2);
        ctx.cancel.cancel();
        let result = AdminAgent::new().execute(&ctx).await;
        assert!(result.incomplete);
        assert!(result.performance_metrics.is_empty());
    }
}
