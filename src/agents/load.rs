//! Load Agent
//!
//! Synthesizes load-test measurements from a seeded model instead of
//! spawning real traffic. Each run produces a time-indexed sample series:
//! per-sample latency is the base cost plus the scenario's weighted action
//! mix plus a linear concurrency term, ramp-up scales active users early
//! on, and the configured drift fractions grow latency and memory with
//! elapsed time. Error rate grows quadratically with concurrency. Three
//! phases per execution: scenario runs against their thresholds, a
//! step-wise capacity search for the breaking point, and a soak run whose
//! half-means are compared for latency degradation and memory growth.

use std::time::Instant;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Agent, AgentContext};
use crate::constants::load::{
    BREAKING_ERROR_RATE, BREAKING_P95_MS, CAPACITY_CEILING, CAPACITY_PROBE_SECS, CAPACITY_STEP,
    SAMPLE_TICK_SECS, SOAK_DURATION_SECS, SUSTAINED_LATENCY_MARGIN, SUSTAINED_MEMORY_MARGIN,
};
use crate::types::{AgentKind, Finding, FindingKind, RunResult, Severity};

/// Thresholds one scenario's measurements must stay under
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub max_avg_ms: f64,
    pub max_p95_ms: f64,
    pub max_p99_ms: f64,
    pub max_error_rate: f64,
    pub max_memory_mb: f64,
}

/// One action in a scenario's weighted mix with its unit service cost
#[derive(Debug, Clone, Copy)]
pub struct ActionMix {
    pub name: &'static str,
    pub weight: f64,
    pub cost_ms: f64,
}

const STEADY_ACTIONS: &[ActionMix] = &[
    ActionMix { name: "browse_dashboard", weight: 0.6, cost_ms: 120.0 },
    ActionMix { name: "record_entry", weight: 0.3, cost_ms: 200.0 },
    ActionMix { name: "sync_history", weight: 0.1, cost_ms: 350.0 },
];

const PEAK_ACTIONS: &[ActionMix] = &[
    ActionMix { name: "browse_dashboard", weight: 0.4, cost_ms: 120.0 },
    ActionMix { name: "record_entry", weight: 0.4, cost_ms: 200.0 },
    ActionMix { name: "sync_history", weight: 0.2, cost_ms: 350.0 },
];

/// Weighted mean service cost of one action mix
fn mix_cost(actions: &[ActionMix]) -> f64 {
    actions.iter().map(|a| a.weight * a.cost_ms).sum()
}

/// One load profile: concurrency, timing, action mix, and the thresholds
/// its measurements must meet
#[derive(Debug, Clone)]
pub struct LoadScenario {
    pub name: &'static str,
    pub users: usize,
    pub duration_secs: u64,
    pub ramp_up_secs: u64,
    pub actions: &'static [ActionMix],
    pub thresholds: Thresholds,
}

fn scenarios() -> Vec<LoadScenario> {
    vec![
        LoadScenario {
            name: "steady_state",
            users: 50,
            duration_secs: 300,
            ramp_up_secs: 30,
            actions: STEADY_ACTIONS,
            thresholds: Thresholds {
                max_avg_ms: 1000.0,
                max_p95_ms: 2500.0,
                max_p99_ms: 4000.0,
                max_error_rate: 0.02,
                max_memory_mb: 512.0,
            },
        },
        LoadScenario {
            name: "peak_hours",
            users: 150,
            duration_secs: 600,
            ramp_up_secs: 60,
            actions: PEAK_ACTIONS,
            thresholds: Thresholds {
                max_avg_ms: 1500.0,
                max_p95_ms: 4000.0,
                max_p99_ms: 6000.0,
                max_error_rate: 0.03,
                max_memory_mb: 768.0,
            },
        },
    ]
}

/// Statistics for one synthesized load run
#[derive(Debug, Clone)]
struct LoadStats {
    avg_ms: f64,
    p95_ms: f64,
    p99_ms: f64,
    error_rate: f64,
    peak_memory_mb: f64,
    throughput_rps: f64,
}

/// Time-indexed samples from one synthesized run
#[derive(Debug, Clone)]
struct LoadRun {
    users: usize,
    latency_ms: Vec<f64>,
    memory_mb: Vec<f64>,
    error_rate: f64,
}

impl LoadRun {
    fn stats(&self) -> LoadStats {
        let mut sorted = self.latency_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let avg = self.latency_ms.iter().sum::<f64>() / self.latency_ms.len() as f64;
        let pct = |q: f64| sorted[((sorted.len() - 1) as f64 * q).round() as usize];
        LoadStats {
            avg_ms: avg,
            p95_ms: pct(0.95),
            p99_ms: pct(0.99),
            error_rate: self.error_rate,
            peak_memory_mb: self.memory_mb.iter().copied().fold(0.0, f64::max),
            throughput_rps: self.users as f64 * 1000.0 / avg,
        }
    }
}

/// Means of the first and second halves of a sample series
fn half_means(samples: &[f64]) -> (f64, f64) {
    let mid = samples.len() / 2;
    let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
    (mean(&samples[..mid]), mean(&samples[mid..]))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LoadParams {
    /// Restrict to these scenario names (all when empty)
    scenarios: Vec<String>,
    /// RNG seed for the synthesis model
    seed: u64,
    /// Modeled fractional latency growth over a full run's elapsed time
    soak_latency_drift: f64,
    /// Modeled fractional memory growth over a full run's elapsed time
    soak_memory_drift: f64,
    /// Skip the capacity search
    skip_capacity: bool,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            scenarios: Vec::new(),
            seed: 7,
            soak_latency_drift: 0.05,
            soak_memory_drift: 0.05,
            skip_capacity: false,
        }
    }
}

/// Synthesized load scenarios, capacity search, and soak comparison
pub struct LoadAgent {
    params: LoadParams,
}

impl LoadAgent {
    pub fn new() -> Self {
        Self {
            params: LoadParams::default(),
        }
    }

    pub fn from_params(params: &Value) -> Self {
        Self {
            params: serde_json::from_value(params.clone()).unwrap_or_default(),
        }
    }

    /// The synthesis model, sampled along the run's timeline. Ramp-up scales
    /// active users until `ramp_up_secs` has elapsed; the drift fractions
    /// grow latency and memory with the elapsed fraction of the run.
    #[allow(clippy::too_many_arguments)]
    fn synthesize(
        &self,
        base_latency: f64,
        base_memory: f64,
        users: usize,
        duration_secs: u64,
        ramp_up_secs: u64,
        actions: &[ActionMix],
        rng: &mut StdRng,
    ) -> LoadRun {
        let ticks = (duration_secs / SAMPLE_TICK_SECS).max(2) as usize;
        let users_f = users as f64;
        let cost = mix_cost(actions);

        let mut latency_ms = Vec::with_capacity(ticks);
        let mut memory_mb = Vec::with_capacity(ticks);
        for tick in 0..ticks {
            let fraction = (tick + 1) as f64 / ticks as f64;
            let elapsed = fraction * duration_secs as f64;
            let ramp = if ramp_up_secs == 0 {
                1.0
            } else {
                (elapsed / ramp_up_secs as f64).min(1.0)
            };
            let active = users_f * ramp;
            let drift = 1.0 + self.params.soak_latency_drift * fraction;
            latency_ms
                .push((base_latency + cost + 1.6 * active) * drift + rng.random_range(0.0..30.0));
            memory_mb
                .push(base_memory + 0.8 * active + base_memory * self.params.soak_memory_drift * fraction);
        }

        LoadRun {
            users,
            latency_ms,
            memory_mb,
            error_rate: (users_f / 1500.0).powi(2),
        }
    }

    fn threshold_findings(scenario: &LoadScenario, stats: &LoadStats, findings: &mut Vec<Finding>) {
        let mut breach = |metric: &str, value: f64, limit: f64| {
            if value > limit {
                let severity = if value > limit * 2.0 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                findings.push(
                    Finding::builder(FindingKind::Performance, severity)
                        .component(format!("load:{}", scenario.name))
                        .message(format!(
                            "{} reached {:.2} against a {:.2} limit under {} users",
                            metric, value, limit, scenario.users
                        ))
                        .expected(format!("{} <= {:.2}", metric, limit))
                        .actual(format!("{:.2}", value))
                        .step(format!(
                            "Run the '{}' load profile at {} concurrent users",
                            scenario.name, scenario.users
                        ))
                        .build(),
                );
            }
        };

        breach("avg_response_ms", stats.avg_ms, scenario.thresholds.max_avg_ms);
        breach("p95_response_ms", stats.p95_ms, scenario.thresholds.max_p95_ms);
        breach("p99_response_ms", stats.p99_ms, scenario.thresholds.max_p99_ms);
        breach("error_rate", stats.error_rate, scenario.thresholds.max_error_rate);
        breach("peak_memory_mb", stats.peak_memory_mb, scenario.thresholds.max_memory_mb);
    }

    /// Step concurrency upward until error rate or p95 crosses the breaking
    /// criteria; returns the first failing concurrency, or None if the
    /// ceiling holds.
    fn capacity_search(&self, base_latency: f64, base_memory: f64, rng: &mut StdRng) -> Option<usize> {
        let mut users = CAPACITY_STEP;
        while users <= CAPACITY_CEILING {
            let run = self.synthesize(
                base_latency,
                base_memory,
                users as usize,
                CAPACITY_PROBE_SECS,
                0,
                STEADY_ACTIONS,
                rng,
            );
            let stats = run.stats();
            if stats.error_rate > BREAKING_ERROR_RATE || stats.p95_ms > BREAKING_P95_MS {
                return Some(users as usize);
            }
            users += CAPACITY_STEP;
        }
        None
    }

    /// Soak at sustained concurrency and compare the half-means of the
    /// sampled series; latency or memory growth past the margins is a
    /// degradation finding.
    fn soak_check(&self, base_latency: f64, base_memory: f64, users: usize, rng: &mut StdRng, findings: &mut Vec<Finding>) {
        let run = self.synthesize(
            base_latency,
            base_memory,
            users,
            SOAK_DURATION_SECS,
            0,
            STEADY_ACTIONS,
            rng,
        );
        let (first_avg, second_avg) = half_means(&run.latency_ms);
        let (first_memory, second_memory) = half_means(&run.memory_mb);

        if second_avg > first_avg * (1.0 + SUSTAINED_LATENCY_MARGIN) {
            findings.push(
                Finding::builder(FindingKind::Performance, Severity::High)
                    .component("load:soak")
                    .message(format!(
                        "Latency degraded {:.0}% between soak halves",
                        (second_avg / first_avg - 1.0) * 100.0
                    ))
                    .expected(format!(
                        "second-half latency within {:.0}% of the first half",
                        SUSTAINED_LATENCY_MARGIN * 100.0
                    ))
                    .actual(format!("{:.0}ms -> {:.0}ms", first_avg, second_avg))
                    .step(format!("Soak at {} users and compare halves", users))
                    .build(),
            );
        }
        if second_memory > first_memory * (1.0 + SUSTAINED_MEMORY_MARGIN) {
            findings.push(
                Finding::builder(FindingKind::Performance, Severity::High)
                    .component("load:soak")
                    .message(format!(
                        "Memory grew {:.0}% between soak halves, possible leak",
                        (second_memory / first_memory - 1.0) * 100.0
                    ))
                    .expected(format!(
                        "second-half memory within {:.0}% of the first half",
                        SUSTAINED_MEMORY_MARGIN * 100.0
                    ))
                    .actual(format!(
                        "{:.0}MB -> {:.0}MB",
                        first_memory, second_memory
                    ))
                    .step(format!("Soak at {} users and compare halves", users))
                    .build(),
            );
        }
    }
}

impl Default for LoadAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for LoadAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Load
    }

    async fn execute(&self, ctx: &AgentContext) -> RunResult {
        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut findings = Vec::new();
        let mut cancelled = false;

        // Bases come from the probe so a real implementation feeds real
        // numbers into the same model.
        let base_latency = ctx.probe.measure("api_response_time").await.unwrap_or(180.0);
        let base_memory = ctx.probe.measure("memory_usage_mb").await.unwrap_or(96.0);

        let mut last_stats: Option<LoadStats> = None;
        let mut max_users = 0usize;
        for scenario in scenarios() {
            if !self.params.scenarios.is_empty()
                && !self.params.scenarios.iter().any(|s| s == scenario.name)
            {
                continue;
            }
            if ctx.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            debug!(scenario = scenario.name, users = scenario.users, "Running load profile");
            let run = self.synthesize(
                base_latency,
                base_memory,
                scenario.users,
                scenario.duration_secs,
                scenario.ramp_up_secs,
                scenario.actions,
                &mut rng,
            );
            let stats = run.stats();
            Self::threshold_findings(&scenario, &stats, &mut findings);
            max_users = max_users.max(scenario.users);
            last_stats = Some(stats);
        }

        let mut breaking_point = 0.0;
        if !cancelled && !self.params.skip_capacity {
            if let Some(users) = self.capacity_search(base_latency, base_memory, &mut rng) {
                breaking_point = users as f64;
                if users <= max_users {
                    findings.push(
                        Finding::builder(FindingKind::Performance, Severity::High)
                            .component("load:capacity")
                            .message(format!(
                                "Breaking point at {} users, below the {}-user profile",
                                users, max_users
                            ))
                            .expected(format!("capacity beyond {} users", max_users))
                            .actual(format!("broke at {} users", users))
                            .step("Step concurrency upward until failure criteria trip".to_string())
                            .build(),
                    );
                }
            }
        }

        if !cancelled && max_users > 0 {
            self.soak_check(base_latency, base_memory, max_users, &mut rng, &mut findings);
        }

        let mut builder = RunResult::builder(AgentKind::Load)
            .findings(findings)
            .metric("breaking_point", breaking_point)
            .duration(started.elapsed());
        if let Some(stats) = last_stats {
            builder = builder
                .metric("api_response_time", stats.avg_ms)
                .metric("p95_response_time", stats.p95_ms)
                .metric("error_rate", stats.error_rate)
                .metric("peak_memory_mb", stats.peak_memory_mb)
                .metric("throughput_rps", stats.throughput_rps);
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
    use crate::agents::test_support::passing_context;
    use serde_json::json;

    #[tokio::test]
    async fn nominal_profiles_stay_under_thresholds() {
        let result = LoadAgent::new().execute(&passing_context(4)).await;
        assert!(result.success, "findings: {:?}", result.findings);
        assert!(result.findings.is_empty());
        assert!(result.performance_metrics["api_response_time"] < 1000.0);
        assert!(result.performance_metrics["throughput_rps"] > 0.0);
    }

    #[tokio::test]
    async fn capacity_search_finds_a_breaking_point() {
        let result = LoadAgent::new().execute(&passing_context(4)).await;
        let breaking = result.performance_metrics["breaking_point"];
        // The quadratic error model crosses 5% well before the ceiling.
        assert!(breaking > 150.0 && breaking <= 500.0, "breaking = {}", breaking);
    }

    #[test]
    fn synthesized_series_drifts_across_elapsed_time() {
        let agent = LoadAgent::from_params(&json!({ "soak_latency_drift": 0.6 }));
        let mut rng = StdRng::seed_from_u64(7);
        let run = agent.synthesize(200.0, 100.0, 50, 1800, 0, STEADY_ACTIONS, &mut rng);
        let (first, second) = half_means(&run.latency_ms);
        assert!(second > first * 1.2, "first {:.0}, second {:.0}", first, second);
    }

    #[test]
    fn heavier_action_mix_raises_latency() {
        let agent = LoadAgent::new();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let light = agent
            .synthesize(180.0, 96.0, 50, 300, 0, STEADY_ACTIONS, &mut rng_a)
            .stats();
        let heavy = agent
            .synthesize(180.0, 96.0, 50, 300, 0, PEAK_ACTIONS, &mut rng_b)
            .stats();
        assert!(heavy.avg_ms > light.avg_ms);
    }

    #[test]
    fn ramp_up_softens_early_samples() {
        let agent = LoadAgent::new();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let ramped = agent.synthesize(180.0, 96.0, 100, 300, 150, STEADY_ACTIONS, &mut rng_a);
        let flat = agent.synthesize(180.0, 96.0, 100, 300, 0, STEADY_ACTIONS, &mut rng_b);
        assert!(ramped.latency_ms[0] < flat.latency_ms[0]);
        // Past the ramp the two runs see the same active users and jitter.
        assert_eq!(ramped.latency_ms.last(), flat.latency_ms.last());
    }

    #[tokio::test]
    async fn soak_latency_drift_past_margin_is_flagged() {
        let agent = LoadAgent::from_params(&json!({
            "soak_latency_drift": 0.6,
            "skip_capacity": true,
            "scenarios": ["steady_state"]
        }));
        let result = agent.execute(&passing_context(4)).await;
        assert!(result
            .findings
            .iter()
            .any(|f| f.component == "load:soak" && f.message.contains("Latency degraded")));
    }

    #[tokio::test]
    async fn soak_memory_growth_past_margin_is_flagged() {
        let agent = LoadAgent::from_params(&json!({
            "soak_memory_drift": 0.6,
            "skip_capacity": true,
            "scenarios": ["steady_state"]
        }));
        let result = agent.execute(&passing_context(4)).await;
        assert!(result
            .findings
            .iter()
            .any(|f| f.component == "load:soak" && f.message.contains("possible leak")));
    }

    #[tokio::test]
    async fn same_seed_same_stats() {
        let a = LoadAgent::new().execute(&passing_context(4)).await;
        let b = LoadAgent::new().execute(&passing_context(4)).await;
        assert_eq!(
            a.performance_metrics["breaking_point"],
            b.performance_metrics["breaking_point"]
        );
    }

    #[tokio::test]
    async fn cancellation_skips_everything() {
        let ctx = passing_context(4);
        ctx.cancel.cancel();
        let result = LoadAgent::new().execute(&ctx).await;
        assert!(result.incomplete);
        assert_eq!(result.performance_metrics["breaking_point"], 0.0);
    }
}
