//! Visual Agent
//!
//! Compares rendered snapshots against stored baselines through the probe's
//! diff capability. A diff past its threshold becomes a visual-regression
//! finding whose severity tracks the overshoot in percentage points. Two
//! sweeps complement the baseline grid: pairwise cross-target comparison and
//! a layout check at stepped breakpoint widths.

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Agent, AgentContext};
use crate::constants::visual::{CRITICAL_OVERSHOOT_PP, HIGH_OVERSHOOT_PP, MEDIUM_OVERSHOOT_PP};
use crate::types::{AgentKind, Finding, FindingKind, RunResult, Severity};

const COMPONENTS: &[&str] = &["dashboard", "habit_card", "chat_panel", "settings_form"];
const VIEWPORTS: &[&str] = &["mobile_375", "tablet_768", "desktop_1440"];
const RENDER_TARGETS: &[&str] = &["chromium", "webkit", "gecko"];
const BREAKPOINT_WIDTHS: &[u32] = &[375, 480, 768, 1024, 1280, 1440];

/// Acceptable pairwise difference between render targets
const CROSS_TARGET_TOLERANCE_PCT: f64 = 3.0;

/// One snapshot comparison against a stored baseline
#[derive(Debug, Clone)]
pub struct VisualTest {
    pub component: String,
    pub viewport: String,
    pub state: String,
    /// Diff percentage above which the snapshot is a regression
    pub threshold_pct: f64,
}

impl VisualTest {
    fn key(&self) -> String {
        format!("{}:{}:{}", self.component, self.viewport, self.state)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct VisualParams {
    /// Restrict to these components (all when empty)
    components: Vec<String>,
    /// Baseline diff threshold in percent
    threshold_pct: f64,
    /// Skip the cross-target pairwise sweep
    skip_cross_target: bool,
    /// Skip the breakpoint layout sweep
    skip_breakpoints: bool,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            threshold_pct: 2.0,
            skip_cross_target: false,
            skip_breakpoints: false,
        }
    }
}

/// Snapshot regression, cross-target, and breakpoint sweeps
pub struct VisualAgent {
    params: VisualParams,
}

impl VisualAgent {
    pub fn new() -> Self {
        Self {
            params: VisualParams::default(),
        }
    }

    pub fn from_params(params: &Value) -> Self {
        Self {
            params: serde_json::from_value(params.clone()).unwrap_or_default(),
        }
    }

    fn test_grid(&self) -> Vec<VisualTest> {
        let mut tests = Vec::new();
        for component in COMPONENTS {
            if !self.params.components.is_empty()
                && !self.params.components.iter().any(|c| c == component)
            {
                continue;
            }
            for viewport in VIEWPORTS {
                tests.push(VisualTest {
                    component: component.to_string(),
                    viewport: viewport.to_string(),
                    state: "default".to_string(),
                    threshold_pct: self.params.threshold_pct,
                });
            }
            // Stateful variants only on the primary viewport.
            for state in ["loading", "error"] {
                tests.push(VisualTest {
                    component: component.to_string(),
                    viewport: "desktop_1440".to_string(),
                    state: state.to_string(),
                    threshold_pct: self.params.threshold_pct,
                });
            }
        }
        tests
    }

    /// Severity from how far the diff overshot its threshold
    fn overshoot_severity(diff_pct: f64, threshold_pct: f64) -> Severity {
        let overshoot = diff_pct - threshold_pct;
        if overshoot > CRITICAL_OVERSHOOT_PP {
            Severity::Critical
        } else if overshoot > HIGH_OVERSHOOT_PP {
            Severity::High
        } else if overshoot > MEDIUM_OVERSHOOT_PP {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    async fn baseline_sweep(
        &self,
        ctx: &AgentContext,
        findings: &mut Vec<Finding>,
        snapshots: &mut usize,
    ) {
        for test in self.test_grid() {
            *snapshots += 1;
            match ctx.probe.snapshot_diff(&test.key()).await {
                Ok(diff) if diff > test.threshold_pct => {
                    let severity = Self::overshoot_severity(diff, test.threshold_pct);
                    findings.push(
                        Finding::builder(FindingKind::VisualRegression, severity)
                            .component(format!("visual:{}", test.component))
                            .message(format!(
                                "Snapshot '{}' diverged {:.1}% from its baseline",
                                test.key(),
                                diff
                            ))
                            .expected(format!("diff <= {:.1}%", test.threshold_pct))
                            .actual(format!("{:.1}%", diff))
                            .step(format!(
                                "Render '{}' in state '{}' at {} and diff against baseline",
                                test.component, test.state, test.viewport
                            ))
                            .build(),
                    );
                }
                Ok(_) => {}
                Err(e) => findings.push(
                    Finding::builder(FindingKind::VisualRegression, Severity::Medium)
                        .component(format!("visual:{}", test.component))
                        .message(format!("Snapshot diff errored for '{}': {}", test.key(), e))
                        .expected("snapshot comparison completes")
                        .actual(e.to_string())
                        .step(format!("Diff snapshot '{}'", test.key()))
                        .build(),
                ),
            }
        }
    }

    /// Pairwise comparison across render targets; divergence between engines
    /// is tolerated up to a few percent.
    async fn cross_target_sweep(&self, ctx: &AgentContext, findings: &mut Vec<Finding>) {
        for component in COMPONENTS {
            for (i, left) in RENDER_TARGETS.iter().enumerate() {
                for right in &RENDER_TARGETS[i + 1..] {
                    let key = format!("cross:{}:{}-{}", component, left, right);
                    let diff = match ctx.probe.snapshot_diff(&key).await {
                        Ok(d) => d,
                        Err(_) => continue,
                    };
                    if diff > CROSS_TARGET_TOLERANCE_PCT {
                        findings.push(
                            Finding::builder(FindingKind::VisualRegression, Severity::Medium)
                                .component(format!("visual:{}", component))
                                .message(format!(
                                    "'{}' renders {:.1}% apart on {} and {}",
                                    component, diff, left, right
                                ))
                                .expected(format!("cross-target diff <= {:.1}%", CROSS_TARGET_TOLERANCE_PCT))
                                .actual(format!("{:.1}%", diff))
                                .step(format!("Render '{}' on {} and {}, then diff", component, left, right))
                                .build(),
                        );
                    }
                }
            }
        }
    }

    /// Layout integrity at stepped widths; a failing width is a medium
    /// regression against the breakpoint.
    async fn breakpoint_sweep(&self, ctx: &AgentContext, findings: &mut Vec<Finding>) {
        for width in BREAKPOINT_WIDTHS {
            match ctx.probe.check(&format!("breakpoint:{}px", width)).await {
                Ok(outcome) if outcome.passed => {}
                Ok(outcome) => findings.push(
                    Finding::builder(FindingKind::VisualRegression, Severity::Medium)
                        .component("visual:breakpoints")
                        .message(format!("Layout breaks at {}px", width))
                        .expected(format!("layout intact at {}px", width))
                        .actual(outcome.detail)
                        .step(format!("Resize the viewport to {}px wide", width))
                        .build(),
                ),
                Err(e) => findings.push(
                    Finding::builder(FindingKind::VisualRegression, Severity::Medium)
                        .component("visual:breakpoints")
                        .message(format!("Breakpoint check errored at {}px: {}", width, e))
                        .expected("breakpoint check completes")
                        .actual(e.to_string())
                        .step(format!("Resize the viewport to {}px wide", width))
                        .build(),
                ),
            }
        }
    }
}

impl Default for VisualAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for VisualAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Visual
    }

    async fn execute(&self, ctx: &AgentContext) -> RunResult {
        let started = Instant::now();
        let mut findings = Vec::new();
        let mut snapshots = 0usize;
        let mut cancelled = false;

        debug!(threshold = self.params.threshold_pct, "Visual sweeps starting");
        self.baseline_sweep(ctx, &mut findings, &mut snapshots).await;

        if ctx.cancel.is_cancelled() {
            cancelled = true;
        } else if !self.params.skip_cross_target {
            self.cross_target_sweep(ctx, &mut findings).await;
        }

        if !cancelled && ctx.cancel.is_cancelled() {
            cancelled = true;
        }
        if !cancelled && !self.params.skip_breakpoints {
            self.breakpoint_sweep(ctx, &mut findings).await;
        }

        let regressions = findings.len() as f64;
        let mut builder = RunResult::builder(AgentKind::Visual)
            .findings(findings)
            .metric("snapshots_compared", snapshots as f64)
            .metric("visual_regressions", regressions)
            .duration(started.elapsed());
        if cancelled {
            builder = builder.incomplete();
        }
        builder.build()
    }
}
