//! Probe Capability
//!
//! Individual agent checks observe the system under test through this seam.
//! The shipped implementation simulates outcomes from a seeded RNG; a real
//! implementation (actual HTTP calls, actual screenshot diffing) swaps in
//! behind the same interface without changing orchestration or scoring.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::Result;

/// Shared probe handle
pub type SharedProbe = Arc<dyn Probe>;

/// Result of one pass/fail probe
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub passed: bool,
    pub detail: String,
}

impl ProbeOutcome {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Pluggable measurement capability used by every agent check
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run a named pass/fail check against the target
    async fn check(&self, name: &str) -> Result<ProbeOutcome>;

    /// Measure a named numeric metric (milliseconds, MB, counts, ...)
    async fn measure(&self, metric: &str) -> Result<f64>;

    /// Rendering difference percentage for a snapshot key, in [0, 100]
    async fn snapshot_diff(&self, key: &str) -> Result<f64>;
}

/// Simulated probe with deterministic, seedable outcomes
pub struct SimulatedProbe {
    rng: Mutex<StdRng>,
    /// Probability that a pass/fail check passes
    pass_rate: f64,
    /// Per-metric baseline values; measurements jitter around these
    baselines: BTreeMap<String, f64>,
}

impl SimulatedProbe {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            pass_rate: 0.92,
            baselines: Self::default_baselines(),
        }
    }

    /// A probe that always passes with fast measurements. Useful for tests
    /// asserting the zero-findings path.
    pub fn always_pass(seed: u64) -> Self {
        let mut probe = Self::with_seed(seed);
        probe.pass_rate = 1.0;
        probe
    }

    /// A probe that always fails its checks
    pub fn always_fail(seed: u64) -> Self {
        let mut probe = Self::with_seed(seed);
        probe.pass_rate = 0.0;
        probe
    }

    pub fn with_pass_rate(mut self, rate: f64) -> Self {
        self.pass_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_baseline(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.baselines.insert(metric.into(), value);
        self
    }

    fn default_baselines() -> BTreeMap<String, f64> {
        let mut baselines = BTreeMap::new();
        baselines.insert("api_response_time".to_string(), 180.0);
        baselines.insert("page_load_time".to_string(), 900.0);
        baselines.insert("memory_usage_mb".to_string(), 96.0);
        baselines.insert("db_query_time".to_string(), 35.0);
        baselines
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    async fn check(&self, name: &str) -> Result<ProbeOutcome> {
        let roll: f64 = {
            let mut rng = self.rng.lock().expect("probe rng poisoned");
            rng.random_range(0.0..1.0)
        };
        if roll < self.pass_rate {
            Ok(ProbeOutcome::pass(format!("{} behaved as expected", name)))
        } else {
            Ok(ProbeOutcome::fail(format!(
                "{} deviated from expected behavior",
                name
            )))
        }
    }

    async fn measure(&self, metric: &str) -> Result<f64> {
        let baseline = self.baselines.get(metric).copied().unwrap_or(100.0);
        let jitter: f64 = {
            let mut rng = self.rng.lock().expect("probe rng poisoned");
            rng.random_range(0.7..1.4)
        };
        Ok(baseline * jitter)
    }

    async fn snapshot_diff(&self, _key: &str) -> Result<f64> {
        let mut rng = self.rng.lock().expect("probe rng poisoned");
        // Most snapshots barely move; occasionally one drifts badly.
        let roll: f64 = rng.random_range(0.0..1.0);
        if roll < self.pass_rate {
            Ok(rng.random_range(0.0..2.0))
        } else {
            Ok(rng.random_range(5.0..40.0))
        }
    }
}
