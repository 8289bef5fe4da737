//! Scoring & Recommendation Engine
//!
//! Pure aggregation layer: run results in, summary + dimensional scores +
//! ranked recommendations out. Deterministic for any fixed input sequence,
//! which is what makes suite reports reproducible and testable.

mod recommend;
mod scores;

pub use recommend::generate_recommendations;
pub use scores::{
    accessibility_score, compute_scores, performance_score, quality_score,
    run_accessibility_score, security_score, summarize,
};

use crate::types::{Recommendation, ReportSummary, RunResult, Scores};

/// Everything the orchestrator needs from aggregation
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub summary: ReportSummary,
    pub scores: Scores,
    pub recommendations: Vec<Recommendation>,
}

/// Aggregate a fixed sequence of run results. Pure and deterministic:
/// repeated calls over the same input yield identical scores and
/// recommendation ordering.
pub fn aggregate(results: &[RunResult]) -> Aggregation {
    Aggregation {
        summary: summarize(results),
        scores: compute_scores(results),
        recommendations: generate_recommendations(results),
    }
}
