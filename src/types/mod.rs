//! Core Value Types
//!
//! Findings, run results, suite configurations, and reports, plus the
//! unified error type. Everything here is plain data; behavior lives in the
//! agents, the scoring engine, and the orchestrator.

pub mod error;
mod finding;
mod report;
mod run;
mod suite;

pub use error::{PatrolError, Result, ResultExt};
pub use finding::{Finding, FindingBuilder, FindingKind, Severity};
pub use report::{Alert, Priority, Recommendation, ReportSummary, Scores, SuiteReport};
pub use run::{AgentKind, RunResult, RunResultBuilder};
pub use suite::{AgentConfig, Frequency, Schedule, SuiteConfig};
