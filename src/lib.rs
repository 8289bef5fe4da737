//! Patrol - Autonomous QA Orchestration Engine
//!
//! A quality engineering system that runs batteries of autonomous test
//! agents against a target product, scores the outcome on severity-weighted
//! quality dimensions, and tracks health over time.
//!
//! ## Core Features
//!
//! - **Pluggable Agents**: user-journey, admin, AI-quality, load, and visual
//!   variants behind one execution contract
//! - **Single-Flight Suites**: per-suite-id mutual exclusion with automatic
//!   slot release on every exit path
//! - **Deterministic Scoring**: pure aggregation from run results to
//!   dimensional scores, ranked recommendations, and alerts
//! - **Trend Analytics**: rolling-window health trends and a tri-state
//!   dashboard over archived reports
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use patrol::{MemoryStore, Orchestrator, ScriptedProvider, SimulatedProbe};
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ScriptedProvider::supportive()),
//!     Arc::new(SimulatedProbe::with_seed(42)),
//! )
//! .with_builtin_suites();
//! let report = orchestrator.run("smoke", "manual").await?;
//! ```
//!
//! ## Modules
//!
//! - [`agents`]: the pluggable test agent variants
//! - [`orchestrator`]: suite registry, execution engine, alerting
//! - [`scoring`]: pure score and recommendation computation
//! - [`history`]: report history, trends, dashboard, SQLite archive
//! - [`llm`]: language-model backends for the AI-quality agent
//! - [`probe`]/[`store`]: measurement and data-store capability seams
//! - [`config`]: layered configuration loading

pub mod agents;
pub mod config;
pub mod constants;
pub mod history;
pub mod llm;
pub mod orchestrator;
pub mod probe;
pub mod scoring;
pub mod store;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{ConfigLoader, PatrolConfig};

// Error Types
pub use types::{PatrolError, Result, ResultExt};

// Orchestration
pub use orchestrator::{AlertConfig, Orchestrator, builtin_suites};

// History & Analytics
pub use history::{
    DashboardSnapshot, HealthStatus, History, ReportArchive, ScoreSeries, TrendAnalytics,
};

// =============================================================================
// Agent Re-exports
// =============================================================================

pub use agents::{
    AdminAgent, Agent, AgentContext, AiQualityAgent, CancelToken, LoadAgent, UserJourneyAgent,
    VisualAgent, build_agent,
};

// =============================================================================
// Collaborator Re-exports
// =============================================================================

pub use llm::{HttpProvider, LlmProvider, ProviderConfig, ScriptedProvider, create_provider};
pub use probe::{Probe, SimulatedProbe};
pub use store::{MemoryStore, RecordStore};

// =============================================================================
// Type Re-exports
// =============================================================================

pub use scoring::aggregate;
pub use types::{
    AgentConfig, AgentKind, Finding, FindingKind, Frequency, Recommendation, RunResult, Schedule,
    Scores, Severity, SuiteConfig, SuiteReport,
};
