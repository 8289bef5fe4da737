//! Test Agents
//!
//! A test agent is a pluggable unit that runs a battery of checks against a
//! target persona or system aspect and returns a `RunResult`. The contract:
//! `execute` never errors past its own boundary — any internal failure is
//! captured as a critical finding inside the returned result. Each check
//! catches its own failures so one check's error never aborts its siblings,
//! and fixture state is cleaned up on every exit path.
//!
//! ## Variants
//!
//! - [`UserJourneyAgent`]: replays persona journeys step by step
//! - [`AdminAgent`]: security, performance, CRUD-contract, and edge cases
//! - [`AiQualityAgent`]: scores LLM responses on fixed quality dimensions
//! - [`LoadAgent`]: synthesized load scenarios, capacity search, soak check
//! - [`VisualAgent`]: snapshot diffs, cross-target and breakpoint sweeps

mod admin;
mod ai_quality;
mod journey;
mod load;
mod visual;

pub use admin::AdminAgent;
pub use ai_quality::AiQualityAgent;
pub use journey::UserJourneyAgent;
pub use load::LoadAgent;
pub use visual::VisualAgent;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::llm::SharedProvider;
use crate::probe::SharedProbe;
use crate::store::SharedStore;
use crate::types::{AgentConfig, AgentKind, RunResult};

/// Cooperative cancellation token, checked between checks/journeys.
/// Cancellation yields a terminal RunResult marked incomplete, never a crash.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collaborators handed to every agent execution
#[derive(Clone)]
pub struct AgentContext {
    pub store: SharedStore,
    pub llm: SharedProvider,
    pub probe: SharedProbe,
    pub cancel: CancelToken,
}

impl AgentContext {
    pub fn new(store: SharedStore, llm: SharedProvider, probe: SharedProbe) -> Self {
        Self {
            store,
            llm,
            probe,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Polymorphic agent contract
#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    fn persona(&self) -> Option<&str> {
        None
    }

    /// Run the agent's full battery of checks. Never errors past this
    /// boundary: internal failures become findings in the returned result.
    async fn execute(&self, ctx: &AgentContext) -> RunResult;
}

/// Build the agent variant for a suite entry. The parameter bag is
/// interpreted by each variant; unknown fields are ignored.
pub fn build_agent(config: &AgentConfig) -> Box<dyn Agent> {
    let persona = config.persona.clone();
    match config.kind {
        AgentKind::UserJourney => Box::new(UserJourneyAgent::from_params(persona, &config.params)),
        AgentKind::Admin => Box::new(AdminAgent::from_params(&config.params)),
        AgentKind::AiQuality => Box::new(AiQualityAgent::from_params(persona, &config.params)),
        AgentKind::Load => Box::new(LoadAgent::from_params(&config.params)),
        AgentKind::Visual => Box::new(VisualAgent::from_params(&config.params)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::AgentContext;
    use crate::llm::ScriptedProvider;
    use crate::probe::SimulatedProbe;
    use crate::store::MemoryStore;

    /// Context wired to in-memory collaborators with an always-pass probe
    pub fn passing_context(seed: u64) -> AgentContext {
        AgentContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedProvider::supportive()),
            Arc::new(SimulatedProbe::always_pass(seed)),
        )
    }

    /// Context whose probe fails every check
    pub fn failing_context(seed: u64) -> AgentContext {
        AgentContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedProvider::supportive()),
            Arc::new(SimulatedProbe::always_fail(seed)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn registry_builds_every_kind() {
        for kind in [
            AgentKind::UserJourney,
            AgentKind::Admin,
            AgentKind::AiQuality,
            AgentKind::Load,
            AgentKind::Visual,
        ] {
            let config = AgentConfig {
                kind,
                persona: Some("casual_user".to_string()),
                params: Value::Null,
            };
            let agent = build_agent(&config);
            assert_eq!(agent.kind(), kind);
        }
    }
}
