//! Suite Configuration
//!
//! A suite is a named, schedulable group of agent configurations run
//! together. The suite `id` doubles as the mutex key for concurrent-run
//! prevention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::run::AgentKind;

/// Schedule frequency for a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    /// Only runs when a trigger condition matches
    OnDemand,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::OnDemand => "on_demand",
        };
        write!(f, "{}", s)
    }
}

/// When a suite should run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub frequency: Frequency,
    /// Extra trigger names that also start this suite (e.g. "deploy",
    /// "pre_release")
    #[serde(default)]
    pub trigger_conditions: Vec<String>,
}

impl Schedule {
    /// A trigger matches on exact frequency name or membership in the
    /// condition list.
    pub fn matches(&self, trigger: &str) -> bool {
        self.frequency.to_string() == trigger
            || self.trigger_conditions.iter().any(|c| c == trigger)
    }
}

/// One agent entry inside a suite: which variant to run, as whom, and with
/// what parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub kind: AgentKind,
    #[serde(default)]
    pub persona: Option<String>,
    /// Free-form parameter bag interpreted by the agent variant
    #[serde(default)]
    pub params: Value,
}

impl AgentConfig {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            persona: None,
            params: Value::Null,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// A named, schedulable grouping of agent configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Unique key; also the mutex key for single-flight execution
    pub id: String,
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub schedule: Schedule,
    pub agents: Vec<AgentConfig>,
}

impl SuiteConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            schedule: Schedule::default(),
            agents: Vec::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.agents.push(agent);
        self
    }
}
