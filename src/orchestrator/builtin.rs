//! Built-in Suite Catalog
//!
//! The suites every installation starts with. Users can register more or
//! replace these via configuration.

use serde_json::json;

use crate::types::{AgentConfig, AgentKind, Frequency, Schedule, SuiteConfig};

/// The default suite catalog
pub fn builtin_suites() -> Vec<SuiteConfig> {
    vec![
        SuiteConfig::new("smoke", "Smoke Suite")
            .schedule(Schedule {
                frequency: Frequency::Hourly,
                trigger_conditions: vec!["deploy".to_string()],
            })
            .agent(
                AgentConfig::new(AgentKind::UserJourney)
                    .with_persona("casual_user")
                    .with_params(json!({ "journeys": ["onboarding", "daily_usage"] })),
            )
            .agent(AgentConfig::new(AgentKind::Admin)),
        SuiteConfig::new("full_qa", "Full QA Sweep")
            .schedule(Schedule {
                frequency: Frequency::Daily,
                trigger_conditions: vec!["pre_release".to_string()],
            })
            .agent(AgentConfig::new(AgentKind::UserJourney).with_persona("casual_user"))
            .agent(AgentConfig::new(AgentKind::UserJourney).with_persona("power_user"))
            .agent(AgentConfig::new(AgentKind::Admin))
            .agent(AgentConfig::new(AgentKind::AiQuality).with_persona("casual_user"))
            .agent(AgentConfig::new(AgentKind::Visual)),
        SuiteConfig::new("performance", "Performance & Capacity")
            .schedule(Schedule {
                frequency: Frequency::Weekly,
                trigger_conditions: vec!["pre_release".to_string()],
            })
            .agent(AgentConfig::new(AgentKind::Load))
            .agent(AgentConfig::new(AgentKind::Admin)),
        SuiteConfig::new("ai_quality", "AI Response Quality")
            .schedule(Schedule {
                frequency: Frequency::Daily,
                trigger_conditions: vec!["prompt_change".to_string()],
            })
            .agent(AgentConfig::new(AgentKind::AiQuality).with_persona("casual_user"))
            .agent(
                AgentConfig::new(AgentKind::AiQuality)
                    .with_persona("struggling_user")
                    .with_params(json!({ "scenarios": ["crisis_overwhelmed", "crisis_hopeless"] })),
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let suites = builtin_suites();
        let mut ids: Vec<&str> = suites.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), suites.len());
    }

    #[test]
    fn every_builtin_suite_has_agents() {
        for suite in builtin_suites() {
            assert!(suite.enabled);
            assert!(!suite.agents.is_empty(), "suite {} has no agents", suite.id);
        }
    }

    #[test]
    fn deploy_trigger_matches_smoke_only() {
        let matching: Vec<String> = builtin_suites()
            .into_iter()
            .filter(|s| s.schedule.matches("deploy"))
            .map(|s| s.id)
            .collect();
        assert_eq!(matching, vec!["smoke".to_string()]);
    }
}
