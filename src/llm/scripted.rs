//! Scripted LLM Provider
//!
//! Deterministic canned responses keyed on prompt substrings. Used for
//! offline runs and for tests that need reproducible AI-quality scoring
//! without a live backend.

use async_trait::async_trait;
use serde_json::Value;

use super::LlmProvider;
use crate::types::Result;

/// Substring-matched canned response provider
pub struct ScriptedProvider {
    rules: Vec<(String, String)>,
    fallback: String,
}

impl ScriptedProvider {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Respond with `response` when the prompt contains `keyword`
    /// (case-insensitive). Rules are checked in registration order.
    pub fn rule(mut self, keyword: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .push((keyword.into().to_lowercase(), response.into()));
        self
    }

    /// Canned supportive wellness responses covering the built-in AI-quality
    /// scenarios: habit coaching, motivation dips, and crisis prompts.
    pub fn supportive() -> Self {
        Self::new(
            "I hear you, and what you're feeling makes sense. You can start small today: \
             pick one specific habit, for example a five-minute walk after lunch, and track \
             your progress this week. Keep going, every step counts.",
        )
        .rule(
            "overwhelmed",
            "That sounds really hard, and I understand why you feel overwhelmed. It's valid \
             to feel this way. You are not alone in this. Try one small step tonight: write \
             down the three things weighing on you most, then pick just one to act on \
             tomorrow. If it keeps feeling unmanageable, please reach out to someone you \
             trust or a professional for support. You've got this, one step at a time.",
        )
        .rule(
            "hopeless",
            "I'm sorry you're feeling this way, and I want you to know your feelings are \
             valid. You are not alone. Please reach out for support: talk to someone you \
             trust, or contact a crisis line such as 988 to speak with a trained counselor. \
             In the meantime, try to be gentle with yourself tonight. Small steps count, \
             and support is available.",
        )
        .rule(
            "streak",
            "Losing a streak stings, and I understand the frustration. It's great that you \
             built one at all, that's real progress. Try restarting with a smaller version \
             of your habit today, for example two minutes instead of twenty, and schedule \
             it right after something you already do. Keep going, you can rebuild this.",
        )
        .rule(
            "motivat",
            "It makes sense that motivation dips, everyone experiences this. Instead of \
             waiting to feel motivated, try shrinking the task: set a two-minute timer and \
             just start. For example, put on your running shoes and step outside. You've \
             made progress before and you can do it again. Be proud of showing up at all.",
        )
    }

    /// Terse low-quality responses, for tests asserting penalty paths.
    pub fn flat() -> Self {
        Self::new("ok.")
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate_response(&self, prompt: &str, _context: &Value) -> Result<String> {
        let lowered = prompt.to_lowercase();
        for (keyword, response) in &self.rules {
            if lowered.contains(keyword) {
                return Ok(response.clone());
            }
        }
        Ok(self.fallback.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn matches_rules_in_order() {
        let provider = ScriptedProvider::new("fallback")
            .rule("alpha", "first")
            .rule("alpha beta", "second");
        let response = provider
            .generate_response("ALPHA BETA test", &Value::Null)
            .await
            .unwrap();
        assert_eq!(response, "first");
    }

    #[tokio::test]
    async fn falls_back_when_no_rule_matches() {
        let provider = ScriptedProvider::new("fallback").rule("alpha", "first");
        let response = provider
            .generate_response("nothing relevant", &Value::Null)
            .await
            .unwrap();
        assert_eq!(response, "fallback");
    }

    #[tokio::test]
    async fn supportive_covers_crisis_prompts() {
        let provider = ScriptedProvider::supportive();
        let response = provider
            .generate_response("Everything feels hopeless lately", &Value::Null)
            .await
            .unwrap();
        assert!(response.contains("not alone"));
        assert!(response.contains("988"));
    }
}
