pub mod error;
pub mod llm_classifier;
pub mod matcher;
pub mod rules;
pub mod types;

pub use error::{IntentError, Result};
pub use llm_classifier::{classify, DEFAULT_CONFIDENCE_THRESHOLD};
pub use matcher::{IntentMatcher, McpHostTrigger};
pub use rules::IntentRule;
pub use types::{HitlIntent, IntentCategory, IntentResult, IntentSource, MemoryIntent};

use noetic_llm::LlmProvider;

/// Runs the full two-layer recognizer for one turn: static rules first
/// (with any running tool hosts spliced in), an optional LLM classifier
/// second, and "normal" if neither produces a match. `llm` is optional —
/// deployments without a configured classifier model skip straight to the
/// fallback once Layer 1 misses.
pub async fn recognize_turn(
    matcher: &IntentMatcher,
    text: &str,
    hosts: &[McpHostTrigger],
    mcp_priority: i32,
    llm: Option<(&dyn LlmProvider, &str)>,
    confidence_threshold: f64,
) -> Result<IntentResult> {
    if let Some(result) = matcher.recognize_with_mcp_hosts(text, hosts, mcp_priority)? {
        return Ok(result);
    }

    if let Some((provider, model)) = llm {
        if let Some(result) = classify(provider, model, text, confidence_threshold).await {
            return Ok(result);
        }
    }

    Ok(IntentResult::normal_fallback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_normal_without_llm_configured() {
        let matcher = IntentMatcher::new().unwrap();
        let result = recognize_turn(&matcher, "what's up", &[], 20, None, DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(result.category, IntentCategory::Normal);
        assert_eq!(result.source, IntentSource::Fallback);
    }

    #[tokio::test]
    async fn layer1_rule_short_circuits_layer2() {
        let matcher = IntentMatcher::new().unwrap();
        let result = recognize_turn(
            &matcher,
            "remind me to call mom",
            &[],
            20,
            None,
            DEFAULT_CONFIDENCE_THRESHOLD,
        )
        .await
        .unwrap();
        assert_eq!(result.source, IntentSource::Layer1Rule);
    }
}
