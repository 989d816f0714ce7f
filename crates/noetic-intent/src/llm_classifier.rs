use crate::types::{parse_intent_label, IntentResult, IntentSource};
use noetic_llm::{ChatRequest, LlmProvider, Message, Role};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Deserialize)]
struct ClassifierOutput {
    intent: String,
    confidence: f64,
}

fn classifier_prompt(text: &str) -> String {
    format!(
        "Classify the intent of the following user message. Respond with a single \
         JSON object of the form {{\"intent\": \"<label>\", \"confidence\": <0..1>}}. \
         Valid labels: normal, mcp, memory.preference, memory.fact, memory.pattern, \
         memory.opinion, hitl.proactive_inquiry, hitl.topic_deepening, \
         hitl.emotion_driven, hitl.memory_gap, hitl.question_to_form, \
         hitl.plan_reminder, hitl.visual_display.\n\nMessage: {text}"
    )
}

/// Layer 2: an LLM fallback for messages the static rules don't cover.
/// Any failure — transport, non-JSON output, an unrecognized label, or a
/// confidence below `threshold` — falls through to `None` rather than
/// erroring; the caller's fallback is always "normal".
pub async fn classify(
    provider: &dyn LlmProvider,
    model: &str,
    text: &str,
    threshold: f64,
) -> Option<IntentResult> {
    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![Message {
            role: Role::User,
            content: classifier_prompt(text),
        }],
        max_tokens: 128,
        temperature: Some(0.0),
    };

    let response = match provider.complete(&request).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(error = %err, "noetic-intent: layer-2 classifier call failed, falling through");
            return None;
        }
    };

    let parsed: ClassifierOutput = match serde_json::from_str(response.content.trim()) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, raw = %response.content, "noetic-intent: layer-2 output was not valid JSON");
            return None;
        }
    };

    let confidence = parsed.confidence.clamp(0.0, 1.0);
    if confidence < threshold {
        return None;
    }

    let category = parse_intent_label(&parsed.intent)?;
    Some(IntentResult {
        category,
        confidence,
        source: IntentSource::Layer2Llm,
        matched_rule: None,
        tool_host_name: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use noetic_llm::{ChatResponse, Result as LlmResult};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubProvider {
        response: String,
        fail: AtomicBool,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete(&self, _req: &ChatRequest) -> LlmResult<ChatResponse> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(noetic_llm::LlmError::NotConfigured);
            }
            Ok(ChatResponse {
                content: self.response.clone(),
                model: "stub".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn accepts_confident_well_formed_label() {
        let provider = StubProvider {
            response: r#"{"intent": "hitl.plan_reminder", "confidence": 0.9}"#.to_string(),
            fail: AtomicBool::new(false),
        };
        let result = classify(&provider, "gpt", "remind me", DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .expect("should classify");
        assert_eq!(result.source, IntentSource::Layer2Llm);
    }

    #[tokio::test]
    async fn falls_through_on_low_confidence() {
        let provider = StubProvider {
            response: r#"{"intent": "normal", "confidence": 0.1}"#.to_string(),
            fail: AtomicBool::new(false),
        };
        assert!(classify(&provider, "gpt", "hello", DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn falls_through_on_transport_error() {
        let provider = StubProvider {
            response: String::new(),
            fail: AtomicBool::new(true),
        };
        assert!(classify(&provider, "gpt", "hello", DEFAULT_CONFIDENCE_THRESHOLD)
            .await
            .is_none());
    }
}
