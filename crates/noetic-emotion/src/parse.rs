use crate::types::{DetectedEmotion, EmotionType, MemoryUpdate, ParsedLlmOutput};
use serde::Deserialize;
use tracing::warn;

const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct RawEmotion {
    primary: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    indicators: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawMemoryUpdate {
    #[serde(default)]
    should_store: bool,
    #[serde(default)]
    entries: Vec<crate::types::MemoryUpdateEntry>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    emotion: RawEmotion,
    response: String,
    #[serde(default)]
    memory_update: Option<RawMemoryUpdate>,
}

fn neutral_fallback(text: &str) -> ParsedLlmOutput {
    ParsedLlmOutput {
        emotion: DetectedEmotion {
            primary: EmotionType::Neutral,
            category: "neutral".to_string(),
            confidence: 1.0,
            indicators: Vec::new(),
        },
        response: text.to_string(),
        memory_update: MemoryUpdate::default(),
    }
}

/// Parses a model's structured turn output. Any malformed-JSON response
/// degrades to a neutral-emotion, no-memory-update response carrying the
/// raw text through unchanged — this node never propagates a parse
/// failure into the event stream.
pub fn parse_llm_output(text: &str) -> ParsedLlmOutput {
    let raw: RawOutput = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "noetic-emotion: turn output was not valid JSON, using raw text");
            return neutral_fallback(text);
        }
    };

    let mut primary = EmotionType::from_label(&raw.emotion.primary).unwrap_or(EmotionType::Neutral);
    let mut confidence = raw.emotion.confidence.clamp(0.0, 1.0);
    let mut indicators = raw.emotion.indicators;

    if confidence < LOW_CONFIDENCE_THRESHOLD {
        if primary != EmotionType::Neutral {
            indicators.push(format!("low_confidence_override:{}", raw.emotion.primary));
        }
        primary = EmotionType::Neutral;
    }

    let memory_update = raw
        .memory_update
        .map(|m| MemoryUpdate {
            should_store: m.should_store,
            entries: m.entries,
        })
        .unwrap_or_default();

    ParsedLlmOutput {
        emotion: DetectedEmotion {
            primary,
            category: if raw.emotion.category.is_empty() {
                "neutral".to_string()
            } else {
                raw.emotion.category
            },
            confidence,
            indicators,
        },
        response: raw.response,
        memory_update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_on_malformed_json() {
        let parsed = parse_llm_output("not json at all");
        assert_eq!(parsed.emotion.primary, EmotionType::Neutral);
        assert_eq!(parsed.response, "not json at all");
        assert!(!parsed.memory_update.should_store);
    }

    #[test]
    fn unknown_emotion_label_degrades_to_neutral() {
        let parsed = parse_llm_output(
            r#"{"emotion":{"primary":"ecstatic","confidence":0.9},"response":"hi"}"#,
        );
        assert_eq!(parsed.emotion.primary, EmotionType::Neutral);
    }

    #[test]
    fn low_confidence_degrades_and_tags_indicator() {
        let parsed = parse_llm_output(
            r#"{"emotion":{"primary":"angry","confidence":0.2},"response":"hi"}"#,
        );
        assert_eq!(parsed.emotion.primary, EmotionType::Neutral);
        assert!(parsed.emotion.indicators.iter().any(|i| i.contains("angry")));
    }

    #[test]
    fn confidence_is_clamped() {
        let parsed = parse_llm_output(
            r#"{"emotion":{"primary":"happy","confidence":1.7},"response":"hi"}"#,
        );
        assert_eq!(parsed.emotion.confidence, 1.0);
    }

    #[test]
    fn well_formed_output_passes_through() {
        let parsed = parse_llm_output(
            r#"{"emotion":{"primary":"grateful","category":"positive","confidence":0.8,"indicators":["thanks"]},"response":"you're welcome","memory_update":{"should_store":true,"entries":[{"category":"fact","key":"name","value":"Alex"}]}}"#,
        );
        assert_eq!(parsed.emotion.primary, EmotionType::Grateful);
        assert!(parsed.memory_update.should_store);
        assert_eq!(parsed.memory_update.entries.len(), 1);
    }
}
