use serde::{Deserialize, Serialize};

/// Memory-write intents — the message is a candidate for persisted memory,
/// not just conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryIntent {
    Preference,
    Fact,
    Pattern,
    Opinion,
}

/// Human-in-the-loop intents — the turn should pause for an external step
/// (a form, a confirmation, a display) rather than answer directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlIntent {
    ProactiveInquiry,
    TopicDeepening,
    EmotionDriven,
    MemoryGap,
    QuestionToForm,
    PlanReminder,
    VisualDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentCategory {
    Memory(MemoryIntent),
    Hitl(HitlIntent),
    Mcp,
    Normal,
}

/// Which stage produced a match, for observability and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    Layer1Rule,
    Layer2Llm,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub category: IntentCategory,
    pub confidence: f64,
    pub source: IntentSource,
    pub matched_rule: Option<String>,
    pub tool_host_name: Option<String>,
}

impl IntentResult {
    pub fn normal_fallback() -> Self {
        Self {
            category: IntentCategory::Normal,
            confidence: 1.0,
            source: IntentSource::Fallback,
            matched_rule: None,
            tool_host_name: None,
        }
    }

    pub fn rule_match(category: IntentCategory, rule_name: &str) -> Self {
        Self {
            category,
            confidence: 1.0,
            source: IntentSource::Layer1Rule,
            matched_rule: Some(rule_name.to_string()),
            tool_host_name: None,
        }
    }

    pub fn mcp_match(tool_host_name: &str, rule_name: &str) -> Self {
        Self {
            category: IntentCategory::Mcp,
            confidence: 1.0,
            source: IntentSource::Layer1Rule,
            matched_rule: Some(rule_name.to_string()),
            tool_host_name: Some(tool_host_name.to_string()),
        }
    }
}

/// Parses the free-form intent label a Layer-2 classifier prompt is asked to
/// return, e.g. `"memory.preference"`, `"hitl.plan_reminder"`, `"mcp"`, `"normal"`.
pub fn parse_intent_label(label: &str) -> Option<IntentCategory> {
    let label = label.trim().to_ascii_lowercase();
    match label.as_str() {
        "normal" => return Some(IntentCategory::Normal),
        "mcp" => return Some(IntentCategory::Mcp),
        _ => {}
    }
    let (family, rest) = label.split_once('.')?;
    match family {
        "memory" => {
            let intent = match rest {
                "preference" => MemoryIntent::Preference,
                "fact" => MemoryIntent::Fact,
                "pattern" => MemoryIntent::Pattern,
                "opinion" => MemoryIntent::Opinion,
                _ => return None,
            };
            Some(IntentCategory::Memory(intent))
        }
        "hitl" => {
            let intent = match rest {
                "proactive_inquiry" => HitlIntent::ProactiveInquiry,
                "topic_deepening" => HitlIntent::TopicDeepening,
                "emotion_driven" => HitlIntent::EmotionDriven,
                "memory_gap" => HitlIntent::MemoryGap,
                "question_to_form" => HitlIntent::QuestionToForm,
                "plan_reminder" => HitlIntent::PlanReminder,
                "visual_display" => HitlIntent::VisualDisplay,
                _ => return None,
            };
            Some(IntentCategory::Hitl(intent))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qualified_labels() {
        assert_eq!(
            parse_intent_label("memory.preference"),
            Some(IntentCategory::Memory(MemoryIntent::Preference))
        );
        assert_eq!(
            parse_intent_label("hitl.plan_reminder"),
            Some(IntentCategory::Hitl(HitlIntent::PlanReminder))
        );
        assert_eq!(parse_intent_label("normal"), Some(IntentCategory::Normal));
        assert_eq!(parse_intent_label("mcp"), Some(IntentCategory::Mcp));
    }

    #[test]
    fn rejects_unknown_labels() {
        assert_eq!(parse_intent_label("memory.nonsense"), None);
        assert_eq!(parse_intent_label("bogus"), None);
    }
}
