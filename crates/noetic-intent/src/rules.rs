use crate::error::{IntentError, Result};
use crate::types::{HitlIntent, IntentCategory, MemoryIntent};
use regex::Regex;

/// A single Layer-1 matcher, mirroring the `HookDefinition` shape used by
/// the hook engine this matcher borrows its priority-dispatch idiom from.
/// Unlike the hook engine — which runs every registered hook, lowest
/// priority number first, because "most urgent to block on" goes first —
/// this matcher stops at the *first* match, so ties are broken by running
/// the *highest* priority number first: a more specific rule should win
/// over a generic one even if both match the same message.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub name: String,
    pub pattern: Regex,
    pub category: IntentCategory,
    pub priority: i32,
}

impl IntentRule {
    pub fn new(name: &str, pattern: &str, category: IntentCategory, priority: i32) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| IntentError::BadPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            pattern,
            category,
            priority,
        })
    }
}

/// One rule per MCP tool-host trigger keyword, spliced in ahead of each
/// turn from the tool host registry's current `trigger_keywords` — tool
/// hosts start and stop at runtime, so these are rebuilt per-call rather
/// than registered once.
pub fn mcp_rule(host_name: &str, keyword: &str, priority: i32) -> Result<IntentRule> {
    let escaped = regex::escape(keyword);
    IntentRule::new(
        &format!("mcp:{host_name}:{keyword}"),
        &format!(r"(?i)\b{escaped}\b"),
        IntentCategory::Mcp,
        priority,
    )
}

/// The static Layer-1 rule set. Priorities separate the three families:
/// memory-write intents are the most generic (10), HITL intents are more
/// specific (15), and a direct reminder request outranks all of them (20) —
/// "remind me to buy the Python book" is a plan reminder even though it also
/// mentions a thing the user likes.
pub fn default_rules() -> Result<Vec<IntentRule>> {
    Ok(vec![
        IntentRule::new(
            "preference",
            r"(?i)\b(i (?:really )?(?:like|love|prefer|enjoy)|my favorite)\b",
            IntentCategory::Memory(MemoryIntent::Preference),
            10,
        )?,
        IntentRule::new(
            "fact",
            r"(?i)\b(i am|i'm|i live in|my name is|i work (?:as|at))\b",
            IntentCategory::Memory(MemoryIntent::Fact),
            10,
        )?,
        IntentRule::new(
            "pattern",
            r"(?i)\b(i usually|i always|i tend to|every (?:day|morning|night))\b",
            IntentCategory::Memory(MemoryIntent::Pattern),
            10,
        )?,
        IntentRule::new(
            "opinion",
            r"(?i)\b(i think|i believe|in my opinion|i feel like)\b",
            IntentCategory::Memory(MemoryIntent::Opinion),
            10,
        )?,
        IntentRule::new(
            "proactive_inquiry",
            r"(?i)\b(by the way|i('m| am) curious|i('ve| have) been wondering)\b",
            IntentCategory::Hitl(HitlIntent::ProactiveInquiry),
            15,
        )?,
        IntentRule::new(
            "topic_deepening",
            r"(?i)\b(tell me more|go deeper|can you elaborate)\b",
            IntentCategory::Hitl(HitlIntent::TopicDeepening),
            15,
        )?,
        IntentRule::new(
            "emotion_driven",
            r"(?i)\b(i feel|i'm feeling|that makes me (?:happy|sad|anxious|angry))\b",
            IntentCategory::Hitl(HitlIntent::EmotionDriven),
            15,
        )?,
        IntentRule::new(
            "memory_gap",
            r"(?i)\b(i don't remember|what did i (?:say|tell you)|i forgot)\b",
            IntentCategory::Hitl(HitlIntent::MemoryGap),
            15,
        )?,
        IntentRule::new(
            "question_to_form",
            r"(?i)\b(can you ask me|fill (?:out|in) a form|run a survey)\b",
            IntentCategory::Hitl(HitlIntent::QuestionToForm),
            15,
        )?,
        IntentRule::new(
            "visual_display",
            r"(?i)\b(show me|display (?:the|my)|visualize)\b",
            IntentCategory::Hitl(HitlIntent::VisualDisplay),
            15,
        )?,
        IntentRule::new(
            "plan_reminder",
            r"(?i)\b(remind me|set a reminder|don't forget to)\b",
            IntentCategory::Hitl(HitlIntent::PlanReminder),
            20,
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_compile_and_cover_both_families() {
        let rules = default_rules().unwrap();
        assert!(rules.iter().any(|r| r.name == "plan_reminder"));
        assert!(rules.iter().any(|r| r.name == "preference"));
    }

    #[test]
    fn plan_reminder_outranks_preference() {
        let rules = default_rules().unwrap();
        let reminder = rules.iter().find(|r| r.name == "plan_reminder").unwrap();
        let preference = rules.iter().find(|r| r.name == "preference").unwrap();
        assert!(reminder.priority > preference.priority);
    }
}
