use crate::error::Result;
use crate::rules::{default_rules, mcp_rule, IntentRule};
use crate::types::IntentResult;

/// One running tool host's trigger vocabulary, as seen from the intent
/// layer — just enough to splice dynamic MCP rules in ahead of a match
/// pass. The tool-host crate owns the richer `ToolHostStatus`.
#[derive(Debug, Clone)]
pub struct McpHostTrigger {
    pub host_name: String,
    pub trigger_keywords: Vec<String>,
}

/// Priority-sorted Layer-1 rule matcher. Stable sort descending by
/// priority keeps registration order for ties, same as the hook engine's
/// `sort_by_key` — just in the opposite direction (see `IntentRule`).
pub struct IntentMatcher {
    rules: Vec<IntentRule>,
}

impl IntentMatcher {
    pub fn new() -> Result<Self> {
        let mut rules = default_rules()?;
        sort_by_priority_desc(&mut rules);
        Ok(Self { rules })
    }

    /// Matches `text` against the static rule set only.
    pub fn recognize(&self, text: &str) -> Option<IntentResult> {
        recognize_in(&self.rules, text)
    }

    /// Matches against the static rule set plus one dynamic rule per
    /// running tool host's trigger keyword, spliced in at priority 20 —
    /// the same priority as an explicit reminder phrase, so whichever
    /// appears earlier in registration order wins a tie. Rebuilt fresh on
    /// every call: tool hosts start and stop between turns, so nothing is
    /// cached here.
    pub fn recognize_with_mcp_hosts(
        &self,
        text: &str,
        hosts: &[McpHostTrigger],
        mcp_priority: i32,
    ) -> Result<Option<IntentResult>> {
        let mut rules = self.rules.clone();
        for host in hosts {
            for keyword in &host.trigger_keywords {
                rules.push(mcp_rule(&host.host_name, keyword, mcp_priority)?);
            }
        }
        sort_by_priority_desc(&mut rules);
        Ok(recognize_in(&rules, text))
    }
}

fn sort_by_priority_desc(rules: &mut [IntentRule]) {
    rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
}

fn recognize_in(rules: &[IntentRule], text: &str) -> Option<IntentResult> {
    for rule in rules {
        if rule.pattern.is_match(text) {
            return Some(if matches!(rule.category, crate::types::IntentCategory::Mcp) {
                let host = rule
                    .name
                    .strip_prefix("mcp:")
                    .and_then(|rest| rest.split(':').next())
                    .unwrap_or_default();
                IntentResult::mcp_match(host, &rule.name)
            } else {
                IntentResult::rule_match(rule.category.clone(), &rule.name)
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HitlIntent, IntentCategory, MemoryIntent};

    #[test]
    fn reminder_beats_preference_on_ambiguous_message() {
        let matcher = IntentMatcher::new().unwrap();
        let result = matcher
            .recognize("remind me to buy the book I like tomorrow")
            .expect("should match");
        assert_eq!(
            result.category,
            IntentCategory::Hitl(HitlIntent::PlanReminder)
        );
    }

    #[test]
    fn plain_preference_matches_without_reminder_phrase() {
        let matcher = IntentMatcher::new().unwrap();
        let result = matcher.recognize("I really like jazz on rainy days").expect("should match");
        assert_eq!(
            result.category,
            IntentCategory::Memory(MemoryIntent::Preference)
        );
    }

    #[test]
    fn unrelated_text_falls_through() {
        let matcher = IntentMatcher::new().unwrap();
        assert!(matcher.recognize("what's the weather like").is_none());
    }

    #[test]
    fn dynamic_mcp_rule_matches_tool_trigger_keyword() {
        let matcher = IntentMatcher::new().unwrap();
        let hosts = vec![McpHostTrigger {
            host_name: "weather-tool".to_string(),
            trigger_keywords: vec!["forecast".to_string()],
        }];
        let result = matcher
            .recognize_with_mcp_hosts("give me the forecast for tomorrow", &hosts, 20)
            .unwrap()
            .expect("should match");
        assert_eq!(result.category, IntentCategory::Mcp);
        assert_eq!(result.tool_host_name.as_deref(), Some("weather-tool"));
    }
}
