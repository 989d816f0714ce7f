use crate::types::{EmotionType, Formality, ResponseStrategy, Tone};

/// Static, deterministic emotion → response-strategy table. No model
/// involvement, no I/O — purely a match.
pub fn select_strategy(emotion: EmotionType) -> ResponseStrategy {
    use EmotionType::*;
    match emotion {
        Happy => ResponseStrategy {
            tone: Tone::Warm,
            max_length: 300,
            use_memory: true,
            proactive_question: true,
            formality: Formality::Casual,
            emoji_allowed: true,
        },
        Sad => ResponseStrategy {
            tone: Tone::Gentle,
            max_length: 400,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Neutral,
            emoji_allowed: false,
        },
        Anxious => ResponseStrategy {
            tone: Tone::Calm,
            max_length: 350,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Neutral,
            emoji_allowed: false,
        },
        Frustrated => ResponseStrategy {
            tone: Tone::Patient,
            max_length: 350,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Neutral,
            emoji_allowed: false,
        },
        Confused => ResponseStrategy {
            tone: Tone::Clarifying,
            max_length: 450,
            use_memory: true,
            proactive_question: true,
            formality: Formality::Neutral,
            emoji_allowed: false,
        },
        Neutral => ResponseStrategy {
            tone: Tone::Neutral,
            max_length: 300,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Neutral,
            emoji_allowed: false,
        },
        Excited => ResponseStrategy {
            tone: Tone::Enthusiastic,
            max_length: 300,
            use_memory: true,
            proactive_question: true,
            formality: Formality::Casual,
            emoji_allowed: true,
        },
        Angry => ResponseStrategy {
            tone: Tone::Measured,
            max_length: 300,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Formal,
            emoji_allowed: false,
        },
        Grateful => ResponseStrategy {
            tone: Tone::Appreciative,
            max_length: 250,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Casual,
            emoji_allowed: true,
        },
        Curious => ResponseStrategy {
            tone: Tone::Engaged,
            max_length: 400,
            use_memory: true,
            proactive_question: true,
            formality: Formality::Casual,
            emoji_allowed: false,
        },
        Bored => ResponseStrategy {
            tone: Tone::Energizing,
            max_length: 250,
            use_memory: false,
            proactive_question: true,
            formality: Formality::Casual,
            emoji_allowed: true,
        },
        Disappointed => ResponseStrategy {
            tone: Tone::Empathetic,
            max_length: 350,
            use_memory: true,
            proactive_question: false,
            formality: Formality::Neutral,
            emoji_allowed: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_deterministic_entry() {
        let variants = [
            EmotionType::Happy,
            EmotionType::Sad,
            EmotionType::Anxious,
            EmotionType::Frustrated,
            EmotionType::Confused,
            EmotionType::Neutral,
            EmotionType::Excited,
            EmotionType::Angry,
            EmotionType::Grateful,
            EmotionType::Curious,
            EmotionType::Bored,
            EmotionType::Disappointed,
        ];
        for v in variants {
            let a = select_strategy(v);
            let b = select_strategy(v);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn angry_strategy_is_formal_and_no_emoji() {
        let s = select_strategy(EmotionType::Angry);
        assert_eq!(s.formality, Formality::Formal);
        assert!(!s.emoji_allowed);
    }
}
