//! Emotion node (§4.J): a cheap heuristic pre-pass over the user's text,
//! run before reasoning sees it. This sets `emotional_context`, the clause
//! folded into the reasoning prompt — distinct from `detected_emotion`,
//! which reasoning parses out of the *model's own* structured output
//! afterward (§4.F).

use crate::error::Result;
use crate::services::GraphServices;
use crate::state::{EmotionalContext, GraphState};
use noetic_emotion::{select_strategy, EmotionType, Formality, Tone};
use noetic_memory::working_memory::{self, WorkingMemoryUpdate};
use tracing::instrument;

/// Ordered `(keywords, emotion)` table. First match wins, so more specific
/// phrasing is listed ahead of generic overlaps — same priority-ordering
/// idea as `noetic-intent`'s rule list, just without the regex engine since
/// this pass never needs more than substring containment.
const KEYWORD_TABLE: &[(&[&str], EmotionType)] = &[
    (&["furious", "pissed", "angry", "mad at"], EmotionType::Angry),
    (&["frustrated", "annoyed", "fed up"], EmotionType::Frustrated),
    (&["anxious", "worried", "nervous", "scared"], EmotionType::Anxious),
    (&["sad", "upset", "heartbroken", "down"], EmotionType::Sad),
    (&["confused", "don't understand", "lost"], EmotionType::Confused),
    (&["disappointed", "let down"], EmotionType::Disappointed),
    (&["bored", "boring"], EmotionType::Bored),
    (&["thank you", "thanks", "appreciate"], EmotionType::Grateful),
    (&["excited", "can't wait", "pumped"], EmotionType::Excited),
    (&["curious", "wondering", "i wonder"], EmotionType::Curious),
    (&["happy", "great", "awesome", "glad"], EmotionType::Happy),
];

/// Static `(valence, arousal)` pair per emotion, in the same order
/// `select_strategy` enumerates the type — deterministic, no model call.
fn valence_arousal(emotion: EmotionType) -> (f64, f64) {
    use EmotionType::*;
    match emotion {
        Happy => (0.8, 0.6),
        Sad => (-0.7, 0.3),
        Anxious => (-0.5, 0.7),
        Frustrated => (-0.6, 0.6),
        Confused => (-0.2, 0.5),
        Neutral => (0.0, 0.2),
        Excited => (0.8, 0.8),
        Angry => (-0.8, 0.8),
        Grateful => (0.7, 0.4),
        Curious => (0.4, 0.5),
        Bored => (-0.3, 0.1),
        Disappointed => (-0.5, 0.3),
    }
}

fn heuristic_emotion(text: &str) -> EmotionType {
    let lower = text.to_ascii_lowercase();
    for (keywords, emotion) in KEYWORD_TABLE {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return *emotion;
        }
    }
    EmotionType::Neutral
}

fn modulation_instruction(strategy: noetic_emotion::ResponseStrategy) -> String {
    let tone = match strategy.tone {
        Tone::Warm => "warm",
        Tone::Gentle => "gentle",
        Tone::Calm => "calm",
        Tone::Patient => "patient",
        Tone::Clarifying => "clarifying",
        Tone::Neutral => "neutral",
        Tone::Enthusiastic => "enthusiastic",
        Tone::Measured => "measured",
        Tone::Appreciative => "appreciative",
        Tone::Engaged => "engaged",
        Tone::Energizing => "energizing",
        Tone::Empathetic => "empathetic",
    };
    let formality = match strategy.formality {
        Formality::Casual => "casual",
        Formality::Neutral => "neutral",
        Formality::Formal => "formal",
    };
    format!(
        "Respond with a {tone} tone, {formality} register, at most {} characters.{}{}",
        strategy.max_length,
        if strategy.proactive_question { " Consider a gentle follow-up question." } else { "" },
        if strategy.emoji_allowed { " An occasional emoji is fine." } else { " Do not use emoji." },
    )
}

#[instrument(skip(services, state))]
pub async fn run(services: &GraphServices<'_>, state: &mut GraphState) -> Result<()> {
    if !services.features.use_memory_emotion_system {
        state.trace("emotion", "skipped", Some("use_memory_emotion_system disabled".to_string()));
        return Ok(());
    }

    let emotion = heuristic_emotion(&state.semantic_input.text);
    let (valence, arousal) = valence_arousal(emotion);
    let strategy = select_strategy(emotion);

    state.emotional_context = EmotionalContext {
        current_emotion: format!("{emotion:?}").to_ascii_lowercase(),
        valence,
        arousal,
        modulation_instruction: modulation_instruction(strategy),
    };

    working_memory::update(
        services.store,
        &state.conversation_id,
        WorkingMemoryUpdate {
            last_emotion: Some(state.emotional_context.current_emotion.clone()),
            ..Default::default()
        },
    )?;

    state.trace("emotion", "inferred", Some(state.emotional_context.current_emotion.clone()));
    Ok(())
}
