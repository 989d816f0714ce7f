use serde::{Deserialize, Serialize};

/// The finite emotion enumeration §4.F requires. Six variants come from
/// the source's `emotion.py` (`Happy, Sad, Anxious, Frustrated, Confused,
/// Neutral`); the other six fill out an evenly-covered affect set, per
/// the Open Question resolution in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionType {
    Happy,
    Sad,
    Anxious,
    Frustrated,
    Confused,
    Neutral,
    Excited,
    Angry,
    Grateful,
    Curious,
    Bored,
    Disappointed,
}

impl EmotionType {
    pub fn from_label(label: &str) -> Option<Self> {
        use EmotionType::*;
        Some(match label.trim().to_ascii_lowercase().as_str() {
            "happy" => Happy,
            "sad" => Sad,
            "anxious" => Anxious,
            "frustrated" => Frustrated,
            "confused" => Confused,
            "neutral" => Neutral,
            "excited" => Excited,
            "angry" => Angry,
            "grateful" => Grateful,
            "curious" => Curious,
            "bored" => Bored,
            "disappointed" => Disappointed,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedEmotion {
    pub primary: EmotionType,
    pub category: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUpdateEntry {
    pub category: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub should_store: bool,
    #[serde(default)]
    pub entries: Vec<MemoryUpdateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedLlmOutput {
    pub emotion: DetectedEmotion,
    pub response: String,
    pub memory_update: MemoryUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseStrategy {
    pub tone: Tone,
    pub max_length: u32,
    pub use_memory: bool,
    pub proactive_question: bool,
    pub formality: Formality,
    pub emoji_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Warm,
    Gentle,
    Calm,
    Patient,
    Clarifying,
    Neutral,
    Enthusiastic,
    Measured,
    Appreciative,
    Engaged,
    Energizing,
    Empathetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Casual,
    Neutral,
    Formal,
}
