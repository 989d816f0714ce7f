pub mod parse;
pub mod strategy;
pub mod types;

pub use parse::parse_llm_output;
pub use strategy::select_strategy;
pub use types::{
    DetectedEmotion, EmotionType, Formality, MemoryUpdate, MemoryUpdateEntry, ParsedLlmOutput,
    ResponseStrategy, Tone,
};
