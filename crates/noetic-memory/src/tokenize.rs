//! Tokenization and pronoun normalization for memory retrieval (§4.D step 1).
//!
//! No external word segmenter is in the teacher's or pack's dependency stack,
//! so the Chinese path always takes the documented fallback: contiguous runs
//! of CJK characters are treated as one token each, exactly as §4.D allows
//! "when a word segmenter is unavailable".

const STOP_WORDS_EN: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "to", "of", "and", "in",
    "on", "at", "for", "with", "about", "that", "this", "it", "as", "by", "or", "from", "but",
    "not", "do", "does", "did", "can", "could", "will", "would", "should", "i", "me", "my",
    "you", "your", "he", "she", "they", "them", "we", "us",
];

const STOP_WORDS_ZH: &[&str] = &[
    "的", "了", "是", "在", "我", "你", "他", "她", "它", "们", "和", "就", "都", "而", "及",
    "与", "这", "那", "也", "但", "啊", "吧", "呢", "吗", "个",
];

/// Pronoun forms that collapse onto a single neutral token so "what's my X"
/// and "what's your X" retrieve the same entry when the entry itself was
/// phrased from the other side of the conversation.
const FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "我", "我的"];
const SECOND_PERSON: &[&str] = &["you", "your", "yours", "你", "你的"];
const POLITE_SECOND_PERSON: &[&str] = &["您", "您的"];

const NEUTRAL_PRONOUN_TOKEN: &str = "__person__";

/// Tokenize `text`: lowercase, split Latin runs on whitespace/punctuation,
/// split CJK runs into individual characters, drop stop words, dedupe
/// preserving first-seen order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut raw = Vec::new();
    let mut current = String::new();

    for ch in lowered.chars() {
        if is_cjk(ch) {
            if !current.is_empty() {
                raw.push(std::mem::take(&mut current));
            }
            raw.push(ch.to_string());
        } else if ch.is_alphanumeric() {
            current.push(ch);
        } else if !current.is_empty() {
            raw.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        raw.push(current);
    }

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tok in raw {
        if tok.is_empty() || is_stop_word(&tok) {
            continue;
        }
        if seen.insert(tok.clone()) {
            out.push(tok);
        }
    }
    out
}

fn is_cjk(ch: char) -> bool {
    matches!(ch as u32,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x20000..=0x2A6DF | 0xF900..=0xFAFF
    )
}

fn is_stop_word(tok: &str) -> bool {
    STOP_WORDS_EN.contains(&tok) || STOP_WORDS_ZH.contains(&tok)
}

/// Replace first/second/polite-second-person pronoun tokens with one
/// neutral placeholder, so a query built around "my" can match an entry
/// stored around "your" and vice versa.
pub fn normalize_pronouns(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| {
            if FIRST_PERSON.contains(&t.as_str())
                || SECOND_PERSON.contains(&t.as_str())
                || POLITE_SECOND_PERSON.contains(&t.as_str())
            {
                NEUTRAL_PRONOUN_TOKEN.to_string()
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Pronoun-normalize a whole string (for the tier-4 substring fallback,
/// which normalizes both the query and the stored text before comparing).
pub fn normalize_pronouns_in_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut result = lowered.clone();
    for p in FIRST_PERSON.iter().chain(SECOND_PERSON).chain(POLITE_SECOND_PERSON) {
        result = result.replace(p, NEUTRAL_PRONOUN_TOKEN);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_mixed_cjk_and_latin() {
        let toks = tokenize("我喜欢 Python 编程");
        assert!(toks.contains(&"python".to_string()));
        assert!(toks.contains(&"编".to_string()));
        assert!(!toks.contains(&"我".to_string()), "stop word should be dropped");
    }

    #[test]
    fn dedupes_preserving_order() {
        let toks = tokenize("cat dog cat bird");
        assert_eq!(toks, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn pronoun_normalization_collapses_perspectives() {
        let a = normalize_pronouns(&["my".to_string(), "color".to_string()]);
        let b = normalize_pronouns(&["your".to_string(), "color".to_string()]);
        assert_eq!(a, b);
    }
}
