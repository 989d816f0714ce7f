//! The retrieval algorithm (§4.D step 2-5): tokenize, candidate recall across
//! four fallback tiers, multi-factor scoring, sort, return top N.

use crate::error::Result;
use crate::tokenize::{normalize_pronouns, normalize_pronouns_in_text, tokenize};
use noetic_storage::{MemoryEntryRow, Store};
use std::collections::HashMap;

pub const DEFAULT_RECALL_LIMIT: usize = 5;
pub const DEFAULT_CANDIDATE_CEILING: usize = 50;

/// One candidate with its computed subscores, exposed so callers (and tests)
/// can inspect why a memory ranked where it did (§4.D step 5: "subscores
/// exposed for debugging").
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoredMemory {
    pub entry: MemoryEntryRow,
    pub keyword_score: f64,
    pub category_boost: f64,
    pub recency_score: f64,
    pub frequency_score: f64,
    pub confidence: f64,
    pub topic_boost: f64,
    pub final_score: f64,
}

const W_KEYWORD: f64 = 0.40;
const W_CATEGORY: f64 = 0.20;
const W_RECENCY: f64 = 0.15;
const W_FREQUENCY: f64 = 0.10;
const W_CONFIDENCE: f64 = 0.15;

/// 7-day half-life, expressed in seconds, for the recency exponential decay.
const RECENCY_HALF_LIFE_SECS: f64 = 7.0 * 24.0 * 3600.0;

/// Run the full retrieval pipeline and return the top `limit` results.
pub fn retrieve(
    store: &Store,
    session_id: Option<&str>,
    message: &str,
    topic: Option<&str>,
    limit: usize,
    candidate_ceiling: usize,
    now: f64,
) -> Result<Vec<ScoredMemory>> {
    let mut keywords = tokenize(message);
    if let Some(topic) = topic {
        for t in tokenize(topic) {
            if !keywords.contains(&t) {
                keywords.push(t);
            }
        }
    }
    let normalized = normalize_pronouns(&keywords);
    let normalized_distinct = normalized != keywords;

    let candidates = recall_candidates(
        store,
        session_id,
        &keywords,
        if normalized_distinct { Some(&normalized) } else { None },
        candidate_ceiling,
    )?;

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let max_access_count = candidates.iter().map(|c| c.access_count).max().unwrap_or(0);
    let topic_tokens: Vec<String> = topic.map(tokenize).unwrap_or_default();

    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .map(|entry| score_candidate(entry, &keywords, &topic_tokens, max_access_count, now))
        .collect();

    scored.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    let ids: Vec<String> = scored.iter().map(|s| s.entry.id.clone()).collect();
    for id in &ids {
        store.touch_memory_access(id)?;
    }

    Ok(scored)
}

/// Candidate recall merged in tier order, deduplicated by memory id,
/// stopping once `ceiling` candidates have been gathered.
fn recall_candidates(
    store: &Store,
    session_id: Option<&str>,
    keywords: &[String],
    normalized_keywords: Option<&[String]>,
    ceiling: usize,
) -> Result<Vec<MemoryEntryRow>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    let mut push_all = |rows: Vec<MemoryEntryRow>, out: &mut Vec<MemoryEntryRow>| {
        for row in rows {
            if out.len() >= ceiling {
                break;
            }
            if seen.insert(row.id.clone()) {
                out.push(row);
            }
        }
    };

    // Tier 1: FTS prefix-OR over original keywords.
    if out.len() < ceiling && !keywords.is_empty() {
        let rows = store.fts_prefix_search(keywords, ceiling - out.len())?;
        push_all(rows, &mut out);
    }

    // Tier 2: FTS over the normalized keyword set, only if it differs.
    if out.len() < ceiling {
        if let Some(normalized) = normalized_keywords {
            let query = normalized.join(" ");
            let rows = store.fts_match_search(&query, ceiling - out.len())?;
            push_all(rows, &mut out);
        }
    }

    // Tier 3: SQL LIKE over {key,value} for each keyword.
    if out.len() < ceiling {
        for kw in keywords {
            if out.len() >= ceiling {
                break;
            }
            let rows = store.like_search(session_id, kw, ceiling - out.len())?;
            push_all(rows, &mut out);
        }
    }

    // Tier 4: pronoun-normalized substring match.
    if out.len() < ceiling {
        for kw in keywords {
            if out.len() >= ceiling {
                break;
            }
            let normalized_kw = normalize_pronouns_in_text(kw);
            let rows = store.like_search(session_id, &normalized_kw, ceiling - out.len())?;
            push_all(rows, &mut out);
        }
    }

    Ok(out)
}

fn score_candidate(
    entry: MemoryEntryRow,
    keywords: &[String],
    topic_tokens: &[String],
    max_access_count: i64,
    now: f64,
) -> ScoredMemory {
    let keyword_score = keyword_score(keywords, &entry.key, &entry.value);
    let category_boost = category_boost(&entry.category);
    let recency_score = recency_score(entry.last_accessed, now);
    let frequency_score = frequency_score(entry.access_count, max_access_count);
    let confidence = entry.confidence.clamp(0.0, 1.0);
    let topic_boost = topic_boost(topic_tokens, &entry.key, &entry.value);

    let final_score = (W_KEYWORD * keyword_score
        + W_CATEGORY * category_boost
        + W_RECENCY * recency_score
        + W_FREQUENCY * frequency_score
        + W_CONFIDENCE * confidence)
        * topic_boost;

    ScoredMemory {
        entry,
        keyword_score,
        category_boost,
        recency_score,
        frequency_score,
        confidence,
        topic_boost,
        final_score,
    }
}

/// Average over keywords of the best match quality against the candidate's
/// tokenized `key`/`value` words (§4.D step 3).
fn keyword_score(keywords: &[String], key: &str, value: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let candidate_words: Vec<String> = tokenize(key).into_iter().chain(tokenize(value)).collect();
    if candidate_words.is_empty() {
        return 0.0;
    }

    let total: f64 = keywords
        .iter()
        .map(|kw| {
            let normalized_kw = normalize_pronouns(&[kw.clone()]);
            candidate_words
                .iter()
                .map(|cw| {
                    let normalized_cw = normalize_pronouns(&[cw.clone()]);
                    if kw == cw {
                        1.0
                    } else if normalized_kw == normalized_cw {
                        1.0
                    } else if cw.contains(kw.as_str()) || kw.contains(cw.as_str()) {
                        0.7
                    } else if char_overlap_ratio(kw, cw) >= 0.5 {
                        0.3
                    } else {
                        0.0
                    }
                })
                .fold(0.0_f64, f64::max)
        })
        .sum();

    (total / keywords.len() as f64).clamp(0.0, 1.0)
}

fn char_overlap_ratio(a: &str, b: &str) -> f64 {
    let a_chars: std::collections::HashSet<char> = a.chars().collect();
    let b_chars: std::collections::HashSet<char> = b.chars().collect();
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }
    let overlap = a_chars.intersection(&b_chars).count();
    let smaller = a_chars.len().min(b_chars.len());
    overlap as f64 / smaller as f64
}

fn category_boost(category: &str) -> f64 {
    match category {
        "preference" => 1.5,
        "fact" => 1.2,
        "pattern" => 1.0,
        _ => 1.0,
    }
}

fn recency_score(last_accessed: f64, now: f64) -> f64 {
    let age_secs = (now - last_accessed).max(0.0);
    (0.5_f64).powf(age_secs / RECENCY_HALF_LIFE_SECS).clamp(0.0, 1.0)
}

fn frequency_score(access_count: i64, max_access_count: i64) -> f64 {
    if max_access_count <= 1 {
        return 0.5;
    }
    (((access_count + 1) as f64).ln() / (((max_access_count + 1) as f64).ln())).clamp(0.0, 1.0)
}

fn topic_boost(topic_tokens: &[String], key: &str, value: &str) -> f64 {
    if topic_tokens.is_empty() {
        return 1.0;
    }
    let haystack = format!("{} {}", key.to_lowercase(), value.to_lowercase());
    if topic_tokens.iter().any(|t| haystack.contains(t.as_str())) {
        1.3
    } else {
        1.0
    }
}

/// Grouping of access-count bumps, kept here so callers don't reach into
/// `noetic-storage` directly for this retrieval-specific bookkeeping.
pub fn access_counts_by_id(scored: &[ScoredMemory]) -> HashMap<String, i64> {
    scored.iter().map(|s| (s.entry.id.clone(), s.entry.access_count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use noetic_storage::NewMemoryEntry;

    fn entry(session: &str, key: &str, value: &str, category: &str) -> NewMemoryEntry {
        NewMemoryEntry {
            session_id: Some(session.to_string()),
            category: category.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            confidence: 0.9,
            source: "user".into(),
            target_time: None,
            reminder_offset_minutes: None,
            repeat_type: None,
            plan_status: None,
        }
    }

    #[test]
    fn retrieves_matching_entry_by_keyword() {
        let store = Store::open_in_memory().unwrap();
        store.create_memory_entry(entry("s1", "favorite color", "blue")).unwrap();
        store.create_memory_entry(entry("s1", "hometown", "Seattle")).unwrap();

        let results = retrieve(&store, Some("s1"), "what is my favorite color", None, 5, 50, 1000.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.value, "blue");
        assert!(results[0].final_score > 0.0);
    }

    #[test]
    fn touches_access_count_after_retrieval() {
        let store = Store::open_in_memory().unwrap();
        let row = store.create_memory_entry(entry("s1", "favorite color", "blue")).unwrap();
        retrieve(&store, Some("s1"), "favorite color", None, 5, 50, 1000.0).unwrap();
        let refreshed = store.get_memory_entry(&row.id).unwrap().unwrap();
        assert_eq!(refreshed.access_count, 1);
    }

    #[test]
    fn preference_category_outranks_pattern_at_equal_keyword_match() {
        let store = Store::open_in_memory().unwrap();
        store.create_memory_entry(entry("s1", "likes tea", "yes", "preference")).unwrap();
        store.create_memory_entry(entry("s1", "likes tea", "yes", "pattern")).unwrap();

        let results = retrieve(&store, Some("s1"), "likes tea", None, 5, 50, 1000.0).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.category, "preference");
    }
}
