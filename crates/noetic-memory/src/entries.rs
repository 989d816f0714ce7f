//! Long-term memory entry CRUD and size-bound eviction (§4.D "Long-term
//! memory" and "Eviction").

use crate::error::Result;
use noetic_storage::{MemoryEntryRow, NewMemoryEntry, Store};

pub fn create(store: &Store, entry: NewMemoryEntry) -> Result<MemoryEntryRow> {
    Ok(store.create_memory_entry(entry)?)
}

pub fn get(store: &Store, id: &str) -> Result<Option<MemoryEntryRow>> {
    Ok(store.get_memory_entry(id)?)
}

pub fn list_by_category(
    store: &Store,
    session_id: Option<&str>,
    category: &str,
    limit: usize,
) -> Result<Vec<MemoryEntryRow>> {
    Ok(store.list_memory_entries(session_id, Some(category), limit)?)
}

pub fn count(store: &Store, session_id: Option<&str>) -> Result<usize> {
    Ok(store.list_memory_entries(session_id, None, usize::MAX)?.len())
}

pub fn delete(store: &Store, id: &str) -> Result<()> {
    Ok(store.delete_memory_entry(id)?)
}

/// If the session's entry count exceeds `max`, delete the `(count - max)`
/// least valuable entries — ordered by confidence ascending, then
/// `last_accessed` ascending, so the weakest and stalest go first (§4.D).
pub fn evict_by_threshold(store: &Store, session_id: Option<&str>, max: usize) -> Result<usize> {
    let mut all = store.list_memory_entries(session_id, None, usize::MAX)?;
    if all.len() <= max {
        return Ok(0);
    }
    all.sort_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.last_accessed.partial_cmp(&b.last_accessed).unwrap_or(std::cmp::Ordering::Equal))
    });
    let evict_count = all.len() - max;
    for entry in all.into_iter().take(evict_count) {
        store.delete_memory_entry(&entry.id)?;
    }
    Ok(evict_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(confidence: f64) -> NewMemoryEntry {
        NewMemoryEntry {
            session_id: Some("s1".into()),
            category: "fact".into(),
            key: "k".into(),
            value: "v".into(),
            confidence,
            source: "user".into(),
            target_time: None,
            reminder_offset_minutes: None,
            repeat_type: None,
            plan_status: None,
        }
    }

    #[test]
    fn evict_by_threshold_removes_lowest_confidence_first() {
        let store = Store::open_in_memory().unwrap();
        let low = store.create_memory_entry(entry(0.1)).unwrap();
        store.create_memory_entry(entry(0.9)).unwrap();
        store.create_memory_entry(entry(0.5)).unwrap();

        let evicted = evict_by_threshold(&store, Some("s1"), 2).unwrap();
        assert_eq!(evicted, 1);
        assert!(store.get_memory_entry(&low.id).unwrap().is_none());
        assert_eq!(count(&store, Some("s1")).unwrap(), 2);
    }

    #[test]
    fn no_eviction_when_under_threshold() {
        let store = Store::open_in_memory().unwrap();
        store.create_memory_entry(entry(0.5)).unwrap();
        let evicted = evict_by_threshold(&store, Some("s1"), 10).unwrap();
        assert_eq!(evicted, 0);
    }
}
