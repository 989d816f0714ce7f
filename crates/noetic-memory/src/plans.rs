//! Plan operations (§4.D "Plan operations"): long-term memory entries with
//! `category = "plan"` plus the time-specific fields.

use crate::error::{MemoryError, Result};
use chrono::{DateTime, Days, Months, Utc};
use noetic_storage::{MemoryEntryRow, NewMemoryEntry, Store};

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub session_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub target_time: f64,
    pub reminder_offset_minutes: i64,
    pub repeat_type: String,
}

pub fn create_plan(store: &Store, plan: NewPlan) -> Result<MemoryEntryRow> {
    let entry = NewMemoryEntry {
        session_id: plan.session_id,
        category: "plan".to_string(),
        key: plan.title,
        value: plan.description.unwrap_or_default(),
        confidence: 1.0,
        source: "plan".to_string(),
        target_time: Some(plan.target_time),
        reminder_offset_minutes: Some(plan.reminder_offset_minutes),
        repeat_type: Some(plan.repeat_type),
        plan_status: Some("pending".to_string()),
    };
    Ok(store.create_memory_entry(entry)?)
}

/// Plans whose `target_time - reminder_offset <= now`, pending, not
/// snoozed past `now`. `noetic-storage::get_due_plans` already applies this
/// predicate in SQL; the filter here is a defense-in-depth re-check against
/// the same arithmetic, not a separate narrowing.
pub fn get_due_plans(store: &Store, session_id: Option<&str>, now: f64, limit: usize) -> Result<Vec<MemoryEntryRow>> {
    let rows = store.get_due_plans(session_id, now)?;
    let mut due: Vec<MemoryEntryRow> = rows
        .into_iter()
        .filter(|row| {
            let offset_secs = row.reminder_offset_minutes.unwrap_or(0) as f64 * 60.0;
            let target = row.target_time.unwrap_or(f64::MAX);
            target - offset_secs <= now
        })
        .collect();
    due.truncate(limit);
    Ok(due)
}

/// Mark `plan_id` completed; if it repeats, create the next occurrence with
/// a month-end-safe increment.
pub fn complete_plan(store: &Store, plan_id: &str) -> Result<MemoryEntryRow> {
    let plan = store
        .get_memory_entry(plan_id)?
        .ok_or_else(|| MemoryError::PlanNotFound(plan_id.to_string()))?;
    if plan.plan_status.as_deref() != Some("pending") {
        return Err(MemoryError::PlanNotPending(plan_id.to_string()));
    }

    let updated = store.update_memory_entry(plan_id, None, None, Some("completed".to_string()), None)?;

    let repeat_type = plan.repeat_type.clone().unwrap_or_else(|| "none".to_string());
    if repeat_type != "none" {
        if let Some(target_time) = plan.target_time {
            if let Some(next_time) = next_occurrence(target_time, &repeat_type) {
                create_plan(
                    store,
                    NewPlan {
                        session_id: plan.session_id.clone(),
                        title: plan.key.clone(),
                        description: Some(plan.value.clone()),
                        target_time: next_time,
                        reminder_offset_minutes: plan.reminder_offset_minutes.unwrap_or(10),
                        repeat_type,
                    },
                )?;
            }
        }
    }

    Ok(updated)
}

pub fn dismiss_plan(store: &Store, plan_id: &str) -> Result<MemoryEntryRow> {
    store
        .get_memory_entry(plan_id)?
        .ok_or_else(|| MemoryError::PlanNotFound(plan_id.to_string()))?;
    Ok(store.update_memory_entry(plan_id, None, None, Some("dismissed".to_string()), None)?)
}

pub fn snooze_plan(store: &Store, plan_id: &str, minutes: i64, now: f64) -> Result<MemoryEntryRow> {
    store
        .get_memory_entry(plan_id)?
        .ok_or_else(|| MemoryError::PlanNotFound(plan_id.to_string()))?;
    let snooze_until = now + (minutes as f64 * 60.0);
    Ok(store.update_memory_entry(plan_id, None, None, None, Some(snooze_until))?)
}

/// `+1 day`, `+1 week`, or `+1 month` (month-end-safe via `chrono::Months`)
/// from `target_time` (unix seconds).
fn next_occurrence(target_time_secs: f64, repeat_type: &str) -> Option<f64> {
    let dt = DateTime::<Utc>::from_timestamp(target_time_secs as i64, 0)?;
    let next = match repeat_type {
        "daily" => dt.checked_add_days(Days::new(1))?,
        "weekly" => dt.checked_add_days(Days::new(7))?,
        "monthly" => dt.checked_add_months(Months::new(1))?,
        _ => return None,
    };
    Some(next.timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_plan(target_time: f64, repeat_type: &str) -> NewPlan {
        NewPlan {
            session_id: Some("s1".into()),
            title: "water the plants".into(),
            description: None,
            target_time,
            reminder_offset_minutes: 10,
            repeat_type: repeat_type.into(),
        }
    }

    #[test]
    fn due_plan_respects_reminder_offset() {
        let store = Store::open_in_memory().unwrap();
        create_plan(&store, new_plan(1000.0, "none")).unwrap();

        // 10-minute offset means the plan becomes due 600s before target.
        let not_yet_due = get_due_plans(&store, Some("s1"), 300.0, 10).unwrap();
        assert!(not_yet_due.is_empty());

        let due = get_due_plans(&store, Some("s1"), 450.0, 10).unwrap();
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn completing_a_repeating_plan_creates_next_occurrence() {
        let store = Store::open_in_memory().unwrap();
        let plan = create_plan(&store, new_plan(1000.0, "daily")).unwrap();
        complete_plan(&store, &plan.id).unwrap();

        let all = store.list_memory_entries(Some("s1"), Some("plan"), 10).unwrap();
        assert_eq!(all.len(), 2);
        let pending: Vec<_> = all.iter().filter(|p| p.plan_status.as_deref() == Some("pending")).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].target_time, Some(1000.0 + 86400.0));
    }

    #[test]
    fn snooze_delays_due_check() {
        let store = Store::open_in_memory().unwrap();
        let plan = create_plan(&store, new_plan(100.0, "none")).unwrap();
        snooze_plan(&store, &plan.id, 60, 100.0).unwrap();

        let due = get_due_plans(&store, Some("s1"), 100.0, 10).unwrap();
        assert!(due.is_empty());
    }
}
