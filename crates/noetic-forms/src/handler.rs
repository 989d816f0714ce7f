//! Form submission handling (§4.I "Form handler (external-step)").
//!
//! This is the point where a human's answer to a suspended turn turns into
//! memory writes and a continuation context the graph re-enters reasoning
//! with.

use crate::error::{FormError, Result};
use crate::pending::PendingFormTable;
use crate::types::{
    assess_complexity, ComplexityLevel, ContinuationContext, ExternalStepRequest, FormField,
    RequestKind,
};
use noetic_memory::working_memory::{self, WorkingMemoryUpdate};
use noetic_storage::{NewMemoryEntry, Store};
use serde_json::Value;

/// The action a user's `/answer` submission carries. `Dismiss` is the only
/// action a `VisualDisplay` request accepts (§4.I step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmittedAction {
    Approve,
    Edit,
    Reject,
    Dismiss,
}

/// What actually happened to the pending request, for the caller's log/trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationOutcome {
    MemoryWritten,
    Skipped,
    Dismissed,
    ValidationFailed,
}

/// Look up, validate, and act on a form/display submission (§4.I steps 1-5).
/// Returns the continuation context the graph feeds back into reasoning.
/// Errors (`ExpiredOrNotFound`, `SessionMismatch`) never mutate memory.
pub fn submit(
    store: &Store,
    pending: &PendingFormTable,
    request_id: &str,
    session_id: &str,
    action: SubmittedAction,
    data: &Value,
    now: f64,
) -> Result<(ContinuationContext, ContinuationOutcome)> {
    let request = pending
        .get(request_id, now)
        .ok_or(FormError::ExpiredOrNotFound)?;
    if request.session_id != session_id {
        return Err(FormError::SessionMismatch);
    }

    match &request.kind {
        RequestKind::VisualDisplay { .. } => handle_display(store, pending, &request, action),
        RequestKind::Form { fields } => handle_form(store, pending, &request, fields, action, data),
    }
}

fn handle_display(
    store: &Store,
    pending: &PendingFormTable,
    request: &ExternalStepRequest,
    action: SubmittedAction,
) -> Result<(ContinuationContext, ContinuationOutcome)> {
    if action != SubmittedAction::Dismiss {
        return Ok((
            ContinuationContext::error("visual display only accepts the dismiss action"),
            ContinuationOutcome::ValidationFailed,
        ));
    }
    persist_submission(store, &request.session_id, &request.title, &serde_json::json!({}), &[])?;
    pending.remove(&request.id);
    Ok((
        ContinuationContext::ok("display dismissed", ComplexityLevel::Low),
        ContinuationOutcome::Dismissed,
    ))
}

fn handle_form(
    store: &Store,
    pending: &PendingFormTable,
    request: &ExternalStepRequest,
    fields: &[FormField],
    action: SubmittedAction,
    data: &Value,
) -> Result<(ContinuationContext, ContinuationOutcome)> {
    if action == SubmittedAction::Reject {
        pending.remove(&request.id);
        return Ok((
            ContinuationContext::ok("user skipped the request", ComplexityLevel::Low),
            ContinuationOutcome::Skipped,
        ));
    }
    // Approve or Edit.
    if let Some(missing) = first_missing_required(fields, data) {
        return Ok((
            ContinuationContext::error(format!("missing required field {missing:?}")),
            ContinuationOutcome::ValidationFailed,
        ));
    }

    match request.context.intent.as_str() {
        "collect_preference" => write_preference_entries(store, &request.session_id, fields, data, &request.context.memory_category)?,
        "collect_plan" => {
            if let Some(missing) = first_missing_plan_field(data) {
                return Ok((
                    ContinuationContext::error(format!("missing required field {missing:?}")),
                    ContinuationOutcome::ValidationFailed,
                ));
            }
            write_plan_entry(store, &request.session_id, data)?;
        }
        "image_memory_confirm" | "image_plan_confirm" => {
            write_image_confirm(store, &request.session_id, data, &request.context.intent)?;
        }
        _ => {}
    }

    let labeled = labeled_submission(fields, data);
    persist_submission(store, &request.session_id, &request.title, &labeled, fields)?;
    pending.remove(&request.id);

    let content_len: usize = labeled
        .as_object()
        .map(|m| m.values().map(|v| v.to_string().len()).sum())
        .unwrap_or(0);
    let complexity = assess_complexity(fields.len(), content_len);
    Ok((
        ContinuationContext::ok("form approved with these fields", complexity),
        ContinuationOutcome::MemoryWritten,
    ))
}

fn first_missing_required(fields: &[FormField], data: &Value) -> Option<String> {
    let obj = data.as_object();
    fields.iter().find_map(|f| {
        if !f.required {
            return None;
        }
        let present = obj
            .and_then(|o| o.get(&f.name))
            .map(|v| !value_is_empty(v))
            .unwrap_or(false);
        if present {
            None
        } else {
            Some(f.label.clone())
        }
    })
}

fn first_missing_plan_field(data: &Value) -> Option<&'static str> {
    const REQUIRED: &[&str] = &["title", "target_datetime", "reminder_offset", "repeat_type"];
    REQUIRED.iter().copied().find(|key| {
        data.get(key).map(value_is_empty).unwrap_or(true)
    })
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Resolve a submitted raw value to its display form: for an option-backed
/// field this is the matching option's label; for a multiselect it's the
/// comma-joined resolved labels; otherwise the raw value's string form
/// (§4.I step 4: "chosen option label or raw value").
fn resolve_display_value(field: &FormField, raw: &Value) -> String {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_display_value(field, v))
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => field
            .options
            .iter()
            .find(|opt| &opt.value == s)
            .map(|opt| opt.label.clone())
            .unwrap_or_else(|| s.clone()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn write_preference_entries(
    store: &Store,
    session_id: &str,
    fields: &[FormField],
    data: &Value,
    memory_category: &Option<String>,
) -> Result<()> {
    let obj = data.as_object();
    let category = memory_category.clone().unwrap_or_else(|| "preference".to_string());
    for field in fields {
        let Some(raw) = obj.and_then(|o| o.get(&field.name)) else {
            continue;
        };
        if value_is_empty(raw) {
            continue;
        }
        let value = resolve_display_value(field, raw);
        store.create_memory_entry(NewMemoryEntry {
            session_id: Some(session_id.to_string()),
            category: category.clone(),
            key: field.label.clone(),
            value,
            confidence: 0.9,
            source: "ecs_form".to_string(),
            target_time: None,
            reminder_offset_minutes: None,
            repeat_type: None,
            plan_status: None,
        })?;
    }
    Ok(())
}

fn write_plan_entry(store: &Store, session_id: &str, data: &Value) -> Result<()> {
    let title = data.get("title").and_then(Value::as_str).unwrap_or_default();
    let description = data.get("description").and_then(Value::as_str).unwrap_or_default();
    let target_time = parse_datetime(data.get("target_datetime")).unwrap_or(0.0);
    let reminder_offset = data
        .get("reminder_offset")
        .and_then(Value::as_i64)
        .unwrap_or(10);
    let repeat_type = data
        .get("repeat_type")
        .and_then(Value::as_str)
        .unwrap_or("none")
        .to_string();

    noetic_memory::plans::create_plan(
        store,
        noetic_memory::NewPlan {
            session_id: Some(session_id.to_string()),
            title: title.to_string(),
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
            target_time,
            reminder_offset_minutes: reminder_offset,
            repeat_type,
        },
    )?;
    Ok(())
}

/// Image-driven confirmations (§4.I step 4) share the same write policy as
/// the preference/plan paths but are keyed by `{key, value, category,
/// target_time?, location?, participants?}` instead of a field list. If the
/// submitted `category` disagrees with the request's own intent, delegate
/// to whichever sibling handler the submitted category actually names.
fn write_image_confirm(store: &Store, session_id: &str, data: &Value, intent: &str) -> Result<()> {
    let submitted_category = data.get("category").and_then(Value::as_str).unwrap_or_default();
    let wants_plan = submitted_category == "plan" || intent == "image_plan_confirm" && submitted_category.is_empty();

    if wants_plan {
        let title = data.get("key").and_then(Value::as_str).unwrap_or_default();
        let mut description = data.get("value").and_then(Value::as_str).unwrap_or_default().to_string();
        if let Some(location) = data.get("location").and_then(Value::as_str) {
            description.push_str(&format!(" @ {location}"));
        }
        if let Some(participants) = data.get("participants").and_then(Value::as_str) {
            description.push_str(&format!(" with {participants}"));
        }
        let target_time = parse_datetime(data.get("target_time")).unwrap_or(0.0);
        noetic_memory::plans::create_plan(
            store,
            noetic_memory::NewPlan {
                session_id: Some(session_id.to_string()),
                title: title.to_string(),
                description: Some(description),
                target_time,
                reminder_offset_minutes: 10,
                repeat_type: "none".to_string(),
            },
        )?;
        return Ok(());
    }

    let category = if submitted_category.is_empty() {
        "fact".to_string()
    } else {
        submitted_category.to_string()
    };
    let key = data.get("key").and_then(Value::as_str).unwrap_or_default().to_string();
    let value = data.get("value").and_then(Value::as_str).unwrap_or_default().to_string();
    store.create_memory_entry(NewMemoryEntry {
        session_id: Some(session_id.to_string()),
        category,
        key,
        value,
        confidence: 0.9,
        source: "ecs_form".to_string(),
        target_time: None,
        reminder_offset_minutes: None,
        repeat_type: None,
        plan_status: None,
    })?;
    Ok(())
}

fn parse_datetime(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp() as f64),
        _ => None,
    }
}

/// Human-labeled `{label: display_value}` object for replay, plus the raw
/// field definitions so a future turn can reconstruct the original form
/// (§4.I step 4: "storing both the human-labeled data and the full field
/// definition").
fn labeled_submission(fields: &[FormField], data: &Value) -> Value {
    let obj = data.as_object();
    let mut labeled = serde_json::Map::new();
    for field in fields {
        if let Some(raw) = obj.and_then(|o| o.get(&field.name)) {
            labeled.insert(field.label.clone(), Value::String(resolve_display_value(field, raw)));
        }
    }
    serde_json::json!({
        "values": labeled,
        "fields": fields,
    })
}

/// Persist a submission into working memory under a key derived from the
/// request title. Sibling-key eviction under the 64 KiB bound is already
/// performed by `noetic_memory::working_memory::update` (§3 invariant) —
/// there is only one `context_variables` map, so evicting the oldest other
/// entries there *is* evicting the oldest sibling form-response keys.
fn persist_submission(
    store: &Store,
    session_id: &str,
    title: &str,
    payload: &Value,
    _fields: &[FormField],
) -> Result<()> {
    let key = format!("form_response:{title}");
    working_memory::update(
        store,
        session_id,
        WorkingMemoryUpdate {
            new_variable: Some((key, payload.clone())),
            ..Default::default()
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldOption, FieldType, RequestContext};

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn field(name: &str, label: &str, required: bool) -> FormField {
        FormField {
            name: name.to_string(),
            field_type: FieldType::Text,
            label: label.to_string(),
            required,
            placeholder: None,
            default: None,
            options: vec![],
            min: None,
            max: None,
            step: None,
        }
    }

    fn multiselect_field(name: &str, label: &str, options: &[(&str, &str)]) -> FormField {
        FormField {
            name: name.to_string(),
            field_type: FieldType::Multiselect,
            label: label.to_string(),
            required: false,
            placeholder: None,
            default: None,
            options: options
                .iter()
                .map(|(v, l)| FieldOption {
                    value: v.to_string(),
                    label: l.to_string(),
                })
                .collect(),
            min: None,
            max: None,
            step: None,
        }
    }

    fn preference_request(id: &str, session_id: &str) -> ExternalStepRequest {
        ExternalStepRequest {
            id: id.to_string(),
            session_id: session_id.to_string(),
            title: "认识你".to_string(),
            kind: RequestKind::Form {
                fields: vec![
                    field("name", "怎么称呼你", false),
                    multiselect_field(
                        "interests",
                        "你感兴趣的话题",
                        &[("tech", "科技"), ("music", "音乐")],
                    ),
                ],
            },
            context: RequestContext {
                intent: "collect_preference".to_string(),
                memory_category: None,
                extra: Value::Null,
            },
            created_at: 0.0,
            expires_at: 1000.0,
        }
    }

    #[test]
    fn approve_writes_one_entry_per_non_empty_field() {
        let store = store();
        let pending = PendingFormTable::new();
        pending.store(preference_request("r1", "s1"));

        let data = serde_json::json!({"name": "小明", "interests": ["tech", "music"]});
        let (ctx, outcome) = submit(&store, &pending, "r1", "s1", SubmittedAction::Approve, &data, 0.0).unwrap();
        assert_eq!(outcome, ContinuationOutcome::MemoryWritten);
        assert!(ctx.error.is_none());

        let entries = store.list_memory_entries(Some("s1"), Some("preference"), 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.key == "怎么称呼你" && e.value == "小明"));
        assert!(entries.iter().any(|e| e.key == "你感兴趣的话题" && e.value == "科技, 音乐"));
    }

    #[test]
    fn reject_removes_pending_without_writing_memory() {
        let store = store();
        let pending = PendingFormTable::new();
        pending.store(preference_request("r1", "s1"));

        let (_, outcome) = submit(&store, &pending, "r1", "s1", SubmittedAction::Reject, &Value::Null, 0.0).unwrap();
        assert_eq!(outcome, ContinuationOutcome::Skipped);
        assert_eq!(store.list_memory_entries(Some("s1"), None, 10).unwrap().len(), 0);
        assert!(pending.get("r1", 0.0).is_none());
    }

    #[test]
    fn second_submission_to_same_id_is_expired_or_not_found() {
        let store = store();
        let pending = PendingFormTable::new();
        pending.store(preference_request("r1", "s1"));

        let data = serde_json::json!({});
        submit(&store, &pending, "r1", "s1", SubmittedAction::Approve, &data, 0.0).unwrap();
        let second = submit(&store, &pending, "r1", "s1", SubmittedAction::Approve, &data, 0.0);
        assert!(matches!(second, Err(FormError::ExpiredOrNotFound)));
    }

    #[test]
    fn session_mismatch_is_rejected_without_writes() {
        let store = store();
        let pending = PendingFormTable::new();
        pending.store(preference_request("r1", "s1"));

        let data = serde_json::json!({"name": "x"});
        let err = submit(&store, &pending, "r1", "s2", SubmittedAction::Approve, &data, 0.0).unwrap_err();
        assert!(matches!(err, FormError::SessionMismatch));
        assert_eq!(store.list_memory_entries(Some("s1"), None, 10).unwrap().len(), 0);
        assert!(pending.get("r1", 0.0).is_some());
    }

    #[test]
    fn missing_required_field_returns_continue_with_error() {
        let store = store();
        let pending = PendingFormTable::new();
        let mut request = preference_request("r1", "s1");
        if let RequestKind::Form { fields } = &mut request.kind {
            fields[0].required = true;
        }
        pending.store(request);

        let data = serde_json::json!({"interests": ["tech"]});
        let (ctx, outcome) = submit(&store, &pending, "r1", "s1", SubmittedAction::Approve, &data, 0.0).unwrap();
        assert_eq!(outcome, ContinuationOutcome::ValidationFailed);
        assert!(ctx.error.is_some());
        assert!(pending.get("r1", 0.0).is_some(), "invalid submission must not consume the pending request");
    }

    #[test]
    fn plan_intent_creates_pending_plan_entry() {
        let store = store();
        let pending = PendingFormTable::new();
        let request = ExternalStepRequest {
            id: "r2".to_string(),
            session_id: "s1".to_string(),
            title: "plan a meeting".to_string(),
            kind: RequestKind::Form {
                fields: vec![
                    field("title", "Title", true),
                    field("target_datetime", "When", true),
                    field("reminder_offset", "Offset", true),
                    field("repeat_type", "Repeat", true),
                ],
            },
            context: RequestContext {
                intent: "collect_plan".to_string(),
                memory_category: None,
                extra: Value::Null,
            },
            created_at: 0.0,
            expires_at: 1000.0,
        };
        pending.store(request);

        let data = serde_json::json!({
            "title": "开会",
            "target_datetime": "2026-07-27T15:00:00Z",
            "reminder_offset": 10,
            "repeat_type": "none",
        });
        let (_, outcome) = submit(&store, &pending, "r2", "s1", SubmittedAction::Approve, &data, 0.0).unwrap();
        assert_eq!(outcome, ContinuationOutcome::MemoryWritten);

        let plans = store.list_memory_entries(Some("s1"), Some("plan"), 10).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].key, "开会");
        assert_eq!(plans[0].plan_status.as_deref(), Some("pending"));
    }

    #[test]
    fn dismiss_is_the_only_action_a_display_accepts() {
        let store = store();
        let pending = PendingFormTable::new();
        let request = ExternalStepRequest {
            id: "r3".to_string(),
            session_id: "s1".to_string(),
            title: "今日概览".to_string(),
            kind: RequestKind::VisualDisplay {
                display_type: crate::types::DisplayType::Table,
                data: serde_json::json!({"rows": []}),
            },
            context: RequestContext::default(),
            created_at: 0.0,
            expires_at: 1000.0,
        };
        pending.store(request);

        let rejected = submit(&store, &pending, "r3", "s1", SubmittedAction::Approve, &Value::Null, 0.0).unwrap();
        assert_eq!(rejected.1, ContinuationOutcome::ValidationFailed);
        assert!(pending.get("r3", 0.0).is_some());

        let dismissed = submit(&store, &pending, "r3", "s1", SubmittedAction::Dismiss, &Value::Null, 0.0).unwrap();
        assert_eq!(dismissed.1, ContinuationOutcome::Dismissed);
        assert!(pending.get("r3", 0.0).is_none());
    }
}
