use crate::types::ExternalStepRequest;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory table of pending external-step requests, keyed by request id.
/// Mirrors the module-level dict + lock the source handlers use — a single
/// process-wide table, not per-session, since request ids are already
/// globally unique.
pub struct PendingFormTable {
    inner: Mutex<HashMap<String, ExternalStepRequest>>,
}

impl PendingFormTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self, request: ExternalStepRequest) {
        self.inner.lock().unwrap().insert(request.id.clone(), request);
    }

    /// Returns the request if present and not expired as of `now`. An
    /// expired entry is removed as a side effect of the lookup.
    pub fn get(&self, request_id: &str, now: f64) -> Option<ExternalStepRequest> {
        let mut table = self.inner.lock().unwrap();
        let expired = table
            .get(request_id)
            .map(|r| now > r.expires_at)
            .unwrap_or(false);
        if expired {
            table.remove(request_id);
            return None;
        }
        table.get(request_id).cloned()
    }

    pub fn remove(&self, request_id: &str) {
        self.inner.lock().unwrap().remove(request_id);
    }

    pub fn cleanup_expired(&self, now: f64) -> usize {
        let mut table = self.inner.lock().unwrap();
        let expired: Vec<String> = table
            .iter()
            .filter(|(_, r)| now > r.expires_at)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            table.remove(id);
        }
        expired.len()
    }
}

impl Default for PendingFormTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DisplayType, RequestContext, RequestKind};

    fn request(id: &str, expires_at: f64) -> ExternalStepRequest {
        ExternalStepRequest {
            id: id.to_string(),
            session_id: "s1".to_string(),
            title: "confirm".to_string(),
            kind: RequestKind::VisualDisplay {
                display_type: DisplayType::Table,
                data: serde_json::json!({}),
            },
            context: RequestContext::default(),
            created_at: 0.0,
            expires_at,
        }
    }

    #[test]
    fn expired_lookup_returns_none_and_evicts() {
        let table = PendingFormTable::new();
        table.store(request("a", 100.0));
        assert!(table.get("a", 200.0).is_none());
        assert!(table.get("a", 50.0).is_none());
    }

    #[test]
    fn fresh_lookup_returns_the_request() {
        let table = PendingFormTable::new();
        table.store(request("a", 100.0));
        assert!(table.get("a", 50.0).is_some());
    }

    #[test]
    fn cleanup_expired_removes_only_expired_entries() {
        let table = PendingFormTable::new();
        table.store(request("a", 100.0));
        table.store(request("b", 300.0));
        let removed = table.cleanup_expired(200.0);
        assert_eq!(removed, 1);
        assert!(table.get("b", 200.0).is_some());
    }
}
