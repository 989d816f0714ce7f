use crate::error::{ObjectsError, Result};
use crate::types::{CognitiveObject, CognitiveObjectStatus};
use noetic_storage::{NewCognitiveObject, Store};
use std::sync::Arc;
use tracing::instrument;

/// Durable cross-session registry of `CognitiveObject`s. Lifecycle is
/// independent of any `ExecutionContract`; a CO outlives every contract
/// linked to it (§3).
pub struct CoRegistry {
    store: Arc<Store>,
}

impl CoRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, new))]
    pub fn create(&self, new: NewCognitiveObject) -> Result<CognitiveObject> {
        let row = self.store.create_cognitive_object(new)?;
        CognitiveObject::from_row(row)
    }

    #[instrument(skip(self))]
    pub fn get(&self, co_id: &str) -> Result<Option<CognitiveObject>> {
        self.store
            .get_cognitive_object(co_id)?
            .map(CognitiveObject::from_row)
            .transpose()
    }

    /// Excludes `archived` (§4.C).
    #[instrument(skip(self))]
    pub fn list_active(&self, limit: usize) -> Result<Vec<CognitiveObject>> {
        self.store
            .list_active_cognitive_objects(limit)?
            .into_iter()
            .map(CognitiveObject::from_row)
            .collect()
    }

    #[instrument(skip(self))]
    pub fn list_by_status(&self, status: CognitiveObjectStatus, limit: usize) -> Result<Vec<CognitiveObject>> {
        self.store
            .list_cognitive_objects_by_status(status.as_str(), limit)?
            .into_iter()
            .map(CognitiveObject::from_row)
            .collect()
    }

    /// Applies `trigger` from the CO's current status, persists the record
    /// with `actor`/`reason`, and returns the updated object. Fails without
    /// any write if `trigger` is not valid from the current status.
    #[instrument(skip(self, reason))]
    pub fn transition(
        &self,
        co_id: &str,
        trigger: &str,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<CognitiveObject> {
        let current = self
            .get(co_id)?
            .ok_or_else(|| ObjectsError::Storage(noetic_storage::StorageError::NotFound(co_id.to_string())))?;

        let next = next_status(current.status, trigger).ok_or_else(|| ObjectsError::InvalidTransition {
            trigger: trigger.to_string(),
            from: current.status.to_string(),
        })?;

        let row = self
            .store
            .transition_cognitive_object(co_id, next.as_str(), trigger, actor, reason)?;
        CognitiveObject::from_row(row)
    }

    #[instrument(skip(self))]
    pub fn link_execution(&self, co_id: &str, execution_id: &str) -> Result<()> {
        Ok(self.store.link_execution(co_id, execution_id)?)
    }

    #[instrument(skip(self))]
    pub fn link_memory(&self, co_id: &str, memory_id: &str) -> Result<()> {
        Ok(self.store.link_memory(co_id, memory_id)?)
    }

    #[instrument(skip(self, description))]
    pub fn update_metadata(
        &self,
        co_id: &str,
        description: Option<String>,
        domain_tag: Option<String>,
    ) -> Result<CognitiveObject> {
        let row = self.store.update_cognitive_object_metadata(co_id, description, domain_tag)?;
        CognitiveObject::from_row(row)
    }

    #[instrument(skip(self))]
    pub fn search(&self, substring: &str, limit: usize) -> Result<Vec<CognitiveObject>> {
        self.store
            .search_cognitive_objects(substring, limit)?
            .into_iter()
            .map(CognitiveObject::from_row)
            .collect()
    }
}

/// The 6-state graph (§4.C). `archived` is reachable from every other state
/// via `archive`, and is the only state with a return edge (`reactivate`).
/// A `match`, mirroring `noetic-contracts`'s table, so the graph and the
/// code that walks it can't drift apart.
fn next_status(from: CognitiveObjectStatus, trigger: &str) -> Option<CognitiveObjectStatus> {
    use CognitiveObjectStatus::*;
    match (from, trigger) {
        (Emerging, "begin_work") => Some(Active),
        (Emerging, "archive") => Some(Archived),

        (Active, "await_input") => Some(Waiting),
        (Active, "block") => Some(Blocked),
        (Active, "stabilize") => Some(Stable),
        (Active, "archive") => Some(Archived),

        (Waiting, "resume") => Some(Active),
        (Waiting, "block") => Some(Blocked),
        (Waiting, "archive") => Some(Archived),

        (Blocked, "unblock") => Some(Active),
        (Blocked, "archive") => Some(Archived),

        (Stable, "revisit") => Some(Active),
        (Stable, "archive") => Some(Archived),

        (Archived, "reactivate") => Some(Active),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CoRegistry {
        CoRegistry::new(Arc::new(Store::open_in_memory().unwrap()))
    }

    fn new_co() -> NewCognitiveObject {
        NewCognitiveObject {
            title: "plan the trip".into(),
            description: String::new(),
            semantic_type: Some("goal".into()),
            domain_tag: None,
            intent_category: None,
            created_by: "user".into(),
            conversation_id: Some("s1".into()),
            creation_context: None,
        }
    }

    #[test]
    fn full_lifecycle_through_archive_and_reactivate() {
        let reg = registry();
        let co = reg.create(new_co()).unwrap();
        assert_eq!(co.status, CognitiveObjectStatus::Emerging);

        let co = reg.transition(&co.co_id, "begin_work", "user", None).unwrap();
        assert_eq!(co.status, CognitiveObjectStatus::Active);

        let co = reg.transition(&co.co_id, "stabilize", "system", Some("idle")).unwrap();
        assert_eq!(co.status, CognitiveObjectStatus::Stable);

        let co = reg.transition(&co.co_id, "archive", "user", None).unwrap();
        assert_eq!(co.status, CognitiveObjectStatus::Archived);

        let co = reg.transition(&co.co_id, "reactivate", "user", None).unwrap();
        assert_eq!(co.status, CognitiveObjectStatus::Active);
    }

    #[test]
    fn invalid_trigger_is_rejected_without_mutation() {
        let reg = registry();
        let co = reg.create(new_co()).unwrap();
        let err = reg.transition(&co.co_id, "reactivate", "user", None).unwrap_err();
        assert!(matches!(err, ObjectsError::InvalidTransition { .. }));
        let still = reg.get(&co.co_id).unwrap().unwrap();
        assert_eq!(still.status, CognitiveObjectStatus::Emerging);
    }

    #[test]
    fn list_active_excludes_archived() {
        let reg = registry();
        let co = reg.create(new_co()).unwrap();
        reg.transition(&co.co_id, "begin_work", "user", None).unwrap();
        reg.transition(&co.co_id, "archive", "user", None).unwrap();

        let active = reg.list_active(10).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn search_matches_title_substring() {
        let reg = registry();
        reg.create(new_co()).unwrap();
        let found = reg.search("trip", 10).unwrap();
        assert_eq!(found.len(), 1);
    }
}
