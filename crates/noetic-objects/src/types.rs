use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveObjectStatus {
    Emerging,
    Active,
    Waiting,
    Blocked,
    Stable,
    Archived,
}

impl CognitiveObjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emerging => "emerging",
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Blocked => "blocked",
            Self::Stable => "stable",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "emerging" => Some(Self::Emerging),
            "active" => Some(Self::Active),
            "waiting" => Some(Self::Waiting),
            "blocked" => Some(Self::Blocked),
            "stable" => Some(Self::Stable),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn is_active_like(self) -> bool {
        !matches!(self, Self::Archived)
    }
}

impl fmt::Display for CognitiveObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: String,
    pub to: String,
    pub trigger: String,
    pub actor: String,
    pub reason: Option<String>,
    pub at: f64,
}

/// Domain-level view of a cognitive object — the storage row's JSON text
/// columns parsed into real types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveObject {
    pub co_id: String,
    pub title: String,
    pub description: String,
    pub semantic_type: Option<String>,
    pub domain_tag: Option<String>,
    pub intent_category: Option<String>,
    pub status: CognitiveObjectStatus,
    pub transitions: Vec<TransitionRecord>,
    pub external_references: Vec<String>,
    pub related_co_ids: Vec<String>,
    pub linked_memory_ids: Vec<String>,
    pub linked_execution_ids: Vec<String>,
    pub created_by: String,
    pub conversation_id: Option<String>,
    pub creation_context: Option<String>,
    pub created_at: f64,
    pub updated_at: f64,
}

impl CognitiveObject {
    pub(crate) fn from_row(row: noetic_storage::CognitiveObjectRow) -> crate::error::Result<Self> {
        Ok(Self {
            status: CognitiveObjectStatus::parse(&row.status)
                .unwrap_or(CognitiveObjectStatus::Emerging),
            transitions: serde_json::from_str(&row.transitions).unwrap_or_default(),
            external_references: serde_json::from_str(&row.external_references).unwrap_or_default(),
            related_co_ids: serde_json::from_str(&row.related_co_ids).unwrap_or_default(),
            linked_memory_ids: serde_json::from_str(&row.linked_memory_ids).unwrap_or_default(),
            linked_execution_ids: row.linked_execution_ids,
            co_id: row.co_id,
            title: row.title,
            description: row.description,
            semantic_type: row.semantic_type,
            domain_tag: row.domain_tag,
            intent_category: row.intent_category,
            created_by: row.created_by,
            conversation_id: row.conversation_id,
            creation_context: row.creation_context,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
