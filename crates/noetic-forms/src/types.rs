use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Number,
    Slider,
    Date,
    Datetime,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    Table,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormAction {
    Approve,
    Edit,
    Reject,
}

/// A dismissible visual display only ever accepts one action.
pub const DISPLAY_DISMISS_ACTION: &str = "dismiss";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub intent: String,
    #[serde(default)]
    pub memory_category: Option<String>,
    #[serde(default)]
    pub extra: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    Form { fields: Vec<FormField> },
    VisualDisplay { display_type: DisplayType, data: Value },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalStepRequest {
    pub id: String,
    pub session_id: String,
    pub title: String,
    pub kind: RequestKind,
    pub context: RequestContext,
    pub created_at: f64,
    pub expires_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    High,
    Medium,
    Low,
}

/// Thresholds lifted from `assess_form_complexity` in the source ECS
/// handler: High at >=5 fields or >=200 chars of content, Medium at >=3
/// fields or >=100 chars, Low otherwise.
pub fn assess_complexity(field_count: usize, content_len: usize) -> ComplexityLevel {
    if field_count >= 5 || content_len >= 200 {
        ComplexityLevel::High
    } else if field_count >= 3 || content_len >= 100 {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationContext {
    pub summary: String,
    pub complexity: Option<ComplexityLevel>,
    pub error: Option<String>,
}

impl ContinuationContext {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            summary: String::new(),
            complexity: None,
            error: Some(message.into()),
        }
    }

    pub fn ok(summary: impl Into<String>, complexity: ComplexityLevel) -> Self {
        Self {
            summary: summary.into(),
            complexity: Some(complexity),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_thresholds_match_field_count() {
        assert_eq!(assess_complexity(5, 10), ComplexityLevel::High);
        assert_eq!(assess_complexity(1, 250), ComplexityLevel::High);
        assert_eq!(assess_complexity(3, 10), ComplexityLevel::Medium);
        assert_eq!(assess_complexity(1, 10), ComplexityLevel::Low);
    }
}
