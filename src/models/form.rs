use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::repository::Entity;

/// Input type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Url,
    Phone,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
    Rating,
}

impl FieldKind {
    /// Kinds whose answers must come from the field's option list.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio)
    }
}

/// Validation rules attached to a single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression the whole answer must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Key of this field in the submitted answer map.
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub validation: ValidationRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSettings {
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
    #[serde(default = "default_success_message")]
    pub success_message: String,
    /// Address notified on each submission.
    #[serde(default)]
    pub notify_email: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_submit_label() -> String {
    "Submit".to_string()
}

fn default_success_message() -> String {
    "Thank you! Your response has been recorded.".to_string()
}

fn default_active() -> bool {
    true
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            submit_label: default_submit_label(),
            success_message: default_success_message(),
            notify_email: None,
            is_active: true,
        }
    }
}

/// A declarative form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Rendered in this order.
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub settings: FormSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Form {
    const COLLECTION: &'static str = "forms";
    const UNIQUE_FIELDS: &'static [&'static str] = &["slug"];

    fn id(&self) -> &str {
        &self.id
    }
}

/// Validated answers for a form. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    #[serde(rename = "_id")]
    pub id: String,
    pub form_id: String,
    pub answers: BTreeMap<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

impl Entity for FormSubmission {
    const COLLECTION: &'static str = "form_submissions";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewForm {
    #[serde(default)]
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub settings: FormSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FormField>>,
    /// Merged into the stored settings; absent keys keep their values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<FormSettingsPatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    /// A blank address turns notifications off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub answers: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_deserialization_defaults() {
        let json = r#"{ "id": "name", "label": "Name", "kind": "text" }"#;
        let field: FormField = serde_json::from_str(json).unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert!(!field.validation.required);
        assert!(field.options.is_empty());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: FormSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.submit_label, "Submit");
        assert!(settings.is_active);
        assert!(settings.notify_email.is_none());
    }

    #[test]
    fn test_choice_kinds() {
        assert!(FieldKind::Select.is_choice());
        assert!(FieldKind::Radio.is_choice());
        assert!(!FieldKind::Checkbox.is_choice());
    }
}
