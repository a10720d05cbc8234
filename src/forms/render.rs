use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::form::{FieldKind, Form, FormField};
use crate::models::testimonial::MAX_RATING;

/// Client-facing description of one input, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedField {
    pub id: String,
    pub label: String,
    /// Widget to use: an HTML input type, `textarea`, `select` or `rating`.
    pub input_type: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<String>,
    /// Constraint attributes mirroring the server-side rules
    /// (`minlength`, `maxlength`, `pattern`, `min`, `max`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, Value>,
}

/// What a client needs to draw and submit a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedForm {
    pub form_id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub submit_label: String,
    pub success_message: String,
    /// Where answers keyed by field id are posted.
    pub action: String,
    pub fields: Vec<RenderedField>,
}

fn input_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Textarea => "textarea",
        FieldKind::Email => "email",
        FieldKind::Url => "url",
        FieldKind::Phone => "tel",
        FieldKind::Number => "number",
        FieldKind::Date => "date",
        FieldKind::Select => "select",
        FieldKind::Radio => "radio",
        FieldKind::Checkbox => "checkbox",
        FieldKind::Rating => "rating",
    }
}

fn render_field(field: &FormField) -> RenderedField {
    let rules = &field.validation;
    let mut attributes = BTreeMap::new();

    if let Some(min) = rules.min_length {
        attributes.insert("minlength".to_string(), Value::from(min));
    }
    if let Some(max) = rules.max_length {
        attributes.insert("maxlength".to_string(), Value::from(max));
    }
    if let Some(pattern) = &rules.pattern {
        attributes.insert("pattern".to_string(), Value::from(pattern.clone()));
    }

    match field.kind {
        FieldKind::Rating => {
            attributes.insert("min".to_string(), Value::from(rules.min.unwrap_or(1.0)));
            attributes.insert(
                "max".to_string(),
                Value::from(rules.max.unwrap_or(f64::from(MAX_RATING))),
            );
        }
        _ => {
            if let Some(min) = rules.min {
                attributes.insert("min".to_string(), Value::from(min));
            }
            if let Some(max) = rules.max {
                attributes.insert("max".to_string(), Value::from(max));
            }
        }
    }

    RenderedField {
        id: field.id.clone(),
        label: field.label.clone(),
        input_type: input_type(field.kind).to_string(),
        required: rules.required,
        placeholder: field.placeholder.clone(),
        help_text: field.help_text.clone(),
        options: field.options.clone(),
        attributes,
    }
}

pub fn render_form(form: &Form) -> RenderedForm {
    RenderedForm {
        form_id: form.id.clone(),
        slug: form.slug.clone(),
        title: form.title.clone(),
        description: form.description.clone(),
        submit_label: form.settings.submit_label.clone(),
        success_message: form.settings.success_message.clone(),
        action: format!("/api/forms/{}/submissions", form.slug),
        fields: form.fields.iter().map(render_field).collect(),
    }
}
