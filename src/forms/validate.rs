use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, FieldError};
use crate::models::form::{FieldKind, Form, FormField};
use crate::models::testimonial::MAX_RATING;
use crate::models::validation::{is_valid_email, is_valid_phone, is_valid_url, Checks};

/// Compile a field pattern anchored to the whole answer, like the HTML
/// `pattern` attribute.
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Check that a form definition is internally consistent.
pub fn validate_definition(fields: &[FormField]) -> Result<(), AppError> {
    let mut checks = Checks::new();
    let mut seen = HashSet::new();

    if fields.is_empty() {
        checks.fail("fields", "a form needs at least one field");
    }

    for (index, field) in fields.iter().enumerate() {
        let path = format!("fields[{index}]");
        let rules = &field.validation;

        if field.id.trim().is_empty() {
            checks.fail(&format!("{path}.id"), "is required");
        } else if !seen.insert(field.id.as_str()) {
            checks.fail(&format!("{path}.id"), "duplicates another field id");
        }
        if field.label.trim().is_empty() {
            checks.fail(&format!("{path}.label"), "is required");
        }
        if field.kind.is_choice() && field.options.is_empty() {
            checks.fail(&format!("{path}.options"), "choice fields need at least one option");
        }
        if let Some(pattern) = &rules.pattern {
            if compile_pattern(pattern).is_err() {
                checks.fail(&format!("{path}.validation.pattern"), "is not a valid regular expression");
            }
        }
        if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
            if min > max {
                checks.fail(&format!("{path}.validation"), "min_length must not exceed max_length");
            }
        }
        if let (Some(min), Some(max)) = (rules.min, rules.max) {
            if min > max {
                checks.fail(&format!("{path}.validation"), "min must not exceed max");
            }
        }
    }

    checks.finish()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Validate submitted answers against the form schema.
///
/// Returns the answers restricted to known field ids, in schema order, or
/// a `Validation` error naming every field that failed.
pub fn validate_answers(
    form: &Form,
    answers: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, AppError> {
    let mut errors = Vec::new();
    let mut accepted = BTreeMap::new();

    for field in &form.fields {
        match answers.get(&field.id) {
            Some(value) if !is_blank(value) => match check_answer(field, value) {
                Ok(()) => {
                    accepted.insert(field.id.clone(), value.clone());
                }
                Err(message) => errors.push(FieldError::new(&field.id, message)),
            },
            _ => {
                if field.validation.required {
                    errors.push(FieldError::new(&field.id, "is required"));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn check_answer(field: &FormField, value: &Value) -> Result<(), String> {
    let rules = &field.validation;

    match field.kind {
        FieldKind::Text
        | FieldKind::Textarea
        | FieldKind::Email
        | FieldKind::Url
        | FieldKind::Phone
        | FieldKind::Date => {
            let text = value.as_str().ok_or("must be text")?;
            check_length(text.chars().count(), rules.min_length, rules.max_length)?;

            match field.kind {
                FieldKind::Email if !is_valid_email(text) => {
                    return Err("must be a valid email address".into())
                }
                FieldKind::Url if !is_valid_url(text) => return Err("must be a valid URL".into()),
                FieldKind::Phone if !is_valid_phone(text) => {
                    return Err("must be a valid phone number".into())
                }
                FieldKind::Date
                    if chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() =>
                {
                    return Err("must be a date formatted as YYYY-MM-DD".into())
                }
                _ => {}
            }

            if let Some(pattern) = &rules.pattern {
                let re = compile_pattern(pattern).map_err(|_| "has an invalid pattern")?;
                if !re.is_match(text) {
                    return Err("does not match the expected format".into());
                }
            }
            Ok(())
        }
        FieldKind::Number => {
            let number = value.as_f64().ok_or("must be a number")?;
            check_range(number, rules.min, rules.max)
        }
        FieldKind::Rating => {
            let rating = value
                .as_i64()
                .ok_or("must be a whole number")?;
            let min = rules.min.unwrap_or(1.0);
            let max = rules.max.unwrap_or(f64::from(MAX_RATING));
            check_range(rating as f64, Some(min), Some(max))
        }
        FieldKind::Select | FieldKind::Radio => {
            let choice = value.as_str().ok_or("must be one of the listed options")?;
            if field.options.iter().any(|o| o == choice) {
                Ok(())
            } else {
                Err("must be one of the listed options".into())
            }
        }
        FieldKind::Checkbox => match value {
            Value::Bool(_) => Ok(()),
            Value::Array(items) => {
                let all_known = items.iter().all(|item| {
                    item.as_str()
                        .is_some_and(|s| field.options.is_empty() || field.options.iter().any(|o| o == s))
                });
                if !all_known {
                    return Err("contains an unknown option".into());
                }
                check_length(items.len(), rules.min_length, rules.max_length)
            }
            _ => Err("must be a boolean or a list of options".into()),
        },
    }
}

fn check_length(len: usize, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
    if let Some(min) = min {
        if len < min {
            return Err(format!("must be at least {min} characters"));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(format!("must be at most {max} characters"));
        }
    }
    Ok(())
}

fn check_range(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), String> {
    if let Some(min) = min {
        if value < min {
            return Err(format!("must be at least {min}"));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(format!("must be at most {max}"));
        }
    }
    Ok(())
}
