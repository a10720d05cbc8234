use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::db::query::Filter;
use crate::db::repository::{new_id, Entity, Patch, Repository};
use crate::error::AppError;
use crate::models::validation::slugify;

/// Fail with `Conflict` when another document already holds `value` in `field`.
pub async fn ensure_unique<T: Entity>(
    repo: &dyn Repository<T>,
    field: &str,
    value: &str,
    except_id: Option<&str>,
) -> Result<(), AppError> {
    match repo.find_one(&Filter::new().eq(field, value)).await? {
        Some(existing) if Some(existing.id()) != except_id => Err(AppError::Conflict(format!(
            "A document with {field} '{value}' already exists"
        ))),
        _ => Ok(()),
    }
}

/// Use the explicit slug when given, otherwise derive one from the title.
///
/// Titles with no ASCII letters or digits get a short random slug instead
/// of an empty one. A blank title yields an empty slug.
pub fn resolve_slug(explicit: Option<&str>, title: &str) -> String {
    if let Some(slug) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return slug.to_string();
    }
    match slugify(title) {
        slug if slug.is_empty() && !title.trim().is_empty() => new_id()[..12].to_string(),
        slug => slug,
    }
}

/// Set a timestamp field in the same format serde writes for `DateTime<Utc>`.
pub fn stamp(patch: &mut Patch, field: &str, at: DateTime<Utc>) {
    patch.insert(
        field.to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    );
}

pub fn not_found(kind: &str, key: &str) -> AppError {
    AppError::NotFound(format!("{kind} '{key}' not found"))
}

/// Trim an optional string, treating blank as absent.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
