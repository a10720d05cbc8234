use chrono::Utc;
use serde_json::Value;

use crate::db::query::Filter;
use crate::db::repository::{new_id, Patch, Repository};
use crate::error::AppError;
use crate::models::legal::{LegalPage, LegalPageInput};
use crate::models::validation::Checks;
use crate::services::shared::{not_found, stamp};

pub async fn get(repo: &dyn Repository<LegalPage>, slug: &str) -> Result<LegalPage, AppError> {
    repo.find_one(&Filter::new().eq("slug", slug))
        .await?
        .ok_or_else(|| not_found("Legal page", slug))
}

/// Create the page or patch the fields present in `input`.
pub async fn upsert(repo: &dyn Repository<LegalPage>, slug: &str, input: LegalPageInput) -> Result<LegalPage, AppError> {
    let mut checks = Checks::new();
    checks
        .slug("slug", slug)
        .not_blank("title", input.title.as_deref())
        .not_blank("content", input.content.as_deref());
    checks.finish()?;

    let now = Utc::now();
    match repo.find_one(&Filter::new().eq("slug", slug)).await? {
        Some(existing) => {
            let mut patch = Patch::new();
            if let Some(title) = input.title {
                patch.insert("title".into(), Value::String(title.trim().to_string()));
            }
            if let Some(content) = input.content {
                patch.insert("content".into(), Value::String(content));
            }
            stamp(&mut patch, "updated_at", now);
            repo.update(&existing.id, patch)
                .await?
                .ok_or_else(|| not_found("Legal page", slug))
        }
        None => {
            let mut checks = Checks::new();
            checks
                .require("title", input.title.as_deref().unwrap_or_default())
                .require("content", input.content.as_deref().unwrap_or_default());
            checks.finish()?;

            let page = LegalPage {
                id: new_id(),
                slug: slug.to_string(),
                title: input.title.unwrap_or_default().trim().to_string(),
                content: input.content.unwrap_or_default(),
                updated_at: now,
            };
            repo.insert(&page).await?;
            tracing::info!(slug, "Legal page created");
            Ok(page)
        }
    }
}

pub async fn delete(repo: &dyn Repository<LegalPage>, slug: &str) -> Result<(), AppError> {
    let page = get(repo, slug).await?;
    if !repo.delete(&page.id).await? {
        return Err(not_found("Legal page", slug));
    }
    Ok(())
}
