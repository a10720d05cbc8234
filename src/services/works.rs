use chrono::Utc;

use crate::cache::ReadCache;
use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, to_patch, Repository};
use crate::error::AppError;
use crate::models::validation::Checks;
use crate::models::work::{NewWork, Work, WorkListParams, WorkPatch, WorkStatus};
use crate::services::shared::{clean, ensure_unique, not_found, resolve_slug, stamp};

fn page_params(params: &WorkListParams) -> PageParams {
    PageParams {
        page: params.page,
        limit: params.limit,
    }
}

fn display_order() -> Sort {
    Sort::asc("order").then_desc("created_at")
}

/// Published case studies in display order.
pub async fn list_published(
    repo: &dyn Repository<Work>,
    reads: &ReadCache,
    params: &WorkListParams,
) -> Page<Work> {
    let filter = Filter::new()
        .eq("status", WorkStatus::Published.as_str())
        .eq_opt("category", clean(params.category.clone()));
    reads
        .page(repo, &ListQuery::new(filter, display_order(), &page_params(params)))
        .await
}

pub async fn list_all(repo: &dyn Repository<Work>, params: &WorkListParams) -> Result<Page<Work>, AppError> {
    let filter = Filter::new()
        .eq_opt("status", params.status.map(|s| s.as_str()))
        .eq_opt("category", clean(params.category.clone()));
    paginate(repo, &ListQuery::new(filter, display_order(), &page_params(params))).await
}

pub async fn read_published(repo: &dyn Repository<Work>, slug: &str) -> Result<Work, AppError> {
    let filter = Filter::new()
        .eq("slug", slug)
        .eq("status", WorkStatus::Published.as_str());
    repo.find_one(&filter)
        .await?
        .ok_or_else(|| not_found("Work", slug))
}

pub async fn get(repo: &dyn Repository<Work>, id: &str) -> Result<Work, AppError> {
    repo.find_by_id(id).await?.ok_or_else(|| not_found("Work", id))
}

pub async fn create(repo: &dyn Repository<Work>, reads: &ReadCache, input: NewWork) -> Result<Work, AppError> {
    let slug = resolve_slug(input.slug.as_deref(), &input.title);

    let mut checks = Checks::new();
    checks.require("title", &input.title);
    if !slug.is_empty() || input.slug.is_some() {
        checks.slug("slug", &slug);
    }
    for (i, stat) in input.stats.iter().enumerate() {
        checks.require(&format!("stats[{i}].label"), &stat.label);
    }
    checks.finish()?;

    ensure_unique(repo, "slug", &slug, None).await?;

    let now = Utc::now();
    let work = Work {
        id: new_id(),
        title: input.title.trim().to_string(),
        slug,
        category: input.category,
        client: clean(input.client),
        description: input.description,
        image: clean(input.image),
        stats: input.stats,
        tags: input.tags,
        status: input.status,
        order: input.order,
        created_at: now,
        updated_at: now,
    };

    repo.insert(&work).await?;
    reads.invalidate::<Work>();
    tracing::info!(id = %work.id, slug = %work.slug, "Work created");

    Ok(work)
}

pub async fn update(
    repo: &dyn Repository<Work>,
    reads: &ReadCache,
    id: &str,
    patch: WorkPatch,
) -> Result<Work, AppError> {
    let mut checks = Checks::new();
    checks.not_blank("title", patch.title.as_deref());
    if let Some(slug) = &patch.slug {
        checks.slug("slug", slug);
    }
    checks.finish()?;

    if let Some(slug) = &patch.slug {
        ensure_unique(repo, "slug", slug, Some(id)).await?;
    }

    let patch = WorkPatch {
        title: patch.title.map(|t| t.trim().to_string()),
        ..patch
    };

    let mut fields = to_patch(&patch)?;
    stamp(&mut fields, "updated_at", Utc::now());

    let updated = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| not_found("Work", id))?;
    reads.invalidate::<Work>();

    Ok(updated)
}

pub async fn delete(repo: &dyn Repository<Work>, reads: &ReadCache, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Work", id));
    }
    reads.invalidate::<Work>();
    Ok(())
}
