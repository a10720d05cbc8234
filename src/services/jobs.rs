use std::time::Duration;

use chrono::Utc;

use crate::cache::ReadCache;
use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, to_patch, Repository};
use crate::email::mailer::{deliver, Mailer};
use crate::email::templates;
use crate::error::AppError;
use crate::models::job::{
    default_job_type, ApplicationListParams, Job, JobApplication, JobListParams, JobPatch,
    JobStatus, NewJob, NewJobApplication,
};
use crate::models::validation::{is_valid_phone, is_valid_url, Checks};
use crate::services::shared::{clean, not_found, stamp};

fn page_params(page: Option<u64>, limit: Option<u64>) -> PageParams {
    PageParams { page, limit }
}

fn display_order() -> Sort {
    Sort::asc("order").then_desc("created_at")
}

/// Published openings, bounded by `timeout`.
///
/// Database failures still degrade to an empty page; only a slow backend
/// produces `Timeout`.
pub async fn list_published(
    repo: &dyn Repository<Job>,
    reads: &ReadCache,
    params: &JobListParams,
    timeout: Duration,
) -> Result<Page<Job>, AppError> {
    let filter = Filter::new()
        .eq("status", JobStatus::Published.as_str())
        .eq_opt("department", clean(params.department.clone()));
    let query = ListQuery::new(filter, display_order(), &page_params(params.page, params.limit));

    tokio::time::timeout(timeout, reads.page(repo, &query))
        .await
        .map_err(|_| {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Job listing timed out");
            AppError::Timeout("Job listing timed out".into())
        })
}

pub async fn list_all(repo: &dyn Repository<Job>, params: &JobListParams) -> Result<Page<Job>, AppError> {
    let filter = Filter::new()
        .eq_opt("status", params.status.map(|s| s.as_str()))
        .eq_opt("department", clean(params.department.clone()));
    let query = ListQuery::new(filter, display_order(), &page_params(params.page, params.limit));
    paginate(repo, &query).await
}

pub async fn read_published(repo: &dyn Repository<Job>, id: &str) -> Result<Job, AppError> {
    let filter = Filter::new()
        .eq("_id", id)
        .eq("status", JobStatus::Published.as_str());
    repo.find_one(&filter)
        .await?
        .ok_or_else(|| not_found("Job", id))
}

pub async fn get(repo: &dyn Repository<Job>, id: &str) -> Result<Job, AppError> {
    repo.find_by_id(id).await?.ok_or_else(|| not_found("Job", id))
}

pub async fn create(repo: &dyn Repository<Job>, reads: &ReadCache, input: NewJob) -> Result<Job, AppError> {
    let mut checks = Checks::new();
    checks
        .require("title", &input.title)
        .require("department", &input.department)
        .require("location", &input.location);
    checks.finish()?;

    let now = Utc::now();
    let job = Job {
        id: new_id(),
        title: input.title.trim().to_string(),
        department: input.department.trim().to_string(),
        location: input.location.trim().to_string(),
        job_type: clean(input.job_type).unwrap_or_else(default_job_type),
        description: input.description,
        requirements: input.requirements,
        status: input.status,
        order: input.order,
        created_at: now,
        updated_at: now,
    };

    repo.insert(&job).await?;
    reads.invalidate::<Job>();
    tracing::info!(id = %job.id, title = %job.title, "Job created");

    Ok(job)
}

pub async fn update(
    repo: &dyn Repository<Job>,
    reads: &ReadCache,
    id: &str,
    mut patch: JobPatch,
) -> Result<Job, AppError> {
    let mut checks = Checks::new();
    checks
        .not_blank("title", patch.title.as_deref())
        .not_blank("department", patch.department.as_deref())
        .not_blank("location", patch.location.as_deref())
        .not_blank("job_type", patch.job_type.as_deref());
    checks.finish()?;

    for value in [
        &mut patch.title,
        &mut patch.department,
        &mut patch.location,
        &mut patch.job_type,
    ]
    .into_iter()
    .flatten()
    {
        *value = value.trim().to_string();
    }

    let mut fields = to_patch(&patch)?;
    stamp(&mut fields, "updated_at", Utc::now());

    let updated = repo
        .update(id, fields)
        .await?
        .ok_or_else(|| not_found("Job", id))?;
    reads.invalidate::<Job>();

    Ok(updated)
}

pub async fn delete(repo: &dyn Repository<Job>, reads: &ReadCache, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Job", id));
    }
    reads.invalidate::<Job>();
    Ok(())
}

/// Record an application to a published job and acknowledge it by email.
pub async fn apply(
    jobs: &dyn Repository<Job>,
    applications: &dyn Repository<JobApplication>,
    mailer: &dyn Mailer,
    admin_email: Option<&str>,
    job_id: &str,
    input: NewJobApplication,
) -> Result<JobApplication, AppError> {
    let job = read_published(jobs, job_id).await?;

    let phone = clean(input.phone);
    let resume_url = clean(input.resume_url);

    let mut checks = Checks::new();
    checks.require("name", &input.name).email("email", &input.email);
    if phone.as_deref().is_some_and(|p| !is_valid_phone(p)) {
        checks.fail("phone", "must be a valid phone number");
    }
    if resume_url.as_deref().is_some_and(|u| !is_valid_url(u)) {
        checks.fail("resume_url", "must be an http(s) URL");
    }
    checks.finish()?;

    let application = JobApplication {
        id: new_id(),
        job_id: job.id.clone(),
        job_title: job.title.clone(),
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        phone,
        resume_url,
        cover_letter: input.cover_letter.trim().to_string(),
        created_at: Utc::now(),
    };

    applications.insert(&application).await?;
    tracing::info!(job_id = %job.id, application_id = %application.id, "Job application received");

    deliver(mailer, &templates::application_acknowledgement(&application)).await;
    if let Some(admin) = admin_email {
        deliver(mailer, &templates::application_alert(admin, &application)).await;
    }

    Ok(application)
}

pub async fn list_applications(
    repo: &dyn Repository<JobApplication>,
    params: &ApplicationListParams,
) -> Result<Page<JobApplication>, AppError> {
    let filter = Filter::new().eq_opt("job_id", clean(params.job_id.clone()));
    let query = ListQuery::new(
        filter,
        Sort::desc("created_at"),
        &page_params(params.page, params.limit),
    );
    paginate(repo, &query).await
}

pub async fn delete_application(repo: &dyn Repository<JobApplication>, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Application", id));
    }
    Ok(())
}
