use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::models::job::{
    ApplicationListParams, Job, JobApplication, JobListParams, JobPatch, NewJob, NewJobApplication,
};
use crate::services::jobs;
use crate::state::AppState;

/// `GET /api/jobs`
///
/// Answers 504 with an empty `data` array when the listing exceeds
/// `JOBS_TIMEOUT_MS`.
pub async fn list_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<JobListParams>,
) -> ApiResult<Vec<Job>> {
    let page = jobs::list_published(
        state.repos.jobs.as_ref(),
        &state.reads,
        &params,
        state.settings.jobs_timeout(),
    )
    .await?;
    Ok(Json(ApiResponse::page(page)))
}

/// `GET /api/jobs/{id}`
pub async fn read_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Job> {
    Ok(Json(ApiResponse::ok(jobs::read_published(state.repos.jobs.as_ref(), &id).await?)))
}

/// `POST /api/jobs/{id}/apply`
pub async fn apply_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewJobApplication>,
) -> ApiResult<JobApplication> {
    let application = jobs::apply(
        state.repos.jobs.as_ref(),
        state.repos.applications.as_ref(),
        state.mailer.as_ref(),
        state.settings.admin_email.as_deref(),
        &id,
        input,
    )
    .await?;
    Ok(Json(ApiResponse::ok(application).with_message("Application received")))
}

pub async fn admin_list_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<JobListParams>,
) -> ApiResult<Vec<Job>> {
    let page = jobs::list_all(state.repos.jobs.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_get_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Job> {
    Ok(Json(ApiResponse::ok(jobs::get(state.repos.jobs.as_ref(), &id).await?)))
}

pub async fn admin_create_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewJob>,
) -> ApiResult<Job> {
    let job = jobs::create(state.repos.jobs.as_ref(), &state.reads, input).await?;
    Ok(Json(ApiResponse::ok(job).with_message("Job created")))
}

pub async fn admin_update_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<JobPatch>,
) -> ApiResult<Job> {
    let job = jobs::update(state.repos.jobs.as_ref(), &state.reads, &id, patch).await?;
    Ok(Json(ApiResponse::ok(job).with_message("Job updated")))
}

pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    jobs::delete(state.repos.jobs.as_ref(), &state.reads, &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Job deleted")))
}

/// `GET /api/admin/applications`
pub async fn admin_list_applications_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ApplicationListParams>,
) -> ApiResult<Vec<JobApplication>> {
    let page = jobs::list_applications(state.repos.applications.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_delete_application_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    jobs::delete_application(state.repos.applications.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Application deleted")))
}
