use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::db::query::PageParams;
use crate::forms::render::RenderedForm;
use crate::models::form::{Form, FormPatch, FormSubmission, NewForm, SubmissionRequest};
use crate::services::forms;
use crate::state::AppState;

/// `GET /api/forms/{slug}`
pub async fn render_handler(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<RenderedForm> {
    Ok(Json(ApiResponse::ok(forms::render(state.repos.forms.as_ref(), &slug).await?)))
}

/// `POST /api/forms/{slug}/submissions`
pub async fn submit_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ApiJson(request): ApiJson<SubmissionRequest>,
) -> ApiResult<FormSubmission> {
    let (submission, message) = forms::submit(
        state.repos.forms.as_ref(),
        state.repos.submissions.as_ref(),
        state.mailer.as_ref(),
        &slug,
        request.answers,
    )
    .await?;
    Ok(Json(ApiResponse::ok(submission).with_message(message)))
}

pub async fn admin_list_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Vec<Form>> {
    Ok(Json(ApiResponse::page(forms::list(state.repos.forms.as_ref(), &params).await?)))
}

pub async fn admin_get_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Form> {
    Ok(Json(ApiResponse::ok(forms::get(state.repos.forms.as_ref(), &id).await?)))
}

pub async fn admin_create_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewForm>,
) -> ApiResult<Form> {
    let form = forms::create(state.repos.forms.as_ref(), &state.reads, input).await?;
    Ok(Json(ApiResponse::ok(form).with_message("Form created")))
}

pub async fn admin_update_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<FormPatch>,
) -> ApiResult<Form> {
    let form = forms::update(state.repos.forms.as_ref(), &state.reads, &id, patch).await?;
    Ok(Json(ApiResponse::ok(form).with_message("Form updated")))
}

/// Also removes every submission of the form.
pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    forms::delete(
        state.repos.forms.as_ref(),
        state.repos.submissions.as_ref(),
        &state.reads,
        &id,
    )
    .await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Form deleted")))
}

/// `GET /api/admin/forms/{id}/submissions`
pub async fn admin_submissions_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Vec<FormSubmission>> {
    let page = forms::list_submissions(
        state.repos.forms.as_ref(),
        state.repos.submissions.as_ref(),
        &id,
        &params,
    )
    .await?;
    Ok(Json(ApiResponse::page(page)))
}
