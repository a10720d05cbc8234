use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::models::work::{NewWork, Work, WorkListParams, WorkPatch};
use crate::services::works;
use crate::state::AppState;

/// `GET /api/works`
pub async fn list_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<WorkListParams>,
) -> Json<ApiResponse<Vec<Work>>> {
    let page = works::list_published(state.repos.works.as_ref(), &state.reads, &params).await;
    Json(ApiResponse::page(page))
}

/// `GET /api/works/{slug}`
pub async fn read_handler(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Work> {
    let work = works::read_published(state.repos.works.as_ref(), &slug).await?;
    Ok(Json(ApiResponse::ok(work)))
}

pub async fn admin_list_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<WorkListParams>,
) -> ApiResult<Vec<Work>> {
    let page = works::list_all(state.repos.works.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_get_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Work> {
    Ok(Json(ApiResponse::ok(works::get(state.repos.works.as_ref(), &id).await?)))
}

pub async fn admin_create_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewWork>,
) -> ApiResult<Work> {
    let work = works::create(state.repos.works.as_ref(), &state.reads, input).await?;
    Ok(Json(ApiResponse::ok(work).with_message("Work created")))
}

pub async fn admin_update_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<WorkPatch>,
) -> ApiResult<Work> {
    let work = works::update(state.repos.works.as_ref(), &state.reads, &id, patch).await?;
    Ok(Json(ApiResponse::ok(work).with_message("Work updated")))
}

pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    works::delete(state.repos.works.as_ref(), &state.reads, &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Work deleted")))
}
