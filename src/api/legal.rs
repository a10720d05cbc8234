use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::models::legal::{LegalPage, LegalPageInput};
use crate::services::legal;
use crate::state::AppState;

/// `GET /api/legal/{slug}`
pub async fn read_handler(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<LegalPage> {
    Ok(Json(ApiResponse::ok(legal::get(state.repos.legal.as_ref(), &slug).await?)))
}

/// `PUT /api/admin/legal/{slug}` creates the page or patches it.
pub async fn admin_upsert_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ApiJson(input): ApiJson<LegalPageInput>,
) -> ApiResult<LegalPage> {
    let page = legal::upsert(state.repos.legal.as_ref(), &slug, input).await?;
    Ok(Json(ApiResponse::ok(page).with_message("Legal page saved")))
}

pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Deleted> {
    legal::delete(state.repos.legal.as_ref(), &slug).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(slug)).with_message("Legal page deleted")))
}
