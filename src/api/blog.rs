use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::models::blog::{BlogListParams, BlogPost, BlogPostPatch, NewBlogPost};
use crate::services::blog;
use crate::state::AppState;

/// `GET /api/blog`
pub async fn list_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BlogListParams>,
) -> Json<ApiResponse<Vec<BlogPost>>> {
    let page = blog::list_published(state.repos.posts.as_ref(), &state.reads, &params).await;
    Json(ApiResponse::page(page))
}

/// `GET /api/blog/{slug}`
pub async fn read_handler(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<BlogPost> {
    let post = blog::read_published(state.repos.posts.as_ref(), &slug).await?;
    Ok(Json(ApiResponse::ok(post)))
}

pub async fn admin_list_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BlogListParams>,
) -> ApiResult<Vec<BlogPost>> {
    let page = blog::list_all(state.repos.posts.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_get_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BlogPost> {
    Ok(Json(ApiResponse::ok(blog::get(state.repos.posts.as_ref(), &id).await?)))
}

pub async fn admin_create_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewBlogPost>,
) -> ApiResult<BlogPost> {
    let post = blog::create(state.repos.posts.as_ref(), &state.reads, input).await?;
    Ok(Json(ApiResponse::ok(post).with_message("Blog post created")))
}

pub async fn admin_update_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BlogPostPatch>,
) -> ApiResult<BlogPost> {
    let post = blog::update(state.repos.posts.as_ref(), &state.reads, &id, patch).await?;
    Ok(Json(ApiResponse::ok(post).with_message("Blog post updated")))
}

pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    blog::delete(state.repos.posts.as_ref(), &state.reads, &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Blog post deleted")))
}
