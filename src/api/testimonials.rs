use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::db::query::PageParams;
use crate::models::testimonial::{NewTestimonial, Testimonial, TestimonialPatch};
use crate::services::testimonials;
use crate::state::AppState;

/// `GET /api/testimonials`
pub async fn list_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Json<ApiResponse<Vec<Testimonial>>> {
    let page = testimonials::list_public(state.repos.testimonials.as_ref(), &state.reads, &params).await;
    Json(ApiResponse::page(page))
}

pub async fn admin_list_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Vec<Testimonial>> {
    let page = testimonials::list_all(state.repos.testimonials.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_get_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Testimonial> {
    let testimonial = testimonials::get(state.repos.testimonials.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(testimonial)))
}

pub async fn admin_create_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewTestimonial>,
) -> ApiResult<Testimonial> {
    let testimonial = testimonials::create(state.repos.testimonials.as_ref(), &state.reads, input).await?;
    Ok(Json(ApiResponse::ok(testimonial).with_message("Testimonial created")))
}

pub async fn admin_update_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TestimonialPatch>,
) -> ApiResult<Testimonial> {
    let testimonial =
        testimonials::update(state.repos.testimonials.as_ref(), &state.reads, &id, patch).await?;
    Ok(Json(ApiResponse::ok(testimonial).with_message("Testimonial updated")))
}

pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    testimonials::delete(state.repos.testimonials.as_ref(), &state.reads, &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Testimonial deleted")))
}
