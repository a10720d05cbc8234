use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::db::query::PageParams;
use crate::email::mailer::BatchPolicy;
use crate::models::newsletter::{
    BroadcastRequest, NewsletterCampaign, NewsletterSubscriber, SubscribeRequest,
    SubscriberListParams,
};
use crate::services::newsletter;
use crate::state::AppState;

/// `POST /api/newsletter`
pub async fn subscribe_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> ApiResult<NewsletterSubscriber> {
    let subscriber = newsletter::subscribe(
        state.repos.subscribers.as_ref(),
        state.mailer.as_ref(),
        &state.settings.site_url,
        &request.email,
    )
    .await?;
    Ok(Json(ApiResponse::ok(subscriber).with_message("Subscribed")))
}

/// `POST /api/newsletter/unsubscribe`
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> ApiResult<NewsletterSubscriber> {
    let subscriber = newsletter::unsubscribe(state.repos.subscribers.as_ref(), &request.email).await?;
    Ok(Json(ApiResponse::ok(subscriber).with_message("Unsubscribed")))
}

pub async fn admin_list_subscribers_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SubscriberListParams>,
) -> ApiResult<Vec<NewsletterSubscriber>> {
    let page = newsletter::list_subscribers(state.repos.subscribers.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_delete_subscriber_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    newsletter::delete_subscriber(state.repos.subscribers.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Subscriber deleted")))
}

/// `POST /api/admin/newsletter/broadcast`
///
/// Runs the whole broadcast before answering.
pub async fn admin_broadcast_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BroadcastRequest>,
) -> ApiResult<NewsletterCampaign> {
    let campaign = newsletter::broadcast(
        state.repos.subscribers.as_ref(),
        state.repos.campaigns.as_ref(),
        state.mailer.as_ref(),
        &state.settings.site_url,
        BatchPolicy::from_settings(&state.settings),
        request,
    )
    .await?;

    let message = format!(
        "Sent to {} of {} subscribers",
        campaign.sent, campaign.recipients
    );
    Ok(Json(ApiResponse::ok(campaign).with_message(message)))
}

pub async fn admin_list_campaigns_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Vec<NewsletterCampaign>> {
    let page = newsletter::list_campaigns(state.repos.campaigns.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}
