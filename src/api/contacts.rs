use axum::extract::{Path, State};
use axum::Json;

use crate::api::response::{ApiJson, ApiQuery, ApiResponse, ApiResult, Deleted};
use crate::auth::AdminAuth;
use crate::models::contact::{ContactListParams, ContactSubmission, NewContact, ReplyRequest};
use crate::services::contacts;
use crate::state::AppState;

/// `POST /api/contact`
pub async fn submit_handler(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewContact>,
) -> ApiResult<ContactSubmission> {
    let contact = contacts::submit(
        state.repos.contacts.as_ref(),
        state.mailer.as_ref(),
        state.settings.admin_email.as_deref(),
        input,
    )
    .await?;
    Ok(Json(
        ApiResponse::ok(contact).with_message("Thanks! We will get back to you soon."),
    ))
}

pub async fn admin_list_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ContactListParams>,
) -> ApiResult<Vec<ContactSubmission>> {
    let page = contacts::list(state.repos.contacts.as_ref(), &params).await?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn admin_get_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ContactSubmission> {
    Ok(Json(ApiResponse::ok(contacts::get(state.repos.contacts.as_ref(), &id).await?)))
}

/// `PUT /api/admin/contacts/{id}/read`
pub async fn admin_mark_read_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ContactSubmission> {
    let contact = contacts::mark_read(state.repos.contacts.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(contact)))
}

/// `POST /api/admin/contacts/{id}/reply`
pub async fn admin_reply_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ReplyRequest>,
) -> ApiResult<ContactSubmission> {
    let contact = contacts::reply(
        state.repos.contacts.as_ref(),
        state.mailer.as_ref(),
        &id,
        request,
    )
    .await?;

    let sent = contact.replies.last().is_some_and(|r| r.email_sent);
    let message = if sent {
        "Reply sent"
    } else {
        "Reply saved, but the email could not be delivered"
    };
    Ok(Json(ApiResponse::ok(contact).with_message(message)))
}

pub async fn admin_delete_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    contacts::delete(state.repos.contacts.as_ref(), &id).await?;
    Ok(Json(ApiResponse::ok(Deleted::new(id)).with_message("Contact deleted")))
}
