use chrono::Utc;
use serde_json::Value;

use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, Patch, Repository};
use crate::email::mailer::{deliver, Mailer};
use crate::email::templates;
use crate::error::AppError;
use crate::models::contact::{ContactListParams, ContactReply, ContactSubmission, NewContact, ReplyRequest};
use crate::models::validation::{is_valid_phone, Checks};
use crate::services::shared::{clean, not_found};

/// Store a contact form message, acknowledge it and alert the site owner.
pub async fn submit(
    repo: &dyn Repository<ContactSubmission>,
    mailer: &dyn Mailer,
    admin_email: Option<&str>,
    input: NewContact,
) -> Result<ContactSubmission, AppError> {
    let phone = clean(input.phone);

    let mut checks = Checks::new();
    checks
        .require("name", &input.name)
        .email("email", &input.email)
        .require("message", &input.message);
    if phone.as_deref().is_some_and(|p| !is_valid_phone(p)) {
        checks.fail("phone", "must be a valid phone number");
    }
    checks.finish()?;

    let contact = ContactSubmission {
        id: new_id(),
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        company: clean(input.company),
        phone,
        service: clean(input.service),
        message: input.message.trim().to_string(),
        is_read: false,
        replies: Vec::new(),
        created_at: Utc::now(),
    };

    repo.insert(&contact).await?;
    tracing::info!(id = %contact.id, "Contact submission received");

    deliver(mailer, &templates::contact_acknowledgement(&contact)).await;
    if let Some(admin) = admin_email {
        deliver(mailer, &templates::contact_alert(admin, &contact)).await;
    }

    Ok(contact)
}

pub async fn list(
    repo: &dyn Repository<ContactSubmission>,
    params: &ContactListParams,
) -> Result<Page<ContactSubmission>, AppError> {
    let filter = Filter::new().eq_opt("is_read", params.is_read);
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    paginate(repo, &ListQuery::new(filter, Sort::desc("created_at"), &page)).await
}

pub async fn get(repo: &dyn Repository<ContactSubmission>, id: &str) -> Result<ContactSubmission, AppError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Contact", id))
}

pub async fn mark_read(repo: &dyn Repository<ContactSubmission>, id: &str) -> Result<ContactSubmission, AppError> {
    let mut patch = Patch::new();
    patch.insert("is_read".into(), Value::Bool(true));
    repo.update(id, patch)
        .await?
        .ok_or_else(|| not_found("Contact", id))
}

/// Email a reply and append it to the submission's reply log.
///
/// The reply is recorded, and the submission marked read, whether or not
/// the email went out; `email_sent` tells which.
pub async fn reply(
    repo: &dyn Repository<ContactSubmission>,
    mailer: &dyn Mailer,
    id: &str,
    request: ReplyRequest,
) -> Result<ContactSubmission, AppError> {
    let mut checks = Checks::new();
    checks
        .require("message", &request.message)
        .not_blank("subject", request.subject.as_deref());
    checks.finish()?;

    let contact = get(repo, id).await?;
    let message = request.message.trim().to_string();

    let email = templates::contact_reply(&contact, request.subject.as_deref().map(str::trim), &message);
    let email_sent = deliver(mailer, &email).await;

    let entry = ContactReply {
        message,
        sent_at: Utc::now(),
        email_sent,
    };
    let entry = serde_json::to_value(&entry).map_err(|e| AppError::Internal(e.to_string()))?;
    if !repo.push(id, "replies", entry).await? {
        return Err(not_found("Contact", id));
    }

    mark_read(repo, id).await
}

pub async fn delete(repo: &dyn Repository<ContactSubmission>, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Contact", id));
    }
    Ok(())
}
