use chrono::Utc;
use serde_json::Value;

use crate::db::query::{paginate, Filter, ListQuery, Page, PageParams, Sort};
use crate::db::repository::{new_id, Patch, Repository};
use crate::email::mailer::{broadcast as send_batched, deliver, BatchPolicy, Mailer};
use crate::email::templates;
use crate::error::AppError;
use crate::models::newsletter::{
    BroadcastRequest, NewsletterCampaign, NewsletterSubscriber, SubscriberListParams,
};
use crate::models::validation::Checks;
use crate::services::shared::{not_found, stamp};

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Subscribe an address. An inactive record is re-activated; an active one
/// is a conflict.
pub async fn subscribe(
    repo: &dyn Repository<NewsletterSubscriber>,
    mailer: &dyn Mailer,
    site_url: &str,
    email: &str,
) -> Result<NewsletterSubscriber, AppError> {
    let email = normalize(email);
    let mut checks = Checks::new();
    checks.email("email", &email);
    checks.finish()?;

    let now = Utc::now();
    let subscriber = match repo.find_one(&Filter::new().eq("email", email.as_str())).await? {
        Some(existing) if existing.is_active => {
            return Err(AppError::Conflict(format!("'{email}' is already subscribed")));
        }
        Some(existing) => {
            let mut patch = Patch::new();
            patch.insert("is_active".into(), Value::Bool(true));
            patch.insert("unsubscribed_at".into(), Value::Null);
            stamp(&mut patch, "subscribed_at", now);
            repo.update(&existing.id, patch)
                .await?
                .ok_or_else(|| not_found("Subscriber", &existing.id))?
        }
        None => {
            let subscriber = NewsletterSubscriber {
                id: new_id(),
                email,
                is_active: true,
                subscribed_at: now,
                unsubscribed_at: None,
            };
            repo.insert(&subscriber).await?;
            subscriber
        }
    };

    tracing::info!(id = %subscriber.id, "Newsletter subscription");
    deliver(mailer, &templates::newsletter_welcome(&subscriber.email, site_url)).await;

    Ok(subscriber)
}

/// Deactivate a subscription. Unsubscribing twice is not an error.
pub async fn unsubscribe(
    repo: &dyn Repository<NewsletterSubscriber>,
    email: &str,
) -> Result<NewsletterSubscriber, AppError> {
    let email = normalize(email);
    let mut checks = Checks::new();
    checks.email("email", &email);
    checks.finish()?;

    let existing = repo
        .find_one(&Filter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(|| not_found("Subscriber", &email))?;

    if !existing.is_active {
        return Ok(existing);
    }

    let mut patch = Patch::new();
    patch.insert("is_active".into(), Value::Bool(false));
    stamp(&mut patch, "unsubscribed_at", Utc::now());
    repo.update(&existing.id, patch)
        .await?
        .ok_or_else(|| not_found("Subscriber", &email))
}

pub async fn list_subscribers(
    repo: &dyn Repository<NewsletterSubscriber>,
    params: &SubscriberListParams,
) -> Result<Page<NewsletterSubscriber>, AppError> {
    let filter = Filter::new().eq_opt("is_active", params.is_active);
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    };
    paginate(repo, &ListQuery::new(filter, Sort::desc("subscribed_at"), &page)).await
}

/// Hard delete, unlike [`unsubscribe`].
pub async fn delete_subscriber(repo: &dyn Repository<NewsletterSubscriber>, id: &str) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found("Subscriber", id));
    }
    Ok(())
}

/// Send an issue to every active subscriber and record the campaign.
pub async fn broadcast(
    subscribers: &dyn Repository<NewsletterSubscriber>,
    campaigns: &dyn Repository<NewsletterCampaign>,
    mailer: &dyn Mailer,
    site_url: &str,
    policy: BatchPolicy,
    request: BroadcastRequest,
) -> Result<NewsletterCampaign, AppError> {
    let mut checks = Checks::new();
    checks
        .require("subject", &request.subject)
        .require("content", &request.content);
    checks.finish()?;

    let subject = request.subject.trim().to_string();
    let recipients = subscribers
        .find_all(&Filter::new().eq("is_active", true), &Sort::asc("subscribed_at"))
        .await?;

    let messages: Vec<_> = recipients
        .iter()
        .map(|s| templates::newsletter_issue(&s.email, &subject, &request.content, site_url))
        .collect();

    tracing::info!(recipients = messages.len(), subject = %subject, "Starting newsletter broadcast");
    let report = send_batched(mailer, &messages, policy).await;

    let campaign = NewsletterCampaign {
        id: new_id(),
        subject,
        content: request.content,
        recipients: messages.len() as u64,
        sent: report.sent,
        failed: report.failed,
        sent_at: Utc::now(),
    };
    campaigns.insert(&campaign).await?;

    Ok(campaign)
}

pub async fn list_campaigns(
    repo: &dyn Repository<NewsletterCampaign>,
    params: &PageParams,
) -> Result<Page<NewsletterCampaign>, AppError> {
    paginate(repo, &ListQuery::new(Filter::new(), Sort::desc("sent_at"), params)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRepository;
    use crate::email::mailer::tests::MockMailer;
    use crate::email::mailer::DisabledMailer;
    use std::time::Duration;

    const SITE: &str = "https://agency.example";

    #[tokio::test]
    async fn test_duplicate_subscription_conflicts() {
        let repo = MemoryRepository::<NewsletterSubscriber>::new();
        subscribe(&repo, &DisabledMailer, SITE, "fan@example.com").await.unwrap();

        let err = subscribe(&repo, &DisabledMailer, SITE, " FAN@example.com ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_reactivates() {
        let repo = MemoryRepository::<NewsletterSubscriber>::new();
        let first = subscribe(&repo, &DisabledMailer, SITE, "fan@example.com").await.unwrap();

        let gone = unsubscribe(&repo, "fan@example.com").await.unwrap();
        assert!(!gone.is_active);
        assert!(gone.unsubscribed_at.is_some());
        // Idempotent.
        assert!(!unsubscribe(&repo, "fan@example.com").await.unwrap().is_active);

        let back = subscribe(&repo, &DisabledMailer, SITE, "fan@example.com").await.unwrap();
        assert_eq!(back.id, first.id);
        assert!(back.is_active);
        assert!(back.unsubscribed_at.is_none());
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_email() {
        let repo = MemoryRepository::<NewsletterSubscriber>::new();
        let err = unsubscribe(&repo, "nobody@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let repo = MemoryRepository::<NewsletterSubscriber>::new();
        let err = subscribe(&repo, &DisabledMailer, SITE, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_targets_active_subscribers() {
        let subscribers = MemoryRepository::<NewsletterSubscriber>::new();
        let campaigns = MemoryRepository::<NewsletterCampaign>::new();
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            subscribe(&subscribers, &DisabledMailer, SITE, email).await.unwrap();
        }
        unsubscribe(&subscribers, "c@example.com").await.unwrap();

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(|msg| {
            assert!(msg.html.contains("Unsubscribe"));
            if msg.to == "b@example.com" {
                Err(AppError::Email("bounced".into()))
            } else {
                Ok(())
            }
        });

        let policy = BatchPolicy {
            size: 1,
            delay: Duration::from_millis(500),
        };
        let request = BroadcastRequest {
            subject: "News".into(),
            content: "Hello **friends**".into(),
        };
        let campaign = broadcast(&subscribers, &campaigns, &mailer, SITE, policy, request)
            .await
            .unwrap();

        assert_eq!(campaign.recipients, 2);
        assert_eq!(campaign.sent, 1);
        assert_eq!(campaign.failed, 1);

        let listed = list_campaigns(&campaigns, &PageParams::default()).await.unwrap();
        assert_eq!(listed.items, vec![campaign]);
    }

    #[tokio::test]
    async fn test_broadcast_requires_subject_and_content() {
        let subscribers = MemoryRepository::<NewsletterSubscriber>::new();
        let campaigns = MemoryRepository::<NewsletterCampaign>::new();
        let policy = BatchPolicy {
            size: 10,
            delay: Duration::ZERO,
        };
        let err = broadcast(
            &subscribers,
            &campaigns,
            &MockMailer::new(),
            SITE,
            policy,
            BroadcastRequest::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.len() == 2));
    }
}
