use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::repository::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterSubscriber {
    #[serde(rename = "_id")]
    pub id: String,
    /// Lower-cased, unique.
    pub email: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    #[serde(default)]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Entity for NewsletterSubscriber {
    const COLLECTION: &'static str = "newsletter_subscribers";
    const UNIQUE_FIELDS: &'static [&'static str] = &["email"];

    fn id(&self) -> &str {
        &self.id
    }
}

/// Aggregate record of one broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterCampaign {
    #[serde(rename = "_id")]
    pub id: String,
    pub subject: String,
    pub content: String,
    pub recipients: u64,
    pub sent: u64,
    pub failed: u64,
    pub sent_at: DateTime<Utc>,
}

impl Entity for NewsletterCampaign {
    const COLLECTION: &'static str = "newsletter_campaigns";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub subject: String,
    /// Markdown body.
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_active: Option<bool>,
}
