use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::repository::Entity;

/// One admin reply, appended to the submission's reply log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactReply {
    pub message: String,
    pub sent_at: DateTime<Utc>,
    /// Whether the reply email was accepted by the transport.
    pub email_sent: bool,
}

/// A message sent through the public contact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSubmission {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Service the visitor is interested in.
    #[serde(default)]
    pub service: Option<String>,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    /// Append-only.
    #[serde(default)]
    pub replies: Vec<ContactReply>,
    pub created_at: DateTime<Utc>,
}

impl Entity for ContactSubmission {
    const COLLECTION: &'static str = "contacts";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub service: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub message: String,
    /// Defaults to `Re: your message`.
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_read: Option<bool>,
}
