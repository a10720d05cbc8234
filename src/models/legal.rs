use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::repository::Entity;

/// Privacy policy, terms of service and similar static documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalPage {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    pub title: String,
    /// Markdown.
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl Entity for LegalPage {
    const COLLECTION: &'static str = "legal_pages";
    const UNIQUE_FIELDS: &'static [&'static str] = &["slug"];

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegalPageInput {
    pub title: Option<String>,
    pub content: Option<String>,
}
