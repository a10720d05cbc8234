use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::repository::Entity;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    pub quote: String,
    /// Always within `MIN_RATING..=MAX_RATING`.
    pub rating: u8,
    #[serde(default)]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Testimonial {
    const COLLECTION: &'static str = "testimonials";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
impl Testimonial {
    pub fn sample(author: &str) -> Self {
        let now = Utc::now();
        Self {
            id: crate::db::repository::new_id(),
            author: author.to_string(),
            role: "CTO".to_string(),
            company: "Acme".to_string(),
            quote: "Great work".to_string(),
            rating: 5,
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTestimonial {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub quote: String,
    /// Defaults to the maximum rating.
    pub rating: Option<i64>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestimonialPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
