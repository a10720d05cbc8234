use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::repository::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Draft,
    Published,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Published => "published",
            JobStatus::Closed => "closed",
        }
    }
}

/// An open position on the careers page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub department: String,
    pub location: String,
    /// e.g. `full-time`, `contract`.
    #[serde(default = "default_job_type")]
    pub job_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn default_job_type() -> String {
    "full-time".to_string()
}

impl Entity for Job {
    const COLLECTION: &'static str = "jobs";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    pub job_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// A candidate's application to a published job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    #[serde(rename = "_id")]
    pub id: String,
    /// Soft reference to `Job::id`.
    pub job_id: String,
    pub job_title: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for JobApplication {
    const COLLECTION: &'static str = "job_applications";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewJobApplication {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub department: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub job_id: Option<String>,
}
