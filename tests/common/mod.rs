#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

use agency_cms::app::build_router;
use agency_cms::config::Settings;
use agency_cms::db::memory::MemoryRepository;
use agency_cms::db::pool::MongoPool;
use agency_cms::db::query::{Filter, Sort};
use agency_cms::db::repository::{Patch, Repository};
use agency_cms::email::mailer::{EmailMessage, Mailer};
use agency_cms::error::AppError;
use agency_cms::models::job::Job;
use agency_cms::state::{AppState, Repositories};

pub const ADMIN_TOKEN: &str = "test-token";

/// `Authorization` header value accepted on admin routes.
pub fn admin_bearer() -> HeaderValue {
    HeaderValue::from_static("Bearer test-token")
}

/// Mailer that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.to.clone())
            .collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Job store whose listing queries never complete.
#[derive(Default)]
pub struct HangingJobs {
    inner: MemoryRepository<Job>,
}

#[async_trait]
impl Repository<Job> for HangingJobs {
    async fn insert(&self, item: &Job) -> Result<(), AppError> {
        self.inner.insert(item).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Job>, AppError> {
        self.inner.find_one(filter).await
    }

    async fn find(
        &self,
        _filter: &Filter,
        _sort: &Sort,
        _skip: u64,
        _limit: Option<u64>,
    ) -> Result<Vec<Job>, AppError> {
        std::future::pending().await
    }

    async fn count(&self, _filter: &Filter) -> Result<u64, AppError> {
        std::future::pending().await
    }

    async fn update(&self, id: &str, patch: Patch) -> Result<Option<Job>, AppError> {
        self.inner.update(id, patch).await
    }

    async fn increment(&self, id: &str, field: &str) -> Result<bool, AppError> {
        self.inner.increment(id, field).await
    }

    async fn push(&self, id: &str, field: &str, value: serde_json::Value) -> Result<bool, AppError> {
        self.inner.push(id, field, value).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        self.inner.delete_many(filter).await
    }
}

/// Router plus direct handles on its state for integration tests.
///
/// The MongoDB container, when there is one, lives as long as this struct.
pub struct TestEnv {
    _mongo: Option<ContainerAsync<Mongo>>,
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

fn test_settings() -> Settings {
    Settings {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        admin_email: Some("team@agency.test".to_string()),
        site_url: "https://agency.test".to_string(),
        broadcast_delay_ms: 0,
        ..Default::default()
    }
}

impl TestEnv {
    fn build(repos: Repositories, settings: Settings, mongo: Option<ContainerAsync<Mongo>>) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(repos, mailer.clone(), settings);
        Self {
            _mongo: mongo,
            router: build_router(state.clone()),
            state,
            mailer,
        }
    }

    /// Everything backed by the in-process store.
    pub fn memory() -> Self {
        Self::build(Repositories::memory(), test_settings(), None)
    }

    /// In-process store except for a job collection that never answers.
    pub fn with_hanging_jobs(timeout_ms: u64) -> Self {
        let repos = Repositories {
            jobs: Arc::new(HangingJobs::default()),
            ..Repositories::memory()
        };
        let settings = Settings {
            jobs_timeout_ms: timeout_ms,
            ..test_settings()
        };
        Self::build(repos, settings, None)
    }

    /// MongoDB repositories with no connection string configured.
    pub fn without_database() -> Self {
        let pool = Arc::new(MongoPool::new(None, "agency_test"));
        Self::build(Repositories::mongo(pool), test_settings(), None)
    }

    /// Spin up a MongoDB container and wire the repositories to it.
    pub async fn mongo() -> Self {
        let container = Mongo::default()
            .start()
            .await
            .expect("Failed to start MongoDB container");
        let port = container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");

        let settings = Settings {
            mongodb_uri: Some(format!("mongodb://127.0.0.1:{port}")),
            mongodb_database: format!("agency_test_{}", uuid::Uuid::new_v4().simple()),
            ..test_settings()
        };
        let pool = MongoPool::from_settings(&settings).expect("Failed to build pool");
        let repos = Repositories::mongo(Arc::new(pool));
        repos
            .ensure_indexes()
            .await
            .expect("Failed to create indexes");

        Self::build(repos, settings, Some(container))
    }

    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// A `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }


    /// Create a blog post through the admin API and return its JSON.
    pub async fn create_post(
        &self,
        server: &axum_test::TestServer,
        body: serde_json::Value,
    ) -> serde_json::Value {
        let response = server
            .post("/api/admin/blog")
            .add_header(AUTHORIZATION, admin_bearer())
            .json(&body)
            .await;
        response.json::<serde_json::Value>()["data"].clone()
    }
}
