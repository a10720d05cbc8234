use std::sync::Arc;

use crate::cache::{MemoryCache, ReadCache};
use crate::config::Settings;
use crate::db::memory::MemoryRepository;
use crate::db::mongo::MongoRepository;
use crate::db::pool::MongoPool;
use crate::db::repository::Repository;
use crate::email::mailer::Mailer;
use crate::error::AppError;
use crate::models::blog::BlogPost;
use crate::models::contact::ContactSubmission;
use crate::models::form::{Form, FormSubmission};
use crate::models::job::{Job, JobApplication};
use crate::models::legal::LegalPage;
use crate::models::newsletter::{NewsletterCampaign, NewsletterSubscriber};
use crate::models::testimonial::Testimonial;
use crate::models::work::Work;

/// One repository per collection.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn Repository<BlogPost>>,
    pub works: Arc<dyn Repository<Work>>,
    pub testimonials: Arc<dyn Repository<Testimonial>>,
    pub jobs: Arc<dyn Repository<Job>>,
    pub applications: Arc<dyn Repository<JobApplication>>,
    pub contacts: Arc<dyn Repository<ContactSubmission>>,
    pub subscribers: Arc<dyn Repository<NewsletterSubscriber>>,
    pub campaigns: Arc<dyn Repository<NewsletterCampaign>>,
    pub forms: Arc<dyn Repository<Form>>,
    pub submissions: Arc<dyn Repository<FormSubmission>>,
    pub legal: Arc<dyn Repository<LegalPage>>,
}

impl Repositories {
    pub fn mongo(pool: Arc<MongoPool>) -> Self {
        Self {
            posts: Arc::new(MongoRepository::new(pool.clone())),
            works: Arc::new(MongoRepository::new(pool.clone())),
            testimonials: Arc::new(MongoRepository::new(pool.clone())),
            jobs: Arc::new(MongoRepository::new(pool.clone())),
            applications: Arc::new(MongoRepository::new(pool.clone())),
            contacts: Arc::new(MongoRepository::new(pool.clone())),
            subscribers: Arc::new(MongoRepository::new(pool.clone())),
            campaigns: Arc::new(MongoRepository::new(pool.clone())),
            forms: Arc::new(MongoRepository::new(pool.clone())),
            submissions: Arc::new(MongoRepository::new(pool.clone())),
            legal: Arc::new(MongoRepository::new(pool)),
        }
    }

    pub fn memory() -> Self {
        Self {
            posts: Arc::new(MemoryRepository::new()),
            works: Arc::new(MemoryRepository::new()),
            testimonials: Arc::new(MemoryRepository::new()),
            jobs: Arc::new(MemoryRepository::new()),
            applications: Arc::new(MemoryRepository::new()),
            contacts: Arc::new(MemoryRepository::new()),
            subscribers: Arc::new(MemoryRepository::new()),
            campaigns: Arc::new(MemoryRepository::new()),
            forms: Arc::new(MemoryRepository::new()),
            submissions: Arc::new(MemoryRepository::new()),
            legal: Arc::new(MemoryRepository::new()),
        }
    }

    /// Create the unique indexes of every collection that declares one.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        self.posts.ensure_indexes().await?;
        self.works.ensure_indexes().await?;
        self.subscribers.ensure_indexes().await?;
        self.forms.ensure_indexes().await?;
        self.legal.ensure_indexes().await?;
        Ok(())
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub reads: ReadCache,
    pub mailer: Arc<dyn Mailer>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(repos: Repositories, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        let reads = ReadCache::new(Arc::new(MemoryCache::default()), settings.cache_ttl());
        Self {
            repos,
            reads,
            mailer,
            settings: Arc::new(settings),
        }
    }
}
