pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod demo_seeder;
pub mod error;
pub mod sitemap;
pub mod state;
pub mod api {
    pub mod errors;
    pub mod response;

    pub mod blog;
    pub mod contacts;
    pub mod forms;
    pub mod jobs;
    pub mod legal;
    pub mod newsletter;
    pub mod site;
    pub mod testimonials;
    pub mod works;
}
pub mod db {
    pub mod memory;
    pub mod mongo;
    pub mod pool;
    pub mod query;
    pub mod repository;
}
pub mod email {
    pub mod mailer;
    pub mod templates;
}
pub mod forms {
    pub mod render;
    pub mod validate;
}
pub mod models {
    pub mod blog;
    pub mod contact;
    pub mod form;
    pub mod job;
    pub mod legal;
    pub mod newsletter;
    pub mod testimonial;
    pub mod validation;
    pub mod work;
}
pub mod rendering {
    pub mod markdown;
}
pub mod services {
    pub mod blog;
    pub mod contacts;
    pub mod forms;
    pub mod jobs;
    pub mod legal;
    pub mod newsletter;
    pub mod shared;
    pub mod testimonials;
    pub mod works;
}
