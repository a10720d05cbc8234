use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api::site::health_handler))
        .route("/sitemap.xml", get(api::site::sitemap_handler))
        .route("/robots.txt", get(api::site::robots_handler))
        .route("/api/blog", get(api::blog::list_handler))
        .route("/api/blog/{slug}", get(api::blog::read_handler))
        .route("/api/works", get(api::works::list_handler))
        .route("/api/works/{slug}", get(api::works::read_handler))
        .route("/api/testimonials", get(api::testimonials::list_handler))
        .route("/api/jobs", get(api::jobs::list_handler))
        .route("/api/jobs/{id}", get(api::jobs::read_handler))
        .route("/api/jobs/{id}/apply", post(api::jobs::apply_handler))
        .route("/api/contact", post(api::contacts::submit_handler))
        .route("/api/newsletter", post(api::newsletter::subscribe_handler))
        .route(
            "/api/newsletter/unsubscribe",
            post(api::newsletter::unsubscribe_handler),
        )
        .route("/api/forms/{slug}", get(api::forms::render_handler))
        .route(
            "/api/forms/{slug}/submissions",
            post(api::forms::submit_handler),
        )
        .route("/api/legal/{slug}", get(api::legal::read_handler))
}

/// Routes under `/api/admin`. Every handler takes the `AdminAuth` extractor.
fn admin_routes() -> Router<AppState> {
    use api::{blog, contacts, forms, jobs, legal, newsletter, testimonials, works};

    Router::new()
        .route(
            "/blog",
            get(blog::admin_list_handler).post(blog::admin_create_handler),
        )
        .route(
            "/blog/{id}",
            get(blog::admin_get_handler)
                .put(blog::admin_update_handler)
                .delete(blog::admin_delete_handler),
        )
        .route(
            "/works",
            get(works::admin_list_handler).post(works::admin_create_handler),
        )
        .route(
            "/works/{id}",
            get(works::admin_get_handler)
                .put(works::admin_update_handler)
                .delete(works::admin_delete_handler),
        )
        .route(
            "/testimonials",
            get(testimonials::admin_list_handler).post(testimonials::admin_create_handler),
        )
        .route(
            "/testimonials/{id}",
            get(testimonials::admin_get_handler)
                .put(testimonials::admin_update_handler)
                .delete(testimonials::admin_delete_handler),
        )
        .route(
            "/jobs",
            get(jobs::admin_list_handler).post(jobs::admin_create_handler),
        )
        .route(
            "/jobs/{id}",
            get(jobs::admin_get_handler)
                .put(jobs::admin_update_handler)
                .delete(jobs::admin_delete_handler),
        )
        .route("/applications", get(jobs::admin_list_applications_handler))
        .route(
            "/applications/{id}",
            axum::routing::delete(jobs::admin_delete_application_handler),
        )
        .route("/contacts", get(contacts::admin_list_handler))
        .route(
            "/contacts/{id}",
            get(contacts::admin_get_handler).delete(contacts::admin_delete_handler),
        )
        .route("/contacts/{id}/read", put(contacts::admin_mark_read_handler))
        .route("/contacts/{id}/reply", post(contacts::admin_reply_handler))
        .route(
            "/newsletter/subscribers",
            get(newsletter::admin_list_subscribers_handler),
        )
        .route(
            "/newsletter/subscribers/{id}",
            axum::routing::delete(newsletter::admin_delete_subscriber_handler),
        )
        .route(
            "/newsletter/broadcast",
            post(newsletter::admin_broadcast_handler),
        )
        .route(
            "/newsletter/campaigns",
            get(newsletter::admin_list_campaigns_handler),
        )
        .route(
            "/forms",
            get(forms::admin_list_handler).post(forms::admin_create_handler),
        )
        .route(
            "/forms/{id}",
            get(forms::admin_get_handler)
                .put(forms::admin_update_handler)
                .delete(forms::admin_delete_handler),
        )
        .route("/forms/{id}/submissions", get(forms::admin_submissions_handler))
        .route(
            "/legal/{slug}",
            put(legal::admin_upsert_handler).delete(legal::admin_delete_handler),
        )
}

fn cors_layer(site_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match site_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(site_url, "SITE_URL is not a valid origin, CORS disabled: {e}");
            cors
        }
    }
}

/// Build the full HTTP application.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.site_url);

    Router::new()
        .merge(public_routes())
        .nest("/api/admin", admin_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
