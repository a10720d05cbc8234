use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::sitemap::{collect_entries, render_robots, render_sitemap};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    /// `mongodb`, `memory` (demo mode) or `unconfigured`.
    pub storage: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
    let storage = if state.settings.demo_mode {
        "memory"
    } else if state.settings.mongodb_uri.is_some() {
        "mongodb"
    } else {
        "unconfigured"
    };

    Json(ApiResponse::ok(Health {
        status: "ok",
        storage,
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /sitemap.xml`
pub async fn sitemap_handler(State(state): State<AppState>) -> impl IntoResponse {
    let entries = collect_entries(
        state.repos.posts.as_ref(),
        state.repos.works.as_ref(),
        Utc::now(),
    )
    .await;
    (
        [(CONTENT_TYPE, "application/xml; charset=utf-8")],
        render_sitemap(&state.settings.site_url, &entries),
    )
}

/// `GET /robots.txt`
pub async fn robots_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_robots(&state.settings.site_url),
    )
}
