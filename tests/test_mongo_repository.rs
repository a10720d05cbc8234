mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{admin_bearer, TestEnv};
use serde_json::{json, Value};

use agency_cms::db::query::{Filter, Sort};
use agency_cms::db::repository::Repository;

#[tokio::test]
async fn unique_slug_is_enforced_by_mongodb() {
    let env = TestEnv::mongo().await;
    let server = env.server_permissive();

    server
        .post("/api/admin/blog")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({ "title": "A", "slug": "a" }))
        .await
        .assert_status_ok();
    server
        .post("/api/admin/blog")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({ "title": "A", "slug": "a" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let count = env
        .state
        .repos
        .posts
        .count(&Filter::new().eq("slug", "a"))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn created_post_reads_back_equal() {
    let env = TestEnv::mongo().await;
    let server = env.server();

    let created = env
        .create_post(
            &server,
            json!({ "title": "Stored in mongo", "tags": ["db"], "status": "published" }),
        )
        .await;
    let id = created["_id"].as_str().unwrap();

    let fetched: Value = server
        .get(&format!("/api/admin/blog/{id}"))
        .add_header(AUTHORIZATION, admin_bearer())
        .await
        .json();
    assert_eq!(fetched["data"], created);

    let public: Value = server.get("/api/blog").await.json();
    assert_eq!(public["data"][0]["_id"], created["_id"]);
}

#[tokio::test]
async fn patch_increment_and_push_are_atomic_updates() {
    let env = TestEnv::mongo().await;
    let server = env.server();

    let body: Value = server
        .post("/api/contact")
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "message": "Hi" }))
        .await
        .json();
    let id = body["data"]["_id"].as_str().unwrap();

    let replied: Value = server
        .post(&format!("/api/admin/contacts/{id}/reply"))
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({ "message": "Hello back" }))
        .await
        .json();
    assert_eq!(replied["data"]["is_read"], true);
    assert_eq!(replied["data"]["replies"].as_array().unwrap().len(), 1);

    env.create_post(&server, json!({ "title": "Counted", "status": "published" }))
        .await;
    server.get("/api/blog/counted").await;
    let read: Value = server.get("/api/blog/counted").await.json();
    assert_eq!(read["data"]["views"], 2);
}

#[tokio::test]
async fn delete_twice_and_cascade() {
    let env = TestEnv::mongo().await;
    let server = env.server_permissive();

    let form: Value = server
        .post("/api/admin/forms")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({
            "title": "Ping",
            "fields": [{ "id": "note", "label": "Note", "kind": "text" }]
        }))
        .await
        .json();
    let form_id = form["data"]["_id"].as_str().unwrap().to_string();

    server
        .post("/api/forms/ping/submissions")
        .json(&json!({ "answers": { "note": "hello" } }))
        .await
        .assert_status_ok();

    let path = format!("/api/admin/forms/{form_id}");
    server
        .delete(&path)
        .add_header(AUTHORIZATION, admin_bearer())
        .await
        .assert_status_ok();
    server
        .delete(&path)
        .add_header(AUTHORIZATION, admin_bearer())
        .await
        .assert_status_not_found();

    let remaining = env
        .state
        .repos
        .submissions
        .find_all(&Filter::new().eq("form_id", form_id.as_str()), &Sort::default())
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn partial_settings_update_is_merged_by_mongodb() {
    let env = TestEnv::mongo().await;
    let server = env.server();

    let form: Value = server
        .post("/api/admin/forms")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({
            "title": "Brief",
            "fields": [{ "id": "note", "label": "Note", "kind": "text" }],
            "settings": { "submit_label": "Send", "notify_email": "briefs@agency.test" }
        }))
        .await
        .json();
    let form_id = form["data"]["_id"].as_str().unwrap();

    server
        .put(&format!("/api/admin/forms/{form_id}"))
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({ "settings": { "is_active": false } }))
        .await;

    let stored = env.state.repos.forms.find_by_id(form_id).await.unwrap().unwrap();
    assert!(!stored.settings.is_active);
    assert_eq!(stored.settings.submit_label, "Send");
    assert_eq!(stored.settings.notify_email.as_deref(), Some("briefs@agency.test"));
}
