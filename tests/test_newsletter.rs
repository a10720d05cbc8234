mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{admin_bearer, TestEnv};
use serde_json::{json, Value};

async fn subscriber_count(server: &axum_test::TestServer) -> u64 {
    let body: Value = server
        .get("/api/admin/newsletter/subscribers")
        .add_header(AUTHORIZATION, admin_bearer())
        .await
        .json();
    body["pagination"]["total_count"].as_u64().unwrap()
}

#[tokio::test]
async fn subscribing_twice_is_a_conflict() {
    let env = TestEnv::memory();
    let server = env.server_permissive();

    server
        .post("/api/newsletter")
        .json(&json!({ "email": "reader@example.com" }))
        .await
        .assert_status_ok();
    assert_eq!(subscriber_count(&server).await, 1);

    let again = server
        .post("/api/newsletter")
        .json(&json!({ "email": "Reader@Example.com " }))
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(subscriber_count(&server).await, 1);
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let env = TestEnv::memory();
    let server = env.server_permissive();

    let response = server
        .post("/api/newsletter")
        .json(&json!({ "email": "nope" }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn unsubscribe_then_resubscribe() {
    let env = TestEnv::memory();
    let server = env.server();

    server
        .post("/api/newsletter")
        .json(&json!({ "email": "reader@example.com" }))
        .await;

    let body: Value = server
        .post("/api/newsletter/unsubscribe")
        .json(&json!({ "email": "reader@example.com" }))
        .await
        .json();
    assert_eq!(body["data"]["is_active"], false);

    // Idempotent.
    server
        .post("/api/newsletter/unsubscribe")
        .json(&json!({ "email": "reader@example.com" }))
        .await;

    let body: Value = server
        .post("/api/newsletter")
        .json(&json!({ "email": "reader@example.com" }))
        .await
        .json();
    assert_eq!(body["data"]["is_active"], true);
    assert_eq!(body["data"]["unsubscribed_at"], Value::Null);
    assert_eq!(subscriber_count(&server).await, 1);
}

#[tokio::test]
async fn unsubscribing_an_unknown_address_is_not_found() {
    let env = TestEnv::memory();
    let server = env.server_permissive();

    server
        .post("/api/newsletter/unsubscribe")
        .json(&json!({ "email": "ghost@example.com" }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn broadcast_reaches_active_subscribers_only() {
    let env = TestEnv::memory();
    let server = env.server();

    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        server.post("/api/newsletter").json(&json!({ "email": email })).await;
    }
    server
        .post("/api/newsletter/unsubscribe")
        .json(&json!({ "email": "b@example.com" }))
        .await;

    let body: Value = server
        .post("/api/admin/newsletter/broadcast")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({ "subject": "June news", "content": "# Hello\n\nWe shipped." }))
        .await
        .json();
    assert_eq!(body["data"]["recipients"], 2);
    assert_eq!(body["data"]["sent"], 2);
    assert_eq!(body["data"]["failed"], 0);

    let issue_recipients: Vec<String> = env
        .mailer
        .recipients()
        .into_iter()
        .zip(env.mailer.subjects())
        .filter(|(_, subject)| subject == "June news")
        .map(|(to, _)| to)
        .collect();
    assert_eq!(issue_recipients.len(), 2);
    assert!(!issue_recipients.contains(&"b@example.com".to_string()));

    let campaigns: Value = server
        .get("/api/admin/newsletter/campaigns")
        .add_header(AUTHORIZATION, admin_bearer())
        .await
        .json();
    assert_eq!(campaigns["data"][0]["subject"], "June news");
}

#[tokio::test]
async fn admin_delete_removes_the_subscriber() {
    let env = TestEnv::memory();
    let server = env.server_permissive();

    let body: Value = server
        .post("/api/newsletter")
        .json(&json!({ "email": "gone@example.com" }))
        .await
        .json();
    let id = body["data"]["_id"].as_str().unwrap();
    let path = format!("/api/admin/newsletter/subscribers/{id}");

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
    assert_eq!(subscriber_count(&server).await, 0);
}
