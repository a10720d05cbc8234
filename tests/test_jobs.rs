mod common;

use axum::http::header::AUTHORIZATION;
use common::{admin_bearer, TestEnv};
use serde_json::{json, Value};

async fn create_job(server: &axum_test::TestServer, title: &str, status: &str) -> String {
    let body: Value = server
        .post("/api/admin/jobs")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({
            "title": title,
            "department": "Engineering",
            "location": "Remote",
            "status": status,
        }))
        .await
        .json();
    body["data"]["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn listing_without_database_is_empty_success() {
    let env = TestEnv::without_database();
    let server = env.server();

    let body: Value = server.get("/api/jobs").await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["total_count"], 0);
}

#[tokio::test]
async fn writes_without_database_are_unavailable() {
    let env = TestEnv::without_database();
    let server = env.server_permissive();

    let response = server
        .post("/api/admin/jobs")
        .add_header(AUTHORIZATION, admin_bearer())
        .json(&json!({ "title": "Dev", "department": "Eng", "location": "Remote" }))
        .await;
    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn public_listing_hides_drafts() {
    let env = TestEnv::memory();
    let server = env.server();

    create_job(&server, "Backend Engineer", "published").await;
    create_job(&server, "Secret Role", "draft").await;

    let body: Value = server.get("/api/jobs").await.json();
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|j| j["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Backend Engineer"]);
    assert_eq!(body["data"][0]["job_type"], "full-time");
}

#[tokio::test]
async fn application_is_stored_and_acknowledged() {
    let env = TestEnv::memory();
    let server = env.server();

    let job_id = create_job(&server, "Designer", "published").await;

    let body: Value = server
        .post(&format!("/api/jobs/{job_id}/apply"))
        .json(&json!({
            "name": "Ada Lovelace",
            "email": "Ada@Example.com",
            "cover_letter": "I like engines.",
        }))
        .await
        .json();
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert_eq!(body["data"]["job_title"], "Designer");

    let recipients = env.mailer.recipients();
    assert!(recipients.contains(&"ada@example.com".to_string()));
    assert!(recipients.contains(&"team@agency.test".to_string()));

    let applications: Value = server
        .get("/api/admin/applications")
        .add_query_param("job_id", &job_id)
        .add_header(AUTHORIZATION, admin_bearer())
        .await
        .json();
    assert_eq!(applications["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn applying_to_a_draft_job_is_not_found() {
    let env = TestEnv::memory();
    let server = env.server_permissive();

    let job_id = create_job(&server, "Not yet", "draft").await;

    server
        .post(&format!("/api/jobs/{job_id}/apply"))
        .json(&json!({ "name": "Ada", "email": "ada@example.com" }))
        .await
        .assert_status_not_found();
    assert!(env.mailer.recipients().is_empty());
}

#[tokio::test]
async fn invalid_application_lists_fields() {
    let env = TestEnv::memory();
    let server = env.server_permissive();

    let job_id = create_job(&server, "Writer", "published").await;

    let response = server
        .post(&format!("/api/jobs/{job_id}/apply"))
        .json(&json!({ "name": "", "email": "not-an-email" }))
        .await;
    response.assert_status_bad_request();

    let body: Value = response.json();
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["name", "email"]);
}

#[tokio::test]
async fn slow_job_listing_answers_gateway_timeout() {
    let env = TestEnv::with_hanging_jobs(50);
    let server = env.server_permissive();

    let response = server.get("/api/jobs").await;
    response.assert_status(axum::http::StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "TIMEOUT");
    assert_eq!(body["data"], json!([]));
}
