//! End-to-end tests for the download job API.

mod common;

use common::{StubBehavior, TestClient, TestServer};
use serde_json::json;

fn candidate_body() -> serde_json::Value {
    json!({
        "candidate": {
            "id": "vid-1",
            "kind": "song",
            "title": "Nothing Matters",
            "artist": "Vince Staples",
            "album": "Dark Times",
            "duration_secs": 201
        }
    })
}

#[tokio::test]
async fn download_candidate_reaches_complete() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(candidate_body()).await;
    assert_eq!(response.status(), 202);
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();
    assert!(!job_id.is_empty());

    let snapshot = client.wait_for_terminal(&job_id).await;
    assert_eq!(snapshot["state"], "COMPLETE");
    assert!(snapshot["message"]
        .as_str()
        .unwrap()
        .starts_with("Done: "));

    let file_path = snapshot["file_path"].as_str().unwrap();
    assert!(file_path.ends_with("Nothing Matters.m4a"));
    assert!(std::path::Path::new(file_path).exists());
    assert!(file_path.starts_with(server.downloads_dir.path().to_str().unwrap()));
}

#[tokio::test]
async fn download_by_query_resolves_first_result() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(json!({ "query": "vince staples" })).await;
    assert_eq!(response.status(), 202);
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let snapshot = client.wait_for_terminal(&job_id).await;
    assert_eq!(snapshot["state"], "COMPLETE");
    // First fixed candidate wins.
    assert_eq!(snapshot["title"], "Nothing Matters");
}

#[tokio::test]
async fn download_by_query_with_no_results_fails() {
    let server = TestServer::spawn_with(StubBehavior::EmptySearch).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(json!({ "query": "vince staples" })).await;
    assert_eq!(response.status(), 202);
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let snapshot = client.wait_for_terminal(&job_id).await;
    assert_eq!(snapshot["state"], "FAILED");
    assert_eq!(snapshot["error"]["kind"], "search_failed");
}

#[tokio::test]
async fn failed_fetch_reports_fetch_error_without_path() {
    let server = TestServer::spawn_with(StubBehavior::FailingFetch).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(candidate_body()).await;
    assert_eq!(response.status(), 202);
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let snapshot = client.wait_for_terminal(&job_id).await;
    assert_eq!(snapshot["state"], "FAILED");
    assert_eq!(snapshot["error"]["kind"], "fetch_error");
    assert!(snapshot["file_path"].is_null());
    assert!(snapshot["message"].as_str().unwrap().starts_with("Failed: "));
}

#[tokio::test]
async fn failed_tagging_still_completes_with_warning() {
    let server = TestServer::spawn_with(StubBehavior::FailingTags).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(candidate_body()).await;
    assert_eq!(response.status(), 202);
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let snapshot = client.wait_for_terminal(&job_id).await;
    assert_eq!(snapshot["state"], "COMPLETE");
    assert!(!snapshot["file_path"].is_null());
    assert!(snapshot["warning"]
        .as_str()
        .unwrap()
        .contains("tag write failed"));
    assert!(snapshot["message"]
        .as_str()
        .unwrap()
        .contains("tag write failed"));
}

#[tokio::test]
async fn polling_unknown_job_id_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_download("aaaaaaaa-0000-0000-0000-000000000000").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn downloads_list_contains_submitted_jobs() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(candidate_body()).await;
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();
    client.wait_for_terminal(&job_id).await;

    let response = client.list_downloads().await;
    assert_eq!(response.status(), 200);
    let listed: serde_json::Value = response.json().await.unwrap();
    let listed = listed.as_array().unwrap();
    assert!(listed.iter().any(|s| s["id"] == job_id.as_str()));
}

#[tokio::test]
async fn download_without_target_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(json!({})).await;
    assert_eq!(response.status(), 400);

    let response = client.download(json!({ "query": "   " })).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn cancel_of_finished_job_conflicts() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.download(candidate_body()).await;
    let accepted: serde_json::Value = response.json().await.unwrap();
    let job_id = accepted["job_id"].as_str().unwrap().to_string();
    client.wait_for_terminal(&job_id).await;

    let response = client.cancel_download(&job_id).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn cancel_of_unknown_job_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.cancel_download("no-such-job").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn concurrent_downloads_complete_independently() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let mut job_ids = Vec::new();
    for i in 0..4 {
        let body = json!({
            "candidate": {
                "id": format!("vid-{}", i),
                "kind": "song",
                "title": format!("Track {}", i),
                "artist": "Vince Staples",
                "album": "Dark Times",
            }
        });
        let response = client.download(body).await;
        assert_eq!(response.status(), 202);
        let accepted: serde_json::Value = response.json().await.unwrap();
        job_ids.push(accepted["job_id"].as_str().unwrap().to_string());
    }

    for job_id in &job_ids {
        let snapshot = client.wait_for_terminal(job_id).await;
        assert_eq!(snapshot["state"], "COMPLETE", "job {} failed", job_id);
    }

    let unique: std::collections::HashSet<_> = job_ids.iter().collect();
    assert_eq!(unique.len(), 4);
}
