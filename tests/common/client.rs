use std::time::Duration;

use serde_json::{json, Value};

/// Thin HTTP client over the test server's JSON API.
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn home(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("GET /")
    }

    pub async fn search(&self, query: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/search", self.base_url))
            .json(&json!({ "query": query }))
            .send()
            .await
            .expect("POST /v1/search")
    }

    pub async fn search_with_body(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/search", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("POST /v1/search")
    }

    pub async fn download(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/download", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("POST /v1/download")
    }

    pub async fn get_download(&self, job_id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/v1/download/{}", self.base_url, job_id))
            .send()
            .await
            .expect("GET /v1/download/{id}")
    }

    pub async fn list_downloads(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/v1/downloads", self.base_url))
            .send()
            .await
            .expect("GET /v1/downloads")
    }

    pub async fn cancel_download(&self, job_id: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/download/{}/cancel", self.base_url, job_id))
            .send()
            .await
            .expect("POST /v1/download/{id}/cancel")
    }

    /// Poll a job until it reaches a terminal state (or give up).
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        for _ in 0..500 {
            let response = self.get_download(job_id).await;
            assert_eq!(response.status(), 200, "job {} disappeared mid-poll", job_id);
            let snapshot: Value = response.json().await.expect("snapshot json");
            let state = snapshot["state"].as_str().unwrap_or_default().to_string();
            if state == "COMPLETE" || state == "FAILED" {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }
}
