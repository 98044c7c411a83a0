use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::error::ApiError;
use super::types::{ErrorBody, StatusDocument, SubmitRequest, SubmitResponse};

const USER_AGENT: &str = concat!("farmhand/", env!("CARGO_PKG_VERSION"));

/// Transport seam for submitting jobs and polling their status.
///
/// The polling state machine and the job-set fan-in are generic over this
/// trait, so tests can drive them with scripted status sources instead of
/// a live server.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Register a batch of jobs in a single round-trip.
    async fn submit_jobs(&self, req: &SubmitRequest) -> Result<SubmitResponse, ApiError>;

    /// Fetch the current status document for one submission.
    async fn fetch_status(&self, key: &str) -> Result<StatusDocument, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    token: String,
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client pointing at the given API base URL.
    pub fn new(base_url: String, token: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            token,
            client,
            base_url,
        }
    }

    /// Classify a non-2xx response: 400 is a distinct bad-request error and
    /// must never be retried; everything else is a generic API error.
    async fn error_for(response: reqwest::Response) -> ApiError {
        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .map(|body| body.message)
                .unwrap_or(raw);
            return ApiError::BadRequest { message };
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl JobApi for ApiClient {
    async fn submit_jobs(&self, req: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .bearer_auth(&self.token)
            .header("user-agent", USER_AGENT)
            .json(req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body = response.json::<SubmitResponse>().await?;
        Ok(body)
    }

    async fn fetch_status(&self, key: &str) -> Result<StatusDocument, ApiError> {
        let response = self
            .client
            .get(format!("{}/jobs/{key}/status", self.base_url))
            .bearer_auth(&self.token)
            .header("user-agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body = response.json::<StatusDocument>().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::JobPayload;
    use crate::job::JobKind;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(token: Uuid) -> SubmitRequest {
        SubmitRequest {
            jobs: vec![JobPayload {
                client_token: token,
                kind: JobKind::Build,
                git_repo: "https://git.example.com/kernel.git".into(),
                git_ref: Some("main".into()),
                git_sha: None,
                target_arch: "arm64".into(),
                toolchain: "gcc-12".into(),
                environment: Default::default(),
            }],
        }
    }

    #[tokio::test]
    async fn submit_sends_auth_and_parses_keys() {
        let server = MockServer::start().await;
        let token = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [{"client_token": token, "key": "k-1"}]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "secret".into());
        let resp = client.submit_jobs(&request(token)).await.unwrap();
        assert_eq!(resp.jobs.len(), 1);
        assert_eq!(resp.jobs[0].client_token, token);
        assert_eq!(resp.jobs[0].key, "k-1");
    }

    #[tokio::test]
    async fn submit_surfaces_bad_request_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "toolchain not supported"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "secret".into());
        let err = client
            .submit_jobs(&request(Uuid::new_v4()))
            .await
            .unwrap_err();
        match err {
            ApiError::BadRequest { message } => assert_eq!(message, "toolchain not supported"),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_surfaces_generic_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "secret".into());
        let err = client
            .submit_jobs(&request(Uuid::new_v4()))
            .await
            .unwrap_err();
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_status_parses_document_with_extras() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/k-9/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "building",
                "queue_position": 4
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), "secret".into());
        let doc = client.fetch_status("k-9").await.unwrap();
        assert_eq!(doc.state, "building");
        assert_eq!(doc.extra.get("queue_position").and_then(|v| v.as_u64()), Some(4));
    }
}
