// ABOUTME: HTTP client for the assessment backend API
// ABOUTME: Handles profile and workflow reads, workflow actions, and error mapping

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::models::{
    AssessmentRequest, CertificationProfile, ExportResult, WorkflowDetail, WorkflowQuery,
};
use super::WorkflowApi;
use crate::error::{ConsoleError, Result};

pub struct RemoteClient {
    client: Client,
    api_base_url: Url,
}

fn parse_base_url(api_base_url: &str) -> Result<Url> {
    let url = Url::parse(api_base_url.trim_end_matches('/')).map_err(|e| {
        ConsoleError::Config(format!("Invalid API base URL '{}': {}", api_base_url, e))
    })?;
    if url.cannot_be_a_base() {
        return Err(ConsoleError::Config(format!(
            "API base URL '{}' cannot carry a path",
            api_base_url
        )));
    }
    Ok(url)
}

impl RemoteClient {
    pub fn new(api_base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: parse_base_url(&api_base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.as_str()
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConsoleError::Config(format!("Invalid API base URL '{}'", self.api_base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            return Err(ConsoleError::Http { status, body });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| ConsoleError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WorkflowApi for RemoteClient {
    async fn fetch_certification_profiles(&self) -> Result<Vec<CertificationProfile>> {
        let url = self.url(&["certifications"])?;
        debug!(%url, "fetching certification profiles");
        self.send_json(self.client.get(url)).await
    }

    async fn fetch_certification_profile(&self, id: &str) -> Result<CertificationProfile> {
        let url = self.url(&["certifications", id])?;
        match self.send_json(self.client.get(url)).await {
            Err(ConsoleError::Http { status: 404, .. }) => Err(ConsoleError::NotFound(format!(
                "certification profile {}",
                id
            ))),
            other => other,
        }
    }

    async fn fetch_workflows(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowDetail>> {
        let url = self.url(&["workflows"])?;
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(status) = query.status_filter {
            params.push(("status_filter", status.to_string()));
        }
        debug!(%url, ?params, "fetching workflows");
        self.send_json(self.client.get(url).query(&params)).await
    }

    async fn fetch_workflow_detail(&self, id: &str) -> Result<Option<WorkflowDetail>> {
        let url = self.url(&["workflows", id])?;
        debug!(%url, "fetching workflow detail");
        let response = match self.send(self.client.get(url)).await {
            Err(ConsoleError::Http { status: 404, .. }) => return Ok(None),
            other => other?,
        };
        // A null body is the backend's other way of saying "no such workflow".
        response
            .json::<Option<WorkflowDetail>>()
            .await
            .map_err(|e| ConsoleError::Decode(e.to_string()))
    }

    async fn retry_workflow(&self, id: &str) -> Result<WorkflowDetail> {
        let url = self.url(&["workflows", id, "retry"])?;
        self.send_json(self.client.post(url)).await
    }

    async fn manual_process_workflow(&self, id: &str) -> Result<()> {
        let url = self.url(&["workflows", id, "manual-process"])?;
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn auto_progress_workflow(&self, id: &str) -> Result<()> {
        let url = self.url(&["workflows", id, "auto-progress"])?;
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    async fn request_assessment_workflow(
        &self,
        request: &AssessmentRequest,
    ) -> Result<WorkflowDetail> {
        let url = self.url(&["workflows", "assessment"])?;
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn export_gap_analysis_to_sheets(&self, workflow_id: &str) -> Result<ExportResult> {
        let url = self.url(&["workflows", workflow_id, "export", "sheets"])?;
        self.send_json(self.client.post(url)).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::models::ExecutionStatus;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// One-shot HTTP server: answers the first request with `status` and `body`
    /// and hands back the request line it saw.
    async fn serve(status: u16, body: &'static str) -> (RemoteClient, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let request = String::from_utf8_lossy(&received);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(request_line);

            let response = format!(
                "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        // Bypass any proxy configured in the environment for the loopback server.
        let client = RemoteClient {
            client: Client::builder().no_proxy().build().unwrap(),
            api_base_url: parse_base_url(&format!("http://{}/api/v1/", addr)).unwrap(),
        };
        (client, rx)
    }

    const WORKFLOW_JSON: &str = r#"{
        "id": "wf-1",
        "user_id": "u-1",
        "certification_profile_id": "cp-1",
        "execution_status": "in_progress",
        "current_step": "generate_questions",
        "progress": 40,
        "step_execution_log": [],
        "error_message": null
    }"#;

    #[test]
    fn test_client_creation() {
        let client = RemoteClient::new(
            "https://api.example.com".to_string(),
            Duration::from_secs(30),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_base_url_is_a_config_error() {
        let result = RemoteClient::new("not a url".to_string(), Duration::from_secs(5));
        assert!(matches!(result, Err(ConsoleError::Config(_))));
        assert!(matches!(
            parse_base_url("mailto:ops@example.com"),
            Err(ConsoleError::Config(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            RemoteClient::new("http://localhost:8000/api/v1/".to_string(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(
            client.url(&["workflows", "wf-1", "retry"]).unwrap().as_str(),
            "http://localhost:8000/api/v1/workflows/wf-1/retry"
        );
    }

    #[test]
    fn test_ids_are_percent_encoded_as_one_segment() {
        let client =
            RemoteClient::new("http://localhost:8000/api/v1".to_string(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.url(&["workflows", "a/b?c#d", "retry"]).unwrap().as_str(),
            "http://localhost:8000/api/v1/workflows/a%2Fb%3Fc%23d/retry"
        );
    }

    #[tokio::test]
    async fn test_detail_request_path_is_encoded_on_the_wire() {
        let (client, request) = serve(200, WORKFLOW_JSON).await;
        client.fetch_workflow_detail("team/42?x").await.unwrap();
        assert_eq!(
            request.await.unwrap(),
            "GET /api/v1/workflows/team%2F42%3Fx HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_workflow_detail_decodes() {
        let (client, _) = serve(200, WORKFLOW_JSON).await;
        let detail = client.fetch_workflow_detail("wf-1").await.unwrap().unwrap();
        assert_eq!(detail.execution_status, ExecutionStatus::InProgress);
        assert_eq!(detail.progress, 40);
    }

    #[tokio::test]
    async fn test_detail_404_is_none() {
        let (client, _) = serve(404, r#"{"detail": "Workflow not found"}"#).await;
        assert!(client.fetch_workflow_detail("wf-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detail_null_body_is_none() {
        let (client, _) = serve(200, "null").await;
        assert!(client.fetch_workflow_detail("wf-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_404_is_not_found() {
        let (client, _) = serve(404, r#"{"detail": "missing"}"#).await;
        let err = client.fetch_certification_profile("cp-9").await.unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound(ref what) if what.contains("cp-9")));
    }

    #[tokio::test]
    async fn test_error_status_keeps_json_body() {
        let (client, _) = serve(422, r#"{"detail": "Workflow is not in a failed state"}"#).await;
        let err = client.retry_workflow("wf-1").await.unwrap_err();
        match &err {
            ConsoleError::Http { status, body } => {
                assert_eq!(*status, 422);
                assert_eq!(body["detail"], "Workflow is not in a failed state");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
        assert_eq!(err.backend_message(), Some("Workflow is not in a failed state"));
    }

    #[tokio::test]
    async fn test_error_status_with_text_body_is_kept_as_string() {
        let (client, _) = serve(502, "upstream exploded").await;
        let err = client.manual_process_workflow("wf-1").await.unwrap_err();
        match err {
            ConsoleError::Http { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, serde_json::Value::String("upstream exploded".to_string()));
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let (client, _) = serve(200, r#"{"unexpected": true}"#).await;
        let err = client.fetch_certification_profiles().await.unwrap_err();
        assert!(matches!(err, ConsoleError::Decode(_)));
    }

    #[tokio::test]
    async fn test_list_query_carries_limit_and_filter() {
        let (client, request) = serve(200, "[]").await;
        let query = WorkflowQuery {
            status_filter: Some(ExecutionStatus::Failed),
            limit: 10,
        };
        assert!(client.fetch_workflows(&query).await.unwrap().is_empty());
        assert_eq!(
            request.await.unwrap(),
            "GET /api/v1/workflows?limit=10&status_filter=failed HTTP/1.1"
        );
    }
}
