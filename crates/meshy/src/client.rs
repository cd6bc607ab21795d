//! REST client for the Meshy text-to-3D API.

use std::time::Duration;

use async_trait::async_trait;

use crate::service::GenerationService;
use crate::task::{CreateResponse, GenerationTask, TaskRequest};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.meshy.ai";

/// Per-request timeout for create and poll calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const TEXT_TO_3D_PATH: &str = "/openapi/v2/text-to-3d";

/// Errors from the generation API layer.
#[derive(Debug, thiserror::Error)]
pub enum MeshyError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Meshy API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// HTTP client for the Meshy API.
pub struct MeshyClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MeshyClient {
    /// Build a client with the standard request timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, MeshyError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{TEXT_TO_3D_PATH}", self.base_url)
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, MeshyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MeshyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MeshyError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerationService for MeshyClient {
    async fn create(&self, request: &TaskRequest) -> Result<String, MeshyError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request.to_payload())
            .send()
            .await?;

        let created: CreateResponse = Self::parse_response(response).await?;
        tracing::debug!(mode = request.mode(), task_id = %created.result, "Generation task created");
        Ok(created.result)
    }

    async fn get(&self, task_id: &str) -> Result<GenerationTask, MeshyError> {
        let response = self
            .client
            .get(format!("{}/{task_id}", self.endpoint()))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
