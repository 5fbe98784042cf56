//! HTTP client for the remote workflow authority

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use treasury_config::AuthorityConfig;
use treasury_core::{
    BulkActionRequest, CoreError, CoreResult, ListRequest, ListResponse, RecordUpdateRequest, ReviewAction,
    WorkflowEndpoint, WorkflowResponse,
};

use crate::error::ApiError;

/// JSON-over-HTTP [`WorkflowEndpoint`]
///
/// - `GET  {base}/{resource}` lists rows
/// - `POST {base}/{resource}/{action}` applies a bulk action
/// - `POST {base}/{resource}/update` updates one record
#[derive(Debug, Clone)]
pub struct HttpWorkflowEndpoint {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWorkflowEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client { message: e.to_string() })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AuthorityConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource: &str, suffix: Option<&str>) -> String {
        let resource = urlencoding::encode(resource);
        match suffix {
            Some(suffix) => format!("{}/{}/{}", self.base_url, resource, suffix),
            None => format!("{}/{}", self.base_url, resource),
        }
    }

    /// Send a request and decode the JSON body
    ///
    /// Error statuses with a JSON body are decoded like successes so the
    /// authority's message reaches the user; anything else is a transport failure.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> CoreResult<T> {
        let response = request.send().await.map_err(|e| {
            log::warn!(target: "treasury::http", "Workflow request failed: {}", e);
            CoreError::Network { message: e.to_string() }
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| CoreError::Network { message: e.to_string() })?;
        serde_json::from_slice(&body).map_err(|e| {
            log::warn!(target: "treasury::http", "Unreadable workflow response (HTTP {}): {}", status, e);
            CoreError::Network {
                message: format!("HTTP {}: {}", status, e),
            }
        })
    }
}

#[async_trait]
impl WorkflowEndpoint for HttpWorkflowEndpoint {
    async fn list(&self, request: &ListRequest) -> CoreResult<ListResponse> {
        let url = self.url(&request.resource, None);
        log::debug!(target: "treasury::http", "GET {}", url);
        self.send(self.client.get(&url)).await
    }

    async fn bulk_action(&self, action: ReviewAction, request: &BulkActionRequest) -> CoreResult<WorkflowResponse> {
        let url = self.url(&request.resource, Some(action.slug()));
        log::debug!(target: "treasury::http", "POST {} ({} ids)", url, request.ids.len());
        self.send(self.client.post(&url).json(request)).await
    }

    async fn update_record(&self, request: &RecordUpdateRequest) -> CoreResult<WorkflowResponse> {
        let url = self.url(&request.resource, Some("update"));
        log::debug!(target: "treasury::http", "POST {} (record {})", url, request.id);
        self.send(self.client.post(&url).json(request)).await
    }
}
