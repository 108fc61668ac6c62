//! HTTP client for the Reportdesk backend.
//!
//! Provides a minimal reqwest client with generic GET/POST helpers that map
//! failures onto [`BackendError`], and implements [`reportdesk_core::JobBackend`]
//! in the `api` module. The worker and CLI crates use this client directly.

pub mod api;

use anyhow::{Context, Result};
use reportdesk_core::backend::BackendResult;
use reportdesk_core::{BackendError, ClientConfig};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the report backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from loaded configuration. Requires `REPORTDESK_API_URL`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = config.require_api_base_url()?;
        Self::new(base_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request with query parameters. Returns the raw response for any status.
    async fn get_raw(&self, path: &str, query: &[(&str, String)]) -> BackendResult<Response> {
        let url = self.build_url(path);
        let mut request = self.client.get(&url);

        if !query.is_empty() {
            request = request.query(query);
        }

        request.send().await.map_err(network_error)
    }

    /// GET request with query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> BackendResult<T> {
        let response = self.get_raw(path, query).await?;
        decode_json(ensure_success(response).await?).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> BackendResult<T> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        decode_json(ensure_success(response).await?).await
    }

    /// Raw client for requests outside the base URL (presigned uploads, downloads).
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn network_error(err: reqwest::Error) -> BackendError {
    BackendError::Network(err.to_string())
}

/// Turn a non-success status into `BackendError::Http`, keeping the body for diagnostics.
pub(crate) async fn ensure_success(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(BackendError::Http {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let text = response.text().await.map_err(network_error)?;
    serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
}
