//! Remote directory and search services
//!
//! The core only depends on the [`DirectoryService`] and [`SearchService`]
//! traits. [`HttpPoiClient`] is the reqwest implementation speaking:
//!
//! ```text
//! GET  {base}/directory          -> [PoiRecord]
//! POST {base}/directory  record  -> [PoiRecord]   (full updated directory)
//! GET  {base}/search?query=q     -> [Candidate]
//! ```
//!
//! Any non-2xx status is a failure; its body message is preserved.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::errors::{PoiError, Result};
use crate::model::{Candidate, Directory, PoiRecord};
use crate::retry::{RetryClassifiable, execute_with_backoff};

/// Errors from the HTTP transport.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, timeout or body read failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    /// Body was not the expected JSON shape.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl RemoteError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl RetryClassifiable for RemoteError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Parse(_) => false,
        }
    }
}

#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Fetch the authoritative directory.
    async fn fetch_directory(&self) -> std::result::Result<Directory, RemoteError>;

    /// Persist one new record; the service answers with the full directory.
    async fn persist_record(
        &self,
        record: &PoiRecord,
    ) -> std::result::Result<Directory, RemoteError>;
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str) -> std::result::Result<Vec<Candidate>, RemoteError>;
}

/// Error bodies come in a few shapes; take whichever message is present.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// reqwest-backed client for one service base URL.
#[derive(Debug, Clone)]
pub struct HttpPoiClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl HttpPoiClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoiError::config_with_source("failed to build HTTP client", e))?;
        Ok(Self::with_client(client, base_url, retry))
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client, base_url: &str, retry: RetryConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get_directory_once(&self) -> std::result::Result<Directory, RemoteError> {
        let resp = self.client.get(self.url("directory")).send().await?;
        read_json(resp).await
    }

    async fn search_once(&self, query: &str) -> std::result::Result<Vec<Candidate>, RemoteError> {
        let resp = self
            .client
            .get(self.url("search"))
            .query(&[("query", query)])
            .send()
            .await?;
        read_json(resp).await
    }
}

async fn read_json<T>(resp: reqwest::Response) -> std::result::Result<T, RemoteError>
where
    T: serde::de::DeserializeOwned,
{
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            message: error_message(&body, status),
        });
    }

    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| RemoteError::Parse(e.to_string()))
}

fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.error.or(parsed.message)
    {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl DirectoryService for HttpPoiClient {
    async fn fetch_directory(&self) -> std::result::Result<Directory, RemoteError> {
        execute_with_backoff(|| self.get_directory_once(), &self.retry, "fetch_directory").await
    }

    async fn persist_record(
        &self,
        record: &PoiRecord,
    ) -> std::result::Result<Directory, RemoteError> {
        let resp = self
            .client
            .post(self.url("directory"))
            .json(record)
            .send()
            .await?;
        read_json(resp).await
    }
}

#[async_trait]
impl SearchService for HttpPoiClient {
    async fn search(&self, query: &str) -> std::result::Result<Vec<Candidate>, RemoteError> {
        execute_with_backoff(|| self.search_once(query), &self.retry, "search").await
    }
}
