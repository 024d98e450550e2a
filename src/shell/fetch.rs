//! Network access for the shell controller.
//!
//! `Fetcher` is the seam tests mock; `HttpFetcher` is the reqwest-backed
//! implementation used against the upstream shell origin.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;

use super::{ShellRequest, ShellResponse};

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("reading response from {url} failed: {message}")]
    Body { url: String, message: String },
}

/// Performs a request against the network, bypassing any cache.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`NetworkError`] if no response could be obtained. A response
    /// with a non-2xx status is still `Ok`.
    async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, NetworkError>;
}

// =============================================================================
// HTTP FETCHER
// =============================================================================

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`NetworkError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| NetworkError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, NetworkError> {
        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| NetworkError::Request {
            url: request.url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(|e| NetworkError::Body {
            url: request.url.to_string(),
            message: e.to_string(),
        })?;

        Ok(ShellResponse { status, content_type, body: body.to_vec() })
    }
}
