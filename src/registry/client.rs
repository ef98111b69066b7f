//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Opt-in exponential backoff retry logic (no retries by default)
//! - Mapping of HTTP statuses onto backend error kinds

use crate::error::RegistryError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("bumpscout/", env!("CARGO_PKG_VERSION"));

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::unavailable("", "http", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_retries: 0,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Perform a GET request, retrying transient failures
    pub async fn get_with_context(
        &self,
        url: &str,
        package: &str,
        backend: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut delay = BASE_DELAY_MS;
        let mut attempt = 0;

        loop {
            let error = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        return Err(RegistryError::not_found(package, backend));
                    }
                    if status.is_success() {
                        return Ok(response);
                    }
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    let error = RegistryError::unavailable(package, backend, format!("HTTP {}", status));
                    if !retryable {
                        return Err(error);
                    }
                    error
                }
                Err(e) if e.is_timeout() => {
                    RegistryError::unavailable(package, backend, "request timed out")
                }
                Err(e) => RegistryError::unavailable(package, backend, e.to_string()),
            };

            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;
            debug!(package, attempt, "retrying after {}", error);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay *= 2;
        }
    }

    /// Perform a GET request and parse the JSON body
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        backend: &str,
    ) -> Result<T, RegistryError> {
        let response = self.get_with_context(url, package, backend).await?;
        response.json::<T>().await.map_err(|e| {
            RegistryError::unavailable(package, backend, format!("failed to parse JSON: {}", e))
        })
    }
}
