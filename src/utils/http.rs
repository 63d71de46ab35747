// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::FetchConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &FetchConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a client for bulk downloads.
///
/// No limit on the whole request: a large body may take as long as it
/// needs while data keeps arriving. Connecting and each read are still
/// bounded by `timeout_secs`.
pub fn create_download_client(config: &FetchConfig) -> Result<Client> {
    let stall = Duration::from_secs(config.timeout_secs);
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(stall)
        .read_timeout(stall)
        .build()?;
    Ok(client)
}

/// Source of JSON documents addressed by URL.
///
/// A non-success status is reported as [`AppError::Status`]; a body that is
/// not JSON as [`AppError::Json`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &Url) -> Result<Value> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::status(url.as_str(), status.as_u16()));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
