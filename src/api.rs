//! Mock API client
//!
//! Fetches the user and message collections from their JSON endpoints. A
//! failed fetch surfaces as an error value rather than an empty collection,
//! so callers can tell "no data" apart from "fetch failed"; the orchestrator
//! decides how to proceed.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{EtlError, Result};
use crate::models::{ApiMessage, ApiUser};

/// Client for the two mock API endpoints
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Build a client from endpoint configuration. The configured header map
    /// is attached to every request.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(build_headers(&config.headers)?)
            .build()?;
        Ok(Self { http, config })
    }

    /// Fetch the full user collection
    pub async fn fetch_users(&self) -> Result<Vec<ApiUser>> {
        self.fetch_collection(&self.config.users_endpoint).await
    }

    /// Fetch the full message collection
    pub async fn fetch_messages(&self) -> Result<Vec<ApiMessage>> {
        self.fetch_collection(&self.config.messages_endpoint).await
    }

    async fn fetch_collection<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        debug!(endpoint, "Fetching collection");
        let response = self.http.get(endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let records: Vec<T> = response.json().await?;
        info!(endpoint, count = records.len(), "Fetched collection");
        Ok(records)
    }
}

fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| EtlError::InvalidConfig(format!("Invalid header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| EtlError::InvalidConfig(format!("Invalid header value: {err}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
