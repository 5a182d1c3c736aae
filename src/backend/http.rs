use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Backend, SearchRequest};
use crate::config::AppConfig;
use crate::state::{ConnectionConfig, NamedConfigEntry, SearchResult};

/// JSON-over-HTTP client for the search service: `POST {endpoint}/{operation}`.
pub struct HttpBackend {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GreetRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DbRequest<'a> {
    db_config: &'a ConnectionConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    db_config: &'a ConnectionConfig,
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenDirectoryRequest<'a> {
    directory_path: &'a str,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.backend_endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn invoke<B, T>(&self, operation: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), operation);
        debug!("invoke {} -> {}", operation, url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("{} request failed: {}", operation, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("{}: failed to read response: {}", operation, e))?;

        if !status.is_success() {
            return Err(anyhow!(rejection_message(operation, status, &text)));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text)
            .map_err(|e| anyhow!("{}: failed to parse response: {}", operation, e))
    }
}

/// The service rejects with its own message, either raw text or a JSON string.
fn rejection_message(operation: &str, status: reqwest::StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_string());
    if message.is_empty() {
        format!("{} returned {}", operation, status)
    } else {
        message
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn greet(&self, name: &str) -> Result<String> {
        self.invoke("greet", &GreetRequest { name }).await
    }

    async fn search_files(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        self.invoke("search_files", request).await
    }

    async fn test_connection(&self, db_config: &ConnectionConfig) -> Result<bool> {
        self.invoke("test_connection", &DbRequest { db_config }).await
    }

    async fn get_configurations(&self, db_config: &ConnectionConfig) -> Result<Vec<NamedConfigEntry>> {
        self.invoke("get_configurations", &DbRequest { db_config }).await
    }

    async fn update_configuration(
        &self,
        db_config: &ConnectionConfig,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.invoke("update_configuration", &UpdateRequest { db_config, key, value })
            .await
    }

    async fn open_directory(&self, directory_path: &str) -> Result<()> {
        self.invoke("open_directory", &OpenDirectoryRequest { directory_path })
            .await
    }
}
