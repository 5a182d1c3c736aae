pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::query::Query;
use crate::state::{ConnectionConfig, NamedConfigEntry, SearchResult};

pub use http::HttpBackend;

/// Remote service executing searches and configuration reads/writes.
///
/// An `Err` is a rejected call; its display string is what the coordinators
/// show to the user.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn greet(&self, name: &str) -> Result<String>;
    async fn search_files(&self, request: &SearchRequest) -> Result<Vec<SearchResult>>;
    async fn test_connection(&self, db_config: &ConnectionConfig) -> Result<bool>;
    async fn get_configurations(&self, db_config: &ConnectionConfig) -> Result<Vec<NamedConfigEntry>>;
    async fn update_configuration(
        &self,
        db_config: &ConnectionConfig,
        key: &str,
        value: &str,
    ) -> Result<()>;
    /// Reveals a result's directory in the file manager on the service host.
    async fn open_directory(&self, directory_path: &str) -> Result<()>;
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_terms: Vec<String>,
    pub db_config: ConnectionConfig,
    pub use_and_logic: bool,
    pub search_in_filenames: bool,
}

impl SearchRequest {
    pub fn new(query: &Query, db_config: &ConnectionConfig) -> Self {
        Self {
            search_terms: query.terms.clone(),
            db_config: db_config.clone(),
            use_and_logic: query.use_and_logic(),
            search_in_filenames: query.search_in_filenames(),
        }
    }
}
