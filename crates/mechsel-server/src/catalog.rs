//! Catalog Store backends.
//!
//! Every backend answers the same question: which motors meet a
//! [`SelectionQuery`]. Filtering always goes through `SelectionQuery::admits`
//! so the backends cannot disagree on the threshold semantics.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use mechsel_core::config::CatalogLocation;
use mechsel_core::{CatalogFileError, MotorRecord, SelectionQuery};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    File(#[from] CatalogFileError),
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog service {url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("catalog service {url} returned invalid JSON: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Motors whose power and speed both meet the query.
    async fn find_motors(&self, query: &SelectionQuery) -> Result<Vec<MotorRecord>, CatalogError>;
}

fn filter(motors: Vec<MotorRecord>, query: &SelectionQuery) -> Vec<MotorRecord> {
    motors.into_iter().filter(|m| query.admits(m)).collect()
}

/// A fixed snapshot held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    motors: Vec<MotorRecord>,
}

impl MemoryCatalog {
    pub fn new(motors: Vec<MotorRecord>) -> Self {
        Self { motors }
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_motors(&self, query: &SelectionQuery) -> Result<Vec<MotorRecord>, CatalogError> {
        Ok(filter(self.motors.clone(), query))
    }
}

/// A JSON array file, re-read on every query so imports show up without a restart.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogStore for FileCatalog {
    async fn find_motors(&self, query: &SelectionQuery) -> Result<Vec<MotorRecord>, CatalogError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        let motors = mechsel_core::parse_catalog(&raw).map_err(|source| CatalogFileError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), total = motors.len(), "catalog file read");
        Ok(filter(motors, query))
    }
}

/// A remote catalog service answering `GET <url>` with a JSON array of motors.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Every record the service lists, unfiltered.
    pub async fn fetch_all(&self) -> Result<Vec<MotorRecord>, CatalogError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        let motors = mechsel_core::parse_catalog(&body).map_err(|source| CatalogError::Json {
            url: self.url.clone(),
            source,
        })?;
        debug!(url = %self.url, total = motors.len(), "catalog service answered");
        Ok(motors)
    }
}

#[async_trait]
impl CatalogStore for HttpCatalog {
    async fn find_motors(&self, query: &SelectionQuery) -> Result<Vec<MotorRecord>, CatalogError> {
        Ok(filter(self.fetch_all().await?, query))
    }
}

/// Open the backend a catalog location names.
pub fn open(location: &CatalogLocation, client: reqwest::Client) -> Arc<dyn CatalogStore> {
    match location {
        CatalogLocation::File(path) => Arc::new(FileCatalog::new(path.clone())),
        CatalogLocation::Http(url) => Arc::new(HttpCatalog::new(client, url.clone())),
    }
}
