use async_trait::async_trait;
use perkdir_client::{PerkRecord, RemoteSessionClient};
use thiserror::Error;

use crate::state::FilterQuery;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("directory query failed: {0}")]
    Query(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Server seam of the directory page. The production implementation talks to
/// the live API; controller tests substitute mocks here.
#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    /// Fetches the records matching `query`. Both filter dimensions travel
    /// in the one query and compose server-side (logical AND).
    async fn fetch(&self, query: &FilterQuery) -> BackendResult<Vec<PerkRecord>>;
}

pub struct ClientDirectoryBackend {
    client: RemoteSessionClient,
}

impl ClientDirectoryBackend {
    pub fn new(client: RemoteSessionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectoryBackend for ClientDirectoryBackend {
    async fn fetch(&self, query: &FilterQuery) -> BackendResult<Vec<PerkRecord>> {
        self.client
            .search_perks(query.name_substring.as_deref(), query.merchant.as_deref())
            .await
            .map_err(|error| BackendError::Query(error.to_string()))
    }
}
