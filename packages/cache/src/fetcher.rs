//! Collaborator interface for fetching rows from the remote datasource.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::request::{FetchRequest, FetchResponse};

/// Executes fetches against the remote datasource.
///
/// There is no cancel signal: the cache manager drops superseded responses
/// on arrival, so an implementation is free to let obsolete requests run to
/// completion.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}
