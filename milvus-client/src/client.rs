//! The read-only Milvus operations the exporter depends on.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CollectionInfo, IndexDescription, LoadingProgress};

/// Remote operations exposed by [`MilvusClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCollections,
    GetIndexStatistics,
    GetLoadingProgress,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListCollections => "ListCollections",
            Operation::GetIndexStatistics => "GetIndexStatistics",
            Operation::GetLoadingProgress => "GetLoadingProgress",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to collection, index and load status of a Milvus instance.
///
/// Implementations must be safe to share between concurrent scrapes: every
/// scrape issues its own independent sequence of calls against the same
/// handle.
#[async_trait]
pub trait MilvusClient: Send + Sync {
    /// List all collections with their numeric ids.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Describe every index of a collection, including build progress.
    async fn get_index_statistics(&self, collection_name: &str) -> Result<Vec<IndexDescription>>;

    /// Get the load progress of a collection.
    async fn get_loading_progress(&self, collection_name: &str) -> Result<LoadingProgress>;
}

/// A shareable client handle.
pub type SharedClient = Arc<dyn MilvusClient>;

#[async_trait]
impl<C: MilvusClient + ?Sized> MilvusClient for Arc<C> {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        (**self).list_collections().await
    }

    async fn get_index_statistics(&self, collection_name: &str) -> Result<Vec<IndexDescription>> {
        (**self).get_index_statistics(collection_name).await
    }

    async fn get_loading_progress(&self, collection_name: &str) -> Result<LoadingProgress> {
        (**self).get_loading_progress(collection_name).await
    }
}
