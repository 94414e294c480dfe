//! Collection filtering by glob pattern.

use async_trait::async_trait;
use glob::{Pattern, PatternError};
use milvus_client::{CollectionInfo, IndexDescription, LoadingProgress, MilvusClient};
use tracing::trace;

use crate::config::FilterConfig;

/// Compiled include/exclude patterns for collection names.
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl CollectionFilter {
    /// Compile the patterns of a filter configuration.
    pub fn new(config: &FilterConfig) -> Result<Self, PatternError> {
        Ok(Self {
            include: compile(&config.include_collections)?,
            exclude: compile(&config.exclude_collections)?,
        })
    }

    /// True when the filter passes every collection.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Check whether a collection should be exported.
    ///
    /// An empty include list admits everything; exclusion wins over inclusion.
    pub fn matches(&self, name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(name)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(name))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p)).collect()
}

/// A [`MilvusClient`] that hides collections rejected by a filter.
///
/// Only `list_collections` is filtered; per-collection calls pass through.
#[derive(Debug)]
pub struct FilteredClient<C> {
    inner: C,
    filter: CollectionFilter,
}

impl<C: MilvusClient> FilteredClient<C> {
    pub fn new(inner: C, filter: CollectionFilter) -> Self {
        Self { inner, filter }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: MilvusClient> MilvusClient for FilteredClient<C> {
    async fn list_collections(&self) -> milvus_client::Result<Vec<CollectionInfo>> {
        let mut collections = self.inner.list_collections().await?;
        collections.retain(|c| {
            let keep = self.filter.matches(&c.name);
            if !keep {
                trace!(collection = %c.name, "Collection filtered out");
            }
            keep
        });
        Ok(collections)
    }

    async fn get_index_statistics(
        &self,
        collection_name: &str,
    ) -> milvus_client::Result<Vec<IndexDescription>> {
        self.inner.get_index_statistics(collection_name).await
    }

    async fn get_loading_progress(
        &self,
        collection_name: &str,
    ) -> milvus_client::Result<LoadingProgress> {
        self.inner.get_loading_progress(collection_name).await
    }
}
