//! Metric producers.
//!
//! A producer turns one family of Milvus state into samples. Each one lists
//! collections itself and queries the service sequentially; the first remote
//! error aborts it.

use std::sync::Arc;

use async_trait::async_trait;
use milvus_client::{INDEX_TYPE_KEY, IndexDescription, METRIC_TYPE_KEY, MilvusClient};
use tracing::trace;

use crate::error::{Result, ScrapeError};
use crate::mapping::{MetricDescriptor, Sample};

const INDEX_LABELS: &[&str] = &[
    "collection_name",
    "collection_id",
    "index_name",
    "index_type",
    "metric_type",
];
const COLLECTION_LABELS: &[&str] = &["collection_name", "collection_id"];

pub const INDEX_PROGRESS_PERCENT: MetricDescriptor = MetricDescriptor::new(
    "index_progress_percent",
    "Index build progress in percent",
    INDEX_LABELS,
);

pub const INDEXED_ROWS: MetricDescriptor = MetricDescriptor::new(
    "indexed_rows",
    "Number of rows covered by the index",
    INDEX_LABELS,
);

pub const COLLECTION_TOTAL_ROWS: MetricDescriptor = MetricDescriptor::new(
    "collection_total_rows",
    "Total number of rows in the collection",
    COLLECTION_LABELS,
);

pub const LOADING_PROGRESS_PERCENT: MetricDescriptor = MetricDescriptor::new(
    "loading_progress_percent",
    "Collection load progress in percent",
    COLLECTION_LABELS,
);

/// A source of samples for one metric family group.
#[async_trait]
pub trait MetricProducer: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Query the service and return every sample, or the first error.
    async fn produce(&self, client: &dyn MilvusClient) -> Result<Vec<Sample>>;
}

/// The built-in producers, in registration order.
pub fn default_producers() -> Vec<Arc<dyn MetricProducer>> {
    vec![Arc::new(IndexProgress), Arc::new(LoadingProgress)]
}

/// Index build progress, indexed rows and total rows per index.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexProgress;

#[async_trait]
impl MetricProducer for IndexProgress {
    fn name(&self) -> &'static str {
        "index_progress"
    }

    async fn produce(&self, client: &dyn MilvusClient) -> Result<Vec<Sample>> {
        let collections = client
            .list_collections()
            .await
            .map_err(|e| ScrapeError::remote(self.name(), e))?;

        let mut samples = Vec::new();
        for collection in &collections {
            let indexes = client
                .get_index_statistics(&collection.name)
                .await
                .map_err(|e| ScrapeError::remote(self.name(), e))?;

            trace!(
                collection = %collection.name,
                indexes = indexes.len(),
                "Fetched index statistics"
            );

            let id = collection.id.to_string();
            for index in &indexes {
                let (index_type, metric_type) = index_kind(index);
                let labels = [
                    collection.name.as_str(),
                    id.as_str(),
                    index.index_name.as_str(),
                    index_type,
                    metric_type,
                ];

                samples.push(INDEX_PROGRESS_PERCENT.sample(progress_percent(index), &labels)?);
                samples.push(INDEXED_ROWS.sample(index.indexed_rows as f64, &labels)?);
                samples.push(
                    COLLECTION_TOTAL_ROWS
                        .sample(index.total_rows as f64, &[collection.name.as_str(), id.as_str()])?,
                );
            }
        }

        Ok(samples)
    }
}

/// Load progress per collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadingProgress;

#[async_trait]
impl MetricProducer for LoadingProgress {
    fn name(&self) -> &'static str {
        "loading_progress"
    }

    async fn produce(&self, client: &dyn MilvusClient) -> Result<Vec<Sample>> {
        let collections = client
            .list_collections()
            .await
            .map_err(|e| ScrapeError::remote(self.name(), e))?;

        let mut samples = Vec::with_capacity(collections.len());
        for collection in &collections {
            let progress = client
                .get_loading_progress(&collection.name)
                .await
                .map_err(|e| ScrapeError::remote(self.name(), e))?;

            let id = collection.id.to_string();
            samples.push(
                LOADING_PROGRESS_PERCENT
                    .sample(progress.percent, &[collection.name.as_str(), id.as_str()])?,
            );
        }

        Ok(samples)
    }
}

/// Extract `index_type` and `metric_type` from the index parameters.
///
/// Missing keys yield empty strings.
fn index_kind(index: &IndexDescription) -> (&str, &str) {
    let mut index_type = "";
    let mut metric_type = "";
    for param in &index.params {
        match param.key.as_str() {
            INDEX_TYPE_KEY => index_type = param.value.as_str(),
            METRIC_TYPE_KEY => metric_type = param.value.as_str(),
            _ => {}
        }
    }
    (index_type, metric_type)
}

/// Indexed rows as a percentage of total rows; an empty collection is 0%.
fn progress_percent(index: &IndexDescription) -> f64 {
    if index.total_rows == 0 {
        return 0.0;
    }
    index.indexed_rows as f64 / index.total_rows as f64 * 100.0
}
