//! Scrape-time collector that runs metric producers against Milvus.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use milvus_client::SharedClient;
use tracing::debug;

use crate::config::PrometheusConfig;
use crate::error::Result;
use crate::mapping::{MetricDescriptor, Sample, render};
use crate::producers::{MetricProducer, default_producers};

/// Producers a collector runs, in order.
#[derive(Clone)]
pub struct CollectorConfig {
    producers: Vec<Arc<dyn MetricProducer>>,
}

impl CollectorConfig {
    /// Use an explicit producer list instead of the built-in one.
    pub fn with_producers(producers: Vec<Arc<dyn MetricProducer>>) -> Self {
        Self { producers }
    }

    /// Names of the registered producers.
    pub fn producer_names(&self) -> Vec<&'static str> {
        self.producers.iter().map(|p| p.name()).collect()
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::with_producers(default_producers())
    }
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("producers", &self.producer_names())
            .finish()
    }
}

/// Collects every producer's samples on demand.
///
/// Holds no state between scrapes: each call re-queries the service.
pub struct MilvusCollector {
    client: SharedClient,
    config: CollectorConfig,
}

impl MilvusCollector {
    pub fn new(client: SharedClient, config: CollectorConfig) -> Self {
        Self { client, config }
    }

    /// Collector running the built-in producers.
    pub fn with_defaults(client: SharedClient) -> Self {
        Self::new(client, CollectorConfig::default())
    }

    /// Client handle used for every scrape.
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// Statically known descriptors.
    ///
    /// Always empty: metric shapes depend on the collections and indexes
    /// present, so they are only known after a collect cycle.
    pub fn describe(&self) -> Vec<MetricDescriptor> {
        Vec::new()
    }

    /// Run every producer in order and concatenate their samples.
    ///
    /// The first producer error is returned and no samples are kept.
    pub async fn collect(&self) -> Result<Vec<Sample>> {
        let start = Instant::now();
        let mut samples = Vec::new();

        for producer in &self.config.producers {
            let produced = producer.produce(self.client.as_ref()).await?;
            debug!(
                producer = producer.name(),
                samples = produced.len(),
                "Producer finished"
            );
            samples.extend(produced);
        }

        debug!(
            samples = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Collect cycle finished"
        );

        Ok(samples)
    }

    /// Collect and render in the Prometheus text format.
    pub async fn scrape(&self, prometheus: &PrometheusConfig) -> Result<String> {
        let samples = self.collect().await?;
        Ok(render(&samples, prometheus))
    }
}

/// Thread-safe collector handle.
pub type SharedCollector = Arc<MilvusCollector>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::producers::{IndexProgress, LoadingProgress};
    use milvus_client::{IndexDescription, MockClient, Operation};

    fn sample_client() -> MockClient {
        MockClient::new()
            .with_collection("books", 1)
            .with_index(
                "books",
                IndexDescription::new("idx_a", 5, 10).with_param("index_type", "HNSW"),
            )
            .with_index("books", IndexDescription::new("idx_b", 10, 10))
            .with_loading_progress("books", 100.0)
    }

    #[tokio::test]
    async fn test_collect_no_collections() {
        let collector = MilvusCollector::with_defaults(Arc::new(MockClient::new()));
        assert!(collector.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_runs_producers_in_order() {
        let collector = MilvusCollector::with_defaults(Arc::new(sample_client()));

        let samples = collector.collect().await.unwrap();

        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0].name, "index_progress_percent");
        assert_eq!(samples[6].name, "loading_progress_percent");
    }

    #[tokio::test]
    async fn test_collect_error_returns_no_samples() {
        let client = sample_client().failing(Operation::GetLoadingProgress);
        let collector = MilvusCollector::with_defaults(Arc::new(client));

        let err = collector.collect().await.unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::Remote {
                producer: "loading_progress",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_first_error_stops_later_producers() {
        let client = Arc::new(sample_client().failing(Operation::GetIndexStatistics));
        let collector = MilvusCollector::with_defaults(client.clone());

        assert!(collector.collect().await.is_err());
        assert_eq!(client.call_count(Operation::GetLoadingProgress), 0);
    }

    #[tokio::test]
    async fn test_explicit_producer_list() {
        let producers: Vec<Arc<dyn MetricProducer>> = vec![Arc::new(LoadingProgress)];
        let config = CollectorConfig::with_producers(producers);
        let collector = MilvusCollector::new(Arc::new(sample_client()), config);

        let samples = collector.collect().await.unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 100.0);
    }

    #[tokio::test]
    async fn test_scrape_renders_each_series_once() {
        let producers: Vec<Arc<dyn MetricProducer>> = vec![Arc::new(IndexProgress)];
        let config = CollectorConfig::with_producers(producers);
        let collector = MilvusCollector::new(Arc::new(sample_client()), config);

        let body = collector
            .scrape(&PrometheusConfig::default())
            .await
            .unwrap();

        assert!(body.contains("# TYPE index_progress_percent gauge"));
        assert!(body.contains(
            "index_progress_percent{collection_name=\"books\",collection_id=\"1\",index_name=\"idx_a\",index_type=\"HNSW\",metric_type=\"\"} 50"
        ));
        assert_eq!(body.matches("collection_total_rows{").count(), 1);
    }

    #[test]
    fn test_describe_is_empty() {
        let collector = MilvusCollector::with_defaults(Arc::new(MockClient::new()));
        assert!(collector.describe().is_empty());
    }

    #[test]
    fn test_default_config_lists_builtin_producers() {
        assert_eq!(
            CollectorConfig::default().producer_names(),
            vec!["index_progress", "loading_progress"]
        );
    }
}
