//! In-memory Milvus client for testing.
//!
//! Serves a fixed set of collections, indexes and load states without any
//! network access, records every call, and can be told to fail a given
//! operation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{MilvusClient, Operation};
use crate::error::{Error, Result};
use crate::types::{CollectionInfo, IndexDescription, LoadingProgress};

/// A recorded call: the operation and the collection it targeted, if any.
pub type RecordedCall = (Operation, Option<String>);

/// Mock [`MilvusClient`] backed by in-memory data.
#[derive(Debug, Default)]
pub struct MockClient {
    collections: Vec<CollectionInfo>,
    indexes: HashMap<String, Vec<IndexDescription>>,
    progress: HashMap<String, f64>,
    failing: Option<(Operation, Option<String>)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection.
    pub fn with_collection(mut self, name: &str, id: i64) -> Self {
        self.collections.push(CollectionInfo::new(name, id));
        self
    }

    /// Add an index to a collection.
    pub fn with_index(mut self, collection: &str, index: IndexDescription) -> Self {
        self.indexes
            .entry(collection.to_string())
            .or_default()
            .push(index);
        self
    }

    /// Set the load progress of a collection (unset collections report 0).
    pub fn with_loading_progress(mut self, collection: &str, percent: f64) -> Self {
        self.progress.insert(collection.to_string(), percent);
        self
    }

    /// Fail every call of `operation`.
    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing = Some((operation, None));
        self
    }

    /// Fail calls of `operation` for one collection only.
    pub fn failing_for(mut self, operation: Operation, collection: &str) -> Self {
        self.failing = Some((operation, Some(collection.to_string())));
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made for one operation.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    fn record(&self, operation: Operation, collection: Option<&str>) -> Result<()> {
        self.calls
            .lock()
            .push((operation, collection.map(str::to_string)));

        match &self.failing {
            Some((op, target))
                if *op == operation
                    && (target.is_none() || target.as_deref() == collection) =>
            {
                Err(Error::Api {
                    operation,
                    code: 65535,
                    message: "injected failure".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl MilvusClient for MockClient {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        self.record(Operation::ListCollections, None)?;
        Ok(self.collections.clone())
    }

    async fn get_index_statistics(&self, collection_name: &str) -> Result<Vec<IndexDescription>> {
        self.record(Operation::GetIndexStatistics, Some(collection_name))?;
        Ok(self
            .indexes
            .get(collection_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_loading_progress(&self, collection_name: &str) -> Result<LoadingProgress> {
        self.record(Operation::GetLoadingProgress, Some(collection_name))?;
        Ok(LoadingProgress::new(
            self.progress.get(collection_name).copied().unwrap_or(0.0),
        ))
    }
}
