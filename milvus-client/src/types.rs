use serde::{Deserialize, Serialize};

/// Parameter key carrying the index algorithm (e.g. "HNSW", "IVF_FLAT").
pub const INDEX_TYPE_KEY: &str = "index_type";

/// Parameter key carrying the distance metric (e.g. "L2", "COSINE").
pub const METRIC_TYPE_KEY: &str = "metric_type";

/// A collection as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,

    /// Numeric collection identifier.
    pub id: i64,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// A single key/value parameter attached to an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParam {
    pub key: String,
    pub value: String,
}

impl IndexParam {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Build statistics for one index of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    /// Index name.
    pub index_name: String,

    /// Number of rows already covered by the index.
    pub indexed_rows: i64,

    /// Number of rows in the collection.
    pub total_rows: i64,

    /// Index parameters in the order the service returned them.
    #[serde(default)]
    pub params: Vec<IndexParam>,
}

impl IndexDescription {
    /// Create an index description without parameters.
    pub fn new(index_name: impl Into<String>, indexed_rows: i64, total_rows: i64) -> Self {
        Self {
            index_name: index_name.into(),
            indexed_rows,
            total_rows,
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(IndexParam::new(key, value));
        self
    }
}

/// Load progress of a collection into query nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadingProgress {
    /// Percentage in the range 0-100.
    pub percent: f64,
}

impl LoadingProgress {
    pub fn new(percent: f64) -> Self {
        Self { percent }
    }
}
