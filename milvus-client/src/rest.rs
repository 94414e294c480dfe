//! [`MilvusClient`] over the Milvus RESTful API (v2).
//!
//! Every endpoint is a `POST` with a JSON body and answers with an envelope
//! `{"code": 0, "data": ..., "message": ...}`. A non-zero code is an API
//! error even when the HTTP status is 200.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::trace;

use crate::client::{MilvusClient, Operation};
use crate::config::MilvusConfig;
use crate::error::{Error, Result};
use crate::types::{
    CollectionInfo, INDEX_TYPE_KEY, IndexDescription, IndexParam, LoadingProgress, METRIC_TYPE_KEY,
};

const LIST_COLLECTIONS: &str = "v2/vectordb/collections/list";
const DESCRIBE_COLLECTION: &str = "v2/vectordb/collections/describe";
const LIST_INDEXES: &str = "v2/vectordb/indexes/list";
const DESCRIBE_INDEX: &str = "v2/vectordb/indexes/describe";
const GET_LOAD_STATE: &str = "v2/vectordb/collections/get_load_state";

const LOAD_STATE_LOADED: &str = "LoadStateLoaded";

/// Response envelope shared by all v2 endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CollectionDetail {
    #[serde(rename = "collectionID", deserialize_with = "lenient_i64")]
    collection_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexDetail {
    index_name: String,
    #[serde(default)]
    index_type: Option<String>,
    #[serde(default)]
    metric_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    indexed_rows: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_rows: i64,
}

impl From<IndexDetail> for IndexDescription {
    fn from(detail: IndexDetail) -> Self {
        let mut params = Vec::with_capacity(2);
        if let Some(index_type) = detail.index_type {
            params.push(IndexParam::new(INDEX_TYPE_KEY, index_type));
        }
        if let Some(metric_type) = detail.metric_type {
            params.push(IndexParam::new(METRIC_TYPE_KEY, metric_type));
        }

        IndexDescription {
            index_name: detail.index_name,
            indexed_rows: detail.indexed_rows,
            total_rows: detail.total_rows,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadState {
    #[serde(default)]
    load_state: String,
    #[serde(default)]
    load_progress: Option<f64>,
}

impl From<LoadState> for LoadingProgress {
    fn from(state: LoadState) -> Self {
        let percent = match state.load_progress {
            Some(progress) => progress,
            None if state.load_state == LOAD_STATE_LOADED => 100.0,
            None => 0.0,
        };
        LoadingProgress::new(percent)
    }
}

/// Accept int64 values encoded either as JSON numbers or as strings.
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("{} is not an int64", n))),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "expected int64, got {}",
            other
        ))),
    }
}

/// Milvus client speaking the RESTful API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
    database: String,
    token: Option<String>,
    request_timeout: Option<Duration>,
}

impl RestClient {
    /// Build a client from configuration. No request is sent.
    pub fn new(config: &MilvusConfig) -> Result<Self> {
        let mut base_url = config.base_url()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            database: config.database.clone(),
            token: config.token.clone(),
            request_timeout: config.request_timeout(),
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: Operation,
        endpoint: &str,
        body: Value,
    ) -> Result<T> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        trace!(%operation, %url, "Calling Milvus");

        let mut request = self.http.post(url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let envelope: Envelope<T> = Self::send(request)
            .await
            .map_err(|e| self.classify(operation, e))?;

        // v1 gateways still answer with 200 on success
        if envelope.code != 0 && envelope.code != 200 {
            return Err(Error::Api {
                operation,
                code: envelope.code,
                message: envelope.message,
            });
        }

        envelope.data.ok_or(Error::MissingData { operation })
    }

    async fn send<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> reqwest::Result<Envelope<T>> {
        request.send().await?.error_for_status()?.json().await
    }

    fn classify(&self, operation: Operation, err: reqwest::Error) -> Error {
        match self.request_timeout {
            Some(after) if err.is_timeout() => Error::Timeout { operation, after },
            _ => Error::Http(err),
        }
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionInfo> {
        let detail: CollectionDetail = self
            .call(
                Operation::ListCollections,
                DESCRIBE_COLLECTION,
                json!({ "dbName": self.database, "collectionName": name }),
            )
            .await?;

        Ok(CollectionInfo::new(name, detail.collection_id))
    }
}

#[async_trait]
impl MilvusClient for RestClient {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let names: Vec<String> = self
            .call(
                Operation::ListCollections,
                LIST_COLLECTIONS,
                json!({ "dbName": self.database }),
            )
            .await?;

        let mut collections = Vec::with_capacity(names.len());
        for name in names {
            collections.push(self.describe_collection(&name).await?);
        }
        Ok(collections)
    }

    async fn get_index_statistics(&self, collection_name: &str) -> Result<Vec<IndexDescription>> {
        let index_names: Vec<String> = self
            .call(
                Operation::GetIndexStatistics,
                LIST_INDEXES,
                json!({ "dbName": self.database, "collectionName": collection_name }),
            )
            .await?;

        let mut descriptions = Vec::with_capacity(index_names.len());
        for index_name in index_names {
            let details: Vec<IndexDetail> = self
                .call(
                    Operation::GetIndexStatistics,
                    DESCRIBE_INDEX,
                    json!({
                        "dbName": self.database,
                        "collectionName": collection_name,
                        "indexName": index_name,
                    }),
                )
                .await?;
            descriptions.extend(details.into_iter().map(IndexDescription::from));
        }
        Ok(descriptions)
    }

    async fn get_loading_progress(&self, collection_name: &str) -> Result<LoadingProgress> {
        let state: LoadState = self
            .call(
                Operation::GetLoadingProgress,
                GET_LOAD_STATE,
                json!({ "dbName": self.database, "collectionName": collection_name }),
            )
            .await?;

        Ok(state.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Json;
    use axum::http::HeaderMap;
    use axum::routing::post;

    /// Serve a fake Milvus REST API on an ephemeral port.
    async fn serve(router: Router) -> MilvusConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        MilvusConfig::with_address(addr.to_string())
    }

    fn fake_milvus() -> Router {
        Router::new()
            .route(
                "/v2/vectordb/collections/list",
                post(|| async { Json(json!({ "code": 0, "data": ["books", "movies"] })) }),
            )
            .route(
                "/v2/vectordb/collections/describe",
                post(|Json(body): Json<Value>| async move {
                    let id = match body["collectionName"].as_str() {
                        Some("books") => json!(448780),
                        _ => json!("448781"),
                    };
                    Json(json!({ "code": 0, "data": { "collectionName": body["collectionName"], "collectionID": id } }))
                }),
            )
            .route(
                "/v2/vectordb/indexes/list",
                post(|| async { Json(json!({ "code": 0, "data": ["vector_idx"] })) }),
            )
            .route(
                "/v2/vectordb/indexes/describe",
                post(|| async {
                    Json(json!({
                        "code": 0,
                        "data": [{
                            "fieldName": "vector",
                            "indexName": "vector_idx",
                            "indexState": "InProgress",
                            "indexType": "HNSW",
                            "metricType": "COSINE",
                            "indexedRows": 50,
                            "totalRows": 200,
                            "pendingRows": 150
                        }]
                    }))
                }),
            )
            .route(
                "/v2/vectordb/collections/get_load_state",
                post(|Json(body): Json<Value>| async move {
                    let data = match body["collectionName"].as_str() {
                        Some("books") => json!({ "loadState": "LoadStateLoading", "loadProgress": 40 }),
                        Some("movies") => json!({ "loadState": "LoadStateLoaded" }),
                        _ => json!({ "loadState": "LoadStateNotLoad" }),
                    };
                    Json(json!({ "code": 0, "data": data }))
                }),
            )
    }

    #[tokio::test]
    async fn test_list_collections_resolves_ids() {
        let config = serve(fake_milvus()).await;
        let client = RestClient::new(&config).unwrap();

        let collections = client.list_collections().await.unwrap();

        assert_eq!(
            collections,
            vec![
                CollectionInfo::new("books", 448780),
                CollectionInfo::new("movies", 448781),
            ]
        );
    }

    #[tokio::test]
    async fn test_index_statistics_maps_types_to_params() {
        let config = serve(fake_milvus()).await;
        let client = RestClient::new(&config).unwrap();

        let indexes = client.get_index_statistics("books").await.unwrap();

        assert_eq!(indexes.len(), 1);
        assert_eq!(
            indexes[0],
            IndexDescription::new("vector_idx", 50, 200)
                .with_param("index_type", "HNSW")
                .with_param("metric_type", "COSINE")
        );
    }

    #[tokio::test]
    async fn test_loading_progress_from_load_state() {
        let config = serve(fake_milvus()).await;
        let client = RestClient::new(&config).unwrap();

        assert_eq!(client.get_loading_progress("books").await.unwrap().percent, 40.0);
        assert_eq!(client.get_loading_progress("movies").await.unwrap().percent, 100.0);
        assert_eq!(client.get_loading_progress("other").await.unwrap().percent, 0.0);
    }

    #[tokio::test]
    async fn test_api_error_code_is_reported() {
        let router = Router::new().route(
            "/v2/vectordb/collections/get_load_state",
            post(|| async {
                Json(json!({ "code": 100, "message": "collection not found[collection=ghost]" }))
            }),
        );
        let config = serve(router).await;
        let client = RestClient::new(&config).unwrap();

        let err = client.get_loading_progress("ghost").await.unwrap_err();

        match err {
            Error::Api {
                operation,
                code,
                message,
            } => {
                assert_eq!(operation, Operation::GetLoadingProgress);
                assert_eq!(code, 100);
                assert!(message.contains("ghost"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_data_is_an_error() {
        let router = Router::new().route(
            "/v2/vectordb/collections/list",
            post(|| async { Json(json!({ "code": 0 })) }),
        );
        let config = serve(router).await;
        let client = RestClient::new(&config).unwrap();

        let err = client.list_collections().await.unwrap_err();
        assert!(matches!(
            err,
            Error::MissingData {
                operation: Operation::ListCollections
            }
        ));
    }

    #[tokio::test]
    async fn test_bearer_token_and_database_are_sent() {
        let router = Router::new().route(
            "/v2/vectordb/collections/list",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer root:Milvus");
                if authorized && body["dbName"] == "analytics" {
                    Json(json!({ "code": 0, "data": [] }))
                } else {
                    Json(json!({ "code": 1800, "message": "user hasn't authenticated" }))
                }
            }),
        );
        let mut config = serve(router).await;
        config.token = Some("root:Milvus".to_string());
        config.database = "analytics".to_string();
        let client = RestClient::new(&config).unwrap();

        assert!(client.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_status_error_is_reported() {
        let config = serve(Router::new()).await;
        let client = RestClient::new(&config).unwrap();

        let err = client.list_collections().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[test]
    fn test_base_url_path_is_preserved() {
        let config = MilvusConfig::with_address("http://gateway.local:8080/milvus");
        let client = RestClient::new(&config).unwrap();

        assert_eq!(
            client.base_url().join(LIST_COLLECTIONS).unwrap().as_str(),
            "http://gateway.local:8080/milvus/v2/vectordb/collections/list"
        );
    }
}
