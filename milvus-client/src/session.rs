use crate::client::{MilvusClient, Operation};
use crate::config::MilvusConfig;
use crate::error::{Error, Result};
use crate::rest::RestClient;

/// Connect to Milvus using the provided configuration.
///
/// The RESTful API is connectionless, so connectivity is verified by listing
/// collections once. The check must finish within the configured connect
/// timeout.
pub async fn connect(config: &MilvusConfig) -> Result<RestClient> {
    let client = RestClient::new(config)?;
    let timeout = config.connect_timeout();

    tracing::info!(
        address = %config.address,
        database = %config.database,
        timeout_secs = config.connect_timeout_secs,
        "Connecting to Milvus"
    );

    let collections = tokio::time::timeout(timeout, client.list_collections())
        .await
        .map_err(|_| Error::Timeout {
            operation: Operation::ListCollections,
            after: timeout,
        })??;

    tracing::info!(
        url = %client.base_url(),
        collections = collections.len(),
        "Connected to Milvus"
    );

    Ok(client)
}
