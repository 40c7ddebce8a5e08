// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{sync::Arc, time::Duration};

use async_lock::OnceCell;
use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};
use serde_json::Value;
use stop_token::prelude::*;
use tracing::debug;

use crate::{
    connection::{ConnectionDescriptor, ConnectionRegistry},
    constants,
    error::{Error, ErrorKind, Result},
    models::{
        CollectionProperties, ETag, ItemResponse, PartitionKeyDefinition,
        StoredProcedureProperties,
    },
    options::{OperationOptions, ProcedureParams},
    resource_link::{ResourceLink, ResourceType},
    transport::{CosmosRequest, CosmosResponse, OperationType},
    PartitionKey,
};

/// Document operations against the collection named by a [`ConnectionDescriptor`].
///
/// A store is cheap to create and to clone. It holds no client of its own: every operation
/// resolves the shared client for the descriptor's fingerprint through the
/// [`ConnectionRegistry`], so all stores for the same account use one client no matter which
/// database or collection they target.
///
/// Every operation accepts [`OperationOptions`]; an operation whose stop token fires fails with
/// [`ErrorKind::Canceled`].
#[derive(Clone, Debug)]
pub struct DocumentStore {
    descriptor: Arc<ConnectionDescriptor>,
    registry: Arc<ConnectionRegistry>,
    partition_key_path: Arc<OnceCell<Option<String>>>,
}

impl DocumentStore {
    /// The fixed back-off callers wait between attempts of a retriable operation.
    pub const RETRY_INTERVAL: Duration = constants::RETRY_INTERVAL;

    /// Creates a store for the descriptor's collection.
    ///
    /// No request is sent until the first operation.
    pub fn new(descriptor: ConnectionDescriptor, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            registry,
            partition_key_path: Arc::new(OnceCell::new()),
        }
    }

    /// Returns a store for another collection of the same account, sharing this store's registry.
    pub fn for_collection(&self, collection: impl Into<String>) -> Result<Self> {
        Ok(Self::new(
            self.descriptor.with_collection(collection)?,
            self.registry.clone(),
        ))
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// The registry the store resolves its client from.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Whether an operation that failed with `error` may succeed if attempted again.
    ///
    /// Throttling, service unavailability and transport failures are transient; everything else,
    /// including missing documents, conflicts and stale versions, is terminal.
    pub fn should_retry(error: &Error) -> bool {
        error.is_retriable()
    }

    /// Creates the descriptor's database unless it already exists.
    pub async fn create_database_if_missing(&self, options: Option<OperationOptions>) -> Result<()> {
        let request = CosmosRequest::new(
            OperationType::Create,
            ResourceLink::root(ResourceType::Databases),
        )
        .with_body(serde_json::json!({ "id": self.descriptor.database_name() }));

        match self.send(request, options.as_ref()).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == &ErrorKind::Conflict => {
                debug!(database = self.descriptor.database_name(), "database already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Creates the descriptor's collection, partitioned on `partition_key_path`, unless it exists.
    ///
    /// A leading `/` is added to the path when missing. Only a single path is supported. An
    /// existing collection partitioned on the same path is returned as is; one partitioned on a
    /// different path fails with [`ErrorKind::Conflict`].
    pub async fn create_collection_if_missing(
        &self,
        partition_key_path: &str,
        options: Option<OperationOptions>,
    ) -> Result<CollectionProperties> {
        let path = normalize_partition_key_path(partition_key_path)?;
        let properties = CollectionProperties::new(
            self.descriptor.collection_name(),
            PartitionKeyDefinition::single(&path),
        );
        let request = CosmosRequest::new(
            OperationType::Create,
            self.descriptor.database_link().feed(ResourceType::Collections),
        )
        .with_offer_throughput(constants::DEFAULT_OFFER_THROUGHPUT)
        .with_body(serde_json::to_value(&properties)?);

        let created = match self.send(request, options.as_ref()).await {
            Ok(response) => response.into_body::<CollectionProperties>()?,
            Err(e) if e.kind() == &ErrorKind::Conflict => {
                let existing = self.read_collection_with(options.as_ref()).await?;
                if existing.partition_key.paths != [path.as_str()] {
                    return Err(Error::new(
                        ErrorKind::Conflict,
                        format!(
                            "collection '{}' exists but is partitioned on {:?}, not '{path}'",
                            existing.id, existing.partition_key.paths
                        ),
                    ));
                }
                debug!(collection = %existing.id, "collection already exists");
                existing
            }
            Err(e) => return Err(e),
        };

        // No-op when a lookup already cached the path.
        let _ = self.partition_key_path.set(Some(path)).await;
        Ok(created)
    }

    /// Reads the definition of the descriptor's collection.
    pub async fn read_collection(
        &self,
        options: Option<OperationOptions>,
    ) -> Result<CollectionProperties> {
        self.read_collection_with(options.as_ref()).await
    }

    /// The partition key path of the descriptor's collection, read once and cached.
    ///
    /// `None` for a collection without a partition key.
    pub async fn partition_key_path(
        &self,
        options: Option<OperationOptions>,
    ) -> Result<Option<String>> {
        self.partition_key_path_with(options.as_ref()).await
    }

    /// Creates a document. Fails with [`ErrorKind::Conflict`] if the id is already taken in the
    /// document's partition.
    ///
    /// The document must serialize to a JSON object with a string `id`. Its partition key is
    /// read from the document at the collection's partition key path.
    pub async fn create<T: Serialize>(
        &self,
        document: &T,
        options: Option<OperationOptions>,
    ) -> Result<ItemResponse<Value>> {
        self.write(OperationType::Create, document, options.as_ref())
            .await
    }

    /// Creates the document, or replaces it unconditionally if it already exists.
    pub async fn upsert<T: Serialize>(
        &self,
        document: &T,
        options: Option<OperationOptions>,
    ) -> Result<ItemResponse<Value>> {
        self.write(OperationType::Upsert, document, options.as_ref())
            .await
    }

    /// Reads a document. Fails with [`ErrorKind::NotFound`] if it does not exist.
    ///
    /// Without a partition key, the document is looked up across partitions.
    pub async fn read<T: DeserializeOwned>(
        &self,
        id: &str,
        partition_key: Option<PartitionKey>,
        options: Option<OperationOptions>,
    ) -> Result<ItemResponse<T>> {
        let request = CosmosRequest::new(OperationType::Read, self.descriptor.document_link(id))
            .with_partition_key(partition_key);
        self.send(request, options.as_ref())
            .await?
            .into_item_response()
    }

    /// Whether a document exists. Errors other than [`ErrorKind::NotFound`] are returned.
    pub async fn exists(
        &self,
        id: &str,
        partition_key: Option<PartitionKey>,
        options: Option<OperationOptions>,
    ) -> Result<bool> {
        match self.read::<IgnoredAny>(id, partition_key, options).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == &ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replaces an existing document.
    ///
    /// With `expected_version`, the write only succeeds while the stored document still carries
    /// that ETag; otherwise it fails with [`ErrorKind::VersionConflict`]. The document's `id` is
    /// set to `id` when absent and must match it when present.
    pub async fn replace<T: Serialize>(
        &self,
        id: &str,
        document: &T,
        expected_version: Option<&ETag>,
        options: Option<OperationOptions>,
    ) -> Result<ItemResponse<Value>> {
        let mut body = serde_json::to_value(document)?;
        let Value::Object(properties) = &mut body else {
            return Err(Error::invalid_request("a document must be a JSON object"));
        };
        match properties.get("id") {
            None => {
                properties.insert("id".into(), Value::String(id.into()));
            }
            Some(Value::String(existing)) if existing == id => {}
            Some(other) => {
                return Err(Error::invalid_request(format!(
                    "the document id {other} does not match '{id}'"
                )))
            }
        }

        let partition_key = self.partition_key_of(&body, options.as_ref()).await?;
        let request = CosmosRequest::new(OperationType::Replace, self.descriptor.document_link(id))
            .with_partition_key(Some(partition_key))
            .with_if_match(expected_version.cloned())
            .with_body(body);
        self.send(request, options.as_ref())
            .await?
            .into_item_response()
    }

    /// Deletes a document. Fails with [`ErrorKind::NotFound`] if it does not exist.
    pub async fn delete(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        options: Option<OperationOptions>,
    ) -> Result<()> {
        let request = CosmosRequest::new(OperationType::Delete, self.descriptor.document_link(id))
            .with_partition_key(Some(partition_key.into()));
        self.send(request, options.as_ref()).await?;
        Ok(())
    }

    /// Registers a stored procedure, replacing the body of an existing one with the same id.
    pub async fn upsert_stored_procedure(
        &self,
        id: &str,
        body: impl Into<String>,
        options: Option<OperationOptions>,
    ) -> Result<StoredProcedureProperties> {
        let procedure = serde_json::to_value(StoredProcedureProperties::new(id, body))?;
        let create = CosmosRequest::new(
            OperationType::Create,
            self.descriptor
                .collection_link()
                .feed(ResourceType::StoredProcedures),
        )
        .with_body(procedure.clone());

        let response = match self.send(create, options.as_ref()).await {
            Ok(response) => response,
            Err(e) if e.kind() == &ErrorKind::Conflict => {
                debug!(procedure = id, "stored procedure exists; replacing it");
                let replace = CosmosRequest::new(
                    OperationType::Replace,
                    self.descriptor.stored_procedure_link(id),
                )
                .with_body(procedure);
                self.send(replace, options.as_ref()).await?
            }
            Err(e) => return Err(e),
        };
        response.into_body()
    }

    /// Reads a registered stored procedure. Fails with [`ErrorKind::NotFound`] if it does not exist.
    pub async fn read_stored_procedure(
        &self,
        id: &str,
        options: Option<OperationOptions>,
    ) -> Result<StoredProcedureProperties> {
        let request = CosmosRequest::new(
            OperationType::Read,
            self.descriptor.stored_procedure_link(id),
        );
        self.send(request, options.as_ref()).await?.into_body()
    }

    /// Runs a stored procedure within one partition and deserializes its result.
    pub async fn execute_stored_procedure<T: DeserializeOwned>(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        params: ProcedureParams,
        options: Option<OperationOptions>,
    ) -> Result<T> {
        let request = CosmosRequest::new(
            OperationType::Execute,
            self.descriptor.stored_procedure_link(id),
        )
        .with_partition_key(Some(partition_key.into()))
        .with_body(params.into_value());
        self.send(request, options.as_ref()).await?.into_body()
    }

    async fn write<T: Serialize>(
        &self,
        operation: OperationType,
        document: &T,
        options: Option<&OperationOptions>,
    ) -> Result<ItemResponse<Value>> {
        let body = serde_json::to_value(document)?;
        match body.get("id") {
            Some(Value::String(_)) => {}
            _ if !body.is_object() => {
                return Err(Error::invalid_request("a document must be a JSON object"))
            }
            _ => return Err(Error::invalid_request("a document must have a string 'id'")),
        }

        let partition_key = self.partition_key_of(&body, options).await?;
        let request = CosmosRequest::new(
            operation,
            self.descriptor.collection_link().feed(ResourceType::Documents),
        )
        .with_partition_key(Some(partition_key))
        .with_body(body);
        self.send(request, options).await?.into_item_response()
    }

    async fn partition_key_of(
        &self,
        document: &Value,
        options: Option<&OperationOptions>,
    ) -> Result<PartitionKey> {
        Ok(match self.partition_key_path_with(options).await? {
            Some(path) => PartitionKey::from_document(document, &path),
            // A single-partition collection addresses its only partition as `[{}]`.
            None => PartitionKey::Undefined,
        })
    }

    async fn partition_key_path_with(
        &self,
        options: Option<&OperationOptions>,
    ) -> Result<Option<String>> {
        let path = self
            .partition_key_path
            .get_or_try_init(|| async {
                let collection = self.read_collection_with(options).await?;
                match collection.partition_key.paths.as_slice() {
                    [] => Ok(None),
                    [path] => Ok(Some(path.clone())),
                    paths => Err(Error::invalid_request(format!(
                        "collection '{}' has a hierarchical partition key {paths:?}, which is not supported",
                        collection.id
                    ))),
                }
            })
            .await?;
        Ok(path.clone())
    }

    async fn read_collection_with(
        &self,
        options: Option<&OperationOptions>,
    ) -> Result<CollectionProperties> {
        let request = CosmosRequest::new(OperationType::Read, self.descriptor.collection_link());
        self.send(request, options).await?.into_body()
    }

    async fn send(
        &self,
        request: CosmosRequest,
        options: Option<&OperationOptions>,
    ) -> Result<CosmosResponse> {
        let client = self.registry.resolve(&self.descriptor)?;
        let operation = request.operation;
        let link = request.link.clone();

        let response = match options.and_then(OperationOptions::stop_token) {
            Some(stop_token) => client
                .send(request)
                .timeout_at(stop_token.clone())
                .await
                .map_err(|_| {
                    debug!(%operation, %link, "operation canceled");
                    Error::canceled()
                })??,
            None => client.send(request).await?,
        };
        response.into_result(operation, &link)
    }
}

fn normalize_partition_key_path(path: &str) -> Result<String> {
    let path = path.trim();
    if path.trim_start_matches('/').is_empty() {
        return Err(Error::invalid_request("the partition key path must not be empty"));
    }
    if path.contains(',') {
        return Err(Error::invalid_request(format!(
            "'{path}' names more than one partition key path; only a single path is supported"
        )));
    }
    Ok(if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_paths_are_normalized() {
        assert_eq!(normalize_partition_key_path("/tenant").unwrap(), "/tenant");
        assert_eq!(normalize_partition_key_path("tenant").unwrap(), "/tenant");
        assert_eq!(
            normalize_partition_key_path(" /a/b ").unwrap(),
            "/a/b"
        );
    }

    #[test]
    fn invalid_partition_key_paths_are_rejected() {
        for path in ["", "/", "  ", "/a,/b"] {
            let error = normalize_partition_key_path(path).unwrap_err();
            assert_eq!(error.kind(), &ErrorKind::InvalidRequest, "{path:?}");
        }
    }

    #[test]
    fn retry_classification() {
        assert!(DocumentStore::should_retry(&Error::new(
            ErrorKind::Throttled { retry_after: None },
            "429"
        )));
        assert!(DocumentStore::should_retry(&Error::new(
            ErrorKind::Unavailable,
            "503"
        )));
        assert!(!DocumentStore::should_retry(&Error::new(
            ErrorKind::NotFound,
            "404"
        )));
        assert!(!DocumentStore::should_retry(&Error::new(
            ErrorKind::Conflict,
            "409"
        )));
        assert_eq!(DocumentStore::RETRY_INTERVAL, Duration::from_secs(5));
    }
}
