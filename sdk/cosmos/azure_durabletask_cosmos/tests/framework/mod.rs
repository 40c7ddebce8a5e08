// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![allow(dead_code)]

//! Shared fixtures for the integration tests.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Once,
    },
    time::Duration,
};

use azure_durabletask_cosmos::{
    resource_link::{ResourceLink, ResourceType},
    transport::{
        CosmosRequest, CosmosTransport, EmulatorClientFactory, InMemoryTransport, OperationType,
    },
    ConnectionDescriptor, ConnectionRegistry, DocumentStore,
};

pub const ENDPOINT: &str = "https://durabletask-test.documents.azure.com:443/";
pub const KEY: &str = "dGVzdC1hY2NvdW50LWtleQ==";

static TRACING: Once = Once::new();
static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An emulated account whose clients all observe the same in-memory state.
pub struct TestAccount {
    pub transport: Arc<InMemoryTransport>,
    pub factory: EmulatorClientFactory,
    pub registry: Arc<ConnectionRegistry>,
}

impl TestAccount {
    pub fn new() -> Self {
        Self::with_transport(InMemoryTransport::new())
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self::with_transport(InMemoryTransport::new().with_latency(latency))
    }

    fn with_transport(transport: InMemoryTransport) -> Self {
        init_tracing();
        let transport = Arc::new(transport);
        let factory = EmulatorClientFactory::shared(transport.clone());
        let registry = Arc::new(ConnectionRegistry::new(factory.clone()));
        Self {
            transport,
            factory,
            registry,
        }
    }

    /// A database name no other test in this binary uses.
    pub fn unique_db(&self, prefix: &str) -> String {
        format!("{prefix}-{}", NEXT_DB.fetch_add(1, Ordering::SeqCst))
    }

    pub fn descriptor(&self, database: &str, collection: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::builder(ENDPOINT, KEY, database, collection)
            .build()
            .expect("test descriptor is valid")
    }

    pub fn store(&self, database: &str, collection: &str) -> DocumentStore {
        DocumentStore::new(self.descriptor(database, collection), self.registry.clone())
    }

    /// A store whose database and collection exist, partitioned on `partition_key_path`.
    pub async fn provisioned_store(
        &self,
        prefix: &str,
        collection: &str,
        partition_key_path: &str,
    ) -> azure_durabletask_cosmos::Result<DocumentStore> {
        let store = self.store(&self.unique_db(prefix), collection);
        store.create_database_if_missing(None).await?;
        store
            .create_collection_if_missing(partition_key_path, None)
            .await?;
        Ok(store)
    }

    /// A store over a single-partition collection, one whose definition carries no partition key.
    pub async fn unpartitioned_store(
        &self,
        prefix: &str,
        collection: &str,
    ) -> azure_durabletask_cosmos::Result<DocumentStore> {
        let database = self.unique_db(prefix);
        let store = self.store(&database, collection);
        store.create_database_if_missing(None).await?;

        let request = CosmosRequest::new(
            OperationType::Create,
            ResourceLink::root(ResourceType::Databases)
                .item(&database)
                .feed(ResourceType::Collections),
        )
        .with_body(serde_json::json!({ "id": collection }));
        let response = self.transport.send(request).await?;
        assert_eq!(response.status, 201);
        Ok(store)
    }
}
