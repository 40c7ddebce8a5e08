// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{collections::HashMap, fmt, sync::Arc};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::{
    connection::{ConnectionDescriptor, Fingerprint},
    error::Result,
    transport::{CosmosRequest, CosmosResponse, CosmosTransport, GatewayClientFactory},
};

/// Constructs the transport for a fingerprint the registry has not seen yet.
///
/// Factories must not perform network I/O: the registry may construct a candidate that loses a
/// publication race and is dropped unused.
pub trait ClientFactory: Send + Sync + fmt::Debug {
    fn create(&self, descriptor: &ConnectionDescriptor) -> Result<Arc<dyn CosmosTransport>>;
}

/// A database client shared by every store that resolves to the same [`Fingerprint`].
///
/// Cloning is cheap and yields a handle to the same underlying client.
#[derive(Clone)]
pub struct PooledClient {
    fingerprint: Fingerprint,
    transport: Arc<dyn CosmosTransport>,
}

impl PooledClient {
    /// Wraps a transport created for the account identified by `fingerprint`.
    pub fn new(fingerprint: Fingerprint, transport: Arc<dyn CosmosTransport>) -> Self {
        Self {
            fingerprint,
            transport,
        }
    }

    /// The account this client is pooled under.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The transport shared by every store of the account.
    pub fn transport(&self) -> &Arc<dyn CosmosTransport> {
        &self.transport
    }

    /// Whether both handles refer to the same underlying client.
    pub fn ptr_eq(&self, other: &PooledClient) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.transport), Arc::as_ptr(&other.transport))
    }

    /// Sends a request through the shared transport.
    pub async fn send(&self, request: CosmosRequest) -> Result<CosmosResponse> {
        self.transport.send(request).await
    }
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledClient")
            .field("fingerprint", &self.fingerprint)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Pools database clients by [`Fingerprint`] for the life of the process.
///
/// Construct one registry at startup and share it (behind an [`Arc`]) with every
/// [`DocumentStore`](crate::DocumentStore). Lookups are lock-free. A missing client is created
/// through the registry's [`ClientFactory`] and published with an atomic insert-if-absent, so
/// concurrent resolutions of the same fingerprint always observe a single client. Clients are
/// never evicted.
pub struct ConnectionRegistry {
    factory: Arc<dyn ClientFactory>,
    clients: ArcSwap<HashMap<Fingerprint, PooledClient>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry that builds clients with `factory`.
    pub fn new(factory: impl ClientFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            clients: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Creates an empty registry that talks to Cosmos DB accounts over HTTPS.
    pub fn gateway() -> Self {
        Self::new(GatewayClientFactory)
    }

    /// Returns the client for the descriptor's fingerprint, creating it if necessary.
    ///
    /// Never performs network I/O. Fails only when the factory cannot construct a client, for
    /// example because the account key is malformed.
    pub fn resolve(&self, descriptor: &ConnectionDescriptor) -> Result<PooledClient> {
        let fingerprint = descriptor.fingerprint();
        if let Some(client) = self.clients.load().get(&fingerprint) {
            return Ok(client.clone());
        }
        self.get_or_create(fingerprint, || self.factory.create(descriptor))
    }

    fn get_or_create<F>(&self, fingerprint: Fingerprint, create: F) -> Result<PooledClient>
    where
        F: FnOnce() -> Result<Arc<dyn CosmosTransport>>,
    {
        let candidate = PooledClient::new(fingerprint.clone(), create()?);

        let mut published = None;
        self.clients.rcu(|clients| {
            match clients.get(&fingerprint) {
                Some(existing) => {
                    published = Some(existing.clone());
                    Arc::clone(clients)
                }
                None => {
                    published = Some(candidate.clone());
                    let mut clients = HashMap::clone(clients);
                    clients.insert(fingerprint.clone(), candidate.clone());
                    Arc::new(clients)
                }
            }
        });

        // `published` holds the value chosen by the final, successful rcu attempt.
        let client = published.unwrap_or_else(|| candidate.clone());
        if client.ptr_eq(&candidate) {
            debug!(%fingerprint, "pooled a new database client");
        } else {
            debug!(%fingerprint, "discarded a duplicate database client");
        }
        Ok(client)
    }

    /// The number of pooled clients.
    pub fn len(&self) -> usize {
        self.clients.load().len()
    }

    /// Whether no client has been pooled yet.
    pub fn is_empty(&self) -> bool {
        self.clients.load().is_empty()
    }

    /// Whether a client is pooled under `fingerprint`.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.clients.load().contains_key(fingerprint)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::gateway()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clients = self.clients.load();
        f.debug_struct("ConnectionRegistry")
            .field("factory", &self.factory)
            .field("clients", &clients.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::EmulatorClientFactory;
    use std::sync::Barrier;

    fn descriptor(endpoint: &str, collection: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::builder(endpoint, "a2V5", "hub", collection)
            .build()
            .unwrap()
    }

    #[test]
    fn collections_of_one_account_share_a_client() {
        let registry = ConnectionRegistry::new(EmulatorClientFactory::new());
        let instances = registry
            .resolve(&descriptor("https://a.documents.azure.com/", "instances"))
            .unwrap();
        let history = registry
            .resolve(&descriptor("https://a.documents.azure.com/", "history"))
            .unwrap();

        assert!(instances.ptr_eq(&history));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn endpoints_get_distinct_clients() {
        let registry = ConnectionRegistry::new(EmulatorClientFactory::new());
        let a = descriptor("https://a.documents.azure.com/", "instances");
        let b = descriptor("https://b.documents.azure.com/", "instances");

        let first = registry.resolve(&a).unwrap();
        let second = registry.resolve(&b).unwrap();

        assert!(!first.ptr_eq(&second));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&a.fingerprint()));
        assert!(registry.contains(&b.fingerprint()));
    }

    #[test]
    fn concurrent_resolution_publishes_one_client() {
        const THREADS: usize = 16;
        let factory = EmulatorClientFactory::new();
        let registry = ConnectionRegistry::new(factory.clone());
        let descriptor = descriptor("https://a.documents.azure.com/", "instances");
        let barrier = Barrier::new(THREADS);

        let clients: Vec<PooledClient> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        registry.resolve(&descriptor).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(registry.len(), 1);
        assert!(clients.iter().all(|c| c.ptr_eq(&clients[0])));
        assert!(factory.created_clients() >= 1);
    }

    #[derive(Debug)]
    struct FailingFactory;

    impl ClientFactory for FailingFactory {
        fn create(&self, _: &ConnectionDescriptor) -> Result<Arc<dyn CosmosTransport>> {
            Err(crate::Error::invalid_request("bad key"))
        }
    }

    #[test]
    fn factory_failure_pools_nothing() {
        let registry = ConnectionRegistry::new(FailingFactory);
        let error = registry
            .resolve(&descriptor("https://a.documents.azure.com/", "instances"))
            .unwrap_err();
        assert_eq!(error.kind(), &crate::ErrorKind::InvalidRequest);
        assert!(registry.is_empty());
    }
}
