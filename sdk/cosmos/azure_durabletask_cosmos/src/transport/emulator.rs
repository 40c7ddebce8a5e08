// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! An in-process Cosmos DB account for tests, available with the `emulator` feature.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::{
    connection::{ClientFactory, ConnectionDescriptor},
    error::Result,
    models::ETag,
    resource_link::{ResourceLink, ResourceType},
    transport::{CosmosRequest, CosmosResponse, CosmosTransport, OperationType},
    PartitionKey,
};

/// Native implementation of a stored procedure, invoked with the procedure's parameters.
///
/// An `Err` is reported to the caller as a `400 Bad Request` carrying the message.
pub type ProcedureHandler =
    Arc<dyn Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync>;

#[derive(Default)]
struct Collection {
    resource: Value,
    partition_key_path: Option<String>,
    // Keyed by (partition key header value, id).
    documents: BTreeMap<(String, String), Value>,
    procedures: BTreeMap<String, Value>,
}

#[derive(Default)]
struct Database {
    resource: Value,
    collections: BTreeMap<String, Collection>,
}

#[derive(Default)]
struct Account {
    databases: BTreeMap<String, Database>,
}

/// A [`CosmosTransport`] that keeps an entire account in memory.
///
/// It follows the service's status codes for the operations this crate issues: `409` on duplicate
/// creates, `404` on missing resources, `412` on stale `If-Match` values and so on. Stored
/// procedures run through native [`ProcedureHandler`]s registered by procedure id, since the
/// procedure body itself is opaque text.
pub struct InMemoryTransport {
    account: RwLock<Account>,
    handlers: RwLock<HashMap<String, ProcedureHandler>>,
    failures: Mutex<VecDeque<u16>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// An empty account.
    pub fn new() -> Self {
        Self {
            account: RwLock::new(Account::default()),
            handlers: RwLock::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            latency: None,
            requests: AtomicUsize::new(0),
        }
    }

    /// Delays every request by `latency` before it is applied.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Registers the native implementation of the stored procedure `procedure_id`.
    pub fn register_procedure<F>(&self, procedure_id: impl Into<String>, handler: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.register_procedure_handler(procedure_id, Arc::new(handler));
    }

    /// Registers `handler` to run whenever a procedure named `id` is executed.
    pub fn register_procedure_handler(
        &self,
        procedure_id: impl Into<String>,
        handler: ProcedureHandler,
    ) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(procedure_id.into(), handler);
    }

    /// Answers the next `times` requests with `status` instead of applying them.
    pub fn fail_next(&self, status: u16, times: usize) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.extend(std::iter::repeat_n(status, times));
    }

    /// The number of requests received, including injected failures.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// The number of documents stored in a collection, or `None` when it does not exist.
    pub fn document_count(&self, database: &str, collection: &str) -> Option<usize> {
        let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
        account
            .databases
            .get(database)?
            .collections
            .get(collection)
            .map(|c| c.documents.len())
    }

    /// The number of stored procedures in a collection, or `None` when it does not exist.
    pub fn procedure_count(&self, database: &str, collection: &str) -> Option<usize> {
        let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
        account
            .databases
            .get(database)?
            .collections
            .get(collection)
            .map(|c| c.procedures.len())
    }

    fn next_failure(&self) -> Option<u16> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn apply(&self, request: &CosmosRequest) -> CosmosResponse {
        let link = &request.link;
        match (link.resource_type(), link.is_feed(), request.operation) {
            (ResourceType::DatabaseAccount, _, OperationType::Read) => ok(json!({
                "id": "emulator",
                "readableLocations": [],
                "writableLocations": [],
            })),
            (ResourceType::Databases, true, OperationType::Create) => self.create_database(request),
            (ResourceType::Databases, false, OperationType::Read) => self.read_database(link),
            (ResourceType::Collections, true, OperationType::Create) => {
                self.create_collection(request)
            }
            (ResourceType::Collections, false, OperationType::Read) => self.read_collection(link),
            (ResourceType::Documents, true, OperationType::Create | OperationType::Upsert) => {
                self.write_document(request)
            }
            (ResourceType::Documents, false, OperationType::Read) => self.read_document(request),
            (ResourceType::Documents, false, OperationType::Replace) => {
                self.replace_document(request)
            }
            (ResourceType::Documents, false, OperationType::Delete) => {
                self.delete_document(request)
            }
            (ResourceType::StoredProcedures, true, OperationType::Create) => {
                self.create_procedure(request)
            }
            (ResourceType::StoredProcedures, false, OperationType::Replace) => {
                self.replace_procedure(request)
            }
            (ResourceType::StoredProcedures, false, OperationType::Read) => {
                self.read_procedure(link)
            }
            (ResourceType::StoredProcedures, false, OperationType::Execute) => {
                self.execute_procedure(request)
            }
            (resource_type, _, operation) => failure(
                405,
                "MethodNotAllowed",
                format!("{operation} is not supported on {resource_type:?} at '{link}'"),
            ),
        }
    }

    fn create_database(&self, request: &CosmosRequest) -> CosmosResponse {
        let Some(id) = body_id(request) else {
            return bad_request("the database body must be an object with a string 'id'");
        };
        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        if account.databases.contains_key(&id) {
            return conflict(&id);
        }
        let resource = stamp(json!({ "id": id }));
        account.databases.insert(
            id,
            Database {
                resource: resource.clone(),
                collections: BTreeMap::new(),
            },
        );
        created(resource)
    }

    fn read_database(&self, link: &ResourceLink) -> CosmosResponse {
        let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
        match link.id().and_then(|id| account.databases.get(id)) {
            Some(database) => ok(database.resource.clone()),
            None => not_found(link),
        }
    }

    fn create_collection(&self, request: &CosmosRequest) -> CosmosResponse {
        let Some(id) = body_id(request) else {
            return bad_request("the collection body must be an object with a string 'id'");
        };
        let Some(body) = request.body.clone() else {
            return bad_request("missing collection body");
        };
        let partition_key_path = body
            .pointer("/partitionKey/paths/0")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        let Some(database) = request
            .link
            .id_of(ResourceType::Databases)
            .and_then(|db| account.databases.get_mut(db))
        else {
            return not_found(&request.link);
        };
        if database.collections.contains_key(&id) {
            return conflict(&id);
        }
        let resource = stamp(body);
        database.collections.insert(
            id,
            Collection {
                resource: resource.clone(),
                partition_key_path,
                ..Default::default()
            },
        );
        created(resource)
    }

    fn read_collection(&self, link: &ResourceLink) -> CosmosResponse {
        let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
        match collection(&account, link) {
            Some(collection) => ok(collection.resource.clone()),
            None => not_found(link),
        }
    }

    fn write_document(&self, request: &CosmosRequest) -> CosmosResponse {
        let Some(id) = body_id(request) else {
            return bad_request("the document body must be an object with a string 'id'");
        };
        let Some(body) = request.body.clone() else {
            return bad_request("missing document body");
        };

        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        let Some(collection) = collection_mut(&mut account, &request.link) else {
            return not_found(&request.link);
        };
        let partition = partition_of(request.partition_key.as_ref(), collection, &body);
        let key = (partition, id);
        if request.operation == OperationType::Create && collection.documents.contains_key(&key) {
            return conflict(&key.1);
        }
        let existed = collection.documents.contains_key(&key);
        let document = stamp(body);
        collection.documents.insert(key, document.clone());
        if existed {
            ok(document)
        } else {
            created(document)
        }
    }

    fn read_document(&self, request: &CosmosRequest) -> CosmosResponse {
        let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
        let (Some(collection), Some(id)) = (collection(&account, &request.link), request.link.id())
        else {
            return not_found(&request.link);
        };

        match &request.partition_key {
            Some(partition_key) => collection
                .documents
                .get(&(partition_key.to_header_value(), id.to_string()))
                .map(|document| ok(document.clone()))
                .unwrap_or_else(|| not_found(&request.link)),
            None => {
                let mut matches = collection
                    .documents
                    .iter()
                    .filter(|((_, doc_id), _)| doc_id == id)
                    .map(|(_, document)| document);
                match (matches.next(), matches.next()) {
                    (Some(document), None) => ok(document.clone()),
                    (None, _) => not_found(&request.link),
                    (Some(_), Some(_)) => bad_request(format!(
                        "'{id}' exists in more than one partition; a partition key is required"
                    )),
                }
            }
        }
    }

    fn replace_document(&self, request: &CosmosRequest) -> CosmosResponse {
        let Some(id) = request.link.id() else {
            return not_found(&request.link);
        };
        let Some(body) = request.body.clone() else {
            return bad_request("missing document body");
        };
        if body.get("id").and_then(Value::as_str) != Some(id) {
            return bad_request(format!("the document id must be '{id}'"));
        }

        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        let Some(collection) = collection_mut(&mut account, &request.link) else {
            return not_found(&request.link);
        };
        let key = (
            partition_of(request.partition_key.as_ref(), collection, &body),
            id.to_string(),
        );
        let Some(current) = collection.documents.get(&key) else {
            return not_found(&request.link);
        };
        if let Some(expected) = &request.if_match {
            if current.get("_etag").and_then(Value::as_str) != Some(expected.as_str()) {
                return failure(
                    412,
                    "PreconditionFailed",
                    "Operation cannot be performed because one of the specified precondition is not met.",
                );
            }
        }
        let document = stamp(body);
        collection.documents.insert(key, document.clone());
        ok(document)
    }

    fn delete_document(&self, request: &CosmosRequest) -> CosmosResponse {
        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        let (Some(collection), Some(id)) =
            (collection_mut(&mut account, &request.link), request.link.id())
        else {
            return not_found(&request.link);
        };
        let partition = request
            .partition_key
            .as_ref()
            .unwrap_or(&PartitionKey::Undefined)
            .to_header_value();
        match collection.documents.remove(&(partition, id.to_string())) {
            Some(_) => CosmosResponse::new(204),
            None => not_found(&request.link),
        }
    }

    fn create_procedure(&self, request: &CosmosRequest) -> CosmosResponse {
        let Some(id) = body_id(request) else {
            return bad_request("the procedure body must be an object with a string 'id'");
        };
        let Some(body) = request.body.clone() else {
            return bad_request("missing procedure body");
        };
        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        let Some(collection) = collection_mut(&mut account, &request.link) else {
            return not_found(&request.link);
        };
        if collection.procedures.contains_key(&id) {
            return conflict(&id);
        }
        let procedure = stamp(body);
        collection.procedures.insert(id, procedure.clone());
        created(procedure)
    }

    fn replace_procedure(&self, request: &CosmosRequest) -> CosmosResponse {
        let Some(body) = request.body.clone() else {
            return bad_request("missing procedure body");
        };
        let mut account = self.account.write().unwrap_or_else(PoisonError::into_inner);
        let (Some(collection), Some(id)) =
            (collection_mut(&mut account, &request.link), request.link.id())
        else {
            return not_found(&request.link);
        };
        match collection.procedures.get_mut(id) {
            Some(procedure) => {
                *procedure = stamp(body);
                ok(procedure.clone())
            }
            None => not_found(&request.link),
        }
    }

    fn read_procedure(&self, link: &ResourceLink) -> CosmosResponse {
        let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
        collection(&account, link)
            .zip(link.id())
            .and_then(|(collection, id)| collection.procedures.get(id))
            .map(|procedure| ok(procedure.clone()))
            .unwrap_or_else(|| not_found(link))
    }

    fn execute_procedure(&self, request: &CosmosRequest) -> CosmosResponse {
        if request.partition_key.is_none() {
            return bad_request("executing a stored procedure requires a partition key");
        }
        let Some(id) = request.link.id() else {
            return not_found(&request.link);
        };
        {
            let account = self.account.read().unwrap_or_else(PoisonError::into_inner);
            let registered = collection(&account, &request.link)
                .is_some_and(|collection| collection.procedures.contains_key(id));
            if !registered {
                return not_found(&request.link);
            }
        }

        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        let Some(handler) = handler else {
            return bad_request(format!("no native handler is registered for procedure '{id}'"));
        };

        let params = match &request.body {
            Some(Value::Array(params)) => params.as_slice(),
            _ => &[],
        };
        match handler(params) {
            Ok(result) => ok(result),
            Err(message) => bad_request(message),
        }
    }
}

#[async_trait]
impl CosmosTransport for InMemoryTransport {
    async fn send(&self, request: CosmosRequest) -> Result<CosmosResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut response = match self.next_failure() {
            Some(status) => injected(status),
            None => self.apply(&request),
        };
        response.activity_id = Some(Uuid::new_v4().to_string());
        response.request_charge = if request.operation.is_read_only() {
            1.0
        } else {
            5.0
        };

        debug!(
            operation = %request.operation,
            link = %request.link,
            status = response.status,
            "emulator request completed"
        );
        Ok(response)
    }
}

impl fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("latency", &self.latency)
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

fn collection<'a>(account: &'a Account, link: &ResourceLink) -> Option<&'a Collection> {
    account
        .databases
        .get(link.id_of(ResourceType::Databases)?)?
        .collections
        .get(link.id_of(ResourceType::Collections)?)
}

fn collection_mut<'a>(account: &'a mut Account, link: &ResourceLink) -> Option<&'a mut Collection> {
    account
        .databases
        .get_mut(link.id_of(ResourceType::Databases)?)?
        .collections
        .get_mut(link.id_of(ResourceType::Collections)?)
}

fn partition_of(
    partition_key: Option<&PartitionKey>,
    collection: &Collection,
    document: &Value,
) -> String {
    match (partition_key, &collection.partition_key_path) {
        (Some(partition_key), _) => partition_key.to_header_value(),
        (None, Some(path)) => PartitionKey::from_document(document, path).to_header_value(),
        (None, None) => PartitionKey::Undefined.to_header_value(),
    }
}

fn body_id(request: &CosmosRequest) -> Option<String> {
    request
        .body
        .as_ref()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Adds the system properties the service maintains on every write.
fn stamp(mut resource: Value) -> Value {
    if let Value::Object(properties) = &mut resource {
        let etag = format!("\"{}\"", Uuid::new_v4());
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        properties.insert("_etag".into(), Value::String(etag));
        properties.insert("_ts".into(), Value::from(ts));
    }
    resource
}

fn ok(body: Value) -> CosmosResponse {
    with_etag(CosmosResponse::new(200).with_body(body))
}

fn created(body: Value) -> CosmosResponse {
    with_etag(CosmosResponse::new(201).with_body(body))
}

fn with_etag(response: CosmosResponse) -> CosmosResponse {
    let etag = response
        .body
        .as_ref()
        .and_then(|body| body.get("_etag"))
        .and_then(Value::as_str)
        .map(ETag::from);
    match etag {
        Some(etag) => response.with_etag(etag),
        None => response,
    }
}

fn failure(status: u16, code: &str, message: impl Into<String>) -> CosmosResponse {
    let mut body = Map::new();
    body.insert("code".into(), Value::String(code.into()));
    body.insert("message".into(), Value::String(message.into()));
    CosmosResponse::new(status).with_body(Value::Object(body))
}

fn bad_request(message: impl Into<String>) -> CosmosResponse {
    failure(400, "BadRequest", message)
}

fn not_found(link: &ResourceLink) -> CosmosResponse {
    failure(
        404,
        "NotFound",
        format!("Resource '{link}' does not exist"),
    )
}

fn conflict(id: &str) -> CosmosResponse {
    failure(
        409,
        "Conflict",
        format!("Entity with the specified id '{id}' already exists in the system."),
    )
}

fn injected(status: u16) -> CosmosResponse {
    let mut response = failure(status, "Injected", format!("injected failure ({status})"));
    if status == 429 {
        response.retry_after = Some(Duration::from_millis(10));
    }
    response
}

/// Creates [`InMemoryTransport`] clients.
///
/// By default every fingerprint gets its own empty account. Use [`shared`](Self::shared) to have
/// every client observe the same account.
#[derive(Clone, Default)]
pub struct EmulatorClientFactory {
    shared: Option<Arc<InMemoryTransport>>,
    handlers: HashMap<String, ProcedureHandler>,
    latency: Option<Duration>,
    created: Arc<AtomicUsize>,
}

impl EmulatorClientFactory {
    /// A factory that gives each fingerprint its own empty account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out `transport` for every fingerprint.
    pub fn shared(transport: Arc<InMemoryTransport>) -> Self {
        Self {
            shared: Some(transport),
            ..Self::default()
        }
    }

    /// Registers a procedure handler on every account created by this factory.
    pub fn with_procedure_handler<F>(mut self, procedure_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.handlers.insert(procedure_id.into(), Arc::new(handler));
        self
    }

    /// Delays every request of accounts created by this factory.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The number of clients this factory has constructed, including discarded candidates.
    pub fn created_clients(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ClientFactory for EmulatorClientFactory {
    fn create(&self, descriptor: &ConnectionDescriptor) -> Result<Arc<dyn CosmosTransport>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let transport = match &self.shared {
            Some(shared) => shared.clone(),
            None => {
                let mut transport = InMemoryTransport::new();
                if let Some(latency) = self.latency {
                    transport = transport.with_latency(latency);
                }
                Arc::new(transport)
            }
        };
        for (id, handler) in &self.handlers {
            transport.register_procedure_handler(id.clone(), handler.clone());
        }
        debug!(fingerprint = %descriptor.fingerprint(), "created emulator client");
        Ok(transport)
    }
}

impl fmt::Debug for EmulatorClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatorClientFactory")
            .field("shared", &self.shared.is_some())
            .field("procedures", &self.handlers.keys().collect::<Vec<_>>())
            .field("latency", &self.latency)
            .field("created", &self.created_clients())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documents() -> ResourceLink {
        ResourceLink::root(ResourceType::Databases)
            .item("hub")
            .feed(ResourceType::Collections)
            .item("items")
            .feed(ResourceType::Documents)
    }

    async fn provisioned() -> InMemoryTransport {
        let transport = InMemoryTransport::new();
        let database = transport
            .send(
                CosmosRequest::new(
                    OperationType::Create,
                    ResourceLink::root(ResourceType::Databases),
                )
                .with_body(json!({ "id": "hub" })),
            )
            .await
            .unwrap();
        assert_eq!(database.status, 201);
        let collection = transport
            .send(
                CosmosRequest::new(
                    OperationType::Create,
                    ResourceLink::root(ResourceType::Databases)
                        .item("hub")
                        .feed(ResourceType::Collections),
                )
                .with_body(json!({
                    "id": "items",
                    "partitionKey": { "paths": ["/tenant"], "kind": "Hash" }
                })),
            )
            .await
            .unwrap();
        assert_eq!(collection.status, 201);
        transport
    }

    #[tokio::test]
    async fn collection_requires_database() {
        let transport = InMemoryTransport::new();
        let response = transport
            .send(
                CosmosRequest::new(
                    OperationType::Create,
                    ResourceLink::root(ResourceType::Databases)
                        .item("missing")
                        .feed(ResourceType::Collections),
                )
                .with_body(json!({ "id": "items" })),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn documents_are_partitioned_by_path() {
        let transport = provisioned().await;
        for tenant in ["a", "b"] {
            let response = transport
                .send(
                    CosmosRequest::new(OperationType::Create, documents())
                        .with_body(json!({ "id": "1", "tenant": tenant })),
                )
                .await
                .unwrap();
            assert_eq!(response.status, 201);
            assert!(response.etag.is_some());
        }
        assert_eq!(transport.document_count("hub", "items"), Some(2));

        let scoped = transport
            .send(
                CosmosRequest::new(OperationType::Read, documents().item("1"))
                    .with_partition_key(Some("b".into())),
            )
            .await
            .unwrap();
        assert_eq!(scoped.body.unwrap()["tenant"], "b");

        let ambiguous = transport
            .send(CosmosRequest::new(OperationType::Read, documents().item("1")))
            .await
            .unwrap();
        assert_eq!(ambiguous.status, 400);
    }

    #[tokio::test]
    async fn stale_if_match_is_rejected() {
        let transport = provisioned().await;
        let created = transport
            .send(
                CosmosRequest::new(OperationType::Create, documents())
                    .with_body(json!({ "id": "1", "tenant": "a" })),
            )
            .await
            .unwrap();

        let replaced = transport
            .send(
                CosmosRequest::new(OperationType::Replace, documents().item("1"))
                    .with_partition_key(Some("a".into()))
                    .with_if_match(created.etag.clone())
                    .with_body(json!({ "id": "1", "tenant": "a", "n": 1 })),
            )
            .await
            .unwrap();
        assert_eq!(replaced.status, 200);
        assert_ne!(replaced.etag, created.etag);

        let stale = transport
            .send(
                CosmosRequest::new(OperationType::Replace, documents().item("1"))
                    .with_partition_key(Some("a".into()))
                    .with_if_match(created.etag)
                    .with_body(json!({ "id": "1", "tenant": "a", "n": 2 })),
            )
            .await
            .unwrap();
        assert_eq!(stale.status, 412);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let transport = provisioned().await;
        transport.fail_next(429, 1);
        transport.fail_next(503, 1);

        let read = || {
            transport.send(CosmosRequest::new(
                OperationType::Read,
                ResourceLink::root(ResourceType::Databases).item("hub"),
            ))
        };
        let first = read().await.unwrap();
        assert_eq!(first.status, 429);
        assert_eq!(first.retry_after, Some(Duration::from_millis(10)));
        assert_eq!(read().await.unwrap().status, 503);
        assert_eq!(read().await.unwrap().status, 200);
        assert_eq!(transport.request_count(), 5);
    }

    #[tokio::test]
    async fn unsupported_operations_are_rejected() {
        let transport = InMemoryTransport::new();
        let response = transport
            .send(CosmosRequest::new(
                OperationType::Delete,
                ResourceLink::root(ResourceType::Databases).item("hub"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status, 405);
    }
}
