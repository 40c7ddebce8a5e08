// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! The seam between the document store and the database.
//!
//! Everything the store needs from Cosmos DB goes through [`CosmosTransport::send`]. The
//! [`GatewayTransport`] talks to a real account over HTTPS. With the `emulator` feature,
//! `InMemoryTransport` emulates one in-process for tests.

mod auth;
#[cfg(any(test, feature = "emulator"))]
mod emulator;
mod gateway;
mod location_cache;

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{Error, ErrorKind, Result},
    models::{ETag, ItemResponse},
    resource_link::ResourceLink,
    PartitionKey,
};

#[cfg(any(test, feature = "emulator"))]
#[cfg_attr(docsrs, doc(cfg(feature = "emulator")))]
pub use emulator::*;
pub use gateway::*;

/// The operation a [`CosmosRequest`] performs on its resource link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Create,
    Read,
    Replace,
    Upsert,
    Delete,
    Execute,
}

impl OperationType {
    /// Whether the operation only reads state, and may be served by a read region.
    pub fn is_read_only(&self) -> bool {
        matches!(self, OperationType::Read)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single request to the database.
#[derive(Clone, Debug)]
pub struct CosmosRequest {
    pub operation: OperationType,
    /// The resource, or the feed for creates, the operation targets.
    pub link: ResourceLink,
    pub partition_key: Option<PartitionKey>,
    pub if_match: Option<ETag>,
    /// Throughput (RU/s) to provision, for collection creation.
    pub offer_throughput: Option<u32>,
    pub body: Option<Value>,
}

impl CosmosRequest {
    /// Creates a request with no partition key, precondition or body.
    pub fn new(operation: OperationType, link: ResourceLink) -> Self {
        Self {
            operation,
            link,
            partition_key: None,
            if_match: None,
            offer_throughput: None,
            body: None,
        }
    }

    /// Scopes the request to one logical partition.
    pub fn with_partition_key(mut self, partition_key: Option<PartitionKey>) -> Self {
        self.partition_key = partition_key;
        self
    }

    /// Makes the request conditional on the resource's current ETag.
    pub fn with_if_match(mut self, etag: Option<ETag>) -> Self {
        self.if_match = etag;
        self
    }

    /// Provisions `throughput` RU/s for the collection being created.
    pub fn with_offer_throughput(mut self, throughput: u32) -> Self {
        self.offer_throughput = Some(throughput);
        self
    }

    /// Sets the JSON payload sent with the request.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The raw outcome of a [`CosmosRequest`], successful or not.
#[derive(Clone, Debug, Default)]
pub struct CosmosResponse {
    pub status: u16,
    pub etag: Option<ETag>,
    /// Request units the operation consumed.
    pub request_charge: f64,
    pub activity_id: Option<String>,
    /// The back-off the service asked for with a throttled response.
    pub retry_after: Option<Duration>,
    pub body: Option<Value>,
}

impl CosmosResponse {
    /// Creates a response with the given status and nothing else.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_etag(mut self, etag: ETag) -> Self {
        self.etag = Some(etag);
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns an unsuccessful response into an [`Error`] whose kind reflects the status code.
    pub fn into_result(self, operation: OperationType, link: &ResourceLink) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let field = |name: &str| {
            self.body
                .as_ref()
                .and_then(|body| body.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let error_code = field("code");
        let message = field("message").unwrap_or_else(|| {
            format!(
                "{operation} on '{link}' failed with status {}",
                self.status
            )
        });

        let kind = match ErrorKind::from_status(self.status, error_code) {
            ErrorKind::Throttled { .. } => ErrorKind::Throttled {
                retry_after: self.retry_after,
            },
            kind => kind,
        };
        Err(Error::new(kind, message))
    }

    /// Deserializes the body. A missing body deserializes as JSON `null`.
    pub fn into_body<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body.unwrap_or(Value::Null))?)
    }

    pub(crate) fn into_item_response<T: DeserializeOwned>(self) -> Result<ItemResponse<T>> {
        let etag = self.etag.clone().or_else(|| {
            self.body
                .as_ref()
                .and_then(|body| body.get("_etag"))
                .and_then(Value::as_str)
                .map(ETag::from)
        });
        let request_charge = self.request_charge;
        let activity_id = self.activity_id.clone();
        let item = self.into_body()?;
        Ok(ItemResponse::new(item, etag, request_charge, activity_id))
    }
}

/// Sends requests to a Cosmos DB account.
///
/// Implementations are shared by every store pooled under the same fingerprint, so they must be
/// safe to use concurrently and must not mutate their configuration after construction.
/// Unsuccessful service responses are returned as `Ok` with the status set; `Err` is reserved for
/// requests that never produced a response.
#[async_trait]
pub trait CosmosTransport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the service's response, successful or not.
    async fn send(&self, request: CosmosRequest) -> Result<CosmosResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_link::ResourceType;
    use serde_json::json;

    fn link() -> ResourceLink {
        ResourceLink::root(ResourceType::Databases)
            .item("hub")
            .feed(ResourceType::Collections)
            .item("items")
            .feed(ResourceType::Documents)
            .item("1")
    }

    #[test]
    fn success_passes_through() {
        let response = CosmosResponse::new(201)
            .with_body(json!({ "id": "1" }))
            .into_result(OperationType::Create, &link())
            .unwrap();
        assert_eq!(response.status, 201);
    }

    #[test]
    fn service_message_is_used() {
        let error = CosmosResponse::new(409)
            .with_body(json!({ "code": "Conflict", "message": "Entity with the specified id already exists" }))
            .into_result(OperationType::Create, &link())
            .unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::Conflict);
        assert_eq!(error.message(), "Entity with the specified id already exists");
    }

    #[test]
    fn throttling_keeps_retry_after() {
        let mut response = CosmosResponse::new(429);
        response.retry_after = Some(Duration::from_millis(40));
        let error = response
            .into_result(OperationType::Read, &link())
            .unwrap_err();
        assert_eq!(error.retry_after(), Some(Duration::from_millis(40)));
        assert!(error.is_retriable());
    }

    #[test]
    fn fallback_message_names_the_link() {
        let error = CosmosResponse::new(404)
            .into_result(OperationType::Read, &link())
            .unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::NotFound);
        assert_eq!(
            error.message(),
            "Read on 'dbs/hub/colls/items/docs/1' failed with status 404"
        );
    }

    #[test]
    fn item_response_takes_etag_from_body_when_header_missing() {
        let response = CosmosResponse::new(200)
            .with_body(json!({ "id": "1", "_etag": "\"abc\"" }))
            .into_item_response::<Value>()
            .unwrap();
        assert_eq!(response.etag(), Some(&ETag::from("\"abc\"")));
    }
}
