// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Constants used by the persistence layer and its Cosmos DB transport.

use std::time::Duration;

use azure_core::http::headers::HeaderName;

/// Documents larger than this (1.5 MiB) should be externalized by the caller before they are stored.
///
/// The limit is advisory and not enforced here.
pub const MAX_DOCUMENT_SIZE_IN_BYTES: usize = (512 + 1024) * 1024;

/// The request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The fixed back-off between attempts of a retriable operation.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Number of retries performed when the connection does not configure a budget.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 9;

/// Throughput (RU/s) provisioned for collections created by this crate.
pub const DEFAULT_OFFER_THROUGHPUT: u32 = 5000;

/// The REST API version sent with every request.
pub const API_VERSION: &str = "2018-12-31";

pub const AUTHORIZATION: HeaderName = HeaderName::from_static("authorization");
pub const ACTIVITY_ID: HeaderName = HeaderName::from_static("x-ms-activity-id");
pub const API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-ms-version");
pub const DATE: HeaderName = HeaderName::from_static("x-ms-date");
pub const ETAG: HeaderName = HeaderName::from_static("etag");
pub const IF_MATCH: HeaderName = HeaderName::from_static("if-match");
/// Turns a document create into an upsert.
pub const IS_UPSERT: HeaderName = HeaderName::from_static("x-ms-documentdb-is-upsert");
/// Throughput (RU/s) to provision for a new collection.
pub const OFFER_THROUGHPUT: HeaderName = HeaderName::from_static("x-ms-offer-throughput");
/// The target partition, as a single-element JSON array.
pub const PARTITION_KEY: HeaderName = HeaderName::from_static("x-ms-documentdb-partitionkey");
/// Request units consumed by the operation.
pub const REQUEST_CHARGE: HeaderName = HeaderName::from_static("x-ms-request-charge");
/// How long to wait before retrying a throttled request, in milliseconds.
pub const RETRY_AFTER_MS: HeaderName = HeaderName::from_static("x-ms-retry-after-ms");
