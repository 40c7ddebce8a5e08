// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use azure_core::{
    http::{
        headers::{HeaderName, Headers},
        new_http_client,
        request::options::ContentType,
        HttpClient, Method, Request,
    },
    time::OffsetDateTime,
};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    connection::{ClientFactory, ConnectionDescriptor},
    constants,
    error::{Error, ErrorKind, Result},
    models::ETag,
    resource_link::ResourceLink,
    transport::{
        auth::{self, MasterKeyCredential},
        location_cache::{AccountProperties, LocationCache},
        CosmosRequest, CosmosResponse, CosmosTransport, OperationType,
    },
};

/// Talks to a Cosmos DB account through its HTTPS gateway.
///
/// Requests go straight to the `azure_core` [`HttpClient`] with no pipeline policies in between,
/// so throttled and unavailable responses reach the caller unretried.
///
/// Construction performs no I/O: the HTTP connection pool fills on the first request, and the
/// account topology is only read when a preferred read location has to be resolved.
#[derive(Debug)]
pub struct GatewayTransport {
    http: Arc<dyn HttpClient>,
    endpoint: Url,
    credential: MasterKeyCredential,
    locations: LocationCache,
    request_timeout: Duration,
}

impl GatewayTransport {
    /// Creates a transport for the descriptor's account.
    ///
    /// Fails with [`ErrorKind::InvalidRequest`] when the account key is not valid base64.
    pub fn new(descriptor: &ConnectionDescriptor) -> Result<Self> {
        Ok(Self {
            http: new_http_client(),
            endpoint: descriptor.endpoint().clone(),
            credential: MasterKeyCredential::new(descriptor.primary_key())?,
            locations: LocationCache::new(
                descriptor.endpoint().clone(),
                descriptor.preferred_locations().to_vec(),
            ),
            request_timeout: descriptor.request_timeout(),
        })
    }

    async fn read_account(&self) -> Result<AccountProperties> {
        let request = CosmosRequest::new(OperationType::Read, ResourceLink::account());
        self.execute(&self.endpoint, &request)
            .await?
            .into_result(request.operation, &request.link)?
            .into_body()
    }

    async fn execute(&self, endpoint: &Url, request: &CosmosRequest) -> Result<CosmosResponse> {
        let date = auth::format_date(&OffsetDateTime::now_utc());
        let http_request = build_request(&self.credential, endpoint, request, &date)?;

        let exchange = async {
            let response = self.http.execute_request(&http_request).await?;
            let status = u16::from(response.status());
            let headers = response.headers().clone();
            let body = response.into_body().collect().await?;
            Ok::<_, azure_core::Error>((status, headers, body))
        };
        let (status, headers, body) = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| {
                Error::new(
                    ErrorKind::TransportFailure,
                    format!(
                        "{} on '{}' got no response within {:?}",
                        request.operation, request.link, self.request_timeout
                    ),
                )
            })??;

        debug!(
            operation = %request.operation,
            link = %request.link,
            status,
            "Cosmos DB gateway request completed"
        );
        parse_response(status, &headers, &body)
    }
}

#[async_trait]
impl CosmosTransport for GatewayTransport {
    async fn send(&self, request: CosmosRequest) -> Result<CosmosResponse> {
        let endpoint = if request.operation.is_read_only() {
            self.locations.read_endpoint(|| self.read_account()).await
        } else {
            self.endpoint.clone()
        };
        self.execute(&endpoint, &request).await
    }
}

/// Builds the signed HTTP request for `request` against `endpoint`.
///
/// `date` is sent as `x-ms-date` and covered by the signature.
pub(crate) fn build_request(
    credential: &MasterKeyCredential,
    endpoint: &Url,
    request: &CosmosRequest,
    date: &str,
) -> Result<Request> {
    let authorization = credential.authorization(
        verb_for(request.operation),
        request.link.resource_type(),
        &request.link.signing_link(),
        date,
    )?;

    let mut req = Request::new(request.link.url(endpoint)?, method_for(request.operation));
    req.insert_header(constants::AUTHORIZATION, authorization);
    req.insert_header(constants::DATE, date.to_string());
    req.insert_header(constants::API_VERSION_HEADER, constants::API_VERSION);
    if let Some(partition_key) = &request.partition_key {
        req.insert_header(constants::PARTITION_KEY, partition_key.to_header_value());
    }
    if let Some(etag) = &request.if_match {
        req.insert_header(constants::IF_MATCH, etag.as_str().to_string());
    }
    if let Some(throughput) = request.offer_throughput {
        req.insert_header(constants::OFFER_THROUGHPUT, throughput.to_string());
    }
    if request.operation == OperationType::Upsert {
        req.insert_header(constants::IS_UPSERT, "True");
    }
    if let Some(body) = &request.body {
        req.add_mandatory_header(&ContentType::APPLICATION_JSON);
        req.set_json(body)?;
    }
    Ok(req)
}

/// Reads the status, the Cosmos DB response headers and the JSON body of a gateway response.
pub(crate) fn parse_response(status: u16, headers: &Headers, body: &[u8]) -> Result<CosmosResponse> {
    let body = if body.is_empty() {
        None
    } else if (200..300).contains(&status) {
        Some(serde_json::from_slice(body)?)
    } else {
        // Error payloads are JSON from the service but may be plain text from a proxy.
        Some(
            serde_json::from_slice(body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
        )
    };

    Ok(CosmosResponse {
        status,
        etag: header(headers, &constants::ETAG).map(ETag::from),
        request_charge: header(headers, &constants::REQUEST_CHARGE)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
        activity_id: header(headers, &constants::ACTIVITY_ID).map(str::to_string),
        retry_after: header(headers, &constants::RETRY_AFTER_MS)
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis),
        body,
    })
}

fn method_for(operation: OperationType) -> Method {
    match operation {
        OperationType::Create | OperationType::Upsert | OperationType::Execute => Method::Post,
        OperationType::Read => Method::Get,
        OperationType::Replace => Method::Put,
        OperationType::Delete => Method::Delete,
    }
}

/// The verb covered by the request signature.
fn verb_for(operation: OperationType) -> &'static str {
    match method_for(operation) {
        Method::Get => "GET",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        _ => "POST",
    }
}

fn header<'a>(headers: &'a Headers, name: &HeaderName) -> Option<&'a str> {
    headers.get_optional_str(name)
}

/// Creates a [`GatewayTransport`] for each new account fingerprint.
#[derive(Clone, Copy, Debug, Default)]
pub struct GatewayClientFactory;

impl ClientFactory for GatewayClientFactory {
    fn create(&self, descriptor: &ConnectionDescriptor) -> Result<Arc<dyn CosmosTransport>> {
        Ok(Arc::new(GatewayTransport::new(descriptor)?))
    }
}
