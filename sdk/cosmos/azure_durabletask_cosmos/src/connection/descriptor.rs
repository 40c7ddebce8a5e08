// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{fmt, time::Duration};

use url::Url;

use crate::{
    connection::{ConnectionString, Secret},
    constants,
    error::{Error, Result},
    resource_link::{ResourceLink, ResourceType},
};

/// The credential a pooled client authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialRole {
    Primary,
}

impl fmt::Display for CredentialRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialRole::Primary => f.write_str("Primary"),
        }
    }
}

/// Identifies a reusable client by account identity.
///
/// The fingerprint depends only on the endpoint and the credential role. Descriptors that differ
/// only in database, collection or location preferences share a fingerprint, and therefore a
/// pooled client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The fingerprint as a string, `{endpoint}-{role}`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Describes how to reach one collection of a Cosmos DB account.
///
/// A descriptor is immutable. Use [`with_collection`](ConnectionDescriptor::with_collection) or
/// [`with_database`](ConnectionDescriptor::with_database) to derive a descriptor for another
/// collection of the same account.
///
/// ```rust
/// use azure_durabletask_cosmos::ConnectionDescriptor;
///
/// let descriptor = ConnectionDescriptor::builder(
///     "https://myaccount.documents.azure.com:443/",
///     "bXlrZXk=",
///     "durabletask",
///     "instances",
/// )
/// .preferred_locations(["West US 2", "East US"])
/// .build()
/// .unwrap();
///
/// assert_eq!(
///     descriptor.fingerprint().as_str(),
///     "https://myaccount.documents.azure.com/-Primary"
/// );
/// ```
#[derive(Clone)]
pub struct ConnectionDescriptor {
    endpoint: Url,
    primary_key: Secret,
    database_name: String,
    collection_name: String,
    preferred_locations: Vec<String>,
    request_timeout: Duration,
    concurrent_update_retry_count: Option<u32>,
}

impl ConnectionDescriptor {
    /// Starts building a descriptor for `collection` in `database` of the account at `endpoint`.
    pub fn builder(
        endpoint: impl Into<String>,
        primary_key: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> ConnectionDescriptorBuilder {
        let primary_key: String = primary_key.into();
        ConnectionDescriptorBuilder {
            endpoint: endpoint.into(),
            primary_key: Secret::new(primary_key),
            database_name: database.into(),
            collection_name: collection.into(),
            preferred_locations: Vec::new(),
            request_timeout: None,
            concurrent_update_retry_count: None,
        }
    }

    /// The account endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The key used to sign requests.
    pub fn primary_key(&self) -> &Secret {
        &self.primary_key
    }

    /// The role of the key the descriptor signs with. Always the primary key.
    pub fn credential_role(&self) -> CredentialRole {
        CredentialRole::Primary
    }

    /// The database that holds the collection.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// The collection documents are read from and written to.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Regions to serve reads from, in order of preference.
    pub fn preferred_locations(&self) -> &[String] {
        &self.preferred_locations
    }

    /// How long a single request may take before it fails as a transport failure.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// The number of times callers should retry a conflicting concurrent update.
    ///
    /// `None` means "use the provider default".
    pub fn concurrent_update_retry_count(&self) -> Option<u32> {
        self.concurrent_update_retry_count
    }

    /// Size above which callers should externalize a document instead of storing it inline.
    pub fn max_document_size(&self) -> usize {
        constants::MAX_DOCUMENT_SIZE_IN_BYTES
    }

    /// `dbs/{database}`
    pub fn database_link(&self) -> ResourceLink {
        ResourceLink::root(ResourceType::Databases).item(&self.database_name)
    }

    /// `dbs/{database}/colls/{collection}`
    pub fn collection_link(&self) -> ResourceLink {
        self.database_link()
            .feed(ResourceType::Collections)
            .item(&self.collection_name)
    }

    /// `dbs/{database}/colls/{collection}/docs/{id}`
    pub fn document_link(&self, document_id: &str) -> ResourceLink {
        self.collection_link()
            .feed(ResourceType::Documents)
            .item(document_id)
    }

    /// `dbs/{database}/colls/{collection}/sprocs/{id}`
    pub fn stored_procedure_link(&self, procedure_id: &str) -> ResourceLink {
        self.collection_link()
            .feed(ResourceType::StoredProcedures)
            .item(procedure_id)
    }

    /// The key under which the client for this account is pooled.
    ///
    /// Stable across process restarts.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(format!("{}-{}", self.endpoint, self.credential_role()))
    }

    /// Returns a descriptor for another collection in the same database.
    pub fn with_collection(&self, collection: impl Into<String>) -> Result<Self> {
        let collection_name = collection.into();
        validate_name("collection", &collection_name)?;
        Ok(Self {
            collection_name,
            ..self.clone()
        })
    }

    /// Returns a descriptor for the same collection name in another database.
    pub fn with_database(&self, database: impl Into<String>) -> Result<Self> {
        let database_name = database.into();
        validate_name("database", &database_name)?;
        Ok(Self {
            database_name,
            ..self.clone()
        })
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("endpoint", &self.endpoint.as_str())
            .field("primary_key", &self.primary_key)
            .field("database_name", &self.database_name)
            .field("collection_name", &self.collection_name)
            .field("preferred_locations", &self.preferred_locations)
            .field("request_timeout", &self.request_timeout)
            .field(
                "concurrent_update_retry_count",
                &self.concurrent_update_retry_count,
            )
            .finish()
    }
}

/// Builder used to construct a [`ConnectionDescriptor`].
///
/// Obtain one by calling [`ConnectionDescriptor::builder()`] or
/// [`ConnectionDescriptorBuilder::from_connection_string()`].
#[derive(Clone, Debug)]
pub struct ConnectionDescriptorBuilder {
    endpoint: String,
    primary_key: Secret,
    database_name: String,
    collection_name: String,
    preferred_locations: Vec<String>,
    request_timeout: Option<Duration>,
    concurrent_update_retry_count: Option<u32>,
}

impl ConnectionDescriptorBuilder {
    /// Starts a builder from an `AccountEndpoint=...;AccountKey=...;` connection string.
    pub fn from_connection_string(
        connection_string: &str,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self> {
        let parsed: ConnectionString = connection_string.parse()?;
        Ok(ConnectionDescriptor::builder(
            parsed.account_endpoint,
            parsed.account_key.secret(),
            database,
            collection,
        ))
    }

    /// Regions to serve reads from, in order of preference.
    pub fn preferred_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Per-request timeout. Defaults to one minute.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Retry budget for conflicting concurrent updates. Defaults to the provider default.
    pub fn concurrent_update_retry_count(mut self, count: u32) -> Self {
        self.concurrent_update_retry_count = Some(count);
        self
    }

    /// Validates the configuration and builds the descriptor.
    pub fn build(self) -> Result<ConnectionDescriptor> {
        let endpoint = Url::parse(&self.endpoint)?;
        if !matches!(endpoint.scheme(), "https" | "http") || endpoint.cannot_be_a_base() {
            return Err(Error::invalid_request(format!(
                "'{endpoint}' is not an HTTP(S) account endpoint"
            )));
        }
        if self.primary_key.secret().is_empty() {
            return Err(Error::invalid_request("the primary key must not be empty"));
        }
        validate_name("database", &self.database_name)?;
        validate_name("collection", &self.collection_name)?;

        let request_timeout = self
            .request_timeout
            .unwrap_or(constants::DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(Error::invalid_request("the request timeout must be positive"));
        }

        Ok(ConnectionDescriptor {
            endpoint,
            primary_key: self.primary_key,
            database_name: self.database_name,
            collection_name: self.collection_name,
            preferred_locations: self.preferred_locations,
            request_timeout,
            concurrent_update_retry_count: self.concurrent_update_retry_count,
        })
    }
}

fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_request(format!(
            "the {what} name must not be empty"
        )));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '?' | '#')) {
        return Err(Error::invalid_request(format!(
            "the {what} name '{name}' contains the reserved character '{c}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn builder() -> ConnectionDescriptorBuilder {
        ConnectionDescriptor::builder(
            "https://account.documents.azure.com:443/",
            "a2V5",
            "hub",
            "instances",
        )
    }

    #[test]
    fn defaults() {
        let descriptor = builder().build().unwrap();
        assert_eq!(descriptor.request_timeout(), Duration::from_secs(60));
        assert_eq!(descriptor.concurrent_update_retry_count(), None);
        assert!(descriptor.preferred_locations().is_empty());
        assert_eq!(descriptor.max_document_size(), 1_572_864);
        assert_eq!(descriptor.credential_role(), CredentialRole::Primary);
    }

    #[test]
    fn fingerprint_ignores_collection_database_and_locations() {
        let a = builder().build().unwrap();
        let b = ConnectionDescriptor::builder(
            "https://account.documents.azure.com:443/",
            "a2V5",
            "other-db",
            "history",
        )
        .preferred_locations(["East US"])
        .request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            a.fingerprint().as_str(),
            "https://account.documents.azure.com/-Primary"
        );
    }

    #[test]
    fn fingerprint_differs_per_endpoint() {
        let a = builder().build().unwrap();
        let b = ConnectionDescriptor::builder(
            "https://other.documents.azure.com:443/",
            "a2V5",
            "hub",
            "instances",
        )
        .build()
        .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn links() {
        let descriptor = builder().build().unwrap();
        assert_eq!(descriptor.database_link().to_string(), "dbs/hub");
        assert_eq!(
            descriptor.collection_link().to_string(),
            "dbs/hub/colls/instances"
        );
        assert_eq!(
            descriptor.document_link("i-1").to_string(),
            "dbs/hub/colls/instances/docs/i-1"
        );
        assert_eq!(
            descriptor.stored_procedure_link("lock").to_string(),
            "dbs/hub/colls/instances/sprocs/lock"
        );
    }

    #[test]
    fn with_collection_keeps_everything_else() {
        let descriptor = builder()
            .preferred_locations(["West US"])
            .concurrent_update_retry_count(3)
            .build()
            .unwrap();
        let history = descriptor.with_collection("history").unwrap();
        assert_eq!(history.collection_name(), "history");
        assert_eq!(history.database_name(), "hub");
        assert_eq!(history.preferred_locations(), ["West US".to_string()]);
        assert_eq!(history.concurrent_update_retry_count(), Some(3));
        assert_eq!(descriptor.collection_name(), "instances");
        assert_eq!(history.fingerprint(), descriptor.fingerprint());
    }

    #[test]
    fn rejects_invalid_configuration() {
        let bad_endpoint = ConnectionDescriptor::builder("not a url", "k", "d", "c")
            .build()
            .unwrap_err();
        assert_eq!(bad_endpoint.kind(), &ErrorKind::InvalidRequest);

        let bad_scheme = ConnectionDescriptor::builder("ftp://host/", "k", "d", "c")
            .build()
            .unwrap_err();
        assert_eq!(bad_scheme.kind(), &ErrorKind::InvalidRequest);

        let empty_key = ConnectionDescriptor::builder("https://host/", "", "d", "c")
            .build()
            .unwrap_err();
        assert_eq!(empty_key.kind(), &ErrorKind::InvalidRequest);

        let bad_name = ConnectionDescriptor::builder("https://host/", "k", "d", "a/b")
            .build()
            .unwrap_err();
        assert_eq!(bad_name.kind(), &ErrorKind::InvalidRequest);

        let zero_timeout = builder()
            .request_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(zero_timeout.kind(), &ErrorKind::InvalidRequest);
    }

    #[test]
    fn from_connection_string() {
        let descriptor = ConnectionDescriptorBuilder::from_connection_string(
            "AccountEndpoint=https://account.documents.azure.com:443/;AccountKey=a2V5;",
            "hub",
            "instances",
        )
        .unwrap()
        .build()
        .unwrap();
        assert_eq!(descriptor.primary_key().secret(), "a2V5");
        assert_eq!(
            descriptor.fingerprint(),
            builder().build().unwrap().fingerprint()
        );
    }

    #[test]
    fn debug_does_not_leak_key() {
        let descriptor = builder().build().unwrap();
        let rendered = format!("{descriptor:?}");
        assert!(!rendered.contains("a2V5"));
        assert!(rendered.contains("instances"));
    }
}
