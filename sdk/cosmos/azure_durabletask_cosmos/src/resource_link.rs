// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// The kinds of resources addressed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    DatabaseAccount,
    Databases,
    Collections,
    Documents,
    StoredProcedures,
}

impl ResourceType {
    /// The path segment (and signature resource type) used by the REST API.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceType::DatabaseAccount => "",
            ResourceType::Databases => "dbs",
            ResourceType::Collections => "colls",
            ResourceType::Documents => "docs",
            ResourceType::StoredProcedures => "sprocs",
        }
    }
}

/// Addresses either a single resource (`dbs/hub/colls/items/docs/42`) or a feed of
/// resources under a parent (`dbs/hub/colls/items/docs`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLink {
    segments: Vec<(ResourceType, String)>,
    feed: Option<ResourceType>,
}

impl ResourceLink {
    /// The database account itself.
    pub fn account() -> Self {
        Self {
            segments: Vec::new(),
            feed: None,
        }
    }

    /// A top-level feed, such as the databases in the account.
    pub fn root(feed: ResourceType) -> Self {
        Self {
            segments: Vec::new(),
            feed: Some(feed),
        }
    }

    /// The feed of `resource_type` resources beneath this resource.
    pub fn feed(&self, resource_type: ResourceType) -> Self {
        Self {
            segments: self.segments.clone(),
            feed: Some(resource_type),
        }
    }

    /// A single resource within this feed.
    ///
    /// On a link that is not a feed, the id is treated as a database id.
    pub fn item(&self, id: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push((self.feed.unwrap_or(ResourceType::Databases), id.into()));
        Self {
            segments,
            feed: None,
        }
    }

    /// Whether this link addresses a feed rather than a single resource.
    pub fn is_feed(&self) -> bool {
        self.feed.is_some()
    }

    /// The type of the resource (or of the feed's resources).
    pub fn resource_type(&self) -> ResourceType {
        match (self.feed, self.segments.last()) {
            (Some(feed), _) => feed,
            (None, Some((resource_type, _))) => *resource_type,
            (None, None) => ResourceType::DatabaseAccount,
        }
    }

    /// The id of the segment of the given type, if present.
    pub fn id_of(&self, resource_type: ResourceType) -> Option<&str> {
        self.segments
            .iter()
            .find(|(t, _)| *t == resource_type)
            .map(|(_, id)| id.as_str())
    }

    /// The id of the addressed resource, when this link addresses a single resource.
    pub fn id(&self) -> Option<&str> {
        match self.feed {
            Some(_) => None,
            None => self.segments.last().map(|(_, id)| id.as_str()),
        }
    }

    /// The resource link used when signing a request.
    ///
    /// For a feed this is the parent resource; for a single resource it is the resource itself.
    /// Ids are not escaped.
    pub fn signing_link(&self) -> String {
        self.segments
            .iter()
            .flat_map(|(t, id)| [t.path_segment(), id.as_str()])
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Resolves this link against an account endpoint, escaping every id.
    pub fn url(&self, endpoint: &Url) -> Result<Url> {
        let mut url = endpoint.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::invalid_request(format!("'{endpoint}' cannot be a base URL")))?;
            path.pop_if_empty();
            for (resource_type, id) in &self.segments {
                path.push(resource_type.path_segment());
                path.push(id);
            }
            if let Some(feed) = self.feed {
                path.push(feed.path_segment());
            }
        }
        Ok(url)
    }
}

impl fmt::Display for ResourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let link = self.signing_link();
        match self.feed {
            Some(feed) if link.is_empty() => f.write_str(feed.path_segment()),
            Some(feed) => write!(f, "{}/{}", link, feed.path_segment()),
            None => f.write_str(&link),
        }
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

    #[test]
    fn feed_link_signs_with_parent() {
        let link = documents();
        assert!(link.is_feed());
        assert_eq!(link.resource_type(), ResourceType::Documents);
        assert_eq!(link.signing_link(), "dbs/hub/colls/items");
        assert_eq!(link.to_string(), "dbs/hub/colls/items/docs");
        assert_eq!(link.id(), None);
    }

    #[test]
    fn item_link_signs_with_itself() {
        let link = documents().item("42");
        assert!(!link.is_feed());
        assert_eq!(link.resource_type(), ResourceType::Documents);
        assert_eq!(link.signing_link(), "dbs/hub/colls/items/docs/42");
        assert_eq!(link.id(), Some("42"));
        assert_eq!(link.id_of(ResourceType::Databases), Some("hub"));
        assert_eq!(link.id_of(ResourceType::Collections), Some("items"));
    }

    #[test]
    fn account_link() {
        let link = ResourceLink::account();
        assert_eq!(link.resource_type(), ResourceType::DatabaseAccount);
        assert_eq!(link.signing_link(), "");
    }

    #[test]
    fn url_escapes_ids() {
        let endpoint = Url::parse("https://account.documents.azure.com:443/").unwrap();
        let url = documents().item("a b").url(&endpoint).unwrap();
        assert_eq!(
            url.as_str(),
            "https://account.documents.azure.com/dbs/hub/colls/items/docs/a%20b"
        );
    }

    #[test]
    fn root_feed_url() {
        let endpoint = Url::parse("https://account.documents.azure.com/").unwrap();
        let url = ResourceLink::root(ResourceType::Databases)
            .url(&endpoint)
            .unwrap();
        assert_eq!(url.as_str(), "https://account.documents.azure.com/dbs");
    }
}
