// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::future::Future;

use async_lock::OnceCell;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;

/// The subset of the database account resource used for routing reads.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountProperties {
    #[serde(default)]
    pub readable_locations: Vec<AccountRegion>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct AccountRegion {
    pub name: String,
    #[serde(rename = "databaseAccountEndpoint")]
    pub endpoint: String,
}

/// Picks the endpoint that serves reads, honoring the configured location preferences.
///
/// The account topology is fetched on the first read, never at construction, and cached for the
/// life of the client. A failed lookup is not cached.
#[derive(Debug)]
pub(crate) struct LocationCache {
    default_endpoint: Url,
    preferred_locations: Vec<String>,
    read_endpoint: OnceCell<Url>,
}

impl LocationCache {
    pub(crate) fn new(default_endpoint: Url, preferred_locations: Vec<String>) -> Self {
        Self {
            default_endpoint,
            preferred_locations,
            read_endpoint: OnceCell::new(),
        }
    }

    pub(crate) async fn read_endpoint<F, Fut>(&self, fetch_account: F) -> Url
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccountProperties>>,
    {
        if self.preferred_locations.is_empty() {
            return self.default_endpoint.clone();
        }

        let resolved = self
            .read_endpoint
            .get_or_try_init(|| async {
                let account = fetch_account().await?;
                Ok::<_, crate::Error>(self.select(&account))
            })
            .await;

        match resolved {
            Ok(endpoint) => endpoint.clone(),
            Err(error) => {
                warn!(%error, "could not read account locations; reading from the account endpoint");
                self.default_endpoint.clone()
            }
        }
    }

    fn select(&self, account: &AccountProperties) -> Url {
        for preferred in &self.preferred_locations {
            let region = account
                .readable_locations
                .iter()
                .find(|region| same_location(&region.name, preferred));
            if let Some(region) = region {
                match Url::parse(&region.endpoint) {
                    Ok(endpoint) => {
                        debug!(location = %region.name, %endpoint, "serving reads from preferred location");
                        return endpoint;
                    }
                    Err(error) => {
                        warn!(location = %region.name, %error, "ignoring location with an invalid endpoint")
                    }
                }
            }
        }
        self.default_endpoint.clone()
    }
}

/// Location names compare case-insensitively and ignore whitespace ("West US" == "westus").
fn same_location(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    normalize(a) == normalize(b)
}
