// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{fmt, str::FromStr};

use crate::{
    connection::Secret,
    error::{Error, Result},
};

/// A parsed Cosmos DB account connection string.
///
/// The expected form is `AccountEndpoint=https://...;AccountKey=...;`. Key names are matched
/// case-insensitively and unknown keys are ignored.
#[derive(Clone)]
pub struct ConnectionString {
    pub account_endpoint: String,
    pub account_key: Secret,
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut account_endpoint = None;
        let mut account_key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may end with '=', so only the first '=' separates the pair.
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::invalid_request(format!(
                    "connection string segment '{}' is not a key=value pair",
                    key_only(part)
                ))
            })?;

            if key.trim().eq_ignore_ascii_case("AccountEndpoint") {
                account_endpoint = Some(value.trim().to_string());
            } else if key.trim().eq_ignore_ascii_case("AccountKey") {
                account_key = Some(Secret::new(value.trim().to_string()));
            }
        }

        match (account_endpoint, account_key) {
            (Some(account_endpoint), Some(account_key)) => Ok(Self {
                account_endpoint,
                account_key,
            }),
            (None, _) => Err(Error::invalid_request(
                "connection string is missing 'AccountEndpoint'",
            )),
            (_, None) => Err(Error::invalid_request(
                "connection string is missing 'AccountKey'",
            )),
        }
    }
}

fn key_only(segment: &str) -> &str {
    // Never echo a value back; it may be the account key.
    segment.split('=').next().unwrap_or_default()
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_endpoint", &self.account_endpoint)
            .field("account_key", &self.account_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_endpoint_and_key() {
        let cs: ConnectionString =
            "AccountEndpoint=https://acct.documents.azure.com:443/;AccountKey=c2VjcmV0==;"
                .parse()
                .unwrap();
        assert_eq!(cs.account_endpoint, "https://acct.documents.azure.com:443/");
        assert_eq!(cs.account_key.secret(), "c2VjcmV0==");
    }

    #[test]
    fn keys_are_case_insensitive_and_unknown_keys_ignored() {
        let cs: ConnectionString =
            "accountendpoint=https://a/; Database=x; ACCOUNTKEY=k".parse().unwrap();
        assert_eq!(cs.account_endpoint, "https://a/");
        assert_eq!(cs.account_key.secret(), "k");
    }

    #[test]
    fn missing_key_fails() {
        let err = "AccountEndpoint=https://a/"
            .parse::<ConnectionString>()
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidRequest);
        assert!(err.message().contains("AccountKey"));
    }

    #[test]
    fn malformed_segment_fails() {
        let err = "AccountEndpoint".parse::<ConnectionString>().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidRequest);
    }

    #[test]
    fn debug_redacts_key() {
        let cs: ConnectionString = "AccountEndpoint=https://a/;AccountKey=topsecret"
            .parse()
            .unwrap();
        assert!(!format!("{cs:?}").contains("topsecret"));
    }
}
