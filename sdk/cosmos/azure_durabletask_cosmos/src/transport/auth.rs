// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Master-key request signing.

use std::fmt;

use azure_core::{
    credentials::Secret,
    hmac::hmac_sha256,
    time::{to_rfc7231, OffsetDateTime},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{
    error::{Error, ErrorKind, Result},
    resource_link::ResourceType,
};

/// Characters left unescaped in the authorization header, as in URL form encoding.
const AUTHORIZATION_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Signs requests with an account's master key.
pub(crate) struct MasterKeyCredential {
    key: Secret,
}

impl MasterKeyCredential {
    /// Fails with [`ErrorKind::InvalidRequest`] unless the key is valid base64.
    pub(crate) fn new(secret: &Secret) -> Result<Self> {
        STANDARD.decode(secret.secret()).map_err(|e| {
            Error::full(
                ErrorKind::InvalidRequest,
                e,
                "the account key is not valid base64",
            )
        })?;
        Ok(Self {
            key: secret.clone(),
        })
    }

    /// Builds the `authorization` header value for a request.
    ///
    /// `date` must be the exact value sent in the `x-ms-date` header.
    pub(crate) fn authorization(
        &self,
        verb: &str,
        resource_type: ResourceType,
        resource_link: &str,
        date: &str,
    ) -> Result<String> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.path_segment(),
            resource_link,
            date.to_lowercase()
        );
        let signature = hmac_sha256(&payload, &self.key)?;

        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(utf8_percent_encode(&token, AUTHORIZATION_ENCODE_SET).to_string())
    }
}

impl fmt::Debug for MasterKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKeyCredential").finish_non_exhaustive()
    }
}

/// Formats a UTC timestamp as an RFC 1123 date, the form the service expects in `x-ms-date`.
pub(crate) fn format_date(date: &OffsetDateTime) -> String {
    to_rfc7231(date)
}
