// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::models::ETag;

/// The result of a point operation on a single document.
#[derive(Clone, Debug)]
pub struct ItemResponse<T> {
    item: T,
    etag: Option<ETag>,
    request_charge: f64,
    activity_id: Option<String>,
}

impl<T> ItemResponse<T> {
    pub(crate) fn new(
        item: T,
        etag: Option<ETag>,
        request_charge: f64,
        activity_id: Option<String>,
    ) -> Self {
        Self {
            item,
            etag,
            request_charge,
            activity_id,
        }
    }

    /// The document, as returned by the service (system properties included).
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Consumes the response and returns the document.
    pub fn into_item(self) -> T {
        self.item
    }

    /// The version token of the document after this operation.
    pub fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }

    /// Request units consumed by the operation.
    pub fn request_charge(&self) -> f64 {
        self.request_charge
    }

    /// The service-assigned id of the request, for correlating with service diagnostics.
    pub fn activity_id(&self) -> Option<&str> {
        self.activity_id.as_deref()
    }
}
