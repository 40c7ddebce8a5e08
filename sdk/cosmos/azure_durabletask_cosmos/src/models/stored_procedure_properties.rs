// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

use crate::models::SystemProperties;

/// A stored procedure registered on a collection.
///
/// The body is opaque source text; it is never inspected by this crate.
#[derive(Clone, Default, Debug, PartialEq, Deserialize, Serialize)]
pub struct StoredProcedureProperties {
    pub id: String,

    pub body: String,

    #[serde(flatten)]
    pub system_properties: SystemProperties,
}

impl StoredProcedureProperties {
    /// Describes a procedure with the given id and JavaScript body.
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            system_properties: SystemProperties::default(),
        }
    }
}
