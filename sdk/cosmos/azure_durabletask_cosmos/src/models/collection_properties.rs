// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

use crate::models::SystemProperties;

/// Properties of a collection (container).
#[derive(Clone, Default, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProperties {
    pub id: String,

    /// Empty for a single-partition collection created without a partition key.
    #[serde(default)]
    pub partition_key: PartitionKeyDefinition,

    #[serde(flatten)]
    pub system_properties: SystemProperties,
}

impl CollectionProperties {
    /// Describes a collection to create.
    pub fn new(id: impl Into<String>, partition_key: PartitionKeyDefinition) -> Self {
        Self {
            id: id.into(),
            partition_key,
            system_properties: SystemProperties::default(),
        }
    }
}

/// Describes how documents in a collection are partitioned.
///
/// Only single-path definitions are supported. A definition without paths describes a
/// single-partition collection.
#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyDefinition {
    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub kind: PartitionKeyKind,
}

impl PartitionKeyDefinition {
    /// Creates a hash partition key definition over a single path such as `/tenantId`.
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            kind: PartitionKeyKind::Hash,
        }
    }

    /// The first (and only supported) partition key path, `None` for a single-partition collection.
    pub fn path(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }
}

/// How the service distributes partition key values over physical partitions.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum PartitionKeyKind {
    #[default]
    Hash,
    Range,
}
