// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde_json::Value;
use std::fmt;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The value of a document's partition key.
///
/// Cosmos DB routes and co-locates documents by this value. It is sent to the service as a
/// single-element JSON array, for example `["tenant-1"]`.
///
/// ```rust
/// use azure_durabletask_cosmos::PartitionKey;
///
/// let key = PartitionKey::from("tenant-1");
/// assert_eq!(key.to_header_value(), r#"["tenant-1"]"#);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum PartitionKey {
    String(String),
    /// An integral value, kept exact beyond the range a double represents.
    Integer(i64),
    Number(f64),
    Bool(bool),
    Null,
    /// The document has no value at the partition key path.
    Undefined,
}

impl PartitionKey {
    /// Extracts the partition key value found at `path` (for example `/tenant/id`) in a document.
    ///
    /// Missing values and non-scalar values resolve to [`PartitionKey::Undefined`].
    pub fn from_document(document: &Value, path: &str) -> Self {
        let mut current = document;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match current.get(segment) {
                Some(next) => current = next,
                None => return PartitionKey::Undefined,
            }
        }

        match current {
            Value::String(s) => PartitionKey::String(s.clone()),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => PartitionKey::Integer(i),
                (None, Some(f)) => PartitionKey::Number(f),
                (None, None) => PartitionKey::Undefined,
            },
            Value::Bool(b) => PartitionKey::Bool(*b),
            Value::Null => PartitionKey::Null,
            Value::Array(_) | Value::Object(_) => PartitionKey::Undefined,
        }
    }

    /// The JSON value of the key, as it appears inside the header array.
    pub fn to_json(&self) -> Value {
        match self {
            PartitionKey::String(s) => Value::String(s.clone()),
            PartitionKey::Integer(i) => Value::from(*i),
            // Integral values are written without a fraction so `[7]` and `[7.0]` never diverge.
            PartitionKey::Number(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                Value::from(*n as i64)
            }
            PartitionKey::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PartitionKey::Bool(b) => Value::Bool(*b),
            PartitionKey::Null => Value::Null,
            PartitionKey::Undefined => Value::Object(Default::default()),
        }
    }

    /// The value of the `x-ms-documentdb-partitionkey` header.
    pub fn to_header_value(&self) -> String {
        Value::Array(vec![self.to_json()]).to_string()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        PartitionKey::String(value.to_string())
    }
}

impl From<&String> for PartitionKey {
    fn from(value: &String) -> Self {
        PartitionKey::String(value.clone())
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        PartitionKey::String(value)
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        PartitionKey::Integer(value)
    }
}

impl From<i32> for PartitionKey {
    fn from(value: i32) -> Self {
        PartitionKey::Integer(value.into())
    }
}

impl From<f64> for PartitionKey {
    fn from(value: f64) -> Self {
        PartitionKey::Number(value)
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        PartitionKey::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_values() {
        assert_eq!(PartitionKey::from("a").to_header_value(), r#"["a"]"#);
        assert_eq!(PartitionKey::from(true).to_header_value(), "[true]");
        assert_eq!(PartitionKey::from(4.5).to_header_value(), "[4.5]");
        assert_eq!(PartitionKey::from(7_i64).to_header_value(), "[7]");
        assert_eq!(PartitionKey::Null.to_header_value(), "[null]");
        assert_eq!(PartitionKey::Undefined.to_header_value(), "[{}]");
    }

    #[test]
    fn extracts_top_level_value() {
        let doc = json!({ "id": "1", "tenant": "contoso" });
        assert_eq!(
            PartitionKey::from_document(&doc, "/tenant"),
            PartitionKey::from("contoso")
        );
    }

    #[test]
    fn extracts_nested_value() {
        let doc = json!({ "id": "1", "owner": { "region": 7 } });
        assert_eq!(
            PartitionKey::from_document(&doc, "/owner/region"),
            PartitionKey::Integer(7)
        );
    }

    #[test]
    fn large_integers_stay_exact() {
        let key = PartitionKey::from(9_007_199_254_740_993_i64);
        assert_eq!(key.to_header_value(), "[9007199254740993]");

        let doc = json!({ "id": "1", "sequence": 9_007_199_254_740_993_i64 });
        assert_eq!(PartitionKey::from_document(&doc, "/sequence"), key);
        assert_eq!(
            PartitionKey::from_document(&json!({ "n": 2.5 }), "/n"),
            PartitionKey::Number(2.5)
        );
    }

    #[test]
    fn missing_or_composite_values_are_undefined() {
        let doc = json!({ "id": "1", "tags": ["a"] });
        assert_eq!(
            PartitionKey::from_document(&doc, "/tenant"),
            PartitionKey::Undefined
        );
        assert_eq!(
            PartitionKey::from_document(&doc, "/tags"),
            PartitionKey::Undefined
        );
    }
}
