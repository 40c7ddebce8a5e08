// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// The ordered parameters of a stored procedure invocation.
///
/// ```rust
/// use azure_durabletask_cosmos::ProcedureParams;
///
/// let params = ProcedureParams::new()
///     .with_parameter("instance-1")?
///     .with_parameter(3)?;
/// assert_eq!(params.len(), 2);
/// # Ok::<(), azure_durabletask_cosmos::Error>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcedureParams(Vec<Value>);

impl ProcedureParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, serialized to JSON.
    pub fn with_parameter<T: Serialize>(mut self, value: T) -> Result<Self> {
        self.push(value)?;
        Ok(self)
    }

    /// Appends a parameter. Fails with `DataConversion` if `value` cannot be serialized.
    pub fn push<T: Serialize>(&mut self, value: T) -> Result<()> {
        self.0.push(serde_json::to_value(value)?);
        Ok(())
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The serialized parameters, in call order.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// The request body: a JSON array of the parameters in order.
    pub fn into_value(self) -> Value {
        Value::Array(self.0)
    }
}

impl From<Vec<Value>> for ProcedureParams {
    fn from(params: Vec<Value>) -> Self {
        Self(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Lease {
        owner: &'static str,
        ttl: u32,
    }

    #[test]
    fn preserves_order_and_shape() {
        let params = ProcedureParams::new()
            .with_parameter("instance-1")
            .unwrap()
            .with_parameter(Lease {
                owner: "worker-a",
                ttl: 30,
            })
            .unwrap()
            .with_parameter(Option::<u32>::None)
            .unwrap();

        assert_eq!(
            params.into_value(),
            json!(["instance-1", { "owner": "worker-a", "ttl": 30 }, null])
        );
    }

    #[test]
    fn empty_params_are_an_empty_array() {
        let params = ProcedureParams::new();
        assert!(params.is_empty());
        assert_eq!(params.into_value(), json!([]));
    }
}
