// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::fmt;

use stop_token::StopToken;

/// Options accepted by every [`DocumentStore`](crate::DocumentStore) operation.
#[derive(Clone, Default)]
pub struct OperationOptions {
    stop_token: Option<StopToken>,
}

impl OperationOptions {
    /// Creates a new [`OperationOptionsBuilder`] that can be used to construct an [`OperationOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use azure_durabletask_cosmos::{OperationOptions, StopSource};
    ///
    /// let source = StopSource::new();
    /// let options = OperationOptions::builder()
    ///     .with_stop_token(source.token())
    ///     .build();
    /// assert!(options.stop_token().is_some());
    /// ```
    pub fn builder() -> OperationOptionsBuilder {
        OperationOptionsBuilder::default()
    }

    /// The token that aborts the operation when its source is dropped.
    pub fn stop_token(&self) -> Option<&StopToken> {
        self.stop_token.as_ref()
    }
}

impl fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOptions")
            .field("cancelable", &self.stop_token.is_some())
            .finish()
    }
}

/// Builder used to construct an [`OperationOptions`].
///
/// Obtain an [`OperationOptionsBuilder`] by calling [`OperationOptions::builder()`]
#[derive(Default)]
pub struct OperationOptionsBuilder(OperationOptions);

impl OperationOptionsBuilder {
    /// Aborts the operation with [`ErrorKind::Canceled`](crate::ErrorKind::Canceled) once the
    /// token's [`StopSource`](stop_token::StopSource) is dropped.
    ///
    /// Cancellation only abandons the in-flight request. The shared client stays usable.
    pub fn with_stop_token(mut self, stop_token: StopToken) -> Self {
        self.0.stop_token = Some(stop_token);
        self
    }

    /// Builds an [`OperationOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> OperationOptions {
        self.0.clone()
    }
}
