// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::{connection::ConnectionDescriptor, constants, error::Result, DocumentStore};

/// Retries transient failures of a store operation at a fixed interval.
///
/// Only errors for which [`DocumentStore::should_retry`] holds are retried. Terminal errors, and
/// the last error once the budget is spent, are returned unchanged.
///
/// ```rust,no_run
/// # async fn example(store: azure_durabletask_cosmos::DocumentStore) -> azure_durabletask_cosmos::Result<()> {
/// use azure_durabletask_cosmos::{PartitionKey, RetryPolicy};
///
/// let policy = RetryPolicy::for_descriptor(store.descriptor());
/// let exists = policy
///     .execute(|| store.exists("instance-1", Some(PartitionKey::from("instance-1")), None))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// A policy that retries up to `max_retries` times at the fixed retry interval.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            interval: constants::RETRY_INTERVAL,
        }
    }

    /// The policy for updates through `descriptor`, honoring its concurrent-update retry budget.
    pub fn for_descriptor(descriptor: &ConnectionDescriptor) -> Self {
        Self::new(
            descriptor
                .concurrent_update_retry_count()
                .unwrap_or(constants::DEFAULT_MAX_RETRY_ATTEMPTS),
        )
    }

    /// Overrides the wait between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `operation` until it succeeds, fails terminally or exhausts the retry budget.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Err(error) if attempt < self.max_retries && DocumentStore::should_retry(&error) => {
                    attempt += 1;
                    warn!(
                        %error,
                        attempt,
                        max_retries = self.max_retries,
                        "transient failure; retrying in {:?}",
                        self.interval
                    );
                    tokio::time::sleep(self.interval).await;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(constants::DEFAULT_MAX_RETRY_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_interval(Duration::from_millis(1))
    }

    #[test]
    fn budget_follows_descriptor() {
        let builder = || {
            ConnectionDescriptor::builder("https://a.documents.azure.com/", "a2V5", "hub", "items")
        };
        let default = RetryPolicy::for_descriptor(&builder().build().unwrap());
        assert_eq!(default.max_retries(), 9);
        assert_eq!(default.interval(), Duration::from_secs(5));

        let configured = RetryPolicy::for_descriptor(
            &builder().concurrent_update_retry_count(2).build().unwrap(),
        );
        assert_eq!(configured.max_retries(), 2);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let attempts = AtomicU32::new(0);
        let result = fast(5)
            .execute(|| async {
                match attempts.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(Error::new(ErrorKind::Throttled { retry_after: None }, "429")),
                    1 => Err(Error::new(ErrorKind::Unavailable, "503")),
                    _ => Ok("done"),
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let error = fast(5)
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::new(ErrorKind::Conflict, "409"))
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::Conflict);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_error() {
        let attempts = AtomicU32::new(0);
        let error = fast(2)
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::new(ErrorKind::Unavailable, "503"))
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::Unavailable);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
