// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod framework;

use std::{error::Error, time::Duration};

use azure_durabletask_cosmos::{ErrorKind, RetryPolicy};
use framework::TestAccount;
use serde_json::json;

#[tokio::test]
async fn retries_throttled_writes_until_they_succeed() -> Result<(), Box<dyn Error>> {
    let account = TestAccount::new();
    let store = account
        .provisioned_store("RetryThrottled", "instances", "/instanceId")
        .await?;
    let policy = RetryPolicy::for_descriptor(store.descriptor()).with_interval(Duration::from_millis(1));

    account.transport.fail_next(429, 2);
    account.transport.fail_next(503, 1);
    let before = account.transport.request_count();

    let document = json!({ "id": "i-1", "instanceId": "i-1" });
    let created = policy.execute(|| store.upsert(&document, None)).await?;
    assert!(created.etag().is_some());
    assert_eq!(account.transport.request_count() - before, 4);
    Ok(())
}

#[tokio::test]
async fn terminal_errors_surface_immediately() -> Result<(), Box<dyn Error>> {
    let account = TestAccount::new();
    let store = account
        .provisioned_store("RetryTerminal", "instances", "/instanceId")
        .await?;
    let policy = RetryPolicy::new(5).with_interval(Duration::from_millis(1));

    let document = json!({ "id": "i-1", "instanceId": "i-1" });
    store.create(&document, None).await?;
    let before = account.transport.request_count();

    let error = policy
        .execute(|| store.create(&document, None))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::Conflict);
    assert_eq!(account.transport.request_count() - before, 1);
    Ok(())
}

#[tokio::test]
async fn exhausted_budget_returns_last_transient_error() -> Result<(), Box<dyn Error>> {
    let account = TestAccount::new();
    let store = account
        .provisioned_store("RetryExhausted", "instances", "/instanceId")
        .await?;
    let policy = RetryPolicy::new(2).with_interval(Duration::from_millis(1));

    account.transport.fail_next(503, 10);
    let before = account.transport.request_count();
    let error = policy
        .execute(|| store.exists("i-1", Some("i-1".into()), None))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::Unavailable);
    assert_eq!(account.transport.request_count() - before, 3);
    Ok(())
}
