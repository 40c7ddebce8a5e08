// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Binds an orchestration engine to a [`DocumentStore`].

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    connection::{ConnectionDescriptor, ConnectionRegistry},
    error::Error,
    DocumentStore, RetryPolicy,
};

/// Concurrency of the dispatcher that runs orchestration work items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationDispatcherSettings {
    pub dispatcher_count: u32,
    pub max_concurrent_orchestrations: u32,
}

impl Default for OrchestrationDispatcherSettings {
    fn default() -> Self {
        Self {
            dispatcher_count: 1,
            max_concurrent_orchestrations: 100,
        }
    }
}

/// Concurrency of the dispatcher that runs activity work items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityDispatcherSettings {
    pub dispatcher_count: u32,
    pub max_concurrent_activities: u32,
}

impl Default for ActivityDispatcherSettings {
    fn default() -> Self {
        Self {
            dispatcher_count: 1,
            max_concurrent_activities: 10,
        }
    }
}

/// Settings of a [`CosmosOrchestrationService`]. Missing fields take their defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationServiceSettings {
    pub task_orchestration_dispatcher: OrchestrationDispatcherSettings,
    pub task_activity_dispatcher: ActivityDispatcherSettings,
}

/// What the engine does with events that arrive for an execution that continued as new.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContinueAsNewBehavior {
    #[default]
    Ignore,
}

/// The orchestration service's view of the persistence layer.
///
/// Exposes the dispatcher configuration the engine polls with, the [`DocumentStore`] bound to the
/// instance collection and the back-off to apply after a failed fetch or process step.
#[derive(Clone, Debug)]
pub struct CosmosOrchestrationService {
    settings: OrchestrationServiceSettings,
    store: DocumentStore,
    retry_policy: RetryPolicy,
}

impl CosmosOrchestrationService {
    /// Binds the service to the instance collection named by `descriptor`.
    pub fn new(
        descriptor: ConnectionDescriptor,
        settings: OrchestrationServiceSettings,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        let retry_policy = RetryPolicy::for_descriptor(&descriptor);
        Self {
            settings,
            store: DocumentStore::new(descriptor, registry),
            retry_policy,
        }
    }

    pub fn settings(&self) -> &OrchestrationServiceSettings {
        &self.settings
    }

    /// The store bound to the instance collection.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// The retry policy derived from the descriptor's update retry budget.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Number of dispatchers polling for orchestration work items.
    pub fn task_orchestration_dispatcher_count(&self) -> u32 {
        self.settings.task_orchestration_dispatcher.dispatcher_count
    }

    /// Upper bound on orchestration work items processed at once.
    pub fn max_concurrent_task_orchestration_work_items(&self) -> u32 {
        self.settings
            .task_orchestration_dispatcher
            .max_concurrent_orchestrations
    }

    /// Number of dispatchers polling for activity work items.
    pub fn task_activity_dispatcher_count(&self) -> u32 {
        self.settings.task_activity_dispatcher.dispatcher_count
    }

    /// Upper bound on activity work items processed at once.
    pub fn max_concurrent_task_activity_work_items(&self) -> u32 {
        self.settings.task_activity_dispatcher.max_concurrent_activities
    }

    pub fn continue_as_new_behavior(&self) -> ContinueAsNewBehavior {
        ContinueAsNewBehavior::Ignore
    }

    /// How long a dispatcher waits before fetching again after `error`.
    pub fn delay_after_fetch_error(&self, error: &Error) -> Duration {
        self.delay_after(error)
    }

    /// How long a dispatcher waits before processing again after `error`.
    pub fn delay_after_process_error(&self, error: &Error) -> Duration {
        self.delay_after(error)
    }

    fn delay_after(&self, error: &Error) -> Duration {
        if DocumentStore::should_retry(error) {
            self.retry_policy.interval()
        } else {
            Duration::ZERO
        }
    }
}
