//! Resource abstraction layer
//!
//! A resource kind implements [`Resource`]: Create/Read/Update/Delete over
//! an explicit [`Clients`] bundle. [`Runner`] wraps an implementation and
//! enforces a time budget per operation.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and checks resource definitions from embedded JSON
//!
//! # Example
//!
//! ```ignore
//! use azapps::appservice::LinuxFunctionAppSlot;
//! use azapps::resource::{Runner, Timeouts};
//!
//! async fn refresh(clients: Clients, id: FunctionAppSlotId) -> Result<(), ProviderError> {
//!     let slot = LinuxFunctionAppSlot::new()?;
//!     let runner = Runner::new(slot, clients, Timeouts::default());
//!     let outcome = runner.read(&id, None).await?;
//!     Ok(())
//! }
//! ```

pub mod registry;

pub use registry::{
    get_all_resource_keys, get_registry, get_resource, FieldDef, FieldKind, ResourceDef, SchemaError,
    TimeoutsDef,
};

use crate::clients::Clients;
use crate::error::{ProviderError, ReadOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Lifecycle operation kinds, each with its own time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Create,
    Read,
    Update,
    Delete,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Create => "create",
            Lifecycle::Read => "read",
            Lifecycle::Update => "update",
            Lifecycle::Delete => "delete",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-operation budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Minutes from config or the field table; absurd values saturate
fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

impl From<&TimeoutsDef> for Timeouts {
    fn from(def: &TimeoutsDef) -> Self {
        Self {
            create: minutes(def.create_minutes),
            read: minutes(def.read_minutes),
            update: minutes(def.update_minutes),
            delete: minutes(def.delete_minutes),
        }
    }
}

impl Timeouts {
    pub fn budget(&self, op: Lifecycle) -> Duration {
        match op {
            Lifecycle::Create => self.create,
            Lifecycle::Read => self.read,
            Lifecycle::Update => self.update,
            Lifecycle::Delete => self.delete,
        }
    }

    /// Replace budgets that `overrides` sets
    pub fn with_overrides(mut self, overrides: &TimeoutOverrides) -> Self {
        if let Some(m) = overrides.create_minutes {
            self.create = minutes(m);
        }
        if let Some(m) = overrides.read_minutes {
            self.read = minutes(m);
        }
        if let Some(m) = overrides.update_minutes {
            self.update = minutes(m);
        }
        if let Some(m) = overrides.delete_minutes {
            self.delete = minutes(m);
        }
        self
    }
}

/// Timeout overrides, as stored in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_minutes: Option<u64>,
}

/// Lifecycle of one resource kind
///
/// Implementations are stateless; everything they need arrives through
/// the arguments.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Desired-state record
    type Model: Send + Sync;
    /// Identifier of a managed instance
    type Id: fmt::Display + Send + Sync;
    /// Fields that changed between two records
    type Changes: Send + Sync;

    fn resource_type(&self) -> &'static str;

    /// Identifier a desired record will get, for errors raised before the
    /// remote instance exists
    fn planned_id(&self, desired: &Self::Model) -> String;

    /// Default budgets for this kind
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Check a record without calling the API
    fn validate(&self, desired: &Self::Model) -> Result<(), ProviderError>;

    /// Changes between the recorded and desired records
    fn diff(&self, prior: &Self::Model, desired: &Self::Model) -> Self::Changes;

    async fn create(&self, clients: &Clients, desired: &Self::Model) -> Result<Self::Id, ProviderError>;

    async fn read(
        &self,
        clients: &Clients,
        id: &Self::Id,
        prior: Option<&Self::Model>,
    ) -> Result<ReadOutcome<Self::Model>, ProviderError>;

    async fn update(
        &self,
        clients: &Clients,
        id: &Self::Id,
        desired: &Self::Model,
        changes: &Self::Changes,
    ) -> Result<(), ProviderError>;

    async fn delete(&self, clients: &Clients, id: &Self::Id) -> Result<(), ProviderError>;
}

/// Runs lifecycle operations under their time budgets
pub struct Runner<R: Resource> {
    resource: R,
    clients: Clients,
    timeouts: Timeouts,
}

impl<R: Resource> Runner<R> {
    pub fn new(resource: R, clients: Clients, timeouts: Timeouts) -> Self {
        Self {
            resource,
            clients,
            timeouts,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn within<T>(
        &self,
        op: Lifecycle,
        id: String,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let budget = self.timeouts.budget(op);
        tracing::debug!("{} {} (budget {:?})", op, id, budget);
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("{} {} timed out after {:?}", op, id, budget);
                Err(ProviderError::Timeout {
                    resource: self.resource.resource_type(),
                    operation: op.as_str(),
                    id,
                    budget,
                })
            }
        }
    }

    pub async fn create(&self, desired: &R::Model) -> Result<R::Id, ProviderError> {
        let id = self.resource.planned_id(desired);
        self.within(Lifecycle::Create, id, self.resource.create(&self.clients, desired))
            .await
    }

    pub async fn read(
        &self,
        id: &R::Id,
        prior: Option<&R::Model>,
    ) -> Result<ReadOutcome<R::Model>, ProviderError> {
        self.within(Lifecycle::Read, id.to_string(), self.resource.read(&self.clients, id, prior))
            .await
    }

    /// Compute the change set from `prior` and apply `desired`
    pub async fn update(&self, id: &R::Id, prior: &R::Model, desired: &R::Model) -> Result<(), ProviderError> {
        let changes = self.resource.diff(prior, desired);
        self.within(
            Lifecycle::Update,
            id.to_string(),
            self.resource.update(&self.clients, id, desired, &changes),
        )
        .await
    }

    pub async fn delete(&self, id: &R::Id) -> Result<(), ProviderError> {
        self.within(Lifecycle::Delete, id.to_string(), self.resource.delete(&self.clients, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{ArmRequest, ArmResponse, Transport, TransportError};
    use std::sync::Arc;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn send(&self, _request: ArmRequest) -> Result<ArmResponse, TransportError> {
            Ok(ArmResponse::default())
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Resource for Sleepy {
        type Model = ();
        type Id = String;
        type Changes = ();

        fn resource_type(&self) -> &'static str {
            "test_sleepy"
        }

        fn planned_id(&self, _desired: &()) -> String {
            "sleepy/new".to_string()
        }

        fn validate(&self, _desired: &()) -> Result<(), ProviderError> {
            Ok(())
        }

        fn diff(&self, _prior: &(), _desired: &()) {}

        async fn create(&self, _clients: &Clients, _desired: &()) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }

        async fn read(
            &self,
            _clients: &Clients,
            _id: &String,
            _prior: Option<&()>,
        ) -> Result<ReadOutcome<()>, ProviderError> {
            Ok(ReadOutcome::Gone)
        }

        async fn update(
            &self,
            _clients: &Clients,
            _id: &String,
            _desired: &(),
            _changes: &(),
        ) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn delete(&self, _clients: &Clients, _id: &String) -> Result<(), ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn runner(timeouts: Timeouts) -> Runner<Sleepy> {
        let clients = Clients::new(Arc::new(NoTransport), "00000000-0000-0000-0000-000000000000");
        Runner::new(Sleepy, clients, timeouts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_exceeding_budget_times_out() {
        let timeouts = Timeouts {
            create: Duration::from_secs(60),
            ..Timeouts::default()
        };
        let err = runner(timeouts).create(&()).await.unwrap_err();
        match err {
            ProviderError::Timeout {
                resource,
                operation,
                id,
                budget,
            } => {
                assert_eq!(resource, "test_sleepy");
                assert_eq!(operation, "create");
                assert_eq!(id, "sleepy/new");
                assert_eq!(budget, Duration::from_secs(60));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_timeout_names_the_instance() {
        let err = runner(Timeouts::default())
            .delete(&"sleepy/one".to_string())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sleepy/one"), "{}", message);
        assert!(message.contains("delete"), "{}", message);
    }

    #[tokio::test]
    async fn test_read_within_budget() {
        let outcome = runner(Timeouts::default()).read(&"id".to_string(), None).await.unwrap();
        assert!(outcome.is_gone());
    }

    #[test]
    fn test_default_budgets() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.budget(Lifecycle::Create), Duration::from_secs(1800));
        assert_eq!(timeouts.budget(Lifecycle::Read), Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let overrides = TimeoutOverrides {
            read_minutes: Some(1),
            ..Default::default()
        };
        let timeouts = Timeouts::default().with_overrides(&overrides);
        assert_eq!(timeouts.read, Duration::from_secs(60));
        assert_eq!(timeouts.delete, Duration::from_secs(1800));
    }

    #[test]
    fn test_huge_overrides_saturate() {
        let overrides = TimeoutOverrides {
            create_minutes: Some(u64::MAX),
            ..Default::default()
        };
        let timeouts = Timeouts::default().with_overrides(&overrides);
        assert_eq!(timeouts.create, Duration::from_secs(u64::MAX));

        let def = TimeoutsDef {
            create_minutes: u64::MAX,
            read_minutes: 5,
            update_minutes: 30,
            delete_minutes: 30,
        };
        assert_eq!(Timeouts::from(&def).create, Duration::from_secs(u64::MAX));
    }
}
