//! # Transaction Logger
//!
//! Records every registry mutation made while a transaction executes. The
//! logger subscribes itself to the context's registry manager when created.

use crate::domain::entities::Resource;
use crate::domain::network::Serializer;
use crate::services::registry::{RegistryAction, RegistryEvent, RegistryManager, RegistryObserver};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};
use uuid::Uuid;

/// One recorded mutation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// `add`, `update` or `remove`.
    pub action: &'static str,
    /// Registry the mutation applied to.
    pub registry_id: String,
    /// Identifier of the mutated resource.
    pub resource_id: String,
    /// Serialized resource (state after add/update, state before remove).
    pub payload: Value,
}

/// Audit log for one transaction.
pub struct TransactionLogger {
    transaction: Resource,
    serializer: Arc<Serializer>,
    entries: Mutex<Vec<LogEntry>>,
}

impl TransactionLogger {
    /// Creates a logger for `transaction` and subscribes it to
    /// `registry_manager`.
    #[must_use]
    pub fn new(
        transaction: Resource,
        registry_manager: &RegistryManager,
        serializer: Arc<Serializer>,
    ) -> Arc<Self> {
        let logger = Arc::new(Self {
            transaction,
            serializer,
            entries: Mutex::new(Vec::new()),
        });
        registry_manager.subscribe(logger.clone());
        logger
    }

    /// Transaction being logged.
    #[must_use]
    pub fn transaction(&self) -> &Resource {
        &self.transaction
    }

    /// Entries recorded so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }
}

impl RegistryObserver for TransactionLogger {
    fn on_mutation(&self, event: &RegistryEvent) {
        let payload = match self.serializer.to_json(&event.resource) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    resource = %event.resource.fully_qualified_identifier(),
                    error = %e,
                    "Mutation not serializable, logging without payload"
                );
                Value::Null
            }
        };
        let action = match event.action {
            RegistryAction::Add => "add",
            RegistryAction::Update => "update",
            RegistryAction::Remove => "remove",
        };
        trace!(
            transaction = %self.transaction.identifier,
            registry = %event.registry_id,
            action,
            "Logged registry mutation"
        );
        self.entries.lock().push(LogEntry {
            id: Uuid::new_v4(),
            action,
            registry_id: event.registry_id.clone(),
            resource_id: event.resource.identifier.clone(),
            payload,
        });
    }
}

impl std::fmt::Debug for TransactionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLogger")
            .field("transaction", &self.transaction.fully_qualified_identifier())
            .field("entries", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}
