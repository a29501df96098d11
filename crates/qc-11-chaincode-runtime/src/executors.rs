//! # Transaction Executors
//!
//! The per-context executor registry and the built-in script executor.
//!
//! The registry is ordered and keyed by executor kind: adding an executor of
//! a kind already present replaces it at the same position.

use crate::context::Context;
use crate::domain::entities::Resource;
use crate::errors::ContextError;
use crate::ports::inbound::{ExecutionOutcome, TransactionExecutor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Kind of the built-in executor for script processor functions.
pub const SCRIPT_EXECUTOR_KIND: &str = "JS";

// =============================================================================
// REGISTRY
// =============================================================================

/// Ordered executors, at most one per kind.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: Vec<Arc<dyn TransactionExecutor>>,
    index: HashMap<String, usize>,
}

impl ExecutorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `executor`, replacing any executor of the same kind in place.
    /// Returns the replaced executor.
    pub fn add(
        &mut self,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Option<Arc<dyn TransactionExecutor>> {
        let kind = executor.kind().to_string();
        if let Some(&position) = self.index.get(&kind) {
            debug!(%kind, position, "Replacing transaction executor");
            return Some(std::mem::replace(&mut self.executors[position], executor));
        }
        debug!(%kind, position = self.executors.len(), "Adding transaction executor");
        self.index.insert(kind, self.executors.len());
        self.executors.push(executor);
        None
    }

    /// Executors in dispatch order.
    #[must_use]
    pub fn list(&self) -> &[Arc<dyn TransactionExecutor>] {
        &self.executors
    }

    /// Executor registered for `kind`.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn TransactionExecutor>> {
        self.index.get(kind).map(|&position| &self.executors[position])
    }

    /// Number of executors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// True if no executors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.executors.iter().map(|executor| executor.kind()))
            .finish()
    }
}

// =============================================================================
// SCRIPT EXECUTOR
// =============================================================================

/// Default executor. Claims transactions for which the business network
/// declares a processor function, and reports the functions in script order.
///
/// Evaluating the function bodies belongs to the script engine the host
/// embeds; this executor only selects them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptTransactionExecutor;

#[async_trait]
impl TransactionExecutor for ScriptTransactionExecutor {
    fn kind(&self) -> &str {
        SCRIPT_EXECUTOR_KIND
    }

    async fn execute(
        &self,
        context: &Context,
        transaction: &Resource,
    ) -> Result<ExecutionOutcome, ContextError> {
        let transaction_type = transaction.fully_qualified_type();
        let invoked: Vec<String> = context
            .script_manager()?
            .processors_for(SCRIPT_EXECUTOR_KIND, &transaction_type)
            .into_iter()
            .map(|function| function.name.clone())
            .collect();
        if invoked.is_empty() {
            return Ok(ExecutionOutcome::Declined);
        }

        let api = context.api()?;
        debug!(
            transaction = %transaction.fully_qualified_identifier(),
            participant = ?api.current_participant().map(|p| p.fully_qualified_identifier()),
            functions = ?invoked,
            "Dispatching to processor functions"
        );
        Ok(ExecutionOutcome::Claimed {
            executor: SCRIPT_EXECUTOR_KIND.to_string(),
            invoked,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
