//! # Driving Ports (API - Inbound)
//!
//! Pluggable transaction executors. The host registers them on a context
//! and offers each transaction to them in order until one claims it.

use crate::context::Context;
use crate::domain::entities::Resource;
use crate::errors::ContextError;
use async_trait::async_trait;

/// Result of offering a transaction to an executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The executor handled the transaction.
    Claimed {
        /// Kind of the claiming executor.
        executor: String,
        /// Handler functions the executor dispatched to, in order.
        invoked: Vec<String>,
    },
    /// The executor has no handler for this transaction.
    Declined,
}

impl ExecutionOutcome {
    /// True for [`ExecutionOutcome::Claimed`].
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed { .. })
    }
}

/// A handler for transactions of one execution type.
///
/// ## Usage
///
/// ```ignore
/// context.add_transaction_executor(Arc::new(MyExecutor));
/// let outcome = context.execute_transaction(tx).await?;
/// ```
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Type discriminator. A context holds at most one executor per kind.
    fn kind(&self) -> &str;

    /// Executes `transaction` against `context`, or declines it.
    async fn execute(
        &self,
        context: &Context,
        transaction: &Resource,
    ) -> Result<ExecutionOutcome, ContextError>;
}
