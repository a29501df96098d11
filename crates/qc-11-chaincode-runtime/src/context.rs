//! # Transaction Context
//!
//! One [`Context`] is created for every inbound transaction. It loads the
//! deployed business network (through the shared [`DefinitionCache`]),
//! resolves the caller's participant, and hands out the services the
//! transaction needs. Services are built on first access and reused for the
//! rest of the transaction.
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> DefinitionLoaded -> IdentityResolved -> Ready
//!    \______________\___________________\_________-> Failed
//! ```
//!
//! A context that fails or times out during [`Context::initialize`] stays in
//! `Failed`; every definition-derived accessor then returns
//! `ContextError::Configuration`.

use crate::cache::DefinitionCache;
use crate::config::ContextConfig;
use crate::domain::binding::Binding;
use crate::domain::entities::{Resource, SystemRecord};
use crate::domain::network::{
    AclManager, BusinessNetworkDefinition, Factory, Introspector, ModelManager, ScriptManager,
    Serializer,
};
use crate::errors::ContextError;
use crate::executors::{ExecutorRegistry, ScriptTransactionExecutor};
use crate::ports::inbound::{ExecutionOutcome, TransactionExecutor};
use crate::ports::outbound::{ChaincodeHost, DataService, IdentityService};
use crate::services::{
    AccessController, Api, IdentityManager, QueryExecutor, RegistryManager, Resolver,
    TransactionLogger,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeMap, Serializer as SerdeSerializer};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

const NOT_INITIALIZED: &str = "must call initialize before calling this function";

/// Bootstrap progress of a [`Context`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// Constructed, bootstrap not started.
    Created,
    /// Business network definition bound.
    DefinitionLoaded,
    /// Participant bound, or confirmed absent.
    IdentityResolved,
    /// Default executor installed; the context is usable.
    Ready,
    /// Bootstrap failed or was cancelled.
    Failed,
}

/// Marks the context `Failed` unless disarmed. Covers early returns and
/// cancellation of the bootstrap future.
struct FailureGuard<'a> {
    state: &'a Mutex<ContextState>,
    armed: bool,
}

impl<'a> FailureGuard<'a> {
    fn new(state: &'a Mutex<ContextState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self, state: ContextState) {
        *self.state.lock() = state;
        self.armed = false;
    }
}

impl Drop for FailureGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.lock() = ContextState::Failed;
        }
    }
}

/// Per-transaction execution context.
pub struct Context {
    host: Arc<dyn ChaincodeHost>,
    cache: Arc<DefinitionCache>,
    config: ContextConfig,
    state: Mutex<ContextState>,

    definition: OnceCell<Arc<BusinessNetworkDefinition>>,

    access_controller: OnceCell<Arc<AccessController>>,
    registry_manager: OnceCell<Arc<RegistryManager>>,
    resolver: OnceCell<Arc<Resolver>>,
    api: OnceCell<Arc<Api>>,
    query_executor: OnceCell<Arc<QueryExecutor>>,
    identity_manager: OnceCell<Arc<IdentityManager>>,

    participant: Binding<Resource>,
    transaction: Binding<Resource>,
    transaction_logger: OnceCell<Arc<TransactionLogger>>,

    executors: ExecutorRegistry,
}

impl Context {
    /// Creates a context with default configuration.
    #[must_use]
    pub fn new(host: Arc<dyn ChaincodeHost>, cache: Arc<DefinitionCache>) -> Self {
        Self::with_config(host, cache, ContextConfig::default())
    }

    /// Creates a context.
    #[must_use]
    pub fn with_config(
        host: Arc<dyn ChaincodeHost>,
        cache: Arc<DefinitionCache>,
        config: ContextConfig,
    ) -> Self {
        Self {
            host,
            cache,
            config,
            state: Mutex::new(ContextState::Created),
            definition: OnceCell::new(),
            access_controller: OnceCell::new(),
            registry_manager: OnceCell::new(),
            resolver: OnceCell::new(),
            api: OnceCell::new(),
            query_executor: OnceCell::new(),
            identity_manager: OnceCell::new(),
            participant: Binding::new("participant"),
            transaction: Binding::new("transaction"),
            transaction_logger: OnceCell::new(),
            executors: ExecutorRegistry::new(),
        }
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Loads the business network, resolves the current participant, and
    /// installs the default script executor.
    ///
    /// # Errors
    ///
    /// * `ContextError::InvariantViolation` - bootstrap was already attempted
    /// * `ContextError::Data` / `ContextError::Archive` - the network could not be loaded
    /// * `ContextError::IdentityResolution` - the identity maps to no participant
    /// * `ContextError::BootstrapTimeout` - the configured timeout elapsed
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) -> Result<(), ContextError> {
        {
            let state = self.state.lock();
            if *state != ContextState::Created {
                return Err(ContextError::InvariantViolation(format!(
                    "context cannot be initialized from state {:?}",
                    *state
                )));
            }
        }

        let guard = FailureGuard::new(&self.state);
        let timeout = self.config.bootstrap_timeout();
        match tokio::time::timeout(timeout, self.load_and_resolve()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.bootstrap_timeout_ms,
                    "Context bootstrap timed out"
                );
                return Err(ContextError::BootstrapTimeout {
                    timeout_ms: self.config.bootstrap_timeout_ms,
                });
            }
        }

        self.executors.add(Arc::new(ScriptTransactionExecutor));
        guard.disarm(ContextState::Ready);
        debug!("Context ready");
        Ok(())
    }

    async fn load_and_resolve(&self) -> Result<(), ContextError> {
        self.load_business_network().await?;
        self.resolve_identity().await
    }

    async fn load_business_network(&self) -> Result<(), ContextError> {
        let sysdata = self
            .host
            .data_service()
            .get_collection(&self.config.sysdata_collection)
            .await?;
        let record =
            SystemRecord::from_value(sysdata.get(&self.config.network_record_key).await?)?;

        let definition = if let Some(cached) = self.cache.get(&record.hash) {
            debug!(hash = %record.hash, "Business network definition cache hit");
            cached
        } else {
            debug!(hash = %record.hash, "Business network definition cache miss, parsing archive");
            let archive = record.decode_archive()?;
            let parsed = Arc::new(self.host.archive_loader().from_archive(&archive).await?);
            self.cache.put(record.hash.clone(), Arc::clone(&parsed));
            parsed
        };

        let identifier = definition.identifier().to_string();
        self.definition.set(definition).map_err(|_| {
            ContextError::InvariantViolation("business network already loaded".to_string())
        })?;
        *self.state.lock() = ContextState::DefinitionLoaded;
        info!(network = %identifier, hash = %record.hash, "Loaded business network");
        Ok(())
    }

    async fn resolve_identity(&self) -> Result<(), ContextError> {
        let current = self
            .host
            .identity_service()
            .current_user_id()
            .filter(|id| !id.as_str().is_empty());
        let Some(user_id) = current else {
            if !self.config.allow_anonymous {
                warn!("No current identity and anonymous access is disabled");
                return Err(ContextError::IdentityRequired);
            }
            debug!("No current identity, continuing without a participant");
            *self.state.lock() = ContextState::IdentityResolved;
            return Ok(());
        };

        let identity_manager = self.identity_manager()?;
        let participant = match identity_manager.get_participant(&user_id).await {
            Ok(participant) => participant,
            Err(e) => {
                error!(%user_id, error = %e, "Could not resolve participant for identity");
                return Err(ContextError::IdentityResolution {
                    user_id: user_id.to_string(),
                });
            }
        };
        self.bind_participant(participant)?;
        *self.state.lock() = ContextState::IdentityResolved;
        Ok(())
    }

    /// Current bootstrap state.
    #[must_use]
    pub fn state(&self) -> ContextState {
        *self.state.lock()
    }

    /// Configuration the context was created with.
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    // =========================================================================
    // DEFINITION ACCESSORS
    // =========================================================================

    fn definition(&self) -> Result<&Arc<BusinessNetworkDefinition>, ContextError> {
        if self.state() == ContextState::Failed {
            return Err(ContextError::Configuration(
                "context bootstrap failed; create a new context".to_string(),
            ));
        }
        self.definition
            .get()
            .ok_or_else(|| ContextError::Configuration(NOT_INITIALIZED.to_string()))
    }

    /// The loaded business network.
    pub fn business_network_definition(
        &self,
    ) -> Result<Arc<BusinessNetworkDefinition>, ContextError> {
        self.definition().map(Arc::clone)
    }

    /// Model manager of the loaded network.
    pub fn model_manager(&self) -> Result<Arc<ModelManager>, ContextError> {
        Ok(Arc::clone(self.definition()?.model_manager()))
    }

    /// Script manager of the loaded network.
    pub fn script_manager(&self) -> Result<Arc<ScriptManager>, ContextError> {
        Ok(Arc::clone(self.definition()?.script_manager()))
    }

    /// ACL manager of the loaded network.
    pub fn acl_manager(&self) -> Result<Arc<AclManager>, ContextError> {
        Ok(Arc::clone(self.definition()?.acl_manager()))
    }

    /// Resource factory of the loaded network.
    pub fn factory(&self) -> Result<Arc<Factory>, ContextError> {
        Ok(Arc::clone(self.definition()?.factory()))
    }

    /// Serializer of the loaded network.
    pub fn serializer(&self) -> Result<Arc<Serializer>, ContextError> {
        Ok(Arc::clone(self.definition()?.serializer()))
    }

    /// Introspector of the loaded network.
    pub fn introspector(&self) -> Result<Arc<Introspector>, ContextError> {
        Ok(Arc::clone(self.definition()?.introspector()))
    }

    // =========================================================================
    // SERVICES
    // =========================================================================

    /// Registry manager, built on first access.
    pub fn registry_manager(&self) -> Result<Arc<RegistryManager>, ContextError> {
        self.registry_manager
            .get_or_try_init(|| -> Result<_, ContextError> {
                trace!("Building registry manager");
                Ok(Arc::new(RegistryManager::new(
                    self.host.data_service(),
                    self.introspector()?,
                    self.serializer()?,
                    self.access_controller()?,
                )))
            })
            .map(Arc::clone)
    }

    /// Resolver, built on first access.
    pub fn resolver(&self) -> Result<Arc<Resolver>, ContextError> {
        self.resolver
            .get_or_try_init(|| -> Result<_, ContextError> {
                trace!("Building resolver");
                Ok(Arc::new(Resolver::new(
                    self.introspector()?,
                    self.registry_manager()?,
                )))
            })
            .map(Arc::clone)
    }

    /// Transaction API, built on first access. Captures the participant
    /// bound at that moment.
    pub fn api(&self) -> Result<Arc<Api>, ContextError> {
        self.api
            .get_or_try_init(|| -> Result<_, ContextError> {
                trace!("Building transaction API");
                Ok(Arc::new(Api::new(
                    self.factory()?,
                    self.participant.get().cloned(),
                    self.registry_manager()?,
                )))
            })
            .map(Arc::clone)
    }

    /// Query executor, built on first access.
    pub fn query_executor(&self) -> Result<Arc<QueryExecutor>, ContextError> {
        self.query_executor
            .get_or_try_init(|| -> Result<_, ContextError> {
                trace!("Building query executor");
                Ok(Arc::new(QueryExecutor::new(self.resolver()?)))
            })
            .map(Arc::clone)
    }

    /// Identity manager, built on first access.
    pub fn identity_manager(&self) -> Result<Arc<IdentityManager>, ContextError> {
        self.identity_manager
            .get_or_try_init(|| -> Result<_, ContextError> {
                trace!("Building identity manager");
                Ok(Arc::new(IdentityManager::new(
                    self.host.data_service(),
                    self.registry_manager()?,
                )))
            })
            .map(Arc::clone)
    }

    /// Access controller, built on first access.
    pub fn access_controller(&self) -> Result<Arc<AccessController>, ContextError> {
        self.access_controller
            .get_or_try_init(|| -> Result<_, ContextError> {
                trace!("Building access controller");
                Ok(Arc::new(AccessController::new(self.acl_manager()?)))
            })
            .map(Arc::clone)
    }

    /// Host data service.
    #[must_use]
    pub fn data_service(&self) -> Arc<dyn DataService> {
        self.host.data_service()
    }

    /// Host identity service.
    #[must_use]
    pub fn identity_service(&self) -> Arc<dyn IdentityService> {
        self.host.identity_service()
    }

    // =========================================================================
    // BINDINGS
    // =========================================================================

    /// Participant submitting the transaction, if one was resolved.
    #[must_use]
    pub fn participant(&self) -> Option<&Resource> {
        self.participant.get()
    }

    /// Binds the acting participant and applies it to access control.
    ///
    /// # Errors
    ///
    /// * `ContextError::Configuration` - the network is not loaded
    /// * `ContextError::InvariantViolation` - a participant is already bound
    pub fn bind_participant(&self, participant: Resource) -> Result<(), ContextError> {
        let access_controller = self.access_controller()?;
        let bound = self.participant.bind(participant)?;
        access_controller.set_participant(bound.clone());
        debug!(participant = %bound.fully_qualified_identifier(), "Bound participant");
        Ok(())
    }

    /// Transaction being executed, if bound.
    #[must_use]
    pub fn transaction(&self) -> Option<&Resource> {
        self.transaction.get()
    }

    /// Binds the transaction and starts its audit log.
    ///
    /// # Errors
    ///
    /// * `ContextError::Configuration` - the network is not loaded
    /// * `ContextError::InvariantViolation` - a transaction is already bound
    pub fn bind_transaction(&self, transaction: Resource) -> Result<&Resource, ContextError> {
        let registry_manager = self.registry_manager()?;
        let serializer = self.serializer()?;
        let bound = self.transaction.bind(transaction)?;
        self.transaction_logger
            .get_or_init(|| TransactionLogger::new(bound.clone(), &registry_manager, serializer));
        debug!(transaction = %bound.fully_qualified_identifier(), "Bound transaction");
        Ok(bound)
    }

    /// Audit log of the bound transaction.
    #[must_use]
    pub fn transaction_logger(&self) -> Option<Arc<TransactionLogger>> {
        self.transaction_logger.get().cloned()
    }

    // =========================================================================
    // EXECUTORS
    // =========================================================================

    /// Registers `executor`, replacing any executor of the same kind at its
    /// current position. Returns the replaced executor.
    pub fn add_transaction_executor(
        &mut self,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Option<Arc<dyn TransactionExecutor>> {
        self.executors.add(executor)
    }

    /// Registered executors in dispatch order.
    #[must_use]
    pub fn transaction_executors(&self) -> &[Arc<dyn TransactionExecutor>] {
        self.executors.list()
    }

    /// Binds `transaction` and offers it to each executor in order until one
    /// claims it.
    ///
    /// # Errors
    ///
    /// * `ContextError::Configuration` - the context is not ready
    /// * `ContextError::NoExecutor` - every executor declined
    #[instrument(skip(self, transaction), fields(transaction = %transaction.fully_qualified_identifier()))]
    pub async fn execute_transaction(
        &self,
        transaction: Resource,
    ) -> Result<ExecutionOutcome, ContextError> {
        let state = self.state();
        if state != ContextState::Ready {
            return Err(ContextError::Configuration(format!(
                "context is not ready (state {state:?})"
            )));
        }

        let transaction = self.bind_transaction(transaction)?;
        for executor in self.executors.list() {
            let outcome = executor.execute(self, transaction).await?;
            if outcome.is_claimed() {
                info!(executor = executor.kind(), "Transaction executed");
                return Ok(outcome);
            }
            trace!(executor = executor.kind(), "Executor declined transaction");
        }

        warn!("No executor claimed the transaction");
        Err(ContextError::NoExecutor {
            transaction: transaction.fully_qualified_identifier(),
        })
    }
}

/// A context serializes to an empty object; it carries no state worth
/// persisting.
impl Serialize for Context {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state())
            .field(
                "network",
                &self.definition.get().map(|d| d.identifier().to_string()),
            )
            .field(
                "participant",
                &self.participant.get().map(Resource::fully_qualified_identifier),
            )
            .field("executors", &self.executors)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================
