//! # Context Services
//!
//! Per-transaction services built from the loaded business network and the
//! host's data service. A [`crate::context::Context`] creates each one on
//! first use and reuses it for the rest of the transaction.
//!
//! Dependency order:
//!
//! ```text
//! AccessController  <- AclManager
//! RegistryManager   <- DataService, Introspector, Serializer, AccessController
//! Resolver          <- Introspector, RegistryManager
//! Api               <- Factory, participant, RegistryManager
//! QueryExecutor     <- Resolver
//! IdentityManager   <- DataService, RegistryManager
//! TransactionLogger <- transaction, RegistryManager, Serializer
//! ```

pub mod access;
pub mod api;
pub mod identity;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod transaction_logger;

pub use access::AccessController;
pub use api::Api;
pub use identity::{IdentityManager, SYSIDENTITIES_COLLECTION};
pub use query::{Query, QueryExecutor};
pub use registry::{
    Registry, RegistryAction, RegistryEvent, RegistryManager, RegistryObserver,
    SYSREGISTRIES_COLLECTION,
};
pub use resolver::{ResolvedResource, Resolver};
pub use transaction_logger::{LogEntry, TransactionLogger};
