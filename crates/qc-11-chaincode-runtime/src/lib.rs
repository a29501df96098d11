//! # QC-11 Chaincode Runtime - Per-Transaction Execution Context
//!
//! **Subsystem ID:** 11
//!
//! ## Purpose
//!
//! Creates the execution context every inbound chaincode transaction runs in.
//! A context loads the deployed business network, resolves the caller to a
//! participant, and mediates access to model introspection, registries,
//! queries, identity mapping, access control and pluggable transaction
//! executors.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | No definition-derived accessor succeeds before bootstrap | `context.rs` - `Context::definition()` |
//! | Participant and transaction bind at most once | `domain/binding.rs` - `Binding::bind()` |
//! | Definition cache never exceeds its capacity | `cache.rs` - `DefinitionCache::put()` |
//! | At most one executor per kind | `executors.rs` - `ExecutorRegistry::add()` |
//!
//! ## Bootstrap
//!
//! | Step | Suspends on | Failure |
//! |------|-------------|---------|
//! | Read `$sysdata/businessnetwork` | `DataService` | `ContextError::Data` |
//! | Cache lookup by archive hash, else decode + parse | `ArchiveLoader` | `ContextError::Archive` |
//! | Resolve current identity to a participant | `IdentityManager` | `ContextError::IdentityResolution` |
//! | Install the default script executor | - | - |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `DataService` / `Collection` | Persistent registries and system records |
//! | `IdentityService` | Caller identity |
//! | `ArchiveLoader` | Business network parsing |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_chaincode_runtime::prelude::*;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(DefinitionCache::new());
//! let mut context = Context::new(host, Arc::clone(&cache));
//! context.initialize().await?;
//!
//! let outcome = context.execute_transaction(tx).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod executors;
pub mod ports;
pub mod services;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Context
    pub use crate::cache::{DefinitionCache, DEFAULT_CACHE_CAPACITY};
    pub use crate::config::ContextConfig;
    pub use crate::context::{Context, ContextState};

    // Domain
    pub use crate::domain::entities::{Relationship, Resource, SystemRecord};
    pub use crate::domain::network::{
        AclAction, AclRule, BusinessNetworkDefinition, ClassDeclaration, DeclarationKind,
        ProcessorFunction, Script,
    };
    pub use crate::domain::value_objects::{NetworkHash, Operation, RegistryKind, UserId};

    // Ports
    pub use crate::ports::inbound::{ExecutionOutcome, TransactionExecutor};
    pub use crate::ports::outbound::{
        ArchiveLoader, ChaincodeHost, Collection, DataService, IdentityService,
    };

    // Services
    pub use crate::services::{
        AccessController, Api, IdentityManager, LogEntry, Query, QueryExecutor, Registry,
        RegistryManager, ResolvedResource, Resolver, TransactionLogger,
    };

    // Executors
    pub use crate::executors::{ExecutorRegistry, ScriptTransactionExecutor, SCRIPT_EXECUTOR_KIND};

    // Errors
    pub use crate::errors::{
        AccessError, ArchiveError, ContextError, DataError, ExecutorError, IdentityError,
        ModelError, RegistryError,
    };

    // Adapters
    pub use crate::adapters::{
        ArchiveManifest, HostBindings, InMemoryDataService, JsonArchiveLoader,
        StaticIdentityService,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Chaincode Runtime";

// =============================================================================
// TESTS
// =============================================================================
