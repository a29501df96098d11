//! # Error Types
//!
//! All error types for the chaincode runtime context and the collaborator
//! services it builds.

use crate::domain::binding::AlreadyBound;
use thiserror::Error;

// =============================================================================
// CONTEXT ERRORS
// =============================================================================

/// Errors surfaced by a [`Context`](crate::context::Context).
#[derive(Debug, Error, Clone)]
pub enum ContextError {
    /// An accessor requiring the business network definition was invoked
    /// before bootstrap loaded it (or after bootstrap failed).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A current identity exists but does not map to a participant.
    ///
    /// The underlying cause is logged, never carried in this error.
    #[error(
        "could not determine the participant for identity '{user_id}'. \
         The identity may be invalid or may have been revoked"
    )]
    IdentityResolution {
        /// The identifier reported by the identity service.
        user_id: String,
    },

    /// No current identity, and the host configured anonymous access off.
    #[error("no current identity and anonymous access is disabled")]
    IdentityRequired,

    /// A set-once binding was bound twice, or the context was reused.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The integration layer did not supply a required host capability.
    #[error("host capability missing: {0}")]
    CapabilityMissing(&'static str),

    /// Bootstrap did not finish within the configured timeout.
    #[error("bootstrap timed out after {timeout_ms}ms")]
    BootstrapTimeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Data service failure.
    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// Business network archive could not be decoded or parsed.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Model-level failure (unknown type, malformed resource).
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Registry failure.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A transaction executor failed.
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// No registered executor claimed the transaction.
    #[error("no transaction executor claimed transaction {transaction}")]
    NoExecutor {
        /// Fully qualified identifier of the transaction.
        transaction: String,
    },
}

impl ContextError {
    /// Returns true if a host may retry bootstrap on a fresh context.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BootstrapTimeout { .. } | Self::Data(DataError::Unavailable(_))
        )
    }
}

impl From<AlreadyBound> for ContextError {
    fn from(err: AlreadyBound) -> Self {
        Self::InvariantViolation(err.to_string())
    }
}

// =============================================================================
// DATA ERRORS
// =============================================================================

/// Errors from the host data service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Collection already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// Object does not exist in the collection.
    #[error("object with ID '{key}' in collection '{collection}' does not exist")]
    ObjectNotFound {
        /// Collection name.
        collection: String,
        /// Object key.
        key: String,
    },

    /// Object already exists in the collection.
    #[error("object with ID '{key}' in collection '{collection}' already exists")]
    ObjectExists {
        /// Collection name.
        collection: String,
        /// Object key.
        key: String,
    },

    /// Backing store unavailable.
    #[error("data service unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// ARCHIVE ERRORS
// =============================================================================

/// Errors loading a business network from its archive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The system record is malformed.
    #[error("invalid system record: {0}")]
    InvalidRecord(String),

    /// The archive payload is not valid base64.
    #[error("invalid archive encoding: {0}")]
    InvalidEncoding(String),

    /// The archive could not be parsed into a definition.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),
}

// =============================================================================
// MODEL ERRORS
// =============================================================================

/// Errors from the model manager, factory, serializer and introspector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Type is not declared in the business network.
    #[error("type '{0}' is not declared in the business network")]
    UnknownType(String),

    /// Type exists but cannot be stored in a registry.
    #[error("type '{0}' cannot be stored in a registry")]
    NotRegistrable(String),

    /// Serialized resource is missing a required field.
    #[error("resource is missing field '{0}'")]
    MissingField(String),

    /// Serialized resource is malformed.
    #[error("invalid resource: {0}")]
    InvalidResource(String),
}

// =============================================================================
// ACCESS ERRORS
// =============================================================================

/// Access-control denial.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("participant '{participant}' does not have '{operation}' access to resource '{resource}'")]
pub struct AccessError {
    /// Fully qualified identifier of the acting participant.
    pub participant: String,
    /// Denied operation.
    pub operation: String,
    /// Fully qualified identifier of the target resource.
    pub resource: String,
}

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors from registries and the registry manager.
#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// Registry is not known to the registry manager.
    #[error("registry '{kind}:{id}' does not exist")]
    RegistryNotFound {
        /// Registry kind.
        kind: String,
        /// Registry identifier.
        id: String,
    },

    /// Registry already exists.
    #[error("registry '{kind}:{id}' already exists")]
    RegistryExists {
        /// Registry kind.
        kind: String,
        /// Registry identifier.
        id: String,
    },

    /// Underlying collection failure.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Access-control denial.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Model failure.
    #[error(transparent)]
    Model(#[from] ModelError),
}

// =============================================================================
// IDENTITY ERRORS
// =============================================================================

/// Errors from the identity manager.
#[derive(Debug, Error, Clone)]
pub enum IdentityError {
    /// Identity has no participant mapping.
    #[error("identity '{0}' is not mapped to a participant")]
    Unmapped(String),

    /// Identity already has a participant mapping.
    #[error("identity '{0}' is already mapped to a participant")]
    AlreadyMapped(String),

    /// Stored mapping is malformed.
    #[error("invalid identity mapping for '{user_id}': {reason}")]
    InvalidMapping {
        /// Identity.
        user_id: String,
        /// What is wrong with the mapping.
        reason: String,
    },

    /// Participant lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Identity collection failure.
    #[error(transparent)]
    Data(#[from] DataError),
}

// =============================================================================
// EXECUTOR ERRORS
// =============================================================================

/// Errors raised by transaction executors.
#[derive(Debug, Error, Clone)]
pub enum ExecutorError {
    /// Executor claimed the transaction but failed to process it.
    #[error("executor '{kind}' failed: {reason}")]
    Failed {
        /// Executor type discriminator.
        kind: String,
        /// Failure description.
        reason: String,
    },
}

// =============================================================================
// TESTS
// =============================================================================
