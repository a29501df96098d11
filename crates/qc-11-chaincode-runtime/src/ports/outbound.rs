//! # Driven Ports (SPI - Outbound)
//!
//! These are the interfaces the chaincode runtime depends on. The hosting
//! platform implements them to provide:
//! - Persistent collections (`DataService`, `Collection`)
//! - The caller's identity (`IdentityService`)
//! - Archive parsing (`ArchiveLoader`)
//!
//! `ChaincodeHost` bundles all three. A host integration that compiles
//! against it has supplied every capability the context needs.

use crate::domain::network::BusinessNetworkDefinition;
use crate::domain::value_objects::UserId;
use crate::errors::{ArchiveError, DataError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// DATA SERVICE
// =============================================================================

/// A named collection of JSON objects keyed by string.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// All objects in key order.
    async fn get_all(&self) -> Result<Vec<Value>, DataError>;

    /// One object.
    ///
    /// # Errors
    ///
    /// * `DataError::ObjectNotFound` - if `key` is absent
    async fn get(&self, key: &str) -> Result<Value, DataError>;

    /// Whether `key` is present.
    async fn exists(&self, key: &str) -> Result<bool, DataError>;

    /// Adds a new object.
    ///
    /// # Errors
    ///
    /// * `DataError::ObjectExists` - if `key` is already present
    async fn add(&self, key: &str, value: Value) -> Result<(), DataError>;

    /// Replaces an existing object.
    ///
    /// # Errors
    ///
    /// * `DataError::ObjectNotFound` - if `key` is absent
    async fn update(&self, key: &str, value: Value) -> Result<(), DataError>;

    /// Removes an existing object.
    async fn remove(&self, key: &str) -> Result<(), DataError>;
}

/// Host-provided persistent storage.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Opens an existing collection.
    ///
    /// # Errors
    ///
    /// * `DataError::CollectionNotFound` - if no such collection exists
    async fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>, DataError>;

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// * `DataError::CollectionExists` - if it already exists
    async fn create_collection(&self, name: &str) -> Result<Arc<dyn Collection>, DataError>;

    /// Opens a collection, creating it when missing.
    async fn ensure_collection(&self, name: &str) -> Result<Arc<dyn Collection>, DataError> {
        match self.get_collection(name).await {
            Err(DataError::CollectionNotFound(_)) => self.create_collection(name).await,
            other => other,
        }
    }
}

// =============================================================================
// IDENTITY SERVICE
// =============================================================================

/// Host-provided caller identity.
pub trait IdentityService: Send + Sync {
    /// Identifier of the user submitting the current transaction, if known.
    fn current_user_id(&self) -> Option<UserId>;
}

// =============================================================================
// ARCHIVE LOADER
// =============================================================================

/// Parses a business network archive into a definition.
///
/// Parsing is the expensive step the definition cache exists to avoid.
#[async_trait]
pub trait ArchiveLoader: Send + Sync {
    /// Parses `archive` (already base64-decoded).
    async fn from_archive(&self, archive: &[u8]) -> Result<BusinessNetworkDefinition, ArchiveError>;
}

// =============================================================================
// HOST
// =============================================================================

/// Every capability the hosting platform must supply to a context.
pub trait ChaincodeHost: Send + Sync {
    /// Persistent storage.
    fn data_service(&self) -> Arc<dyn DataService>;

    /// Caller identity.
    fn identity_service(&self) -> Arc<dyn IdentityService>;

    /// Archive parser.
    fn archive_loader(&self) -> Arc<dyn ArchiveLoader>;
}
