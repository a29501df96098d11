//! # Value Objects
//!
//! Immutable domain primitives for the chaincode runtime.
//! These types represent concepts that are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// NETWORK HASH
// =============================================================================

/// Content hash identifying a deployed business network archive.
///
/// Hosts store it next to the archive payload in the system record; the
/// definition cache is keyed by it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkHash(String);

impl NetworkHash {
    /// Wraps an existing hash string.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Computes the lowercase hex SHA-256 of an archive.
    #[must_use]
    pub fn of(archive: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(archive)))
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkHash {
    fn from(hash: &str) -> Self {
        Self::new(hash)
    }
}

// =============================================================================
// USER ID
// =============================================================================

/// Identifier reported by the host identity service for the caller.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// OPERATION
// =============================================================================

/// Registry operation subject to access control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Add a resource.
    Create,
    /// Read a resource.
    Read,
    /// Replace a resource.
    Update,
    /// Remove a resource.
    Delete,
}

impl Operation {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// REGISTRY KIND
// =============================================================================

/// The kind of registry a resource type is stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryKind {
    /// Asset registries.
    Asset,
    /// Participant registries.
    Participant,
    /// Transaction registries.
    Transaction,
}

impl RegistryKind {
    /// Name used in registry collection keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "Asset",
            Self::Participant => "Participant",
            Self::Transaction => "Transaction",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_hash_of_is_stable_hex() {
        let a = NetworkHash::of(b"archive");
        let b = NetworkHash::of(b"archive");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, NetworkHash::of(b"other archive"));
    }

    #[test]
    fn test_operation_serde_names() {
        let json = serde_json::to_string(&Operation::Update).unwrap();
        assert_eq!(json, "\"UPDATE\"");
        let op: Operation = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(op, Operation::Delete);
    }

    #[test]
    fn test_registry_kind_display() {
        assert_eq!(RegistryKind::Participant.to_string(), "Participant");
    }
}
