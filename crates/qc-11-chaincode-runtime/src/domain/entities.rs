//! # Domain Entities
//!
//! Resources (participants, transactions, assets), relationships between them,
//! and the system record that points at the deployed business network.

use crate::domain::value_objects::NetworkHash;
use crate::errors::ArchiveError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of a relationship reference stored in a resource field.
pub const RELATIONSHIP_PREFIX: &str = "resource:";

// =============================================================================
// RESOURCE
// =============================================================================

/// An instance of a modelled type: a participant, transaction or asset.
///
/// The context treats resources as opaque; only the identifying triple is
/// interpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Namespace of the type, e.g. `org.acme`.
    pub namespace: String,
    /// Short type name, e.g. `Trader`.
    pub type_name: String,
    /// Value of the type's identifying field.
    pub identifier: String,
    /// Remaining fields.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Resource {
    /// Creates a resource with no data fields.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        type_name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            type_name: type_name.into(),
            identifier: identifier.into(),
            data: Map::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(name.into(), value.into())
    }

    /// Reads a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// `namespace.Type`
    #[must_use]
    pub fn fully_qualified_type(&self) -> String {
        format!("{}.{}", self.namespace, self.type_name)
    }

    /// `namespace.Type#identifier`
    #[must_use]
    pub fn fully_qualified_identifier(&self) -> String {
        format!("{}.{}#{}", self.namespace, self.type_name, self.identifier)
    }

    /// Relationship reference to this resource, suitable for storing in a field.
    #[must_use]
    pub fn to_relationship(&self) -> String {
        format!("{RELATIONSHIP_PREFIX}{}", self.fully_qualified_identifier())
    }
}

// =============================================================================
// RELATIONSHIP
// =============================================================================

/// A typed pointer to a resource held in some registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Relationship {
    /// Namespace of the target type.
    pub namespace: String,
    /// Short name of the target type.
    pub type_name: String,
    /// Identifier of the target resource.
    pub identifier: String,
}

impl Relationship {
    /// Parses `resource:namespace.Type#identifier`.
    #[must_use]
    pub fn parse(uri: &str) -> Option<Self> {
        uri.strip_prefix(RELATIONSHIP_PREFIX)
            .and_then(Self::from_identifier)
    }

    /// Parses `namespace.Type#identifier`.
    #[must_use]
    pub fn from_identifier(fqi: &str) -> Option<Self> {
        let (fqt, identifier) = fqi.split_once('#')?;
        let (namespace, type_name) = fqt.rsplit_once('.')?;
        if namespace.is_empty() || type_name.is_empty() || identifier.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            identifier: identifier.to_string(),
        })
    }

    /// `namespace.Type`
    #[must_use]
    pub fn fully_qualified_type(&self) -> String {
        format!("{}.{}", self.namespace, self.type_name)
    }
}

// =============================================================================
// SYSTEM RECORD
// =============================================================================

/// The persisted record identifying the deployed business network.
///
/// `data` is the standard-base64 encoding of the archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRecord {
    /// Content hash of the archive.
    pub hash: NetworkHash,
    /// Encoded archive payload.
    pub data: String,
}

impl SystemRecord {
    /// Builds the record a host stores when deploying `archive`.
    #[must_use]
    pub fn for_archive(archive: &[u8]) -> Self {
        Self {
            hash: NetworkHash::of(archive),
            data: STANDARD.encode(archive),
        }
    }

    /// Reads a record fetched from the data service.
    pub fn from_value(value: Value) -> Result<Self, ArchiveError> {
        serde_json::from_value(value).map_err(|e| ArchiveError::InvalidRecord(e.to_string()))
    }

    /// Converts the record to its stored form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "hash": self.hash, "data": self.data })
    }

    /// Decodes the archive payload.
    pub fn decode_archive(&self) -> Result<Vec<u8>, ArchiveError> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ArchiveError::InvalidEncoding(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
