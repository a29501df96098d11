//! # Archive Adapter
//!
//! Loads business networks packaged as a JSON manifest of model
//! declarations, scripts and ACL rules.

use crate::domain::network::{AclRule, BusinessNetworkDefinition, ClassDeclaration, Script};
use crate::errors::ArchiveError;
use crate::ports::outbound::ArchiveLoader;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Contents of a JSON business network archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    /// Network identifier, e.g. `my-network@0.1.0`.
    pub identifier: String,
    /// Declared types.
    #[serde(default)]
    pub models: Vec<ClassDeclaration>,
    /// Transaction processor scripts.
    #[serde(default)]
    pub scripts: Vec<Script>,
    /// Access control rules, in evaluation order.
    #[serde(default)]
    pub acls: Vec<AclRule>,
}

impl ArchiveManifest {
    /// Encodes the manifest as archive bytes.
    pub fn to_archive(&self) -> Result<Vec<u8>, ArchiveError> {
        serde_json::to_vec(self).map_err(|e| ArchiveError::InvalidArchive(e.to_string()))
    }

    /// Builds the definition described by this manifest.
    #[must_use]
    pub fn into_definition(self) -> BusinessNetworkDefinition {
        BusinessNetworkDefinition::new(self.identifier, self.models, self.scripts, self.acls)
    }
}

/// Parses JSON manifest archives.
#[derive(Debug, Default)]
pub struct JsonArchiveLoader {
    loads: AtomicUsize,
}

impl JsonArchiveLoader {
    /// Create a loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of archives parsed successfully.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveLoader for JsonArchiveLoader {
    async fn from_archive(&self, archive: &[u8]) -> Result<BusinessNetworkDefinition, ArchiveError> {
        let manifest: ArchiveManifest = serde_json::from_slice(archive)
            .map_err(|e| ArchiveError::InvalidArchive(e.to_string()))?;
        debug!(
            network = %manifest.identifier,
            models = manifest.models.len(),
            scripts = manifest.scripts.len(),
            acls = manifest.acls.len(),
            "Parsed business network archive"
        );
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(manifest.into_definition())
    }
}
