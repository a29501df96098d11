//! # Transaction API
//!
//! The surface transaction processor functions program against: the factory,
//! the acting participant, and typed registry lookups.

use crate::domain::entities::Resource;
use crate::domain::network::Factory;
use crate::domain::value_objects::RegistryKind;
use crate::errors::RegistryError;
use crate::services::registry::{Registry, RegistryManager};
use std::sync::Arc;

/// API exposed to transaction processor functions.
///
/// The participant is captured when the API is built; bind the participant
/// before first requesting the API.
#[derive(Debug)]
pub struct Api {
    factory: Arc<Factory>,
    participant: Option<Resource>,
    registry_manager: Arc<RegistryManager>,
}

impl Api {
    /// Creates the API.
    #[must_use]
    pub fn new(
        factory: Arc<Factory>,
        participant: Option<Resource>,
        registry_manager: Arc<RegistryManager>,
    ) -> Self {
        Self {
            factory,
            participant,
            registry_manager,
        }
    }

    /// Resource factory.
    #[must_use]
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Participant submitting the transaction, if one was resolved.
    #[must_use]
    pub fn current_participant(&self) -> Option<&Resource> {
        self.participant.as_ref()
    }

    /// Default asset registry for `fqt`.
    pub async fn asset_registry(&self, fqt: &str) -> Result<Registry, RegistryError> {
        self.registry_manager.get(RegistryKind::Asset, fqt).await
    }

    /// Default participant registry for `fqt`.
    pub async fn participant_registry(&self, fqt: &str) -> Result<Registry, RegistryError> {
        self.registry_manager.get(RegistryKind::Participant, fqt).await
    }

    /// Every asset registry.
    pub async fn all_asset_registries(&self) -> Result<Vec<Registry>, RegistryError> {
        self.registry_manager.get_all(RegistryKind::Asset).await
    }

    /// Every participant registry.
    pub async fn all_participant_registries(&self) -> Result<Vec<Registry>, RegistryError> {
        self.registry_manager.get_all(RegistryKind::Participant).await
    }
}
