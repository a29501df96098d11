//! # Identity Manager
//!
//! Maps host user identities to participants. Mappings live in the
//! `$sysidentities` collection as `{ "participant": "ns.Type#id" }` keyed by
//! user id.

use crate::domain::entities::{Relationship, Resource};
use crate::domain::value_objects::{RegistryKind, UserId};
use crate::errors::{DataError, IdentityError};
use crate::ports::outbound::DataService;
use crate::services::registry::RegistryManager;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Collection holding identity to participant mappings.
pub const SYSIDENTITIES_COLLECTION: &str = "$sysidentities";

/// Resolves and maintains identity mappings.
pub struct IdentityManager {
    data_service: Arc<dyn DataService>,
    registry_manager: Arc<RegistryManager>,
}

impl IdentityManager {
    /// Creates an identity manager.
    #[must_use]
    pub fn new(data_service: Arc<dyn DataService>, registry_manager: Arc<RegistryManager>) -> Self {
        Self {
            data_service,
            registry_manager,
        }
    }

    /// Participant mapped to `user_id`.
    ///
    /// # Errors
    ///
    /// * `IdentityError::Unmapped` - no mapping exists for the identity
    /// * `IdentityError::InvalidMapping` - the stored mapping is malformed
    /// * `IdentityError::Registry` - the participant could not be fetched
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_participant(&self, user_id: &UserId) -> Result<Resource, IdentityError> {
        let identities = match self.data_service.get_collection(SYSIDENTITIES_COLLECTION).await {
            Ok(collection) => collection,
            Err(DataError::CollectionNotFound(_)) => {
                return Err(IdentityError::Unmapped(user_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let record = match identities.get(user_id.as_str()).await {
            Ok(record) => record,
            Err(DataError::ObjectNotFound { .. }) => {
                return Err(IdentityError::Unmapped(user_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let relationship = record
            .get("participant")
            .and_then(Value::as_str)
            .and_then(Relationship::from_identifier)
            .ok_or_else(|| IdentityError::InvalidMapping {
                user_id: user_id.to_string(),
                reason: "missing or malformed participant reference".to_string(),
            })?;

        let registry = self
            .registry_manager
            .get(RegistryKind::Participant, &relationship.fully_qualified_type())
            .await?;
        let participant = registry.get(&relationship.identifier).await?;
        debug!(
            participant = %participant.fully_qualified_identifier(),
            "Resolved identity"
        );
        Ok(participant)
    }

    /// Maps `user_id` to `participant`.
    ///
    /// # Errors
    ///
    /// * `IdentityError::AlreadyMapped` - the identity already has a mapping
    pub async fn add_identity_mapping(
        &self,
        participant: &Resource,
        user_id: &UserId,
    ) -> Result<(), IdentityError> {
        let identities = self
            .data_service
            .ensure_collection(SYSIDENTITIES_COLLECTION)
            .await?;
        if identities.exists(user_id.as_str()).await? {
            return Err(IdentityError::AlreadyMapped(user_id.to_string()));
        }
        identities
            .add(
                user_id.as_str(),
                json!({ "participant": participant.fully_qualified_identifier() }),
            )
            .await?;
        debug!(
            %user_id,
            participant = %participant.fully_qualified_identifier(),
            "Added identity mapping"
        );
        Ok(())
    }

    /// Removes the mapping for `user_id`.
    ///
    /// # Errors
    ///
    /// * `IdentityError::Unmapped` - no mapping exists for the identity
    pub async fn remove_identity_mapping(&self, user_id: &UserId) -> Result<(), IdentityError> {
        let identities = self
            .data_service
            .ensure_collection(SYSIDENTITIES_COLLECTION)
            .await?;
        match identities.remove(user_id.as_str()).await {
            Ok(()) => Ok(()),
            Err(DataError::ObjectNotFound { .. }) => {
                Err(IdentityError::Unmapped(user_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for IdentityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityManager").finish_non_exhaustive()
    }
}
