//! # Access Controller
//!
//! Evaluates the network's ACL rules against the participant bound to the
//! context. Registries call [`AccessController::check`] before every read and
//! mutation.

use crate::domain::entities::Resource;
use crate::domain::network::{AclAction, AclManager};
use crate::domain::value_objects::Operation;
use crate::errors::AccessError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// ACL enforcement for one context.
#[derive(Debug)]
pub struct AccessController {
    acl_manager: Arc<AclManager>,
    participant: RwLock<Option<Resource>>,
}

impl AccessController {
    /// Creates a controller with no participant.
    #[must_use]
    pub fn new(acl_manager: Arc<AclManager>) -> Self {
        Self {
            acl_manager,
            participant: RwLock::new(None),
        }
    }

    /// Sets the participant subsequent checks run as.
    pub fn set_participant(&self, participant: Resource) {
        debug!(
            participant = %participant.fully_qualified_identifier(),
            "Access controller now enforcing rules for participant"
        );
        *self.participant.write() = Some(participant);
    }

    /// Participant checks run as.
    #[must_use]
    pub fn participant(&self) -> Option<Resource> {
        self.participant.read().clone()
    }

    /// Checks that the current participant may perform `operation` on
    /// `resource`.
    ///
    /// Permitted outright when no participant is bound or the network has no
    /// rules. Otherwise the first matching rule decides; no match denies.
    pub fn check(&self, resource: &Resource, operation: Operation) -> Result<(), AccessError> {
        let guard = self.participant.read();
        let Some(participant) = guard.as_ref() else {
            trace!("No participant bound, access permitted");
            return Ok(());
        };
        if self.acl_manager.is_empty() {
            return Ok(());
        }

        let resource_type = resource.fully_qualified_type();
        let participant_type = participant.fully_qualified_type();
        let decision = self
            .acl_manager
            .rules()
            .iter()
            .find(|rule| rule.matches(&resource_type, &participant_type, operation));

        match decision {
            Some(rule) if rule.action == AclAction::Allow => {
                trace!(rule = %rule.name, "Access granted");
                Ok(())
            }
            found => {
                debug!(
                    rule = found.map(|rule| rule.name.as_str()),
                    resource = %resource.fully_qualified_identifier(),
                    %operation,
                    "Access denied"
                );
                Err(AccessError {
                    participant: participant.fully_qualified_identifier(),
                    operation: operation.to_string(),
                    resource: resource.fully_qualified_identifier(),
                })
            }
        }
    }
}
