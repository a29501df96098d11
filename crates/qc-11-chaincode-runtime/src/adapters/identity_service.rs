//! # Identity Service Adapter
//!
//! Fixed caller identity, for tests and hosts that authenticate upstream.

use crate::domain::value_objects::UserId;
use crate::ports::outbound::IdentityService;

/// Reports the same identity (or none) for every call.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityService {
    user_id: Option<UserId>,
}

impl StaticIdentityService {
    /// No current identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// Reports `user_id` as the current identity.
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(UserId::new(user_id)),
        }
    }
}

impl IdentityService for StaticIdentityService {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}
