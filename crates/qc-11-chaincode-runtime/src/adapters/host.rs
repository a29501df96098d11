//! # Host Bindings
//!
//! Assembles the capabilities a hosting platform supplies into a
//! [`ChaincodeHost`]. The builder reports a missing capability at
//! integration time, before any context is created.

use crate::adapters::archive::JsonArchiveLoader;
use crate::errors::ContextError;
use crate::ports::outbound::{ArchiveLoader, ChaincodeHost, DataService, IdentityService};
use std::sync::Arc;

/// A [`ChaincodeHost`] made of explicitly supplied services.
#[derive(Clone)]
pub struct HostBindings {
    data_service: Arc<dyn DataService>,
    identity_service: Arc<dyn IdentityService>,
    archive_loader: Arc<dyn ArchiveLoader>,
}

impl HostBindings {
    /// Binds the two required services and the JSON archive loader.
    #[must_use]
    pub fn new(
        data_service: Arc<dyn DataService>,
        identity_service: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            data_service,
            identity_service,
            archive_loader: Arc::new(JsonArchiveLoader::new()),
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> HostBindingsBuilder {
        HostBindingsBuilder::default()
    }
}

impl ChaincodeHost for HostBindings {
    fn data_service(&self) -> Arc<dyn DataService> {
        Arc::clone(&self.data_service)
    }

    fn identity_service(&self) -> Arc<dyn IdentityService> {
        Arc::clone(&self.identity_service)
    }

    fn archive_loader(&self) -> Arc<dyn ArchiveLoader> {
        Arc::clone(&self.archive_loader)
    }
}

impl std::fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBindings").finish_non_exhaustive()
    }
}

/// Builder for [`HostBindings`].
#[derive(Default)]
pub struct HostBindingsBuilder {
    data_service: Option<Arc<dyn DataService>>,
    identity_service: Option<Arc<dyn IdentityService>>,
    archive_loader: Option<Arc<dyn ArchiveLoader>>,
}

impl HostBindingsBuilder {
    /// Sets the data service.
    #[must_use]
    pub fn data_service(mut self, service: Arc<dyn DataService>) -> Self {
        self.data_service = Some(service);
        self
    }

    /// Sets the identity service.
    #[must_use]
    pub fn identity_service(mut self, service: Arc<dyn IdentityService>) -> Self {
        self.identity_service = Some(service);
        self
    }

    /// Sets the archive loader. Defaults to [`JsonArchiveLoader`].
    #[must_use]
    pub fn archive_loader(mut self, loader: Arc<dyn ArchiveLoader>) -> Self {
        self.archive_loader = Some(loader);
        self
    }

    /// Builds the bindings.
    ///
    /// # Errors
    ///
    /// * `ContextError::CapabilityMissing` - the data or identity service was not set
    pub fn build(self) -> Result<HostBindings, ContextError> {
        Ok(HostBindings {
            data_service: self
                .data_service
                .ok_or(ContextError::CapabilityMissing("DataService"))?,
            identity_service: self
                .identity_service
                .ok_or(ContextError::CapabilityMissing("IdentityService"))?,
            archive_loader: self
                .archive_loader
                .unwrap_or_else(|| Arc::new(JsonArchiveLoader::new())),
        })
    }
}
