//! Context configuration from defaults and environment variables.

use crate::cache::DEFAULT_CACHE_CAPACITY;
use std::env;
use std::time::Duration;

/// Collection holding the system record.
pub const SYSDATA_COLLECTION: &str = "$sysdata";

/// Key of the business network record in [`SYSDATA_COLLECTION`].
pub const NETWORK_RECORD_KEY: &str = "businessnetwork";

/// Configuration for contexts created by a host.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Capacity of a definition cache built by [`ContextConfig::build_cache`].
    pub cache_capacity: usize,

    /// Upper bound on the whole bootstrap pipeline, in milliseconds.
    pub bootstrap_timeout_ms: u64,

    /// Collection holding the system record.
    pub sysdata_collection: String,

    /// Key of the business network record.
    pub network_record_key: String,

    /// Accept transactions with no current identity (no participant bound).
    ///
    /// On by default. Integrators that require every caller to map to a
    /// participant should turn it off.
    pub allow_anonymous: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            bootstrap_timeout_ms: 30_000,
            sysdata_collection: SYSDATA_COLLECTION.to_string(),
            network_record_key: NETWORK_RECORD_KEY.to_string(),
            allow_anonymous: true,
        }
    }
}

impl ContextConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_CHAINCODE_CACHE_CAPACITY`: Definition cache capacity (default: 8)
    /// - `QC_CHAINCODE_BOOTSTRAP_TIMEOUT_MS`: Bootstrap timeout (default: 30000)
    /// - `QC_CHAINCODE_ALLOW_ANONYMOUS`: Accept callers without identity (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: env::var("QC_CHAINCODE_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.cache_capacity),

            bootstrap_timeout_ms: env::var("QC_CHAINCODE_BOOTSTRAP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bootstrap_timeout_ms),

            allow_anonymous: env::var("QC_CHAINCODE_ALLOW_ANONYMOUS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.allow_anonymous),

            ..defaults
        }
    }

    /// Bootstrap timeout as a [`Duration`].
    #[must_use]
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }

    /// Builds a definition cache sized by this configuration.
    #[must_use]
    pub fn build_cache(&self) -> crate::cache::DefinitionCache {
        crate::cache::DefinitionCache::with_capacity(self.cache_capacity)
    }
}
