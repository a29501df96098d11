//! # Data Service Adapter
//!
//! In-memory collections for testing and single-process hosts.
//! Production hosts back `DataService` with the ledger's world state.

use crate::config::{NETWORK_RECORD_KEY, SYSDATA_COLLECTION};
use crate::domain::entities::SystemRecord;
use crate::domain::value_objects::NetworkHash;
use crate::errors::DataError;
use crate::ports::outbound::{Collection, DataService};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory collection. Objects are kept in key order.
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    objects: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryCollection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    fn not_found(&self, key: &str) -> DataError {
        DataError::ObjectNotFound {
            collection: self.name.clone(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_all(&self) -> Result<Vec<Value>, DataError> {
        Ok(self.objects.read().values().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Value, DataError> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| self.not_found(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, DataError> {
        Ok(self.objects.read().contains_key(key))
    }

    async fn add(&self, key: &str, value: Value) -> Result<(), DataError> {
        let mut objects = self.objects.write();
        if objects.contains_key(key) {
            return Err(DataError::ObjectExists {
                collection: self.name.clone(),
                key: key.to_string(),
            });
        }
        objects.insert(key.to_string(), value);
        Ok(())
    }

    async fn update(&self, key: &str, value: Value) -> Result<(), DataError> {
        let mut objects = self.objects.write();
        match objects.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.not_found(key)),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), DataError> {
        self.objects
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| self.not_found(key))
    }
}

/// In-memory data service.
#[derive(Debug)]
pub struct InMemoryDataService {
    collections: RwLock<BTreeMap<String, Arc<InMemoryCollection>>>,
    available: AtomicBool,
}

impl Default for InMemoryDataService {
    fn default() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryDataService {
    /// Create an empty data service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, creating the collection if needed and
    /// overwriting any existing object.
    pub fn insert_object(&self, collection: &str, key: &str, value: Value) {
        self.collection_or_create(collection)
            .objects
            .write()
            .insert(key.to_string(), value);
    }

    /// Writes the system record for `archive`, as a host does when a
    /// business network is deployed or upgraded.
    pub fn deploy(&self, archive: &[u8]) -> NetworkHash {
        let record = SystemRecord::for_archive(archive);
        self.insert_object(SYSDATA_COLLECTION, NETWORK_RECORD_KEY, record.to_value());
        record.hash
    }

    /// Makes every subsequent call fail with `DataError::Unavailable` until
    /// re-enabled.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn collection_or_create(&self, name: &str) -> Arc<InMemoryCollection> {
        Arc::clone(
            self.collections
                .write()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(InMemoryCollection::new(name))),
        )
    }

    fn check_available(&self) -> Result<(), DataError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataError::Unavailable("in-memory store disabled".to_string()))
        }
    }
}

#[async_trait]
impl DataService for InMemoryDataService {
    async fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>, DataError> {
        self.check_available()?;
        self.collections
            .read()
            .get(name)
            .map(|collection| Arc::clone(collection) as Arc<dyn Collection>)
            .ok_or_else(|| DataError::CollectionNotFound(name.to_string()))
    }

    async fn create_collection(&self, name: &str) -> Result<Arc<dyn Collection>, DataError> {
        self.check_available()?;
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(DataError::CollectionExists(name.to_string()));
        }
        let collection = Arc::new(InMemoryCollection::new(name));
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}

// =============================================================================
// TESTS
// =============================================================================
