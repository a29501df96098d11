//! # Registries
//!
//! A registry is a collection of resources of one type, persisted through the
//! host data service. The registry manager keeps the list of registries in
//! the `$sysregistries` collection; each registry's resources live in a
//! collection named `<Kind>:<registry id>`.
//!
//! Every read and mutation is checked by the context's access controller, and
//! mutations are reported to subscribed [`RegistryObserver`]s (the transaction
//! logger is one).

use crate::domain::entities::Resource;
use crate::domain::network::{Introspector, Serializer};
use crate::domain::value_objects::{Operation, RegistryKind};
use crate::errors::{DataError, RegistryError};
use crate::ports::outbound::{Collection, DataService};
use crate::services::access::AccessController;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Collection listing every registry.
pub const SYSREGISTRIES_COLLECTION: &str = "$sysregistries";

type Observers = Arc<RwLock<Vec<Arc<dyn RegistryObserver>>>>;

fn registry_key(kind: RegistryKind, id: &str) -> String {
    format!("{kind}:{id}")
}

// =============================================================================
// EVENTS
// =============================================================================

/// Kind of registry mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryAction {
    /// Resource added.
    Add,
    /// Resource replaced.
    Update,
    /// Resource removed.
    Remove,
}

/// A mutation applied to a registry.
#[derive(Clone, Debug)]
pub struct RegistryEvent {
    /// Kind of the mutated registry.
    pub kind: RegistryKind,
    /// Identifier of the mutated registry.
    pub registry_id: String,
    /// What happened.
    pub action: RegistryAction,
    /// The resource as added/updated, or as it was before removal.
    pub resource: Resource,
}

/// Receives registry mutations.
pub trait RegistryObserver: Send + Sync {
    /// Called after a mutation is persisted.
    fn on_mutation(&self, event: &RegistryEvent);
}

// =============================================================================
// REGISTRY MANAGER
// =============================================================================

/// Creates and opens registries for one context.
pub struct RegistryManager {
    data_service: Arc<dyn DataService>,
    introspector: Arc<Introspector>,
    serializer: Arc<Serializer>,
    access_controller: Arc<AccessController>,
    observers: Observers,
}

impl RegistryManager {
    /// Creates a registry manager.
    #[must_use]
    pub fn new(
        data_service: Arc<dyn DataService>,
        introspector: Arc<Introspector>,
        serializer: Arc<Serializer>,
        access_controller: Arc<AccessController>,
    ) -> Self {
        Self {
            data_service,
            introspector,
            serializer,
            access_controller,
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Subscribes `observer` to mutations on every registry from this manager,
    /// including registries opened before the call.
    pub fn subscribe(&self, observer: Arc<dyn RegistryObserver>) {
        self.observers.write().push(observer);
    }

    /// Opens an existing registry.
    ///
    /// # Errors
    ///
    /// * `RegistryError::RegistryNotFound` - if the registry was never created
    pub async fn get(&self, kind: RegistryKind, id: &str) -> Result<Registry, RegistryError> {
        let key = registry_key(kind, id);
        let registries = self
            .data_service
            .ensure_collection(SYSREGISTRIES_COLLECTION)
            .await?;
        let record = match registries.get(&key).await {
            Ok(record) => record,
            Err(DataError::ObjectNotFound { .. }) => {
                return Err(RegistryError::RegistryNotFound {
                    kind: kind.to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();
        let collection = self.data_service.get_collection(&key).await?;
        Ok(self.open(kind, id, name, collection))
    }

    /// Opens every registry of `kind`.
    pub async fn get_all(&self, kind: RegistryKind) -> Result<Vec<Registry>, RegistryError> {
        let registries = self
            .data_service
            .ensure_collection(SYSREGISTRIES_COLLECTION)
            .await?;
        let mut result = Vec::new();
        for record in registries.get_all().await? {
            if record.get("type").and_then(Value::as_str) != Some(kind.as_str()) {
                continue;
            }
            if let Some(id) = record.get("registryId").and_then(Value::as_str) {
                result.push(self.get(kind, id).await?);
            }
        }
        Ok(result)
    }

    /// Whether the registry exists.
    pub async fn exists(&self, kind: RegistryKind, id: &str) -> Result<bool, RegistryError> {
        let registries = self
            .data_service
            .ensure_collection(SYSREGISTRIES_COLLECTION)
            .await?;
        Ok(registries.exists(&registry_key(kind, id)).await?)
    }

    /// Creates a registry.
    ///
    /// # Errors
    ///
    /// * `RegistryError::RegistryExists` - if it already exists
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        kind: RegistryKind,
        id: &str,
        name: &str,
    ) -> Result<Registry, RegistryError> {
        let key = registry_key(kind, id);
        let registries = self
            .data_service
            .ensure_collection(SYSREGISTRIES_COLLECTION)
            .await?;
        if registries.exists(&key).await? {
            return Err(RegistryError::RegistryExists {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        let collection = self.data_service.create_collection(&key).await?;
        registries
            .add(
                &key,
                json!({ "type": kind.as_str(), "registryId": id, "name": name }),
            )
            .await?;
        debug!(registry = %key, "Created registry");
        Ok(self.open(kind, id, name.to_string(), collection))
    }

    /// Creates the default registry for every registrable declared type that
    /// does not have one yet. Returns how many were created.
    pub async fn create_defaults(&self) -> Result<usize, RegistryError> {
        let mut created = 0;
        for decl in self.introspector.class_declarations() {
            let Some(kind) = decl.kind.registry_kind() else {
                continue;
            };
            let fqn = decl.fully_qualified_name();
            if !self.exists(kind, &fqn).await? {
                self.create(kind, &fqn, &format!("{kind} registry for {fqn}"))
                    .await?;
                created += 1;
            }
        }
        Ok(created)
    }

    fn open(
        &self,
        kind: RegistryKind,
        id: &str,
        name: String,
        collection: Arc<dyn Collection>,
    ) -> Registry {
        Registry {
            kind,
            id: id.to_string(),
            name,
            collection,
            serializer: Arc::clone(&self.serializer),
            access_controller: Arc::clone(&self.access_controller),
            observers: Arc::clone(&self.observers),
        }
    }
}

impl std::fmt::Debug for RegistryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryManager")
            .field("observers", &self.observers.read().len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Access-checked view of one registry's resources.
pub struct Registry {
    kind: RegistryKind,
    id: String,
    name: String,
    collection: Arc<dyn Collection>,
    serializer: Arc<Serializer>,
    access_controller: Arc<AccessController>,
    observers: Observers,
}

impl Registry {
    /// Registry kind.
    #[must_use]
    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// Registry identifier (the fully qualified type for default registries).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every resource the current participant may read.
    pub async fn get_all(&self) -> Result<Vec<Resource>, RegistryError> {
        let mut resources = Vec::new();
        for value in self.collection.get_all().await? {
            let resource = self.serializer.from_json(&value)?;
            if self
                .access_controller
                .check(&resource, Operation::Read)
                .is_ok()
            {
                resources.push(resource);
            }
        }
        Ok(resources)
    }

    /// One resource.
    pub async fn get(&self, id: &str) -> Result<Resource, RegistryError> {
        let value = self.collection.get(id).await?;
        let resource = self.serializer.from_json(&value)?;
        self.access_controller.check(&resource, Operation::Read)?;
        Ok(resource)
    }

    /// Whether a resource with `id` is stored.
    pub async fn exists(&self, id: &str) -> Result<bool, RegistryError> {
        Ok(self.collection.exists(id).await?)
    }

    /// Adds a new resource.
    pub async fn add(&self, resource: &Resource) -> Result<(), RegistryError> {
        self.access_controller.check(resource, Operation::Create)?;
        let value = self.serializer.to_json(resource)?;
        self.collection.add(&resource.identifier, value).await?;
        self.notify(RegistryAction::Add, resource);
        Ok(())
    }

    /// Replaces an existing resource.
    pub async fn update(&self, resource: &Resource) -> Result<(), RegistryError> {
        self.access_controller.check(resource, Operation::Update)?;
        let value = self.serializer.to_json(resource)?;
        self.collection.update(&resource.identifier, value).await?;
        self.notify(RegistryAction::Update, resource);
        Ok(())
    }

    /// Removes a resource. Only DELETE access is required.
    pub async fn remove(&self, id: &str) -> Result<(), RegistryError> {
        let value = self.collection.get(id).await?;
        let resource = self.serializer.from_json(&value)?;
        self.access_controller.check(&resource, Operation::Delete)?;
        self.collection.remove(id).await?;
        self.notify(RegistryAction::Remove, &resource);
        Ok(())
    }

    fn notify(&self, action: RegistryAction, resource: &Resource) {
        let observers = self.observers.read().clone();
        if observers.is_empty() {
            return;
        }
        let event = RegistryEvent {
            kind: self.kind,
            registry_id: self.id.clone(),
            action,
            resource: resource.clone(),
        };
        for observer in observers {
            observer.on_mutation(&event);
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryDataService;
    use crate::domain::network::{
        AclAction, AclRule, BusinessNetworkDefinition, ClassDeclaration, DeclarationKind,
    };
    use parking_lot::Mutex;

    fn definition(rules: Vec<AclRule>) -> BusinessNetworkDefinition {
        let decl = |name: &str, kind| ClassDeclaration {
            namespace: "org.acme".to_string(),
            name: name.to_string(),
            kind,
            identifying_field: "id".to_string(),
        };
        BusinessNetworkDefinition::new(
            "registry-test@0.0.1",
            vec![
                decl("Car", DeclarationKind::Asset),
                decl("Trader", DeclarationKind::Participant),
                decl("Sold", DeclarationKind::Event),
            ],
            Vec::new(),
            rules,
        )
    }

    fn manager(def: &BusinessNetworkDefinition) -> (RegistryManager, Arc<AccessController>) {
        let access = Arc::new(AccessController::new(Arc::clone(def.acl_manager())));
        let manager = RegistryManager::new(
            Arc::new(InMemoryDataService::new()),
            Arc::clone(def.introspector()),
            Arc::clone(def.serializer()),
            Arc::clone(&access),
        );
        (manager, access)
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(RegistryAction, String)>>);

    impl RegistryObserver for Recorder {
        fn on_mutation(&self, event: &RegistryEvent) {
            self.0
                .lock()
                .push((event.action, event.resource.fully_qualified_identifier()));
        }
    }

    #[tokio::test]
    async fn test_create_defaults_skips_events() {
        let def = definition(Vec::new());
        let (manager, _) = manager(&def);
        assert_eq!(manager.create_defaults().await.unwrap(), 2);
        assert_eq!(manager.create_defaults().await.unwrap(), 0);

        assert!(manager.exists(RegistryKind::Asset, "org.acme.Car").await.unwrap());
        assert!(!manager.exists(RegistryKind::Asset, "org.acme.Sold").await.unwrap());
        assert_eq!(manager.get_all(RegistryKind::Participant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_registry() {
        let def = definition(Vec::new());
        let (manager, _) = manager(&def);
        let err = manager
            .get(RegistryKind::Asset, "org.acme.Car")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::RegistryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resource_lifecycle_notifies_observers() {
        let def = definition(Vec::new());
        let (manager, _) = manager(&def);
        let recorder = Arc::new(Recorder::default());
        manager.subscribe(recorder.clone());

        let cars = manager
            .create(RegistryKind::Asset, "org.acme.Car", "Cars")
            .await
            .unwrap();
        let mut car = Resource::new("org.acme", "Car", "VIN-1").with_field("colour", "red");
        cars.add(&car).await.unwrap();
        car.set_field("colour", "blue");
        cars.update(&car).await.unwrap();
        assert_eq!(cars.get("VIN-1").await.unwrap(), car);
        cars.remove("VIN-1").await.unwrap();
        assert!(!cars.exists("VIN-1").await.unwrap());

        let seen = recorder.0.lock().clone();
        assert_eq!(
            seen,
            vec![
                (RegistryAction::Add, "org.acme.Car#VIN-1".to_string()),
                (RegistryAction::Update, "org.acme.Car#VIN-1".to_string()),
                (RegistryAction::Remove, "org.acme.Car#VIN-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_access_checks_apply() {
        let def = definition(vec![AclRule {
            name: "ReadOnlyCars".to_string(),
            description: String::new(),
            resource: "org.acme.Car".to_string(),
            participant: "*".to_string(),
            operations: vec![Operation::Read],
            action: AclAction::Allow,
        }]);
        let (manager, access) = manager(&def);
        let cars = manager
            .create(RegistryKind::Asset, "org.acme.Car", "Cars")
            .await
            .unwrap();
        cars.add(&Resource::new("org.acme", "Car", "VIN-1")).await.unwrap();

        access.set_participant(Resource::new("org.acme", "Trader", "alice"));
        assert!(cars.get("VIN-1").await.is_ok());
        assert_eq!(cars.get_all().await.unwrap().len(), 1);
        let err = cars
            .add(&Resource::new("org.acme", "Car", "VIN-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Access(_)));
    }

    #[tokio::test]
    async fn test_remove_requires_only_delete() {
        let def = definition(vec![AclRule {
            name: "DeleteOnlyCars".to_string(),
            description: String::new(),
            resource: "org.acme.Car".to_string(),
            participant: "*".to_string(),
            operations: vec![Operation::Delete],
            action: AclAction::Allow,
        }]);
        let (manager, access) = manager(&def);
        let cars = manager
            .create(RegistryKind::Asset, "org.acme.Car", "Cars")
            .await
            .unwrap();
        cars.add(&Resource::new("org.acme", "Car", "VIN-1")).await.unwrap();

        access.set_participant(Resource::new("org.acme", "Trader", "alice"));
        assert!(matches!(
            cars.get("VIN-1").await,
            Err(RegistryError::Access(_))
        ));
        cars.remove("VIN-1").await.unwrap();
        assert!(!cars.exists("VIN-1").await.unwrap());
    }
}
