//! # Resolver
//!
//! Follows relationship fields (`resource:ns.Type#id`) to the resources they
//! point at. Resolution is one level deep; resolved resources keep their own
//! relationships as references.

use crate::domain::entities::{Relationship, Resource};
use crate::domain::network::Introspector;
use crate::errors::{ModelError, RegistryError};
use crate::services::registry::RegistryManager;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A resource together with the targets of its relationship fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedResource {
    /// The resource as stored.
    pub resource: Resource,
    /// Field name to resolved target.
    pub relationships: BTreeMap<String, Resource>,
}

/// Relationship resolution for one context.
#[derive(Debug)]
pub struct Resolver {
    introspector: Arc<Introspector>,
    registry_manager: Arc<RegistryManager>,
}

impl Resolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(introspector: Arc<Introspector>, registry_manager: Arc<RegistryManager>) -> Self {
        Self {
            introspector,
            registry_manager,
        }
    }

    /// Registry manager used for lookups.
    #[must_use]
    pub fn registry_manager(&self) -> &Arc<RegistryManager> {
        &self.registry_manager
    }

    /// Resolves every relationship field of `resource`.
    pub async fn resolve(&self, resource: &Resource) -> Result<ResolvedResource, RegistryError> {
        let mut relationships = BTreeMap::new();
        for (field, value) in &resource.data {
            let Some(relationship) = value.as_str().and_then(Relationship::parse) else {
                continue;
            };
            let target = self.resolve_relationship(&relationship).await?;
            relationships.insert(field.clone(), target);
        }
        Ok(ResolvedResource {
            resource: resource.clone(),
            relationships,
        })
    }

    /// Fetches the target of one relationship from its default registry.
    pub async fn resolve_relationship(
        &self,
        relationship: &Relationship,
    ) -> Result<Resource, RegistryError> {
        let fqt = relationship.fully_qualified_type();
        let decl = self.introspector.class_declaration(&fqt)?;
        let kind = decl
            .kind
            .registry_kind()
            .ok_or_else(|| ModelError::NotRegistrable(fqt.clone()))?;
        let registry = self.registry_manager.get(kind, &fqt).await?;
        registry.get(&relationship.identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryDataService;
    use crate::domain::network::{BusinessNetworkDefinition, ClassDeclaration, DeclarationKind};
    use crate::domain::value_objects::RegistryKind;
    use crate::services::access::AccessController;

    fn setup() -> (Resolver, Arc<RegistryManager>) {
        let decl = |name: &str, kind| ClassDeclaration {
            namespace: "org.acme".to_string(),
            name: name.to_string(),
            kind,
            identifying_field: "id".to_string(),
        };
        let def = BusinessNetworkDefinition::new(
            "resolver-test@0.0.1",
            vec![
                decl("Car", DeclarationKind::Asset),
                decl("Trader", DeclarationKind::Participant),
                decl("Sold", DeclarationKind::Event),
            ],
            Vec::new(),
            Vec::new(),
        );
        let manager = Arc::new(RegistryManager::new(
            Arc::new(InMemoryDataService::new()),
            Arc::clone(def.introspector()),
            Arc::clone(def.serializer()),
            Arc::new(AccessController::new(Arc::clone(def.acl_manager()))),
        ));
        (
            Resolver::new(Arc::clone(def.introspector()), Arc::clone(&manager)),
            manager,
        )
    }

    #[tokio::test]
    async fn test_resolves_relationship_fields() {
        let (resolver, manager) = setup();
        manager.create_defaults().await.unwrap();
        let alice = Resource::new("org.acme", "Trader", "alice").with_field("name", "Alice");
        manager
            .get(RegistryKind::Participant, "org.acme.Trader")
            .await
            .unwrap()
            .add(&alice)
            .await
            .unwrap();

        let car = Resource::new("org.acme", "Car", "VIN-1")
            .with_field("owner", alice.to_relationship())
            .with_field("colour", "red");
        let resolved = resolver.resolve(&car).await.unwrap();

        assert_eq!(resolved.resource, car);
        assert_eq!(resolved.relationships.len(), 1);
        assert_eq!(resolved.relationships["owner"], alice);
        assert!(!resolved.relationships.contains_key("colour"));
    }

    #[tokio::test]
    async fn test_event_relationships_are_rejected() {
        let (resolver, _) = setup();
        let rel = Relationship::parse("resource:org.acme.Sold#1").unwrap();
        let err = resolver.resolve_relationship(&rel).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Model(ModelError::NotRegistrable(_))
        ));
    }
}
