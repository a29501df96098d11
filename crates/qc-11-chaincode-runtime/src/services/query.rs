//! # Queries
//!
//! Equality queries over one registry, optionally resolving relationships of
//! each match.

use crate::domain::value_objects::RegistryKind;
use crate::errors::RegistryError;
use crate::services::resolver::{ResolvedResource, Resolver};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A query over the resources of one registry.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    kind: RegistryKind,
    registry_id: String,
    conditions: Vec<(String, Value)>,
    resolve: bool,
}

impl Query {
    /// Selects every resource in a registry.
    #[must_use]
    pub fn select(kind: RegistryKind, registry_id: impl Into<String>) -> Self {
        Self {
            kind,
            registry_id: registry_id.into(),
            conditions: Vec::new(),
            resolve: false,
        }
    }

    /// Restricts results to resources whose `field` equals `value`. The
    /// identifier is matched through the field name `$identifier`.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Resolves relationships of each result.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        self.resolve = true;
        self
    }
}

/// Runs [`Query`]s against the registries of one context.
#[derive(Debug)]
pub struct QueryExecutor {
    resolver: Arc<Resolver>,
}

impl QueryExecutor {
    /// Creates a query executor.
    #[must_use]
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }

    /// Runs `query`. Results are in registry key order and only include
    /// resources the current participant may read.
    pub async fn execute(&self, query: &Query) -> Result<Vec<ResolvedResource>, RegistryError> {
        let registry = self
            .resolver
            .registry_manager()
            .get(query.kind, &query.registry_id)
            .await?;

        let mut results = Vec::new();
        for resource in registry.get_all().await? {
            let matches = query.conditions.iter().all(|(field, expected)| {
                if field == "$identifier" {
                    expected.as_str() == Some(resource.identifier.as_str())
                } else {
                    resource.field(field) == Some(expected)
                }
            });
            if !matches {
                continue;
            }
            let resolved = if query.resolve {
                self.resolver.resolve(&resource).await?
            } else {
                ResolvedResource {
                    resource,
                    relationships: BTreeMap::new(),
                }
            };
            results.push(resolved);
        }

        debug!(
            registry = %query.registry_id,
            conditions = query.conditions.len(),
            results = results.len(),
            "Query executed"
        );
        Ok(results)
    }
}
