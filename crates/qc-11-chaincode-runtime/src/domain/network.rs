//! # Business Network Definition
//!
//! The immutable bundle a deployed network is parsed into: model, scripts,
//! ACL rules, and the factory / serializer / introspector derived from the
//! model. Definitions are shared read-only between contexts through the
//! definition cache, so every component sits behind an `Arc`.

use crate::domain::entities::Resource;
use crate::domain::value_objects::{Operation, RegistryKind};
use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Field name carrying the fully qualified type in serialized resources.
pub const CLASS_FIELD: &str = "$class";

fn default_identifying_field() -> String {
    "id".to_string()
}

// =============================================================================
// MODEL
// =============================================================================

/// What a declared type models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    /// Asset type.
    Asset,
    /// Participant type.
    Participant,
    /// Transaction type.
    Transaction,
    /// Event type (never stored in a registry).
    Event,
}

impl DeclarationKind {
    /// Registry kind resources of this declaration live in.
    #[must_use]
    pub const fn registry_kind(self) -> Option<RegistryKind> {
        match self {
            Self::Asset => Some(RegistryKind::Asset),
            Self::Participant => Some(RegistryKind::Participant),
            Self::Transaction => Some(RegistryKind::Transaction),
            Self::Event => None,
        }
    }
}

/// A declared type in the business network model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDeclaration {
    /// Namespace, e.g. `org.acme`.
    pub namespace: String,
    /// Short name, e.g. `Car`.
    pub name: String,
    /// What the type models.
    pub kind: DeclarationKind,
    /// Field holding the instance identifier.
    #[serde(default = "default_identifying_field")]
    pub identifying_field: String,
}

impl ClassDeclaration {
    /// `namespace.Name`
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Holds every type declared by the network.
#[derive(Debug, Default)]
pub struct ModelManager {
    declarations: Vec<ClassDeclaration>,
}

impl ModelManager {
    /// Creates a model manager over `declarations`.
    #[must_use]
    pub fn new(declarations: Vec<ClassDeclaration>) -> Self {
        Self { declarations }
    }

    /// All declarations in declaration order.
    #[must_use]
    pub fn declarations(&self) -> &[ClassDeclaration] {
        &self.declarations
    }

    /// Looks up a declaration by fully qualified name.
    #[must_use]
    pub fn get_type(&self, fqn: &str) -> Option<&ClassDeclaration> {
        let (namespace, name) = fqn.rsplit_once('.')?;
        self.declarations
            .iter()
            .find(|decl| decl.namespace == namespace && decl.name == name)
    }

    fn require_type(&self, fqn: &str) -> Result<&ClassDeclaration, ModelError> {
        self.get_type(fqn)
            .ok_or_else(|| ModelError::UnknownType(fqn.to_string()))
    }
}

/// Read-only view of the model for runtime services.
#[derive(Debug)]
pub struct Introspector {
    model_manager: Arc<ModelManager>,
}

impl Introspector {
    /// Creates an introspector over `model_manager`.
    #[must_use]
    pub fn new(model_manager: Arc<ModelManager>) -> Self {
        Self { model_manager }
    }

    /// All declarations.
    #[must_use]
    pub fn class_declarations(&self) -> &[ClassDeclaration] {
        self.model_manager.declarations()
    }

    /// Looks up one declaration.
    pub fn class_declaration(&self, fqn: &str) -> Result<&ClassDeclaration, ModelError> {
        self.model_manager.require_type(fqn)
    }
}

/// Creates resources of declared types.
#[derive(Debug)]
pub struct Factory {
    model_manager: Arc<ModelManager>,
}

impl Factory {
    /// Creates a factory over `model_manager`.
    #[must_use]
    pub fn new(model_manager: Arc<ModelManager>) -> Self {
        Self { model_manager }
    }

    /// Creates a resource after checking the type is declared.
    pub fn new_resource(
        &self,
        namespace: &str,
        type_name: &str,
        identifier: &str,
    ) -> Result<Resource, ModelError> {
        self.model_manager
            .require_type(&format!("{namespace}.{type_name}"))?;
        Ok(Resource::new(namespace, type_name, identifier))
    }

    /// Creates a transaction with a freshly generated identifier.
    pub fn new_transaction(&self, namespace: &str, type_name: &str) -> Result<Resource, ModelError> {
        let fqn = format!("{namespace}.{type_name}");
        let decl = self.model_manager.require_type(&fqn)?;
        if decl.kind != DeclarationKind::Transaction {
            return Err(ModelError::InvalidResource(format!(
                "'{fqn}' is not a transaction type"
            )));
        }
        Ok(Resource::new(namespace, type_name, Uuid::new_v4().to_string()))
    }
}

/// Converts resources to and from their stored JSON form.
///
/// The stored form is a flat object: `$class`, the identifying field, then
/// the data fields.
#[derive(Debug)]
pub struct Serializer {
    model_manager: Arc<ModelManager>,
}

impl Serializer {
    /// Creates a serializer over `model_manager`.
    #[must_use]
    pub fn new(model_manager: Arc<ModelManager>) -> Self {
        Self { model_manager }
    }

    /// Serializes a resource of a declared type.
    pub fn to_json(&self, resource: &Resource) -> Result<Value, ModelError> {
        let fqt = resource.fully_qualified_type();
        let decl = self.model_manager.require_type(&fqt)?;
        let mut object = Map::with_capacity(resource.data.len() + 2);
        object.insert(CLASS_FIELD.to_string(), Value::String(fqt));
        object.insert(
            decl.identifying_field.clone(),
            Value::String(resource.identifier.clone()),
        );
        for (name, value) in &resource.data {
            if name != CLASS_FIELD && name != &decl.identifying_field {
                object.insert(name.clone(), value.clone());
            }
        }
        Ok(Value::Object(object))
    }

    /// Deserializes a stored resource.
    pub fn from_json(&self, value: &Value) -> Result<Resource, ModelError> {
        let object = value
            .as_object()
            .ok_or_else(|| ModelError::InvalidResource("expected a JSON object".to_string()))?;
        let fqt = object
            .get(CLASS_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::MissingField(CLASS_FIELD.to_string()))?;
        let decl = self.model_manager.require_type(fqt)?;
        let identifier = object
            .get(&decl.identifying_field)
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::MissingField(decl.identifying_field.clone()))?;

        let mut resource = Resource::new(&decl.namespace, &decl.name, identifier);
        for (name, value) in object {
            if name != CLASS_FIELD && name != &decl.identifying_field {
                resource.data.insert(name.clone(), value.clone());
            }
        }
        Ok(resource)
    }
}

// =============================================================================
// SCRIPTS
// =============================================================================

fn default_language() -> String {
    "JS".to_string()
}

/// A transaction processor function declared by a script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorFunction {
    /// Function name.
    pub name: String,
    /// Fully qualified transaction type it handles.
    pub transaction_type: String,
}

/// A script packaged with the business network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Script identifier (usually its archive path).
    pub identifier: String,
    /// Language, matched against executor kinds.
    #[serde(default = "default_language")]
    pub language: String,
    /// Source text.
    #[serde(default)]
    pub contents: String,
    /// Declared processor functions.
    #[serde(default)]
    pub functions: Vec<ProcessorFunction>,
}

/// Holds the scripts of the business network.
#[derive(Debug, Default)]
pub struct ScriptManager {
    scripts: Vec<Script>,
}

impl ScriptManager {
    /// Creates a script manager over `scripts`.
    #[must_use]
    pub fn new(scripts: Vec<Script>) -> Self {
        Self { scripts }
    }

    /// All scripts.
    #[must_use]
    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    /// Processor functions in `language` that handle `transaction_type`,
    /// in script order.
    #[must_use]
    pub fn processors_for(&self, language: &str, transaction_type: &str) -> Vec<&ProcessorFunction> {
        self.scripts
            .iter()
            .filter(|script| script.language == language)
            .flat_map(|script| script.functions.iter())
            .filter(|function| function.transaction_type == transaction_type)
            .collect()
    }
}

// =============================================================================
// ACL
// =============================================================================

/// Effect of a matching ACL rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AclAction {
    /// Grant access.
    Allow,
    /// Refuse access.
    Deny,
}

/// A structured access-control rule.
///
/// Selectors are `*`, a namespace wildcard `org.acme.*`, or a fully
/// qualified type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRule {
    /// Rule name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Resource type selector.
    pub resource: String,
    /// Participant type selector.
    pub participant: String,
    /// Operations the rule covers.
    pub operations: Vec<Operation>,
    /// Effect when the rule matches.
    pub action: AclAction,
}

impl AclRule {
    /// Whether the rule applies to this request.
    #[must_use]
    pub fn matches(&self, resource_type: &str, participant_type: &str, operation: Operation) -> bool {
        self.operations.contains(&operation)
            && selector_matches(&self.resource, resource_type)
            && selector_matches(&self.participant, participant_type)
    }
}

fn selector_matches(selector: &str, fqt: &str) -> bool {
    if selector == "*" || selector == fqt {
        return true;
    }
    match (selector.strip_suffix(".*"), fqt.rsplit_once('.')) {
        (Some(namespace), Some((fqt_namespace, _))) => namespace == fqt_namespace,
        _ => false,
    }
}

/// Holds the ACL rules of the business network, in evaluation order.
#[derive(Debug, Default)]
pub struct AclManager {
    rules: Vec<AclRule>,
}

impl AclManager {
    /// Creates an ACL manager over `rules`.
    #[must_use]
    pub fn new(rules: Vec<AclRule>) -> Self {
        Self { rules }
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[AclRule] {
        &self.rules
    }

    /// True when the network declares no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// DEFINITION
// =============================================================================

/// A parsed, immutable business network.
#[derive(Debug)]
pub struct BusinessNetworkDefinition {
    identifier: String,
    model_manager: Arc<ModelManager>,
    script_manager: Arc<ScriptManager>,
    acl_manager: Arc<AclManager>,
    factory: Arc<Factory>,
    serializer: Arc<Serializer>,
    introspector: Arc<Introspector>,
}

impl BusinessNetworkDefinition {
    /// Assembles a definition and derives its factory, serializer and
    /// introspector from the model.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        declarations: Vec<ClassDeclaration>,
        scripts: Vec<Script>,
        rules: Vec<AclRule>,
    ) -> Self {
        let model_manager = Arc::new(ModelManager::new(declarations));
        Self {
            identifier: identifier.into(),
            factory: Arc::new(Factory::new(Arc::clone(&model_manager))),
            serializer: Arc::new(Serializer::new(Arc::clone(&model_manager))),
            introspector: Arc::new(Introspector::new(Arc::clone(&model_manager))),
            script_manager: Arc::new(ScriptManager::new(scripts)),
            acl_manager: Arc::new(AclManager::new(rules)),
            model_manager,
        }
    }

    /// Network identifier, e.g. `my-network@0.1.0`.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Model manager.
    #[must_use]
    pub fn model_manager(&self) -> &Arc<ModelManager> {
        &self.model_manager
    }

    /// Script manager.
    #[must_use]
    pub fn script_manager(&self) -> &Arc<ScriptManager> {
        &self.script_manager
    }

    /// ACL manager.
    #[must_use]
    pub fn acl_manager(&self) -> &Arc<AclManager> {
        &self.acl_manager
    }

    /// Factory.
    #[must_use]
    pub fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    /// Serializer.
    #[must_use]
    pub fn serializer(&self) -> &Arc<Serializer> {
        &self.serializer
    }

    /// Introspector.
    #[must_use]
    pub fn introspector(&self) -> &Arc<Introspector> {
        &self.introspector
    }
}

// =============================================================================
// TESTS
// =============================================================================
