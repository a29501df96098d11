//! # Context Bootstrap Integration Tests
//!
//! Drives full contexts against in-memory host services:
//!
//! 1. Host deploys a business network (system record in `$sysdata`)
//! 2. An admin context provisions registries, a participant and an identity mapping
//! 3. Per-transaction contexts bootstrap, share the definition cache, and
//!    dispatch transactions to executors

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qc_11_chaincode_runtime::prelude::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn declaration(name: &str, kind: DeclarationKind, identifying_field: &str) -> ClassDeclaration {
    ClassDeclaration {
        namespace: "org.acme".to_string(),
        name: name.to_string(),
        kind,
        identifying_field: identifying_field.to_string(),
    }
}

fn trade_network(identifier: &str) -> ArchiveManifest {
    ArchiveManifest {
        identifier: identifier.to_string(),
        models: vec![
            declaration("Trader", DeclarationKind::Participant, "traderId"),
            declaration("Car", DeclarationKind::Asset, "vin"),
            declaration("Trade", DeclarationKind::Transaction, "transactionId"),
            declaration("Mint", DeclarationKind::Transaction, "transactionId"),
            declaration("Audit", DeclarationKind::Transaction, "transactionId"),
        ],
        scripts: vec![Script {
            identifier: "lib/logic.js".to_string(),
            language: "JS".to_string(),
            contents: "function onTrade(tx) {}\nfunction notifyTrade(tx) {}".to_string(),
            functions: vec![
                ProcessorFunction {
                    name: "onTrade".to_string(),
                    transaction_type: "org.acme.Trade".to_string(),
                },
                ProcessorFunction {
                    name: "notifyTrade".to_string(),
                    transaction_type: "org.acme.Trade".to_string(),
                },
            ],
        }],
        acls: Vec::new(),
    }
}

/// A deployed network plus the host services shared by its contexts.
struct Deployment {
    data: Arc<InMemoryDataService>,
    loader: Arc<JsonArchiveLoader>,
    cache: Arc<DefinitionCache>,
}

impl Deployment {
    fn new(manifest: &ArchiveManifest) -> Self {
        init_tracing();
        let data = Arc::new(InMemoryDataService::new());
        data.deploy(&manifest.to_archive().unwrap());
        Self {
            data,
            loader: Arc::new(JsonArchiveLoader::new()),
            cache: Arc::new(DefinitionCache::new()),
        }
    }

    fn context_with(&self, identity: StaticIdentityService, config: ContextConfig) -> Context {
        let host = HostBindings::builder()
            .data_service(self.data.clone())
            .identity_service(Arc::new(identity))
            .archive_loader(self.loader.clone())
            .build()
            .unwrap();
        Context::with_config(Arc::new(host), Arc::clone(&self.cache), config)
    }

    fn context(&self, identity: StaticIdentityService) -> Context {
        self.context_with(identity, ContextConfig::default())
    }

    /// Creates the default registries, a trader `alice`, and maps
    /// `alice@org1` to her.
    async fn provision(&self) -> Resource {
        let mut admin = self.context(StaticIdentityService::anonymous());
        admin.initialize().await.unwrap();

        let registries = admin.registry_manager().unwrap();
        registries.create_defaults().await.unwrap();
        let alice = Resource::new("org.acme", "Trader", "alice").with_field("firstName", "Alice");
        registries
            .get(RegistryKind::Participant, "org.acme.Trader")
            .await
            .unwrap()
            .add(&alice)
            .await
            .unwrap();
        admin
            .identity_manager()
            .unwrap()
            .add_identity_mapping(&alice, &UserId::from("alice@org1"))
            .await
            .unwrap();
        alice
    }
}

/// Claims `org.acme.Mint` transactions and adds a car owned by the
/// submitting participant.
struct MintExecutor;

#[async_trait]
impl TransactionExecutor for MintExecutor {
    fn kind(&self) -> &str {
        "NATIVE"
    }

    async fn execute(
        &self,
        context: &Context,
        transaction: &Resource,
    ) -> Result<ExecutionOutcome, ContextError> {
        if transaction.fully_qualified_type() != "org.acme.Mint" {
            return Ok(ExecutionOutcome::Declined);
        }
        let api = context.api()?;
        let Some(vin) = transaction.field("vin").and_then(Value::as_str) else {
            return Err(ExecutorError::Failed {
                kind: "NATIVE".to_string(),
                reason: "mint transaction has no vin".to_string(),
            }
            .into());
        };
        let mut car = api.factory().new_resource("org.acme", "Car", vin)?;
        if let Some(owner) = api.current_participant() {
            car.set_field("owner", owner.to_relationship());
        }
        api.asset_registry("org.acme.Car").await?.add(&car).await?;
        Ok(ExecutionOutcome::Claimed {
            executor: "NATIVE".to_string(),
            invoked: vec!["mint".to_string()],
        })
    }
}

/// Declares its kind but never claims anything.
struct Passive(&'static str);

#[async_trait]
impl TransactionExecutor for Passive {
    fn kind(&self) -> &str {
        self.0
    }

    async fn execute(
        &self,
        _context: &Context,
        _transaction: &Resource,
    ) -> Result<ExecutionOutcome, ContextError> {
        Ok(ExecutionOutcome::Declined)
    }
}

/// Parses nothing; sleeps past any reasonable bootstrap timeout.
struct StalledLoader;

#[async_trait]
impl ArchiveLoader for StalledLoader {
    async fn from_archive(
        &self,
        _archive: &[u8],
    ) -> Result<BusinessNetworkDefinition, ArchiveError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ArchiveError::InvalidArchive("unreachable".to_string()))
    }
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

#[tokio::test]
async fn test_bootstrap_binds_mapped_participant() {
    // Arrange
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let alice = deployment.provision().await;

    // Act
    let mut context = deployment.context(StaticIdentityService::for_user("alice@org1"));
    context.initialize().await.unwrap();

    // Assert
    assert_eq!(context.state(), ContextState::Ready);
    assert_eq!(context.participant(), Some(&alice));
    assert_eq!(
        context.access_controller().unwrap().participant(),
        Some(alice.clone())
    );
    assert_eq!(
        context.api().unwrap().current_participant(),
        Some(&alice)
    );
    let kinds: Vec<_> = context
        .transaction_executors()
        .iter()
        .map(|e| e.kind().to_string())
        .collect();
    assert_eq!(kinds, vec![SCRIPT_EXECUTOR_KIND.to_string()]);
    assert_eq!(
        context.business_network_definition().unwrap().identifier(),
        "trade-network@0.1.0"
    );
}

#[tokio::test]
async fn test_anonymous_context_has_no_participant() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let mut context = deployment.context(StaticIdentityService::anonymous());
    context.initialize().await.unwrap();

    assert_eq!(context.state(), ContextState::Ready);
    assert!(context.participant().is_none());
    assert!(context.api().unwrap().current_participant().is_none());
}

#[tokio::test]
async fn test_empty_identity_is_treated_as_anonymous() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    deployment.provision().await;
    let mut context = deployment.context(StaticIdentityService::for_user(""));

    context.initialize().await.unwrap();

    assert_eq!(context.state(), ContextState::Ready);
    assert!(context.participant().is_none());
}

#[tokio::test]
async fn test_anonymous_context_rejected_when_disabled() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let config = ContextConfig {
        allow_anonymous: false,
        ..ContextConfig::default()
    };
    let mut context = deployment.context_with(StaticIdentityService::anonymous(), config);

    let err = context.initialize().await.unwrap_err();
    assert!(matches!(err, ContextError::IdentityRequired));
    assert_eq!(context.state(), ContextState::Failed);
}

#[tokio::test]
async fn test_unmapped_identity_fails_with_sanitized_error() {
    // Arrange
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    deployment.provision().await;

    // Act
    let mut context = deployment.context(StaticIdentityService::for_user("mallory@org2"));
    let err = context.initialize().await.unwrap_err();

    // Assert
    match &err {
        ContextError::IdentityResolution { user_id } => assert_eq!(user_id, "mallory@org2"),
        other => panic!("expected identity resolution error, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("may have been revoked"));
    assert!(!message.contains("$sysidentities"));
    assert!(!message.contains("not mapped"));

    assert_eq!(context.state(), ContextState::Failed);
    assert!(matches!(
        context.model_manager(),
        Err(ContextError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_bootstrap_timeout_leaves_context_failed() {
    init_tracing();
    let data = Arc::new(InMemoryDataService::new());
    data.deploy(&trade_network("slow@0.1.0").to_archive().unwrap());
    let host = HostBindings::builder()
        .data_service(data)
        .identity_service(Arc::new(StaticIdentityService::anonymous()))
        .archive_loader(Arc::new(StalledLoader))
        .build()
        .unwrap();
    let config = ContextConfig {
        bootstrap_timeout_ms: 50,
        ..ContextConfig::default()
    };
    let cache = Arc::new(DefinitionCache::new());
    let mut context = Context::with_config(Arc::new(host), Arc::clone(&cache), config);

    let err = context.initialize().await.unwrap_err();

    assert!(matches!(err, ContextError::BootstrapTimeout { timeout_ms: 50 }));
    assert!(err.is_retryable());
    assert_eq!(context.state(), ContextState::Failed);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_unavailable_data_service_is_retryable() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    deployment.data.set_available(false);

    let mut context = deployment.context(StaticIdentityService::anonymous());
    let err = context.initialize().await.unwrap_err();

    assert!(matches!(err, ContextError::Data(DataError::Unavailable(_))));
    assert!(err.is_retryable());
    assert_eq!(context.state(), ContextState::Failed);
}

#[tokio::test]
async fn test_corrupt_system_record() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    deployment.data.insert_object(
        "$sysdata",
        "businessnetwork",
        serde_json::json!({ "hash": "abc", "data": "not base64!" }),
    );

    let mut context = deployment.context(StaticIdentityService::anonymous());
    let err = context.initialize().await.unwrap_err();

    assert!(matches!(
        err,
        ContextError::Archive(ArchiveError::InvalidEncoding(_))
    ));
    assert!(!err.is_retryable());
}

// =============================================================================
// DEFINITION CACHE
// =============================================================================

#[tokio::test]
async fn test_contexts_share_cached_definition() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));

    let mut first = deployment.context(StaticIdentityService::anonymous());
    first.initialize().await.unwrap();
    let mut second = deployment.context(StaticIdentityService::anonymous());
    second.initialize().await.unwrap();

    assert_eq!(deployment.loader.loads(), 1);
    assert_eq!(deployment.cache.len(), 1);
    assert!(Arc::ptr_eq(
        &first.business_network_definition().unwrap(),
        &second.business_network_definition().unwrap()
    ));

    // Services are per context even though the definition is shared.
    assert!(!Arc::ptr_eq(
        &first.registry_manager().unwrap(),
        &second.registry_manager().unwrap()
    ));
}

#[tokio::test]
async fn test_upgrade_parses_new_archive() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let mut before = deployment.context(StaticIdentityService::anonymous());
    before.initialize().await.unwrap();

    deployment
        .data
        .deploy(&trade_network("trade-network@0.2.0").to_archive().unwrap());
    let mut after = deployment.context(StaticIdentityService::anonymous());
    after.initialize().await.unwrap();

    assert_eq!(deployment.loader.loads(), 2);
    assert_eq!(deployment.cache.len(), 2);
    assert_eq!(
        after.business_network_definition().unwrap().identifier(),
        "trade-network@0.2.0"
    );
}

#[tokio::test]
async fn test_concurrent_contexts_share_cache() {
    let deployment = Arc::new(Deployment::new(&trade_network("trade-network@0.1.0")));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let deployment = Arc::clone(&deployment);
        handles.push(tokio::spawn(async move {
            let mut context = deployment.context(StaticIdentityService::anonymous());
            context.initialize().await.map(|()| context.state())
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), ContextState::Ready);
    }

    // Racing misses may parse more than once, but the cache holds one entry.
    assert!(deployment.loader.loads() >= 1);
    assert_eq!(deployment.cache.len(), 1);
}

// =============================================================================
// EXECUTORS
// =============================================================================

#[tokio::test]
async fn test_script_executor_claims_declared_transactions() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    deployment.provision().await;
    let mut context = deployment.context(StaticIdentityService::for_user("alice@org1"));
    context.initialize().await.unwrap();

    let trade = context
        .factory()
        .unwrap()
        .new_transaction("org.acme", "Trade")
        .unwrap();
    let outcome = context.execute_transaction(trade.clone()).await.unwrap();

    assert_eq!(
        outcome,
        ExecutionOutcome::Claimed {
            executor: "JS".to_string(),
            invoked: vec!["onTrade".to_string(), "notifyTrade".to_string()],
        }
    );
    assert_eq!(context.transaction(), Some(&trade));
    assert!(context.transaction_logger().unwrap().entries().is_empty());
}

#[tokio::test]
async fn test_fallthrough_executor_mutations_are_logged() {
    // Arrange
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let alice = deployment.provision().await;
    let mut context = deployment.context(StaticIdentityService::for_user("alice@org1"));
    context.initialize().await.unwrap();
    context.add_transaction_executor(Arc::new(MintExecutor));

    // Act
    let mint = context
        .factory()
        .unwrap()
        .new_transaction("org.acme", "Mint")
        .unwrap()
        .with_field("vin", "VIN-42");
    let outcome = context.execute_transaction(mint).await.unwrap();

    // Assert
    assert!(matches!(
        outcome,
        ExecutionOutcome::Claimed { ref executor, .. } if executor == "NATIVE"
    ));
    let entries = context.transaction_logger().unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "add");
    assert_eq!(entries[0].registry_id, "org.acme.Car");
    assert_eq!(entries[0].resource_id, "VIN-42");
    assert_eq!(entries[0].payload["owner"], alice.to_relationship());

    // The car is visible through a resolving query.
    let query = Query::select(RegistryKind::Asset, "org.acme.Car").resolved();
    let results = context.query_executor().unwrap().execute(&query).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].relationships["owner"], alice);
}

#[tokio::test]
async fn test_executor_failure_propagates() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let mut context = deployment.context(StaticIdentityService::anonymous());
    context.initialize().await.unwrap();
    context.add_transaction_executor(Arc::new(MintExecutor));

    let mint = context
        .factory()
        .unwrap()
        .new_transaction("org.acme", "Mint")
        .unwrap();
    let err = context.execute_transaction(mint).await.unwrap_err();

    assert!(matches!(
        err,
        ContextError::Executor(ExecutorError::Failed { ref kind, .. }) if kind == "NATIVE"
    ));
}

#[tokio::test]
async fn test_unclaimed_transaction() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let mut context = deployment.context(StaticIdentityService::anonymous());
    context.initialize().await.unwrap();

    let audit = context
        .factory()
        .unwrap()
        .new_transaction("org.acme", "Audit")
        .unwrap();
    let expected = audit.fully_qualified_identifier();
    let err = context.execute_transaction(audit).await.unwrap_err();

    match err {
        ContextError::NoExecutor { transaction } => assert_eq!(transaction, expected),
        other => panic!("expected NoExecutor, got {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_before_initialize() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let context = deployment.context(StaticIdentityService::anonymous());
    let err = context
        .execute_transaction(Resource::new("org.acme", "Trade", "tx-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::Configuration(_)));
}

#[tokio::test]
async fn test_replacing_executor_keeps_position() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let mut context = deployment.context(StaticIdentityService::anonymous());
    context.initialize().await.unwrap();

    context.add_transaction_executor(Arc::new(Passive("WASM")));
    let replaced = context.add_transaction_executor(Arc::new(Passive("JS")));
    assert!(replaced.is_some());

    let kinds: Vec<_> = context
        .transaction_executors()
        .iter()
        .map(|e| e.kind().to_string())
        .collect();
    assert_eq!(kinds, vec!["JS".to_string(), "WASM".to_string()]);

    // The passive replacement no longer claims script transactions.
    let trade = context
        .factory()
        .unwrap()
        .new_transaction("org.acme", "Trade")
        .unwrap();
    assert!(matches!(
        context.execute_transaction(trade).await,
        Err(ContextError::NoExecutor { .. })
    ));
}

// =============================================================================
// SERIALIZATION
// =============================================================================

#[tokio::test]
async fn test_context_serializes_to_empty_object() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    deployment.provision().await;
    let mut context = deployment.context(StaticIdentityService::for_user("alice@org1"));
    context.initialize().await.unwrap();

    assert_eq!(serde_json::to_value(&context).unwrap(), serde_json::json!({}));

    context
        .bind_transaction(Resource::new("org.acme", "Mint", "tx-serialize"))
        .unwrap();
    assert!(context.transaction_logger().is_some());
    assert_eq!(serde_json::to_value(&context).unwrap(), serde_json::json!({}));
}

#[tokio::test]
async fn test_unready_contexts_serialize_to_empty_object() {
    let deployment = Deployment::new(&trade_network("trade-network@0.1.0"));
    let created = deployment.context(StaticIdentityService::anonymous());
    assert_eq!(created.state(), ContextState::Created);
    assert_eq!(serde_json::to_value(&created).unwrap(), serde_json::json!({}));

    let mut failed = deployment.context(StaticIdentityService::for_user("nobody@org9"));
    assert!(failed.initialize().await.is_err());
    assert_eq!(failed.state(), ContextState::Failed);
    assert_eq!(serde_json::to_value(&failed).unwrap(), serde_json::json!({}));
}
