//! Transaction service - the choke point for the transactions tables
//!
//! Every CREATE/READ/UPDATE/DELETE/QUERY against the universal transactions
//! pair flows through here. The service applies cache policy consistently
//! (cache reads, invalidate coarsely after writes) and wraps every result
//! in a uniform envelope with timing metadata. Failures travel through the
//! envelope's `error` field; an `Err` return is reserved for programming
//! errors (batch over the configured ceiling).
//!
//! The service is explicitly constructed with injected gateway and cache.
//! Running one instance per process is a composition-root decision, not a
//! property of the type.

pub mod batch;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{keys, QueryCache};
use crate::config::{ConfigPatch, TransactionServiceConfig};
use crate::contracts::{SmartCode, Transaction, TransactionLine, DEFAULT_TRANSACTION_STATUS};
use crate::gateway::{CrudAction, CrudOptions, CrudRequest, TransactionGateway};
use crate::types::AUTH_CONTEXT_ERROR;

pub use batch::{BatchOperation, BatchOutcome};

/// Default page size for QUERY when the caller does not set one
pub const DEFAULT_QUERY_LIMIT: u32 = 50;

/// Explicit organization + actor pair required by every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorScope {
    pub organization_id: String,
    pub actor_user_id: String,
}

impl ActorScope {
    pub fn new(organization_id: impl Into<String>, actor_user_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            actor_user_id: actor_user_id.into(),
        }
    }

    /// Whether both halves of the scope are present
    pub fn is_complete(&self) -> bool {
        !self.organization_id.trim().is_empty() && !self.actor_user_id.trim().is_empty()
    }
}

/// Per-response metadata: who, where, what, when, how long
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub actor_user_id: String,
    pub organization_id: String,
    /// Operation tag (CREATE, QUERY, QUERY_CACHED, READ, READ_CACHED, ...)
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: f64,
}

/// Uniform response envelope for every service operation
///
/// Callers branch on `success`; `error` is the normal failure channel and
/// carries gateway messages verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T, metadata: ResponseMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Some(metadata),
        }
    }

    pub fn fail(error: impl Into<String>, metadata: ResponseMetadata) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: Some(metadata),
        }
    }
}

/// Draft of a new transaction
///
/// `transaction_date` defaults to now and `transaction_status` to ACTIVE
/// when omitted; lines default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub transaction_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<SmartCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_entity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_entity_id: Option<Uuid>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_context: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub lines: Vec<TransactionLine>,
}

/// Patch applied to an existing transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransactionRequest {
    pub transaction_id: Uuid,
    /// Partial transaction record; fields absent here stay untouched
    pub patch: serde_json::Value,
    /// Replacement lines, forwarded as-is when present
    #[serde(default)]
    pub lines: Vec<TransactionLine>,
}

/// Result payload of a successful create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReceipt {
    pub transaction_id: Uuid,
    pub lines_created: usize,
}

/// Result payload of a successful delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// Filters for QUERY, opaque extras allowed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_entity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_entity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Deployment-specific filters, forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-call create options
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub idempotency_key: Option<String>,
}

/// Per-call query options
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Serve from cache within the staleness window (default true)
    pub use_cache: bool,
    /// Override the configured include_lines default
    pub include_lines: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            include_lines: None,
            limit: None,
            offset: None,
        }
    }
}

/// Per-call read options
#[derive(Debug, Clone)]
pub struct GetOptions {
    pub use_cache: bool,
    pub include_lines: Option<bool>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            include_lines: None,
        }
    }
}

/// Per-call delete options
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Recorded by the persistence layer alongside the delete
    pub reason: Option<String>,
}

/// Overall service health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Running, but caching is effectively disabled
    Degraded,
    Unhealthy,
}

/// Cache slice of the health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub size: usize,
}

/// Health check payload
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub cache: CacheHealth,
    pub config: TransactionServiceConfig,
    pub timestamp: DateTime<Utc>,
}

/// The transaction service
pub struct TransactionService {
    gateway: Arc<dyn TransactionGateway>,
    cache: Arc<QueryCache>,
    config: RwLock<TransactionServiceConfig>,
}

impl TransactionService {
    /// Construct with injected dependencies
    pub fn new(
        gateway: Arc<dyn TransactionGateway>,
        cache: Arc<QueryCache>,
        config: TransactionServiceConfig,
    ) -> Self {
        Self {
            gateway,
            cache,
            config: RwLock::new(config),
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> TransactionServiceConfig {
        self.config.read().expect("config lock poisoned").clone()
    }

    /// Apply a partial configuration override; last write wins
    pub fn update_config(&self, patch: ConfigPatch) {
        let mut config = self.config.write().expect("config lock poisoned");
        config.apply(patch);
        // Staleness changes take effect on existing entries immediately
        self.cache
            .set_ttl(std::time::Duration::from_millis(config.cache_stale_ms));
        debug!(?config, "Service configuration updated");
    }

    /// The cache this service fronts (diagnostics and tests)
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn metadata(scope: &ActorScope, operation: &str, started: Instant) -> ResponseMetadata {
        ResponseMetadata {
            actor_user_id: scope.actor_user_id.clone(),
            organization_id: scope.organization_id.clone(),
            operation: operation.to_string(),
            timestamp: Utc::now(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Auth guard; runs before any I/O in every operation
    fn guard<T>(scope: &ActorScope, operation: &str, started: Instant) -> Option<ServiceResponse<T>> {
        if scope.is_complete() {
            return None;
        }
        warn!(operation = operation, "Rejected call with incomplete scope");
        Some(ServiceResponse::fail(
            AUTH_CONTEXT_ERROR,
            Self::metadata(scope, operation, started),
        ))
    }

    /// Create a transaction with optional lines
    ///
    /// On success, every cache entry scoped to the organization is evicted:
    /// coarse invalidation over precision, so no query can serve a list
    /// missing the new row.
    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
        scope: &ActorScope,
        options: &CreateOptions,
    ) -> ServiceResponse<CreateReceipt> {
        let started = Instant::now();
        if let Some(denied) = Self::guard(scope, "CREATE", started) {
            return denied;
        }

        let payload = match build_create_payload(request) {
            Ok(payload) => payload,
            Err(e) => {
                return ServiceResponse::fail(
                    e.to_string(),
                    Self::metadata(scope, "CREATE", started),
                )
            }
        };

        let lines: Vec<serde_json::Value> = request
            .lines
            .iter()
            .filter_map(|line| serde_json::to_value(line).ok())
            .collect();
        let lines_sent = lines.len();

        let crud = CrudRequest::new(CrudAction::Create, &scope.actor_user_id, &scope.organization_id)
            .with_transaction(payload)
            .with_lines(lines)
            .with_options(CrudOptions {
                idempotency_key: options.idempotency_key.clone(),
                ..Default::default()
            });

        match self.gateway.execute(crud).await {
            Ok(response) if response.success => {
                // The remote write happened; evict before touching the
                // payload so a malformed body cannot leave stale reads
                self.cache.invalidate(&keys::org_pattern(&scope.organization_id));

                let data = response.data.unwrap_or_default();
                let transaction_id = data
                    .get("transaction_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok());

                let Some(transaction_id) = transaction_id else {
                    return ServiceResponse::fail(
                        "Gateway create response missing transaction_id",
                        Self::metadata(scope, "CREATE", started),
                    );
                };

                let lines_created = data
                    .get("lines_created")
                    .and_then(|v| v.as_u64())
                    .map(|n| n as usize)
                    .unwrap_or(lines_sent);

                debug!(
                    transaction_id = %transaction_id,
                    lines_created = lines_created,
                    "Transaction created"
                );
                ServiceResponse::ok(
                    CreateReceipt {
                        transaction_id,
                        lines_created,
                    },
                    Self::metadata(scope, "CREATE", started),
                )
            }
            Ok(response) => ServiceResponse::fail(
                response
                    .error
                    .unwrap_or_else(|| "Gateway reported failure".to_string()),
                Self::metadata(scope, "CREATE", started),
            ),
            Err(e) => {
                warn!(error = %e, "Create failed unexpectedly");
                ServiceResponse::fail(e.to_string(), Self::metadata(scope, "CREATE", started))
            }
        }
    }

    /// Query transactions with coarse filters
    ///
    /// Identical queries inside the staleness window never reach the
    /// gateway: a hit returns immediately with the QUERY_CACHED tag.
    /// An empty result list still gets cached.
    pub async fn query_transactions(
        &self,
        query: &TransactionQuery,
        scope: &ActorScope,
        options: &QueryOptions,
    ) -> ServiceResponse<Vec<Transaction>> {
        let started = Instant::now();
        if let Some(denied) = Self::guard(scope, "QUERY", started) {
            return denied;
        }

        let config = self.config();
        let include_lines = options.include_lines.unwrap_or(config.include_lines);
        let limit = options.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let offset = options.offset.unwrap_or(0);

        let filters = match serde_json::to_value(query) {
            Ok(v) => v,
            Err(e) => {
                return ServiceResponse::fail(
                    e.to_string(),
                    Self::metadata(scope, "QUERY", started),
                )
            }
        };

        // Everything that shapes the result participates in the key
        let key_payload = serde_json::json!({
            "filters": filters,
            "include_lines": include_lines,
            "limit": limit,
            "offset": offset,
        });
        let cache_key = keys::query_key(&scope.organization_id, &key_payload.to_string());

        if options.use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                if let Ok(transactions) = serde_json::from_value::<Vec<Transaction>>(cached) {
                    return ServiceResponse::ok(
                        transactions,
                        Self::metadata(scope, "QUERY_CACHED", started),
                    );
                }
                // Undeserializable entry: drop it and fall through to the gateway
                self.cache.invalidate(&cache_key);
            }
        }

        let crud = CrudRequest::new(CrudAction::Query, &scope.actor_user_id, &scope.organization_id)
            .with_options(CrudOptions {
                filters: Some(filters),
                include_lines: Some(include_lines),
                limit: Some(limit),
                offset: Some(offset),
                ..Default::default()
            });

        match self.gateway.execute(crud).await {
            Ok(response) if response.success => {
                let items = response
                    .data
                    .as_ref()
                    .and_then(|d| d.get("items"))
                    .cloned()
                    .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));

                match serde_json::from_value::<Vec<Transaction>>(items.clone()) {
                    Ok(transactions) => {
                        self.cache.set(&cache_key, items);
                        ServiceResponse::ok(
                            transactions,
                            Self::metadata(scope, "QUERY", started),
                        )
                    }
                    Err(e) => ServiceResponse::fail(
                        format!("Query result decode failed: {e}"),
                        Self::metadata(scope, "QUERY", started),
                    ),
                }
            }
            Ok(response) => ServiceResponse::fail(
                response
                    .error
                    .unwrap_or_else(|| "Gateway reported failure".to_string()),
                Self::metadata(scope, "QUERY", started),
            ),
            Err(e) => {
                warn!(error = %e, "Query failed unexpectedly");
                ServiceResponse::fail(e.to_string(), Self::metadata(scope, "QUERY", started))
            }
        }
    }

    /// Read a single transaction by id
    pub async fn get_transaction(
        &self,
        transaction_id: Uuid,
        scope: &ActorScope,
        options: &GetOptions,
    ) -> ServiceResponse<Transaction> {
        let started = Instant::now();
        if let Some(denied) = Self::guard(scope, "READ", started) {
            return denied;
        }

        let config = self.config();
        let include_lines = options.include_lines.unwrap_or(config.include_lines);
        let cache_key =
            keys::transaction_key(&scope.organization_id, &transaction_id.to_string());

        if options.use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                if let Ok(transaction) = serde_json::from_value::<Transaction>(cached) {
                    return ServiceResponse::ok(
                        transaction,
                        Self::metadata(scope, "READ_CACHED", started),
                    );
                }
                self.cache.invalidate(&cache_key);
            }
        }

        let crud = CrudRequest::new(CrudAction::Read, &scope.actor_user_id, &scope.organization_id)
            .with_transaction(serde_json::json!({ "id": transaction_id }))
            .with_options(CrudOptions {
                include_lines: Some(include_lines),
                ..Default::default()
            });

        match self.gateway.execute(crud).await {
            Ok(response) if response.success => {
                let data = response.data.filter(|d| !d.is_null());
                let Some(data) = data else {
                    return ServiceResponse::fail(
                        format!("Transaction {transaction_id} not found"),
                        Self::metadata(scope, "READ", started),
                    );
                };

                match serde_json::from_value::<Transaction>(data.clone()) {
                    Ok(transaction) => {
                        self.cache.set(&cache_key, data);
                        ServiceResponse::ok(transaction, Self::metadata(scope, "READ", started))
                    }
                    Err(e) => ServiceResponse::fail(
                        format!("Read result decode failed: {e}"),
                        Self::metadata(scope, "READ", started),
                    ),
                }
            }
            Ok(response) => ServiceResponse::fail(
                response
                    .error
                    .unwrap_or_else(|| "Gateway reported failure".to_string()),
                Self::metadata(scope, "READ", started),
            ),
            Err(e) => {
                warn!(error = %e, "Read failed unexpectedly");
                ServiceResponse::fail(e.to_string(), Self::metadata(scope, "READ", started))
            }
        }
    }

    /// Apply a patch (and optional replacement lines) to a transaction
    ///
    /// Success invalidates both the read entry for the id and every query
    /// entry for the organization: an update can change fields a cached
    /// query filtered on.
    pub async fn update_transaction(
        &self,
        request: &UpdateTransactionRequest,
        scope: &ActorScope,
    ) -> ServiceResponse<Transaction> {
        let started = Instant::now();
        if let Some(denied) = Self::guard(scope, "UPDATE", started) {
            return denied;
        }

        let mut payload = request.patch.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "id".to_string(),
                serde_json::json!(request.transaction_id),
            );
        } else {
            return ServiceResponse::fail(
                "Update patch must be a JSON object",
                Self::metadata(scope, "UPDATE", started),
            );
        }

        let lines: Vec<serde_json::Value> = request
            .lines
            .iter()
            .filter_map(|line| serde_json::to_value(line).ok())
            .collect();

        let crud = CrudRequest::new(CrudAction::Update, &scope.actor_user_id, &scope.organization_id)
            .with_transaction(payload)
            .with_lines(lines);

        match self.gateway.execute(crud).await {
            Ok(response) if response.success => {
                // The remote write happened regardless of what the body
                // decodes to; evict first so stale rows cannot be served
                self.invalidate_after_write(scope, request.transaction_id);

                let data = response.data.unwrap_or_default();
                match serde_json::from_value::<Transaction>(data) {
                    Ok(transaction) => {
                        ServiceResponse::ok(transaction, Self::metadata(scope, "UPDATE", started))
                    }
                    Err(e) => ServiceResponse::fail(
                        format!("Update result decode failed: {e}"),
                        Self::metadata(scope, "UPDATE", started),
                    ),
                }
            }
            Ok(response) => ServiceResponse::fail(
                response
                    .error
                    .unwrap_or_else(|| "Gateway reported failure".to_string()),
                Self::metadata(scope, "UPDATE", started),
            ),
            Err(e) => {
                warn!(error = %e, "Update failed unexpectedly");
                ServiceResponse::fail(e.to_string(), Self::metadata(scope, "UPDATE", started))
            }
        }
    }

    /// Delete (soft or hard, per the persistence layer) with an optional reason
    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        scope: &ActorScope,
        options: &DeleteOptions,
    ) -> ServiceResponse<Deleted> {
        let started = Instant::now();
        if let Some(denied) = Self::guard(scope, "DELETE", started) {
            return denied;
        }

        let crud = CrudRequest::new(CrudAction::Delete, &scope.actor_user_id, &scope.organization_id)
            .with_transaction(serde_json::json!({ "id": transaction_id }))
            .with_options(CrudOptions {
                reason: options.reason.clone(),
                ..Default::default()
            });

        match self.gateway.execute(crud).await {
            Ok(response) if response.success => {
                self.invalidate_after_write(scope, transaction_id);
                ServiceResponse::ok(
                    Deleted { deleted: true },
                    Self::metadata(scope, "DELETE", started),
                )
            }
            Ok(response) => ServiceResponse::fail(
                response
                    .error
                    .unwrap_or_else(|| "Gateway reported failure".to_string()),
                Self::metadata(scope, "DELETE", started),
            ),
            Err(e) => {
                warn!(error = %e, "Delete failed unexpectedly");
                ServiceResponse::fail(e.to_string(), Self::metadata(scope, "DELETE", started))
            }
        }
    }

    /// Service health snapshot
    pub fn health_check(&self) -> HealthReport {
        let config = self.config();
        let status = if config.cache_stale_ms == 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            cache: CacheHealth {
                size: self.cache.len(),
            },
            config,
            timestamp: Utc::now(),
        }
    }

    /// Dual invalidation after UPDATE/DELETE: the read entry for the id
    /// plus all organization-scoped query entries
    fn invalidate_after_write(&self, scope: &ActorScope, transaction_id: Uuid) {
        self.cache.invalidate(&transaction_id.to_string());
        self.cache
            .invalidate(&keys::query_pattern(&scope.organization_id));
    }
}

/// Serialize the create draft, applying date and status defaults
fn build_create_payload(request: &CreateTransactionRequest) -> crate::types::Result<serde_json::Value> {
    let mut payload = serde_json::to_value(request)?;
    if let Some(obj) = payload.as_object_mut() {
        obj.remove("lines"); // lines travel separately in p_lines
        obj.entry("transaction_date")
            .or_insert_with(|| serde_json::json!(Utc::now()));
        obj.entry("transaction_status")
            .or_insert_with(|| serde_json::json!(DEFAULT_TRANSACTION_STATUS));
    }
    Ok(payload)
}
