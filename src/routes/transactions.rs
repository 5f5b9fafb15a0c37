//! Transaction REST endpoints
//!
//! Thin JSON shims over `TransactionService`. Identity arrives in the
//! `X-Organization-Id` and `X-Actor-Id` headers; a request missing either
//! header gets 401 before any handler runs (enforced in the router).
//! Handlers always return the service envelope with status 200; transport
//! errors and malformed bodies get 400.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::config::ConfigPatch;
use crate::server::AppState;
use crate::service::{
    ActorScope, BatchOperation, CreateOptions, CreateTransactionRequest, DeleteOptions,
    GetOptions, QueryOptions, TransactionQuery, UpdateTransactionRequest,
};

/// Body of POST /v1/transactions/query
#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    query: TransactionQuery,
    #[serde(default)]
    options: QueryBodyOptions,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct QueryBodyOptions {
    use_cache: bool,
    include_lines: Option<bool>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Default for QueryBodyOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            include_lines: None,
            limit: None,
            offset: None,
        }
    }
}

/// Body of DELETE /v1/transactions/{id} (optional)
#[derive(Debug, Default, Deserialize)]
struct DeleteBody {
    reason: Option<String>,
}

/// Simple filters for GET /v1/transactions; richer queries go through
/// POST /v1/transactions/query
fn query_from_string(query: Option<&str>) -> (TransactionQuery, QueryOptions) {
    let mut filters = TransactionQuery::default();
    let mut options = QueryOptions::default();

    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let value = urlencoding::decode(value).unwrap_or_default();
                match key {
                    "transaction_type" => filters.transaction_type = Some(value.to_string()),
                    "transaction_status" | "status" => {
                        filters.transaction_status = Some(value.to_string())
                    }
                    "smart_code" => filters.smart_code = Some(value.to_string()),
                    "source_entity_id" => filters.source_entity_id = value.parse().ok(),
                    "target_entity_id" => filters.target_entity_id = value.parse().ok(),
                    "limit" => options.limit = value.parse().ok(),
                    "offset" => options.offset = value.parse().ok(),
                    "include_lines" => options.include_lines = value.parse().ok(),
                    "no_cache" => options.use_cache = !value.parse().unwrap_or(false),
                    _ => {}
                }
            }
        }
    }

    (filters, options)
}

/// GET /v1/transactions
pub async fn list(
    state: Arc<AppState>,
    scope: ActorScope,
    query_string: Option<&str>,
) -> Response<Full<Bytes>> {
    let (filters, options) = query_from_string(query_string);
    let response = state
        .service
        .query_transactions(&filters, &scope, &options)
        .await;
    envelope(&response)
}

/// POST /v1/transactions
pub async fn create(
    state: Arc<AppState>,
    scope: ActorScope,
    idempotency_key: Option<String>,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let request: CreateTransactionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(&format!("Invalid transaction body: {e}")),
    };

    let response = state
        .service
        .create_transaction(&request, &scope, &CreateOptions { idempotency_key })
        .await;
    envelope(&response)
}

/// POST /v1/transactions/query
pub async fn query(state: Arc<AppState>, scope: ActorScope, body: Bytes) -> Response<Full<Bytes>> {
    let body: QueryBody = if body.is_empty() {
        QueryBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(e) => return bad_request(&format!("Invalid query body: {e}")),
        }
    };

    let options = QueryOptions {
        use_cache: body.options.use_cache,
        include_lines: body.options.include_lines,
        limit: body.options.limit,
        offset: body.options.offset,
    };
    let response = state
        .service
        .query_transactions(&body.query, &scope, &options)
        .await;
    envelope(&response)
}

/// GET /v1/transactions/{id}
pub async fn get(state: Arc<AppState>, scope: ActorScope, id: &str) -> Response<Full<Bytes>> {
    let Some(transaction_id) = parse_id(id) else {
        return bad_request(&format!("Invalid transaction id: {id}"));
    };

    let response = state
        .service
        .get_transaction(transaction_id, &scope, &GetOptions::default())
        .await;
    envelope(&response)
}

/// PUT /v1/transactions/{id}
pub async fn update(
    state: Arc<AppState>,
    scope: ActorScope,
    id: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let Some(transaction_id) = parse_id(id) else {
        return bad_request(&format!("Invalid transaction id: {id}"));
    };
    let patch: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(patch) => patch,
        Err(e) => return bad_request(&format!("Invalid patch body: {e}")),
    };

    let request = UpdateTransactionRequest {
        transaction_id,
        patch,
        lines: Vec::new(),
    };
    let response = state.service.update_transaction(&request, &scope).await;
    envelope(&response)
}

/// DELETE /v1/transactions/{id}
pub async fn delete(
    state: Arc<AppState>,
    scope: ActorScope,
    id: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let Some(transaction_id) = parse_id(id) else {
        return bad_request(&format!("Invalid transaction id: {id}"));
    };
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<DeleteBody>(&body)
            .ok()
            .and_then(|b| b.reason)
    };

    let response = state
        .service
        .delete_transaction(transaction_id, &scope, &DeleteOptions { reason })
        .await;
    envelope(&response)
}

/// POST /v1/transactions/batch
pub async fn batch(state: Arc<AppState>, scope: ActorScope, body: Bytes) -> Response<Full<Bytes>> {
    let operations: Vec<BatchOperation> = match serde_json::from_slice(&body) {
        Ok(operations) => operations,
        Err(e) => return bad_request(&format!("Invalid batch body: {e}")),
    };

    debug!(operations = operations.len(), "Batch request received");
    match state.service.batch_operations(operations, &scope).await {
        Ok(response) => envelope(&response),
        // Oversized batch is the caller's mistake, not a service failure
        Err(e) => bad_request(&e.to_string()),
    }
}

/// GET /v1/cache/stats
pub fn cache_stats(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let stats = state.service.cache().stats();
    json_ok(serde_json::to_string(&stats).unwrap_or_else(|_| "{}".to_string()))
}

/// PUT /v1/config
pub fn update_config(state: Arc<AppState>, body: Bytes) -> Response<Full<Bytes>> {
    let patch: ConfigPatch = match serde_json::from_slice(&body) {
        Ok(patch) => patch,
        Err(e) => return bad_request(&format!("Invalid config patch: {e}")),
    };

    state.service.update_config(patch);
    let config = state.service.config();
    json_ok(serde_json::to_string(&config).unwrap_or_else(|_| "{}".to_string()))
}

fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

fn envelope<T: serde::Serialize>(response: &T) -> Response<Full<Bytes>> {
    match serde_json::to_string(response) {
        Ok(body) => json_ok(body),
        Err(_) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(
                r#"{"success":false,"error":"Internal serialization error"}"#,
            )))
            .unwrap(),
    }
}

fn json_ok(body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn bad_request(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "success": false,
        "error": message,
    });

    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
