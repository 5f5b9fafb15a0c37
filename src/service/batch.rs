//! Concurrent batch execution over the single-operation methods
//!
//! Operations dispatch concurrently and results come back in submission
//! order, each tagged with its original index. One failing operation never
//! aborts its siblings; only a batch above the configured ceiling is
//! rejected up front, before any dispatch.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{HeraError, Result};

use super::{
    ActorScope, CreateOptions, CreateTransactionRequest, DeleteOptions, GetOptions, QueryOptions,
    ServiceResponse, TransactionQuery, TransactionService, UpdateTransactionRequest,
};

/// One entry of a batch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOperation {
    /// CREATE, READ, UPDATE, DELETE or QUERY (case-sensitive)
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    /// Action-specific payload: create draft, query filters, update patch
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Per-operation result, in submission order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionService {
    /// Run up to `batch_limit` operations concurrently
    ///
    /// Returns `Err` only when the batch exceeds the configured ceiling;
    /// everything else, including every per-operation failure, lands in
    /// the outcome array.
    pub async fn batch_operations(
        &self,
        operations: Vec<BatchOperation>,
        scope: &ActorScope,
    ) -> Result<ServiceResponse<Vec<BatchOutcome>>> {
        let started = Instant::now();
        let limit = self.config().batch_limit;
        if operations.len() > limit {
            warn!(
                requested = operations.len(),
                limit = limit,
                "Rejected oversized batch"
            );
            return Err(HeraError::BatchLimit {
                requested: operations.len(),
                limit,
            });
        }

        if let Some(denied) = Self::guard(scope, "BATCH", started) {
            return Ok(denied);
        }

        debug!(operations = operations.len(), "Dispatching batch");
        let futures = operations
            .into_iter()
            .enumerate()
            .map(|(index, op)| self.run_one(index, op, scope));
        let outcomes = futures::future::join_all(futures).await;

        Ok(ServiceResponse::ok(
            outcomes,
            Self::metadata(scope, "BATCH", started),
        ))
    }

    async fn run_one(&self, index: usize, op: BatchOperation, scope: &ActorScope) -> BatchOutcome {
        let action = op.action.clone();
        match self.dispatch(op, scope).await {
            Ok((success, data, error)) => BatchOutcome {
                index,
                action,
                success,
                data,
                error,
            },
            Err(message) => BatchOutcome {
                index,
                action,
                success: false,
                data: None,
                error: Some(message),
            },
        }
    }

    /// Map one batch entry onto the corresponding single-op method
    ///
    /// `Err` here means the entry itself was malformed (unknown action,
    /// missing id, undecodable payload); it becomes a failed outcome,
    /// never an aborted batch.
    async fn dispatch(
        &self,
        op: BatchOperation,
        scope: &ActorScope,
    ) -> std::result::Result<
        (bool, Option<serde_json::Value>, Option<String>),
        String,
    > {
        match op.action.as_str() {
            "CREATE" => {
                let request: CreateTransactionRequest = serde_json::from_value(op.data)
                    .map_err(|e| format!("Invalid CREATE payload: {e}"))?;
                let response = self
                    .create_transaction(&request, scope, &CreateOptions::default())
                    .await;
                Ok(flatten(response))
            }
            "READ" => {
                let id = op
                    .transaction_id
                    .ok_or_else(|| "READ requires transaction_id".to_string())?;
                let response = self.get_transaction(id, scope, &GetOptions::default()).await;
                Ok(flatten(response))
            }
            "UPDATE" => {
                let id = op
                    .transaction_id
                    .ok_or_else(|| "UPDATE requires transaction_id".to_string())?;
                let request = UpdateTransactionRequest {
                    transaction_id: id,
                    patch: op.data,
                    lines: Vec::new(),
                };
                let response = self.update_transaction(&request, scope).await;
                Ok(flatten(response))
            }
            "DELETE" => {
                let id = op
                    .transaction_id
                    .ok_or_else(|| "DELETE requires transaction_id".to_string())?;
                let reason = op
                    .data
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                let response = self
                    .delete_transaction(id, scope, &DeleteOptions { reason })
                    .await;
                Ok(flatten(response))
            }
            "QUERY" => {
                let query: TransactionQuery = serde_json::from_value(op.data)
                    .map_err(|e| format!("Invalid QUERY payload: {e}"))?;
                let response = self
                    .query_transactions(&query, scope, &QueryOptions::default())
                    .await;
                Ok(flatten(response))
            }
            other => Err(format!("Unknown action: {other}")),
        }
    }
}

fn flatten<T: Serialize>(
    response: ServiceResponse<T>,
) -> (bool, Option<serde_json::Value>, Option<String>) {
    let data = response
        .data
        .and_then(|d| serde_json::to_value(d).ok());
    (response.success, data, response.error)
}
