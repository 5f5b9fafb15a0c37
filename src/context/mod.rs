//! Session binding for the transaction service
//!
//! A `SessionContext` carries whatever identity the caller currently has,
//! possibly nothing. `ScopedTransactions` binds a service to one such
//! context so call sites never pass organization and actor ids by hand.
//! The binding is fail-closed: an incomplete context short-circuits before
//! any gateway or cache I/O.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::contracts::Transaction;
use crate::service::{
    ActorScope, BatchOperation, BatchOutcome, CreateOptions, CreateReceipt,
    CreateTransactionRequest, DeleteOptions, Deleted, GetOptions, QueryOptions, ResponseMetadata,
    ServiceResponse, TransactionQuery, TransactionService, UpdateTransactionRequest,
};
use crate::types::{HeraError, Result, AUTH_CONTEXT_ERROR};

/// Caller identity as known to the current session; either half may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub organization_id: Option<String>,
    pub actor_user_id: Option<String>,
}

impl SessionContext {
    pub fn new(organization_id: impl Into<String>, actor_user_id: impl Into<String>) -> Self {
        Self {
            organization_id: Some(organization_id.into()),
            actor_user_id: Some(actor_user_id.into()),
        }
    }

    /// A session with no identity at all
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.scope().is_ok()
    }

    /// A complete scope, or the auth-context error
    pub fn scope(&self) -> Result<ActorScope> {
        let organization_id = self
            .organization_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let actor_user_id = self
            .actor_user_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (organization_id, actor_user_id) {
            (Some(org), Some(actor)) => Ok(ActorScope::new(org, actor)),
            _ => Err(HeraError::AuthContext),
        }
    }
}

/// A transaction service bound to one session
pub struct ScopedTransactions {
    service: Arc<TransactionService>,
    context: SessionContext,
}

impl ScopedTransactions {
    pub fn new(service: Arc<TransactionService>, context: SessionContext) -> Self {
        Self { service, context }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Replace the bound identity, e.g. after sign-in or org switch
    pub fn rebind(&mut self, context: SessionContext) {
        debug!("Session context rebound");
        self.context = context;
    }

    fn denied<T>(&self, operation: &str) -> ServiceResponse<T> {
        ServiceResponse::fail(
            AUTH_CONTEXT_ERROR,
            ResponseMetadata {
                actor_user_id: self.context.actor_user_id.clone().unwrap_or_default(),
                organization_id: self.context.organization_id.clone().unwrap_or_default(),
                operation: operation.to_string(),
                timestamp: Utc::now(),
                duration_ms: 0.0,
            },
        )
    }

    pub async fn create(
        &self,
        request: &CreateTransactionRequest,
        options: &CreateOptions,
    ) -> ServiceResponse<CreateReceipt> {
        match self.context.scope() {
            Ok(scope) => self.service.create_transaction(request, &scope, options).await,
            Err(_) => self.denied("CREATE"),
        }
    }

    pub async fn query(
        &self,
        query: &TransactionQuery,
        options: &QueryOptions,
    ) -> ServiceResponse<Vec<Transaction>> {
        match self.context.scope() {
            Ok(scope) => self.service.query_transactions(query, &scope, options).await,
            Err(_) => self.denied("QUERY"),
        }
    }

    pub async fn get(
        &self,
        transaction_id: Uuid,
        options: &GetOptions,
    ) -> ServiceResponse<Transaction> {
        match self.context.scope() {
            Ok(scope) => self.service.get_transaction(transaction_id, &scope, options).await,
            Err(_) => self.denied("READ"),
        }
    }

    pub async fn update(
        &self,
        request: &UpdateTransactionRequest,
    ) -> ServiceResponse<Transaction> {
        match self.context.scope() {
            Ok(scope) => self.service.update_transaction(request, &scope).await,
            Err(_) => self.denied("UPDATE"),
        }
    }

    pub async fn delete(
        &self,
        transaction_id: Uuid,
        options: &DeleteOptions,
    ) -> ServiceResponse<Deleted> {
        match self.context.scope() {
            Ok(scope) => {
                self.service
                    .delete_transaction(transaction_id, &scope, options)
                    .await
            }
            Err(_) => self.denied("DELETE"),
        }
    }

    /// Load a single transaction, collapsing the envelope into `Result`
    pub async fn load_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        let scope = self.context.scope()?;
        let response = self
            .service
            .get_transaction(transaction_id, &scope, &GetOptions::default())
            .await;
        match response.data {
            Some(transaction) => Ok(transaction),
            None => Err(HeraError::NotFound(
                response
                    .error
                    .unwrap_or_else(|| format!("Transaction {transaction_id} not found")),
            )),
        }
    }

    /// Create with success/failure callbacks, UI-flow style
    pub async fn create_with<S, E>(
        &self,
        request: &CreateTransactionRequest,
        options: &CreateOptions,
        on_success: S,
        on_error: E,
    ) -> ServiceResponse<CreateReceipt>
    where
        S: FnOnce(&CreateReceipt),
        E: FnOnce(&str),
    {
        let response = self.create(request, options).await;
        match (&response.data, &response.error) {
            (Some(receipt), _) if response.success => on_success(receipt),
            (_, Some(error)) => on_error(error),
            _ => on_error("Gateway reported failure"),
        }
        response
    }

    /// Run a batch with per-operation progress reporting
    ///
    /// `on_progress` observes (completed, total) as outcomes are walked;
    /// `on_success`/`on_error` fire once for the batch as a whole.
    pub async fn run_batch<P, S, E>(
        &self,
        operations: Vec<BatchOperation>,
        mut on_progress: P,
        on_success: S,
        on_error: E,
    ) -> Result<Vec<BatchOutcome>>
    where
        P: FnMut(usize, usize),
        S: FnOnce(&[BatchOutcome]),
        E: FnOnce(&str),
    {
        let scope = match self.context.scope() {
            Ok(scope) => scope,
            Err(e) => {
                on_error(AUTH_CONTEXT_ERROR);
                return Err(e);
            }
        };

        match self.service.batch_operations(operations, &scope).await {
            Ok(response) if response.success => {
                let outcomes = response.data.unwrap_or_default();
                let total = outcomes.len();
                for completed in 1..=total {
                    on_progress(completed, total);
                }
                on_success(&outcomes);
                Ok(outcomes)
            }
            Ok(response) => {
                let message = response
                    .error
                    .unwrap_or_else(|| "Gateway reported failure".to_string());
                on_error(&message);
                Err(HeraError::Gateway(message))
            }
            Err(e) => {
                on_error(&e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CrudAction, GatewayResponse};
    use crate::service::tests::{service_with, MockGateway};
    use std::cell::Cell;

    fn authed_context() -> SessionContext {
        SessionContext::new("11111111-1111-1111-1111-111111111111", "user-1")
    }

    #[test]
    fn scope_requires_both_halves() {
        assert!(SessionContext::anonymous().scope().is_err());
        assert!(SessionContext {
            organization_id: Some("org".to_string()),
            actor_user_id: None,
        }
        .scope()
        .is_err());
        assert!(SessionContext {
            organization_id: Some("  ".to_string()),
            actor_user_id: Some("user".to_string()),
        }
        .scope()
        .is_err());
        assert!(authed_context().scope().is_ok());
    }

    #[tokio::test]
    async fn anonymous_session_is_denied_without_io() {
        let gateway = Arc::new(MockGateway::new(|_req| {
            Ok(GatewayResponse::ok(serde_json::json!({})))
        }));
        let service = Arc::new(service_with(Arc::clone(&gateway)));
        let scoped = ScopedTransactions::new(service, SessionContext::anonymous());

        let response = scoped
            .query(&TransactionQuery::default(), &QueryOptions::default())
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(AUTH_CONTEXT_ERROR));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn load_transaction_collapses_not_found_to_err() {
        let gateway = Arc::new(MockGateway::new(|_req| {
            Ok(GatewayResponse::ok(serde_json::Value::Null))
        }));
        let service = Arc::new(service_with(gateway));
        let scoped = ScopedTransactions::new(service, authed_context());

        let err = scoped.load_transaction(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, HeraError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_with_fires_success_callback() {
        let txn_id = Uuid::new_v4();
        let gateway = Arc::new(MockGateway::new(move |_req| {
            Ok(GatewayResponse::ok(serde_json::json!({
                "transaction_id": txn_id,
                "lines_created": 2,
            })))
        }));
        let service = Arc::new(service_with(gateway));
        let scoped = ScopedTransactions::new(service, authed_context());

        let seen = Cell::new(None);
        scoped
            .create_with(
                &CreateTransactionRequest {
                    transaction_type: "sale".to_string(),
                    ..Default::default()
                },
                &CreateOptions::default(),
                |receipt| seen.set(Some(receipt.transaction_id)),
                |_err| panic!("unexpected error callback"),
            )
            .await;
        assert_eq!(seen.get(), Some(txn_id));
    }

    #[tokio::test]
    async fn create_with_fires_error_callback() {
        let gateway = Arc::new(MockGateway::new(|_req| {
            Ok(GatewayResponse::fail("insert rejected"))
        }));
        let service = Arc::new(service_with(gateway));
        let scoped = ScopedTransactions::new(service, authed_context());

        let seen = Cell::new(false);
        let response = scoped
            .create_with(
                &CreateTransactionRequest::default(),
                &CreateOptions::default(),
                |_receipt| panic!("unexpected success callback"),
                |err| {
                    assert_eq!(err, "insert rejected");
                    seen.set(true);
                },
            )
            .await;
        assert!(seen.get());
        assert!(!response.success);
    }

    #[tokio::test]
    async fn run_batch_reports_progress_in_order() {
        let gateway = Arc::new(MockGateway::new(|req| match req.action {
            CrudAction::Query => Ok(GatewayResponse::ok(serde_json::json!({"items": []}))),
            _ => Ok(GatewayResponse::fail("unexpected action")),
        }));
        let service = Arc::new(service_with(gateway));
        let scoped = ScopedTransactions::new(service, authed_context());

        let operations: Vec<BatchOperation> = (0..3)
            .map(|_| BatchOperation {
                action: "QUERY".to_string(),
                transaction_id: None,
                data: serde_json::json!({}),
            })
            .collect();

        let mut progress = Vec::new();
        let outcomes = scoped
            .run_batch(
                operations,
                |completed, total| progress.push((completed, total)),
                |outcomes| assert_eq!(outcomes.len(), 3),
                |err| panic!("unexpected batch error: {err}"),
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn run_batch_without_identity_errors_before_dispatch() {
        let gateway = Arc::new(MockGateway::new(|_req| {
            Ok(GatewayResponse::ok(serde_json::json!({})))
        }));
        let service = Arc::new(service_with(Arc::clone(&gateway)));
        let scoped = ScopedTransactions::new(service, SessionContext::anonymous());

        let seen = Cell::new(false);
        let err = scoped
            .run_batch(
                Vec::new(),
                |_c, _t| {},
                |_outcomes| panic!("unexpected success callback"),
                |err| {
                    assert_eq!(err, AUTH_CONTEXT_ERROR);
                    seen.set(true);
                },
            )
            .await
            .unwrap_err();
        assert!(seen.get());
        assert!(matches!(err, HeraError::AuthContext));
        assert_eq!(gateway.calls(), 0);
    }
}
