//! HTTP implementation of the CRUD gateway
//!
//! POSTs the request envelope as JSON to a single RPC endpoint (the hosted
//! database function that owns the transactions tables). A per-call timeout
//! keeps a hung remote from hanging the caller; timeouts and transport
//! failures surface as gateway errors, never panics.

use std::time::Duration;
use tracing::{debug, warn};

use super::{CrudRequest, GatewayResponse, TransactionGateway};
use crate::types::{HeraError, Result};

/// Gateway that speaks JSON-over-HTTP to the RPC endpoint
pub struct HttpRpcGateway {
    client: reqwest::Client,
    rpc_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpRpcGateway {
    /// Create a gateway for the given RPC endpoint
    pub fn new(rpc_url: &str, bearer_token: Option<String>, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.to_string(),
            bearer_token,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Endpoint this gateway posts to
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait::async_trait]
impl TransactionGateway for HttpRpcGateway {
    async fn execute(&self, request: CrudRequest) -> Result<GatewayResponse> {
        debug!(
            action = %request.action,
            organization_id = %request.organization_id,
            "Dispatching CRUD request"
        );

        let mut builder = self
            .client
            .post(&self.rpc_url)
            .timeout(self.timeout)
            .json(&request);

        if let Some(ref token) = self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(action = %request.action, error = %e, "Gateway request failed");
            if e.is_timeout() {
                HeraError::Gateway(format!(
                    "RPC timed out after {}ms",
                    self.timeout.as_millis()
                ))
            } else {
                HeraError::Gateway(format!("RPC request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gateway returned non-success status");
            return Err(HeraError::Gateway(format!(
                "RPC returned HTTP {status}: {body}"
            )));
        }

        let envelope: GatewayResponse = response
            .json()
            .await
            .map_err(|e| HeraError::Gateway(format!("RPC response decode failed: {e}")))?;

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CrudAction;

    #[test]
    fn constructor_keeps_endpoint() {
        let gateway = HttpRpcGateway::new("http://localhost:54321/rpc/txn_crud", None, 30_000);
        assert_eq!(gateway.rpc_url(), "http://localhost:54321/rpc/txn_crud");
        assert_eq!(gateway.timeout, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_gateway_error() {
        // Port 9 (discard) with a 50ms budget; either refusal or timeout,
        // both must surface as HeraError::Gateway.
        let gateway = HttpRpcGateway::new("http://127.0.0.1:9/rpc", None, 50);
        let result = gateway
            .execute(CrudRequest::new(CrudAction::Query, "user-1", "org-1"))
            .await;
        assert!(matches!(result, Err(HeraError::Gateway(_))));
    }
}
