//! Remote CRUD gateway boundary
//!
//! The service's only external collaborator: a single RPC that performs one
//! of CREATE/READ/UPDATE/DELETE/QUERY against the transactions table under
//! an explicit actor + organization. The wire shape uses `p_`-prefixed
//! parameter names; everything behind the RPC (row-level security, line
//! reconciliation, soft deletes) is the persistence layer's business.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Result;

pub use http::HttpRpcGateway;

/// CRUD action dispatched to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudAction {
    Create,
    Read,
    Update,
    Delete,
    Query,
}

impl fmt::Display for CrudAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CrudAction::Create => "CREATE",
            CrudAction::Read => "READ",
            CrudAction::Update => "UPDATE",
            CrudAction::Delete => "DELETE",
            CrudAction::Query => "QUERY",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CrudAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(CrudAction::Create),
            "READ" => Ok(CrudAction::Read),
            "UPDATE" => Ok(CrudAction::Update),
            "DELETE" => Ok(CrudAction::Delete),
            "QUERY" => Ok(CrudAction::Query),
            other => Err(format!("Unknown action: {other}")),
        }
    }
}

/// Options forwarded alongside the transaction payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrudOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// QUERY filter object, opaque to the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_lines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// DELETE reason, recorded by the persistence layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One gateway invocation, serialized to the RPC parameter shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrudRequest {
    #[serde(rename = "p_action")]
    pub action: CrudAction,
    #[serde(rename = "p_actor_user_id")]
    pub actor_user_id: String,
    #[serde(rename = "p_organization_id")]
    pub organization_id: String,
    /// Full or partial transaction record, or `{id}` for READ/DELETE
    #[serde(rename = "p_transaction")]
    pub transaction: Option<serde_json::Value>,
    #[serde(rename = "p_lines")]
    pub lines: Vec<serde_json::Value>,
    #[serde(rename = "p_options")]
    pub options: CrudOptions,
}

impl CrudRequest {
    /// Build a request with empty payload and default options
    pub fn new(action: CrudAction, actor_user_id: &str, organization_id: &str) -> Self {
        Self {
            action,
            actor_user_id: actor_user_id.to_string(),
            organization_id: organization_id.to_string(),
            transaction: None,
            lines: Vec::new(),
            options: CrudOptions::default(),
        }
    }

    pub fn with_transaction(mut self, transaction: serde_json::Value) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn with_lines(mut self, lines: Vec<serde_json::Value>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_options(mut self, options: CrudOptions) -> Self {
        self.options = options;
        self
    }
}

/// Gateway result envelope
///
/// `success:false` with an error message is the normal failure channel.
/// For QUERY, `data.items` holds the result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// The persistence boundary
///
/// Implementations own transport, retry policy, and row-level security.
/// The service treats this as a black box: an `Err` here is an unexpected
/// transport failure, a `success:false` response is a reported failure.
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    async fn execute(&self, request: CrudRequest) -> Result<GatewayResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_wire_names() {
        let request = CrudRequest::new(CrudAction::Create, "user-1", "org-1")
            .with_transaction(serde_json::json!({"transaction_type": "sale"}))
            .with_options(CrudOptions {
                idempotency_key: Some("idem-1".to_string()),
                ..Default::default()
            });

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["p_action"], "CREATE");
        assert_eq!(json["p_actor_user_id"], "user-1");
        assert_eq!(json["p_organization_id"], "org-1");
        assert_eq!(json["p_transaction"]["transaction_type"], "sale");
        assert_eq!(json["p_lines"], serde_json::json!([]));
        assert_eq!(json["p_options"]["idempotency_key"], "idem-1");
        // Unset options are omitted from the wire
        assert!(json["p_options"].get("reason").is_none());
    }

    #[test]
    fn action_round_trips_screaming_case() {
        let json = serde_json::to_value(CrudAction::Query).unwrap();
        assert_eq!(json, serde_json::json!("QUERY"));

        let action: CrudAction = serde_json::from_value(json).unwrap();
        assert_eq!(action, CrudAction::Query);
    }

    #[test]
    fn action_parses_from_batch_strings() {
        assert_eq!("DELETE".parse::<CrudAction>().unwrap(), CrudAction::Delete);
        assert!("FROB".parse::<CrudAction>().is_err());
    }

    #[test]
    fn response_deserializes_without_error_field() {
        let response: GatewayResponse =
            serde_json::from_str(r#"{"success":true,"data":{"items":[]}}"#).unwrap();
        assert!(response.success);
        assert!(response.error.is_none());
    }
}
