//! Organization - the tenancy boundary
//!
//! Every other record belongs to exactly one organization. Cross-organization
//! reads and writes are forbidden; the service layer scopes every gateway
//! call to a single organization id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant in the HERA universal schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Organization identifier
    pub id: Uuid,
    /// Display name
    pub organization_name: String,
    /// Short unique code (e.g. "SALON-BR1")
    pub organization_code: String,
    /// Type classification (e.g. "business_unit", "franchise")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_type: Option<String>,
    /// Industry classification (e.g. "salon", "restaurant")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_classification: Option<String>,
    /// Parent organization for tree-structured tenants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_organization_id: Option<Uuid>,
    /// Lifecycle status
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "active".to_string()
}
