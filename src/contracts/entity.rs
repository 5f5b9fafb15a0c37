//! Entity - the generic "thing" record
//!
//! People, products, services, GL accounts, customers: anything a module
//! needs to reference is an entity row discriminated by `entity_type`.
//! New business object kinds add rows, never tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::smart_code::SmartCode;

/// A generic business object in the universal entities table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Entity identifier
    pub id: Uuid,
    /// Owning organization (tenancy boundary)
    pub organization_id: Uuid,
    /// Free-text discriminator ("customer", "service", "gl_account", ...)
    pub entity_type: String,
    /// Display name
    pub entity_name: String,
    /// Short code, unique per organization and type by convention
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_description: Option<String>,
    /// Parent entity for hierarchies (e.g. GL account trees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_entity_id: Option<Uuid>,
    /// Classification for business-rule dispatch
    pub smart_code: SmartCode,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped by the gateway on update
    #[serde(default)]
    pub version: i64,
}

fn default_status() -> String {
    "active".to_string()
}
