//! Relationship - directed edges between entities
//!
//! Both endpoints must belong to the same organization as the relationship
//! record; the gateway enforces that at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::smart_code::SmartCode;

/// Edge direction relative to (from, to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipDirection {
    #[default]
    Forward,
    Reverse,
    Bidirectional,
}

/// A typed edge in the universal relationships table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub from_entity_id: Uuid,
    pub to_entity_id: Uuid,
    /// Edge discriminator ("reports_to", "member_of", "has_status", ...)
    pub relationship_type: String,
    #[serde(default)]
    pub direction: RelationshipDirection,
    /// Weighting for ranked traversals
    #[serde(default = "default_strength")]
    pub strength: f64,
    /// Opaque edge payload, never destructured by the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<SmartCode>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
}

fn default_strength() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_defaults_forward() {
        let rel: Relationship = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "organization_id": Uuid::new_v4(),
            "from_entity_id": Uuid::new_v4(),
            "to_entity_id": Uuid::new_v4(),
            "relationship_type": "reports_to",
        }))
        .unwrap();
        assert_eq!(rel.direction, RelationshipDirection::Forward);
        assert!(rel.is_active);
        assert_eq!(rel.strength, 1.0);
    }

    #[test]
    fn direction_serializes_snake_case() {
        let json = serde_json::to_value(RelationshipDirection::Bidirectional).unwrap();
        assert_eq!(json, serde_json::json!("bidirectional"));
    }
}
