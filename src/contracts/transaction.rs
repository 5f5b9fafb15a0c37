//! Transaction and TransactionLine - business events and their items
//!
//! A transaction is any business event with a total: an order, a payment,
//! a journal entry, a batch run. Lines itemize it. `total_amount` equals
//! the sum of its lines when lines exist; that reconciliation lives in the
//! database, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::smart_code::SmartCode;

/// Default status stamped on newly created transactions
pub const DEFAULT_TRANSACTION_STATUS: &str = "ACTIVE";

/// A business event in the universal transactions table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Event discriminator ("sale", "payment", "journal_entry", ...)
    pub transaction_type: String,
    /// Human-facing document number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_code: Option<String>,
    pub transaction_date: DateTime<Utc>,
    /// Party the event originates from (customer, vendor, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_entity_id: Option<Uuid>,
    /// Party the event targets (staff, location, GL account, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_entity_id: Option<Uuid>,
    pub total_amount: f64,
    #[serde(default = "default_transaction_status")]
    pub transaction_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_period: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<SmartCode>,
    /// Opaque business payload, never destructured by the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_context: Option<serde_json::Value>,
    /// Opaque technical payload (approval state, idempotency markers, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Lines, present when the gateway was asked to include them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<TransactionLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: i64,
}

fn default_transaction_status() -> String {
    DEFAULT_TRANSACTION_STATUS.to_string()
}

/// One line of a transaction
///
/// `line_number` is a dense 1-based sequence per transaction in well-formed
/// data; the core does not renumber, callers own the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    pub line_number: u32,
    /// Referenced entity (product sold, service performed, account hit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit_amount: f64,
    #[serde(default)]
    pub line_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_code: Option<SmartCode>,
    /// Opaque line payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_data: Option<serde_json::Value>,
}

fn default_quantity() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_active() {
        let txn: Transaction = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "organization_id": Uuid::new_v4(),
            "transaction_type": "sale",
            "transaction_date": Utc::now(),
            "total_amount": 150.0,
        }))
        .unwrap();
        assert_eq!(txn.transaction_status, "ACTIVE");
        assert!(txn.lines.is_empty());
    }

    #[test]
    fn line_defaults() {
        let line: TransactionLine = serde_json::from_value(serde_json::json!({
            "line_number": 1,
        }))
        .unwrap();
        assert_eq!(line.quantity, 1.0);
        assert_eq!(line.line_amount, 0.0);
    }

    #[test]
    fn lines_round_trip_inside_transaction() {
        let txn = Transaction {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            transaction_type: "sale".to_string(),
            transaction_code: Some("SALE-0001".to_string()),
            transaction_date: Utc::now(),
            source_entity_id: None,
            target_entity_id: None,
            total_amount: 60.0,
            transaction_status: DEFAULT_TRANSACTION_STATUS.to_string(),
            transaction_currency_code: Some("AED".to_string()),
            exchange_rate: None,
            fiscal_year: Some(2026),
            fiscal_period: Some(8),
            smart_code: Some(SmartCode::parse("HERA.SALON.TXN.SALE.POS.v1").unwrap()),
            business_context: None,
            metadata: None,
            lines: vec![TransactionLine {
                id: None,
                transaction_id: None,
                line_number: 1,
                entity_id: Some(Uuid::new_v4()),
                line_type: Some("service".to_string()),
                description: Some("Basic Haircut".to_string()),
                quantity: 1.0,
                unit_amount: 60.0,
                line_amount: 60.0,
                discount_amount: 0.0,
                tax_amount: 0.0,
                smart_code: None,
                line_data: None,
            }],
            created_at: None,
            updated_at: None,
            version: 0,
        };

        let json = serde_json::to_value(&txn).unwrap();
        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back.lines.len(), 1);
        assert_eq!(back.lines[0].line_amount, 60.0);
    }
}
