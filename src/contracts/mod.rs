//! Data contracts for the six universal tables
//!
//! Everything a HERA deployment stores lives in one of six record kinds:
//! organizations, entities, dynamic_data, relationships, transactions,
//! transaction_lines. These are pure shapes with runtime validation at the
//! serde boundary; behavior lives in the service layer.

pub mod dynamic_data;
pub mod entity;
pub mod organization;
pub mod relationship;
pub mod smart_code;
pub mod transaction;

pub use dynamic_data::{DynamicData, DynamicDataRow, FieldValue};
pub use entity::Entity;
pub use organization::Organization;
pub use relationship::{Relationship, RelationshipDirection};
pub use smart_code::SmartCode;
pub use transaction::{Transaction, TransactionLine, DEFAULT_TRANSACTION_STATUS};
