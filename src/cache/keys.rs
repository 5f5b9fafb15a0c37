//! Cache key construction
//!
//! Keys are organization-scoped strings so that coarse invalidation can
//! match by substring: any key for organization O contains O, and any key
//! for transaction T contains T. Query arguments are digested so identical
//! queries always map to identical keys.

use sha2::{Digest, Sha256};

/// Key for a read of a single transaction
pub fn transaction_key(organization_id: &str, transaction_id: &str) -> String {
    format!("{organization_id}:txn:{transaction_id}")
}

/// Key for a query result list
///
/// The serialized query is hashed so the key stays bounded regardless of
/// filter size. Identical serialized queries produce identical keys.
pub fn query_key(organization_id: &str, serialized_query: &str) -> String {
    format!("{organization_id}:query:{}", args_digest(serialized_query))
}

/// Pattern matching every key scoped to an organization
pub fn org_pattern(organization_id: &str) -> String {
    organization_id.to_string()
}

/// Pattern matching only query keys for an organization
pub fn query_pattern(organization_id: &str) -> String {
    format!("{organization_id}:query:")
}

fn args_digest(args: &str) -> String {
    if args.is_empty() {
        return "empty".to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(args.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..8]) // First 8 bytes = 16 hex chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_keys_are_deterministic() {
        let k1 = query_key("org-1", r#"{"transaction_type":"sale"}"#);
        let k2 = query_key("org-1", r#"{"transaction_type":"sale"}"#);
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_queries_different_keys() {
        let k1 = query_key("org-1", r#"{"transaction_type":"sale"}"#);
        let k2 = query_key("org-1", r#"{"transaction_type":"payment"}"#);
        assert_ne!(k1, k2);
    }

    #[test]
    fn empty_query_uses_sentinel() {
        assert!(query_key("org-1", "").ends_with(":query:empty"));
    }

    #[test]
    fn org_pattern_matches_both_key_kinds() {
        let q = query_key("org-1", "{}");
        let t = transaction_key("org-1", "txn-9");
        let pattern = org_pattern("org-1");
        assert!(q.contains(&pattern));
        assert!(t.contains(&pattern));
    }

    #[test]
    fn query_pattern_spares_transaction_keys() {
        let q = query_key("org-1", "{}");
        let t = transaction_key("org-1", "txn-9");
        let pattern = query_pattern("org-1");
        assert!(q.contains(&pattern));
        assert!(!t.contains(&pattern));
    }

    #[test]
    fn transaction_key_contains_both_ids() {
        let key = transaction_key("org-1", "txn-9");
        assert!(key.contains("org-1"));
        assert!(key.contains("txn-9"));
    }
}
