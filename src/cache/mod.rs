//! Response caching for the transaction service
//!
//! A short-TTL cache in front of the remote CRUD gateway. Keys are
//! organization-scoped (`keys`), values are immutable JSON payloads with a
//! staleness window (`ttl`). Writes never patch cached entries; they
//! invalidate by substring and let the next read repopulate.

pub mod keys;
pub mod ttl;

pub use ttl::{spawn_cleanup_task, CacheStatsReport, QueryCache, DEFAULT_TTL};
