//! Configuration for the HERA transaction service
//!
//! CLI arguments and environment variable handling using clap for the
//! binary, plus `TransactionServiceConfig` for library consumers that
//! construct the service directly.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

/// HERA Core - universal transaction service
///
/// Every business event in a HERA deployment flows through the six
/// universal tables; this service is the choke point for the transactions
/// pair (transactions + transaction_lines).
#[derive(Parser, Debug, Clone)]
#[command(name = "hera-core")]
#[command(about = "Universal transaction service for the HERA six-table architecture")]
pub struct Args {
    /// Unique node identifier for this service instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Remote CRUD RPC endpoint (the system of record)
    /// All CREATE/READ/UPDATE/DELETE/QUERY actions are POSTed here
    #[arg(long, env = "RPC_URL", default_value = "http://localhost:54321/rpc/txn_crud")]
    pub rpc_url: String,

    /// Bearer token for the RPC endpoint (optional in dev mode)
    #[arg(long, env = "RPC_TOKEN")]
    pub rpc_token: Option<String>,

    /// Enable development mode (missing RPC token tolerated)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Cache staleness window in milliseconds
    #[arg(long, env = "CACHE_STALE_MS", default_value = "300000")]
    pub cache_stale_ms: u64,

    /// Whether queries include transaction lines by default
    #[arg(long, env = "INCLUDE_LINES", default_value = "true")]
    pub include_lines: bool,

    /// Maximum operations accepted in a single batch
    #[arg(long, env = "BATCH_LIMIT", default_value = "50")]
    pub batch_limit: usize,

    /// Per-call timeout for gateway requests in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Interval between cache expiry sweeps in seconds
    #[arg(long, env = "CACHE_CLEANUP_SECS", default_value = "60")]
    pub cache_cleanup_secs: u64,
}

impl Args {
    /// Build the service configuration from CLI/env arguments
    pub fn service_config(&self) -> TransactionServiceConfig {
        TransactionServiceConfig {
            cache_stale_ms: self.cache_stale_ms,
            include_lines: self.include_lines,
            log_level: self.log_level.clone(),
            batch_limit: self.batch_limit,
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.rpc_token.is_none() {
            return Err("RPC_TOKEN is required in production mode".to_string());
        }

        if self.batch_limit == 0 {
            return Err("BATCH_LIMIT must be at least 1".to_string());
        }

        if self.rpc_url.is_empty() {
            return Err("RPC_URL must not be empty".to_string());
        }

        Ok(())
    }
}

/// Runtime configuration for `TransactionService`
///
/// Mutable at runtime via `TransactionService::update_config`; concurrent
/// reconfiguration is unguarded beyond the lock, last write wins.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionServiceConfig {
    /// How long cached reads stay servable, in milliseconds (default 5 minutes)
    pub cache_stale_ms: u64,
    /// Whether QUERY/READ include transaction lines unless overridden
    pub include_lines: bool,
    /// Log level (error, warn, info, debug)
    pub log_level: String,
    /// Maximum operations accepted in a single batch
    pub batch_limit: usize,
    /// Per-call timeout applied by the HTTP gateway, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for TransactionServiceConfig {
    fn default() -> Self {
        Self {
            cache_stale_ms: 5 * 60 * 1000,
            include_lines: true,
            log_level: "info".to_string(),
            batch_limit: 50,
            request_timeout_ms: 30_000,
        }
    }
}

impl TransactionServiceConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CACHE_STALE_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.cache_stale_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("INCLUDE_LINES") {
            if let Ok(flag) = val.parse::<bool>() {
                config.include_lines = flag;
            }
        }

        if let Ok(val) = std::env::var("LOG_LEVEL") {
            config.log_level = val;
        }

        if let Ok(val) = std::env::var("BATCH_LIMIT") {
            if let Ok(limit) = val.parse::<usize>() {
                config.batch_limit = limit;
            }
        }

        if let Ok(val) = std::env::var("REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.request_timeout_ms = ms;
            }
        }

        config
    }

    /// Apply a partial override, field by field
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(ms) = patch.cache_stale_ms {
            self.cache_stale_ms = ms;
        }
        if let Some(flag) = patch.include_lines {
            self.include_lines = flag;
        }
        if let Some(level) = patch.log_level {
            self.log_level = level;
        }
        if let Some(limit) = patch.batch_limit {
            self.batch_limit = limit;
        }
        if let Some(ms) = patch.request_timeout_ms {
            self.request_timeout_ms = ms;
        }
    }
}

/// Partial configuration override for `update_config`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub cache_stale_ms: Option<u64>,
    pub include_lines: Option<bool>,
    pub log_level: Option<String>,
    pub batch_limit: Option<usize>,
    pub request_timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_args() -> Args {
        Args::parse_from(["hera-core", "--dev-mode"])
    }

    #[test]
    fn defaults_match_contract() {
        let config = TransactionServiceConfig::default();
        assert_eq!(config.cache_stale_ms, 300_000);
        assert!(config.include_lines);
        assert_eq!(config.batch_limit, 50);
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut config = TransactionServiceConfig::default();
        config.apply(ConfigPatch {
            batch_limit: Some(10),
            ..Default::default()
        });
        assert_eq!(config.batch_limit, 10);
        assert_eq!(config.cache_stale_ms, 300_000);
    }

    #[test]
    fn from_env_reads_and_ignores_unparsable() {
        std::env::set_var("CACHE_STALE_MS", "7500");
        std::env::set_var("BATCH_LIMIT", "75");
        std::env::set_var("INCLUDE_LINES", "false");

        let config = TransactionServiceConfig::from_env();
        assert_eq!(config.cache_stale_ms, 7500);
        assert_eq!(config.batch_limit, 75);
        assert!(!config.include_lines);

        // Unparsable values keep the default rather than panicking
        std::env::set_var("CACHE_STALE_MS", "soon");
        let config = TransactionServiceConfig::from_env();
        assert_eq!(config.cache_stale_ms, 300_000);

        std::env::remove_var("CACHE_STALE_MS");
        std::env::remove_var("BATCH_LIMIT");
        std::env::remove_var("INCLUDE_LINES");
    }

    #[test]
    fn validate_requires_token_in_production() {
        let mut args = dev_args();
        args.dev_mode = false;
        assert!(args.validate().is_err());

        args.rpc_token = Some("service-role-key".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_limit() {
        let mut args = dev_args();
        args.batch_limit = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn args_feed_service_config() {
        let args = Args::parse_from([
            "hera-core",
            "--dev-mode",
            "--batch-limit",
            "25",
            "--cache-stale-ms",
            "1000",
        ]);
        let config = args.service_config();
        assert_eq!(config.batch_limit, 25);
        assert_eq!(config.cache_stale_ms, 1000);
    }
}
