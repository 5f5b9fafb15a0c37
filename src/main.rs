//! hera-core - universal transaction service
//!
//! Six tables, one gateway, everything is a transaction.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hera_core::{
    cache::{spawn_cleanup_task, QueryCache},
    config::Args,
    gateway::HttpRpcGateway,
    server::{self, AppState},
    service::TransactionService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hera_core={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  HERA Core - Universal Transactions");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("RPC endpoint: {}", args.rpc_url);
    info!("Cache staleness: {} ms", args.cache_stale_ms);
    info!("Batch limit: {}", args.batch_limit);
    info!("Request timeout: {} ms", args.request_timeout_ms);
    info!("======================================");

    if args.dev_mode {
        warn!("Development mode enabled - RPC token is optional");
    }

    let service_config = args.service_config();

    // Wire the service: one gateway, one cache, one service per process
    let gateway = Arc::new(HttpRpcGateway::new(
        &args.rpc_url,
        args.rpc_token.clone(),
        args.request_timeout_ms,
    ));
    let cache = Arc::new(QueryCache::new(Duration::from_millis(args.cache_stale_ms)));
    spawn_cleanup_task(
        Arc::clone(&cache),
        Duration::from_secs(args.cache_cleanup_secs),
    );
    info!(
        "Query cache enabled ({} ms staleness, sweep every {} s)",
        args.cache_stale_ms, args.cache_cleanup_secs
    );

    let service = Arc::new(TransactionService::new(gateway, cache, service_config));

    let state = Arc::new(AppState { args, service });
    server::run(state).await?;

    Ok(())
}
