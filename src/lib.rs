//! HERA Core - universal transaction service
//!
//! A thin, disciplined core over the six universal tables. Every business
//! event is a transaction with lines; every call is scoped to an
//! organization and an actor; every read may be served from a short-lived
//! cache that writes invalidate coarsely.
//!
//! ## Services
//!
//! - **Contracts**: The six table shapes and the SmartCode discipline
//! - **Gateway**: JSON-RPC client for the `txn_crud` persistence function
//! - **Cache**: In-memory TTL cache with substring invalidation
//! - **Service**: CRUD + batch over transactions, uniform envelopes
//! - **Context**: Session-bound, fail-closed access for call sites
//! - **Server**: HTTP surface with header-based identity

pub mod cache;
pub mod config;
pub mod context;
pub mod contracts;
pub mod gateway;
pub mod routes;
pub mod server;
pub mod service;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HeraError, Result};
