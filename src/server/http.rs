//! HTTP server implementation
//!
//! Hyper http1 with TokioIo; one spawned task per connection. Identity for
//! the /v1/transactions surface comes from the `X-Organization-Id` and
//! `X-Actor-Id` headers and is checked in the router, so no handler ever
//! sees an unauthenticated request.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::routes;
use crate::service::{ActorScope, TransactionService};
use crate::types::{HeraError, AUTH_CONTEXT_ERROR};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub service: Arc<TransactionService>,
}

pub async fn run(state: Arc<AppState>) -> Result<(), HeraError> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| HeraError::Config(format!("Cannot bind {}: {e}", state.args.listen)))?;

    info!(
        "hera-core listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("{} {}", method, path);

    let response = match (method.clone(), path.as_str()) {
        // Observability
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health::health_check(state)
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::health::readiness_check(state)
        }
        (Method::GET, "/version") => routes::health::version_info(),
        (Method::GET, "/v1/cache/stats") => routes::transactions::cache_stats(state),

        (Method::OPTIONS, _) => preflight_response(),

        // Runtime configuration
        (Method::PUT, "/v1/config") => {
            let body = read_body(req).await?;
            routes::transactions::update_config(state, body)
        }

        // Transaction CRUD
        (Method::POST, "/v1/transactions") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let idempotency_key = header_value(&req, "Idempotency-Key");
            let body = read_body(req).await?;
            routes::transactions::create(state, scope, idempotency_key, body).await
        }
        (Method::GET, "/v1/transactions") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let query_string = req.uri().query().map(String::from);
            routes::transactions::list(state, scope, query_string.as_deref()).await
        }
        (Method::POST, "/v1/transactions/query") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let body = read_body(req).await?;
            routes::transactions::query(state, scope, body).await
        }
        (Method::POST, "/v1/transactions/batch") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let body = read_body(req).await?;
            routes::transactions::batch(state, scope, body).await
        }
        (Method::GET, p) if p.starts_with("/v1/transactions/") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let id = p.trim_start_matches("/v1/transactions/").to_string();
            routes::transactions::get(state, scope, &id).await
        }
        (Method::PUT, p) if p.starts_with("/v1/transactions/") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let id = p.trim_start_matches("/v1/transactions/").to_string();
            let body = read_body(req).await?;
            routes::transactions::update(state, scope, &id, body).await
        }
        (Method::DELETE, p) if p.starts_with("/v1/transactions/") => {
            let Some(scope) = actor_scope(&req) else {
                return Ok(to_boxed(unauthorized_response()));
            };
            let id = p.trim_start_matches("/v1/transactions/").to_string();
            let body = read_body(req).await?;
            routes::transactions::delete(state, scope, &id, body).await
        }

        _ => not_found_response(&path),
    };

    Ok(to_boxed(response))
}

/// Extract the actor scope from identity headers; None means 401
fn actor_scope(req: &Request<Incoming>) -> Option<ActorScope> {
    let organization_id = header_value(req, "X-Organization-Id")?;
    let actor_user_id = header_value(req, "X-Actor-Id")?;
    let scope = ActorScope::new(organization_id, actor_user_id);
    scope.is_complete().then_some(scope)
}

fn header_value(req: &Request<Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

async fn read_body(req: Request<Incoming>) -> Result<Bytes, hyper::Error> {
    Ok(req.into_body().collect().await?.to_bytes())
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn unauthorized_response() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "success": false,
        "error": AUTH_CONTEXT_ERROR,
    });

    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
