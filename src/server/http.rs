//! HTTP routes for issuing and resolving share links

use crate::auth::{ApiKeys, Role, TokenCodec, TokenPayload, TtlHours};
use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::links::ShareLink;
use crate::server::error::ApiError;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec<Arc<dyn Clock>>>,
    pub api_keys: Arc<ApiKeys>,
    pub public_url: String,
    pub default_ttl: TtlHours,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec: Arc::new(TokenCodec::with_clock(config.signing_key, clock)),
            api_keys: Arc::new(config.api_keys),
            public_url: config.public_url,
            default_ttl: config.default_ttl,
        }
    }
}

/// Body of a share-token request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub ttl_hours: Option<TtlHours>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub token: String,
    pub url: String,
    pub resource_id: u64,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub token: Option<String>,
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/objects/{id}/share-token", post(issue_handler))
        .route("/api/share/resolve", get(resolve_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn authorize_issuer(api_keys: &ApiKeys, headers: &HeaderMap) -> Result<Role, ApiError> {
    let presented = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    let role = api_keys.authenticate(presented).ok_or(ApiError::Unauthorized)?;

    if !role.can_issue_links() {
        return Err(ApiError::Forbidden(role));
    }
    Ok(role)
}

async fn issue_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let role = match authorize_issuer(&state.api_keys, &headers) {
        Ok(role) => role,
        Err(e) => {
            warn!(resource_id = %raw_id, error = %e, "Share token request denied");
            return Err(e);
        }
    };

    let resource_id: u64 = raw_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid object id: {}", raw_id)))?;

    let request: IssueRequest = if body.iter().all(u8::is_ascii_whitespace) {
        IssueRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))?
    };

    let ttl = request.ttl_hours.unwrap_or(state.default_ttl);

    let token = state.codec.issue(resource_id, ttl.to_duration())?;
    let link = ShareLink::new(&state.public_url, &token);

    info!(
        resource_id,
        role = %role,
        ttl = %ttl,
        expires_at = token.expires_at(),
        "Issued share token"
    );

    let response = IssueResponse {
        resource_id: token.resource_id(),
        expires_at: token.expires_at(),
        url: link.to_string(),
        token: token.into_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn resolve_handler(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<TokenPayload>, ApiError> {
    let token = params.token.ok_or(ApiError::InvalidToken)?;
    let payload = state.codec.verify(&token)?;

    debug!(resource_id = payload.resource_id, "Resolved share token");
    Ok(Json(payload))
}

/// Serve the share-link API until Ctrl+C or SIGTERM
pub async fn run(config: ServiceConfig) -> Result<()> {
    let bind_addr = config.bind_addr;
    if config.api_keys.is_empty() {
        warn!("No API keys configured; share tokens can only be resolved, not issued");
    }

    let app = create_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!(addr = %bind_addr, "ApolloView share service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("ApolloView share service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
