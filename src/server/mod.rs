//! HTTP server
//!
//! Exposes the chat relay and session storage as a JSON API:
//! - GET /api/status - Health check
//! - POST/GET /api/sessions - Create and list sessions
//! - GET/PUT/DELETE /api/sessions/{id} - One session's metadata
//! - GET/POST /api/sessions/{id}/messages - History, and saving a message
//! - POST /api/message - Run one conversational turn

pub mod error;
mod handlers;
pub mod types;
pub mod validation;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::relay::ChatRelay;
use crate::store::SessionStore;

pub use error::{ApiError, ApiResult};

/// Max request body size (a 1024-char message plus JSON overhead fits easily)
const MAX_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// Server State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub relay: ChatRelay,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, relay: ChatRelay) -> Self {
        Self { store, relay }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// CORS for the configured origin; `*` allows any
pub fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin == "*" {
        return Ok(cors.allow_origin(Any));
    }

    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid CORS origin: {}", origin))?;
    Ok(cors.allow_origin(origin))
}

/// Create the router with all endpoints
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/status", get(handlers::status_handler))
        .route(
            "/api/sessions",
            post(handlers::create_session_handler).get(handlers::list_sessions_handler),
        )
        .route(
            "/api/sessions/{id}",
            get(handlers::get_session_handler)
                .put(handlers::update_session_handler)
                .delete(handlers::delete_session_handler),
        )
        .route(
            "/api/sessions/{id}/messages",
            get(handlers::get_messages_handler).post(handlers::save_message_handler),
        )
        .route("/api/message", post(handlers::send_message_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until the process is stopped
pub async fn run(bind_address: &str, state: AppState, cors: CorsLayer) -> Result<()> {
    let model = state.relay.provider().model().to_string();
    let app = create_router(state, cors);

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Server listening on http://{}", listener.local_addr()?);
    info!("Model:        {}", model);

    axum::serve(listener, app).await?;
    Ok(())
}
