//! HTTP server setup and routing
//!
//! Axum server exposing the session lifecycle as REST endpoints plus an
//! SSE event stream.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::orchestrator::WorkoutOrchestrator;
use crate::resolver::TemplateResolver;
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub orchestrator: Arc<WorkoutOrchestrator>,
    pub resolver: Arc<dyn TemplateResolver>,
    pub user_identity: String,
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health and status
        .route("/health", get(super::handlers::health))
        .route("/status", get(super::handlers::status))
        // Setup
        .route("/session/start", post(super::handlers::start_session))
        .route("/session/templates", get(super::handlers::available_templates))
        .route("/session/select", post(super::handlers::select_template))
        .route("/session/retry", post(super::handlers::retry_setup))
        .route("/session/confirm", post(super::handlers::confirm_setup))
        .route("/session/begin", post(super::handlers::begin_session))
        // Set recording
        .route("/session/set/complete", post(super::handlers::complete_set))
        .route("/session/set/uncomplete", post(super::handlers::uncomplete_set))
        .route("/session/set/edit", post(super::handlers::edit_set))
        .route("/session/set/extra", post(super::handlers::add_extra_set))
        // Rest
        .route("/session/rest/skip", post(super::handlers::skip_rest))
        // Navigation
        .route("/session/exercise/next", post(super::handlers::next_exercise))
        .route("/session/exercise/previous", post(super::handlers::previous_exercise))
        .route("/session/exercise/jump", post(super::handlers::jump_to_exercise))
        // Exercise list edits
        .route("/session/exercise/add", post(super::handlers::add_exercise))
        .route("/session/exercise/substitute", post(super::handlers::substitute_exercise))
        .route("/session/exercise/remove", post(super::handlers::remove_exercise))
        .route("/session/exercise/move", post(super::handlers::move_exercise))
        // Lifecycle
        .route("/session/pause", post(super::handlers::pause))
        .route("/session/resume", post(super::handlers::resume))
        .route("/session/complete", post(super::handlers::complete_workout))
        .route("/session/cancel", post(super::handlers::cancel))
        .route("/session/publish", post(super::handlers::retry_publish))
        .route("/session/publish/dismiss", post(super::handlers::dismiss_publish_error))
        // Reads
        .route("/session/snapshot", get(super::handlers::snapshot))
        .route("/templates", get(super::handlers::list_templates))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        // Attach application context
        .with_state(ctx)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until shutdown
pub async fn run(
    config: Config,
    ctx: AppContext,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
