//! Router setup with all API routes and middleware.

use std::future::Future;

use agri_core::error::AgriError;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Localhost origins on the configured port only.
    let origins: Vec<HeaderValue> = ["127.0.0.1", "localhost"]
        .iter()
        .filter_map(|host| format!("http://{}:{}", host, state.port).parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/control/task", post(handlers::submit_task))
        .route("/control/registry", get(handlers::list_registry))
        .route("/control/registry/reload", post(handlers::reload_registry))
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `host:port` until `shutdown` resolves.
pub async fn start_server<F>(
    host: &str,
    port: u16,
    state: AppState,
    shutdown: F,
) -> Result<(), AgriError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", host, port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Control API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
