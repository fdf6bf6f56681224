pub mod handlers;
pub mod headers;
pub mod state;

use crate::config::Config;
use crate::live::LiveChannel;
use axum::{Router, middleware, routing::get};
use state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

/// Build the router: static roots with live headers plus the service routes.
pub fn build_router(config: Config, channel: Arc<LiveChannel>) -> Router {
    let state = AppState::new(config, channel);

    let static_roots = Router::new()
        .nest_service("/media", ServeDir::new(&state.config.media_dir))
        .nest_service("/ads", ServeDir::new(&state.config.ads_dir))
        .nest_service("/manifests", ServeDir::new(&state.config.manifests_dir))
        .layer(middleware::from_fn(headers::live_headers));

    Router::new()
        .route("/", get(handlers::index::index))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .merge(static_roots)
        .layer(middleware::from_fn(headers::version_header))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum HTTP server and serve until `shutdown` fires
pub async fn start(
    config: Config,
    channel: Arc<LiveChannel>,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr();

    for root in [&config.media_dir, &config.ads_dir, &config.manifests_dir] {
        if !root.is_dir() {
            info!("Static root {} does not exist yet", root.display());
        }
    }

    let app = build_router(config, channel);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
