use crate::server::state::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

/// Liveness plus the live channel's current position
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.channel.snapshot().await;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "started_at": state.started_at_utc.to_rfc3339(),
        "sequence": snapshot.sequence,
        "media_sequence": snapshot.media_sequence,
        "ticks": snapshot.ticks,
    }))
}
