use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::router::VerseState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET / -> reports whether the content store answers a branch lookup.
pub async fn health_check(State(state): State<VerseState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.verses() {
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "MACE EU Verse Generator Backend is running, but GitHub client not initialized (check env vars).".to_string(),
        ),
        Ok(verses) => match verses.store().ping().await {
            Ok(()) => (
                StatusCode::OK,
                "MACE EU Verse Generator Backend is running and connected to GitHub.".to_string(),
            ),
            Err(e) => {
                warn!(error = %e, "health check: content store unreachable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!(
                        "MACE EU Verse Generator Backend is running, but GitHub connection failed: {e}"
                    ),
                )
            }
        },
    };
    (code, Json(HealthResponse { status }))
}
