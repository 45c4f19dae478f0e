use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::VerseError;
use crate::handlers::health::health_check;
use crate::handlers::verse::{
    generate_and_upload_verse, get_existing_verse_dates, get_latest_verse_date,
    get_verse_content_by_date,
};
use crate::service::VerseService;

/// Shared router state. `verses` is `None` when the content store could not be
/// configured; store-backed routes then answer 500.
#[derive(Clone)]
pub struct VerseState {
    verses: Option<Arc<VerseService>>,
}

impl VerseState {
    pub fn new(verses: VerseService) -> Self {
        Self {
            verses: Some(Arc::new(verses)),
        }
    }

    pub fn unconfigured() -> Self {
        Self { verses: None }
    }

    pub fn verses(&self) -> Result<&VerseService, VerseError> {
        self.verses.as_deref().ok_or(VerseError::StoreNotConfigured)
    }
}

pub fn verse_router(state: VerseState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/generate_and_upload_verse", post(generate_and_upload_verse))
        .route("/get_existing_verse_dates", get(get_existing_verse_dates))
        .route("/get_verse_content_by_date", get(get_verse_content_by_date))
        .route("/get_latest_verse_date", get(get_latest_verse_date))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
