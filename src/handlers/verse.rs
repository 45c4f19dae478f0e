use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::error::VerseError;
use crate::middleware::verse_request::ValidatedVerse;
use crate::router::VerseState;
use crate::types::{DailyVerse, format_display_date, parse_display_date};

#[derive(Debug, Serialize)]
pub struct CreateVerseResponse {
    pub success: bool,
    pub message: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct VerseDatesResponse {
    pub success: bool,
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VerseContentResponse {
    pub success: bool,
    pub verse: DailyVerse,
}

#[derive(Debug, Serialize)]
pub struct LatestDateResponse {
    pub success: bool,
    pub latest_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// POST /generate_and_upload_verse
///
/// The body is validated by [`ValidatedVerse`] before the store-configured
/// check, so a bad body gets 400 even when the store is unconfigured.
pub async fn generate_and_upload_verse(
    State(state): State<VerseState>,
    ValidatedVerse(verse): ValidatedVerse,
) -> Result<Json<CreateVerseResponse>, VerseError> {
    let created = state.verses()?.create(&verse).await?;
    Ok(Json(CreateVerseResponse {
        success: true,
        message: format!(
            "Verse for {} successfully created and pushed to GitHub.",
            created.display_date
        ),
        path: created.path,
    }))
}

/// GET /get_existing_verse_dates
pub async fn get_existing_verse_dates(
    State(state): State<VerseState>,
) -> Result<Json<VerseDatesResponse>, VerseError> {
    let dates = state.verses()?.existing_dates().await?;
    Ok(Json(VerseDatesResponse {
        success: true,
        dates: dates.into_iter().map(format_display_date).collect(),
    }))
}

/// GET /get_verse_content_by_date?date=August%2005,%202025
pub async fn get_verse_content_by_date(
    State(state): State<VerseState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<VerseContentResponse>, VerseError> {
    let raw = query
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| VerseError::MissingFields("date".to_string()))?;
    let date = parse_display_date(&raw)?;
    let verse = state.verses()?.by_date(date).await?;
    Ok(Json(VerseContentResponse {
        success: true,
        verse,
    }))
}

/// GET /get_latest_verse_date
pub async fn get_latest_verse_date(
    State(state): State<VerseState>,
) -> Result<Json<LatestDateResponse>, VerseError> {
    let latest = state.verses()?.latest_date().await?;
    Ok(Json(LatestDateResponse {
        success: true,
        latest_date: latest.map(format_display_date),
    }))
}
