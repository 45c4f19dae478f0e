use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{error, warn};

#[derive(Debug, ThisError)]
pub enum VerseError {
    #[error("Missing required fields in request data: {0}")]
    MissingFields(String),

    #[error("Invalid date format: {0}. Expected 'Month Day, Year'.")]
    InvalidDate(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(
        "A daily verse for {0} already exists. To update it, use a specific update mechanism (not this endpoint)."
    )]
    AlreadyExists(String),

    #[error("No daily verse found for {0}.")]
    NotFound(String),

    #[error("Backend not connected to GitHub repository. Check environment variables.")]
    StoreNotConfigured,

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("GitHub API error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Unexpected response from GitHub: {0}")]
    UnexpectedResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Stored file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Could not parse stored verse page: {0}")]
    Parse(String),

    #[error("Invalid GitHub API base URL: {0}")]
    InvalidApiBase(String),
}

impl VerseError {
    pub fn status(&self) -> StatusCode {
        match self {
            VerseError::MissingFields(_)
            | VerseError::InvalidDate(_)
            | VerseError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            VerseError::AlreadyExists(_) => StatusCode::CONFLICT,
            VerseError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for VerseError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            VerseError::Reqwest(_)
            | VerseError::Upstream { .. }
            | VerseError::UnexpectedResponse(_)
            | VerseError::Base64(_)
            | VerseError::Utf8(_) => format!("GitHub content store failure: {self}"),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            error!(status = %status, error = %self, "request failed");
        } else {
            warn!(status = %status, error = %self, "request rejected");
        }

        (
            status,
            Json(ApiErrorResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

/// Body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub message: String,
}
