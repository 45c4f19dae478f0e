use axum::{
    Json,
    extract::{FromRequest, Request},
};

use crate::error::VerseError;
use crate::types::{DailyVerse, VerseForm};

/// JSON body of a create request, checked for required fields and a
/// well-formed date before the handler runs.
pub struct ValidatedVerse(pub DailyVerse);

impl<S> FromRequest<S> for ValidatedVerse
where
    S: Send + Sync,
{
    type Rejection = VerseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(form) = Json::<VerseForm>::from_request(req, state)
            .await
            .map_err(|rejection| VerseError::InvalidBody(rejection.body_text()))?;
        Ok(ValidatedVerse(DailyVerse::try_from(form)?))
    }
}
