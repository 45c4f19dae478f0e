use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::VerseError;
use crate::render::{VerseRenderer, parse_verse_page};
use crate::store::{ContentStore, VerseLayout};
use crate::types::DailyVerse;

/// Outcome of a successful create.
#[derive(Debug, Clone)]
pub struct CreatedVerse {
    pub display_date: String,
    pub path: String,
}

/// Daily verse operations over an injected [`ContentStore`].
#[derive(Clone)]
pub struct VerseService {
    store: Arc<dyn ContentStore>,
    renderer: Arc<VerseRenderer>,
    layout: VerseLayout,
}

impl VerseService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        renderer: Arc<VerseRenderer>,
        layout: VerseLayout,
    ) -> Self {
        Self {
            store,
            renderer,
            layout,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Existence check, render, write. The check and the write are separate
    /// remote calls; two concurrent creates for one date can both pass it.
    pub async fn create(&self, verse: &DailyVerse) -> Result<CreatedVerse, VerseError> {
        let display_date = verse.display_date();
        let path = self.layout.path_for(verse.date);

        if self.store.exists(&path).await? {
            return Err(VerseError::AlreadyExists(display_date));
        }

        let html = self.renderer.render(verse)?;
        let message = format!("Add daily verse for {display_date} via API");
        self.store.write(&path, &html, &message).await?;

        info!(path = %path, store = %self.store.describe(), "daily verse created");
        Ok(CreatedVerse { display_date, path })
    }

    /// Dates with a stored page, newest first. A missing directory means none.
    pub async fn existing_dates(&self) -> Result<Vec<NaiveDate>, VerseError> {
        let Some(entries) = self.store.list(self.layout.directory()).await? else {
            debug!(dir = %self.layout.directory(), "verse directory absent");
            return Ok(Vec::new());
        };

        let mut dates: Vec<NaiveDate> = entries
            .iter()
            .filter(|e| e.is_file)
            .filter_map(|e| VerseLayout::date_from_name(&e.name))
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }

    pub async fn latest_date(&self) -> Result<Option<NaiveDate>, VerseError> {
        Ok(self.existing_dates().await?.into_iter().next())
    }

    pub async fn by_date(&self, date: NaiveDate) -> Result<DailyVerse, VerseError> {
        let path = self.layout.path_for(date);
        let html = self
            .store
            .read(&path)
            .await?
            .ok_or_else(|| VerseError::NotFound(crate::types::format_display_date(date)))?;
        parse_verse_page(&html)
    }
}
