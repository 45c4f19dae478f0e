//! Content store: the remote repository that holds one rendered page per date.
//!
//! Layout:
//! - `github.rs`: GitHub REST client (contents + git trees) used in production
//! - `memory.rs`: in-process store with the same contract, used by tests

pub mod github;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::VerseError;
use crate::types::verse::FILE_DATE_FORMAT;

pub use github::GithubStore;
pub use memory::MemoryStore;

const FILE_PREFIX: &str = "bible_verse_";
const FILE_SUFFIX: &str = ".html";

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub name: String,
    pub path: String,
    pub is_file: bool,
}

/// File operations against a single branch of one repository.
///
/// "Not found" is reported as `Ok(None)`; every other failure is an `Err`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<String>, VerseError>;

    async fn write(&self, path: &str, content: &str, message: &str) -> Result<(), VerseError>;

    async fn list(&self, dir: &str) -> Result<Option<Vec<StoreEntry>>, VerseError>;

    /// Confirms the configured branch is reachable.
    async fn ping(&self) -> Result<(), VerseError>;

    /// Human-readable name of the backing location, for logs and health output.
    fn describe(&self) -> String;

    async fn exists(&self, path: &str) -> Result<bool, VerseError> {
        Ok(self.read(path).await?.is_some())
    }
}

/// Maps dates to file paths inside the verse directory and back.
#[derive(Debug, Clone)]
pub struct VerseLayout {
    directory: String,
}

impl VerseLayout {
    pub fn new(directory: impl Into<String>) -> Self {
        let directory = directory.into().trim_matches('/').to_string();
        Self { directory }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// `daily-verses/bible_verse_2025-08-05.html`
    pub fn path_for(&self, date: NaiveDate) -> String {
        let name = format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format(FILE_DATE_FORMAT));
        if self.directory.is_empty() {
            name
        } else {
            format!("{}/{}", self.directory, name)
        }
    }

    /// Inverse of [`VerseLayout::path_for`] on the file name; `None` for unrelated files.
    pub fn date_from_name(name: &str) -> Option<NaiveDate> {
        let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        NaiveDate::parse_from_str(stem, FILE_DATE_FORMAT).ok()
    }
}
