use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ContentStore, StoreEntry};
use crate::error::VerseError;

/// In-process [`ContentStore`] keyed by full path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<String, StoredFile>>,
    remote_calls: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub content: String,
    pub message: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file without counting it as a remote call.
    pub async fn seed(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.write().await.insert(
            path.into(),
            StoredFile {
                content: content.into(),
                message: "seed".to_string(),
            },
        );
    }

    pub async fn get(&self, path: &str) -> Option<StoredFile> {
        self.files.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Number of store operations performed through the trait.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<String>, VerseError> {
        self.count();
        Ok(self.files.read().await.get(path).map(|f| f.content.clone()))
    }

    async fn write(&self, path: &str, content: &str, message: &str) -> Result<(), VerseError> {
        self.count();
        let mut files = self.files.write().await;
        if files.contains_key(path) {
            // Mirrors GitHub refusing a create without the existing blob sha.
            return Err(VerseError::Upstream {
                status: axum::http::StatusCode::UNPROCESSABLE_ENTITY,
                message: format!("\"sha\" wasn't supplied for {path}"),
            });
        }
        files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                message: message.to_string(),
            },
        );
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Option<Vec<StoreEntry>>, VerseError> {
        self.count();
        let prefix = format!("{}/", dir.trim_matches('/'));
        let files = self.files.read().await;
        let entries: Vec<StoreEntry> = files
            .keys()
            .filter_map(|path| {
                let name = path.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| StoreEntry {
                    name: name.to_string(),
                    path: path.clone(),
                    is_file: true,
                })
            })
            .collect();
        Ok((!entries.is_empty()).then_some(entries))
    }

    async fn ping(&self) -> Result<(), VerseError> {
        self.count();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
