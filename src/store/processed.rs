use crate::error::StoreError;
use crate::store::{read_json, write_json_atomic};
use indexmap::IndexSet;
use std::path::Path;
use tokio::sync::Mutex;

/// URLs that later passes never examine again: authored-and-merged PRs and
/// items skipped as self-owned, bot-authored or private.
#[derive(Debug, Default)]
pub struct ProcessedPrs {
    urls: Mutex<IndexSet<String>>,
}

impl ProcessedPrs {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let urls: IndexSet<String> = read_json(path)?;
        tracing::debug!(urls = urls.len(), "Loaded processed set");
        Ok(Self {
            urls: Mutex::new(urls),
        })
    }

    /// Written sorted so the file diffs cleanly between runs.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut urls: Vec<String> = self.urls.lock().await.iter().cloned().collect();
        urls.sort();
        write_json_atomic(path, &urls)
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.urls.lock().await.contains(url)
    }

    /// Returns `false` if the URL was already recorded.
    pub async fn insert(&self, url: impl ToString) -> bool {
        self.urls.lock().await.insert(url.to_string())
    }

    pub async fn len(&self) -> usize {
        self.urls.lock().await.len()
    }
}
