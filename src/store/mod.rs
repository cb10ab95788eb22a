//! JSON state files kept between runs.
//!
//! Every store loads as empty when its file is missing and is replaced
//! all-or-nothing through a temp file in the same directory.

pub mod commit_cache;
pub mod processed;
pub mod sync_state;

pub use commit_cache::CommitDetailCache;
pub use processed::ProcessedPrs;
pub use sync_state::SyncState;

use crate::error::StoreError;
use crate::model::ContributionDataset;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const PROCESSED_FILE: &str = "processed_prs.json";
const COMMIT_CACHE_FILE: &str = "commit_cache.json";
const DATASET_FILE: &str = "contributions.json";
const SYNC_STATE_FILE: &str = "sync_state.json";

/// File locations under the data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn processed(&self) -> PathBuf {
        self.root.join(PROCESSED_FILE)
    }

    pub fn commit_cache(&self) -> PathBuf {
        self.root.join(COMMIT_CACHE_FILE)
    }

    pub fn dataset(&self) -> PathBuf {
        self.root.join(DATASET_FILE)
    }

    pub fn sync_state(&self) -> PathBuf {
        self.root.join(SYNC_STATE_FILE)
    }
}

pub fn load_dataset(path: &Path) -> Result<ContributionDataset, StoreError> {
    read_json(path)
}

pub fn save_dataset(path: &Path, dataset: &ContributionDataset) -> Result<(), StoreError> {
    write_json_atomic(path, dataset)
}

pub(crate) fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No state file yet, starting empty");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&data).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let io_error = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let data = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_error)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_error)?;
    tmp.write_all(&data).map_err(io_error)?;
    tmp.flush().map_err(io_error)?;
    tmp.persist(path).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
