use crate::error::StoreError;
use crate::store::{read_json, write_json_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bookkeeping for incremental runs.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default)]
    pub last_successful_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_start_year: Option<i32>,
}

impl SyncState {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)
    }

    pub fn completed(now: DateTime<Utc>, start_year: i32) -> Self {
        Self {
            last_successful_run: Some(now),
            last_start_year: Some(start_year),
        }
    }
}
