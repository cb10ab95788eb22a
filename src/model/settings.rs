use crate::error::SyncError;
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SINCE_YEAR: i32 = 2019;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// How loosely commit authors are matched against the tracked user.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum Strictness {
    /// Login, noreply address and co-author trailer only.
    Strict,
    /// Additionally accepts the username anywhere in the author email or name.
    #[default]
    Loose,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub username: String,
    pub token: String,
    pub api_url: String,
    pub since_year: i32,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub strictness: Strictness,
    pub concurrency: usize,
    pub force_full: bool,
    pub write_report: bool,
}

// New
impl Settings {
    pub fn new(username: impl ToString, token: Option<String>) -> Result<Self, SyncError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(SyncError::MissingCredential)?;
        let username = username.to_string();
        if username.trim().is_empty() {
            return Err(SyncError::InvalidSettings("username is empty".into()));
        }
        Ok(Self {
            username: username.trim().to_string(),
            token,
            api_url: DEFAULT_API_URL.to_string(),
            since_year: DEFAULT_SINCE_YEAR,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("contributions"),
            strictness: Strictness::default(),
            concurrency: DEFAULT_CONCURRENCY,
            force_full: false,
            write_report: true,
        })
    }
}

// Validation
impl Settings {
    pub fn validate(self, current_year: i32) -> Result<Self, SyncError> {
        if self.since_year > current_year {
            return Err(SyncError::InvalidSettings(format!(
                "since year {} is after the current year {}",
                self.since_year, current_year
            )));
        }
        if self.concurrency == 0 {
            return Err(SyncError::InvalidSettings(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(self)
    }
}
