//! Response shapes for the REST endpoints the sync reads.
//!
//! Every nested field that GitHub may omit or null out is optional, so a
//! sparse payload deserializes instead of failing the whole page.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Account {
    pub fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("Bot")
    }

    pub fn is(&self, username: &str) -> bool {
        self.login.eq_ignore_ascii_case(username)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestLinks {
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

/// An issue or pull request returned by `/search/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub repository_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<Account>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<PullRequestLinks>,
}

impl SearchItem {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.pull_request.as_ref().and_then(|pr| pr.merged_at)
    }

    pub fn is_bot_authored(&self) -> bool {
        self.user.as_ref().is_some_and(Account::is_bot)
    }

    /// Parses `https://api.github.com/repos/{owner}/{name}`.
    pub fn repo_ref(&self) -> Option<RepoRef> {
        let mut parts = self.repository_url.trim_end_matches('/').rsplit('/');
        let name = parts.next()?;
        let owner = parts.next()?;
        if parts.next() != Some("repos") || owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(RepoRef::new(owner, name))
    }
}

#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl ToString, name: impl ToString) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    pub fn path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Identity of one pull request or issue inside a repository.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct PullRef {
    pub repo: RepoRef,
    pub number: u64,
}

impl PullRef {
    pub fn new(repo: RepoRef, number: u64) -> Self {
        Self { repo, number }
    }

    pub fn cache_key(&self) -> String {
        format!("{}#{}", self.repo, self.number)
    }

    pub fn commits_path(&self) -> String {
        format!("{}/pulls/{}/commits", self.repo.path(), self.number)
    }

    pub fn reviews_path(&self) -> String {
        format!("{}/pulls/{}/reviews", self.repo.path(), self.number)
    }

    pub fn comments_path(&self) -> String {
        format!("{}/issues/{}/comments", self.repo.path(), self.number)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub user: Option<Account>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn is_pending(&self) -> bool {
        self.state.eq_ignore_ascii_case("PENDING")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub user: Option<Account>,
    pub created_at: DateTime<Utc>,
}

impl IssueComment {
    pub fn is_by(&self, username: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.is(username))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitData {
    #[serde(default)]
    pub author: Option<GitSignature>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    pub sha: String,
}

/// One entry of `/repos/{owner}/{repo}/pulls/{number}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitEntry {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub author: Option<Account>,
    #[serde(default)]
    pub commit: CommitData,
    #[serde(default)]
    pub parents: Vec<ParentRef>,
}

impl CommitEntry {
    pub fn author_email(&self) -> Option<&str> {
        self.commit.author.as_ref()?.email.as_deref()
    }

    pub fn author_name(&self) -> Option<&str> {
        self.commit.author.as_ref()?.name.as_deref()
    }

    pub fn author_date(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref()?.date
    }
}
