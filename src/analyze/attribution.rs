use crate::github::CommitEntry;
use crate::model::Strictness;
use chrono::{DateTime, Utc};

const MERGE_PREFIXES: [&str; 4] = [
    "Merge branch",
    "Merge pull request",
    "Merge remote-tracking branch",
    "Merge tag",
];
const CO_AUTHOR_TRAILER: &str = "co-authored-by:";
const NOREPLY_HOST_PREFIX: &str = "users.noreply.";

/// Earliest authored commit and authored-commit count for one pull request.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct CommitSummary {
    pub first_commit_date: Option<DateTime<Utc>>,
    pub commit_count: u32,
}

/// Decides whether a commit counts as authored by the tracked user.
#[derive(Debug, Clone)]
pub struct Attributor {
    username: String,
    strictness: Strictness,
}

impl Attributor {
    pub fn new(username: impl ToString, strictness: Strictness) -> Self {
        Self {
            username: username.to_string().to_lowercase(),
            strictness,
        }
    }

    /// Branch-sync merges would inflate counts, so they never attribute.
    pub fn is_merge_commit(commit: &CommitEntry) -> bool {
        commit.parents.len() > 1
            || MERGE_PREFIXES
                .iter()
                .any(|prefix| commit.commit.message.starts_with(prefix))
    }

    /// First matching heuristic wins; missing fields simply do not match.
    pub fn is_authored_by(&self, commit: &CommitEntry) -> bool {
        if self.username.is_empty() {
            return false;
        }
        if commit
            .author
            .as_ref()
            .is_some_and(|author| author.login.to_lowercase() == self.username)
        {
            return true;
        }

        let email = commit.author_email().map(str::to_lowercase);
        if email.as_deref().is_some_and(|e| self.is_noreply_address(e)) {
            return true;
        }

        if self.strictness == Strictness::Loose {
            if email.as_deref().is_some_and(|e| e.contains(&self.username)) {
                return true;
            }
            if commit
                .author_name()
                .is_some_and(|name| name.to_lowercase().contains(&self.username))
            {
                return true;
            }
        }

        self.has_co_author_trailer(&commit.commit.message)
    }

    pub fn summarize(&self, commits: &[CommitEntry]) -> CommitSummary {
        commits
            .iter()
            .filter(|commit| !Self::is_merge_commit(commit))
            .filter(|commit| self.is_authored_by(commit))
            // Undated commits are not counted, so a positive count always has a date.
            .filter_map(|commit| commit.author_date())
            .fold(CommitSummary::default(), |mut acc, date| {
                acc.commit_count += 1;
                acc.first_commit_date = Some(acc.first_commit_date.map_or(date, |current| current.min(date)));
                acc
            })
    }

    /// `{id}+{username}@users.noreply.<host>` or legacy `{username}@users.noreply.<host>`.
    fn is_noreply_address(&self, email: &str) -> bool {
        let Some((local, host)) = email.split_once('@') else {
            return false;
        };
        if !host.starts_with(NOREPLY_HOST_PREFIX) {
            return false;
        }
        match local.split_once('+') {
            Some((id, name)) => {
                !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && name == self.username
            }
            None => local == self.username,
        }
    }

    fn has_co_author_trailer(&self, message: &str) -> bool {
        message.lines().any(|line| {
            let line = line.trim().to_lowercase();
            line.strip_prefix(CO_AUTHOR_TRAILER)
                .is_some_and(|value| value.contains(&self.username))
        })
    }
}
