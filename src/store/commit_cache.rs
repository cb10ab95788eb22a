use crate::analyze::attribution::Attributor;
use crate::error::{GithubError, StoreError};
use crate::github::{CommitEntry, GithubApi, Paginator, PullRef};
use crate::store::{read_json, write_json_atomic};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

/// Attributed commit details for one pull request, valid while the PR's
/// `updated_at` still equals `pr_updated_at`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDetail {
    /// `None` when no commit was attributed to the user.
    pub first_commit_date: Option<DateTime<Utc>>,
    pub commit_count: u32,
    pub pr_updated_at: DateTime<Utc>,
}

impl CommitDetail {
    pub fn none(pr_updated_at: DateTime<Utc>) -> Self {
        Self {
            first_commit_date: None,
            commit_count: 0,
            pr_updated_at,
        }
    }
}

/// Commit-detail entries keyed by `owner/repo#number`.
#[derive(Debug, Default)]
pub struct CommitDetailCache {
    entries: Mutex<IndexMap<String, CommitDetail>>,
}

impl CommitDetailCache {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let entries: IndexMap<String, CommitDetail> = read_json(path)?;
        tracing::debug!(entries = entries.len(), "Loaded commit cache");
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let entries = self.entries.lock().await;
        write_json_atomic(path, &*entries)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Cached entry, only if it was recorded against `pr_updated_at`.
    pub async fn lookup(&self, pull: &PullRef, pr_updated_at: DateTime<Utc>) -> Option<CommitDetail> {
        self.entries
            .lock()
            .await
            .get(&pull.cache_key())
            .filter(|detail| detail.pr_updated_at == pr_updated_at)
            .cloned()
    }

    /// Serves a valid cached entry, or walks the PR's commits and records the
    /// result. Item-local API failures are recorded as an empty result.
    pub async fn get_or_fetch<A: GithubApi>(
        &self,
        paginator: &Paginator<'_, A>,
        attributor: &Attributor,
        pull: &PullRef,
        pr_updated_at: DateTime<Utc>,
        force_refresh: bool,
    ) -> Result<CommitDetail, GithubError> {
        if !force_refresh {
            if let Some(detail) = self.lookup(pull, pr_updated_at).await {
                tracing::trace!(pull = %pull.cache_key(), "Commit cache hit");
                return Ok(detail);
            }
        }

        let detail = match paginator.fetch_all::<CommitEntry>(&pull.commits_path()).await {
            Ok(commits) => {
                let summary = attributor.summarize(&commits);
                CommitDetail {
                    first_commit_date: summary.first_commit_date,
                    commit_count: summary.commit_count,
                    pr_updated_at,
                }
            }
            Err(e) if e.is_item_local() => {
                tracing::warn!(pull = %pull.cache_key(), error = %e, "Commits unavailable, recording no attribution");
                CommitDetail::none(pr_updated_at)
            }
            Err(e) => return Err(e),
        };

        self.entries
            .lock()
            .await
            .insert(pull.cache_key(), detail.clone());
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepoRef;
    use crate::model::Strictness;
    use crate::test_utils::{commit, FakeGithub};
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn pull() -> PullRef {
        PullRef::new(RepoRef::new("acme", "lib"), 12)
    }

    fn updated(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap()
    }

    fn attributor() -> Attributor {
        Attributor::new("alice", Strictness::Loose)
    }

    fn api_with_commits() -> FakeGithub {
        FakeGithub::new().with_pages(
            &pull().commits_path(),
            vec![json!([
                commit(Some("alice"), "a@corp.io", "2024-02-03T00:00:00Z", "work"),
                commit(Some("bob"), "b@corp.io", "2024-02-01T00:00:00Z", "other"),
            ])],
        )
    }

    fn paginator(api: &FakeGithub) -> Paginator<'_, FakeGithub> {
        Paginator::new(api).with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_hit_requires_matching_updated_at() {
        let api = api_with_commits();
        let cache = CommitDetailCache::default();

        let first = cache
            .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), false)
            .await
            .unwrap();
        assert_eq!(first.commit_count, 1);
        assert_eq!(
            first.first_commit_date,
            Some(Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap())
        );

        cache
            .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), false)
            .await
            .unwrap();
        assert_eq!(api.call_count(&pull().commits_path()), 1);

        let refreshed = cache
            .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(11), false)
            .await
            .unwrap();
        assert_eq!(api.call_count(&pull().commits_path()), 2);
        assert_eq!(refreshed.pr_updated_at, updated(11));
        assert!(cache.lookup(&pull(), updated(10)).await.is_none());
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_valid_entry() {
        let api = api_with_commits();
        let cache = CommitDetailCache::default();
        for _ in 0..2 {
            cache
                .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), true)
                .await
                .unwrap();
        }
        assert_eq!(api.call_count(&pull().commits_path()), 2);
    }

    #[tokio::test]
    async fn test_negative_result_is_cached() {
        let api = FakeGithub::new().with_pages(
            &pull().commits_path(),
            vec![json!([commit(Some("bob"), "b@corp.io", "2024-02-01T00:00:00Z", "other")])],
        );
        let cache = CommitDetailCache::default();
        for _ in 0..2 {
            let detail = cache
                .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), false)
                .await
                .unwrap();
            assert_eq!(detail, CommitDetail::none(updated(10)));
        }
        assert_eq!(api.call_count(&pull().commits_path()), 1);
    }

    #[tokio::test]
    async fn test_forbidden_is_cached_as_empty() {
        let api = FakeGithub::new().with_forbidden(&pull().commits_path());
        let cache = CommitDetailCache::default();
        let detail = cache
            .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), false)
            .await
            .unwrap();
        assert_eq!(detail, CommitDetail::none(updated(10)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_and_not_cached() {
        let api = FakeGithub::new().with_server_error(&pull().commits_path());
        let cache = CommitDetailCache::default();
        let result = cache
            .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), false)
            .await;
        assert!(matches!(result, Err(GithubError::Api { status: 502, .. })));
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_round_trip_keeps_null_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commit_cache.json");
        let api = FakeGithub::new().with_forbidden(&pull().commits_path());
        let cache = CommitDetailCache::default();
        cache
            .get_or_fetch(&paginator(&api), &attributor(), &pull(), updated(10), false)
            .await
            .unwrap();
        cache.save(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["acme/lib#12"]["firstCommitDate"].is_null());
        assert_eq!(raw["acme/lib#12"]["commitCount"], 0);

        let reloaded = CommitDetailCache::load(&path).unwrap();
        assert_eq!(
            reloaded.lookup(&pull(), updated(10)).await,
            Some(CommitDetail::none(updated(10)))
        );
    }
}
