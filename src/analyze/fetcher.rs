use crate::analyze::attribution::Attributor;
use crate::error::GithubError;
use crate::github::{
    GithubApi, IssueComment, Paginator, PullRef, RepoRef, RepositoryInfo, Review, SearchItem,
};
use crate::model::{
    AuthoredIssue, CoAuthoredPullRequest, Collaboration, CollaborationKind, ContributionDataset,
    ItemInfo, MergedPullRequest, PrState, ReviewedPullRequest, Settings,
};
use crate::store::{CommitDetailCache, ProcessedPrs};
use chrono::{DateTime, Datelike, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tokio::sync::Mutex;

pub type YearProgress<'a> = Box<dyn FnMut(i32) + Send + 'a>;

/// Search qualifiers per calendar year.
pub(crate) mod queries {
    fn range(year: i32) -> String {
        format!("{year}-01-01..{year}-12-31")
    }

    pub fn merged_prs(user: &str, year: i32) -> String {
        format!("is:pr author:{user} is:merged merged:{}", range(year))
    }

    pub fn issues(user: &str, year: i32) -> String {
        format!("is:issue author:{user} -user:{user} created:{}", range(year))
    }

    /// Search has no "closed by" qualifier; closed PRs the user commented on
    /// stand in for it.
    pub fn involvement(user: &str, year: i32) -> [String; 3] {
        let range = range(year);
        [
            format!("is:pr reviewed-by:{user} -author:{user} updated:{range}"),
            format!("is:pr merged-by:{user} -author:{user} updated:{range}"),
            format!("is:pr is:closed commenter:{user} -author:{user} closed:{range}"),
        ]
    }

    pub fn collaborations(user: &str, year: i32) -> String {
        format!("commenter:{user} -author:{user} updated:{}", range(year))
    }

    #[cfg(test)]
    pub fn all(user: &str, year: i32) -> Vec<String> {
        let mut all = vec![merged_prs(user, year), issues(user, year)];
        all.extend(involvement(user, year));
        all.push(collaborations(user, year));
        all
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FetchSummary {
    pub years: Vec<i32>,
    pub searched: usize,
    pub skipped_own_repo: usize,
    pub skipped_bot: usize,
    pub skipped_private: usize,
    pub skipped_malformed: usize,
    pub skipped_processed: usize,
}

impl FetchSummary {
    fn skipped(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::OwnRepo => self.skipped_own_repo += 1,
            SkipReason::Bot => self.skipped_bot += 1,
            SkipReason::Private => self.skipped_private += 1,
            SkipReason::Malformed => self.skipped_malformed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum SkipReason {
    OwnRepo,
    Bot,
    Private,
    Malformed,
}

enum Screened {
    Keep(RepoRef),
    Skip(SkipReason),
}

enum Lookup<T> {
    Skipped(SkipReason),
    Done(T),
}

#[derive(Default)]
struct Involvement {
    reviewed: Option<ReviewedPullRequest>,
    co_authored: Option<CoAuthoredPullRequest>,
}

/// Accumulated across the years of one run.
#[derive(Default)]
struct RunState {
    dataset: ContributionDataset,
    summary: FetchSummary,
    involvement_seen: HashSet<String>,
    collaboration_seen: HashSet<String>,
    /// URLs that produced a reviewed or co-authored entry.
    captured: HashSet<String>,
}

pub struct ContributionFetcher<'a, A> {
    paginator: Paginator<'a, A>,
    attributor: Attributor,
    username: String,
    concurrency: usize,
    cache: &'a CommitDetailCache,
    processed: &'a ProcessedPrs,
    visibility: Mutex<HashMap<RepoRef, bool>>,
    now: DateTime<Utc>,
}

// New
impl<'a, A: GithubApi> ContributionFetcher<'a, A> {
    pub fn new(
        paginator: Paginator<'a, A>,
        settings: &Settings,
        cache: &'a CommitDetailCache,
        processed: &'a ProcessedPrs,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            paginator,
            attributor: Attributor::new(&settings.username, settings.strictness),
            username: settings.username.clone(),
            concurrency: settings.concurrency.max(1),
            cache,
            processed,
            visibility: Mutex::new(HashMap::new()),
            now,
        }
    }
}

// Fetch
impl<'a, A: GithubApi> ContributionFetcher<'a, A> {
    /// Fresh contributions for `start_year` through the current year.
    pub async fn fetch(
        &self,
        start_year: i32,
        mut progress: YearProgress<'_>,
    ) -> Result<(ContributionDataset, FetchSummary), GithubError> {
        let mut run = RunState::default();
        for year in start_year..=self.now.year() {
            progress(year);
            tracing::info!(year, "Fetching contributions");
            self.fetch_year(year, &mut run).await?;
            run.summary.years.push(year);
        }
        run.dataset.sort_by_date();
        Ok((run.dataset, run.summary))
    }

    async fn fetch_year(&self, year: i32, run: &mut RunState) -> Result<(), GithubError> {
        let force_refresh = year == self.now.year();
        let user = self.username.as_str();

        let items = self.search(&queries::merged_prs(user, year), run).await?;
        let merged = self.resolve_all(items, |item| self.resolve_merged(item)).await?;
        let merged: Vec<_> = settle(&mut run.summary, merged).into_iter().flatten().collect();
        tracing::info!(year, count = merged.len(), "Merged pull requests");
        for pr in merged {
            run.dataset.push(pr);
        }

        let items = self.search(&queries::issues(user, year), run).await?;
        let issues = self.resolve_all(items, |item| self.resolve_issue(item)).await?;
        let issues = settle(&mut run.summary, issues);
        tracing::info!(year, count = issues.len(), "Authored issues");
        for issue in issues {
            run.dataset.push(issue);
        }

        let mut candidates: IndexMap<String, SearchItem> = IndexMap::new();
        for query in queries::involvement(user, year) {
            for item in self.search(&query, run).await? {
                candidates.entry(item.html_url.clone()).or_insert(item);
            }
        }
        let candidates = self
            .unexamined(
                candidates.into_values(),
                &mut run.involvement_seen,
                &mut run.summary,
            )
            .await;
        let involvements = self
            .resolve_all(candidates, |item| self.resolve_involvement(item, force_refresh))
            .await?;
        let (mut reviewed, mut co_authored) = (0, 0);
        for involvement in settle(&mut run.summary, involvements) {
            if let Some(pr) = involvement.reviewed {
                run.captured.insert(pr.info.url.clone());
                run.dataset.push(pr);
                reviewed += 1;
            }
            if let Some(pr) = involvement.co_authored {
                run.captured.insert(pr.info.url.clone());
                run.dataset.push(pr);
                co_authored += 1;
            }
        }
        tracing::info!(year, reviewed, co_authored, "Pull request involvement");

        let items: Vec<SearchItem> = self
            .search(&queries::collaborations(user, year), run)
            .await?
            .into_iter()
            .filter(|item| !run.captured.contains(&item.html_url))
            .collect();
        let candidates = self
            .unexamined(items, &mut run.collaboration_seen, &mut run.summary)
            .await;
        let collaborations = self
            .resolve_all(candidates, |item| self.resolve_collaboration(item))
            .await?;
        let collaborations: Vec<_> = settle(&mut run.summary, collaborations)
            .into_iter()
            .flatten()
            .collect();
        tracing::info!(year, count = collaborations.len(), "Collaborations");
        for collaboration in collaborations {
            run.dataset.push(collaboration);
        }
        Ok(())
    }

    async fn search(&self, query: &str, run: &mut RunState) -> Result<Vec<SearchItem>, GithubError> {
        let items: Vec<SearchItem> = self.paginator.search(query).await?;
        run.summary.searched += items.len();
        Ok(items)
    }

    /// Drops URLs in the processed set or already examined earlier in this run.
    async fn unexamined(
        &self,
        items: impl IntoIterator<Item = SearchItem>,
        seen: &mut HashSet<String>,
        summary: &mut FetchSummary,
    ) -> Vec<SearchItem> {
        let mut fresh = vec![];
        for item in items {
            if self.processed.contains(&item.html_url).await {
                summary.skipped_processed += 1;
                continue;
            }
            if seen.insert(item.html_url.clone()) {
                fresh.push(item);
            }
        }
        fresh
    }

    /// Order-preserving, at most `concurrency` lookups in flight.
    async fn resolve_all<T, F, Fut>(&self, items: Vec<SearchItem>, resolve: F) -> Result<Vec<T>, GithubError>
    where
        F: FnMut(SearchItem) -> Fut,
        Fut: Future<Output = Result<T, GithubError>>,
    {
        stream::iter(items)
            .map(resolve)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

// Per-item resolution
impl<'a, A: GithubApi> ContributionFetcher<'a, A> {
    async fn resolve_merged(&self, item: SearchItem) -> Result<Lookup<Option<MergedPullRequest>>, GithubError> {
        let repo = match self.screen(&item, true).await? {
            Screened::Keep(repo) => repo,
            Screened::Skip(reason) => return Ok(Lookup::Skipped(reason)),
        };
        let Some(merged_at) = item.merged_at() else {
            tracing::warn!(url = %item.html_url, "Merged search result without merge date");
            return Ok(Lookup::Done(None));
        };
        self.processed.insert(&item.html_url).await;
        let pr = MergedPullRequest::new(item_info(&item, &repo), merged_at);
        Ok(Lookup::Done(Some(pr)))
    }

    async fn resolve_issue(&self, item: SearchItem) -> Result<Lookup<AuthoredIssue>, GithubError> {
        let repo = match self.screen(&item, true).await? {
            Screened::Keep(repo) => repo,
            Screened::Skip(reason) => return Ok(Lookup::Skipped(reason)),
        };
        let issue = AuthoredIssue::new(item_info(&item, &repo), item.closed_at);
        Ok(Lookup::Done(issue))
    }

    /// Commit attribution and first review run side by side; either, both or
    /// neither may yield an entry.
    async fn resolve_involvement(
        &self,
        item: SearchItem,
        force_refresh: bool,
    ) -> Result<Lookup<Involvement>, GithubError> {
        let repo = match self.screen(&item, false).await? {
            Screened::Keep(repo) => repo,
            Screened::Skip(reason) => return Ok(Lookup::Skipped(reason)),
        };
        let pull = PullRef::new(repo.clone(), item.number);
        let (detail, first_review) = futures::future::try_join(
            self.cache.get_or_fetch(
                &self.paginator,
                &self.attributor,
                &pull,
                item.updated_at,
                force_refresh,
            ),
            self.first_review(&pull),
        )
        .await?;

        let merged_at = item.merged_at();
        let state = PrState::from_parts(&item.state, merged_at.as_ref());
        let info = item_info(&item, &repo);
        let co_authored = match detail.first_commit_date {
            Some(first_commit) if detail.commit_count > 0 => Some(CoAuthoredPullRequest::new(
                info.clone(),
                first_commit,
                detail.commit_count,
                merged_at,
                state,
            )),
            _ => None,
        };
        let reviewed = first_review.map(|at| ReviewedPullRequest::new(info, at, merged_at, state));
        Ok(Lookup::Done(Involvement {
            reviewed,
            co_authored,
        }))
    }

    async fn resolve_collaboration(
        &self,
        item: SearchItem,
    ) -> Result<Lookup<Option<Collaboration>>, GithubError> {
        let repo = match self.screen(&item, false).await? {
            Screened::Keep(repo) => repo,
            Screened::Skip(reason) => return Ok(Lookup::Skipped(reason)),
        };
        let pull = PullRef::new(repo.clone(), item.number);
        let Some(first_comment) = self.first_comment(&pull).await? else {
            return Ok(Lookup::Done(None));
        };
        let kind = if item.is_pull_request() {
            CollaborationKind::PullRequest
        } else {
            CollaborationKind::Issue
        };
        let collaboration = Collaboration::new(item_info(&item, &repo), first_comment, kind);
        Ok(Lookup::Done(Some(collaboration)))
    }

    /// Own-repo, bot-authored and private items are recorded as processed.
    async fn screen(&self, item: &SearchItem, skip_own_repo: bool) -> Result<Screened, GithubError> {
        let Some(repo) = item.repo_ref() else {
            tracing::warn!(url = %item.html_url, repository_url = %item.repository_url, "Unrecognized repository URL");
            return Ok(Screened::Skip(SkipReason::Malformed));
        };
        let reason = if skip_own_repo && repo.owner.eq_ignore_ascii_case(&self.username) {
            Some(SkipReason::OwnRepo)
        } else if item.is_bot_authored() {
            Some(SkipReason::Bot)
        } else if self.is_private(&repo).await? {
            Some(SkipReason::Private)
        } else {
            None
        };
        match reason {
            Some(reason) => {
                tracing::debug!(url = %item.html_url, ?reason, "Skipping");
                self.processed.insert(&item.html_url).await;
                Ok(Screened::Skip(reason))
            }
            None => Ok(Screened::Keep(repo)),
        }
    }

    /// Memoized per run. A repository we cannot read counts as private.
    async fn is_private(&self, repo: &RepoRef) -> Result<bool, GithubError> {
        if let Some(private) = self.visibility.lock().await.get(repo) {
            return Ok(*private);
        }
        let private = match self.paginator.fetch_one::<RepositoryInfo>(&repo.path()).await {
            Ok(info) => info.private,
            Err(e) if e.is_item_local() => {
                tracing::warn!(repo = %repo, error = %e, "Repository metadata unavailable, treating as private");
                true
            }
            Err(e) => return Err(e),
        };
        self.visibility.lock().await.insert(repo.clone(), private);
        Ok(private)
    }

    async fn first_review(&self, pull: &PullRef) -> Result<Option<DateTime<Utc>>, GithubError> {
        let reviews = match self.paginator.fetch_all::<Review>(&pull.reviews_path()).await {
            Ok(reviews) => reviews,
            Err(e) if e.is_item_local() => {
                tracing::warn!(pull = %pull.cache_key(), error = %e, "Reviews unavailable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(reviews
            .iter()
            .filter(|review| !review.is_pending())
            .filter(|review| review.user.as_ref().is_some_and(|u| u.is(&self.username)))
            .filter_map(|review| review.submitted_at)
            .min())
    }

    /// Earliest comment by the user on the first page that has one.
    async fn first_comment(&self, pull: &PullRef) -> Result<Option<DateTime<Utc>>, GithubError> {
        let username = self.username.as_str();
        let comments = match self
            .paginator
            .fetch_until(&pull.comments_path(), |c: &IssueComment| c.is_by(username))
            .await
        {
            Ok(comments) => comments,
            Err(e) if e.is_item_local() => {
                tracing::warn!(item = %pull.cache_key(), error = %e, "Comments unavailable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(comments
            .iter()
            .filter(|comment| comment.is_by(username))
            .map(|comment| comment.created_at)
            .min())
    }
}

fn settle<T>(summary: &mut FetchSummary, lookups: Vec<Lookup<T>>) -> Vec<T> {
    lookups
        .into_iter()
        .filter_map(|lookup| match lookup {
            Lookup::Skipped(reason) => {
                summary.skipped(reason);
                None
            }
            Lookup::Done(value) => Some(value),
        })
        .collect()
}

fn item_info(item: &SearchItem, repo: &RepoRef) -> ItemInfo {
    ItemInfo::new(
        &item.title,
        &item.html_url,
        repo,
        item.body.as_deref(),
        item.created_at,
        item.created_at,
    )
}
