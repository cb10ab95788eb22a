use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EMPTY_DESCRIPTION: &str = "No description provided.";
const DESCRIPTION_LIMIT: usize = 100;

/// Dataset categories, in the order they are stored and rendered.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Category {
    PullRequests,
    Issues,
    ReviewedPrs,
    CoAuthoredPrs,
    Collaborations,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::PullRequests,
        Category::Issues,
        Category::ReviewedPrs,
        Category::CoAuthoredPrs,
        Category::Collaborations,
    ];

    /// Review and co-authorship rank above plain collaboration.
    pub fn is_higher_tier(self) -> bool {
        matches!(self, Category::ReviewedPrs | Category::CoAuthoredPrs)
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::PullRequests => "pullRequests",
            Category::Issues => "issues",
            Category::ReviewedPrs => "reviewedPrs",
            Category::CoAuthoredPrs => "coAuthoredPrs",
            Category::Collaborations => "collaborations",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::PullRequests => "Merged Pull Requests",
            Category::Issues => "Issues",
            Category::ReviewedPrs => "Reviewed Pull Requests",
            Category::CoAuthoredPrs => "Co-Authored Pull Requests",
            Category::Collaborations => "Collaborations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl PrState {
    pub fn from_parts(state: &str, merged_at: Option<&DateTime<Utc>>) -> Self {
        if merged_at.is_some() {
            PrState::Merged
        } else if state.eq_ignore_ascii_case("open") {
            PrState::Open
        } else {
            PrState::Closed
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollaborationKind {
    PullRequest,
    Issue,
}

/// Fields shared by every contribution variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
    pub title: String,
    pub url: String,
    pub repo: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ItemInfo {
    pub fn new(
        title: impl ToString,
        url: impl ToString,
        repo: impl ToString,
        body: Option<&str>,
        date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            repo: repo.to_string(),
            description: describe(body),
            date,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPullRequest {
    #[serde(flatten)]
    pub info: ItemInfo,
    pub merged_at: DateTime<Utc>,
    pub review_period_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredIssue {
    #[serde(flatten)]
    pub info: ItemInfo,
    pub closed_at: Option<DateTime<Utc>>,
    /// `None` while the issue is open.
    pub closing_period_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedPullRequest {
    #[serde(flatten)]
    pub info: ItemInfo,
    pub my_first_review_date: DateTime<Utc>,
    pub my_first_review_period_days: i64,
    pub merged_at: Option<DateTime<Utc>>,
    pub state: PrState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoAuthoredPullRequest {
    #[serde(flatten)]
    pub info: ItemInfo,
    pub first_commit_date: DateTime<Utc>,
    pub first_commit_period_days: i64,
    pub commit_count: u32,
    pub merged_at: Option<DateTime<Utc>>,
    pub state: PrState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    #[serde(flatten)]
    pub info: ItemInfo,
    pub first_commented_at: DateTime<Utc>,
    pub kind: CollaborationKind,
}

// New
impl MergedPullRequest {
    pub fn new(info: ItemInfo, merged_at: DateTime<Utc>) -> Self {
        let review_period_days = days_between(&info.created_at, &merged_at);
        Self {
            info: ItemInfo {
                date: merged_at,
                ..info
            },
            merged_at,
            review_period_days,
        }
    }
}

impl AuthoredIssue {
    pub fn new(info: ItemInfo, closed_at: Option<DateTime<Utc>>) -> Self {
        let closing_period_days = closed_at.map(|closed| days_between(&info.created_at, &closed));
        let date = info.created_at;
        Self {
            info: ItemInfo { date, ..info },
            closed_at,
            closing_period_days,
        }
    }
}

impl ReviewedPullRequest {
    pub fn new(
        info: ItemInfo,
        first_review: DateTime<Utc>,
        merged_at: Option<DateTime<Utc>>,
        state: PrState,
    ) -> Self {
        let my_first_review_period_days = days_between(&info.created_at, &first_review);
        Self {
            info: ItemInfo {
                date: first_review,
                ..info
            },
            my_first_review_date: first_review,
            my_first_review_period_days,
            merged_at,
            state,
        }
    }
}

impl CoAuthoredPullRequest {
    pub fn new(
        info: ItemInfo,
        first_commit: DateTime<Utc>,
        commit_count: u32,
        merged_at: Option<DateTime<Utc>>,
        state: PrState,
    ) -> Self {
        // Commits pushed before the PR was opened count from day zero.
        let first_commit_period_days = days_between(&info.created_at, &first_commit).max(0);
        Self {
            info: ItemInfo {
                date: first_commit,
                ..info
            },
            first_commit_date: first_commit,
            first_commit_period_days,
            commit_count,
            merged_at,
            state,
        }
    }
}

impl Collaboration {
    pub fn new(info: ItemInfo, first_commented_at: DateTime<Utc>, kind: CollaborationKind) -> Self {
        Self {
            info: ItemInfo {
                date: first_commented_at,
                ..info
            },
            first_commented_at,
            kind,
        }
    }
}

/// Access to the shared fields of a contribution record.
pub trait Contribution {
    fn info(&self) -> &ItemInfo;

    fn url(&self) -> &str {
        &self.info().url
    }

    fn date(&self) -> DateTime<Utc> {
        self.info().date
    }
}

impl Contribution for MergedPullRequest {
    fn info(&self) -> &ItemInfo {
        &self.info
    }
}

impl Contribution for AuthoredIssue {
    fn info(&self) -> &ItemInfo {
        &self.info
    }
}

impl Contribution for ReviewedPullRequest {
    fn info(&self) -> &ItemInfo {
        &self.info
    }
}

impl Contribution for CoAuthoredPullRequest {
    fn info(&self) -> &ItemInfo {
        &self.info
    }
}

impl Contribution for Collaboration {
    fn info(&self) -> &ItemInfo {
        &self.info
    }
}

/// A contribution tagged with its category.
#[derive(Debug, Clone, PartialEq)]
pub enum ContributionItem {
    MergedPr(MergedPullRequest),
    Issue(AuthoredIssue),
    ReviewedPr(ReviewedPullRequest),
    CoAuthoredPr(CoAuthoredPullRequest),
    Collaboration(Collaboration),
}

impl ContributionItem {
    pub fn category(&self) -> Category {
        match self {
            ContributionItem::MergedPr(_) => Category::PullRequests,
            ContributionItem::Issue(_) => Category::Issues,
            ContributionItem::ReviewedPr(_) => Category::ReviewedPrs,
            ContributionItem::CoAuthoredPr(_) => Category::CoAuthoredPrs,
            ContributionItem::Collaboration(_) => Category::Collaborations,
        }
    }
}

impl Contribution for ContributionItem {
    fn info(&self) -> &ItemInfo {
        match self {
            ContributionItem::MergedPr(item) => &item.info,
            ContributionItem::Issue(item) => &item.info,
            ContributionItem::ReviewedPr(item) => &item.info,
            ContributionItem::CoAuthoredPr(item) => &item.info,
            ContributionItem::Collaboration(item) => &item.info,
        }
    }
}

impl From<MergedPullRequest> for ContributionItem {
    fn from(item: MergedPullRequest) -> Self {
        ContributionItem::MergedPr(item)
    }
}

impl From<AuthoredIssue> for ContributionItem {
    fn from(item: AuthoredIssue) -> Self {
        ContributionItem::Issue(item)
    }
}

impl From<ReviewedPullRequest> for ContributionItem {
    fn from(item: ReviewedPullRequest) -> Self {
        ContributionItem::ReviewedPr(item)
    }
}

impl From<CoAuthoredPullRequest> for ContributionItem {
    fn from(item: CoAuthoredPullRequest) -> Self {
        ContributionItem::CoAuthoredPr(item)
    }
}

impl From<Collaboration> for ContributionItem {
    fn from(item: Collaboration) -> Self {
        ContributionItem::Collaboration(item)
    }
}

/// Whole days from `from` to `to`, truncated toward zero.
pub fn days_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> i64 {
    (*to - *from).num_days()
}

/// Collapses whitespace and truncates the body to a one-line summary.
pub fn describe(body: Option<&str>) -> String {
    let text = body.map(|b| b.split_whitespace().join(" ")).unwrap_or_default();
    if text.is_empty() {
        return EMPTY_DESCRIPTION.to_string();
    }
    if text.chars().count() > DESCRIPTION_LIMIT {
        let head: String = text.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{head}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn info() -> ItemInfo {
        ItemInfo::new(
            "Fix parser",
            "https://github.com/acme/lib/pull/7",
            "acme/lib",
            Some("Body"),
            at(2024, 1, 1),
            at(2024, 1, 1),
        )
    }

    #[test]
    fn test_merged_pr_dates_on_merge() {
        let pr = MergedPullRequest::new(info(), at(2024, 1, 11));
        assert_eq!(pr.info.date, at(2024, 1, 11));
        assert_eq!(pr.review_period_days, 10);
    }

    #[test]
    fn test_open_issue_has_no_closing_period() {
        let issue = AuthoredIssue::new(info(), None);
        assert_eq!(issue.closing_period_days, None);
        assert_eq!(issue.info.date, at(2024, 1, 1));

        let closed = AuthoredIssue::new(info(), Some(at(2024, 1, 4)));
        assert_eq!(closed.closing_period_days, Some(3));
    }

    #[test]
    fn test_first_commit_before_pr_clamps_to_zero() {
        let pr = CoAuthoredPullRequest::new(info(), at(2023, 12, 20), 3, None, PrState::Open);
        assert_eq!(pr.first_commit_period_days, 0);
        assert_eq!(pr.info.date, at(2023, 12, 20));
    }

    #[test]
    fn test_pr_state_prefers_merge() {
        let merged = at(2024, 2, 1);
        assert_eq!(PrState::from_parts("closed", Some(&merged)), PrState::Merged);
        assert_eq!(PrState::from_parts("open", None), PrState::Open);
        assert_eq!(PrState::from_parts("closed", None), PrState::Closed);
    }

    #[test]
    fn test_describe_truncates_and_collapses() {
        assert_eq!(describe(None), EMPTY_DESCRIPTION);
        assert_eq!(describe(Some("  \n ")), EMPTY_DESCRIPTION);
        assert_eq!(describe(Some("line one\n\nline   two")), "line one line two");

        let long = "x".repeat(150);
        let summary = describe(Some(&long));
        assert_eq!(summary.len(), 103);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_serialized_shape_is_flat_camel_case() {
        let pr = ReviewedPullRequest::new(info(), at(2024, 1, 3), None, PrState::Open);
        let value = serde_json::to_value(&pr).unwrap();
        assert_eq!(value["url"], "https://github.com/acme/lib/pull/7");
        assert_eq!(value["myFirstReviewPeriodDays"], 2);
        assert_eq!(value["state"], "open");
        assert!(value["mergedAt"].is_null());
        assert!(value.get("info").is_none());
    }
}
