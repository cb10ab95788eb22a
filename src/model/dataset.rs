use crate::model::contribution::{
    AuthoredIssue, Category, CoAuthoredPullRequest, Collaboration, Contribution,
    ContributionItem, MergedPullRequest, ReviewedPullRequest,
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The five contribution lists, each sorted by `date` descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDataset {
    #[serde(default)]
    pub pull_requests: Vec<MergedPullRequest>,
    #[serde(default)]
    pub issues: Vec<AuthoredIssue>,
    #[serde(default)]
    pub reviewed_prs: Vec<ReviewedPullRequest>,
    #[serde(default)]
    pub co_authored_prs: Vec<CoAuthoredPullRequest>,
    #[serde(default)]
    pub collaborations: Vec<Collaboration>,
}

impl ContributionDataset {
    pub fn push(&mut self, item: impl Into<ContributionItem>) {
        match item.into() {
            ContributionItem::MergedPr(item) => self.pull_requests.push(item),
            ContributionItem::Issue(item) => self.issues.push(item),
            ContributionItem::ReviewedPr(item) => self.reviewed_prs.push(item),
            ContributionItem::CoAuthoredPr(item) => self.co_authored_prs.push(item),
            ContributionItem::Collaboration(item) => self.collaborations.push(item),
        }
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::PullRequests => self.pull_requests.len(),
            Category::Issues => self.issues.len(),
            Category::ReviewedPrs => self.reviewed_prs.len(),
            Category::CoAuthoredPrs => self.co_authored_prs.len(),
            Category::Collaborations => self.collaborations.len(),
        }
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.count(*c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the dataset, yielding items category by category in storage order.
    pub fn into_items(self) -> impl Iterator<Item = ContributionItem> {
        self.pull_requests
            .into_iter()
            .map(ContributionItem::from)
            .chain(self.issues.into_iter().map(ContributionItem::from))
            .chain(self.reviewed_prs.into_iter().map(ContributionItem::from))
            .chain(self.co_authored_prs.into_iter().map(ContributionItem::from))
            .chain(self.collaborations.into_iter().map(ContributionItem::from))
    }

    /// Newest first; equal dates fall back to URL order so output is stable.
    pub fn sort_by_date(&mut self) {
        sort_desc(&mut self.pull_requests);
        sort_desc(&mut self.issues);
        sort_desc(&mut self.reviewed_prs);
        sort_desc(&mut self.co_authored_prs);
        sort_desc(&mut self.collaborations);
    }

    /// Buckets every item by the calendar quarter of its `date`.
    pub fn group_by_quarter(&self) -> BTreeMap<QuarterKey, ContributionDataset> {
        let mut grouped: BTreeMap<QuarterKey, ContributionDataset> = BTreeMap::new();
        for item in self.clone().into_items() {
            grouped
                .entry(QuarterKey::of(&item.date()))
                .or_default()
                .push(item);
        }
        grouped
    }
}

fn sort_desc<T: Contribution>(items: &mut [T]) {
    items.sort_by(|a, b| b.date().cmp(&a.date()).then_with(|| a.url().cmp(b.url())));
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct QuarterKey {
    pub year: i32,
    pub quarter: u32,
}

impl QuarterKey {
    pub fn of(date: &DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}
