//! Reconciles freshly fetched contributions with the persisted dataset.

use crate::model::{Category, Contribution, ContributionDataset, ContributionItem};
use indexmap::IndexMap;

/// What applying one fresh item did to the dataset.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MergeOutcome {
    NewEntry,
    UpdatedEntry,
    /// Added to a higher tier, the collaboration entry for the URL removed.
    PromotedFromCollaboration,
    /// A collaboration for a URL that already has a higher-tier entry; dropped.
    SupersededByHigherTier,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MergeReport {
    pub new_entries: usize,
    pub updated_entries: usize,
    pub promoted: usize,
    pub superseded: usize,
    /// Prior items rejected while loading (duplicates, demoted collaborations).
    pub dropped_on_load: usize,
}

impl MergeReport {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::NewEntry => self.new_entries += 1,
            MergeOutcome::UpdatedEntry => self.updated_entries += 1,
            MergeOutcome::PromotedFromCollaboration => self.promoted += 1,
            MergeOutcome::SupersededByHigherTier => self.superseded += 1,
        }
    }
}

/// Per-category lists keyed by URL; insertion order is kept until the final sort.
struct Ledger {
    lists: IndexMap<Category, IndexMap<String, ContributionItem>>,
}

impl Ledger {
    fn new() -> Self {
        Self {
            lists: Category::ALL
                .iter()
                .map(|category| (*category, IndexMap::new()))
                .collect(),
        }
    }

    fn holds(&self, category: Category, url: &str) -> bool {
        self.lists
            .get(&category)
            .is_some_and(|items| items.contains_key(url))
    }

    fn has_higher_tier(&self, url: &str) -> bool {
        Category::ALL
            .iter()
            .filter(|category| category.is_higher_tier())
            .any(|category| self.holds(*category, url))
    }

    fn list_mut(&mut self, category: Category) -> &mut IndexMap<String, ContributionItem> {
        self.lists.entry(category).or_default()
    }

    /// Prior data: first occurrence per category wins. Collaborations are only
    /// kept for URLs no other category holds; authored PRs and issues exclude
    /// each other.
    fn admit_prior(&mut self, item: ContributionItem) -> bool {
        let category = item.category();
        let url = item.url().to_string();
        if self.holds(category, &url) {
            return false;
        }
        let conflicts = match category {
            Category::Collaborations => Category::ALL
                .iter()
                .any(|other| *other != category && self.holds(*other, &url)),
            Category::PullRequests => self.holds(Category::Issues, &url),
            Category::Issues => self.holds(Category::PullRequests, &url),
            Category::ReviewedPrs | Category::CoAuthoredPrs => false,
        };
        if conflicts {
            return false;
        }
        self.list_mut(category).insert(url, item);
        true
    }

    fn decide(&self, item: &ContributionItem) -> MergeOutcome {
        let category = item.category();
        let url = item.url();
        if self.holds(category, url) {
            MergeOutcome::UpdatedEntry
        } else if category == Category::Collaborations && self.has_higher_tier(url) {
            MergeOutcome::SupersededByHigherTier
        } else if category.is_higher_tier() && self.holds(Category::Collaborations, url) {
            MergeOutcome::PromotedFromCollaboration
        } else {
            MergeOutcome::NewEntry
        }
    }

    fn apply(&mut self, item: ContributionItem) -> MergeOutcome {
        let outcome = self.decide(&item);
        let category = item.category();
        let url = item.url().to_string();
        match outcome {
            MergeOutcome::SupersededByHigherTier => {}
            MergeOutcome::PromotedFromCollaboration => {
                self.list_mut(Category::Collaborations).shift_remove(&url);
                self.list_mut(category).insert(url, item);
            }
            // `insert` on an existing key replaces the value in place.
            MergeOutcome::NewEntry | MergeOutcome::UpdatedEntry => {
                self.list_mut(category).insert(url, item);
            }
        }
        outcome
    }

    fn into_dataset(self) -> ContributionDataset {
        let mut dataset = ContributionDataset::default();
        for (_, items) in self.lists {
            for (_, item) in items {
                dataset.push(item);
            }
        }
        dataset.sort_by_date();
        dataset
    }
}

/// Merges `fresh` into `prior`. The result satisfies: unique URLs per
/// category, and no URL in `collaborations` that also has a higher-tier entry.
pub fn merge(
    prior: ContributionDataset,
    fresh: ContributionDataset,
) -> (ContributionDataset, MergeReport) {
    let mut ledger = Ledger::new();
    let mut report = MergeReport::default();

    for item in prior.into_items() {
        if !ledger.admit_prior(item) {
            report.dropped_on_load += 1;
        }
    }
    for item in fresh.into_items() {
        let outcome = ledger.apply(item);
        report.record(outcome);
    }

    (ledger.into_dataset(), report)
}
