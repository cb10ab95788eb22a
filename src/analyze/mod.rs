pub mod attribution;
pub mod fetcher;
pub mod merger;
pub mod planner;

pub use fetcher::ContributionFetcher;
pub use merger::merge;
pub use planner::SyncPlan;
