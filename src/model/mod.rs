pub mod contribution;
pub mod dataset;
pub mod settings;

pub use contribution::{
    AuthoredIssue, Category, CoAuthoredPullRequest, Collaboration, CollaborationKind,
    Contribution, ContributionItem, ItemInfo, MergedPullRequest, PrState, ReviewedPullRequest,
};
pub use dataset::{ContributionDataset, QuarterKey};
pub use settings::{Settings, Strictness};
