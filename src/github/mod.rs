pub mod client;
pub mod paginator;
pub mod types;

pub use client::{GithubApi, GithubClient};
pub use paginator::Paginator;
pub use types::{CommitEntry, IssueComment, PullRef, RepoRef, RepositoryInfo, Review, SearchItem};
