//! Test utilities
//!
//! A hand-written in-memory GitHub API and JSON fixtures. The fake is
//! explicit about which pages exist, so tests can assert exactly which
//! requests a code path made.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
