//! Repowiki GitHub - Repository host and rate limiter backed by the GitHub REST API.

mod client;
mod tree;
mod types;

pub use client::GithubClient;
pub use tree::build_tree;
pub use types::{TreeEntry, TreeEntryKind};
