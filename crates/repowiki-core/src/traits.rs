//! Collaborator traits consumed by the ingestion pipeline.
//!
//! The pipeline never talks to a source host directly; it is handed
//! implementations of these traits by the composition root. `repowiki-github`
//! provides the production implementation, tests provide in-memory fakes.

use crate::error::Result;
use crate::types::{DirectoryNode, RateLimitStatus, RepositoryDetails};
use async_trait::async_trait;

/// Source host serving repository metadata, trees and file contents.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Fetch metadata and the head commit of the default branch.
    ///
    /// Fails with [`Error::RepositoryNotFound`](crate::Error::RepositoryNotFound)
    /// when the repository does not exist.
    async fn fetch_details(&self, owner: &str, repo: &str) -> Result<RepositoryDetails>;

    /// Fetch the full directory tree at `commit_sha`.
    async fn fetch_tree(&self, owner: &str, repo: &str, commit_sha: &str) -> Result<DirectoryNode>;

    /// Fetch the text content of one file at `commit_sha`.
    async fn fetch_file(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        path: &str,
    ) -> Result<String>;
}

/// Reports the remaining request quota of the source host.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self) -> Result<RateLimitStatus>;
}
