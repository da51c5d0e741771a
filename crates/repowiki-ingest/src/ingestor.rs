//! One ingestion job from repository metadata to the stored summary tree.

use crate::error::IngestResult;
use crate::prompt::RepoContext;
use crate::walker::{FolderWalker, WalkContext};
use async_trait::async_trait;
use repowiki_core::{
    BranchRecord, FolderSummary, IngestionJob, RecordId, RepositoryDetails, RepositoryHost,
    RepositoryRecord,
};
use repowiki_db::Database;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs a dequeued job. Errors are reported to the queue, which logs them.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &IngestionJob) -> IngestResult<()>;
}

/// What a finished ingestion stored.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub repository_id: RecordId,
    pub branch_id: RecordId,
    pub commit_sha: String,
    pub root: FolderSummary,
    pub folders: i64,
    pub files: i64,
}

/// Stores a repository, its branch and the walked summary tree.
pub struct RepositoryIngestor {
    db: Database,
    host: Arc<dyn RepositoryHost>,
    walker: FolderWalker,
}

impl RepositoryIngestor {
    pub fn new(db: Database, host: Arc<dyn RepositoryHost>, walker: FolderWalker) -> Self {
        Self { db, host, walker }
    }

    /// Ingest `owner/repo`.
    ///
    /// Returns `None` when the repository is already stored or nothing in it
    /// could be summarized. In the second case, and on any error, the
    /// repository row is removed again so the job can be resubmitted.
    pub async fn ingest(&self, owner: &str, repo: &str) -> IngestResult<Option<IngestReport>> {
        let details = self.host.fetch_details(owner, repo).await?;

        let Some(repository) = self
            .db
            .insert_repository(&RepositoryRecord::from_details(&details))?
        else {
            info!("{}/{} is already stored, skipping", owner, repo);
            return Ok(None);
        };

        match self.build(&repository, &details).await {
            Ok(Some(report)) => {
                info!(
                    "Ingested {}/{} at {}: {} folders, {} files",
                    owner, repo, report.commit_sha, report.folders, report.files
                );
                Ok(Some(report))
            }
            Ok(None) => {
                warn!("Nothing in {}/{} could be summarized", owner, repo);
                self.discard(&repository);
                Ok(None)
            }
            Err(e) => {
                self.discard(&repository);
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        repository: &RepositoryRecord,
        details: &RepositoryDetails,
    ) -> IngestResult<Option<IngestReport>> {
        let branch = self.db.insert_branch(&BranchRecord::new(
            repository.id.clone(),
            &details.default_branch,
            &details.commit_sha,
            details.commit_at,
        ))?;

        let tree = self
            .host
            .fetch_tree(&details.owner, &details.repo, &details.commit_sha)
            .await?;
        info!(
            "Walking {}/{} ({} files in tree)",
            details.owner,
            details.repo,
            tree.total_files()
        );

        let ctx = WalkContext {
            repo: RepoContext::new(&details.owner, &details.repo, &details.commit_sha),
            branch_id: branch.id.clone(),
        };
        let Some(root) = self.walker.walk(&ctx, &tree).await? else {
            return Ok(None);
        };

        Ok(Some(IngestReport {
            repository_id: repository.id.clone(),
            folders: self.db.count_folders(&branch.id)?,
            files: self.db.count_files(&branch.id)?,
            branch_id: branch.id,
            commit_sha: branch.last_commit_sha,
            root,
        }))
    }

    fn discard(&self, repository: &RepositoryRecord) {
        if let Err(e) = self.db.delete_repository(&repository.id) {
            warn!(
                "Failed to remove {}/{} after an unfinished ingestion: {}",
                repository.owner, repository.repo, e
            );
        }
    }
}

#[async_trait]
impl JobProcessor for RepositoryIngestor {
    async fn process(&self, job: &IngestionJob) -> IngestResult<()> {
        self.ingest(&job.owner, &job.repo).await.map(|_| ())
    }
}
