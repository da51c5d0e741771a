//! Post-order walk of a repository tree.
//!
//! Each surviving folder gets a row before its subtree is processed so that
//! files and subfolders can reference it. The row only becomes visible once
//! its summary is stored; if no summary can be produced the row is deleted
//! again, so a finished walk never leaves unsummarized folders behind.
//!
//! Deleting a folder cascades to everything stored below it. When a parent's
//! own summary cannot be produced, its already committed children and files
//! are discarded with it; a subtree is kept only under a summarized parent.

use crate::error::IngestResult;
use crate::filter::PathFilter;
use crate::prompt::{display_path, RepoContext};
use crate::retry::RetryBudget;
use crate::summarizer::Summarizer;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use repowiki_core::{
    path_name, DirectoryNode, FileRecord, FolderRecord, FolderSummary, RecordId, RepositoryHost,
    SummaryUnit,
};
use repowiki_db::Database;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of files summarized at the same time within one folder.
pub const DEFAULT_FILE_CONCURRENCY: usize = 8;

/// What a walk writes into and reports about.
#[derive(Debug, Clone)]
pub struct WalkContext {
    pub repo: RepoContext,
    pub branch_id: RecordId,
}

/// Walks a [`DirectoryNode`] tree and stores the summaries it produces.
#[derive(Clone)]
pub struct FolderWalker {
    db: Database,
    host: Arc<dyn RepositoryHost>,
    summarizer: Summarizer,
    filter: Arc<PathFilter>,
    budget: RetryBudget,
    file_concurrency: usize,
}

impl FolderWalker {
    pub fn new(
        db: Database,
        host: Arc<dyn RepositoryHost>,
        summarizer: Summarizer,
        filter: PathFilter,
        budget: RetryBudget,
    ) -> Self {
        Self {
            db,
            host,
            summarizer,
            filter: Arc::new(filter),
            budget,
            file_concurrency: DEFAULT_FILE_CONCURRENCY,
        }
    }

    pub fn with_file_concurrency(mut self, file_concurrency: usize) -> Self {
        self.file_concurrency = file_concurrency.max(1);
        self
    }

    /// Summarize `root` and everything below it.
    ///
    /// Returns `None` when nothing in the tree could be summarized.
    pub async fn walk(
        &self,
        ctx: &WalkContext,
        root: &DirectoryNode,
    ) -> IngestResult<Option<FolderSummary>> {
        self.walk_folder(ctx, root, None).await
    }

    fn walk_folder<'a>(
        &'a self,
        ctx: &'a WalkContext,
        node: &'a DirectoryNode,
        parent_id: Option<RecordId>,
    ) -> BoxFuture<'a, IngestResult<Option<FolderSummary>>> {
        async move {
            let files = self.filter.select_files(&node.files);
            let folders = self.filter.select_folders(&node.subdirectories);

            if files.is_empty() && folders.is_empty() {
                debug!("Pruning folder '{}': nothing survives the filters", node.path);
                return Ok(None);
            }

            let record = FolderRecord::new(ctx.branch_id.clone(), node.path.clone())
                .with_parent(parent_id);
            let folder = TentativeFolder::create(&self.db, record)?;

            let collected = self.collect_units(ctx, folder.id(), &files, &folders).await;
            let units = match collected {
                Ok(units) => units,
                Err(e) => {
                    folder.rollback();
                    return Err(e);
                }
            };

            if units.is_empty() {
                debug!("No summaries below '{}', dropping folder", node.path);
                folder.rollback();
                return Ok(None);
            }

            let schema = self
                .budget
                .summarize_folder(&self.summarizer, &ctx.repo, &node.path, units)
                .await;

            match schema {
                Some(schema) => {
                    folder.commit(&schema.summary, &schema.usage)?;
                    info!("Summarized folder '{}'", display_path(&node.path));
                    Ok(Some(FolderSummary {
                        path: node.path.clone(),
                        summary: schema.summary,
                    }))
                }
                None => {
                    folder.rollback();
                    Ok(None)
                }
            }
        }
        .boxed()
    }

    /// File units first (in listing order), then folder units.
    async fn collect_units(
        &self,
        ctx: &WalkContext,
        folder_id: &str,
        files: &[&str],
        folders: &[&DirectoryNode],
    ) -> IngestResult<Vec<SummaryUnit>> {
        // Futures are built up front; a `map` closure over `&str` is not `Send` inside the boxed walk.
        let pending: Vec<_> = files
            .iter()
            .map(|path| self.process_file(ctx, folder_id, path))
            .collect();
        let file_results: Vec<IngestResult<Option<SummaryUnit>>> = stream::iter(pending)
            .buffered(self.file_concurrency)
            .collect()
            .await;

        let mut units = Vec::with_capacity(files.len() + folders.len());
        for result in file_results {
            if let Some(unit) = result? {
                units.push(unit);
            }
        }

        for child in folders {
            let summary = self
                .walk_folder(ctx, child, Some(folder_id.to_string()))
                .await?;
            if let Some(summary) = summary {
                units.push(SummaryUnit::folder(summary.path, summary.summary));
            }
        }

        Ok(units)
    }

    /// Fetch, summarize and store one file.
    async fn process_file(
        &self,
        ctx: &WalkContext,
        folder_id: &str,
        path: &str,
    ) -> IngestResult<Option<SummaryUnit>> {
        let repo = &ctx.repo;
        let content = match self
            .host
            .fetch_file(&repo.owner, &repo.repo, &repo.commit_sha, path)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {}", path, e);
                return Ok(None);
            }
        };

        let Some(schema) = self
            .budget
            .summarize_file(&self.summarizer, repo, path, &content)
            .await
        else {
            return Ok(None);
        };

        let record = FileRecord::new(
            folder_id.to_string(),
            path,
            content,
            schema.summary.as_str(),
            schema.usage,
        );
        self.db.insert_file(&record)?;
        debug!("Stored summary of {}", path);

        Ok(Some(SummaryUnit::file(path_name(path), schema.summary)))
    }
}

/// A folder row that exists only until it is committed or rolled back.
///
/// Dropping it unconsumed deletes the row as well.
#[must_use = "a tentative folder must be committed or rolled back"]
struct TentativeFolder {
    db: Database,
    id: RecordId,
    armed: bool,
}

impl TentativeFolder {
    fn create(db: &Database, record: FolderRecord) -> IngestResult<Self> {
        db.insert_folder(&record)?;
        Ok(Self {
            db: db.clone(),
            id: record.id,
            armed: true,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    /// Store the summary. A failed update removes the row before returning the error.
    fn commit(mut self, summary: &str, usage: &str) -> IngestResult<()> {
        match self.db.update_folder_summary(&self.id, summary, usage) {
            Ok(()) => {
                self.armed = false;
                Ok(())
            }
            Err(e) => {
                self.rollback();
                Err(e.into())
            }
        }
    }

    fn rollback(mut self) {
        self.armed = false;
        self.discard();
    }

    fn discard(&self) {
        if let Err(e) = self.db.delete_folder(&self.id) {
            warn!("Failed to delete unfinished folder {}: {}", self.id, e);
        }
    }
}

impl Drop for TentativeFolder {
    fn drop(&mut self) {
        if self.armed {
            self.discard();
        }
    }
}
