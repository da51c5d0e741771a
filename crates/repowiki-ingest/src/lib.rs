//! Repowiki Ingest - Turns a repository into a stored tree of summaries.
//!
//! This crate provides:
//! - Path filtering with allow and deny patterns
//! - Structured file and folder summarization through an LLM
//! - Character-budgeted retries
//! - The post-order folder walk that persists summaries
//! - The ingestion queue with rate-limit backpressure

pub mod code_splitter;
mod error;
pub mod filter;
mod ingestor;
mod prompt;
mod queue;
mod retry;
pub mod schema;
mod summarizer;
mod walker;

#[cfg(test)]
mod testing;

pub use error::{IngestError, IngestResult};
pub use filter::{PathFilter, PatternSet};
pub use ingestor::{IngestReport, JobProcessor, RepositoryIngestor};
pub use prompt::RepoContext;
pub use queue::{
    AddResult, EnqueueError, IngestionQueue, QueueSettings, QueueSnapshot, QueueStatus,
};
pub use retry::{AttemptOutcome, RetryBudget};
pub use schema::{FileSchema, FolderSchema};
pub use summarizer::{Summarizer, SummaryError};
pub use walker::{FolderWalker, WalkContext};
