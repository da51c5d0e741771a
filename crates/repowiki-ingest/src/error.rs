//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that abort an ingestion job.
///
/// Summarization failures are not errors: they degrade to a missing summary.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Database(#[from] repowiki_db::DbError),

    #[error("Repository host error: {0}")]
    Host(#[from] repowiki_core::Error),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}
