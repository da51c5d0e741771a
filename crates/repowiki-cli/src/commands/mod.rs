//! CLI command implementations.

pub mod config;
pub mod ingest;
pub mod init;
pub mod list;
pub mod serve;
pub mod show;
pub mod status;

use anyhow::{Context, Result};
use repowiki_config::{AppPaths, Config};
use repowiki_core::{IngestionJob, RateLimiter, RepositoryHost};
use repowiki_db::Database;
use repowiki_github::GithubClient;
use repowiki_ingest::{
    FolderWalker, IngestionQueue, PathFilter, QueueSettings, RepositoryIngestor, RetryBudget,
    Summarizer,
};
use repowiki_llm::provider_from_config;
use std::sync::Arc;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load the configuration and the paths it points at.
pub fn load_context() -> Result<(AppPaths, Config)> {
    let paths = get_paths()?;
    let config = Config::load_from(&paths.config_file).context("Failed to load configuration")?;
    let paths = paths.with_data_dir(config.general.data_dir.as_deref());
    Ok((paths, config))
}

/// Get a database connection, ensuring repowiki is initialized.
pub fn get_database(paths: &AppPaths) -> Result<Database> {
    if !paths.is_initialized() {
        anyhow::bail!("Repowiki is not initialized. Run 'repowiki init' first.");
    }

    Database::open(&paths.database_file).context("Failed to open database")
}

/// Parse an `owner/repo` argument.
pub fn parse_repository(value: &str) -> Result<IngestionJob> {
    IngestionJob::parse(value)
        .with_context(|| format!("Expected a repository as owner/repo, got '{}'", value))
}

/// Wire the GitHub client, the LLM provider and storage into a queue.
pub fn build_queue(db: &Database, config: &Config) -> Result<Arc<IngestionQueue>> {
    let github =
        Arc::new(GithubClient::from_config(&config.github).context("Failed to create GitHub client")?);
    let host: Arc<dyn RepositoryHost> = github.clone();
    let rate_limiter: Arc<dyn RateLimiter> = github;

    let provider = provider_from_config(&config.llm).context("Failed to create LLM client")?;
    let filter = PathFilter::from_config(&config.filter).context("Invalid filter patterns")?;

    let walker = FolderWalker::new(
        db.clone(),
        host.clone(),
        Summarizer::new(provider),
        filter,
        RetryBudget::from_config(&config.budget),
    )
    .with_file_concurrency(config.ingest.file_concurrency);
    let ingestor = Arc::new(RepositoryIngestor::new(db.clone(), host.clone(), walker));

    Ok(IngestionQueue::new(
        db.clone(),
        host,
        rate_limiter,
        ingestor,
        QueueSettings::from_config(&config.queue),
    ))
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        let job = parse_repository("tokio-rs/axum").unwrap();
        assert_eq!(job.full_name(), "tokio-rs/axum");
        assert!(parse_repository("axum").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_build_queue_from_defaults() {
        let db = Database::open_in_memory().unwrap();
        let queue = build_queue(&db, &Config::default()).unwrap();
        assert!(queue.snapshot().queued.is_empty());
    }
}
