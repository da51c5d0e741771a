//! Ingest command - enqueue a repository and wait for it in the foreground.

use super::{build_queue, get_database, load_context, parse_repository};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use repowiki_config::LlmProviderKind;
use repowiki_llm::OllamaClient;
use std::time::Duration;
use tokio::runtime::Runtime;

pub fn run(repository: &str) -> Result<()> {
    let job = parse_repository(repository)?;
    let (paths, config) = load_context()?;
    let db = get_database(&paths)?;

    let rt = Runtime::new().context("Failed to create async runtime")?;

    if config.llm.provider == LlmProviderKind::Ollama {
        let client =
            OllamaClient::from_config(&config.llm).context("Failed to create Ollama client")?;
        if !rt.block_on(client.is_available()) {
            anyhow::bail!(
                "Ollama is not running at {}. Start it with 'ollama serve'.",
                config.llm.host
            );
        }
    }

    let name = job.full_name();
    let (owner, repo) = (job.owner.clone(), job.repo.clone());
    let queue = build_queue(&db, &config)?;

    rt.block_on(async {
        let message = queue.add(job).await?;
        println!("{} {}", "Queued:".green().bold(), message);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")?,
        );
        pb.set_message(format!("Summarizing {}", name));
        pb.enable_steady_tick(Duration::from_millis(100));

        queue.wait_idle().await;
        pb.finish_and_clear();
        anyhow::Ok(())
    })?;

    let Some(record) = db.get_repository(&owner, &repo)? else {
        anyhow::bail!(
            "No documentation was stored for {}. Run with --verbose for details.",
            name
        );
    };

    let branch = db
        .get_latest_branch(&record.id)?
        .context("Repository was stored without a branch")?;
    let folders = db.count_folders(&branch.id)?;
    let files = db.count_files(&branch.id)?;

    println!(
        "{} {} at {} ({} folders, {} files)",
        "Ingested:".green().bold(),
        name,
        short_sha(&branch.last_commit_sha),
        folders,
        files
    );
    println!("  View it with: {}", format!("repowiki show {}", name).cyan());

    Ok(())
}

/// First 7 characters of a commit SHA.
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }
}
