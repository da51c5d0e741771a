//! Status command - show storage statistics.

use super::{format_size, get_database, load_context};
use anyhow::Result;
use colored::Colorize;
use repowiki_db::Database;

pub fn run() -> Result<()> {
    let (paths, config) = load_context()?;
    let db = get_database(&paths)?;

    let mut stats = db.get_stats()?;
    stats.database_size_bytes = Database::file_size(&paths.database_file).unwrap_or(0);

    println!("{}", "Repowiki Status".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Documentation".white().bold());
    println!("  Repositories: {}", stats.total_repositories.to_string().green());
    println!("  Branches: {}", stats.total_branches);
    println!("  Folders: {}", stats.total_folders);
    println!("  Files: {}", stats.total_files);
    if stats.pending_folders > 0 {
        println!(
            "  {} {} folders without a summary (interrupted ingestion)",
            "!".yellow(),
            stats.pending_folders
        );
    }

    println!();
    println!("{}", "Configuration".white().bold());
    println!("  LLM: {} via {}", config.llm.model, config.llm.provider.as_str());
    println!(
        "  GitHub token: {}",
        if config.github.resolved_token().is_some() {
            "set".green()
        } else {
            "not set (60 requests/hour)".yellow()
        }
    );

    println!();
    println!("{}", "Storage".white().bold());
    println!("  Database: {}", paths.database_file.display());
    println!("  Size: {}", format_size(stats.database_size_bytes));

    Ok(())
}
