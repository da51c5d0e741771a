//! List command - show ingested repositories.

use super::{get_database, load_context};
use anyhow::Result;
use colored::Colorize;

pub fn run() -> Result<()> {
    let (paths, _) = load_context()?;
    let db = get_database(&paths)?;

    let repositories = db.list_repositories()?;
    if repositories.is_empty() {
        println!(
            "{}",
            "No repositories yet. Use 'repowiki ingest owner/repo' to add one.".dimmed()
        );
        return Ok(());
    }

    println!("{}", "Repositories".cyan().bold());
    println!("{}", "─".repeat(50));

    for repository in &repositories {
        println!(
            "  {} {}/{} {}",
            "•".dimmed(),
            repository.owner.bold(),
            repository.repo.bold(),
            repository.language.as_deref().unwrap_or("").dimmed()
        );
        if let Some(description) = &repository.description {
            println!("    {}", description);
        }
        println!(
            "    {} {}  {} {}  added {}",
            "★".yellow(),
            repository.stars,
            "⑂".dimmed(),
            repository.forks,
            repository.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}
