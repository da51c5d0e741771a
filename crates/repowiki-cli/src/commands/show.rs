//! Show command - print the documentation tree of a repository.

use super::ingest::short_sha;
use super::{get_database, load_context, parse_repository};
use anyhow::{Context, Result};
use colored::Colorize;
use repowiki_core::FolderRecord;
use repowiki_db::Database;

pub fn run(repository: &str, with_files: bool) -> Result<()> {
    let job = parse_repository(repository)?;
    let (paths, _) = load_context()?;
    let db = get_database(&paths)?;

    let record = db
        .get_repository(&job.owner, &job.repo)?
        .with_context(|| format!("Repository {} has not been ingested", job))?;
    let branch = db
        .get_latest_branch(&record.id)?
        .context("Repository has no ingested branch")?;
    let root = db
        .get_root_folder(&branch.id)?
        .context("Repository has no documentation")?;

    println!("{}", format!("{}/{}", record.owner, record.repo).cyan().bold());
    println!(
        "{} @ {}  {}",
        branch.name,
        short_sha(&branch.last_commit_sha),
        record.url.dimmed()
    );
    println!("{}", "─".repeat(70));

    if let Some(summary) = &root.summary {
        println!("{}", summary);
    }
    println!();

    print_children(&db, &root, with_files, 0)
}

fn print_children(
    db: &Database,
    folder: &FolderRecord,
    with_files: bool,
    depth: usize,
) -> Result<()> {
    let indent = "  ".repeat(depth);

    for file in db.list_files(&folder.id)? {
        println!("{}{} {}", indent, file.name, format!("({})", file.usage).dimmed());
        if with_files {
            for line in file.summary.lines() {
                println!("{}    {}", indent, line);
            }
        }
    }

    for child in db.list_child_folders(&folder.id)? {
        println!(
            "{}{}/ {}",
            indent,
            child.name.bold(),
            format!("({})", child.usage.as_deref().unwrap_or_default()).dimmed()
        );
        if with_files {
            if let Some(summary) = &child.summary {
                for line in summary.lines() {
                    println!("{}    {}", indent, line);
                }
            }
        }
        print_children(db, &child, with_files, depth + 1)?;
    }

    Ok(())
}
