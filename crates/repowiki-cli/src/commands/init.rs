//! Initialize Repowiki.

use super::load_context;
use anyhow::{Context, Result};
use colored::Colorize;
use repowiki_config::Config;
use repowiki_db::Database;

pub fn run() -> Result<()> {
    let (paths, _) = load_context()?;

    if paths.is_initialized() {
        println!("{} Repowiki is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing Repowiki...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    if paths.config_file.exists() {
        println!(
            "  {} Kept existing config: {}",
            "✓".green(),
            paths.config_file.display()
        );
    } else {
        Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
        println!(
            "  {} Created config: {}",
            "✓".green(),
            paths.config_file.display()
        );
    }

    let _db = Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        paths.database_file.display()
    );

    println!();
    println!("{}", "Repowiki initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Choose a model: {}", "repowiki config set llm.model llama3.1:8b".cyan());
    println!("  2. Ingest a repository: {}", "repowiki ingest owner/repo".cyan());
    println!("  3. Or start the server: {}", "repowiki serve".cyan());

    Ok(())
}
