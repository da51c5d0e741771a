//! Repowiki CLI - AI-generated documentation trees for GitHub repositories

mod commands;
mod server;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Repowiki - Summarize GitHub repositories file by file and folder by folder
#[derive(Parser)]
#[command(name = "repowiki")]
#[command(author = "Lalo Morales <lalomorales22@github.com>")]
#[command(version)]
#[command(about = "AI-generated documentation trees for GitHub repositories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Repowiki (create config and database)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Run the HTTP server hosting the ingestion queue
    Serve {
        /// Address to listen on (default: from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ingest a repository in the foreground
    Ingest {
        /// Repository as owner/repo
        repository: String,
    },

    /// Show storage statistics
    Status,

    /// List ingested repositories
    List,

    /// Show the documentation tree of a repository
    Show {
        /// Repository as owner/repo
        repository: String,

        /// Print the summary of every file and folder
        #[arg(short, long)]
        files: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., llm.model)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repowiki=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repowiki=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Serve { bind } => commands::serve::run(bind),
        Commands::Ingest { repository } => commands::ingest::run(&repository),
        Commands::Status => commands::status::run(),
        Commands::List => commands::list::run(),
        Commands::Show { repository, files } => commands::show::run(&repository, files),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
