//! Serve command - host the ingestion queue over HTTP.

use super::{build_queue, get_database, load_context};
use crate::server::run_server;
use anyhow::{Context, Result};
use colored::Colorize;
use tokio::runtime::Runtime;

pub fn run(bind: Option<String>) -> Result<()> {
    let (paths, config) = load_context()?;
    let db = get_database(&paths)?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());

    let rt = Runtime::new().context("Failed to create async runtime")?;
    rt.block_on(async {
        let queue = build_queue(&db, &config)?;

        println!("{}", "Repowiki Server".cyan().bold());
        println!("{}", "─".repeat(50));
        println!("  LLM: {} ({})", config.llm.model, config.llm.provider.as_str());
        println!("  Queue: up to {} jobs", config.queue.max_queue_size);
        println!("  Listening on {}", format!("http://{}", bind).green());
        println!();

        run_server(&bind, queue)
            .await
            .with_context(|| format!("Server on {} failed", bind))
    })
}
