//! Shrink-and-retry summarization under a character budget.
//!
//! Attempt `n` (0-based) may send at most
//! `character_limit - n * reduce_char_per_retry` characters. The loop ends on
//! the first success, after `max_retries` attempts, or when the budget would
//! drop to zero.

use crate::prompt::RepoContext;
use crate::schema::{FileSchema, FolderSchema};
use crate::summarizer::{SummaryError, Summarizer};
use repowiki_config::BudgetConfig;
use repowiki_core::SummaryUnit;
use std::collections::VecDeque;
use std::future::Future;
use tracing::{debug, warn};

/// Result of one attempt inside [`RetryBudget::run`].
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    Failed(String),
    /// Nothing is left to try with; stop without further attempts.
    Exhausted,
}

impl<T> From<Result<T, SummaryError>> for AttemptOutcome<T> {
    fn from(result: Result<T, SummaryError>) -> Self {
        match result {
            Ok(value) => AttemptOutcome::Success(value),
            Err(SummaryError::EmptyInput) => AttemptOutcome::Exhausted,
            Err(e) => AttemptOutcome::Failed(e.to_string()),
        }
    }
}

/// Character budget schedule for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub character_limit: usize,
    pub reduce_char_per_retry: usize,
    pub max_retries: usize,
}

impl RetryBudget {
    pub fn from_config(config: &BudgetConfig) -> Self {
        Self {
            character_limit: config.character_limit,
            reduce_char_per_retry: config.reduce_char_per_retry,
            max_retries: config.max_retries,
        }
    }

    /// Budget of attempt `attempt`, or `None` when no such attempt is allowed.
    pub fn budget_for(&self, attempt: usize) -> Option<usize> {
        if attempt >= self.max_retries {
            return None;
        }
        attempt
            .checked_mul(self.reduce_char_per_retry)
            .and_then(|reduction| self.character_limit.checked_sub(reduction))
            .filter(|budget| *budget > 0)
    }

    /// Run `attempt_fn` with shrinking budgets until it succeeds.
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt_fn: F) -> Option<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let mut attempt = 0;
        while let Some(budget) = self.budget_for(attempt) {
            match attempt_fn(budget).await {
                AttemptOutcome::Success(value) => return Some(value),
                AttemptOutcome::Failed(reason) => {
                    warn!(
                        "[Retry {}/{}] Failed to summarize {}: {}",
                        attempt + 1,
                        self.max_retries,
                        label,
                        reason
                    );
                }
                AttemptOutcome::Exhausted => {
                    debug!("Nothing left to summarize for {}", label);
                    return None;
                }
            }
            attempt += 1;
        }

        warn!("No summary produced for {} after {} attempts", label, attempt);
        None
    }

    /// Summarize a file, truncating its content to each attempt's budget.
    pub async fn summarize_file(
        &self,
        summarizer: &Summarizer,
        ctx: &RepoContext,
        path: &str,
        content: &str,
    ) -> Option<FileSchema> {
        self.run(path, |budget| {
            let truncated = truncate_chars(content, budget);
            async move {
                AttemptOutcome::from(summarizer.summarize_file(ctx, path, truncated).await)
            }
        })
        .await
    }

    /// Summarize a folder, evicting the oldest units until the rest fits.
    ///
    /// Every retry evicts at least one unit, so the same input is never sent twice.
    pub async fn summarize_folder(
        &self,
        summarizer: &Summarizer,
        ctx: &RepoContext,
        path: &str,
        units: Vec<SummaryUnit>,
    ) -> Option<FolderSchema> {
        let mut remaining: VecDeque<SummaryUnit> = units.into();
        let mut first = true;

        self.run(folder_label(path), move |budget| {
            if !first {
                remaining.pop_front();
            }
            first = false;
            fit_units(&mut remaining, budget);

            let batch: Vec<SummaryUnit> = remaining.iter().cloned().collect();
            async move {
                if batch.is_empty() {
                    return AttemptOutcome::Exhausted;
                }
                AttemptOutcome::from(summarizer.summarize_folder(ctx, path, &batch).await)
            }
        })
        .await
    }
}

/// Drop units from the front until the rendered text fits `budget` characters.
fn fit_units(units: &mut VecDeque<SummaryUnit>, budget: usize) {
    let mut total: usize = units.iter().map(SummaryUnit::char_len).sum();
    while total > budget {
        match units.pop_front() {
            Some(unit) => total -= unit.char_len(),
            None => break,
        }
    }
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn folder_label(path: &str) -> &str {
    if path.is_empty() {
        "folder /"
    } else {
        path
    }
}
