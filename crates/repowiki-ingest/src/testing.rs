//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use chrono::Utc;
use repowiki_core::{
    BranchRecord, DirectoryNode, Error, RateLimitStatus, RateLimiter, RepositoryDetails,
    RepositoryHost, RepositoryRecord, Result,
};
use repowiki_db::Database;
use repowiki_llm::{HistoryItem, LlmError, LlmProvider, LlmResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A response accepted by both the file and the folder schema.
pub const VALID_RESPONSE: &str =
    r#"{"name":"n","path":"p","summary":"Generated summary.","usage":"Testing"}"#;

/// LLM returning scripted responses (`None` = provider failure) and then a fallback.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn sequence(script: Vec<Option<&str>>, fallback: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(|r| r.map(String::from)).collect()),
            fallback: fallback.map(String::from),
            prompts: Mutex::new(vec![]),
        })
    }

    pub fn always(response: &str) -> Arc<Self> {
        Self::sequence(vec![], Some(response))
    }

    pub fn failing() -> Arc<Self> {
        Self::sequence(vec![], None)
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn run(&self, prompt: &str, _history: &[HistoryItem]) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.ok_or(LlmError::EmptyResponse)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Repository host serving one in-memory repository.
#[derive(Default)]
pub struct FakeHost {
    pub details: HashMap<String, RepositoryDetails>,
    pub tree: DirectoryNode,
    pub files: HashMap<String, String>,
    pub file_delays: HashMap<String, Duration>,
    pub details_delay: Option<Duration>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, owner: &str, repo: &str, language: Option<&str>) -> Self {
        self.details
            .insert(format!("{}/{}", owner, repo), details(owner, repo, language));
        self
    }

    pub fn with_tree(mut self, tree: DirectoryNode) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn with_file_delay(mut self, path: &str, delay: Duration) -> Self {
        self.file_delays.insert(path.to_string(), delay);
        self
    }

    pub fn with_details_delay(mut self, delay: Duration) -> Self {
        self.details_delay = Some(delay);
        self
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn fetch_details(&self, owner: &str, repo: &str) -> Result<RepositoryDetails> {
        if let Some(delay) = self.details_delay {
            tokio::time::sleep(delay).await;
        }
        self.details
            .get(&format!("{}/{}", owner, repo))
            .cloned()
            .ok_or_else(|| Error::RepositoryNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
    }

    async fn fetch_tree(&self, _owner: &str, _repo: &str, _sha: &str) -> Result<DirectoryNode> {
        Ok(self.tree.clone())
    }

    async fn fetch_file(&self, _owner: &str, _repo: &str, _sha: &str, path: &str) -> Result<String> {
        if let Some(delay) = self.file_delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.files.get(path).cloned().ok_or_else(|| Error::Host {
            status: 404,
            message: format!("{} not found", path),
        })
    }
}

/// Rate limiter answering from a script, then reporting plenty of quota.
pub struct FakeRateLimiter {
    script: Mutex<VecDeque<Option<RateLimitStatus>>>,
    calls: Mutex<usize>,
}

impl FakeRateLimiter {
    /// `None` entries make the check fail.
    pub fn scripted(script: Vec<Option<RateLimitStatus>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        })
    }

    pub fn unlimited() -> Arc<Self> {
        Self::scripted(vec![])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RateLimiter for FakeRateLimiter {
    async fn check(&self) -> Result<RateLimitStatus> {
        *self.calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(Some(status)) => Ok(status),
            Some(None) => Err(Error::Network("rate limit endpoint unreachable".to_string())),
            None => Ok(RateLimitStatus {
                remaining: 5000,
                reset_at: Utc::now(),
            }),
        }
    }
}

pub fn details(owner: &str, repo: &str, language: Option<&str>) -> RepositoryDetails {
    RepositoryDetails {
        owner: owner.to_string(),
        repo: repo.to_string(),
        url: format!("https://github.com/{}/{}", owner, repo),
        language: language.map(String::from),
        description: None,
        stars: 1,
        forks: 0,
        topics: vec![],
        default_branch: "main".to_string(),
        commit_sha: "abc123".to_string(),
        commit_at: Utc::now(),
    }
}

/// In-memory database holding one repository and branch.
pub fn seeded_db() -> (Database, BranchRecord) {
    let db = Database::open_in_memory().unwrap();
    let repository = RepositoryRecord::from_details(&details("octo", "wiki", Some("TypeScript")));
    db.insert_repository(&repository).unwrap();
    let branch = BranchRecord::new(repository.id, "main", "abc123", Utc::now());
    let branch = db.insert_branch(&branch).unwrap();
    (db, branch)
}
