//! GitHub HTTP client.

use crate::tree::build_tree;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repowiki_config::GithubConfig;
use repowiki_core::{
    DirectoryNode, Error, RateLimitStatus, RateLimiter, RepositoryDetails, RepositoryHost, Result,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const API_VERSION: &str = "2022-11-28";

/// Client for the GitHub REST API and raw content host.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
    raw_url: String,
}

impl GithubClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        if let Some(token) = config.resolved_token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::InvalidInput(format!("Invalid GitHub token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        } else {
            debug!("No GitHub token configured, using unauthenticated rate limits");
        }

        let client = Client::builder()
            .user_agent(concat!("repowiki/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(network)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        self.client.get(url).send().await.map_err(network)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = ensure_success(self.get(url).await?).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[async_trait]
impl RepositoryHost for GithubClient {
    async fn fetch_details(&self, owner: &str, repo: &str) -> Result<RepositoryDetails> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, repo);
        let response = self.get(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::RepositoryNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }
        let repository: RepoResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let commit: CommitResponse = self
            .get_json(&format!(
                "{}/repos/{}/{}/commits/{}",
                self.api_url, owner, repo, repository.default_branch
            ))
            .await?;

        let commit_at = commit
            .commit
            .committer
            .and_then(|c| c.date)
            .unwrap_or_else(Utc::now);

        Ok(RepositoryDetails {
            owner: repository.owner.login,
            repo: repository.name,
            url: repository.html_url,
            language: repository.language,
            description: repository.description,
            stars: repository.stargazers_count,
            forks: repository.forks_count,
            topics: repository.topics,
            default_branch: repository.default_branch,
            commit_sha: commit.sha,
            commit_at,
        })
    }

    async fn fetch_tree(&self, owner: &str, repo: &str, commit_sha: &str) -> Result<DirectoryNode> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_url, owner, repo, commit_sha
        );
        let listing: TreeResponse = self.get_json(&url).await?;

        if listing.truncated {
            warn!(
                "Tree of {}/{} at {} was truncated by GitHub, some files will be missing",
                owner, repo, commit_sha
            );
        }

        Ok(build_tree(&listing.tree))
    }

    async fn fetch_file(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
        path: &str,
    ) -> Result<String> {
        let url = format!("{}/{}/{}/{}/{}", self.raw_url, owner, repo, commit_sha, path);
        let response = ensure_success(self.get(&url).await?).await?;
        response.text().await.map_err(network)
    }
}

#[async_trait]
impl RateLimiter for GithubClient {
    async fn check(&self) -> Result<RateLimitStatus> {
        let url = format!("{}/rate_limit", self.api_url);
        let limits: RateLimitResponse = self.get_json(&url).await?;
        let core = limits.resources.core;

        Ok(RateLimitStatus {
            remaining: core.remaining,
            reset_at: reset_time(core.reset),
        })
    }
}

/// Convert a reset timestamp in epoch seconds.
fn reset_time(epoch_seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_seconds, 0).unwrap_or_else(Utc::now)
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(Error::Host {
        status: status.as_u16(),
        message,
    })
}

fn network(err: reqwest::Error) -> Error {
    Error::Network(err.to_string())
}
