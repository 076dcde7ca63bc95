//! Forge client: repository tree listing, file content, issue creation.
//!
//! [`ForgeClient`] is the seam the orchestrator talks to; [`GitHubClient`] is
//! the REST implementation.

mod client;

pub use client::GitHubClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Result, ReviewError};

/// Where file content is read from and issues are written to.
///
/// Immutable once a batch starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub owner: String,
    pub repo_name: String,
    pub branch: String,
}

impl RepoContext {
    pub fn new(
        owner: impl Into<String>,
        repo_name: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo_name: repo_name.into(),
            branch: branch.into(),
        }
    }

    /// Parse `owner/repo` or a GitHub URL into a context on `branch`.
    pub fn parse(slug_or_url: &str, branch: impl Into<String>) -> Result<Self> {
        let slug = parse_owner_repo(slug_or_url).ok_or_else(|| {
            ReviewError::Validation(format!(
                "Expected 'owner/repo' or a GitHub URL, got '{}'",
                slug_or_url
            ))
        })?;
        let (owner, repo) = slug
            .split_once('/')
            .ok_or_else(|| ReviewError::Validation(format!("Invalid repository '{}'", slug)))?;
        Ok(Self::new(owner, repo, branch))
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo_name)
    }
}

impl fmt::Display for RepoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (branch: {})", self.owner, self.repo_name, self.branch)
    }
}

/// Parse the `owner/repo` slug from a bare slug or a GitHub URL.
///
/// Handles:
/// - `owner/repo`
/// - `https://github.com/owner/repo`
/// - `https://github.com/owner/repo.git`
pub fn parse_owner_repo(input: &str) -> Option<String> {
    let input = input.trim();
    let path = match input.strip_prefix("https://") {
        Some(rest) => rest.strip_prefix("github.com/")?,
        None => input,
    };
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() == 2 && parts.iter().all(|p| !p.is_empty() && !p.contains(':')) {
        Some(format!("{}/{}", parts[0], parts[1]))
    } else {
        None
    }
}

/// A file offered for analysis. `content_id` is the blob SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    pub path: String,
    pub content_id: String,
}

impl CandidateFile {
    pub fn new(path: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_id: content_id.into(),
        }
    }
}

/// The forge's answer to an issue creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueHandle {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Request/response wrapper around the forge's REST API.
///
/// Implementations are stateless; the token is supplied on every call.
#[async_trait]
pub trait ForgeClient: Send + Sync {
    /// Every blob in the branch's tree, directories excluded, in tree order.
    async fn list_files(&self, repo: &RepoContext, token: &str) -> Result<Vec<CandidateFile>>;

    /// Text content of `path`, read at `branch` when given.
    async fn fetch_content(
        &self,
        repo: &RepoContext,
        path: &str,
        token: &str,
        branch: Option<&str>,
    ) -> Result<String>;

    async fn create_issue(
        &self,
        repo: &RepoContext,
        token: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueHandle>;
}
