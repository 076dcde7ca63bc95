use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{CandidateFile, ForgeClient, IssueHandle, RepoContext};
use crate::config::DEFAULT_GITHUB_API_BASE;
use crate::credentials::Principal;
use crate::errors::{Result, ReviewError};

const USER_AGENT: &str = "repolens";

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// GitHub REST implementation of [`ForgeClient`].
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new(DEFAULT_GITHUB_API_BASE)
    }
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build `{api_base}/seg/seg/...`, percent-encoding each segment.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| ReviewError::Config(format!("Invalid GitHub API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ReviewError::Config("GitHub API base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        token: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        debug!(%method, %url, "GitHub request");
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            return Err(map_status(status, &message));
        }
        Ok(resp.json::<T>().await?)
    }

    /// Profile of the token's owner.
    pub async fn current_user(&self, token: &str) -> Result<Principal> {
        let url = self.url(["user"])?;
        self.send(Method::GET, url, token, None).await
    }
}

/// Map a non-success status to the error taxonomy.
fn map_status(status: StatusCode, message: &str) -> ReviewError {
    let text = format!("GitHub API Error: {} {}", status.as_u16(), message);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ReviewError::Auth(text),
        StatusCode::NOT_FOUND => ReviewError::NotFound(text),
        StatusCode::UNPROCESSABLE_ENTITY => ReviewError::Validation(text),
        _ => ReviewError::Http(text),
    }
}

/// Decode the contents API's base64 payload into UTF-8 text.
fn decode_content(path: &str, resp: ContentResponse) -> Result<String> {
    let content = match (resp.encoding.as_deref(), resp.content) {
        (Some("base64"), Some(content)) if !content.is_empty() => content,
        _ => {
            return Err(ReviewError::NotFound(format!(
                "File content not available or not base64 encoded for {}",
                path
            )));
        }
    };

    // GitHub wraps the payload at 60 columns.
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|_| ReviewError::Decode(format!("Failed to decode base64 content for {}", path)))?;
    String::from_utf8(bytes)
        .map_err(|_| ReviewError::Decode(format!("File {} is not valid UTF-8 text", path)))
}

#[async_trait]
impl ForgeClient for GitHubClient {
    async fn list_files(&self, repo: &RepoContext, token: &str) -> Result<Vec<CandidateFile>> {
        let url = self.url([
            "repos",
            repo.owner.as_str(),
            repo.repo_name.as_str(),
            "branches",
            repo.branch.as_str(),
        ])?;
        let branch: BranchResponse = self.send(Method::GET, url, token, None).await?;

        let mut url = self.url([
            "repos",
            repo.owner.as_str(),
            repo.repo_name.as_str(),
            "git",
            "trees",
            branch.commit.sha.as_str(),
        ])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let tree: TreeResponse = self.send(Method::GET, url, token, None).await?;

        if tree.truncated {
            warn!(repo = %repo.slug(), "tree listing was truncated by GitHub");
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob")
            .map(|item| CandidateFile::new(item.path, item.sha))
            .collect())
    }

    async fn fetch_content(
        &self,
        repo: &RepoContext,
        path: &str,
        token: &str,
        branch: Option<&str>,
    ) -> Result<String> {
        let mut segments = vec![
            "repos",
            repo.owner.as_str(),
            repo.repo_name.as_str(),
            "contents",
        ];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.url(segments)?;
        if let Some(branch) = branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        let resp: ContentResponse = self.send(Method::GET, url, token, None).await?;
        decode_content(path, resp)
    }

    async fn create_issue(
        &self,
        repo: &RepoContext,
        token: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueHandle> {
        let url = self.url(["repos", repo.owner.as_str(), repo.repo_name.as_str(), "issues"])?;
        let payload = serde_json::json!({
            "title": title,
            "body": body,
            "labels": labels,
        });
        self.send(Method::POST, url, token, Some(payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoContext {
        RepoContext::new("octo", "demo", "main")
    }

    async fn mount_branch(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/branches/main"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"name": "main", "commit": {"sha": "abc123"}})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_files_excludes_trees() {
        let server = MockServer::start().await;
        mount_branch(&server).await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/git/trees/abc123"))
            .and(query_param("recursive", "1"))
            .and(header("Authorization", "Bearer ghp_t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": "abc123",
                "truncated": false,
                "tree": [
                    {"path": "src", "mode": "040000", "type": "tree", "sha": "t1"},
                    {"path": "src/main.rs", "mode": "100644", "type": "blob", "sha": "b1"},
                    {"path": "README.md", "mode": "100644", "type": "blob", "sha": "b2"}
                ]
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let files = client.list_files(&repo(), "ghp_t").await.unwrap();
        assert_eq!(
            files,
            vec![
                CandidateFile::new("src/main.rs", "b1"),
                CandidateFile::new("README.md", "b2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_files_missing_branch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/branches/main"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "Branch not found"})),
            )
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let err = client.list_files(&repo(), "ghp_t").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "GitHub API Error: 404 Branch not found");
    }

    #[tokio::test]
    async fn test_list_files_bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/branches/main"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let err = client.list_files(&repo(), "ghp_bad").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_fetch_content_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        let encoded = STANDARD.encode("fn main() {\n    println!(\"hi\");\n}\n");
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/src/main.rs"))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "main.rs",
                "path": "src/main.rs",
                "type": "file",
                "encoding": "base64",
                "content": wrapped
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let text = client
            .fetch_content(&repo(), "src/main.rs", "ghp_t", Some("main"))
            .await
            .unwrap();
        assert!(text.contains("println!"));
    }

    #[tokio::test]
    async fn test_fetch_content_non_utf8() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/logo.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "encoding": "base64",
                "content": STANDARD.encode([0xff_u8, 0xfe, 0x00])
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let err = client
            .fetch_content(&repo(), "logo.bin", "ghp_t", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_fetch_content_without_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/big.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "encoding": "none",
                "content": ""
            })))
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let err = client
            .fetch_content(&repo(), "big.json", "ghp_t", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_issue_posts_labels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues"))
            .and(body_json(serde_json::json!({
                "title": "T",
                "body": "B",
                "labels": ["Security", "High"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "number": 12,
                "title": "T",
                "html_url": "https://github.com/octo/demo/issues/12"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let handle = client
            .create_issue(&repo(), "ghp_t", "T", "B", &["Security".into(), "High".into()])
            .await
            .unwrap();
        assert_eq!(handle.number, 12);
    }

    #[tokio::test]
    async fn test_create_issue_validation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/demo/issues"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(serde_json::json!({"message": "Validation Failed"})),
            )
            .mount(&server)
            .await;

        let client = GitHubClient::new(server.uri());
        let err = client
            .create_issue(&repo(), "ghp_t", "T", "B", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Validation Failed"));
    }

    #[test]
    fn test_map_status_other() {
        let err = map_status(StatusCode::BAD_GATEWAY, "Bad Gateway");
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.to_string(), "GitHub API Error: 502 Bad Gateway");
    }
}
