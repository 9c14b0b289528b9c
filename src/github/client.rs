//! GitHub REST API client for the registry repository.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::{GitHubError, GitHubResult, PullRequest, RemoteFile, RepoHost, TokenProvider};
use crate::webhook::Release;

/// Client over the GitHub REST API, bound to one registry repository.
///
/// Constructed once at startup and passed by reference wherever host access
/// is needed; authentication goes through a [`TokenProvider`] so expiring
/// credentials refresh without the call sites noticing.
pub struct GitHubClient {
    /// Repository owner.
    owner: String,
    /// Repository name.
    repo: String,
    /// Token source for request authentication.
    auth: Box<dyn TokenProvider>,
    /// HTTP client.
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

#[derive(Deserialize)]
struct MergeResponse {
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    message: String,
}

impl GitHubClient {
    /// Create a client for `owner/name` with the given token source.
    pub fn new(full_name: &str, auth: Box<dyn TokenProvider>) -> Self {
        let (owner, repo) = full_name.split_once('/').unwrap_or((full_name, ""));
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            auth,
            client: reqwest::Client::new(),
        }
    }

    /// API URL under this client's repository.
    fn api_url(&self, path: &str) -> String {
        format!("https://api.github.com/repos/{}/{}/{}", self.owner, self.repo, path)
    }

    /// Contents API URL for a file path, each segment percent-encoded.
    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> =
            path.split('/').map(|seg| urlencoding::encode(seg).into_owned()).collect();
        self.api_url(&format!("contents/{}", encoded.join("/")))
    }

    /// Make an authenticated request.
    async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> GitHubResult<reqwest::RequestBuilder> {
        let token = self.auth.token().await?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("registrar/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", "2022-11-28"))
    }

    /// Parse error response from the API.
    async fn parse_error(&self, response: reqwest::Response) -> GitHubError {
        let status = response.status().as_u16();

        match status {
            401 => GitHubError::Unauthorized,
            403 => {
                if response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s == "0")
                    .unwrap_or(false)
                {
                    return GitHubError::RateLimited;
                }
                GitHubError::Api { status, message: "Forbidden".to_string() }
            }
            404 => GitHubError::NotFound("Resource not found".to_string()),
            _ => {
                let message = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                    .unwrap_or_else(|| format!("HTTP {status}"));
                GitHubError::Api { status, message }
            }
        }
    }

    /// Write a file through the contents API; `sha` switches the call from
    /// create to conditional update. A 409 means the revision went stale.
    async fn put_contents(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        sha: Option<&str>,
        branch: &str,
    ) -> GitHubResult<()> {
        let url = self.contents_url(path);

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self.request(reqwest::Method::PUT, &url).await?.json(&body).send().await?;

        if response.status().as_u16() == 409 {
            let err = self.parse_error(response).await;
            return Err(GitHubError::Conflict { path: path.to_string(), message: err.to_string() });
        }
        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        Ok(())
    }

    /// Fetch a release of an arbitrary repository: the latest one, or the
    /// one tagged `tag`.
    pub async fn fetch_release(
        &self,
        full_name: &str,
        tag: Option<&str>,
    ) -> GitHubResult<Release> {
        let url = match tag {
            Some(tag) => format!(
                "https://api.github.com/repos/{full_name}/releases/tags/{}",
                urlencoding::encode(tag)
            ),
            None => format!("https://api.github.com/repos/{full_name}/releases/latest"),
        };

        let response = self.request(reqwest::Method::GET, &url).await?.send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        let release: Release = response.json().await?;
        Ok(release)
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn get_file(&self, path: &str, branch: &str) -> GitHubResult<RemoteFile> {
        let url = format!("{}?ref={}", self.contents_url(path), urlencoding::encode(branch));

        let response = self.request(reqwest::Method::GET, &url).await?.send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        let contents: ContentsResponse = response.json().await?;
        let encoded = contents.content.ok_or_else(|| {
            GitHubError::Decode(format!("contents response for {path} had no content field"))
        })?;

        // The API wraps base64 bodies at 60 columns.
        let stripped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let content = BASE64
            .decode(stripped.as_bytes())
            .map_err(|e| GitHubError::Decode(format!("invalid base64 for {path}: {e}")))?;

        Ok(RemoteFile { path: path.to_string(), sha: contents.sha, content })
    }

    async fn create_file(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        branch: &str,
    ) -> GitHubResult<()> {
        self.put_contents(path, message, content, None, branch).await
    }

    async fn update_file(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        sha: &str,
        branch: &str,
    ) -> GitHubResult<()> {
        self.put_contents(path, message, content, Some(sha), branch).await
    }

    async fn branch_sha(&self, branch: &str) -> GitHubResult<String> {
        let url = self.api_url(&format!("git/ref/heads/{branch}"));

        let response = self.request(reqwest::Method::GET, &url).await?.send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        let reference: RefResponse = response.json().await?;
        Ok(reference.object.sha)
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> GitHubResult<()> {
        let url = self.api_url("git/refs");
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });

        let response = self.request(reqwest::Method::POST, &url).await?.json(&body).send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> GitHubResult<()> {
        let url = self.api_url(&format!("git/refs/heads/{branch}"));

        let response = self.request(reqwest::Method::DELETE, &url).await?.send().await?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(self.parse_error(response).await);
        }

        Ok(())
    }

    async fn create_pull(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> GitHubResult<PullRequest> {
        let url = self.api_url("pulls");
        let payload = json!({ "title": title, "body": body, "head": head, "base": base });

        let response =
            self.request(reqwest::Method::POST, &url).await?.json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        let pull: PullResponse = response.json().await?;
        Ok(PullRequest { number: pull.number, html_url: pull.html_url })
    }

    async fn merge_pull(&self, number: u64) -> GitHubResult<()> {
        let url = self.api_url(&format!("pulls/{number}/merge"));

        let response =
            self.request(reqwest::Method::PUT, &url).await?.json(&json!({})).send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }

        let merge: MergeResponse = response.json().await?;
        if !merge.merged {
            return Err(GitHubError::Api {
                status: 200,
                message: format!("merge was not performed: {}", merge.message),
            });
        }

        Ok(())
    }
}
