//! The remote repository host abstraction.

use async_trait::async_trait;

/// Result type for host operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Error types for host operations.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    /// The write was rejected because the supplied revision token is stale;
    /// the file changed since it was fetched.
    #[error("Write conflict on {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("Response payload was not understood: {0}")]
    Decode(String),
}

/// A file read from the host, together with the revision token required to
/// update it safely.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Path inside the repository.
    pub path: String,

    /// Content blob sha - the revision token for conditional updates.
    pub sha: String,

    /// Decoded file bytes.
    pub content: Vec<u8>,
}

impl RemoteFile {
    /// File content as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// A pull request opened on the host.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number within the repository.
    pub number: u64,

    /// Web URL of the pull request.
    pub html_url: String,
}

/// Operations the publish workflow performs against the registry repository.
///
/// Each call is one externally visible write (or read) on the host; there is
/// no batching. `update_file` must fail with [`GitHubError::Conflict`] when
/// `sha` no longer names the file's current revision.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Read a file and its revision token from a branch.
    async fn get_file(&self, path: &str, branch: &str) -> GitHubResult<RemoteFile>;

    /// Create a file that does not exist yet on `branch`.
    async fn create_file(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        branch: &str,
    ) -> GitHubResult<()>;

    /// Overwrite a file on `branch`, conditional on its current revision.
    async fn update_file(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        sha: &str,
        branch: &str,
    ) -> GitHubResult<()>;

    /// Commit sha a branch currently points at.
    async fn branch_sha(&self, branch: &str) -> GitHubResult<String>;

    /// Create a branch pointing at `sha`.
    async fn create_branch(&self, branch: &str, sha: &str) -> GitHubResult<()>;

    /// Delete a branch ref.
    async fn delete_branch(&self, branch: &str) -> GitHubResult<()>;

    /// Open a pull request from `head` into `base`.
    async fn create_pull(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> GitHubResult<PullRequest>;

    /// Merge a pull request. Merge strategy is the host's concern.
    async fn merge_pull(&self, number: u64) -> GitHubResult<()>;
}
