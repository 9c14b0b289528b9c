//! GitHub as the remote repository host.
//!
//! [`RepoHost`] is the narrow surface the publish workflow needs from the
//! host: conditional file writes, branch refs, and pull requests.
//! [`GitHubClient`] is the real implementation over the REST API; tests swap
//! in their own.

mod auth;
mod client;
mod host;

pub use auth::{StaticToken, TokenProvider};
pub use client::GitHubClient;
pub use host::{GitHubError, GitHubResult, PullRequest, RemoteFile, RepoHost};
