//! Token sources for host authentication.

use async_trait::async_trait;

use super::GitHubResult;

/// Source of bearer tokens for API requests.
///
/// Installation tokens expire and must be renewed; an implementation owns
/// that lifecycle internally so the client stays a plain, shareable object
/// constructed once at startup.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A token currently valid for API calls.
    async fn token(&self) -> GitHubResult<String>;
}

/// A fixed token: a PAT or a pre-issued installation token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep the secret out of logs.
        f.debug_tuple("StaticToken").field(&"***").finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> GitHubResult<String> {
        Ok(self.0.clone())
    }
}
