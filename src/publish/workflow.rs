//! One publish run, start to finish.
//!
//! The run is a strict sequence of externally visible steps:
//!
//! ```text
//! classify -> fetch manifest + registry -> create work branch
//!   -> [stage logo] -> commit merged registry -> open PR -> merge PR
//!   -> delete work branch
//! ```
//!
//! Fetches happen before the first write, so a fetch failure leaves the
//! repository untouched. Once the work branch exists, any failure aborts the
//! run; the work branch is then deleted best-effort so no orphan refs pile
//! up, but writes already applied on it are not rolled back. The registry
//! commit carries the revision token captured at fetch time, so a concurrent
//! run loses with a visible conflict instead of silently overwriting.

use chrono::Utc;
use tracing::{error, info, warn};

use super::fetch::{AssetFetcher, FetchError};
use crate::config::Settings;
use crate::github::{GitHubError, RepoHost};
use crate::registry::{self, EntryError, PluginEntry, REGISTRY_FILE};
use crate::release::{classify, ClassifiedAssets, LogoAsset};
use crate::webhook::ReleaseEvent;

/// Fixed placeholder body for the registry pull request.
pub const PR_BODY: &str = "...";

/// Result type for publish runs.
pub type PublishResult<T> = Result<T, PublishError>;

/// Why a publish run failed.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// A host operation (branch, file, pull request) failed.
    #[error("Host operation failed: {0}")]
    Host(#[from] GitHubError),

    /// An asset download failed.
    #[error("Asset download failed: {0}")]
    Fetch(#[from] FetchError),

    /// The fetched manifest document was rejected.
    #[error("Fetched manifest was rejected: {0}")]
    Entry(#[from] EntryError),

    /// The registry file did not decode as a JSON array of entries.
    #[error("Registry file is not a valid JSON array: {0}")]
    Registry(#[from] serde_json::Error),
}

/// Terminal state of a publish run that did not fail.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Nothing to publish; no writes were performed.
    Skipped {
        /// Human-readable reason, for the operator.
        reason: String,
    },

    /// The registry update merged and the work branch is gone.
    Published {
        /// Work branch the run staged its commits on.
        branch: String,
        /// Pull request that carried the update.
        pr_number: u64,
        /// Plugin the entry belongs to.
        plugin_id: String,
        /// Version that was published.
        version: String,
        /// `true` when an existing entry was replaced, `false` when appended.
        updated: bool,
    },
}

/// Orchestrator for publish runs against one registry repository.
///
/// Holds references only; the host client and fetcher are constructed once
/// at startup and shared across runs.
pub struct PublishWorkflow<'a, H: RepoHost, F: AssetFetcher> {
    host: &'a H,
    fetcher: &'a F,
    settings: &'a Settings,
}

impl<'a, H: RepoHost, F: AssetFetcher> PublishWorkflow<'a, H, F> {
    pub fn new(host: &'a H, fetcher: &'a F, settings: &'a Settings) -> Self {
        Self { host, fetcher, settings }
    }

    /// Run the full publish workflow for one release event.
    pub async fn run(&self, event: &ReleaseEvent) -> PublishResult<PublishOutcome> {
        info!(
            repo = %event.repository.full_name,
            tag = %event.release.tag_name,
            "Processing release"
        );

        let classified = classify(&event.release.assets);
        let Some(manifest_url) = classified.manifest_url.clone() else {
            warn!(repo = %event.repository.full_name, "No plugin.json asset found, skip");
            return Ok(PublishOutcome::Skipped {
                reason: "release has no plugin.json asset".to_string(),
            });
        };

        // Both fetches must succeed before the first write; failing here
        // leaves the repository untouched.
        let entry = self.fetch_entry(&manifest_url, &classified).await?;
        let registry_file = self.host.get_file(REGISTRY_FILE, &self.settings.base_branch).await?;
        let current = registry::parse(&registry_file.text())?;

        // Per-run branch name; seconds resolution is unique enough for
        // webhook-paced runs and doubles as the log correlation id.
        let branch = Utc::now().timestamp().to_string();
        info!("[{branch}] Creating work branch");
        let base_sha = self.host.branch_sha(&self.settings.base_branch).await?;
        self.host.create_branch(&branch, &base_sha).await?;

        // From here on a failure leaves the work branch behind; clean it up
        // best-effort without masking the original error.
        match self
            .publish_on_branch(&branch, entry, current, &registry_file.sha, &classified)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!("[{branch}] Publish failed: {err}");
                match self.host.delete_branch(&branch).await {
                    Ok(()) => info!("[{branch}] Deleted orphaned work branch"),
                    Err(cleanup) => {
                        warn!("[{branch}] Could not delete orphaned work branch: {cleanup}");
                    }
                }
                Err(err)
            }
        }
    }

    /// Steps that stage and land the update once the work branch exists.
    async fn publish_on_branch(
        &self,
        branch: &str,
        mut entry: PluginEntry,
        current: Vec<PluginEntry>,
        registry_sha: &str,
        classified: &ClassifiedAssets,
    ) -> PublishResult<PublishOutcome> {
        let plugin_id = entry.id().to_string();
        let version = entry.version().to_string();

        if let Some(logo) = &classified.logo {
            self.stage_logo(branch, &mut entry, logo, &plugin_id, &version).await?;
        }

        let (merged, updated) = registry::merge(current, entry);
        let verb = if updated { "Update" } else { "Create" };
        let title = format!("{verb} Plugin: {plugin_id} v{version}");

        let content = registry::render(&merged)?;
        self.host
            .update_file(REGISTRY_FILE, &title, content.as_bytes(), registry_sha, branch)
            .await?;
        info!("[{branch}] Committed registry update");

        let pull = self.host.create_pull(&title, PR_BODY, branch, &self.settings.base_branch).await?;
        info!("[{branch}] Opened pull request #{}", pull.number);

        self.host.merge_pull(pull.number).await?;
        info!("[{branch}] Merged pull request #{}", pull.number);

        self.host.delete_branch(branch).await?;
        info!("[{branch}] Deleted work branch");

        Ok(PublishOutcome::Published {
            branch: branch.to_string(),
            pr_number: pull.number,
            plugin_id,
            version,
            updated,
        })
    }

    /// Download the release's manifest and attach the plain assets to it.
    async fn fetch_entry(
        &self,
        manifest_url: &str,
        classified: &ClassifiedAssets,
    ) -> PublishResult<PluginEntry> {
        let document = self.fetcher.fetch_json(manifest_url).await?;
        let mut entry = PluginEntry::from_value(document)?;
        entry.set_assets(&classified.assets)?;
        Ok(entry)
    }

    /// Stage the logo on the work branch and point the entry's `Logo` field
    /// at the raw-content URL it will have once merged to the base branch.
    async fn stage_logo(
        &self,
        branch: &str,
        entry: &mut PluginEntry,
        logo: &LogoAsset,
        plugin_id: &str,
        version: &str,
    ) -> PublishResult<()> {
        let logo_path = format!("{plugin_id}/{}", logo.name);

        // Probe the base branch: present means conditional update, absent
        // means plain create.
        let existing = match self.host.get_file(&logo_path, &self.settings.base_branch).await {
            Ok(file) => Some(file.sha),
            Err(GitHubError::NotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };

        let bytes = self.fetcher.fetch_bytes(&logo.url).await?;

        let verb = if existing.is_some() { "Update" } else { "Create" };
        let message = format!("{verb} Plugin Logo: {plugin_id} v{version}");

        match existing {
            Some(sha) => {
                self.host.update_file(&logo_path, &message, &bytes, &sha, branch).await?;
            }
            None => self.host.create_file(&logo_path, &message, &bytes, branch).await?,
        }
        info!("[{branch}] Staged logo at {logo_path}");

        // The URL targets the base branch, not the work branch: the logo is
        // only reachable there once the pull request merges.
        entry.set_logo(format!(
            "https://raw.githubusercontent.com/{}/refs/heads/{}/{}",
            self.settings.repo_name, self.settings.base_branch, logo_path
        ));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::github::{GitHubResult, PullRequest, RemoteFile};
    use crate::publish::fetch::FetchResult;
    use crate::release::ReleaseAsset;
    use crate::webhook::{EventRepository, Release};

    /// In-memory host that records every call it receives.
    struct MockHost {
        registry: String,
        logo_sha: Option<String>,
        fail_registry_update_with_conflict: bool,
        calls: Mutex<Vec<String>>,
        registry_written: Mutex<Option<String>>,
    }

    impl MockHost {
        fn new(registry: &str) -> Self {
            Self {
                registry: registry.to_string(),
                logo_sha: None,
                fail_registry_update_with_conflict: false,
                calls: Mutex::new(Vec::new()),
                registry_written: Mutex::new(None),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl RepoHost for MockHost {
        async fn get_file(&self, path: &str, branch: &str) -> GitHubResult<RemoteFile> {
            self.record(format!("get_file {path}@{branch}"));
            if path == REGISTRY_FILE {
                return Ok(RemoteFile {
                    path: path.to_string(),
                    sha: "registry-sha".to_string(),
                    content: self.registry.clone().into_bytes(),
                });
            }
            match &self.logo_sha {
                Some(sha) => Ok(RemoteFile {
                    path: path.to_string(),
                    sha: sha.clone(),
                    content: vec![1, 2, 3],
                }),
                None => Err(GitHubError::NotFound(path.to_string())),
            }
        }

        async fn create_file(
            &self,
            path: &str,
            message: &str,
            _content: &[u8],
            branch: &str,
        ) -> GitHubResult<()> {
            self.record(format!("create_file {path}@{branch}: {message}"));
            Ok(())
        }

        async fn update_file(
            &self,
            path: &str,
            message: &str,
            content: &[u8],
            sha: &str,
            branch: &str,
        ) -> GitHubResult<()> {
            self.record(format!("update_file {path}@{branch} sha={sha}: {message}"));
            if path == REGISTRY_FILE {
                if self.fail_registry_update_with_conflict {
                    return Err(GitHubError::Conflict {
                        path: path.to_string(),
                        message: "is at a different sha".to_string(),
                    });
                }
                *self.registry_written.lock().unwrap() =
                    Some(String::from_utf8_lossy(content).into_owned());
            }
            Ok(())
        }

        async fn branch_sha(&self, branch: &str) -> GitHubResult<String> {
            self.record(format!("branch_sha {branch}"));
            Ok("base-sha".to_string())
        }

        async fn create_branch(&self, branch: &str, sha: &str) -> GitHubResult<()> {
            self.record(format!("create_branch {branch} at {sha}"));
            Ok(())
        }

        async fn delete_branch(&self, branch: &str) -> GitHubResult<()> {
            self.record(format!("delete_branch {branch}"));
            Ok(())
        }

        async fn create_pull(
            &self,
            title: &str,
            _body: &str,
            head: &str,
            base: &str,
        ) -> GitHubResult<PullRequest> {
            self.record(format!("create_pull {head}->{base}: {title}"));
            Ok(PullRequest { number: 7, html_url: "https://example.com/pull/7".to_string() })
        }

        async fn merge_pull(&self, number: u64) -> GitHubResult<()> {
            self.record(format!("merge_pull {number}"));
            Ok(())
        }
    }

    /// Canned documents keyed by URL suffix.
    struct MockFetcher {
        manifest: String,
    }

    #[async_trait]
    impl AssetFetcher for MockFetcher {
        async fn fetch_json(&self, url: &str) -> FetchResult<serde_json::Value> {
            serde_json::from_str(&self.manifest)
                .map_err(|source| FetchError::Json { url: url.to_string(), source })
        }

        async fn fetch_bytes(&self, _url: &str) -> FetchResult<Vec<u8>> {
            Ok(vec![0x89, 0x50, 0x4e, 0x47])
        }
    }

    fn settings() -> Settings {
        Settings {
            repo_name: "owner/registry".to_string(),
            base_branch: "main".to_string(),
            github_token: "token".to_string(),
            webhook_secret: None,
        }
    }

    fn asset(id: u64, name: &str, content_type: &str) -> ReleaseAsset {
        ReleaseAsset {
            id,
            name: name.to_string(),
            content_type: content_type.to_string(),
            size: 10,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            browser_download_url: format!("https://example.com/{name}"),
        }
    }

    fn event(assets: Vec<ReleaseAsset>) -> ReleaseEvent {
        ReleaseEvent {
            action: Some("published".to_string()),
            release: Release {
                id: 1,
                tag_name: "v2.0".to_string(),
                name: None,
                draft: false,
                prerelease: false,
                assets,
            },
            repository: EventRepository {
                full_name: "someone/plugin-repo".to_string(),
                html_url: None,
            },
        }
    }

    fn manifest(id: &str, version: &str) -> String {
        json!({"Id": id, "Version": version, "Name": "A plugin"}).to_string()
    }

    #[tokio::test]
    async fn test_publish_appends_new_entry() {
        let host = MockHost::new(r#"[{"Id": "other", "Version": "1"}]"#);
        let fetcher = MockFetcher { manifest: manifest("fresh", "1.0") };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        let outcome = workflow
            .run(&event(vec![
                asset(1, "plugin.json", "application/json"),
                asset(2, "app.zip", "application/zip"),
            ]))
            .await
            .unwrap();

        let PublishOutcome::Published { pr_number, updated, plugin_id, version, .. } = outcome
        else {
            panic!("expected a published outcome");
        };
        assert_eq!(pr_number, 7);
        assert!(!updated);
        assert_eq!(plugin_id, "fresh");
        assert_eq!(version, "1.0");

        let calls = host.calls();
        assert!(calls[0].starts_with("get_file plugin.json@main"));
        assert!(calls.iter().any(|c| c.contains("Create Plugin: fresh v1.0")));
        assert!(calls.last().unwrap().starts_with("delete_branch"));

        // The committed registry keeps the old entry first and appends the
        // new one with its assets attached.
        let written = host.registry_written.lock().unwrap().clone().unwrap();
        let entries = registry::parse(&written).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), "other");
        assert_eq!(entries[1].id(), "fresh");
        let assets = entries[1].get("Assets").unwrap();
        assert_eq!(assets[0]["name"], "app.zip");
    }

    #[tokio::test]
    async fn test_publish_replaces_existing_entry() {
        let host = MockHost::new(r#"[{"Id": "x", "Version": "1"}, {"Id": "z", "Version": "1"}]"#);
        let fetcher = MockFetcher { manifest: manifest("x", "2") };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        let outcome =
            workflow.run(&event(vec![asset(1, "plugin.json", "application/json")])).await.unwrap();

        let PublishOutcome::Published { updated, .. } = outcome else {
            panic!("expected a published outcome");
        };
        assert!(updated);

        assert!(host.calls().iter().any(|c| c.contains("Update Plugin: x v2")));

        let written = host.registry_written.lock().unwrap().clone().unwrap();
        let entries = registry::parse(&written).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), "x");
        assert_eq!(entries[0].version(), "2");
        assert_eq!(entries[1].id(), "z");
    }

    #[tokio::test]
    async fn test_skip_without_manifest_performs_no_writes() {
        let host = MockHost::new("[]");
        let fetcher = MockFetcher { manifest: manifest("x", "1") };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        let outcome =
            workflow.run(&event(vec![asset(1, "app.zip", "application/zip")])).await.unwrap();

        assert!(matches!(outcome, PublishOutcome::Skipped { .. }));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_manifest_fails_before_any_write() {
        let host = MockHost::new("[]");
        let fetcher = MockFetcher { manifest: "not json".to_string() };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        let err = workflow
            .run(&event(vec![asset(1, "plugin.json", "application/json")]))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Fetch(FetchError::Json { .. })));
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stale_registry_sha_aborts_before_pull_request() {
        let mut host = MockHost::new("[]");
        host.fail_registry_update_with_conflict = true;
        let fetcher = MockFetcher { manifest: manifest("x", "1") };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        let err = workflow
            .run(&event(vec![asset(1, "plugin.json", "application/json")]))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Host(GitHubError::Conflict { .. })));

        let calls = host.calls();
        assert!(!calls.iter().any(|c| c.starts_with("create_pull")));
        // The orphaned work branch was cleaned up best-effort.
        assert_eq!(calls.iter().filter(|c| c.starts_with("delete_branch")).count(), 1);
    }

    #[tokio::test]
    async fn test_logo_create_when_absent_on_base_branch() {
        let host = MockHost::new("[]");
        let fetcher = MockFetcher { manifest: manifest("viewer", "3.1") };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        workflow
            .run(&event(vec![
                asset(1, "plugin.json", "application/json"),
                asset(2, "icon.png", "image/png"),
            ]))
            .await
            .unwrap();

        let calls = host.calls();
        assert!(calls
            .iter()
            .any(|c| c.starts_with("create_file viewer/icon.png@")
                && c.contains("Create Plugin Logo: viewer v3.1")));

        // The entry points at the base branch raw URL, not the work branch.
        let written = host.registry_written.lock().unwrap().clone().unwrap();
        let entries = registry::parse(&written).unwrap();
        assert_eq!(
            entries[0].get("Logo").unwrap(),
            &json!("https://raw.githubusercontent.com/owner/registry/refs/heads/main/viewer/icon.png")
        );
    }

    #[tokio::test]
    async fn test_logo_update_when_present_on_base_branch() {
        let mut host = MockHost::new("[]");
        host.logo_sha = Some("old-logo-sha".to_string());
        let fetcher = MockFetcher { manifest: manifest("viewer", "3.2") };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        workflow
            .run(&event(vec![
                asset(1, "plugin.json", "application/json"),
                asset(2, "icon.png", "image/png"),
            ]))
            .await
            .unwrap();

        let calls = host.calls();
        assert!(calls
            .iter()
            .any(|c| c.starts_with("update_file viewer/icon.png@")
                && c.contains("sha=old-logo-sha")
                && c.contains("Update Plugin Logo: viewer v3.2")));
    }

    #[tokio::test]
    async fn test_manifest_missing_required_keys_is_rejected() {
        let host = MockHost::new("[]");
        let fetcher = MockFetcher { manifest: json!({"Name": "nope"}).to_string() };
        let settings = settings();
        let workflow = PublishWorkflow::new(&host, &fetcher, &settings);

        let err = workflow
            .run(&event(vec![asset(1, "plugin.json", "application/json")]))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Entry(EntryError::MissingField(_))));
        assert!(host.calls().is_empty());
    }
}
