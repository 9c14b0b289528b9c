//! # Registrar
//!
//! Automated plugin registry publisher. Registrar watches GitHub release
//! events: when a release ships a `plugin.json` manifest, it merges that
//! entry into the central registry file and lands the change through a
//! short-lived branch and an auto-merged pull request.
//!
//! ## How a publish run works
//!
//! 1. The release's assets are partitioned into the manifest source, an
//!    optional logo image, and plain downloadable assets.
//! 2. The new manifest and the current registry are fetched; the registry's
//!    revision token is kept for a conflict-safe update.
//! 3. A work branch is created, the logo (if any) and the merged registry
//!    are committed to it, and a pull request is opened and merged.
//!
//! A release without a `plugin.json` asset is skipped without touching the
//! registry repository.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]

pub mod config;
pub mod github;
pub mod publish;
pub mod registry;
pub mod release;
pub mod webhook;

pub use config::{ConfigError, ConfigResult, Settings};
pub use github::{
    GitHubClient, GitHubError, GitHubResult, PullRequest, RemoteFile, RepoHost, StaticToken,
    TokenProvider,
};
pub use publish::{
    AssetFetcher, FetchError, HttpFetcher, PublishError, PublishOutcome, PublishResult,
    PublishWorkflow,
};
pub use registry::{merge, EntryError, PluginEntry, REGISTRY_FILE};
pub use release::{classify, ClassifiedAssets, LogoAsset, ReleaseAsset, MANIFEST_ASSET_NAME};
pub use webhook::{verify_signature, ReleaseEvent, SignatureError, RELEASE_EVENT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "registrar";
