//! The publish workflow.
//!
//! Turns one release into one merged registry pull request: classify the
//! release's assets, fetch the new manifest and the current registry, merge
//! by plugin id, stage everything on a fresh work branch, open the pull
//! request and merge it.

mod fetch;
mod workflow;

pub use fetch::{AssetFetcher, FetchError, FetchResult, HttpFetcher};
pub use workflow::{PublishError, PublishOutcome, PublishResult, PublishWorkflow, PR_BODY};
