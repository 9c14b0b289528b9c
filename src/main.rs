//! Registrar - automated plugin registry publisher.
//!
//! Consumes release webhook deliveries (or fetches a release directly) and
//! runs the publish workflow against the configured registry repository.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use registrar::webhook::EventRepository;
use registrar::{
    verify_signature, GitHubClient, HttpFetcher, PublishOutcome, PublishWorkflow, ReleaseEvent,
    Settings, StaticToken, RELEASE_EVENT,
};

/// Automated plugin registry publisher
#[derive(Parser)]
#[command(name = "registrar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one webhook delivery payload
    Process {
        /// Path to the delivery body; read from stdin when omitted
        #[arg(short, long)]
        payload: Option<PathBuf>,

        /// Event name from the X-GitHub-Event header
        #[arg(short, long, default_value = RELEASE_EVENT)]
        event: String,

        /// Value of the X-Hub-Signature-256 header; checked when a webhook
        /// secret is configured
        #[arg(short, long)]
        signature: Option<String>,
    },

    /// Publish an existing release of a plugin repository
    Publish {
        /// Source repository in owner/name form
        repo: String,

        /// Release tag; the latest release when omitted
        #[arg(short, long)]
        tag: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Process { payload, event, signature } => {
            cmd_process(payload.as_ref(), &event, signature.as_deref())
        }
        Commands::Publish { repo, tag } => cmd_publish(&repo, tag.as_deref()),
    }
}

/// Process a webhook delivery: verify, parse, and run the publish workflow.
fn cmd_process(payload: Option<&PathBuf>, event_name: &str, signature: Option<&str>) -> Result<()> {
    info!("Received event: {event_name}");
    if event_name != RELEASE_EVENT {
        info!("Not a release event, skip");
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let body = read_payload(payload)?;

    if let Some(secret) = &settings.webhook_secret {
        verify_signature(secret, &body, signature)?;
    }

    let event: ReleaseEvent =
        serde_json::from_slice(&body).context("Delivery payload is not a release event")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let client = new_client(&settings);
        run_workflow(&settings, &client, &event).await
    })
}

/// Publish an already-existing release without a webhook delivery.
fn cmd_publish(repo: &str, tag: Option<&str>) -> Result<()> {
    let settings = Settings::from_env()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let client = new_client(&settings);

        let release = client.fetch_release(repo, tag).await?;
        info!(repo, tag = %release.tag_name, "Fetched release");

        let event = ReleaseEvent {
            action: None,
            release,
            repository: EventRepository { full_name: repo.to_string(), html_url: None },
        };

        run_workflow(&settings, &client, &event).await
    })
}

fn new_client(settings: &Settings) -> GitHubClient {
    GitHubClient::new(
        &settings.repo_name,
        Box::new(StaticToken::new(settings.github_token.clone())),
    )
}

async fn run_workflow(
    settings: &Settings,
    client: &GitHubClient,
    event: &ReleaseEvent,
) -> Result<()> {
    let fetcher = HttpFetcher::new();
    let workflow = PublishWorkflow::new(client, &fetcher, settings);

    match workflow.run(event).await? {
        PublishOutcome::Skipped { reason } => {
            info!("Skipped: {reason}");
        }
        PublishOutcome::Published { branch, pr_number, plugin_id, version, updated } => {
            let verb = if updated { "Updated" } else { "Created" };
            info!("[{branch}] {verb} plugin {plugin_id} v{version} via pull request #{pr_number}");
        }
    }

    Ok(())
}

fn read_payload(path: Option<&PathBuf>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read payload from {}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_read_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"ok":true}"#).unwrap();

        let body = read_payload(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_read_payload_missing_file_is_an_error() {
        let err = read_payload(Some(&PathBuf::from("/nonexistent/payload.json"))).unwrap_err();
        assert!(err.to_string().contains("payload.json"));
    }
}
