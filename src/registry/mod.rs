//! The plugin registry: a single JSON array of plugin entries.
//!
//! The registry lives as one `plugin.json` file on the target repository's
//! default branch. This module owns the entry document model, the merge
//! algorithm, and the exact serialization the registry file is written with.

mod entry;
mod merge;

pub use entry::{
    EntryError, EntryResult, PluginEntry, ASSETS_KEY, ID_KEY, LOGO_KEY, VERSION_KEY,
};
pub use merge::merge;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// File name of the registry inside the target repository.
pub const REGISTRY_FILE: &str = "plugin.json";

/// Parse the registry file's content into its entries.
pub fn parse(content: &str) -> serde_json::Result<Vec<PluginEntry>> {
    serde_json::from_str(content)
}

/// Render the registry with 4-space indentation, non-ASCII left verbatim.
///
/// This is the committed on-disk format; changing it would churn every line
/// of the registry file on the next publish.
pub fn render(entries: &[PluginEntry]) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
