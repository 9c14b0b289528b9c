//! Registry entries as open JSON documents.
//!
//! A plugin's manifest entry is an extensible object: two keys are required
//! (`Id`, `Version`), two are managed by the publish workflow (`Logo`,
//! `Assets`), and everything else belongs to the plugin author and must
//! survive a publish run untouched, in its original order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::release::ReleaseAsset;

/// Required key: stable plugin identifier.
pub const ID_KEY: &str = "Id";

/// Required key: plugin version string.
pub const VERSION_KEY: &str = "Version";

/// Managed key: raw-content URL of the plugin logo.
pub const LOGO_KEY: &str = "Logo";

/// Managed key: downloadable assets of the publishing release.
pub const ASSETS_KEY: &str = "Assets";

/// Result type for entry operations.
pub type EntryResult<T> = Result<T, EntryError>;

/// Errors raised while validating a manifest entry.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The manifest document is not a JSON object.
    #[error("Manifest entry is not a JSON object")]
    NotAnObject,

    /// A required key is absent or not a non-empty string.
    #[error("Manifest entry is missing required string field `{0}`")]
    MissingField(&'static str),

    /// The assets array could not be serialized into the entry.
    #[error("Failed to attach assets to manifest entry: {0}")]
    Assets(#[from] serde_json::Error),
}

/// One plugin's entry in the registry.
///
/// Wraps the raw JSON object so unknown fields round-trip exactly.
/// Registry-side entries deserialize without validation (the registry is
/// trusted as-is); a freshly fetched manifest goes through [`PluginEntry::from_value`]
/// which enforces the required keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginEntry(Map<String, Value>);

impl PluginEntry {
    /// Validate a fetched manifest document into an entry.
    pub fn from_value(value: Value) -> EntryResult<Self> {
        let Value::Object(map) = value else {
            return Err(EntryError::NotAnObject);
        };

        for key in [ID_KEY, VERSION_KEY] {
            match map.get(key) {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => return Err(EntryError::MissingField(key)),
            }
        }

        Ok(Self(map))
    }

    /// Plugin identifier. Empty for registry-side entries that lack one.
    pub fn id(&self) -> &str {
        self.0.get(ID_KEY).and_then(Value::as_str).unwrap_or("")
    }

    /// Plugin version. Empty for registry-side entries that lack one.
    pub fn version(&self) -> &str {
        self.0.get(VERSION_KEY).and_then(Value::as_str).unwrap_or("")
    }

    /// Point the entry's `Logo` key at a raw-content URL.
    pub fn set_logo(&mut self, url: impl Into<String>) {
        self.0.insert(LOGO_KEY.to_string(), Value::String(url.into()));
    }

    /// Replace the entry's `Assets` key with the release's plain assets.
    pub fn set_assets(&mut self, assets: &[ReleaseAsset]) -> EntryResult<()> {
        let value = serde_json::to_value(assets)?;
        self.0.insert(ASSETS_KEY.to_string(), value);
        Ok(())
    }

    /// Read an arbitrary field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
