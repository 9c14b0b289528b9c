//! Release asset classification.
//!
//! A release that publishes a plugin carries up to three kinds of assets:
//! the plugin manifest itself (a file named `plugin.json`), an optional logo
//! image, and the downloadable artifacts that end up listed under the
//! registry entry's `Assets` key. Classification partitions the release's
//! asset list into exactly those three buckets.

use serde::{Deserialize, Serialize};

/// File name identifying the manifest asset on a release.
pub const MANIFEST_ASSET_NAME: &str = "plugin.json";

/// One asset attached to a release, reduced to the fields the registry
/// records. Extra payload fields (uploader, download counts, ...) are
/// dropped at deserialization. Timestamps stay as the payload's RFC 3339
/// strings so they round-trip into the registry verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// Asset id assigned by the host.
    pub id: u64,

    /// File name.
    pub name: String,

    /// MIME type reported at upload.
    pub content_type: String,

    /// Size in bytes.
    pub size: u64,

    /// Upload timestamp.
    pub created_at: String,

    /// Last-modified timestamp.
    pub updated_at: String,

    /// Direct download URL.
    pub browser_download_url: String,
}

/// The logo asset picked out of a release, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAsset {
    /// Direct download URL for the image bytes.
    pub url: String,

    /// File name, used as the final path segment in the registry repo.
    pub name: String,
}

/// Result of partitioning a release's assets.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedAssets {
    /// Download URL of the manifest asset, when one was present.
    pub manifest_url: Option<String>,

    /// The logo image, when one was present.
    pub logo: Option<LogoAsset>,

    /// Every remaining asset, input order preserved.
    pub assets: Vec<ReleaseAsset>,
}

impl ClassifiedAssets {
    /// Whether the release carries a manifest and can be published at all.
    pub fn has_manifest(&self) -> bool {
        self.manifest_url.is_some()
    }
}

/// Partition a release's assets into manifest source, logo, and plain assets.
///
/// The first image-typed asset wins the logo slot and the first asset named
/// `plugin.json` wins the manifest slot; everything else, including any
/// later duplicates of either, lands in `assets` with its relative order
/// intact. An image check takes precedence over the file-name check, so a
/// `plugin.json` uploaded with an `image/` content type counts as a logo.
pub fn classify(assets: &[ReleaseAsset]) -> ClassifiedAssets {
    let mut classified = ClassifiedAssets::default();

    for asset in assets {
        if classified.logo.is_none() && asset.content_type.starts_with("image/") {
            classified.logo = Some(LogoAsset {
                url: asset.browser_download_url.clone(),
                name: asset.name.clone(),
            });
        } else if classified.manifest_url.is_none() && asset.name == MANIFEST_ASSET_NAME {
            classified.manifest_url = Some(asset.browser_download_url.clone());
        } else {
            classified.assets.push(asset.clone());
        }
    }

    classified
}
