//! Release event payload types.

use serde::{Deserialize, Serialize};

use crate::release::ReleaseAsset;

/// Event name (from the `X-GitHub-Event` header) that triggers a publish run.
pub const RELEASE_EVENT: &str = "release";

/// A parsed release webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseEvent {
    /// What happened to the release (`published`, `edited`, ...).
    #[serde(default)]
    pub action: Option<String>,

    /// The release the event is about.
    pub release: Release,

    /// Repository the release was published on.
    pub repository: EventRepository,
}

/// Repository block of the event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepository {
    /// `owner/name` of the source repository.
    pub full_name: String,

    /// Web URL of the repository.
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Release block of the event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Release id assigned by the host.
    pub id: u64,

    /// Git tag of the release.
    pub tag_name: String,

    /// Human-readable release title.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the release is a draft.
    #[serde(default)]
    pub draft: bool,

    /// Whether the release is marked as a prerelease.
    #[serde(default)]
    pub prerelease: bool,

    /// Assets attached to the release, upload order preserved.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_event_payload() {
        let payload = r#"{
            "action": "published",
            "release": {
                "id": 99,
                "tag_name": "v1.2.0",
                "name": "Release 1.2.0",
                "draft": false,
                "prerelease": false,
                "assets": [
                    {
                        "id": 1,
                        "name": "plugin.json",
                        "label": null,
                        "state": "uploaded",
                        "content_type": "application/json",
                        "size": 345,
                        "download_count": 0,
                        "created_at": "2024-01-01T00:00:00Z",
                        "updated_at": "2024-01-01T00:00:00Z",
                        "browser_download_url": "https://example.com/plugin.json"
                    }
                ]
            },
            "repository": {
                "full_name": "someone/plugin-repo",
                "html_url": "https://github.com/someone/plugin-repo"
            }
        }"#;

        let event: ReleaseEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.action.as_deref(), Some("published"));
        assert_eq!(event.repository.full_name, "someone/plugin-repo");
        assert_eq!(event.release.tag_name, "v1.2.0");
        assert_eq!(event.release.assets.len(), 1);
        // Extra payload fields on the asset are dropped, the projection stays.
        assert_eq!(event.release.assets[0].name, "plugin.json");
        assert_eq!(event.release.assets[0].size, 345);
    }

    #[test]
    fn test_parse_minimal_payload() {
        let payload = r#"{
            "release": {"id": 1, "tag_name": "v1", "assets": []},
            "repository": {"full_name": "a/b"}
        }"#;

        let event: ReleaseEvent = serde_json::from_str(payload).unwrap();
        assert!(event.action.is_none());
        assert!(!event.release.prerelease);
        assert!(event.release.assets.is_empty());
    }
}
