// ─── Version Manifest ───
// Fetches the version manifest and resolves one release to its full details.

use serde::Deserialize;
use tracing::info;

use super::version_file::VersionDetails;
use crate::core::downloader::{fetch_json, ArtifactFetcher};
use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

/// Version details together with the document they were parsed from.
///
/// `raw` is what gets cached on disk so launch data the typed model ignores survives.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub details: VersionDetails,
    pub raw: serde_json::Value,
}

impl ResolvedVersion {
    pub fn from_value(raw: serde_json::Value) -> LauncherResult<Self> {
        let details = serde_json::from_value(raw.clone())?;
        Ok(Self { details, raw })
    }
}

impl VersionManifest {
    pub async fn fetch(fetcher: &dyn ArtifactFetcher, url: &str) -> LauncherResult<Self> {
        info!("Fetching version manifest from {}", url);
        let manifest: VersionManifest = fetch_json(fetcher, url).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by exact id (e.g. "1.21.11").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

/// Fetch the manifest, pick `version_id` and fetch its details document.
pub async fn resolve_version(
    fetcher: &dyn ArtifactFetcher,
    manifest_url: &str,
    version_id: &str,
) -> LauncherResult<ResolvedVersion> {
    let manifest = VersionManifest::fetch(fetcher, manifest_url).await?;
    let entry = manifest
        .find_version(version_id)
        .ok_or_else(|| LauncherError::VersionNotFound(version_id.to_string()))?;

    let raw: serde_json::Value = fetch_json(fetcher, &entry.url).await?;
    ResolvedVersion::from_value(raw)
}
