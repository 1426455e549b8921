use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::assets::RESOURCES_URL;
use crate::core::downloader::MAX_REDIRECTS;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderKind;
use crate::core::maven::MAVEN_CENTRAL;
use crate::core::version::VERSION_MANIFEST_URL;

pub const DEFAULT_GAME_VERSION: &str = "1.21.11";
pub const DEFAULT_LOADER_VERSION: &str = "0.18.4";
pub const DEFAULT_JAVA_MAJOR: u32 = 21;
pub const DEFAULT_BUNDLE_MARKER: &str = ".bundle_installed";

/// What to provision. Persisted as `launcher_config.json` in the game root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub game_version: String,
    pub manifest_url: String,
    pub resources_url: String,
    pub loader: Option<LoaderConfig>,
    pub java: JavaConfig,
    pub bundle: Option<BundleConfig>,
    /// Parallel asset-object downloads; `1` keeps the phase strictly sequential.
    pub asset_concurrency: usize,
    pub max_redirects: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub kind: LoaderKind,
    pub version: String,
    /// Overrides the loader's meta API base URL.
    pub meta_url: Option<String>,
    /// Mirror tried once when a library's primary source fails.
    pub fallback_maven: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    pub major: u32,
    /// Archive URL; derived from Adoptium for the host platform when absent.
    pub url: Option<String>,
    pub sha256: Option<String>,
    /// Prefix of the archive's top-level directory that gets collapsed.
    pub dir_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub url: String,
    #[serde(default = "default_bundle_marker")]
    pub marker: String,
}

fn default_bundle_marker() -> String {
    DEFAULT_BUNDLE_MARKER.to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            game_version: DEFAULT_GAME_VERSION.into(),
            manifest_url: VERSION_MANIFEST_URL.into(),
            resources_url: RESOURCES_URL.into(),
            loader: Some(LoaderConfig::default()),
            java: JavaConfig::default(),
            bundle: None,
            asset_concurrency: 8,
            max_redirects: MAX_REDIRECTS,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            kind: LoaderKind::Fabric,
            version: DEFAULT_LOADER_VERSION.into(),
            meta_url: None,
            fallback_maven: MAVEN_CENTRAL.into(),
        }
    }
}

impl Default for JavaConfig {
    fn default() -> Self {
        Self {
            major: DEFAULT_JAVA_MAJOR,
            url: None,
            sha256: None,
            dir_prefix: "jdk".into(),
        }
    }
}

impl LauncherConfig {
    /// Read the config, writing the defaults first when the file does not exist.
    pub fn load_or_init(path: &Path) -> LauncherResult<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!("Wrote default launcher config to {:?}", path);
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path).map_err(|e| LauncherError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| LauncherError::io(path, e))
    }
}
