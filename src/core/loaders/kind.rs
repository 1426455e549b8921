use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::maven::{FABRIC_MAVEN, QUILT_MAVEN};

const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";
const QUILT_META_BASE: &str = "https://meta.quiltmc.org/v3";

/// Mod loaders that publish a launch profile through a meta API.
///
/// Fabric and Quilt share the profile format, so they share one installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Fabric,
    Quilt,
}

impl LoaderKind {
    pub fn meta_base(&self) -> &'static str {
        match self {
            Self::Fabric => FABRIC_META_BASE,
            Self::Quilt => QUILT_META_BASE,
        }
    }

    /// Repository used for profile libraries that do not name their own.
    pub fn default_maven(&self) -> &'static str {
        match self {
            Self::Fabric => FABRIC_MAVEN,
            Self::Quilt => QUILT_MAVEN,
        }
    }

    /// `fabric-loader-0.18.4-1.21.11`
    pub fn loader_id(&self, loader_version: &str, game_version: &str) -> String {
        format!("{}-loader-{loader_version}-{game_version}", self.slug())
    }

    pub fn profile_url(&self, meta_base: &str, game_version: &str, loader_version: &str) -> String {
        format!(
            "{}/versions/loader/{game_version}/{loader_version}/profile/json",
            meta_base.trim_end_matches('/')
        )
    }

    fn slug(&self) -> &'static str {
        match self {
            Self::Fabric => "fabric",
            Self::Quilt => "quilt",
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fabric => f.write_str("Fabric"),
            Self::Quilt => f.write_str("Quilt"),
        }
    }
}
