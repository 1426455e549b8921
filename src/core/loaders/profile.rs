use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

/// Launch profile published by a loader's meta API.
///
/// Persisted verbatim under `versions/<loaderId>/<loaderId>.json`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<ProfileLibrary>,
    #[serde(default)]
    pub arguments: Option<ProfileArguments>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileLibrary {
    /// `group:artifact:version`
    pub name: String,
    /// Repository base; the loader's default Maven when absent.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileArguments {
    #[serde(default)]
    pub jvm: Vec<String>,
    #[serde(default)]
    pub game: Vec<String>,
}

impl LoaderProfile {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let profile: Self = serde_json::from_str(raw)?;
        if profile.main_class.trim().is_empty() {
            return Err(LauncherError::Other("Loader profile has no mainClass".into()));
        }
        Ok(profile)
    }

    /// Read a persisted profile.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| LauncherError::io(path, e))?;
        Self::parse(&raw)
    }

    pub fn jvm_arguments(&self) -> &[String] {
        self.arguments.as_ref().map_or(&[], |a| a.jvm.as_slice())
    }

    pub fn game_arguments(&self) -> &[String] {
        self.arguments.as_ref().map_or(&[], |a| a.game.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fabric_profile() {
        let profile = LoaderProfile::parse(
            r#"{
                "id": "fabric-loader-0.18.4-1.21.11",
                "inheritsFrom": "1.21.11",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.9", "url": "https://maven.fabricmc.net/"},
                    {"name": "net.fabricmc:fabric-loader:0.18.4"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(profile.inherits_from.as_deref(), Some("1.21.11"));
        assert_eq!(profile.libraries.len(), 2);
        assert!(profile.libraries[1].url.is_none());
        assert_eq!(profile.jvm_arguments().len(), 1);
        assert!(profile.game_arguments().is_empty());
    }

    #[test]
    fn rejects_profile_without_main_class() {
        assert!(LoaderProfile::parse(r#"{"mainClass": " "}"#).is_err());
        assert!(LoaderProfile::parse(r#"{"libraries": []}"#).is_err());
    }
}
