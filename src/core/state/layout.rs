use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = ".SHEIHU";

/// On-disk layout of the game root.
///
/// ```text
/// <root>/
///   versions/<id>/<id>.json, <id>.jar
///   libraries/<maven layout>
///   assets/indexes/<index>.json
///   assets/objects/<hh>/<hash>
///   runtime/            bundled Java
///   natives/<id>/       extracted native libraries
///   launcher_config.json, settings.json
/// ```
#[derive(Debug, Clone)]
pub struct GameLayout {
    root: PathBuf,
}

impl GameLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data dir>/.SHEIHU`, falling back to the working directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id)
    }

    pub fn version_json(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.json"))
    }

    pub fn client_jar(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.jar"))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn asset_objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("runtime")
    }

    pub fn natives_dir(&self, id: &str) -> PathBuf {
        self.root.join("natives").join(id)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("launcher_config.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_files_live_under_their_id() {
        let layout = GameLayout::new("/games/sheihu");
        assert_eq!(
            layout.client_jar("1.21.11"),
            PathBuf::from("/games/sheihu/versions/1.21.11/1.21.11.jar")
        );
        assert_eq!(
            layout.version_json("fabric-loader-0.18.4-1.21.11"),
            PathBuf::from(
                "/games/sheihu/versions/fabric-loader-0.18.4-1.21.11/fabric-loader-0.18.4-1.21.11.json"
            )
        );
    }
}
