// ─── Version File ───
// Typed view of a version details document plus OS/feature rule evaluation.

use std::collections::HashMap;

use serde::Deserialize;

use crate::core::platform::Platform;

/// A version details document. Only the fields the launcher acts on are typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDetails {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub libraries: Vec<LibrarySpec>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    /// Legacy name of the asset index (`"assets": "27"`).
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Pre-1.13 space separated game arguments.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
    #[serde(default)]
    pub server: Option<DownloadArtifact>,
}

/// A downloadable file. `path` is set for library artifacts only.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// One entry of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    /// OS name → classifier template, e.g. `"windows": "natives-windows-${arch}"`.
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<DownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, DownloadArtifact>>,
}

// ─── Rule Evaluation ───

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Launcher features that argument rules can test (`has_custom_resolution`, ...).
pub type Features = HashMap<String, bool>;

/// Evaluate a rule list top to bottom.
///
/// - No rules → allowed.
/// - Otherwise start disallowed; every matching rule sets the state to its action.
/// - A rule matches when its OS constraint (if any) matches the platform and every
///   feature it names has the requested value.
pub fn rules_allow(rules: &[Rule], platform: &Platform, features: &Features) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule_matches(rule, platform, features) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn rule_matches(rule: &Rule, platform: &Platform, features: &Features) -> bool {
    if let Some(os) = &rule.os {
        if let Some(name) = &os.name {
            if name != platform.mojang_os() {
                return false;
            }
        }
        if let Some(arch) = &os.arch {
            if arch != platform.mojang_arch() {
                return false;
            }
        }
    }

    if let Some(required) = &rule.features {
        let all_match = required
            .iter()
            .all(|(name, wanted)| features.get(name).copied().unwrap_or(false) == *wanted);
        if !all_match {
            return false;
        }
    }

    true
}

impl LibrarySpec {
    pub fn is_allowed_on(&self, platform: &Platform) -> bool {
        match &self.rules {
            Some(rules) => rules_allow(rules, platform, &Features::new()),
            None => true,
        }
    }

    pub fn artifact(&self) -> Option<&DownloadArtifact> {
        self.downloads.as_ref()?.artifact.as_ref()
    }

    /// Classifier key of this library's native bundle for `platform`.
    ///
    /// `natives[os]` with `${arch}` substituted; without a template the key falls
    /// back to `natives-<os>`. `None` when the library declares no classifiers.
    pub fn native_classifier(&self, platform: &Platform) -> Option<String> {
        self.downloads.as_ref()?.classifiers.as_ref()?;

        let os = platform.mojang_os();
        let key = self
            .natives
            .as_ref()
            .and_then(|natives| natives.get(os))
            .map(|template| template.replace("${arch}", platform.arch_bits()))
            .unwrap_or_else(|| format!("natives-{os}"));
        Some(key)
    }

    /// The native artifact to download for `platform`, if the library ships one.
    pub fn native_artifact(&self, platform: &Platform) -> Option<&DownloadArtifact> {
        let key = self.native_classifier(platform)?;
        self.downloads.as_ref()?.classifiers.as_ref()?.get(&key)
    }
}

impl VersionDetails {
    pub fn client_download(&self) -> Option<&DownloadArtifact> {
        self.downloads.as_ref()?.client.as_ref()
    }

    /// Name of the asset index, from `assetIndex.id` or the legacy `assets` field.
    pub fn asset_index_name(&self) -> Option<&str> {
        self.asset_index
            .as_ref()
            .map(|ai| ai.id.as_str())
            .or(self.assets.as_deref())
    }

    pub fn required_java_major(&self) -> Option<u32> {
        self.java_version.as_ref().map(|j| j.major_version)
    }
}
