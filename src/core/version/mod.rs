mod install;
mod manifest;
mod version_file;

pub(crate) use install::library_path;
pub use install::{install_version, install_version_assets, load_or_resolve_version, AssetOptions};
pub use manifest::{resolve_version, ResolvedVersion, VersionEntry, VersionManifest, VERSION_MANIFEST_URL};
pub use version_file::{
    rules_allow, Argument, ArgumentValue, Arguments, AssetIndexRef, DownloadArtifact, Features,
    JavaVersionInfo, LibraryDownloads, LibrarySpec, OsRule, Rule, RuleAction, VersionDetails,
    VersionDownloads,
};
