use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::kind::LoaderKind;
use super::profile::LoaderProfile;
use crate::core::context::InstallContext;
use crate::core::downloader::FetchRequest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MAVEN_CENTRAL};
use crate::core::progress::{scaled, Phase, ProgressEvent};

/// Result of a loader install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderInstall {
    pub id: String,
    /// Coordinates that failed on both the primary source and the fallback mirror.
    pub missing_libraries: Vec<String>,
    pub from_cache: bool,
}

/// Installs a loader profile and its libraries for one game version.
#[derive(Debug, Clone)]
pub struct LoaderInstaller {
    kind: LoaderKind,
    game_version: String,
    loader_version: String,
    meta_base: String,
    fallback_maven: String,
}

impl LoaderInstaller {
    pub fn new(kind: LoaderKind, game_version: &str, loader_version: &str) -> Self {
        Self {
            kind,
            game_version: game_version.to_string(),
            loader_version: loader_version.to_string(),
            meta_base: kind.meta_base().to_string(),
            fallback_maven: MAVEN_CENTRAL.to_string(),
        }
    }

    pub fn with_meta_base(mut self, meta_base: impl Into<String>) -> Self {
        self.meta_base = meta_base.into();
        self
    }

    pub fn with_fallback_maven(mut self, maven: impl Into<String>) -> Self {
        self.fallback_maven = maven.into();
        self
    }

    pub fn loader_id(&self) -> String {
        self.kind.loader_id(&self.loader_version, &self.game_version)
    }

    /// Fetch the profile and its libraries unless the profile is already cached.
    ///
    /// Each library gets its primary source and then exactly one fallback attempt;
    /// a library failing both is logged and reported, not fatal.
    pub async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<LoaderInstall> {
        let id = self.loader_id();
        let profile_path = ctx.layout.version_json(&id);

        if profile_path.exists() {
            info!("{} profile {} already installed", self.kind, id);
            ctx.progress.emit(ProgressEvent::new(
                Phase::Loader,
                format!("{} ready", self.kind),
                90,
            ));
            return Ok(LoaderInstall {
                id,
                missing_libraries: Vec::new(),
                from_cache: true,
            });
        }

        info!(
            "Installing {} {} for Minecraft {}",
            self.kind, self.loader_version, self.game_version
        );
        ctx.progress.emit(ProgressEvent::new(
            Phase::Loader,
            format!("Installing {} {}...", self.kind, self.loader_version),
            80,
        ));

        let url = self
            .kind
            .profile_url(&self.meta_base, &self.game_version, &self.loader_version);
        let raw = ctx.fetcher.fetch_text(&url).await?;
        let profile = LoaderProfile::parse(&raw)?;

        let missing_libraries = self.install_libraries(ctx, &profile).await?;

        // Written last so an interrupted install is retried from scratch.
        persist_profile(&profile_path, &raw).await?;

        if missing_libraries.is_empty() {
            info!("{} installed successfully", self.kind);
        } else {
            warn!(
                "{} installed with {} missing libraries: {}",
                self.kind,
                missing_libraries.len(),
                missing_libraries.join(", ")
            );
        }
        ctx.progress.emit(ProgressEvent::new(
            Phase::Loader,
            format!("{} ready", self.kind),
            90,
        ));

        Ok(LoaderInstall {
            id,
            missing_libraries,
            from_cache: false,
        })
    }

    async fn install_libraries(
        &self,
        ctx: InstallContext<'_>,
        profile: &LoaderProfile,
    ) -> LauncherResult<Vec<String>> {
        let libraries_dir = ctx.layout.libraries_dir();
        let total = profile.libraries.len();
        let mut missing = Vec::new();

        for (index, library) in profile.libraries.iter().enumerate() {
            let artifact = match MavenArtifact::parse(&library.name) {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!("Skipping loader library: {}", e);
                    missing.push(library.name.clone());
                    continue;
                }
            };

            let dest = libraries_dir.join(artifact.local_path());
            if dest.exists() {
                continue;
            }

            ctx.progress.emit(ProgressEvent::new(
                Phase::Loader,
                format!("Loader libraries ({}/{total})", index + 1),
                80 + scaled(index + 1, total, 0, 10),
            ));

            let primary = artifact.url(library.url.as_deref().unwrap_or(self.kind.default_maven()));
            let err = match fetch_library(ctx, &primary, &dest).await? {
                Ok(()) => continue,
                Err(e) => e,
            };
            warn!(
                "Failed to download {} from {} ({}), trying {}",
                library.name, primary, err, self.fallback_maven
            );

            let fallback = artifact.url(&self.fallback_maven);
            if let Err(e) = fetch_library(ctx, &fallback, &dest).await? {
                warn!("Library {} unavailable on both mirrors: {}", library.name, e);
                missing.push(library.name.clone());
            }
        }

        Ok(missing)
    }
}

/// Outer error: cancellation, which always aborts. Inner error: a failed attempt.
async fn fetch_library(
    ctx: InstallContext<'_>,
    url: &str,
    dest: &Path,
) -> LauncherResult<Result<(), LauncherError>> {
    match ctx.fetcher.fetch(FetchRequest::new(url, dest)).await {
        Ok(_) => Ok(Ok(())),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => Ok(Err(e)),
    }
}

async fn persist_profile(path: &Path, raw: &str) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let pretty = serde_json::to_string_pretty(&value)?;
    tokio::fs::write(path, pretty)
        .await
        .map_err(|e| LauncherError::io(path, e))
}
