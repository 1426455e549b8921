// ─── Version Install ───
// Version JSON cache, client jar, libraries (with natives) and assets.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use super::manifest::{resolve_version, ResolvedVersion};
use super::version_file::{DownloadArtifact, LibrarySpec, VersionDetails};
use crate::core::assets::install_assets;
use crate::core::context::InstallContext;
use crate::core::downloader::{sha1_file, FetchRequest};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;
use crate::core::progress::{scaled, Phase, ProgressEvent};

/// Knobs for the asset phase.
#[derive(Debug, Clone, Copy)]
pub struct AssetOptions<'a> {
    pub resources_url: &'a str,
    pub concurrency: usize,
}

/// Read the cached version JSON when the version is already installed,
/// otherwise resolve it through the manifest.
///
/// "Installed" means both `<id>.json` and `<id>.jar` exist; in that case no
/// network request is made.
pub async fn load_or_resolve_version(
    ctx: InstallContext<'_>,
    manifest_url: &str,
    version_id: &str,
) -> LauncherResult<ResolvedVersion> {
    let json_path = ctx.layout.version_json(version_id);
    let jar_path = ctx.layout.client_jar(version_id);

    if json_path.exists() && jar_path.exists() {
        match read_cached(&json_path).await {
            Ok(resolved) => {
                info!("Version {} already installed", version_id);
                return Ok(resolved);
            }
            Err(e) => warn!(
                "Cached version file {:?} unreadable ({}), resolving again",
                json_path, e
            ),
        }
    }

    ctx.progress.emit(ProgressEvent::new(
        Phase::Version,
        format!("Downloading Minecraft {version_id}..."),
        0,
    ));
    resolve_version(ctx.fetcher, manifest_url, version_id).await
}

async fn read_cached(path: &Path) -> LauncherResult<ResolvedVersion> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    ResolvedVersion::from_value(serde_json::from_str(&raw)?)
}

/// Resolve (or load) a version and make sure everything it needs is on disk.
pub async fn install_version(
    ctx: InstallContext<'_>,
    manifest_url: &str,
    version_id: &str,
    assets: AssetOptions<'_>,
) -> LauncherResult<ResolvedVersion> {
    let resolved = load_or_resolve_version(ctx, manifest_url, version_id).await?;
    install_version_assets(ctx, &resolved, assets).await?;
    Ok(resolved)
}

/// Write the version cache, then fetch the client jar, libraries and assets.
///
/// Every step skips files that already exist, so a second run over a complete
/// install makes no requests.
pub async fn install_version_assets(
    ctx: InstallContext<'_>,
    resolved: &ResolvedVersion,
    assets: AssetOptions<'_>,
) -> LauncherResult<()> {
    let details = &resolved.details;
    let id = details.id.as_str();

    // Phase 1: version JSON and client jar
    let json_path = ctx.layout.version_json(id);
    let jar_path = ctx.layout.client_jar(id);
    let cache_was_present = json_path.exists();

    write_version_cache(&json_path, &resolved.raw).await?;

    let client = details
        .client_download()
        .ok_or_else(|| LauncherError::MissingDownload(id.to_string()))?;

    if jar_path.exists() && !cache_was_present && !matches_sha1(&jar_path, client).await? {
        warn!("Client jar {:?} does not match its checksum, replacing", jar_path);
        tokio::fs::remove_file(&jar_path)
            .await
            .map_err(|e| LauncherError::io(&jar_path, e))?;
    }

    if !jar_path.exists() {
        ctx.progress
            .emit(ProgressEvent::new(Phase::Client, "Downloading client...", 10));
        ctx.fetcher
            .fetch(FetchRequest::new(&client.url, &jar_path).sha1(client.sha1.as_deref()))
            .await?;
        info!("Downloaded client jar for {}", id);
    }

    // Phase 2: libraries
    install_libraries(ctx, details).await?;

    // Phase 3: assets
    match &details.asset_index {
        Some(index_ref) => {
            install_assets(ctx, index_ref, assets.resources_url, assets.concurrency).await?;
        }
        None => warn!("Version {} declares no asset index, skipping assets", id),
    }

    Ok(())
}

async fn write_version_cache(path: &Path, raw: &serde_json::Value) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(raw)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

async fn matches_sha1(path: &Path, artifact: &DownloadArtifact) -> LauncherResult<bool> {
    match &artifact.sha1 {
        Some(expected) => Ok(sha1_file(path).await?.eq_ignore_ascii_case(expected)),
        None => Ok(true),
    }
}

async fn install_libraries(ctx: InstallContext<'_>, details: &VersionDetails) -> LauncherResult<()> {
    let libraries_dir = ctx.layout.libraries_dir();
    let total = details.libraries.len();
    let mut fetched = 0usize;

    for (index, library) in details.libraries.iter().enumerate() {
        let processed = index + 1;
        if !library.is_allowed_on(&ctx.platform) {
            debug!("Skipping {} (rules)", library.name);
            continue;
        }

        let mut wanted = Vec::with_capacity(2);
        if let Some(artifact) = library.artifact() {
            wanted.push((artifact, library_path(&libraries_dir, library, artifact, None)?));
        }
        if let Some(native) = library.native_artifact(&ctx.platform) {
            let classifier = library.native_classifier(&ctx.platform);
            wanted.push((
                native,
                library_path(&libraries_dir, library, native, classifier.as_deref())?,
            ));
        }

        for (artifact, dest) in wanted {
            if dest.exists() {
                continue;
            }
            ctx.progress.emit(ProgressEvent::new(
                Phase::Library,
                format!("Libraries ({processed}/{total})"),
                10 + scaled(processed, total, 0, 40),
            ));
            ctx.fetcher
                .fetch(FetchRequest::new(&artifact.url, &dest).sha1(artifact.sha1.as_deref()))
                .await?;
            fetched += 1;
        }
    }

    info!("Libraries ready ({} fetched, {} declared)", fetched, total);
    ctx.progress.emit(ProgressEvent::new(
        Phase::Library,
        format!("Libraries ({total}/{total})"),
        50,
    ));
    Ok(())
}

/// Local path of a library file: the artifact's own `path` when given, otherwise
/// derived from the coordinate (plus the native classifier).
pub(crate) fn library_path(
    libraries_dir: &Path,
    library: &LibrarySpec,
    artifact: &DownloadArtifact,
    classifier: Option<&str>,
) -> LauncherResult<PathBuf> {
    let relative = match &artifact.path {
        Some(path) => PathBuf::from(path),
        None => {
            let mut coordinate = MavenArtifact::parse(&library.name)?;
            if let Some(classifier) = classifier {
                coordinate.classifier = Some(classifier.to_string());
            }
            coordinate.local_path()
        }
    };

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(LauncherError::Other(format!(
            "Library path escapes the libraries directory: {:?}",
            relative
        )));
    }
    Ok(libraries_dir.join(relative))
}
