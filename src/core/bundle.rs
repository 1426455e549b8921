// ─── Bundle Installer ───
// One-shot content archive (mods, configs) unpacked over the game root.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use tracing::{info, warn};

use crate::core::archive::extract_archive;
use crate::core::context::InstallContext;
use crate::core::downloader::FetchRequest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::{scaled_percent, Phase, ProgressEvent};

const BUNDLE_ARCHIVE_NAME: &str = ".bundle.download";

#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    pub url: &'a str,
    pub install_root: &'a Path,
    /// File whose presence marks the bundle as installed.
    pub marker: &'a str,
    pub progress_start: u32,
    pub progress_span: u32,
}

impl<'a> BundleRequest<'a> {
    /// Request reporting on the 90..=100 slice of the overall progress.
    pub fn new(url: &'a str, install_root: &'a Path, marker: &'a str) -> Self {
        Self {
            url,
            install_root,
            marker,
            progress_start: 90,
            progress_span: 10,
        }
    }
}

/// Download and unpack the bundle unless its marker exists.
///
/// Returns `true` when the bundle was installed by this call. Files are extracted
/// over existing ones; nothing is rolled back on failure.
pub async fn ensure_bundle(
    ctx: InstallContext<'_>,
    request: &BundleRequest<'_>,
) -> LauncherResult<bool> {
    let root = request.install_root;
    let marker = root.join(request.marker);
    if marker.exists() {
        info!("Bundle already installed ({:?})", marker);
        return Ok(false);
    }

    let archive = root.join(BUNDLE_ARCHIVE_NAME);
    if archive.exists() {
        tokio::fs::remove_file(&archive)
            .await
            .map_err(|e| LauncherError::io(&archive, e))?;
    }

    let start = request.progress_start;
    let span = request.progress_span;
    ctx.progress
        .emit(ProgressEvent::new(Phase::Bundle, "Downloading bundle...", start));

    let last = AtomicU32::new(start);
    let on_progress = |percent: f64| {
        let current = scaled_percent(percent, start, span);
        if last.swap(current, Ordering::Relaxed) != current {
            ctx.progress
                .emit(ProgressEvent::new(Phase::Bundle, "Downloading bundle...", current));
        }
    };
    ctx.fetcher
        .fetch(FetchRequest::new(request.url, &archive).on_progress(&on_progress))
        .await?;

    ctx.progress.emit(ProgressEvent::new(
        Phase::Bundle,
        "Extracting bundle...",
        start + span,
    ));
    let extract_from = archive.clone();
    let extract_to = root.to_path_buf();
    let written =
        tokio::task::spawn_blocking(move || extract_archive(&extract_from, &extract_to)).await??;

    if let Err(e) = tokio::fs::remove_file(&archive).await {
        warn!("Could not remove bundle archive {:?}: {}", archive, e);
    }
    tokio::fs::write(&marker, Utc::now().to_rfc3339())
        .await
        .map_err(|e| LauncherError::io(&marker, e))?;

    info!("Bundle installed ({} files)", written);
    Ok(true)
}
