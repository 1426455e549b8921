use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::info;

use crate::core::context::InstallContext;
use crate::core::downloader::FetchRequest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::{scaled, Phase, ProgressEvent};
use crate::core::version::AssetIndexRef;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Progress is reported once per this many processed objects.
pub const ASSET_PROGRESS_EVERY: usize = 100;

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    fn prefix(&self) -> LauncherResult<&str> {
        let valid = self.hash.len() == 40 && self.hash.bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(LauncherError::Other(format!(
                "Invalid asset hash: {:?}",
                self.hash
            )));
        }
        Ok(&self.hash[..2])
    }

    /// `objects/<hh>/<hash>`
    pub fn storage_path(&self, objects_dir: &Path) -> LauncherResult<PathBuf> {
        Ok(objects_dir.join(self.prefix()?).join(&self.hash))
    }

    pub fn url(&self, resources_url: &str) -> LauncherResult<String> {
        Ok(format!(
            "{}/{}/{}",
            resources_url.trim_end_matches('/'),
            self.prefix()?,
            self.hash
        ))
    }
}

impl AssetIndex {
    /// Distinct objects ordered by hash; several names may share one object.
    pub fn unique_objects(&self) -> Vec<&AssetObject> {
        let mut by_hash = BTreeMap::new();
        for object in self.objects.values() {
            by_hash.entry(object.hash.as_str()).or_insert(object);
        }
        by_hash.into_values().collect()
    }
}

/// Outcome of the asset phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSummary {
    pub total: usize,
    pub downloaded: usize,
}

/// Download the asset index (if missing) and every missing object it references.
///
/// Objects are fetched `concurrency` at a time; the first failure aborts the phase.
pub async fn install_assets(
    ctx: InstallContext<'_>,
    index_ref: &AssetIndexRef,
    resources_url: &str,
    concurrency: usize,
) -> LauncherResult<AssetSummary> {
    ctx.progress.emit(ProgressEvent::new(
        Phase::Assets,
        "Downloading asset index...",
        50,
    ));

    let index_path = ctx
        .layout
        .asset_indexes_dir()
        .join(format!("{}.json", index_ref.id));
    if !index_path.exists() {
        ctx.fetcher
            .fetch(FetchRequest::new(&index_ref.url, &index_path).sha1(index_ref.sha1.as_deref()))
            .await?;
    }

    let raw = tokio::fs::read_to_string(&index_path)
        .await
        .map_err(|e| LauncherError::io(&index_path, e))?;
    let index: AssetIndex = serde_json::from_str(&raw)?;

    let objects_dir = ctx.layout.asset_objects_dir();
    let objects = index.unique_objects();
    let total = objects.len();

    let mut missing = Vec::new();
    for object in objects {
        let dest = object.storage_path(&objects_dir)?;
        if !dest.exists() {
            missing.push((object, dest));
        }
    }

    info!(
        "Downloading {} asset objects ({} already cached)",
        missing.len(),
        total - missing.len()
    );

    let downloaded = missing.len();
    let mut processed = total - downloaded;
    let mut last_reported = None;

    let mut downloads = stream::iter(missing)
        .map(|(object, dest)| {
            let fetcher = ctx.fetcher;
            let url = object.url(resources_url);
            async move {
                let url = url?;
                fetcher
                    .fetch(FetchRequest::new(&url, &dest).sha1(Some(&object.hash)))
                    .await
            }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some(result) = downloads.next().await {
        result?;
        processed += 1;
        if processed % ASSET_PROGRESS_EVERY == 0 {
            report(&ctx, processed, total);
            last_reported = Some(processed);
        }
    }

    if last_reported != Some(total) {
        report(&ctx, total, total);
    }

    Ok(AssetSummary { total, downloaded })
}

fn report(ctx: &InstallContext<'_>, processed: usize, total: usize) {
    ctx.progress.emit(ProgressEvent::new(
        Phase::Assets,
        format!("Assets ({processed}/{total})"),
        scaled(processed, total, 50, 30),
    ));
}
