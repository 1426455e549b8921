use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::archive::extract_archive;
use crate::core::context::InstallContext;
use crate::core::downloader::FetchRequest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;
use crate::core::progress::{scaled_percent, Phase, ProgressEvent};

const ADOPTIUM_API_BASE: &str = "https://api.adoptium.net";

/// Download target inside the runtime root; the format is sniffed after download.
const RUNTIME_ARCHIVE_NAME: &str = "runtime.archive";

/// Where a runtime comes from and where it goes.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeRequest<'a> {
    pub url: &'a str,
    pub install_root: &'a Path,
    pub sha256: Option<&'a str>,
    /// Prefix of the archive's top-level directory (`jdk-21.0.5+11` → `jdk`).
    pub dir_prefix: &'a str,
}

/// Latest GA HotSpot JDK of `major` for `platform`.
pub fn adoptium_binary_url(major: u32, platform: &Platform) -> String {
    format!(
        "{ADOPTIUM_API_BASE}/v3/binary/latest/{major}/ga/{}/{}/jdk/hotspot/normal/eclipse",
        platform.adoptium_os(),
        platform.adoptium_arch()
    )
}

/// The Java executable under `root`, if present: `bin/java[.exe]`, or the macOS
/// bundle layout `Contents/Home/bin/java`.
pub fn find_java_executable(root: &Path, platform: &Platform) -> Option<PathBuf> {
    let exe = platform.java_executable();
    [
        root.join("bin").join(exe),
        root.join("Contents").join("Home").join("bin").join(exe),
    ]
    .into_iter()
    .find(|candidate| candidate.is_file())
}

/// Make sure a Java runtime is installed under `request.install_root` and return
/// its executable.
///
/// An existing executable short-circuits everything, including the network.
pub async fn ensure_runtime(
    ctx: InstallContext<'_>,
    request: &RuntimeRequest<'_>,
) -> LauncherResult<PathBuf> {
    let root = request.install_root;
    if let Some(java) = find_java_executable(root, &ctx.platform) {
        debug!("Java runtime already present at {:?}", java);
        ctx.progress
            .emit(ProgressEvent::new(Phase::Java, "Java ready", 100));
        return Ok(java);
    }

    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| LauncherError::io(root, e))?;

    let archive = root.join(RUNTIME_ARCHIVE_NAME);
    if archive.exists() {
        debug!("Removing stale runtime archive {:?}", archive);
        tokio::fs::remove_file(&archive)
            .await
            .map_err(|e| LauncherError::io(&archive, e))?;
    }

    info!("Downloading Java runtime from {}", request.url);
    ctx.progress
        .emit(ProgressEvent::new(Phase::Java, "Downloading Java...", 0));

    let last_percent = AtomicU32::new(0);
    let on_progress = |percent: f64| {
        let current = scaled_percent(percent, 0, 100);
        if last_percent.swap(current, Ordering::Relaxed) != current {
            ctx.progress
                .emit(ProgressEvent::new(Phase::Java, "Downloading Java...", current));
        }
    };
    ctx.fetcher
        .fetch(FetchRequest::new(request.url, &archive).on_progress(&on_progress))
        .await?;

    if let Some(expected) = request.sha256 {
        verify_sha256(&archive, expected).await?;
    }

    ctx.progress
        .emit(ProgressEvent::new(Phase::Extract, "Extracting Java...", 0));
    let extract_root = root.to_path_buf();
    let extract_archive_path = archive.clone();
    let prefix = request.dir_prefix.to_string();
    tokio::task::spawn_blocking(move || {
        extract_archive(&extract_archive_path, &extract_root)?;
        normalize_layout(&extract_root, &prefix)
    })
    .await??;

    if let Err(e) = tokio::fs::remove_file(&archive).await {
        warn!("Could not remove runtime archive {:?}: {}", archive, e);
    }
    ctx.progress
        .emit(ProgressEvent::new(Phase::Extract, "Extracting Java...", 100));

    let java = find_java_executable(root, &ctx.platform).ok_or_else(|| {
        LauncherError::RuntimeIncomplete {
            root: root.to_path_buf(),
            expected: root.join("bin").join(ctx.platform.java_executable()),
        }
    })?;
    mark_executable(&java)?;

    info!("Java runtime installed at {:?}", java);
    ctx.progress
        .emit(ProgressEvent::new(Phase::Java, "Java ready", 100));
    Ok(java)
}

/// Hoist the contents of the single top-level `<prefix>*` directory into `root`.
///
/// Returns `false` when no such directory exists. With several matches the first
/// in name order is collapsed.
pub fn normalize_layout(root: &Path, prefix: &str) -> LauncherResult<bool> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(root).map_err(|e| LauncherError::io(root, e))? {
        let entry = entry.map_err(|e| LauncherError::io(root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| LauncherError::io(entry.path(), e))?
            .is_dir();
        if is_dir && entry.file_name().to_string_lossy().starts_with(prefix) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    let Some(nested) = candidates.first() else {
        return Ok(false);
    };
    if candidates.len() > 1 {
        warn!(
            "Found {} '{}*' directories in {:?}, collapsing {:?}",
            candidates.len(),
            prefix,
            root,
            nested
        );
    }

    // Move out of the way first so a child named like the directory itself can land.
    let staging = root.join(format!(".collapse-{}", uuid::Uuid::new_v4()));
    std::fs::rename(nested, &staging).map_err(|e| LauncherError::io(nested, e))?;

    for entry in std::fs::read_dir(&staging).map_err(|e| LauncherError::io(&staging, e))? {
        let entry = entry.map_err(|e| LauncherError::io(&staging, e))?;
        let target = root.join(entry.file_name());
        remove_existing(&target)?;
        std::fs::rename(entry.path(), &target).map_err(|e| LauncherError::io(&target, e))?;
    }

    std::fs::remove_dir_all(&staging).map_err(|e| LauncherError::io(&staging, e))?;
    debug!("Collapsed {:?} into {:?}", nested, root);
    Ok(true)
}

fn remove_existing(path: &Path) -> LauncherResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            std::fs::remove_dir_all(path).map_err(|e| LauncherError::io(path, e))
        }
        Ok(_) => std::fs::remove_file(path).map_err(|e| LauncherError::io(path, e)),
        Err(_) => Ok(()),
    }
}

async fn verify_sha256(path: &Path, expected: &str) -> LauncherResult<()> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let actual = hex::encode(Sha256::digest(&bytes));
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    let _ = tokio::fs::remove_file(path).await;
    Err(LauncherError::ChecksumMismatch {
        path: path.to_path_buf(),
        algorithm: "SHA-256",
        expected: expected.to_string(),
        actual,
    })
}

fn mark_executable(java: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(java, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| LauncherError::io(java, e))?;
    }
    #[cfg(not(unix))]
    let _ = java;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::platform::{ArchKind, OsKind};
    use crate::core::progress::{NoProgress, ProgressSink};
    use crate::core::state::GameLayout;
    use crate::core::test_support::{temp_dir, write_file, zip_bytes, RecordingFetcher};

    const JDK_URL: &str = "https://runtime.test/jdk.zip";

    fn linux() -> Platform {
        Platform::new(OsKind::Linux, ArchKind::X64)
    }

    fn jdk_zip() -> Vec<u8> {
        zip_bytes(&[
            ("jdk-21.0.5+11/", b""),
            ("jdk-21.0.5+11/bin/java", b"#!/bin/sh\necho java"),
            ("jdk-21.0.5+11/lib/modules", b"modules"),
            ("jdk-21.0.5+11/release", b"JAVA_VERSION=\"21.0.5\""),
        ])
    }

    fn request(root: &Path) -> RuntimeRequest<'_> {
        RuntimeRequest {
            url: JDK_URL,
            install_root: root,
            sha256: None,
            dir_prefix: "jdk",
        }
    }

    #[test]
    fn adoptium_url_for_platform() {
        assert_eq!(
            adoptium_binary_url(21, &Platform::default()),
            "https://api.adoptium.net/v3/binary/latest/21/ga/windows/x64/jdk/hotspot/normal/eclipse"
        );
        assert_eq!(
            adoptium_binary_url(17, &Platform::new(OsKind::MacOs, ArchKind::Aarch64)),
            "https://api.adoptium.net/v3/binary/latest/17/ga/mac/aarch64/jdk/hotspot/normal/eclipse"
        );
    }

    #[tokio::test]
    async fn installs_and_collapses_jdk_directory() {
        let fetcher = RecordingFetcher::new();
        fetcher.file(JDK_URL, jdk_zip());
        let root = temp_dir("runtime-install");
        let layout = GameLayout::new(&root);
        let runtime = layout.runtime_dir();
        let events = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| events.lock().unwrap().push(event);
        let ctx = InstallContext {
            fetcher: &fetcher,
            layout: &layout,
            platform: linux(),
            progress: &sink as &dyn ProgressSink,
        };

        let java = ensure_runtime(ctx, &request(&runtime)).await.unwrap();

        assert_eq!(java, runtime.join("bin/java"));
        assert!(runtime.join("lib/modules").exists());
        assert!(!runtime.join("jdk-21.0.5+11").exists());
        assert!(!runtime.join(RUNTIME_ARCHIVE_NAME).exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&java).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        let events = events.into_inner().unwrap();
        assert_eq!(events.first().unwrap().phase, Phase::Java);
        assert_eq!(events.last().unwrap().current, 100);
    }

    #[tokio::test]
    async fn present_runtime_makes_no_request() {
        let fetcher = RecordingFetcher::new();
        let root = temp_dir("runtime-present");
        let layout = GameLayout::new(&root);
        let runtime = layout.runtime_dir();
        write_file(&runtime.join("bin/java"), b"java");
        let ctx = InstallContext {
            fetcher: &fetcher,
            layout: &layout,
            platform: linux(),
            progress: &NoProgress,
        };

        let java = ensure_runtime(ctx, &request(&runtime)).await.unwrap();

        assert_eq!(java, runtime.join("bin/java"));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn stale_archive_is_replaced() {
        let fetcher = RecordingFetcher::new();
        fetcher.file(JDK_URL, jdk_zip());
        let root = temp_dir("runtime-stale");
        let layout = GameLayout::new(&root);
        let runtime = layout.runtime_dir();
        write_file(&runtime.join(RUNTIME_ARCHIVE_NAME), b"half a download");
        let ctx = InstallContext {
            fetcher: &fetcher,
            layout: &layout,
            platform: linux(),
            progress: &NoProgress,
        };

        ensure_runtime(ctx, &request(&runtime)).await.unwrap();

        assert_eq!(fetcher.calls_to(JDK_URL), 1);
        assert!(runtime.join("bin/java").exists());
    }

    #[tokio::test]
    async fn sha256_mismatch_removes_archive() {
        let fetcher = RecordingFetcher::new();
        fetcher.file(JDK_URL, jdk_zip());
        let root = temp_dir("runtime-sha256");
        let layout = GameLayout::new(&root);
        let runtime = layout.runtime_dir();
        let ctx = InstallContext {
            fetcher: &fetcher,
            layout: &layout,
            platform: linux(),
            progress: &NoProgress,
        };
        let mut req = request(&runtime);
        req.sha256 = Some("00");

        let err = ensure_runtime(ctx, &req).await.unwrap_err();

        assert!(matches!(err, LauncherError::ChecksumMismatch { algorithm: "SHA-256", .. }));
        assert!(!runtime.join(RUNTIME_ARCHIVE_NAME).exists());
        assert!(!runtime.join("bin").exists());
    }

    #[tokio::test]
    async fn archive_without_java_is_incomplete() {
        let fetcher = RecordingFetcher::new();
        fetcher.file(JDK_URL, zip_bytes(&[("jdk-21/readme.txt", b"nothing here")]));
        let root = temp_dir("runtime-incomplete");
        let layout = GameLayout::new(&root);
        let runtime = layout.runtime_dir();
        let ctx = InstallContext {
            fetcher: &fetcher,
            layout: &layout,
            platform: linux(),
            progress: &NoProgress,
        };

        let err = ensure_runtime(ctx, &request(&runtime)).await.unwrap_err();

        assert!(matches!(err, LauncherError::RuntimeIncomplete { .. }));
    }

    #[test]
    fn normalization_collapses_jdk_directory() {
        let root = temp_dir("runtime-normalize");
        write_file(&root.join("jdk-21.0.5+11/bin/java"), b"java");
        write_file(&root.join("jdk-21.0.5+11/conf/security/java.policy"), b"grant");

        assert!(normalize_layout(&root, "jdk").unwrap());

        assert!(root.join("bin/java").exists());
        assert!(root.join("conf/security/java.policy").exists());
        assert!(!root.join("jdk-21.0.5+11").exists());
    }

    #[test]
    fn normalization_without_match_is_a_no_op() {
        let root = temp_dir("runtime-flat");
        write_file(&root.join("bin/java"), b"java");

        assert!(!normalize_layout(&root, "jdk").unwrap());

        assert!(root.join("bin/java").exists());
    }

    #[test]
    fn normalization_handles_child_named_like_parent() {
        let root = temp_dir("runtime-same-name");
        write_file(&root.join("jdk/jdk/marker"), b"x");
        write_file(&root.join("jdk/bin/java"), b"java");

        assert!(normalize_layout(&root, "jdk").unwrap());

        assert!(root.join("jdk/marker").exists());
        assert!(root.join("bin/java").exists());
    }

    #[test]
    fn finds_macos_bundle_layout() {
        let root = temp_dir("runtime-macos");
        write_file(&root.join("Contents/Home/bin/java"), b"java");
        let mac = Platform::new(OsKind::MacOs, ArchKind::Aarch64);

        assert_eq!(
            find_java_executable(&root, &mac),
            Some(root.join("Contents/Home/bin/java"))
        );
        assert_eq!(find_java_executable(&root, &Platform::default()), None);
    }
}
