// ─── Classpath Builder ───
// Loader libraries, then version libraries, then the client jar.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::archive::extract_zip_with;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderProfile;
use crate::core::maven::MavenArtifact;
use crate::core::platform::Platform;
use crate::core::state::GameLayout;
use crate::core::version::{library_path, VersionDetails};

/// Ordered, de-duplicated classpath entries.
///
/// Loader libraries come first and win over version libraries with the same
/// `group:artifact[:classifier]`. Entries missing on disk are left out.
pub fn build_classpath(
    layout: &GameLayout,
    platform: &Platform,
    version: &VersionDetails,
    loader: Option<&LoaderProfile>,
) -> LauncherResult<Vec<PathBuf>> {
    let libraries_dir = layout.libraries_dir();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    if let Some(profile) = loader {
        for library in &profile.libraries {
            let artifact = match MavenArtifact::parse(&library.name) {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!("Ignoring loader library: {}", e);
                    continue;
                }
            };
            if seen.insert(artifact.unversioned_key()) {
                push_existing(&mut entries, libraries_dir.join(artifact.local_path()));
            }
        }
    }

    for library in &version.libraries {
        if !library.is_allowed_on(platform) {
            continue;
        }
        let Some(artifact) = library.artifact() else {
            continue;
        };
        let key = MavenArtifact::parse(&library.name)
            .map(|a| a.unversioned_key())
            .unwrap_or_else(|_| library.name.clone());
        if !seen.insert(key) {
            debug!("Skipping {} (already provided)", library.name);
            continue;
        }
        push_existing(
            &mut entries,
            library_path(&libraries_dir, library, artifact, None)?,
        );
    }

    let client = layout.client_jar(&version.id);
    if !client.exists() {
        return Err(LauncherError::Other(format!(
            "Client jar missing: {:?}",
            client
        )));
    }
    entries.push(client);

    Ok(entries)
}

fn push_existing(entries: &mut Vec<PathBuf>, path: PathBuf) {
    if path.exists() {
        entries.push(path);
    } else {
        warn!("Classpath entry not found, skipping: {:?}", path);
    }
}

pub fn join_classpath(entries: &[PathBuf], platform: &Platform) -> String {
    entries
        .iter()
        .map(|p| safe_path_str(p))
        .collect::<Vec<_>>()
        .join(platform.classpath_separator())
}

/// Unpack native libraries of allowed version libraries into `natives/<id>`.
///
/// Sources are classifier natives (`natives` map) and artifacts whose own
/// classifier starts with `natives-`. Only files with the platform's native
/// extensions are kept, flattened, and `META-INF` is ignored.
pub async fn extract_natives(
    layout: &GameLayout,
    platform: &Platform,
    version: &VersionDetails,
) -> LauncherResult<PathBuf> {
    let natives_dir = layout.natives_dir(&version.id);
    let libraries_dir = layout.libraries_dir();

    let mut jars = Vec::new();
    for library in &version.libraries {
        if !library.is_allowed_on(platform) {
            continue;
        }
        if let Some(native) = library.native_artifact(platform) {
            let classifier = library.native_classifier(platform);
            jars.push(library_path(
                &libraries_dir,
                library,
                native,
                classifier.as_deref(),
            )?);
        }
        let classified_native = MavenArtifact::parse(&library.name)
            .ok()
            .and_then(|a| a.classifier)
            .is_some_and(|c| c.starts_with("natives-"));
        if let (true, Some(artifact)) = (classified_native, library.artifact()) {
            jars.push(library_path(&libraries_dir, library, artifact, None)?);
        }
    }

    if natives_dir.exists() {
        let _ = tokio::fs::remove_dir_all(&natives_dir).await;
    }
    tokio::fs::create_dir_all(&natives_dir)
        .await
        .map_err(|e| LauncherError::io(&natives_dir, e))?;

    let extensions = platform.native_extensions();
    let dest = natives_dir.clone();
    let extracted = tokio::task::spawn_blocking(move || -> LauncherResult<usize> {
        let mut extracted = 0;
        for jar in jars.iter().filter(|jar| jar.exists()) {
            extracted += extract_zip_with(jar, &dest, |name| native_target(name, extensions))?;
        }
        Ok(extracted)
    })
    .await??;

    debug!("Extracted {} native files into {:?}", extracted, natives_dir);
    Ok(natives_dir)
}

fn native_target(name: &Path, extensions: &[&str]) -> Option<PathBuf> {
    if name.starts_with("META-INF") {
        return None;
    }
    let ext = name.extension()?.to_str()?;
    if !extensions.contains(&ext) {
        return None;
    }
    name.file_name().map(PathBuf::from)
}

/// Path as a string, without the Windows extended-length `\\?\` prefix Java
/// cannot handle on the classpath.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{ArchKind, OsKind};
    use crate::core::test_support::{temp_dir, write_file, zip_bytes};

    fn linux() -> Platform {
        Platform::new(OsKind::Linux, ArchKind::X64)
    }

    fn version() -> VersionDetails {
        serde_json::from_value(serde_json::json!({
            "id": "1.21.11",
            "libraries": [
                {"name": "org.ow2.asm:asm:9.6", "downloads": {"artifact": {
                    "path": "org/ow2/asm/asm/9.6/asm-9.6.jar", "url": "https://x/asm.jar"}}},
                {"name": "com.mojang:brigadier:1.3.10", "downloads": {"artifact": {
                    "path": "com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar", "url": "https://x/b.jar"}}},
                {"name": "org.lwjgl:lwjgl:3.3.3:natives-linux",
                 "rules": [{"action": "allow", "os": {"name": "linux"}}],
                 "downloads": {"artifact": {
                    "path": "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar", "url": "https://x/l.jar"}}},
                {"name": "org.lwjgl:lwjgl:3.3.3:natives-windows",
                 "rules": [{"action": "allow", "os": {"name": "windows"}}],
                 "downloads": {"artifact": {
                    "path": "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-windows.jar", "url": "https://x/w.jar"}}}
            ]
        }))
        .unwrap()
    }

    fn install_files(layout: &GameLayout) {
        let libs = layout.libraries_dir();
        write_file(&libs.join("org/ow2/asm/asm/9.6/asm-9.6.jar"), b"old asm");
        write_file(&libs.join("org/ow2/asm/asm/9.9/asm-9.9.jar"), b"new asm");
        write_file(&libs.join("com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar"), b"b");
        write_file(
            &libs.join("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar"),
            &zip_bytes(&[
                ("META-INF/MANIFEST.MF", b"m"),
                ("linux/x64/org/lwjgl/liblwjgl.so", b"so"),
                ("linux/x64/org/lwjgl/liblwjgl.so.sha1", b"hash"),
            ]),
        );
        write_file(
            &libs.join("net/fabricmc/fabric-loader/0.18.4/fabric-loader-0.18.4.jar"),
            b"loader",
        );
        write_file(&layout.client_jar("1.21.11"), b"client");
    }

    fn fabric_profile() -> LoaderProfile {
        LoaderProfile::parse(
            r#"{"mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.9"},
                    {"name": "net.fabricmc:fabric-loader:0.18.4"}
                ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn loader_libraries_come_first_and_win() {
        let root = temp_dir("classpath-order");
        let layout = GameLayout::new(&root);
        install_files(&layout);
        let profile = fabric_profile();

        let entries = build_classpath(&layout, &linux(), &version(), Some(&profile)).unwrap();

        let libs = layout.libraries_dir();
        assert_eq!(
            entries,
            vec![
                libs.join("org/ow2/asm/asm/9.9/asm-9.9.jar"),
                libs.join("net/fabricmc/fabric-loader/0.18.4/fabric-loader-0.18.4.jar"),
                libs.join("com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar"),
                libs.join("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-linux.jar"),
                layout.client_jar("1.21.11"),
            ]
        );
    }

    #[test]
    fn escaping_loader_coordinate_stays_off_the_classpath() {
        let root = temp_dir("classpath-escape");
        let layout = GameLayout::new(&root);
        install_files(&layout);
        let profile = LoaderProfile::parse(
            r#"{"mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [
                    {"name": ".tmp:payload:1"},
                    {"name": "net.fabricmc:fabric-loader:0.18.4"}
                ]}"#,
        )
        .unwrap();

        let entries = build_classpath(&layout, &linux(), &version(), Some(&profile)).unwrap();

        let libs = layout.libraries_dir();
        assert!(entries.iter().all(|entry| entry.starts_with(&root)));
        assert_eq!(
            entries[0],
            libs.join("net/fabricmc/fabric-loader/0.18.4/fabric-loader-0.18.4.jar")
        );
    }

    #[test]
    fn vanilla_classpath_ends_with_client_jar() {
        let root = temp_dir("classpath-vanilla");
        let layout = GameLayout::new(&root);
        install_files(&layout);

        let entries = build_classpath(&layout, &linux(), &version(), None).unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(entries.last(), Some(&layout.client_jar("1.21.11")));
        assert_eq!(
            join_classpath(&entries, &linux()).matches(':').count(),
            3
        );
    }

    #[test]
    fn missing_client_jar_is_an_error() {
        let root = temp_dir("classpath-no-client");
        let layout = GameLayout::new(&root);

        assert!(build_classpath(&layout, &linux(), &version(), None).is_err());
    }

    #[tokio::test]
    async fn natives_are_flattened_and_filtered() {
        let root = temp_dir("classpath-natives");
        let layout = GameLayout::new(&root);
        install_files(&layout);
        write_file(&layout.natives_dir("1.21.11").join("stale.so"), b"old");

        let dir = extract_natives(&layout, &linux(), &version()).await.unwrap();

        assert!(dir.join("liblwjgl.so").exists());
        assert!(!dir.join("liblwjgl.so.sha1").exists());
        assert!(!dir.join("stale.so").exists());
        assert!(!dir.join("META-INF").exists());
    }
}
