// ─── Archive Extraction ───
// Blocking zip / tar.gz extraction; call from `spawn_blocking` inside async code.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

/// Identify an archive by its leading magic bytes.
pub fn detect_format(path: &Path) -> LauncherResult<ArchiveFormat> {
    let mut magic = [0_u8; 4];
    let mut file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let read = file.read(&mut magic).map_err(|e| LauncherError::io(path, e))?;

    match &magic[..read] {
        [b'P', b'K', 0x03, 0x04] | [b'P', b'K', 0x05, 0x06] => Ok(ArchiveFormat::Zip),
        [0x1f, 0x8b, ..] => Ok(ArchiveFormat::TarGz),
        _ => Err(LauncherError::Other(format!(
            "Unsupported archive format: {:?}",
            path
        ))),
    }
}

/// Extract `archive` into `dest`, overwriting existing files. Returns the number of
/// files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> LauncherResult<usize> {
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;
    let written = match detect_format(archive)? {
        ArchiveFormat::Zip => extract_zip_with(archive, dest, |name| Some(name.to_path_buf()))?,
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest)?,
    };
    debug!("Extracted {} files from {:?} into {:?}", written, archive, dest);
    Ok(written)
}

/// Extract the zip entries for which `map` returns a destination (relative to
/// `dest`). Entries with unsafe names are skipped.
pub fn extract_zip_with<F>(archive: &Path, dest: &Path, mut map: F) -> LauncherResult<usize>
where
    F: FnMut(&Path) -> Option<PathBuf>,
{
    let file = File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(name) = entry.enclosed_name() else {
            debug!("Skipping unsafe zip entry {:?}", entry.name());
            continue;
        };
        let Some(relative) = map(&name) else {
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| LauncherError::io(&out_path, e))?;
        }

        written += 1;
    }

    Ok(written)
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> LauncherResult<usize> {
    let file = File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);

    let mut written = 0;
    for entry in tar.entries().map_err(|e| LauncherError::io(archive, e))? {
        let mut entry = entry.map_err(|e| LauncherError::io(archive, e))?;
        let is_file = entry.header().entry_type().is_file();
        // unpack_in refuses entries that would land outside `dest`.
        let unpacked = entry.unpack_in(dest).map_err(|e| LauncherError::io(dest, e))?;
        if unpacked && is_file {
            written += 1;
        }
    }
    Ok(written)
}
