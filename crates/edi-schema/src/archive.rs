//! Mapping model archives
//!
//! A zip archive bundles mapping documents together with a manifest at
//! `META-INF/mapping-models.lst` listing the message models to register,
//! one archive-relative path per line. The archive is unpacked into an
//! extraction directory so imports between bundled documents resolve
//! like on-disk ones. A marker file in the extraction directory records
//! which archive was unpacked there, so the same archive is extracted
//! only once, even across restarts, while a different one replaces it.

use crate::{Error, Result};
use dashmap::DashMap;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Archive-relative path of the model manifest
pub const MANIFEST_PATH: &str = "META-INF/mapping-models.lst";

const EXTRACTED_MARKER: &str = ".mapping-models.extracted";

/// Identity of the archive last extracted into each target directory
static EXTRACTIONS: LazyLock<DashMap<PathBuf, Arc<Mutex<Option<String>>>>> =
    LazyLock::new(DashMap::new);

/// Unpack `archive` into `target` unless it is already there, and return
/// the manifest entries as paths inside `target`
///
/// # Errors
///
/// Returns `Archive` when the zip or its manifest is unreadable and `Io`
/// for filesystem failures.
pub fn extract(archive: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    let state = Arc::clone(
        EXTRACTIONS
            .entry(target.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value(),
    );
    let mut extracted = state
        .lock()
        .map_err(|_| Error::Archive(format!("extraction of {} was interrupted", target.display())))?;

    let identity = archive_identity(archive)?;
    let marker = target.join(EXTRACTED_MARKER);
    let on_disk = fs::read_to_string(&marker).ok();
    if extracted.as_deref() == Some(identity.as_str()) || on_disk.as_deref() == Some(identity.as_str()) {
        debug!("Mapping archive {} already extracted into {}", archive.display(), target.display());
    } else {
        if on_disk.is_some() {
            info!("{} holds a different mapping archive, extracting again", target.display());
        }
        unpack(archive, target)?;
        fs::write(&marker, &identity)?;
        info!("Extracted mapping archive {} into {}", archive.display(), target.display());
    }
    *extracted = Some(identity);
    drop(extracted);

    read_manifest(target)
}

/// Canonical path, size and modification time of an archive
fn archive_identity(archive: &Path) -> Result<String> {
    let path = fs::canonicalize(archive)?;
    let metadata = fs::metadata(&path)?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |elapsed| elapsed.as_nanos());
    Ok(format!("{}\n{}\n{modified}", path.display(), metadata.len()))
}

fn unpack(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip =
        ZipArchive::new(file).map_err(|e| Error::Archive(format!("{}: {e}", archive.display())))?;

    fs::create_dir_all(target)?;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::Archive(format!("{}: {e}", archive.display())))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let out = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = File::create(&out)?;
        std::io::copy(&mut entry, &mut writer)?;
    }
    Ok(())
}

/// Read the manifest of an extracted archive. Blank lines and lines
/// starting with `#` are ignored.
///
/// # Errors
///
/// Returns `Archive` when the manifest is missing or lists a path that is
/// absolute or leaves the extraction directory.
pub fn read_manifest(extracted: &Path) -> Result<Vec<PathBuf>> {
    let manifest = extracted.join(MANIFEST_PATH);
    if !manifest.is_file() {
        return Err(Error::Archive(format!("archive has no {MANIFEST_PATH}")));
    }
    let content = fs::read_to_string(&manifest)?;
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let relative = Path::new(line);
            let contained = relative
                .components()
                .all(|part| matches!(part, Component::Normal(_) | Component::CurDir));
            if contained {
                Ok(extracted.join(relative))
            } else {
                Err(Error::Archive(format!(
                    "{MANIFEST_PATH} entry '{line}' is not a path inside the archive"
                )))
            }
        })
        .collect()
}
