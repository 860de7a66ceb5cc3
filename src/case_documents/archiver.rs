//! Archiver
//!
//! Zips a run's working directory into a sibling `<dir>.zip` and removes the
//! directory afterwards.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{CaseDocumentError, Result};

/// Archive path for a working directory: same parent, `.zip` appended
pub fn archive_path_for(working_dir: &Path) -> PathBuf {
    let mut name = working_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".zip");
    working_dir.with_file_name(name)
}

/// Zip entry name: path relative to the working directory with `/` separators
fn entry_name(working_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(working_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Zip `working_dir` recursively, delete it, and return the archive's absolute path.
///
/// Entries are written in file-name order. Failing to delete the directory is
/// logged and otherwise ignored. A half-written archive is removed on error.
pub fn archive_directory(working_dir: &Path) -> Result<PathBuf> {
    let archive_path = archive_path_for(working_dir);
    let files = match write_archive(working_dir, &archive_path) {
        Ok(files) => files,
        Err(e) => {
            discard_partial_archive(&archive_path);
            return Err(e);
        }
    };
    debug!("Wrote {} files to {:?}", files, archive_path);

    if let Err(e) = std::fs::remove_dir_all(working_dir) {
        warn!(
            "Failed to remove working directory {:?}: {}",
            working_dir, e
        );
    }

    let archive_path = archive_path
        .canonicalize()
        .map_err(|e| CaseDocumentError::io(&archive_path, e))?;
    info!("Created archive {:?}", archive_path);
    Ok(archive_path)
}

fn write_archive(working_dir: &Path, archive_path: &Path) -> Result<usize> {
    let file = File::create(archive_path).map_err(|e| CaseDocumentError::io(archive_path, e))?;

    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0usize;

    for entry in WalkDir::new(working_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| CaseDocumentError::io(working_dir, io::Error::from(e)))?;
        let Some(name) = entry_name(working_dir, entry.path()) else {
            continue;
        };

        if entry.file_type().is_dir() {
            writer.add_directory(name.as_str(), options)?;
            continue;
        }

        writer.start_file(name.as_str(), options)?;
        let mut source =
            File::open(entry.path()).map_err(|e| CaseDocumentError::io(entry.path(), e))?;
        io::copy(&mut source, &mut writer).map_err(|e| CaseDocumentError::io(entry.path(), e))?;
        files += 1;
    }

    writer.finish()?;
    Ok(files)
}

fn discard_partial_archive(archive_path: &Path) {
    if !archive_path.is_file() {
        return;
    }
    if let Err(e) = std::fs::remove_file(archive_path) {
        warn!("Failed to remove partial archive {:?}: {}", archive_path, e);
    }
}
