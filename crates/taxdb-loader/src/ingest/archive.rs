//! Expansion of `taxdmp.zip` into the working directory

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use taxdb_common::dump::ARCHIVE_FILE_NAME;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ArchiveError;

type Result<T> = std::result::Result<T, ArchiveError>;

/// Extracts the downloaded archive next to itself
#[derive(Debug, Clone, Default)]
pub struct ArchiveExpander;

impl ArchiveExpander {
    pub fn new() -> Self {
        Self
    }

    /// Path of the archive inside `directory`
    pub fn archive_path(directory: &Path) -> PathBuf {
        directory.join(ARCHIVE_FILE_NAME)
    }

    /// Extract every entry of `directory/taxdmp.zip` into `directory`
    ///
    /// Existing files are overwritten. Returns the paths written.
    pub fn expand(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let archive_path = Self::archive_path(directory);
        let file = File::open(&archive_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ArchiveError::Missing {
                path: archive_path.clone(),
            },
            _ => ArchiveError::Io {
                path: archive_path.clone(),
                source: e,
            },
        })?;

        let corrupt = |reason: String| ArchiveError::Corrupt {
            path: archive_path.clone(),
            reason,
        };

        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;
        info!(
            archive = %archive_path.display(),
            entries = archive.len(),
            "Expanding archive"
        );

        let mut written = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| corrupt(e.to_string()))?;
            let relative = entry.enclosed_name().ok_or_else(|| ArchiveError::UnsafeEntry {
                name: entry.name().to_string(),
            })?;
            let target = directory.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| write_error(&target, e))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
            }

            let mut out = File::create(&target).map_err(|e| write_error(&target, e))?;
            let bytes = io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
                // zip reports checksum and inflate failures as InvalidData
                io::ErrorKind::InvalidData => corrupt(format!("{}: {}", target.display(), e)),
                _ => write_error(&target, e),
            })?;

            debug!(file = %target.display(), bytes, "Extracted");
            written.push(target);
        }

        info!(files = written.len(), "Archive expanded");
        Ok(written)
    }
}

fn write_error(path: &Path, source: io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}
