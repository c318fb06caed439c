//! Decides whether a working directory can be loaded without a download

use std::path::Path;

use taxdb_common::DumpFile;
use tracing::{debug, info, warn};

use super::archive::ArchiveExpander;
use crate::error::Result;

/// Checks a working directory for a complete set of dump files
#[derive(Debug, Clone, Default)]
pub struct LocalDataInspector {
    expander: ArchiveExpander,
}

impl LocalDataInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dump files absent from `directory`, in file-name order
    pub fn missing_files(directory: &Path) -> Vec<DumpFile> {
        DumpFile::ALL
            .into_iter()
            .filter(|file| !directory.join(file.file_name()).is_file())
            .collect()
    }

    /// Whether `directory` holds every dump file, expanding a local archive
    /// if that is what it takes
    ///
    /// A complete directory is reported ready without touching the archive.
    /// When files are missing and `taxdmp.zip` is present it is expanded and
    /// the directory is trusted to be complete afterwards.
    pub fn data_is_ready(&self, directory: &Path) -> Result<bool> {
        let missing = Self::missing_files(directory);
        if missing.is_empty() {
            info!(directory = %directory.display(), "All dump files present");
            return Ok(true);
        }
        for file in &missing {
            debug!(file = file.file_name(), "Dump file missing");
        }

        let archive_path = ArchiveExpander::archive_path(directory);
        if archive_path.is_file() {
            info!(
                archive = %archive_path.display(),
                missing = missing.len(),
                "Expanding local archive"
            );
            self.expander.expand(directory)?;
            return Ok(true);
        }

        warn!(
            directory = %directory.display(),
            missing = missing.len(),
            "Dump files and archive not found locally, download required"
        );
        Ok(false)
    }
}
