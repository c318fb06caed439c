//! End-to-end load pipeline
//!
//! ```text
//! NeedData ──fetch──▶ DataReady ──rebuild──▶ SchemaRebuilt ──load──▶ Loaded
//!     │                   ▲                                    │
//!     └── local data ─────┘                                    │
//!     │                                                        │
//!     └── download failed ──▶ Failed ◀──── load failed ────────┘
//! ```
//!
//! A temporary working directory is removed when the run ends, whatever the
//! outcome. Archive and schema errors abort the run and propagate; download
//! and load failures end it in [`PipelineState::Failed`].

use std::fmt;
use std::path::{Path, PathBuf};

use sqlx::Connection;
use tempfile::TempDir;
use tracing::{error, info, warn};

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::ingest::{ArchiveFetcher, LocalDataInspector};
use crate::load::{BulkLoader, LoadReport};
use crate::schema::{Schema, SchemaManager};

/// Pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NeedData,
    DataReady,
    SchemaRebuilt,
    Loaded,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::NeedData => "need-data",
            PipelineState::DataReady => "data-ready",
            PipelineState::SchemaRebuilt => "schema-rebuilt",
            PipelineState::Loaded => "loaded",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Staging directory for one run
#[derive(Debug)]
pub enum WorkingDirectory {
    /// Given by the user; kept after the run
    Provided(PathBuf),
    /// Created for this run and removed afterwards
    Temporary(TempDir),
}

impl WorkingDirectory {
    /// Use `directory` (created if missing), or a fresh temporary directory
    pub fn resolve(directory: Option<&Path>) -> Result<Self> {
        match directory {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| LoaderError::io(path, e))?;
                Ok(WorkingDirectory::Provided(path.to_path_buf()))
            },
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("taxdb-")
                    .tempdir()
                    .map_err(|e| LoaderError::io(std::env::temp_dir(), e))?;
                info!(directory = %dir.path().display(), "Using temporary working directory");
                Ok(WorkingDirectory::Temporary(dir))
            },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkingDirectory::Provided(path) => path,
            WorkingDirectory::Temporary(dir) => dir.path(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, WorkingDirectory::Temporary(_))
    }

    /// Remove the directory if it is temporary
    pub fn cleanup(self) -> Result<()> {
        match self {
            WorkingDirectory::Provided(_) => Ok(()),
            WorkingDirectory::Temporary(dir) => {
                let path = dir.path().to_path_buf();
                dir.close().map_err(|e| LoaderError::io(&path, e))?;
                info!(directory = %path.display(), "Removed temporary working directory");
                Ok(())
            },
        }
    }
}

/// Final state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    /// Present when the load committed
    pub report: Option<LoadReport>,
}

impl PipelineOutcome {
    fn failed() -> Self {
        Self {
            state: PipelineState::Failed,
            report: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Loaded
    }

    /// Process exit code: 0 when loaded, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Sequences fetch, inspection, schema rebuild and bulk load
pub struct PipelineOrchestrator {
    config: LoaderConfig,
    fetcher: ArchiveFetcher,
    inspector: LocalDataInspector,
    schema_manager: SchemaManager,
    loader: BulkLoader,
}

impl PipelineOrchestrator {
    /// Orchestrator downloading from the configured source
    pub fn new(config: LoaderConfig) -> Result<Self> {
        let fetcher = ArchiveFetcher::new(&config.source)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Orchestrator with a caller-supplied fetcher
    pub fn with_fetcher(config: LoaderConfig, fetcher: ArchiveFetcher) -> Self {
        let schema_manager = SchemaManager::new(Schema::new(config.load.normalize_citations));
        let loader = BulkLoader::new(config.load.clone());
        Self {
            config,
            fetcher,
            inspector: LocalDataInspector::new(),
            schema_manager,
            loader,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run the pipeline in `workdir`, then clean it up
    pub async fn run(&self, workdir: WorkingDirectory) -> Result<PipelineOutcome> {
        let result = self.execute(workdir.path()).await;

        if let Err(e) = workdir.cleanup() {
            warn!(error = %e, "Failed to remove temporary working directory");
        }

        match &result {
            Ok(outcome) if outcome.is_success() => info!("Data loaded successfully"),
            Ok(_) => error!("Data loading failed"),
            Err(e) => error!(error = %e, "Data loading aborted"),
        }
        result
    }

    async fn execute(&self, directory: &Path) -> Result<PipelineOutcome> {
        let mut state = PipelineState::NeedData;

        if self.config.force_download {
            info!("Download requested");
        }
        let local_ready = !self.config.force_download && self.inspector.data_is_ready(directory)?;

        if !local_ready && !self.fetcher.fetch(directory).await? {
            advance(&mut state, PipelineState::Failed);
            return Ok(PipelineOutcome::failed());
        }
        advance(&mut state, PipelineState::DataReady);

        let mut conn = self.schema_manager.rebuild(&self.config.database).await?;
        advance(&mut state, PipelineState::SchemaRebuilt);

        let outcome = match self.loader.load_all(&mut conn, directory).await {
            Ok(report) => {
                advance(&mut state, PipelineState::Loaded);
                PipelineOutcome {
                    state,
                    report: Some(report),
                }
            },
            Err(e) => {
                error!(table = e.table(), error = %e, "Bulk load failed");
                warn!(
                    database = %self.config.database.name,
                    "Database was recreated but is left empty"
                );
                advance(&mut state, PipelineState::Failed);
                PipelineOutcome::failed()
            },
        };

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection");
        }
        Ok(outcome)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    info!(from = %state, to = %next, "Pipeline state change");
    *state = next;
}
