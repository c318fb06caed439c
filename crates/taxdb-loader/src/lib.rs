//! taxdb loader library
//!
//! Downloads the NCBI Taxonomy dump (`taxdmp.zip`) and loads it into a
//! freshly created PostgreSQL database.
//!
//! # Overview
//!
//! - **Configuration**: defaults, `taxdb.toml`, `TAXDB_*` and flags ([`config`])
//! - **Ingest**: download, expand and inspect the dump ([`ingest`])
//! - **Schema**: structured table description and rebuild ([`schema`])
//! - **Load**: transactional `COPY` of every dump file ([`load`])
//! - **Pipeline**: the state machine tying it together ([`pipeline`])
//!
//! # Example
//!
//! ```no_run
//! use taxdb_loader::{Cli, LoaderConfig, PipelineOrchestrator, WorkingDirectory};
//!
//! # async fn run() -> taxdb_loader::Result<i32> {
//! let cli = Cli {
//!     user: Some("loader".into()),
//!     password: Some("secret".into()),
//!     ..Cli::default()
//! };
//! let config = LoaderConfig::load(&cli)?;
//! let workdir = WorkingDirectory::resolve(config.directory.as_deref())?;
//! let outcome = PipelineOrchestrator::new(config)?.run(workdir).await?;
//! Ok(outcome.exit_code())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod load;
pub mod pipeline;
pub mod schema;

// Re-export commonly used types
pub use cli::Cli;
pub use config::LoaderConfig;
pub use error::{ArchiveError, FetchError, LoaderError, Result};
pub use load::LoadReport;
pub use pipeline::{PipelineOrchestrator, PipelineOutcome, PipelineState, WorkingDirectory};
