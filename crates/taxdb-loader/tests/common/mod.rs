//! Shared fixtures for taxdb-loader integration tests
//!
//! - a minimal but referentially complete taxdump, as files or as a zip
//! - in-memory [`ArchiveTransport`]s for driving the fetch step offline
//! - a PostgreSQL container (`#[ignore = "requires Docker"]` tests only)

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use taxdb_loader::config::Settings;
use taxdb_loader::ingest::ArchiveTransport;
use taxdb_loader::{Cli, FetchError, LoaderConfig};
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tracing::info;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// One division, one genetic code, the root node and its name
pub const MINIMAL_DUMP: &[(&str, &str)] = &[
    ("division.dmp", "0\t|\tBCT\t|\tBacteria\t|\t\t|\n"),
    (
        "gencode.dmp",
        "1\t|\t\t|\tStandard\t|\tFFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG\t|\t---M---------------M---------------M----------------------------\t|\n",
    ),
    (
        "nodes.dmp",
        "1\t|\t1\t|\tno rank\t|\t\t|\t0\t|\t0\t|\t1\t|\t0\t|\t0\t|\t0\t|\t0\t|\t0\t|\t\t|\n",
    ),
    ("names.dmp", "1\t|\troot\t|\t\t|\tscientific name\t|\n"),
    ("delnodes.dmp", ""),
    ("merged.dmp", ""),
    ("citations.dmp", ""),
];

pub const SOURCE_URL: &str = "http://archive.invalid/pub/taxonomy/taxdmp.zip";

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,taxdb_loader=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

/// Write `files` into `dir`
pub fn write_dump(dir: &Path, files: &[(&str, &str)]) -> Result<()> {
    for (name, contents) in files {
        fs::write(dir.join(name), contents).with_context(|| format!("writing {}", name))?;
    }
    Ok(())
}

/// Zip `files` in memory
pub fn zip_bytes(files: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in files {
        zip.start_file(*name, SimpleFileOptions::default())?;
        zip.write_all(contents.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

/// `files` with the contents of `name` replaced
pub fn with_file<'a>(
    files: &[(&'a str, &'a str)],
    name: &'a str,
    contents: &'a str,
) -> Vec<(&'a str, &'a str)> {
    files
        .iter()
        .map(|&(n, c)| if n == name { (n, contents) } else { (n, c) })
        .collect()
}

/// Serves a fixed archive and counts requests
#[derive(Clone)]
pub struct StaticTransport {
    data: Vec<u8>,
    calls: Arc<AtomicUsize>,
}

impl StaticTransport {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveTransport for StaticTransport {
    async fn retrieve(&self, _url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// Fails every request like an unreachable server
pub struct FailingTransport;

#[async_trait]
impl ArchiveTransport for FailingTransport {
    async fn retrieve(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        Err(FetchError::transport(url, "connection refused"))
    }
}

pub fn source_url() -> Url {
    Url::parse(SOURCE_URL).expect("valid fixture URL")
}

/// Loader configuration for a server at `host:port`
pub fn loader_config(
    host: &str,
    port: u16,
    db_name: &str,
    directory: Option<PathBuf>,
    normalize_citations: bool,
) -> LoaderConfig {
    let settings = Settings {
        db_name: db_name.to_string(),
        db_host: host.to_string(),
        db_port: port,
        db_user: Some("postgres".to_string()),
        db_password: Some("postgres".to_string()),
        source_url: SOURCE_URL.to_string(),
        normalize_citations,
        ..Settings::default()
    };
    let cli = Cli {
        directory,
        ..Cli::default()
    };
    LoaderConfig::from_settings(settings, &cli).expect("valid test configuration")
}

/// Configuration pointing at a port nothing listens on
pub fn unreachable_config(directory: Option<PathBuf>) -> LoaderConfig {
    loader_config("127.0.0.1", 1, "taxdb_unreachable", directory, false)
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// Disposable PostgreSQL server
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    host: String,
    port: u16,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");
        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;
        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?
            .to_string();
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;
        info!(host = %host, port, "PostgreSQL container ready");

        Ok(Self {
            _container: container,
            host,
            port,
        })
    }

    pub fn config(&self, db_name: &str, directory: Option<PathBuf>) -> LoaderConfig {
        loader_config(&self.host, self.port, db_name, directory, false)
    }

    pub fn config_normalized(&self, db_name: &str, directory: Option<PathBuf>) -> LoaderConfig {
        loader_config(&self.host, self.port, db_name, directory, true)
    }

    /// Connection to the database `config` loads into
    pub async fn connect(&self, config: &LoaderConfig) -> Result<PgConnection> {
        PgConnection::connect_with(&config.database.database_options())
            .await
            .context("Failed to connect to loaded database")
    }
}

/// Row count of `table`
pub async fn count_rows(conn: &mut PgConnection, table: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(conn)
        .await
        .with_context(|| format!("counting rows of {}", table))?;
    Ok(count)
}
