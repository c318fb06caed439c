//! Configuration management
//!
//! Settings are merged in one precedence chain, lowest first:
//!
//! 1. built-in defaults
//! 2. the settings file (`taxdb.toml` in the working directory, or `--config`)
//! 3. `TAXDB_*` environment variables (a `.env` file is honored by `main`)
//! 4. command-line flags
//!
//! The merged [`Settings`] are then validated into a [`LoaderConfig`]. A
//! missing username or password is a configuration error; nothing has been
//! downloaded or connected to at that point.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use url::Url;

use crate::cli::Cli;
use crate::error::{LoaderError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default target database name.
pub const DEFAULT_DB_NAME: &str = "ncbi_taxonomy";

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Database used for DROP/CREATE DATABASE.
pub const DEFAULT_MAINTENANCE_DB: &str = "postgres";

/// Location of the taxdump archive.
pub const DEFAULT_SOURCE_URL: &str = "ftp://ftp.ncbi.nlm.nih.gov/pub/taxonomy/taxdmp.zip";

/// Connection timeout for the archive download in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for the archive download in seconds (the archive is ~60 MB).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 1800;

/// Bytes buffered before a COPY chunk is sent to the server.
pub const DEFAULT_COPY_FLUSH_BYTES: usize = 4 * 1024 * 1024;

/// Settings file looked up in the current directory.
pub const DEFAULT_SETTINGS_FILE: &str = "taxdb.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "TAXDB_";

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Settings taken verbatim from the environment; figment would otherwise
/// read `TAXDB_DB_PASSWORD=12345` as an integer and `007` as 7.
const STRING_SETTINGS: [&str; 6] = [
    "db_name",
    "db_host",
    "db_user",
    "db_password",
    "maintenance_db",
    "source_url",
];

/// Raw merged settings, as read from file, environment and flags
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    pub db_name: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub maintenance_db: String,
    pub source_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub copy_flush_bytes: usize,
    pub normalize_citations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_user: None,
            db_password: None,
            maintenance_db: DEFAULT_MAINTENANCE_DB.to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            copy_flush_bytes: DEFAULT_COPY_FLUSH_BYTES,
            normalize_citations: false,
        }
    }
}

/// Flags that were actually given; absent ones must not mask lower layers
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normalize_citations: Option<bool>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            db_name: cli.db.clone(),
            db_host: cli.host.clone(),
            db_port: cli.port,
            db_user: cli.user.clone(),
            db_password: cli.password.clone(),
            source_url: cli.source_url.clone(),
            normalize_citations: cli.normalize_citations.then_some(true),
        }
    }
}

/// Connection parameters for the target database server
#[derive(Clone)]
pub struct DatabaseSettings {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub maintenance_db: String,
}

impl DatabaseSettings {
    /// Options for the server-level connection used to drop/create the target
    pub fn server_options(&self) -> PgConnectOptions {
        self.base_options().database(&self.maintenance_db)
    }

    /// Options for a connection scoped to the target database
    pub fn database_options(&self) -> PgConnectOptions {
        self.base_options().database(&self.name)
    }

    fn base_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .application_name("taxdb-load")
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("maintenance_db", &self.maintenance_db)
            .finish()
    }
}

/// Where the archive comes from
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: Url,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

/// Bulk load tuning
#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub flush_bytes: usize,
    pub normalize_citations: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            flush_bytes: DEFAULT_COPY_FLUSH_BYTES,
            normalize_citations: false,
        }
    }
}

/// Validated configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub database: DatabaseSettings,
    pub source: SourceSettings,
    pub load: LoadSettings,
    /// Working directory; `None` means a temporary directory
    pub directory: Option<PathBuf>,
    /// Fetch the archive even when local dump files look complete
    pub force_download: bool,
}

impl LoaderConfig {
    /// Merge defaults, settings file, environment and flags, then validate
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::from_figment(Self::figment(cli)?, cli)
    }

    /// The layered provider chain for `cli`
    pub fn figment(cli: &Cli) -> Result<Figment> {
        let settings_file = match &cli.config {
            Some(path) if !path.is_file() => {
                return Err(LoaderError::config(format!(
                    "settings file {} does not exist",
                    path.display()
                )));
            },
            Some(path) => path.clone(),
            None => PathBuf::from(DEFAULT_SETTINGS_FILE),
        };

        Ok(Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(settings_file))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&STRING_SETTINGS))
            .merge(Serialized::defaults(env_strings()))
            .merge(Serialized::defaults(CliOverrides::from(cli))))
    }

    /// Extract and validate settings from an already layered figment
    pub fn from_figment(figment: Figment, cli: &Cli) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| LoaderError::config(format!("invalid settings: {}", e)))?;
        Self::from_settings(settings, cli)
    }

    /// Validate merged settings
    pub fn from_settings(settings: Settings, cli: &Cli) -> Result<Self> {
        let (user, password) = match (settings.db_user, settings.db_password) {
            (Some(user), Some(password)) if !user.is_empty() => (user, password),
            _ => {
                return Err(LoaderError::config(
                    "database username and password are required, either as --user/--password, \
                     in the settings file, or as TAXDB_DB_USER/TAXDB_DB_PASSWORD",
                ));
            },
        };

        validate_database_name(&settings.db_name)?;
        if settings.db_name == settings.maintenance_db {
            return Err(LoaderError::config(format!(
                "target database '{}' must differ from the maintenance database",
                settings.db_name
            )));
        }
        if settings.copy_flush_bytes == 0 {
            return Err(LoaderError::config("copy_flush_bytes must be greater than 0"));
        }

        let url = parse_source_url(&settings.source_url)?;

        // A temporary directory is always empty, so it always needs a download.
        let force_download = cli.download || cli.directory.is_none();

        Ok(Self {
            database: DatabaseSettings {
                name: settings.db_name,
                host: settings.db_host,
                port: settings.db_port,
                user,
                password,
                maintenance_db: settings.maintenance_db,
            },
            source: SourceSettings {
                url,
                connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
                read_timeout: Duration::from_secs(settings.read_timeout_secs),
            },
            load: LoadSettings {
                flush_bytes: settings.copy_flush_bytes,
                normalize_citations: settings.normalize_citations,
            },
            directory: cli.directory.clone(),
            force_download,
        })
    }
}

/// `TAXDB_*` values of the string settings, unparsed
fn env_strings() -> BTreeMap<&'static str, String> {
    STRING_SETTINGS
        .iter()
        .filter_map(|&key| {
            let var = format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase());
            std::env::var(var).ok().map(|value| (key, value))
        })
        .collect()
}

fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN {
        return Err(LoaderError::config(format!(
            "database name must be 1-{} characters, got '{}'",
            MAX_IDENTIFIER_LEN, name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(LoaderError::config(format!(
            "database name '{}' may only contain letters, digits, '_' and '-'",
            name
        )));
    }
    Ok(())
}

fn parse_source_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| LoaderError::config(format!("invalid source URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "ftp" | "http" | "https" => Ok(url),
        other => Err(LoaderError::config(format!(
            "unsupported source URL scheme '{}' (expected ftp, http or https)",
            other
        ))),
    }
}
