//! Logging configuration and initialization
//!
//! All taxdb binaries log through `tracing`. This module owns the subscriber
//! setup: stderr, a daily rotating file, or both, each as text or JSON lines.
//! The caller picks a level and the `TAXDB_LOG_*` environment variables can
//! override any setting.
//!
//! Prefer structured fields over formatting values into the message:
//!
//! ```rust
//! use tracing::{error, info};
//!
//! let table = "names";
//! info!(table, rows = 42_u64, "Loaded table");
//! error!(table, error = "foreign key violation", "Bulk load failed");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use taxdb_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::new("taxdb-load", LogLevel::Debug).merge_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("Application started");
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Prefix of the logging environment overrides
const ENV_PREFIX: &str = "TAXDB_LOG_";

/// Verbosity threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(
            "log level",
            s,
            &[
                ("trace", LogLevel::Trace),
                ("debug", LogLevel::Debug),
                ("info", LogLevel::Info),
                ("warn", LogLevel::Warn),
                ("warning", LogLevel::Warn),
                ("error", LogLevel::Error),
            ],
        )
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// stderr only; stdout stays free for command output
    #[default]
    Console,
    File,
    Both,
}

impl LogOutput {
    fn console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(
            "log output",
            s,
            &[
                ("console", LogOutput::Console),
                ("stderr", LogOutput::Console),
                ("file", LogOutput::File),
                ("both", LogOutput::Both),
            ],
        )
    }
}

/// Line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice("log format", s, &[("text", LogFormat::Text), ("json", LogFormat::Json)])
    }
}

fn parse_choice<T: Copy>(what: &str, input: &str, choices: &[(&str, T)]) -> Result<T> {
    choices
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(input.trim()))
        .map(|&(_, value)| value)
        .ok_or_else(|| {
            let names: Vec<_> = choices.iter().map(|(name, _)| *name).collect();
            anyhow!("invalid {} '{}', expected one of: {}", what, input, names.join(", "))
        })
}

/// Subscriber settings for one binary
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Directory for rotated log files
    pub log_dir: PathBuf,
    /// File name prefix; the appender adds the date
    pub file_prefix: String,
    /// Extra `EnvFilter` directives, comma separated
    pub directives: Option<String>,
    pub show_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("taxdb", LogLevel::default())
    }
}

impl LogConfig {
    /// Console text logging at `level`, file prefix `name`
    pub fn new(name: &str, level: LogLevel) -> Self {
        Self {
            level,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("logs"),
            file_prefix: name.to_string(),
            // sqlx logs every statement at info
            directives: Some("sqlx=warn".to_string()),
            show_targets: false,
        }
    }

    pub fn with_output(self, output: LogOutput) -> Self {
        Self { output, ..self }
    }

    pub fn with_format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    pub fn with_directives(self, directives: impl Into<String>) -> Self {
        Self {
            directives: Some(directives.into()),
            ..self
        }
    }

    /// Apply `TAXDB_LOG_*` overrides
    ///
    /// `LEVEL`, `OUTPUT`, `FORMAT`, `DIR` and `FILTER` are recognized;
    /// `TARGETS=1` adds the event target to every line.
    pub fn merge_env(self) -> Result<Self> {
        self.merge_vars(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = var("LEVEL") {
            self.level = level.parse()?;
        }
        if let Some(output) = var("OUTPUT") {
            self.output = output.parse()?;
        }
        if let Some(format) = var("FORMAT") {
            self.format = format.parse()?;
        }
        if let Some(dir) = var("DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(filter) = var("FILTER") {
            self.directives = Some(filter);
        }
        if let Some(targets) = var("TARGETS") {
            self.show_targets = matches!(targets.trim(), "1" | "true");
        }
        Ok(self)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::builder()
            .with_default_directive(LevelFilter::from(self.level).into())
            .from_env_lossy();

        self.directives
            .iter()
            .flat_map(|d| d.split(','))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .try_fold(base, |filter, directive| {
                let parsed = directive
                    .parse()
                    .with_context(|| format!("bad log filter directive '{}'", directive))?;
                Ok(filter.add_directive(parsed))
            })
    }
}

/// Keeps the background file writer alive; drop it last in `main`
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard> {
    let filter = config.env_filter()?;

    let console = config.output.console().then(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_targets);
        match config.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        }
    });

    let (file, guard) = if config.output.file() {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("creating log directory {}", config.log_dir.display()))?;
        let appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(config.show_targets);
        let layer = match config.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        };
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}
