//! Command-line surface of `taxdb-load`

use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process;

/// Exit code for malformed options, shared with every other configuration error
pub const USAGE_EXIT_CODE: i32 = 1;

/// Load the NCBI Taxonomy dump into a PostgreSQL database.
///
/// Database settings not given on the command line are taken from
/// `taxdb.toml` in the current directory (or `--config`) and from `TAXDB_*`
/// environment variables. Flags always win.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "taxdb-load")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Name of the database to (re)create
    #[arg(long = "db", value_name = "NAME")]
    pub db: Option<String>,

    /// Database host
    #[arg(long)]
    pub host: Option<String>,

    /// Database port
    #[arg(long)]
    pub port: Option<u16>,

    /// Database username
    #[arg(long)]
    pub user: Option<String>,

    /// Database password
    #[arg(long)]
    pub password: Option<String>,

    /// Directory for downloading and processing dump files.
    /// Without it a temporary directory is used and removed afterwards.
    #[arg(long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Download the dump even if the directory already holds one
    #[arg(long)]
    pub download: bool,

    /// Settings file (default: ./taxdb.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Archive location (ftp://, http:// or https://)
    #[arg(long, value_name = "URL")]
    pub source_url: Option<String>,

    /// Also fill the citation_taxa join table from citations.taxid_list
    #[arg(long)]
    pub normalize_citations: bool,

    /// Debug-level logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse the process arguments, exiting on malformed options
    ///
    /// `--help` and `--version` print and exit 0; any other parse failure
    /// exits with [`USAGE_EXIT_CODE`].
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(e) if is_informational(&e) => e.exit(),
            Err(e) => {
                let _ = e.print();
                process::exit(USAGE_EXIT_CODE)
            },
        }
    }
}

/// Whether a clap "error" is really requested help or version output
pub fn is_informational(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}
