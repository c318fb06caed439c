//! taxdb-load - Main entry point

use std::process;

use taxdb_common::logging::{init_logging, LogConfig, LogLevel};
use taxdb_loader::{Cli, LoaderConfig, PipelineOrchestrator, WorkingDirectory};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_or_exit();

    let level = if cli.debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::new("taxdb-load", level);
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {:#}", e);
            log_config
        },
    };
    // Loading works without a subscriber, so a failure here is not fatal
    let log_guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        },
    };

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "taxdb-load failed");
            eprintln!("Error: {}", e);
            1
        },
    };

    // Flush file logs before exiting
    drop(log_guard);
    process::exit(code);
}

async fn run(cli: &Cli) -> taxdb_loader::Result<i32> {
    let config = LoaderConfig::load(cli)?;
    info!(
        database = %config.database.name,
        host = %config.database.host,
        port = config.database.port,
        source = %config.source.url,
        "Starting taxonomy load"
    );

    let orchestrator = PipelineOrchestrator::new(config)?;
    let workdir = WorkingDirectory::resolve(orchestrator.config().directory.as_deref())?;
    let outcome = orchestrator.run(workdir).await?;
    Ok(outcome.exit_code())
}
