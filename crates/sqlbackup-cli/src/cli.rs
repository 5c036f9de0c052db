//! sqlbackup - back up every table owned by an Oracle user into a SQL script
//!
//! The script recreates each table (`DROP`, `CREATE`) and repopulates it with
//! one `INSERT` per row, BLOB columns included.

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use config::{FileConfig, Settings};
use logging::LoggingConfig;
use sqlbackup_core::Connection;
use sqlbackup_driver_oracle::{OracleConnectOptions, OracleConnection};
use sqlbackup_dump::{BackupPhase, BackupProgress, SqlBackup};

#[derive(Parser, Debug)]
#[command(
    name = "sqlbackup",
    version,
    about = "Backup Oracle tables owned by a user into a SQL file",
    long_about = "Backup all Oracle tables that belong to the connected user into a SQL \
                  script, including BLOB columns.\n\nUsage: sqlbackup user/password@connect_string > backup.sql"
)]
pub struct Args {
    /// Credentials as user/password@connect_string
    #[arg(env = "SQLBACKUP_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,

    /// Config file (default is $HOME/.sqlbackup.toml)
    #[arg(long, env = "SQLBACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// DROP table before CREATE
    #[arg(short, long, env = "SQLBACKUP_DROP")]
    pub drop: bool,

    /// Write the script to a file instead of stdout
    #[arg(short, long, env = "SQLBACKUP_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Only back up these tables (repeatable)
    #[arg(long = "table", value_name = "TABLE", env = "SQLBACKUP_TABLES", value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Skip these tables (repeatable)
    #[arg(long, value_name = "TABLE", env = "SQLBACKUP_EXCLUDE", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Seconds allowed for the liveness check before each table
    #[arg(long, value_name = "SECS", env = "SQLBACKUP_PING_TIMEOUT")]
    pub ping_timeout: Option<u64>,

    /// Seconds allowed for catalog queries (table list, DDL)
    #[arg(long, value_name = "SECS", env = "SQLBACKUP_METADATA_TIMEOUT")]
    pub metadata_timeout: Option<u64>,

    /// Seconds allowed for opening a row query and for each row fetch
    #[arg(long, value_name = "SECS", env = "SQLBACKUP_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Debug-level logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// How long exit waits for a driver call that is still blocked on the server
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init(LoggingConfig::for_verbosity(args.verbose)) {
        eprintln!("Error: failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(args));
    // Dropping the runtime would wait for every blocking task, including a
    // fetch that has already been given up on.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "backup failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let file_config = match FileConfig::load(args.config.as_deref())? {
        Some((path, config)) => {
            tracing::info!(path = %path.display(), "Using config file");
            config
        }
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, file_config)?;

    let close_timeout = settings.backup.ping_timeout;
    let connect_options = OracleConnectOptions::parse(&settings.credentials)?
        .with_call_timeout(settings.backup.longest_timeout());
    let connection = Arc::new(
        OracleConnection::connect(connect_options)
            .await
            .context("Failed to connect to Oracle")?,
    );

    let mut out: Box<dyn Write> = match &settings.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let backup = SqlBackup::new(connection.clone(), settings.backup)
        .with_progress_callback(Box::new(report_progress));
    let result = backup.backup_all(&mut *out).await;

    // Whatever was written before a failure stays in the script.
    let flushed = out.flush();
    match tokio::time::timeout(close_timeout, connection.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to close connection"),
        Err(_) => tracing::warn!(
            limit_secs = close_timeout.as_secs(),
            "connection did not close in time; exiting anyway"
        ),
    }

    let summary = result.context("Backup aborted")?;
    flushed.context("Failed to flush output")?;

    tracing::info!(
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        "backup complete"
    );
    Ok(())
}

fn report_progress(progress: BackupProgress) {
    if progress.phase == BackupPhase::Starting {
        return;
    }
    tracing::debug!(
        phase = ?progress.phase,
        completed = progress.tables_completed,
        total = progress.total_tables,
        "{}",
        progress.message.as_deref().unwrap_or_default()
    );
}
