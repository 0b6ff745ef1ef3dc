//! mydump CLI - logical dumps of MySQL-compatible databases.

use clap::Parser;
use mydump::{Compression, DumpError, DumpOptions, Dumper, NoData};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_CONNECTION_ERROR: u8 = 2;
const EXIT_QUERY_ERROR: u8 = 3;
const EXIT_ENCODING_ERROR: u8 = 4;
const EXIT_IO_ERROR: u8 = 7;

#[derive(Parser)]
#[command(name = "mydump")]
#[command(about = "Replayable logical dumps of MySQL-compatible databases")]
#[command(version)]
struct Cli {
    /// Connection string, e.g. mysql:host=localhost;dbname=shop
    dsn: String,

    /// User name for the connection
    #[arg(short, long, default_value = "")]
    user: String,

    /// Password for the connection
    #[arg(short, long, default_value = "")]
    password: String,

    /// Output file path; standard output when omitted
    #[arg(short, long, default_value = "")]
    output: String,

    /// Path to a JSON or YAML settings file with the full option set
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Gzip-compress the dump
    #[arg(long)]
    gzip: bool,

    /// Emit DROP TABLE IF EXISTS before each CREATE TABLE
    #[arg(long)]
    add_drop_table: bool,

    /// Emit the CREATE DATABASE / USE wrapper
    #[arg(long)]
    databases: bool,

    /// Skip all row data
    #[arg(long)]
    no_data: bool,

    /// Include stored procedures
    #[arg(long)]
    routines: bool,

    /// Include scheduled events
    #[arg(long)]
    events: bool,

    /// Strip DEFINER clauses from view/trigger/routine/event DDL
    #[arg(long)]
    skip_definer: bool,

    /// Global WHERE clause applied to every row select
    #[arg(long = "where")]
    where_clause: Option<String>,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &DumpError) -> u8 {
    match err {
        DumpError::Config(_) => EXIT_CONFIG_ERROR,
        DumpError::Connection(_) => EXIT_CONNECTION_ERROR,
        DumpError::Query { .. } | DumpError::UnexpectedReply(_) => EXIT_QUERY_ERROR,
        DumpError::Encoding(_) => EXIT_ENCODING_ERROR,
        DumpError::Sink(_) => EXIT_IO_ERROR,
    }
}

async fn run() -> Result<(), DumpError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(DumpError::Config)?;

    let mut options = match &cli.settings {
        Some(path) => {
            let options = DumpOptions::load(path)?;
            info!("Loaded settings from {:?}", path);
            options
        }
        None => DumpOptions::default(),
    };

    // Flag overrides on top of the settings file.
    if cli.gzip {
        options.compress = Compression::Gzip;
    }
    if cli.add_drop_table {
        options.add_drop_table = true;
    }
    if cli.databases {
        options.databases = true;
    }
    if cli.no_data {
        options.no_data = NoData::Flag(true);
    }
    if cli.routines {
        options.routines = true;
    }
    if cli.events {
        options.events = true;
    }
    if cli.skip_definer {
        options.skip_definer = true;
    }
    if let Some(where_clause) = cli.where_clause {
        options.where_clause = where_clause;
    }

    let dumper = Dumper::new(&cli.dsn, &cli.user, &cli.password, options)?;
    let summary = dumper.start(&cli.output).await?;

    // The dump itself may be on stdout, so the summary goes to stderr.
    eprintln!("Dump completed in {:.2}s", summary.duration_seconds);
    eprintln!(
        "  Objects: {} tables, {} views, {} triggers, {} procedures, {} events",
        summary.tables, summary.views, summary.triggers, summary.procedures, summary.events
    );
    eprintln!("  Rows: {}", summary.rows);

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout is reserved for the dump text.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
