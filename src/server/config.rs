//! Server configuration from command line and environment.
use crate::storage::DEFAULT_UPLOAD_DIR;
use clap::Parser;
use clap::ValueEnum;
use std::path::PathBuf;

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sheet_tables.duckdb";

/// Output format of the log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// `sheet-tables` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sheet-tables",
    about = "Load spreadsheets into database tables and serve them over HTTP",
    version
)]
pub struct Config {
    /// DuckDB database file, or `:memory:`.
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,
    /// Directory receiving the uploaded files.
    #[arg(long, env = "UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: PathBuf,
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 2000)]
    pub port: u16,
    /// Log line format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}
