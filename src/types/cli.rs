use clap::Parser;
use serde::Serialize;

/// Connect to a SQL Server database and verify it answers.
///
/// Every flag may also come from the environment (`MSSQL_HOST`, ...) or a
/// `.env` file; flags win.
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "mssql-connect")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server as `host` or `host\instance`
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Database name
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbname: Option<String>,

    /// Login user
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Login password
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loglevel: Option<String>,

    /// Print the (redacted) connection string and exit
    #[arg(long)]
    #[serde(skip)]
    pub dry_run: bool,
}
