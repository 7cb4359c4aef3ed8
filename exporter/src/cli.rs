use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::remote::is_valid_path;

#[derive(Parser, Debug)]
#[command(version, about = "Export a ZooKeeper tree into a JSON tree widget")]
pub struct Cli {
    /// host:port/root-path, the first '/' starts the root path
    pub connect_string: String,
    /// user:password for digest authentication, "" to skip
    pub credentials: String,
    /// File to write the JSON tree to
    pub destination: PathBuf,

    /// Configuration file [default: <config dir>/zktree/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Give up connecting after this many seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,
    /// Fail if a single node takes longer than this to fetch
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,
    /// Maximum number of nodes fetched at the same time
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_in_flight: Option<u64>,
    /// More logging, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("malformed invocation")]
    Args(#[from] clap::Error),
    #[error("'{0}' has no '/' after host:port, add one to start from the root")]
    NoRootPath(String),
    #[error("'{0}' does not name a host")]
    NoHost(String),
    #[error("'{0}' is not a valid node path")]
    InvalidRoot(String),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub root: String,
}

/// Splits `host:port/root` at the first '/'.
pub fn parse_connect_string(connect: &str) -> Result<Target, CliError> {
    let idx = connect
        .find('/')
        .ok_or_else(|| CliError::NoRootPath(connect.to_string()))?;
    let (host, root) = connect.split_at(idx);

    if host.is_empty() {
        return Err(CliError::NoHost(connect.to_string()));
    }
    if !is_valid_path(root) {
        return Err(CliError::InvalidRoot(root.to_string()));
    }

    Ok(Target {
        host: host.to_string(),
        root: root.to_string(),
    })
}
