//! Command line configuration

use std::path::PathBuf;

use clap::Parser;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default snapshot directory
pub const DEFAULT_DATA_DIR: &str = "data";

/// Longest accepted input line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Poll server - multi-client text-line voting server
#[derive(Parser, Debug, Clone)]
#[command(name = "poll_server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-client text-line voting server", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    pub bind: String,

    /// Directory for save/load snapshot files
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Longest accepted input line; longer lines close the connection
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// tracing filter directive for this crate
    pub fn log_filter(&self) -> String {
        format!("poll_server={}", self.log_level)
    }
}
