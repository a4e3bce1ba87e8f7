//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// stagerun -- staged integration test runner.
///
/// Runs every test case file in order and exits with the worst result.
#[derive(Parser, Debug)]
#[command(name = "stagerun", version, about, long_about = None)]
pub struct Cli {
    /// Path to a stagerun.toml configuration file.
    ///
    /// Without it, `stagerun.toml` in the working directory is used when
    /// present, defaults otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write the test report to this file instead of the configured output.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Load, resolve and validate the test cases without running them.
    #[arg(long)]
    pub validate_only: bool,

    /// Summary format.
    #[arg(long, default_value = "text")]
    pub output: OutputFormat,

    /// Test case files (TOML).
    #[arg(required = true, value_name = "TEST_FILES")]
    pub test_files: Vec<PathBuf>,
}

/// Supported summary formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable coloured summary.
    Text,
    /// Machine-readable JSON.
    Json,
}
