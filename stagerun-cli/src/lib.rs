//! stagerun command-line runner.
//!
//! The binary parses [`cli::Cli`], builds the effective configuration with
//! [`runner::load_config`], installs tracing via [`logging::init_tracing`]
//! and hands every test case file to a [`runner::Runner`].

pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod runner;
