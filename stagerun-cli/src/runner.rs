//! Runs test case files: configuration, report sink and the per-file loop.
//!
//! Each file gets a fresh [`StageExecutor`] and therefore a fresh context.
//! A failing file never stops the files after it; the process exit code is
//! the highest code among all of them.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use stagerun_core::error::error_chain;
use stagerun_core::{
    ConsoleSink, FileSink, LogSink, Logger, ReportConfig, StagerunConfig, StepRegistry, TestCase,
};
use stagerun_executor::StageExecutor;

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::Render;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "stagerun.toml";

/// Builds the effective configuration: defaults, file, env, then CLI flags.
pub async fn load_config(cli: &Cli) -> Result<StagerunConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => StagerunConfig::load(path).await?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            StagerunConfig::load(DEFAULT_CONFIG_FILE).await?
        }
        None => {
            let mut config = StagerunConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    apply_cli_overrides(&mut config, cli);
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

/// Applies command-line flags on top of file and env settings.
pub fn apply_cli_overrides(config: &mut StagerunConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(report) = &cli.report {
        config.report.output = "file".to_owned();
        config.report.path = report.display().to_string();
    }
}

/// Drops every report entry; used for `output = "none"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl LogSink for DiscardSink {
    fn write(&self, _block: &str) {}
}

/// Opens the report destination named by `[report]`.
pub fn open_report_sink(config: &ReportConfig) -> Result<Arc<dyn LogSink>, CliError> {
    match config.output.as_str() {
        "console" => Ok(Arc::new(ConsoleSink)),
        "file" => {
            let sink = FileSink::open(&config.path)?;
            info!(path = %config.path, "writing test report to file");
            Ok(Arc::new(sink))
        }
        "none" => Ok(Arc::new(DiscardSink)),
        other => Err(CliError::Config(format!(
            "unknown report output '{other}', expected console, file or none"
        ))),
    }
}

/// Outcome of one test case file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// Ran all stages without a failure.
    Passed,
    /// Loaded and validated (`--validate-only`).
    Valid,
    /// Ran and failed, or failed validation.
    Failed,
    /// Could not be loaded or resolved.
    Error,
}

impl CaseStatus {
    fn label(self) -> colored::ColoredString {
        match self {
            Self::Passed => "PASS ".green().bold(),
            Self::Valid => "VALID".green().bold(),
            Self::Failed => "FAIL ".red().bold(),
            Self::Error => "ERROR".yellow().bold(),
        }
    }
}

/// One line of the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    pub status: CaseStatus,
    pub exit_code: i32,
    pub elapsed_ms: u64,
    /// The failure and each of its causes, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Results of every test case file, in command-line order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<CaseResult>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, CaseStatus::Passed | CaseStatus::Valid))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// The highest exit code among all results, 0 when everything passed.
    pub fn exit_code(&self) -> i32 {
        self.results.iter().map(|r| r.exit_code).max().unwrap_or(0)
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w)?;
        for result in &self.results {
            match &result.test {
                Some(test) => writeln!(
                    w,
                    "{} {} ({}) {} ms",
                    result.status.label(),
                    test.bold(),
                    result.file,
                    result.elapsed_ms
                )?,
                None => writeln!(w, "{} {}", result.status.label(), result.file)?,
            }
            for (depth, message) in result.errors.iter().enumerate() {
                let indent = if depth == 0 { "      " } else { "        caused by: " };
                writeln!(w, "{indent}{}", message.dimmed())?;
            }
        }

        let totals = format!("{} passed, {} failed", self.passed(), self.failed());
        if self.failed() == 0 {
            writeln!(w, "\n{}", totals.green())?;
        } else {
            writeln!(w, "\n{}", totals.red())?;
        }
        Ok(())
    }
}

/// Runs test case files one after another against a shared registry and
/// report sink.
pub struct Runner {
    registry: StepRegistry,
    config: StagerunConfig,
    sink: Arc<dyn LogSink>,
    validate_only: bool,
}

impl Runner {
    /// A runner with the built-in steps registered.
    pub fn new(config: StagerunConfig, sink: Arc<dyn LogSink>) -> Result<Self, CliError> {
        let registry = stagerun_steps::builtin_registry()?;
        Ok(Self::with_registry(registry, config, sink))
    }

    /// A runner using a caller-provided registry.
    pub fn with_registry(
        registry: StepRegistry,
        config: StagerunConfig,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            registry,
            config,
            sink,
            validate_only: false,
        }
    }

    /// Stop after resolving and validating each test case.
    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    /// Runs every file in order.
    pub async fn run_all(&self, paths: &[PathBuf]) -> RunSummary {
        let mut summary = RunSummary::default();
        for path in paths {
            summary.results.push(self.run_file(path).await);
        }
        info!(
            total = summary.results.len(),
            passed = summary.passed(),
            failed = summary.failed(),
            "run finished"
        );
        summary
    }

    /// Loads, resolves and runs one test case file.
    pub async fn run_file(&self, path: &Path) -> CaseResult {
        let file = path.display().to_string();
        let started = Instant::now();
        let outcome = self.run_case(path).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(test) => {
                let status = if self.validate_only {
                    CaseStatus::Valid
                } else {
                    CaseStatus::Passed
                };
                CaseResult {
                    file,
                    test: Some(test),
                    status,
                    exit_code: 0,
                    elapsed_ms,
                    errors: Vec::new(),
                }
            }
            Err(err) => {
                warn!(file = %file, error = %err, "test case did not pass");
                let (test, status) = match &err {
                    CliError::TestFailed { test, .. } => (Some(test.clone()), CaseStatus::Failed),
                    _ => (None, CaseStatus::Error),
                };
                CaseResult {
                    file,
                    test,
                    status,
                    exit_code: err.exit_code(),
                    elapsed_ms,
                    errors: error_chain(&err),
                }
            }
        }
    }

    async fn run_case(&self, path: &Path) -> Result<String, CliError> {
        let file = path.display().to_string();
        let test_case = TestCase::load(path)
            .await
            .map_err(|source| CliError::TestCase {
                path: file.clone(),
                source,
            })?;
        let plan = self
            .registry
            .resolve(&test_case)
            .map_err(|source| CliError::TestCase {
                path: file.clone(),
                source,
            })?;
        info!(
            file = %file,
            test = %test_case.name,
            steps = plan.step_count(),
            "running test case"
        );

        let logger = Logger::direct(Arc::clone(&self.sink));
        let mut executor = StageExecutor::with_logger(plan, logger, self.config.executor.clone());
        let result = if self.validate_only {
            executor.validate()
        } else {
            executor.run_test().await
        };
        result.map_err(|source| CliError::TestFailed {
            test: test_case.name.clone(),
            source,
        })?;
        Ok(test_case.name)
    }
}
