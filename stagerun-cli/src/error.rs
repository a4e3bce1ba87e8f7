//! CLI-specific error types and exit code mapping

use stagerun_core::error::StagerunError;
use stagerun_executor::ExecutionError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes; the run as a
/// whole exits with the highest code among its test cases.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A test case file could not be loaded or resolved into a plan.
    #[error("test case '{path}' could not be loaded")]
    TestCase {
        path: String,
        #[source]
        source: StagerunError,
    },

    /// A test case ran and failed.
    #[error("test '{test}' failed")]
    TestFailed {
        test: String,
        #[source]
        source: ExecutionError,
    },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (report file, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from stagerun-core.
    #[error("{0}")]
    Core(#[from] StagerunError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                             |
    /// |------|-------------------------------------|
    /// | 0    | Success                             |
    /// | 1    | Test failure / general error        |
    /// | 2    | Configuration error                 |
    /// | 3    | Test case could not be loaded or    |
    /// |      | one of its steps failed validation  |
    /// | 10   | IO error                            |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::TestCase { source, .. } => match source {
                StagerunError::Io(_) => 10,
                _ => 3,
            },
            Self::Io(_) => 10,
            Self::Core(source) => match source {
                StagerunError::Config(_) => 2,
                StagerunError::Io(_) => 10,
                _ => 1,
            },
            Self::TestFailed { source, .. } => match source {
                ExecutionError::Validation { .. } => 3,
                _ => 1,
            },
            Self::JsonSerialize(_) => 1,
        }
    }
}
