// scout-core/src/errors.rs
use serde::Serialize;
use thiserror::Error;

/// Errors that end a query before or instead of producing results.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// The plan (flags or document) failed a presence, type or bound check.
    #[error("invalid plan: {field}: {message}")]
    Validation { field: String, message: String },

    /// A required external tool could not be resolved on this host.
    #[error("missing required command '{tool}' (package: {package}). Install it and ensure it's on your PATH.\nInstallation instructions: {install}")]
    DependencyMissing {
        tool: String,
        package: String,
        install: String,
    },

    /// Error related to configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Every invocation of a query failed, leaving nothing to report.
    #[error("Execution Error: {0}")]
    Execution(String),

    /// Writing an output artifact failed.
    #[error("Artifact Error: {0:#}")]
    Artifact(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoutError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ScoutError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ScoutError::Config(msg.into())
    }
}

/// Failure of a single external invocation. Collected into the summary; never
/// aborts sibling invocations.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationError {
    #[error("{program} exited with code {code}: {stderr}")]
    Exit {
        program: String,
        pattern: Option<String>,
        code: i32,
        stderr: String,
    },

    #[error("failed to launch {program}: {message}")]
    Launch {
        program: String,
        pattern: Option<String>,
        message: String,
    },

    #[error("{program} timed out after {after_ms} ms")]
    Timeout {
        program: String,
        pattern: Option<String>,
        after_ms: u64,
    },
}

impl InvocationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, InvocationError::Timeout { .. })
    }
}
