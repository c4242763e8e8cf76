//! Error handling module for archprov
//!
//! Provides centralized error handling with proper error types using thiserror.
//! The provisioning core distinguishes three kinds of failure:
//!
//! - `Validation`: a wizard field was confirmed empty or malformed. Handled
//!   locally by the wizard; the state simply does not advance.
//! - `Execution`: an external command exited non-zero. Fatal steps turn this
//!   into the run's failure cause.
//! - `Layout`: a partition type with no matching strategy, or a layout that
//!   violates its own invariants. Raised before any disk step exists.

use thiserror::Error;

/// Main error type for archprov
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field is empty or holds an unusable value
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external command returned a non-zero exit status
    #[error("Step '{step_id}' failed (exit code {}): {}", exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()), stderr.trim())]
    Execution {
        step_id: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Partition layout could not be derived or is inconsistent
    #[error("Layout error: {0}")]
    Layout(String),

    /// A value could not be rendered safely into a shell script
    #[error("Script error: {0}")]
    Script(String),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// State errors (mutex poisoning, concurrent runs, invalid state)
    #[error("State error: {0}")]
    State(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for archprov operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an execution error for a step
    pub fn execution(
        step_id: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Execution {
            step_id: step_id.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a layout error
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    /// Create a script rendering error
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Returns true for errors the wizard absorbs without surfacing.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
