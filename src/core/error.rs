use std::process::ExitCode;

use thiserror::Error;

/// Failure categories of a query run. Each maps to its own exit code.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("config error: {0}")]
    Config(String),
    #[error("usage: {0}")]
    Usage(String),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("logout failed: {0}")]
    Logout(String),
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Usage(_) | ToolError::Argument(_) => 2,
            ToolError::Config(_) => 3,
            ToolError::Authentication(_) => 4,
            ToolError::Query(_) => 5,
            ToolError::Output(_) => 6,
            ToolError::Logout(_) => 1,
        }
    }
}

impl From<&ToolError> for ExitCode {
    fn from(e: &ToolError) -> Self {
        ExitCode::from(e.exit_code())
    }
}
