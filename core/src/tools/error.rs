use crate::schema::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    /// The remote tool reported `isError`; carries the serialized content
    #[error("{0}")]
    Remote(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;
