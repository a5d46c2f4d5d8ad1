// Blaxel Toolkit
// Function/tool resolution for agents: local registries, remote functions,
// MCP servers over WebSocket and agent chains.

pub mod auth;
pub mod control_plane;
pub mod functions;
pub mod mcp;
pub mod retry;
pub mod run;
pub mod schema;
pub mod settings;
pub mod toolkit;
pub mod tools;

// Export core types
pub use functions::{get_functions, Functions, GetFunctionsOptions};
pub use retry::RetryPolicy;
pub use settings::Settings;
pub use toolkit::{
    AnyToolkit, ChainToolkit, LocalEndpoint, LocalToolkit, RemoteToolkit, Toolkit, ToolkitContext,
};
pub use tools::{FunctionRegistry, Handler, LocalFunction, ToolError, ToolHandle, ToolResult};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error(
        "function `{name}` not found (error {status}). Available functions: {}",
        .available.join(", ")
    )]
    NotFound {
        name: String,
        status: u16,
        available: Vec<String>,
    },

    #[error("No agents found")]
    NoAgents,

    #[error("Must initialize the toolkit first")]
    NotInitialized,

    #[error("{0}")]
    Connection(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MCP error: {0}")]
    Mcp(#[from] mcp::McpError),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ToolkitError>;
