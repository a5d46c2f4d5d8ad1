/// Model Context Protocol (MCP) over WebSocket
///
/// - `transport`: retrying WebSocket JSON-RPC channel
/// - `client`: session with lazy handshake, tool listing and invocation
/// - `toolkit`: tool catalog to validated tool handles
/// - `types`: JSON-RPC 2.0 and MCP payload types
pub mod client;
pub mod toolkit;
pub mod transport;
pub mod types;

pub use client::{McpClient, McpConnector, McpSession, WebSocketConnector};
pub use toolkit::McpToolkit;
pub use transport::{ConnectionState, Transport, TransportEvent, WebSocketTransport};
pub use types::{
    CallToolResult, McpError, McpTool, DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
