use super::error::ToolResult;
use async_trait::async_trait;
use serde_json::Value;

/// What actually runs when a tool handle is invoked (local closure, direct
/// HTTP call, MCP `tools/call`, agent run).
///
/// Arguments arrive already validated against the handle's schema.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn call(&self, arguments: Value) -> ToolResult<Value>;
}
