/// MCP toolkit
///
/// Turns a session's tool catalog into validated [`ToolHandle`]s.
use super::client::McpSession;
use super::types::{McpError, McpTool};
use crate::schema::from_input_schema;
use crate::tools::{ToolBackend, ToolError, ToolHandle, ToolResult};
use crate::{Result, ToolkitError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub struct McpToolkit {
    session: Arc<dyn McpSession>,
    /// Catalog cached by the first successful `initialize`
    tools: Option<Vec<McpTool>>,
}

impl McpToolkit {
    pub fn new(session: Arc<dyn McpSession>) -> Self {
        Self {
            session,
            tools: None,
        }
    }

    /// Fetch and cache the catalog; no-op once cached
    pub async fn initialize(&mut self) -> Result<()> {
        if self.tools.is_some() {
            debug!(target: "mcp_toolkit", "Catalog already cached");
            return Ok(());
        }
        let tools = self.session.list_tools().await?;
        info!(target: "mcp_toolkit", count = tools.len(), "Cached MCP tool catalog");
        self.tools = Some(tools);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.tools.is_some()
    }

    pub fn get_tools(&self) -> Result<Vec<ToolHandle>> {
        let tools = self.tools.as_ref().ok_or(ToolkitError::NotInitialized)?;
        Ok(tools
            .iter()
            .map(|tool| {
                ToolHandle::new(
                    tool.name.clone(),
                    tool.description.clone().unwrap_or_default(),
                    from_input_schema(&tool.input_schema),
                    Arc::new(McpToolBackend {
                        session: Arc::clone(&self.session),
                        tool: tool.name.clone(),
                    }),
                )
            })
            .collect())
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.session.close().await?)
    }
}

struct McpToolBackend {
    session: Arc<dyn McpSession>,
    tool: String,
}

#[async_trait]
impl ToolBackend for McpToolBackend {
    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        match self.session.call_tool(&self.tool, arguments).await {
            Ok(result) => {
                let content = serde_json::to_string(&result.content)
                    .map_err(|e| ToolError::Internal(e.to_string()))?;
                Ok(Value::String(content))
            }
            Err(McpError::ToolError(content)) => Err(ToolError::Remote(content)),
            Err(e) => Err(ToolError::ExecutionFailed(format!("MCP call failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::client::MockMcpSession;
    use crate::mcp::types::CallToolResult;
    use serde_json::json;

    fn echo_tool() -> McpTool {
        McpTool {
            name: "echo".into(),
            description: Some("Echo a message".into()),
            input_schema: json!({
                "type": "object",
                "properties": {"msg": {"type": "string", "required": true}}
            }),
        }
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let mut session = MockMcpSession::new();
        session
            .expect_list_tools()
            .times(1)
            .returning(|| Ok(vec![echo_tool()]));

        let mut toolkit = McpToolkit::new(Arc::new(session));
        toolkit.initialize().await.unwrap();
        toolkit.initialize().await.unwrap();
        assert_eq!(toolkit.get_tools().unwrap().len(), 1);
    }

    #[test]
    fn get_tools_before_initialize_fails() {
        let toolkit = McpToolkit::new(Arc::new(MockMcpSession::new()));
        assert!(matches!(toolkit.get_tools(), Err(ToolkitError::NotInitialized)));
    }

    #[tokio::test]
    async fn invoke_calls_session_and_stringifies_content() {
        let mut session = MockMcpSession::new();
        session
            .expect_list_tools()
            .returning(|| Ok(vec![echo_tool()]));
        session
            .expect_call_tool()
            .withf(|name, args| name == "echo" && *args == json!({"msg": "hi"}))
            .times(1)
            .returning(|_, _| {
                Ok(CallToolResult {
                    content: vec![json!({"type": "text", "text": "hi"})],
                    is_error: false,
                })
            });

        let mut toolkit = McpToolkit::new(Arc::new(session));
        toolkit.initialize().await.unwrap();
        let tools = toolkit.get_tools().unwrap();

        let out = tools[0].invoke(json!({"msg": "hi"})).await.unwrap();
        assert_eq!(out, json!(r#"[{"type":"text","text":"hi"}]"#));
    }

    #[tokio::test]
    async fn missing_required_argument_never_reaches_session() {
        let mut session = MockMcpSession::new();
        session
            .expect_list_tools()
            .returning(|| Ok(vec![echo_tool()]));
        session.expect_call_tool().never();

        let mut toolkit = McpToolkit::new(Arc::new(session));
        toolkit.initialize().await.unwrap();
        let tools = toolkit.get_tools().unwrap();
        assert!(matches!(
            tools[0].invoke(json!({})).await,
            Err(ToolError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn remote_error_is_rethrown() {
        let mut session = MockMcpSession::new();
        session
            .expect_list_tools()
            .returning(|| Ok(vec![echo_tool()]));
        session
            .expect_call_tool()
            .returning(|_, _| Err(McpError::ToolError(r#"[{"text":"bad"}]"#.into())));

        let mut toolkit = McpToolkit::new(Arc::new(session));
        toolkit.initialize().await.unwrap();
        let err = toolkit.get_tools().unwrap()[0]
            .invoke(json!({"msg": "hi"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), r#"[{"text":"bad"}]"#);
    }
}
