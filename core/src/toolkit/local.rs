use super::{Toolkit, ToolkitContext};
use crate::mcp::McpToolkit;
use crate::tools::ToolHandle;
use crate::{Result, ToolkitError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Developer-run MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEndpoint {
    pub name: String,
    /// Free text shown in logs next to the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP or WebSocket base URL of the server
    pub url: String,
}

impl LocalEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: url.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// MCP tools from a caller-supplied URL; no control-plane lookup, no fallback
pub struct LocalToolkit {
    ctx: ToolkitContext,
    endpoint: LocalEndpoint,
    mcp: Option<McpToolkit>,
}

impl LocalToolkit {
    pub fn new(ctx: ToolkitContext, endpoint: LocalEndpoint) -> Self {
        Self {
            ctx,
            endpoint,
            mcp: None,
        }
    }

    pub fn endpoint(&self) -> &LocalEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl Toolkit for LocalToolkit {
    fn label(&self) -> String {
        match self.endpoint.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => format!("local:{} ({})", self.endpoint.name, description),
            None => format!("local:{}", self.endpoint.name),
        }
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.mcp.is_some() {
            return Ok(());
        }
        info!(target: "local_toolkit", toolkit = %self.label(), url = %self.endpoint.url, "Connecting");

        let opened: Result<McpToolkit> = async {
            let headers = self.ctx.auth.headers().await?;
            let session = self.ctx.connector.connect(&self.endpoint.url, headers).await?;
            let mut toolkit = McpToolkit::new(session);
            toolkit.initialize().await?;
            Ok(toolkit)
        }
        .await;

        let toolkit = opened.map_err(|e| {
            ToolkitError::Connection(format!("Failed to initialize MCP toolkit, error: {}", e))
        })?;
        self.mcp = Some(toolkit);
        Ok(())
    }

    fn get_tools(&self) -> Result<Vec<ToolHandle>> {
        self.mcp
            .as_ref()
            .ok_or(ToolkitError::NotInitialized)?
            .get_tools()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PublicAuth;
    use crate::control_plane::MockControlPlane;
    use crate::mcp::client::{McpSession, MockMcpConnector, MockMcpSession};
    use crate::mcp::types::{McpError, McpTool};
    use crate::run::MockResourceRunner;
    use crate::settings::Settings;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx(connector: MockMcpConnector) -> ToolkitContext {
        ToolkitContext {
            settings: Arc::new(Settings::default()),
            auth: Arc::new(PublicAuth),
            control_plane: Arc::new(MockControlPlane::new()),
            runner: Arc::new(MockResourceRunner::new()),
            connector: Arc::new(connector),
        }
    }

    #[tokio::test]
    async fn connects_to_the_given_url_once() {
        let mut connector = MockMcpConnector::new();
        connector
            .expect_connect()
            .withf(|url, _| url == "http://localhost:1338")
            .times(1)
            .returning(|_, _| {
                let mut session = MockMcpSession::new();
                session.expect_list_tools().returning(|| {
                    Ok(vec![McpTool {
                        name: "weather".into(),
                        description: Some("Weather".into()),
                        input_schema: json!({"type": "object", "properties": {}}),
                    }])
                });
                let session: Arc<dyn McpSession> = Arc::new(session);
                Ok(session)
            });

        let mut toolkit = LocalToolkit::new(
            ctx(connector),
            LocalEndpoint::new("weather", "http://localhost:1338"),
        );
        toolkit.initialize().await.unwrap();
        toolkit.initialize().await.unwrap();
        assert_eq!(toolkit.get_tools().unwrap()[0].name, "weather");
    }

    #[tokio::test]
    async fn failure_is_not_retried_elsewhere() {
        let mut connector = MockMcpConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_, _| Err(McpError::Connection("refused".into())));

        let mut toolkit = LocalToolkit::new(
            ctx(connector),
            LocalEndpoint::new("weather", "http://localhost:1338"),
        );
        let err = toolkit.initialize().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to initialize MCP toolkit"));
        assert!(matches!(toolkit.get_tools(), Err(ToolkitError::NotInitialized)));
    }

    #[test]
    fn label_includes_description() {
        let plain = LocalToolkit::new(
            ctx(MockMcpConnector::new()),
            LocalEndpoint::new("weather", "http://localhost:1338"),
        );
        assert_eq!(plain.label(), "local:weather");

        let described = LocalToolkit::new(
            ctx(MockMcpConnector::new()),
            LocalEndpoint::new("weather", "http://localhost:1338").with_description("Forecasts"),
        );
        assert_eq!(described.label(), "local:weather (Forecasts)");
    }
}
