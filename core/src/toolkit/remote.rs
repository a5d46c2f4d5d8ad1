use super::{Toolkit, ToolkitContext};
use crate::control_plane::{FunctionLookup, FunctionRecord};
use crate::mcp::McpToolkit;
use crate::run::{ResourceRunner, ResourceType, RunRequest};
use crate::schema::build_schema;
use crate::tools::{ToolBackend, ToolHandle, ToolResult};
use crate::{Result, ToolkitError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tools of one function deployed on the platform.
///
/// Functions with integration connections are served over MCP; the others
/// are called with a plain POST on the run endpoint.
pub struct RemoteToolkit {
    ctx: ToolkitContext,
    /// Function name as deployed on the control plane
    name: String,
    /// Record fetched once by `initialize`
    function: Option<FunctionRecord>,
    /// Set when the function is backed by integration connections
    mcp: Option<McpToolkit>,
}

impl RemoteToolkit {
    pub fn new(ctx: ToolkitContext, name: impl Into<String>) -> Self {
        Self {
            ctx,
            name: name.into(),
            function: None,
            mcp: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Public run URL, always known
    pub fn public_url(&self) -> String {
        format!(
            "{}/{}/functions/{}",
            self.ctx.settings.run_url.trim_end_matches('/'),
            self.ctx.settings.workspace,
            self.name
        )
    }

    /// In-cluster URL, when a service name is configured for this function
    pub fn internal_url(&self) -> Option<String> {
        let service = self.ctx.settings.function_service_name(&self.name)?;
        let hostname = &self.ctx.settings.run_internal_hostname;
        if hostname.is_empty() {
            debug!(target: "remote_toolkit", function = %self.name, "Service name set but no internal hostname");
            return None;
        }
        Some(format!("https://{}.{}", service, hostname))
    }

    async fn fetch_function(&self) -> Result<FunctionRecord> {
        match self.ctx.control_plane.get_function(&self.name).await? {
            FunctionLookup::Found(record) => Ok(record),
            FunctionLookup::Missing { status } => {
                let available = self
                    .ctx
                    .control_plane
                    .list_functions()
                    .await?
                    .iter()
                    .map(|f| f.name().to_string())
                    .collect();
                Err(ToolkitError::NotFound {
                    name: self.name.clone(),
                    status,
                    available,
                })
            }
        }
    }

    async fn open_mcp(&self, url: &str) -> Result<McpToolkit> {
        let headers = self.ctx.auth.headers().await?;
        let session = self.ctx.connector.connect(url, headers).await?;
        let mut toolkit = McpToolkit::new(session);
        toolkit.initialize().await?;
        Ok(toolkit)
    }

    async fn resolve_mcp(&self) -> Result<McpToolkit> {
        let public = self.public_url();
        let first = match self.internal_url() {
            Some(internal) => {
                info!(target: "remote_toolkit", function = %self.name, url = %internal, "Connecting over internal network");
                match self.open_mcp(&internal).await {
                    Ok(toolkit) => return Ok(toolkit),
                    Err(e) => {
                        warn!(target: "remote_toolkit", function = %self.name, error = %e, fallback = %public, "Internal connection failed, using public URL");
                    }
                }
                self.open_mcp(&public).await
            }
            None => {
                info!(target: "remote_toolkit", function = %self.name, url = %public, "Connecting");
                self.open_mcp(&public).await
            }
        };
        first.map_err(|e| {
            ToolkitError::Connection(format!("Failed to initialize MCP toolkit, error: {}", e))
        })
    }
}

#[async_trait]
impl Toolkit for RemoteToolkit {
    fn label(&self) -> String {
        format!("remote:{}", self.name)
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.function.is_none() {
            let record = self.fetch_function().await?;
            debug!(target: "remote_toolkit", function = %self.name, mcp = record.has_integration_connections(), "Fetched function");
            self.function = Some(record);
        }

        let needs_mcp = self
            .function
            .as_ref()
            .map(FunctionRecord::has_integration_connections)
            .unwrap_or(false);
        if needs_mcp && self.mcp.is_none() {
            self.mcp = Some(self.resolve_mcp().await?);
        }
        Ok(())
    }

    fn get_tools(&self) -> Result<Vec<ToolHandle>> {
        let function = self.function.as_ref().ok_or(ToolkitError::NotInitialized)?;
        if let Some(mcp) = &self.mcp {
            return mcp.get_tools();
        }

        let function_name = function.name().to_string();
        if let Some(kit) = function.spec.kit.as_ref().filter(|k| !k.is_empty()) {
            return Ok(kit
                .iter()
                .map(|entry| {
                    ToolHandle::new(
                        entry.name.clone(),
                        entry.description.clone().unwrap_or_default(),
                        build_schema(&entry.parameters),
                        Arc::new(RemoteFunctionBackend {
                            runner: Arc::clone(&self.ctx.runner),
                            function: function_name.clone(),
                            kit_tool: Some(entry.name.clone()),
                        }),
                    )
                })
                .collect());
        }

        Ok(vec![ToolHandle::new(
            function_name.clone(),
            function.spec.description.clone().unwrap_or_default(),
            build_schema(&function.spec.parameters),
            Arc::new(RemoteFunctionBackend {
                runner: Arc::clone(&self.ctx.runner),
                function: function_name,
                kit_tool: None,
            }),
        )])
    }
}

/// POSTs the arguments to the function's run endpoint and returns the raw body
struct RemoteFunctionBackend {
    runner: Arc<dyn ResourceRunner>,
    function: String,
    /// Kit entry name, added to the body as `"name"`
    kit_tool: Option<String>,
}

#[async_trait]
impl ToolBackend for RemoteFunctionBackend {
    async fn call(&self, mut arguments: Value) -> ToolResult<Value> {
        if let (Some(kit_tool), Value::Object(map)) = (&self.kit_tool, &mut arguments) {
            map.insert("name".to_string(), Value::String(kit_tool.clone()));
        }
        let response = self
            .runner
            .run(RunRequest::post(
                ResourceType::Function,
                self.function.clone(),
                arguments,
            ))
            .await?;
        Ok(Value::String(response.body))
    }
}
