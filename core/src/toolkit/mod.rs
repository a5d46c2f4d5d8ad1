/// Toolkits
///
/// Each toolkit resolves a set of tool handles from one source. `initialize`
/// does the network work and is cached; `get_tools` is pure and fails
/// before `initialize`.
pub mod chain;
pub mod local;
pub mod remote;

pub use chain::ChainToolkit;
pub use local::{LocalEndpoint, LocalToolkit};
pub use remote::RemoteToolkit;

use crate::auth::{self, AuthProvider};
use crate::control_plane::{ControlPlane, HttpControlPlane};
use crate::mcp::{McpConnector, McpToolkit, WebSocketConnector};
use crate::run::{ResourceRunner, RunClient};
use crate::settings::Settings;
use crate::tools::ToolHandle;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Name used in logs
    fn label(&self) -> String;

    async fn initialize(&mut self) -> Result<()>;

    fn get_tools(&self) -> Result<Vec<ToolHandle>>;
}

/// Closed set of toolkit variants
pub enum AnyToolkit {
    Remote(RemoteToolkit),
    Local(LocalToolkit),
    Chain(ChainToolkit),
    Mcp(McpToolkit),
}

#[async_trait]
impl Toolkit for AnyToolkit {
    fn label(&self) -> String {
        match self {
            AnyToolkit::Remote(t) => t.label(),
            AnyToolkit::Local(t) => t.label(),
            AnyToolkit::Chain(t) => t.label(),
            AnyToolkit::Mcp(t) => t.label(),
        }
    }

    async fn initialize(&mut self) -> Result<()> {
        match self {
            AnyToolkit::Remote(t) => t.initialize().await,
            AnyToolkit::Local(t) => t.initialize().await,
            AnyToolkit::Chain(t) => t.initialize().await,
            AnyToolkit::Mcp(t) => Toolkit::initialize(t).await,
        }
    }

    fn get_tools(&self) -> Result<Vec<ToolHandle>> {
        match self {
            AnyToolkit::Remote(t) => t.get_tools(),
            AnyToolkit::Local(t) => t.get_tools(),
            AnyToolkit::Chain(t) => t.get_tools(),
            AnyToolkit::Mcp(t) => Toolkit::get_tools(t),
        }
    }
}

#[async_trait]
impl Toolkit for McpToolkit {
    fn label(&self) -> String {
        "mcp".to_string()
    }

    async fn initialize(&mut self) -> Result<()> {
        McpToolkit::initialize(self).await
    }

    fn get_tools(&self) -> Result<Vec<ToolHandle>> {
        McpToolkit::get_tools(self)
    }
}

/// Collaborators shared read-only by every toolkit
#[derive(Clone)]
pub struct ToolkitContext {
    pub settings: Arc<Settings>,
    pub auth: Arc<dyn AuthProvider>,
    pub control_plane: Arc<dyn ControlPlane>,
    pub runner: Arc<dyn ResourceRunner>,
    pub connector: Arc<dyn McpConnector>,
}

impl ToolkitContext {
    /// HTTP control plane, run client and WebSocket connector built from settings
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let auth = auth::from_settings(&settings);
        Self {
            control_plane: Arc::new(HttpControlPlane::new(
                settings.base_url.clone(),
                Arc::clone(&auth),
            )),
            runner: Arc::new(RunClient::new(Arc::clone(&settings), Arc::clone(&auth))),
            connector: Arc::new(WebSocketConnector::new(settings.name.clone())),
            auth,
            settings,
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_control_plane(mut self, control_plane: Arc<dyn ControlPlane>) -> Self {
        self.control_plane = control_plane;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ResourceRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn McpConnector>) -> Self {
        self.connector = connector;
        self
    }
}
