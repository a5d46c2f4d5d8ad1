/// Run client
///
/// Calls deployed resources through the public run endpoint:
/// `{run_url}/{workspace}/{type}s/{name}[/{path}]`.
use crate::auth::AuthProvider;
use crate::settings::Settings;
use crate::tools::{ToolError, ToolResult};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Function,
    Agent,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Function => write!(f, "function"),
            ResourceType::Agent => write!(f, "agent"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub method: Method,
    pub json: Option<Value>,
    pub path: Option<String>,
    pub headers: HashMap<String, String>,
    pub params: HashMap<String, String>,
}

impl RunRequest {
    pub fn post(
        resource_type: ResourceType,
        resource_name: impl Into<String>,
        json: Value,
    ) -> Self {
        Self {
            resource_type,
            resource_name: resource_name.into(),
            method: Method::POST,
            json: Some(json),
            path: None,
            headers: HashMap::new(),
            params: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResponse {
    pub status: u16,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceRunner: Send + Sync {
    /// Status >= 400 is returned as `ToolError::Http`
    async fn run(&self, request: RunRequest) -> ToolResult<RunResponse>;
}

pub struct RunClient {
    http: reqwest::Client,
    settings: Arc<Settings>,
    auth: Arc<dyn AuthProvider>,
}

impl RunClient {
    pub fn new(settings: Arc<Settings>, auth: Arc<dyn AuthProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            settings,
            auth,
        }
    }

    pub fn url_for(&self, request: &RunRequest) -> String {
        let mut url = format!(
            "{}/{}/{}s/{}",
            self.settings.run_url.trim_end_matches('/'),
            self.settings.workspace,
            request.resource_type,
            request.resource_name
        );
        if let Some(path) = request.path.as_deref().filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(path.trim_start_matches('/'));
        }
        url
    }
}

#[async_trait]
impl ResourceRunner for RunClient {
    async fn run(&self, request: RunRequest) -> ToolResult<RunResponse> {
        let url = self.url_for(&request);
        debug!(target: "run", method = %request.method, url = %url, "Running resource");

        let mut builder = self.http.request(request.method.clone(), &url);
        let auth = self
            .auth
            .headers()
            .await
            .map_err(|e| ToolError::Internal(e.to_string()))?;
        for (k, v) in auth.iter().chain(request.headers.iter()) {
            builder = builder.header(k, v);
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        if status >= 400 {
            warn!(target: "run", url = %url, status, "Resource call failed");
            return Err(ToolError::Http { status, body });
        }
        Ok(RunResponse { status, body })
    }
}
