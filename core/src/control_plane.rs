/// Control-plane access
///
/// Only the three reads the toolkits need: fetch one function, list
/// functions, list agents. `HttpControlPlane` talks to the REST API;
/// tests substitute the trait.
use crate::auth::AuthProvider;
use crate::{Result, ToolkitError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Parameter declaration as stored on a function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreFunctionParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl StoreFunctionParameter {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// One tool exposed by a function kit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionKit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<StoreFunctionParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<StoreFunctionParameter>,
    /// Presence routes the function through MCP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_connections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kit: Option<Vec<FunctionKit>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: FunctionSpec,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>, spec: FunctionSpec) -> Self {
        Self {
            metadata: Metadata {
                name: Some(name.into()),
                display_name: None,
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// `integrationConnections` present, even if empty
    pub fn has_integration_connections(&self) -> bool {
        self.spec.integration_connections.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<AgentSpec>,
}

impl AgentRecord {
    pub fn new(name: impl Into<String>, spec: AgentSpec) -> Self {
        Self {
            metadata: Metadata {
                name: Some(name.into()),
                display_name: None,
            },
            spec: Some(spec),
        }
    }
}

/// Agent-to-agent composition entry configured by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentChain {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl AgentChain {
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            ..Default::default()
        }
    }
}

/// Outcome of a single-function lookup
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionLookup {
    Found(FunctionRecord),
    /// The control plane answered with an HTTP status >= 400
    Missing { status: u16 },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn get_function(&self, name: &str) -> Result<FunctionLookup>;
    async fn list_functions(&self) -> Result<Vec<FunctionRecord>>;
    async fn list_agents(&self) -> Result<Vec<AgentRecord>>;
}

/// REST client for the control plane
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<dyn AuthProvider>,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AuthProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(target: "control_plane", url = %url, "GET");
        let mut request = self.http.get(&url);
        for (k, v) in self.auth.headers().await? {
            request = request.header(k, v);
        }
        Ok(request.send().await?)
    }

    async fn get_list<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response = self.get(path).await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "control_plane", path = %path, status = %status, "List request failed");
            return Err(ToolkitError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn get_function(&self, name: &str) -> Result<FunctionLookup> {
        let response = self.get(&format!("functions/{}", name)).await?;
        let status = response.status().as_u16();
        if status >= 400 {
            debug!(target: "control_plane", function = %name, status, "Function lookup failed");
            return Ok(FunctionLookup::Missing { status });
        }
        Ok(FunctionLookup::Found(response.json().await?))
    }

    async fn list_functions(&self) -> Result<Vec<FunctionRecord>> {
        self.get_list("functions").await
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        self.get_list("agents").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_record_deserialization() {
        let record: FunctionRecord = serde_json::from_value(json!({
            "metadata": {"name": "github", "displayName": "GitHub"},
            "spec": {
                "description": "GitHub tools",
                "parameters": [{"name": "q", "type": "string", "required": true}],
                "integrationConnections": ["github-conn"]
            }
        }))
        .unwrap();

        assert_eq!(record.name(), "github");
        assert!(record.has_integration_connections());
        assert_eq!(record.spec.parameters[0].kind.as_deref(), Some("string"));
        assert_eq!(record.spec.parameters[0].required, Some(true));
    }

    #[test]
    fn plain_function_has_no_integration() {
        let record: FunctionRecord =
            serde_json::from_value(json!({"metadata": {"name": "math"}, "spec": {}})).unwrap();
        assert!(!record.has_integration_connections());
        assert!(record.spec.kit.is_none());
    }

    #[test]
    fn chain_entries_default_to_disabled() {
        let chain: AgentChain = serde_json::from_value(json!({"name": "writer"})).unwrap();
        assert!(!chain.enabled);
        assert!(AgentChain::enabled("writer").enabled);
    }
}
