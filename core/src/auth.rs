/// Authentication header providers
///
/// Every control-plane request, direct function call and MCP WebSocket
/// upgrade carries the headers produced here.
use crate::settings::Settings;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub const AUTHORIZATION_HEADER: &str = "X-Blaxel-Authorization";
pub const WORKSPACE_HEADER: &str = "X-Blaxel-Workspace";

/// Source of authentication headers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn headers(&self) -> Result<HashMap<String, String>>;
}

/// Static API key
pub struct ApiKeyAuth {
    api_key: String,
    workspace: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn headers(&self) -> Result<HashMap<String, String>> {
        Ok(bearer_headers(&self.api_key, &self.workspace))
    }
}

/// Access token obtained out of band (device flow, client credentials)
pub struct BearerTokenAuth {
    token: String,
    workspace: String,
}

impl BearerTokenAuth {
    pub fn new(token: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for BearerTokenAuth {
    async fn headers(&self) -> Result<HashMap<String, String>> {
        Ok(bearer_headers(&self.token, &self.workspace))
    }
}

/// No credentials
pub struct PublicAuth;

#[async_trait]
impl AuthProvider for PublicAuth {
    async fn headers(&self) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

fn bearer_headers(token: &str, workspace: &str) -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert(AUTHORIZATION_HEADER.to_string(), format!("Bearer {}", token));
    h.insert(WORKSPACE_HEADER.to_string(), workspace.to_string());
    h
}

/// Pick a provider from settings: API key, then access token, then public
pub fn from_settings(settings: &Settings) -> Arc<dyn AuthProvider> {
    if let Some(key) = &settings.api_key {
        Arc::new(ApiKeyAuth::new(key.clone(), settings.workspace.clone()))
    } else if let Some(token) = &settings.access_token {
        Arc::new(BearerTokenAuth::new(token.clone(), settings.workspace.clone()))
    } else {
        Arc::new(PublicAuth)
    }
}

/// Headers sent on the MCP WebSocket upgrade. Missing values become empty strings.
pub fn websocket_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    let lookup = |wanted: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(wanted))
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    let mut h = HashMap::new();
    h.insert(
        AUTHORIZATION_HEADER.to_lowercase(),
        lookup(AUTHORIZATION_HEADER),
    );
    h.insert(WORKSPACE_HEADER.to_lowercase(), lookup(WORKSPACE_HEADER));
    h
}
