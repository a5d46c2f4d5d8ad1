/// MCP session client
///
/// Request/response correlation over a [`Transport`]. The connection and the
/// `initialize` handshake happen lazily on the first call and are reused
/// afterwards; a dropped session is not reconnected.
use super::transport::{Transport, TransportEvent, WebSocketTransport};
use super::types::*;
use crate::auth::websocket_headers;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = DashMap<RequestId, oneshot::Sender<JsonRpcResponse>>;

/// Tool catalog and invocation on one MCP server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait McpSession: Send + Sync {
    /// Every tool the server exposes, following pagination
    async fn list_tools(&self) -> Result<Vec<McpTool>, McpError>;

    /// Call a tool. A result flagged `isError` becomes `McpError::ToolError`
    /// carrying the serialized content.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError>;

    async fn close(&self) -> Result<(), McpError>;
}

/// Opens sessions; lets toolkits be tested without sockets
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait McpConnector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> Result<Arc<dyn McpSession>, McpError>;
}

pub struct McpClient {
    /// Server URL, used for logging
    url: String,
    /// Sent in the `initialize` request
    client_info: ClientInfo,
    /// Underlying channel; locked per write
    transport: Mutex<Box<dyn Transport>>,
    /// Requests waiting for a response, keyed by JSON-RPC id
    pending: Arc<PendingMap>,
    /// Next request id
    next_id: AtomicI64,
    /// Handshake result; set once per session
    initialized: OnceCell<InitializeResult>,
    /// Set by `close`; a closed session never reconnects
    closed: AtomicBool,
    /// Task routing transport events to pending requests
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

impl McpClient {
    pub fn new(
        url: impl Into<String>,
        transport: Box<dyn Transport>,
        client_info: ClientInfo,
    ) -> Self {
        Self {
            url: url.into(),
            client_info,
            transport: Mutex::new(transport),
            pending: Arc::new(DashMap::new()),
            next_id: AtomicI64::new(1),
            initialized: OnceCell::new(),
            closed: AtomicBool::new(false),
            dispatcher: Mutex::new(None),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Connect and run the handshake now instead of on first use
    pub async fn connect(&self) -> Result<(), McpError> {
        self.ensure_connected().await.map(|_| ())
    }

    /// Handshake result, once connected
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.initialized.get().map(|r| &r.server_info)
    }

    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.initialized.get().map(|r| &r.capabilities)
    }

    async fn ensure_connected(&self) -> Result<&InitializeResult, McpError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpError::NotOpen);
        }
        self.initialized
            .get_or_try_init(|| async {
                match self.handshake().await {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        let _ = self.transport.lock().await.close().await;
                        Err(match e {
                            McpError::Connection(_) => e,
                            other => McpError::Connection(other.to_string()),
                        })
                    }
                }
            })
            .await
    }

    async fn handshake(&self) -> Result<InitializeResult, McpError> {
        info!(target: "mcp_client", server = %self.url, "Connecting to MCP server");
        {
            let mut transport = self.transport.lock().await;
            if let Some(events) = transport.take_events() {
                self.spawn_dispatcher(events).await;
            }
            transport.start().await?;
        }

        let params = InitializeParams {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::tools(),
            client_info: self.client_info.clone(),
        };
        let result = self.request("initialize", Some(json!(params))).await?;
        let result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Invalid initialize result: {}", e)))?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            return Err(McpError::Protocol(format!(
                "Unsupported protocol version: {}",
                result.protocol_version
            )));
        }

        self.notify("notifications/initialized", None).await?;

        info!(
            target: "mcp_client",
            server = %self.url,
            server_name = %result.server_info.name,
            server_version = %result.server_info.version,
            "MCP server connected and initialized"
        );
        Ok(result)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        let message = JsonRpcRequest::new(id.clone(), method, params).into();
        if let Err(e) = self.transport.lock().await.send(&message).await {
            self.pending.remove(&id);
            return Err(e);
        }

        let response = match timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(McpError::Transport(
                    "Connection closed before response".to_string(),
                ))
            }
            Err(_) => {
                self.pending.remove(&id);
                warn!(target: "mcp_client", server = %self.url, method = %method, "Request timeout");
                return Err(McpError::Timeout);
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::ServerError {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| McpError::Protocol("Missing result in response".to_string()))
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let message = JsonRpcNotification::new(method, params).into();
        self.transport.lock().await.send(&message).await
    }

    async fn spawn_dispatcher(&self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        let pending = Arc::clone(&self.pending);
        let url = self.url.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::Message(JsonRpcMessage::Response(response)) => {
                        let Some(id) = response.id.clone() else {
                            warn!(target: "mcp_client", server = %url, "Response without id");
                            continue;
                        };
                        match pending.remove(&id) {
                            Some((_, tx)) => {
                                let _ = tx.send(response);
                            }
                            None => {
                                warn!(target: "mcp_client", server = %url, id = %id, "Received response for unknown request");
                            }
                        }
                    }
                    TransportEvent::Message(other) => {
                        debug!(target: "mcp_client", server = %url, message = ?other, "Ignoring server message");
                    }
                    TransportEvent::Error(e) => {
                        debug!(target: "mcp_client", server = %url, error = %e, "Transport error");
                    }
                    TransportEvent::Closed => {
                        debug!(target: "mcp_client", server = %url, "Transport closed");
                        // Dropping the senders fails every waiting request
                        pending.clear();
                    }
                }
            }
        });
        *self.dispatcher.lock().await = Some(handle);
    }
}

#[async_trait]
impl McpSession for McpClient {
    async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        self.ensure_connected().await?;
        debug!(target: "mcp_client", server = %self.url, "Listing tools");

        let mut all_tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = ListToolsParams { cursor };
            let result = self.request("tools/list", Some(json!(params))).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("Invalid tools/list result: {}", e)))?;

            all_tools.extend(page.tools);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(target: "mcp_client", server = %self.url, count = all_tools.len(), "Listed tools");
        Ok(all_tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        self.ensure_connected().await?;
        debug!(target: "mcp_client", server = %self.url, tool = %name, "Calling tool");

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self.request("tools/call", Some(json!(params))).await?;
        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Invalid tools/call result: {}", e)))?;

        if result.is_error {
            debug!(target: "mcp_client", server = %self.url, tool = %name, "Tool returned error");
            return Err(McpError::ToolError(serde_json::to_string(&result.content)?));
        }
        Ok(result)
    }

    async fn close(&self) -> Result<(), McpError> {
        self.closed.store(true, Ordering::SeqCst);
        self.transport.lock().await.close().await?;
        if let Some(dispatcher) = self.dispatcher.lock().await.take() {
            dispatcher.abort();
        }
        self.pending.clear();
        Ok(())
    }
}

/// Opens WebSocket sessions and completes the handshake eagerly, so a
/// connection failure surfaces from `connect`.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    /// Advertised in every handshake
    client_info: ClientInfo,
    /// Applied to each transport this connector creates
    retry: RetryPolicy,
}

impl WebSocketConnector {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_info: ClientInfo {
                name: client_name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            retry: RetryPolicy::transport(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl McpConnector for WebSocketConnector {
    async fn connect(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> Result<Arc<dyn McpSession>, McpError> {
        let transport =
            WebSocketTransport::new(url, websocket_headers(&headers)).with_retry(self.retry);
        let client = McpClient::new(url, Box::new(transport), self.client_info.clone());
        client.connect().await?;
        Ok(Arc::new(client))
    }
}
