//! Shared test fixtures
//!
//! `FakeMcpServer` is a real WebSocket MCP server on a random local port. It
//! answers `initialize`, `tools/list` (paginated) and `tools/call` for an
//! `echo` tool and a `fail` tool, and records upgrade headers and methods.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

#[derive(Clone, Default)]
pub struct FakeOptions {
    /// Tools per `tools/list` page
    pub page_size: usize,
    /// Send an unparseable frame before every response
    pub garbage_before_response: bool,
}

pub struct FakeMcpServer {
    pub addr: String,
    pub headers: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub methods: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeMcpServer {
    pub async fn start() -> Self {
        Self::start_with(FakeOptions {
            page_size: 2,
            garbage_before_response: false,
        })
        .await
    }

    pub async fn start_with(options: FakeOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let headers = Arc::new(Mutex::new(Vec::new()));
        let methods = Arc::new(Mutex::new(Vec::new()));

        let (h, m) = (headers.clone(), methods.clone());
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, options.clone(), h.clone(), m.clone()));
            }
        });

        Self {
            addr,
            headers,
            methods,
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }

    pub fn last_headers(&self) -> HashMap<String, String> {
        self.headers.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Drop for FakeMcpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn tools() -> Vec<Value> {
    vec![
        json!({
            "name": "echo",
            "description": "Echo a message",
            "inputSchema": {
                "type": "object",
                "properties": {"msg": {"type": "string", "required": true}}
            }
        }),
        json!({
            "name": "fail",
            "description": "Always fails",
            "inputSchema": {"type": "object", "properties": {}}
        }),
        json!({
            "name": "add",
            "description": "Add two numbers",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": {"type": "number", "required": true},
                    "b": {"type": "number", "required": true}
                }
            }
        }),
    ]
}

async fn serve(
    stream: TcpStream,
    options: FakeOptions,
    headers: Arc<Mutex<Vec<HashMap<String, String>>>>,
    methods: Arc<Mutex<Vec<String>>>,
) {
    let capture = headers.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let map = req
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        capture.lock().unwrap().push(map);
        Ok(resp)
    };
    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };

    while let Some(Ok(frame)) = ws.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let method = request["method"].as_str().unwrap_or_default().to_string();
        methods.lock().unwrap().push(method.clone());

        let Some(id) = request.get("id").cloned() else {
            continue;
        };
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        let reply = match method.as_str() {
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": "fake-mcp", "version": "1.0.0"}
                }
            }),
            "tools/list" => {
                let all = tools();
                let page = options.page_size.max(1);
                let start: usize = params["cursor"]
                    .as_str()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(0);
                let end = (start + page).min(all.len());
                let mut result = json!({"tools": all[start..end].to_vec()});
                if end < all.len() {
                    result["nextCursor"] = json!(end.to_string());
                }
                json!({"jsonrpc": "2.0", "id": id, "result": result})
            }
            "tools/call" => {
                let args = &params["arguments"];
                match params["name"].as_str() {
                    Some("echo") => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {"content": [{"type": "text", "text": args["msg"]}]}
                    }),
                    Some("add") => {
                        let sum =
                            args["a"].as_f64().unwrap_or(0.0) + args["b"].as_f64().unwrap_or(0.0);
                        json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": {"content": [{"type": "text", "text": sum.to_string()}]}
                        })
                    }
                    Some("fail") => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {"content": [{"type": "text", "text": "boom"}], "isError": true}
                    }),
                    _ => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32601, "message": "Unknown tool"}
                    }),
                }
            }
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "Method not found"}
            }),
        };

        if options.garbage_before_response {
            let _ = ws.send(Message::Text("this is not json".to_string())).await;
        }
        if ws.send(Message::Text(reply.to_string())).await.is_err() {
            break;
        }
    }
}

/// Listener that accepts TCP connections and drops them before the
/// WebSocket handshake. Returns its address and an accept counter.
pub async fn refusing_listener() -> (String, Arc<Mutex<usize>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let accepted = Arc::new(Mutex::new(0usize));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            *counter.lock().unwrap() += 1;
            drop(stream);
        }
    });
    (addr, accepted)
}

/// Server that completes the handshake and immediately closes the socket
pub async fn closing_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                let _ = ws.close(None).await;
            }
        }
    });
    addr
}
