/// WebSocket JSON-RPC transport
///
/// One socket per transport. Connect and write are retried with a fixed
/// delay; inbound frames are parsed and delivered as [`TransportEvent`]s on
/// an unbounded channel that the owner takes once.
use super::types::{JsonRpcMessage, McpError};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(JsonRpcMessage),
    /// A frame was dropped or the socket failed; the connection may continue
    Error(String),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection. Fails with `AlreadyStarted` if a socket exists.
    async fn start(&mut self) -> Result<(), McpError>;

    /// Write one message, starting the connection first if none exists
    async fn send(&mut self, message: &JsonRpcMessage) -> Result<(), McpError>;

    /// Close the socket. Safe to call repeatedly.
    async fn close(&mut self) -> Result<(), McpError>;

    /// Inbound event stream; `None` once taken
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransportEvent>>;

    fn state(&self) -> ConnectionState;
}

pub struct WebSocketTransport {
    url: String,
    headers: HashMap<String, String>,
    retry: RetryPolicy,
    sink: Option<SplitSink<WsStream, Message>>,
    reader: Option<JoinHandle<()>>,
    state: Arc<watch::Sender<ConnectionState>>,
    closed_emitted: Arc<AtomicBool>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
}

impl WebSocketTransport {
    /// `http(s)://` URLs are rewritten to `ws(s)://`
    pub fn new(url: &str, headers: HashMap<String, String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            url: websocket_url(url),
            headers,
            retry: RetryPolicy::transport(),
            sink: None,
            reader: None,
            state: Arc::new(state),
            closed_emitted: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connect_once(&self) -> Result<WsStream, McpError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| McpError::Transport(e.to_string()))?;
        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| McpError::Transport(format!("Invalid header {}: {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::Transport(format!("Invalid header {}: {}", key, e)))?;
            request.headers_mut().insert(name, value);
        }

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(stream)
    }

    fn spawn_reader(&mut self, mut stream: SplitStream<WsStream>) {
        let events = self.events_tx.clone();
        let state = Arc::clone(&self.state);
        let closed_emitted = Arc::clone(&self.closed_emitted);
        let url = self.url.clone();

        self.reader = Some(tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(target: "ws_transport", server = %url, error = %e, "Dropping non UTF-8 frame");
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            continue;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        error!(target: "ws_transport", server = %url, error = %e, "WebSocket read failed");
                        state.send_replace(ConnectionState::Errored);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                };

                match JsonRpcMessage::parse(&text) {
                    Ok(message) => {
                        let _ = events.send(TransportEvent::Message(message));
                    }
                    Err(e) => {
                        warn!(target: "ws_transport", server = %url, error = %e, "Dropping malformed frame");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                    }
                }
            }

            if *state.borrow() != ConnectionState::Errored {
                state.send_replace(ConnectionState::Closed);
            }
            if !closed_emitted.swap(true, Ordering::SeqCst) {
                let _ = events.send(TransportEvent::Closed);
            }
            debug!(target: "ws_transport", server = %url, "Reader exited");
        }));
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn start(&mut self) -> Result<(), McpError> {
        if self.sink.is_some() {
            return Err(McpError::AlreadyStarted);
        }

        let attempts = self.retry.attempts();
        let mut last_error = None;
        for attempt in 1..=attempts {
            self.state.send_replace(ConnectionState::Connecting);
            match self.connect_once().await {
                Ok(stream) => {
                    let (sink, stream) = stream.split();
                    self.sink = Some(sink);
                    self.closed_emitted.store(false, Ordering::SeqCst);
                    self.state.send_replace(ConnectionState::Open);
                    self.spawn_reader(stream);
                    info!(target: "ws_transport", server = %self.url, attempt, "WebSocket connected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(target: "ws_transport", server = %self.url, attempt, error = %e, "WebSocket connection failed");
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        self.state.send_replace(ConnectionState::Errored);
        let error = last_error.unwrap_or_else(|| McpError::Transport("connection failed".into()));
        let _ = self.events_tx.send(TransportEvent::Error(error.to_string()));
        Err(error)
    }

    async fn send(&mut self, message: &JsonRpcMessage) -> Result<(), McpError> {
        if self.sink.is_none() {
            self.start().await?;
        } else if self.state() != ConnectionState::Open {
            return Err(McpError::NotOpen);
        }

        let text = message.to_text()?;
        let sink = self.sink.as_mut().ok_or(McpError::NotOpen)?;
        write_with_retry(sink, &text, self.retry, &self.url).await
    }

    async fn close(&mut self) -> Result<(), McpError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        debug!(target: "ws_transport", server = %self.url, "Closing WebSocket");
        if let Err(e) = sink.close().await {
            debug!(target: "ws_transport", server = %self.url, error = %e, "Close handshake failed");
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state.send_replace(ConnectionState::Closed);
        if !self.closed_emitted.swap(true, Ordering::SeqCst) {
            let _ = self.events_tx.send(TransportEvent::Closed);
        }
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx.take()
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Write one text frame, retrying failed writes per `retry`
async fn write_with_retry<S>(
    sink: &mut S,
    text: &str,
    retry: RetryPolicy,
    url: &str,
) -> Result<(), McpError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let attempts = retry.attempts();
    let mut last_error = None;
    for attempt in 1..=attempts {
        match sink.send(Message::Text(text.to_string())).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(target: "ws_transport", server = %url, attempt, error = %e, "WebSocket send failed");
                last_error = Some(e.to_string());
                if attempt < attempts {
                    tokio::time::sleep(retry.delay).await;
                }
            }
        }
    }
    Err(McpError::Transport(last_error.unwrap_or_default()))
}

fn websocket_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}
