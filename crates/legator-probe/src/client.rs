use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use legator_core::{Envelope, MessageType, ProbeId};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

use crate::backoff::ReconnectState;
use crate::config::ProbeClientConfig;
use crate::error::ProbeError;

const WRITE_DEADLINE: Duration = Duration::from_secs(10);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const READ_DEADLINE: Duration = Duration::from_secs(70);
const DEFAULT_INBOX_CAPACITY: usize = 64;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Connection lifecycle, per spec.md §4.1: `Disconnected -> Dialing ->
/// Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Dialing,
    Connected,
}

enum DialFailure {
    AuthRejection,
    Transient(String),
}

enum ConnectionExit {
    Closed,
    ReadTimeout,
    TransportError(String),
    Cancelled(Option<String>),
}

/// Maintains exactly one authenticated WebSocket to the control plane,
/// reconnecting with backoff on every disconnect. Follows the same
/// split-sink/shared-mutex shape as `O2WebSocket` (retrieval-pack
/// `websocket.rs`): a single `Arc<Mutex<Option<WsSink>>>` is written by the
/// dial loop and read by both the public `send` and the heartbeat/pong
/// replies, so callers never touch the socket directly.
pub struct ProbeClient {
    config: ProbeClientConfig,
    api_key: StdMutex<String>,
    sink: AsyncMutex<Option<WsSink>>,
    inbox_tx: tokio::sync::mpsc::Sender<Envelope>,
    inbox_rx: StdMutex<Option<tokio::sync::mpsc::Receiver<Envelope>>>,
    state: watch::Sender<ConnectionState>,
}

impl ProbeClient {
    #[must_use]
    pub fn new(config: ProbeClientConfig) -> Arc<Self> {
        let capacity = if config.inbox_capacity == 0 {
            DEFAULT_INBOX_CAPACITY
        } else {
            config.inbox_capacity
        };
        let (inbox_tx, inbox_rx) = tokio::sync::mpsc::channel(capacity);
        let api_key = StdMutex::new(config.api_key.clone());
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            config,
            api_key,
            sink: AsyncMutex::new(None),
            inbox_tx,
            inbox_rx: StdMutex::new(Some(inbox_rx)),
            state: state_tx,
        })
    }

    /// Takes ownership of the inbound envelope queue. Panics if called more
    /// than once — there is exactly one consumer per client instance.
    pub fn inbox(&self) -> tokio::sync::mpsc::Receiver<Envelope> {
        self.inbox_rx
            .lock()
            .expect("inbox lock poisoned")
            .take()
            .expect("inbox already taken")
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Rotates the credential used for future reconnects. Does not affect
    /// an already-established connection.
    pub fn set_api_key(&self, new_key: impl Into<String>) {
        *self.api_key.lock().expect("api key lock poisoned") = new_key.into();
    }

    /// Serializes and writes `payload` under `message_type` with a 10 s
    /// write deadline. Fails with `NotConnected` if no socket is open.
    pub async fn send(&self, message_type: MessageType, payload: serde_json::Value) -> Result<(), ProbeError> {
        let envelope = Envelope::new(message_type, payload);
        let text = serde_json::to_string(&envelope)?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(ProbeError::NotConnected)?;
        tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(text)))
            .await
            .map_err(|_| ProbeError::WriteTimeout)?
            .map_err(|e| ProbeError::Transport(e.to_string()))
    }

    /// Blocks until `cancellation` fires, dialing and redialing with
    /// backoff on every disconnect. Returns the cancellation cause (the
    /// value sent on the watch channel, or an empty string if cancelled
    /// with `None`).
    #[instrument(skip(self, cancellation), fields(probe_id = %self.config.probe_id))]
    pub async fn run(self: Arc<Self>, mut cancellation: watch::Receiver<Option<String>>) -> String {
        let mut backoff = ReconnectState::new();

        loop {
            if cancellation.has_changed().unwrap_or(false) {
                return cancellation.borrow_and_update().clone().unwrap_or_default();
            }

            self.set_state(ConnectionState::Dialing);
            let dial_result = tokio::select! {
                r = self.dial() => r,
                _ = cancellation.changed() => return cancellation.borrow().clone().unwrap_or_default(),
            };

            match dial_result {
                Ok((sink, read)) => {
                    backoff.reset();
                    *self.sink.lock().await = Some(sink);
                    self.set_state(ConnectionState::Connected);
                    info!("probe connected to control plane");

                    let exit = self.connected_phase(read, cancellation.clone()).await;
                    *self.sink.lock().await = None;
                    self.set_state(ConnectionState::Disconnected);

                    match exit {
                        ConnectionExit::Cancelled(reason) => return reason.unwrap_or_default(),
                        ConnectionExit::Closed => debug!("connection closed by peer"),
                        ConnectionExit::ReadTimeout => warn!("no frame within read deadline; reconnecting"),
                        ConnectionExit::TransportError(e) => warn!(error = %e, "transport error; reconnecting"),
                    }
                }
                Err(DialFailure::AuthRejection) => {
                    self.set_state(ConnectionState::Disconnected);
                    let delay = backoff.auth_rejection_delay();
                    warn!(delay_ms = delay.as_millis(), "handshake rejected (401/403); waiting for credential rotation");
                    if let Some(reason) = sleep_or_cancel(delay, &mut cancellation).await {
                        return reason;
                    }
                }
                Err(DialFailure::Transient(reason)) => {
                    self.set_state(ConnectionState::Disconnected);
                    let delay = backoff.next_transient_delay();
                    warn!(error = %reason, delay_ms = delay.as_millis(), "dial failed; backing off");
                    if let Some(reason) = sleep_or_cancel(delay, &mut cancellation).await {
                        return reason;
                    }
                }
            }
        }
    }

    fn set_state(&self, new_state: ConnectionState) {
        let _ = self.state.send(new_state);
    }

    async fn dial(&self) -> Result<(WsSink, WsRead), DialFailure> {
        let url = self.config.ws_url();
        let api_key = self.api_key.lock().expect("api key lock poisoned").clone();

        let mut request = url
            .into_client_request()
            .map_err(|e| DialFailure::Transient(e.to_string()))?;
        let header = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| DialFailure::Transient(e.to_string()))?;
        request.headers_mut().insert("Authorization", header);

        match tokio_tungstenite::connect_async(request).await {
            Ok((stream, _response)) => {
                let (sink, read) = stream.split();
                Ok((sink, read))
            }
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                let status = response.status();
                if status.as_u16() == 401 || status.as_u16() == 403 {
                    Err(DialFailure::AuthRejection)
                } else {
                    Err(DialFailure::Transient(format!("handshake rejected: {status}")))
                }
            }
            Err(e) => Err(DialFailure::Transient(e.to_string())),
        }
    }

    async fn connected_phase(&self, mut read: WsRead, mut cancellation: watch::Receiver<Option<String>>) -> ConnectionExit {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick fires immediately; skip it
        let deadline = tokio::time::sleep(READ_DEADLINE);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if self.send_heartbeat().await.is_err() {
                        return ConnectionExit::TransportError("heartbeat send failed".into());
                    }
                }
                () = &mut deadline => {
                    return ConnectionExit::ReadTimeout;
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            deadline.as_mut().reset(Instant::now() + READ_DEADLINE);
                            self.deliver_inbound(&text);
                        }
                        Some(Ok(Message::Pong(_))) => {
                            deadline.as_mut().reset(Instant::now() + READ_DEADLINE);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            deadline.as_mut().reset(Instant::now() + READ_DEADLINE);
                            self.reply_pong(data).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return ConnectionExit::Closed;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return ConnectionExit::TransportError(e.to_string());
                        }
                    }
                }
                _ = cancellation.changed() => {
                    return ConnectionExit::Cancelled(cancellation.borrow().clone());
                }
            }
        }
    }

    fn deliver_inbound(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => {
                if self.inbox_tx.try_send(envelope).is_err() {
                    warn!("inbox full; dropping inbound envelope");
                }
            }
            Err(e) => warn!(error = %e, "malformed envelope frame; skipping"),
        }
    }

    async fn reply_pong(&self, data: Vec<u8>) {
        let mut guard = self.sink.lock().await;
        if let Some(sink) = guard.as_mut() {
            let _ = tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Pong(data))).await;
        }
    }

    async fn send_heartbeat(&self) -> Result<(), ProbeError> {
        {
            let mut guard = self.sink.lock().await;
            let sink = guard.as_mut().ok_or(ProbeError::NotConnected)?;
            tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Ping(Vec::new())))
                .await
                .map_err(|_| ProbeError::WriteTimeout)?
                .map_err(|e| ProbeError::Transport(e.to_string()))?;
        }
        self.send(
            MessageType::Heartbeat,
            serde_json::json!({ "probe_id": self.probe_id().as_str() }),
        )
        .await
    }

    #[must_use]
    pub fn probe_id(&self) -> &ProbeId {
        &self.config.probe_id
    }
}

async fn sleep_or_cancel(delay: Duration, cancellation: &mut watch::Receiver<Option<String>>) -> Option<String> {
    tokio::select! {
        () = tokio::time::sleep(delay) => None,
        _ = cancellation.changed() => Some(cancellation.borrow().clone().unwrap_or_default()),
    }
}
