//! Tracking-application websocket client.
//!
//! ARCHITECTURE
//! ============
//! One background task owns the socket for the client's whole lifetime:
//! connect → authenticate → subscribe → receive events, and on any
//! connect failure, transport error, or peer close, wait a fixed backoff
//! and start over. Authentication is driven entirely by inbound frames
//! (token response → auth request, auth response → event subscription),
//! so a reconnect replays the full sequence without help from the caller.
//!
//! ERROR HANDLING
//! ==============
//! Malformed frames are caught per message: the frame is logged and the
//! receive loop continues. A rejected authentication clears the shared
//! token so the next connect requests a fresh one. Nothing here
//! terminates the process; the loop only exits on cooperative shutdown.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use super::protocol::{PoseSample, Request, Response};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Shared slot for the cached authentication token. Written by the
/// connection task during the handshake, read by the controller for
/// persistence at shutdown.
pub type TokenSlot = Arc<Mutex<Option<String>>>;

/// Handler invoked for every pose event the tracker delivers.
pub type PoseHandler = Arc<dyn Fn(PoseSample) + Send + Sync>;

#[must_use]
pub fn token_slot(initial: Option<String>) -> TokenSlot {
    Arc::new(Mutex::new(initial))
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("frame parse failed: {0}")]
    Parse(serde_json::Error),
    #[error("frame encode failed: {0}")]
    Encode(serde_json::Error),
    #[error("websocket send failed: {0}")]
    Send(Box<tokio_tungstenite::tungstenite::Error>),
}

// =============================================================================
// CLIENT
// =============================================================================

/// Connection parameters. The reconnect delay is fixed in production and
/// only shortened by tests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub port: u16,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self { port, reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }
}

/// Handle to the background connection task.
pub struct TrackingClient {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TrackingClient {
    /// Spawn the connection task. It runs until [`TrackingClient::shutdown`].
    #[must_use]
    pub fn spawn(config: ClientConfig, token: TokenSlot, on_pose: PoseHandler) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(connection_loop(config, token, on_pose, shutdown_rx));
        Self { shutdown_tx, task }
    }

    /// Signal the connection task to stop and wait a bounded time for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, self.task).await.is_err() {
            warn!("tracking client did not stop within the join timeout");
        }
    }
}

// =============================================================================
// CONNECTION LOOP
// =============================================================================

async fn connection_loop(
    config: ClientConfig,
    token: TokenSlot,
    on_pose: PoseHandler,
    mut shutdown: watch::Receiver<bool>,
) {
    let url = format!("ws://localhost:{}", config.port);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%url, "connected to tracking application");
                run_session(stream, &token, &on_pose, &mut shutdown).await;
            }
            Err(e) => {
                warn!(%url, error = %e, "tracking connection failed");
            }
        }

        if *shutdown.borrow() {
            break;
        }
        // Fixed backoff before the next attempt; a shutdown signal wakes
        // the sleep early and the loop re-checks at the top.
        tokio::select! {
            () = tokio::time::sleep(config.reconnect_delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("tracking client stopped");
}

/// Drive one connected session until close, transport error, or shutdown.
async fn run_session(
    mut stream: WsStream,
    token: &TokenSlot,
    on_pose: &PoseHandler,
    shutdown: &mut watch::Receiver<bool>,
) {
    let cached = read_token(token);
    let opening = match &cached {
        Some(t) => Request::authentication(t),
        None => Request::token_request(),
    };
    if let Err(e) = send_request(&mut stream, &opening).await {
        warn!(error = %e, "tracking handshake send failed");
        return;
    }

    loop {
        tokio::select! {
            msg = stream.next() => {
                let Some(msg) = msg else {
                    warn!("tracking connection closed");
                    return;
                };
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "tracking receive failed");
                        return;
                    }
                };
                match msg {
                    Message::Text(text) => {
                        if let Err(e) = handle_message(&mut stream, token, on_pose, text.as_str()).await {
                            warn!(error = %e, "tracking message handling failed");
                        }
                    }
                    Message::Close(frame) => {
                        warn!(?frame, "tracking connection closed by peer");
                        return;
                    }
                    _ => {}
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = stream.close(None).await;
                    return;
                }
            }
        }
    }
}

/// Process one inbound text frame. Parse and send failures surface as
/// errors; the caller logs them and keeps the session alive.
async fn handle_message(
    stream: &mut WsStream,
    token: &TokenSlot,
    on_pose: &PoseHandler,
    text: &str,
) -> Result<(), ClientError> {
    let response = Response::parse(text).map_err(ClientError::Parse)?;

    match response {
        Response::AuthenticationTokenResponse(data) => {
            info!("authentication token received");
            write_token(token, Some(data.authentication_token.clone()));
            send_request(stream, &Request::authentication(&data.authentication_token)).await?;
        }
        Response::AuthenticationResponse(data) => {
            if data.authenticated {
                info!("authenticated with tracking application");
                send_request(stream, &Request::subscribe_model_moved()).await?;
            } else {
                write_token(token, None);
                error!("tracking authentication rejected; cached token cleared");
            }
        }
        Response::ModelMovedEvent(data) => {
            let handler: &dyn Fn(PoseSample) = on_pose.as_ref();
            handler(data.model_position);
        }
        Response::ApiError(data) => {
            error!(error_id = ?data.error_id, message = ?data.message, "tracking API error");
        }
        Response::Unknown => {
            debug!("ignoring unrecognized tracking message");
        }
    }

    Ok(())
}

async fn send_request(stream: &mut WsStream, request: &Request) -> Result<(), ClientError> {
    debug!(message_type = request.message_type, "sending tracking request");
    let json = request.to_json().map_err(ClientError::Encode)?;
    stream
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::Send(Box::new(e)))
}

fn read_token(token: &TokenSlot) -> Option<String> {
    token.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write_token(token: &TokenSlot, value: Option<String>) {
    *token.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
