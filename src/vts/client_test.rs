use super::*;
use crate::vts::protocol::{MODEL_MOVED_EVENT, PLUGIN_NAME};

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

type ServerStream = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock tracker");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

async fn accept(listener: &TcpListener) -> ServerStream {
    let (socket, _) = timeout(RECV_TIMEOUT, listener.accept())
        .await
        .expect("accept timed out")
        .expect("accept failed");
    accept_async(socket).await.expect("ws handshake failed")
}

async fn recv_request(stream: &mut ServerStream) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, stream.next())
            .await
            .expect("request receive timed out")
            .expect("client closed connection")
            .expect("client transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("client sent invalid JSON");
        }
    }
}

async fn send_response(stream: &mut ServerStream, message_type: &str, data: Value) {
    let frame = json!({
        "apiName": "VTubeStudioPublicAPI",
        "apiVersion": "1.0",
        "requestID": "mock",
        "messageType": message_type,
        "data": data,
    });
    stream
        .send(Message::Text(frame.to_string().into()))
        .await
        .expect("mock tracker send failed");
}

/// Play the token-mint + authentication + subscription sequence,
/// issuing `token` to the client.
async fn serve_fresh_handshake(stream: &mut ServerStream, token: &str) {
    let req = recv_request(stream).await;
    assert_eq!(req["messageType"], "AuthenticationTokenRequest");
    assert_eq!(req["data"]["pluginName"], PLUGIN_NAME);
    send_response(stream, "AuthenticationTokenResponse", json!({"authenticationToken": token})).await;

    let req = recv_request(stream).await;
    assert_eq!(req["messageType"], "AuthenticationRequest");
    assert_eq!(req["data"]["authenticationToken"], token);
    send_response(stream, "AuthenticationResponse", json!({"authenticated": true})).await;

    let req = recv_request(stream).await;
    assert_eq!(req["messageType"], "EventSubscriptionRequest");
    assert_eq!(req["data"]["eventName"], MODEL_MOVED_EVENT);
    assert_eq!(req["data"]["subscribe"], true);
}

fn fast_config(port: u16) -> ClientConfig {
    ClientConfig { port, reconnect_delay: Duration::from_millis(50) }
}

fn pose_channel() -> (PoseHandler, mpsc::Receiver<PoseSample>) {
    let (tx, rx) = mpsc::channel(16);
    let handler: PoseHandler = Arc::new(move |pose| {
        let _ = tx.try_send(pose);
    });
    (handler, rx)
}

#[tokio::test]
async fn full_handshake_subscribes_and_delivers_poses() {
    let (listener, port) = bind().await;
    let token = token_slot(None);
    let (handler, mut poses) = pose_channel();
    let client = TrackingClient::spawn(fast_config(port), Arc::clone(&token), handler);

    let mut server = accept(&listener).await;
    serve_fresh_handshake(&mut server, "tok-1").await;

    send_response(
        &mut server,
        "ModelMovedEvent",
        json!({"modelPosition": {"positionX": 0.5, "positionY": -0.25, "size": 42.0, "rotation": 0.0}}),
    )
    .await;

    let pose = timeout(RECV_TIMEOUT, poses.recv())
        .await
        .expect("pose delivery timed out")
        .expect("pose channel closed");
    assert!((pose.position_x - 0.5).abs() < 1e-12);
    assert!((pose.position_y + 0.25).abs() < 1e-12);
    assert!((pose.size - 42.0).abs() < 1e-12);

    assert_eq!(read_token(&token).as_deref(), Some("tok-1"));

    client.shutdown().await;
}

#[tokio::test]
async fn reconnects_and_reauthenticates_after_close() {
    let (listener, port) = bind().await;
    let token = token_slot(None);
    let (handler, _poses) = pose_channel();
    let client = TrackingClient::spawn(fast_config(port), Arc::clone(&token), handler);

    let mut server = accept(&listener).await;
    serve_fresh_handshake(&mut server, "tok-1").await;
    drop(server);

    // The client must come back by itself and redo the whole sequence,
    // this time opening with the cached token.
    let mut server = accept(&listener).await;
    let req = recv_request(&mut server).await;
    assert_eq!(req["messageType"], "AuthenticationRequest");
    assert_eq!(req["data"]["authenticationToken"], "tok-1");
    send_response(&mut server, "AuthenticationResponse", json!({"authenticated": true})).await;

    let req = recv_request(&mut server).await;
    assert_eq!(req["messageType"], "EventSubscriptionRequest");

    client.shutdown().await;
}

#[tokio::test]
async fn rejected_auth_clears_token_and_forces_fresh_request() {
    let (listener, port) = bind().await;
    let token = token_slot(Some("stale".to_owned()));
    let (handler, _poses) = pose_channel();
    let client = TrackingClient::spawn(fast_config(port), Arc::clone(&token), handler);

    let mut server = accept(&listener).await;
    let req = recv_request(&mut server).await;
    assert_eq!(req["messageType"], "AuthenticationRequest");
    assert_eq!(req["data"]["authenticationToken"], "stale");
    send_response(&mut server, "AuthenticationResponse", json!({"authenticated": false})).await;
    drop(server);

    // Next connect starts from scratch with a token request.
    let mut server = accept(&listener).await;
    let req = recv_request(&mut server).await;
    assert_eq!(req["messageType"], "AuthenticationTokenRequest");
    assert!(read_token(&token).is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_frames_do_not_kill_the_session() {
    let (listener, port) = bind().await;
    let token = token_slot(None);
    let (handler, mut poses) = pose_channel();
    let client = TrackingClient::spawn(fast_config(port), Arc::clone(&token), handler);

    let mut server = accept(&listener).await;
    serve_fresh_handshake(&mut server, "tok-1").await;

    server
        .send(Message::Text("{ definitely not json".into()))
        .await
        .expect("mock tracker send failed");
    send_response(&mut server, "APIError", json!({"errorID": 50, "message": "event subscription hiccup"})).await;
    send_response(
        &mut server,
        "ModelMovedEvent",
        json!({"modelPosition": {"positionX": 0.0, "positionY": 0.0, "size": 10.0}}),
    )
    .await;

    let pose = timeout(RECV_TIMEOUT, poses.recv())
        .await
        .expect("pose delivery timed out")
        .expect("pose channel closed");
    assert!((pose.size - 10.0).abs() < 1e-12);

    client.shutdown().await;
}
