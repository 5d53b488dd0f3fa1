//! Tests for WebSocketTransport integration

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jr_protocol::{IqType, Packet, Payload, RecordingIq, Status};
use jr_runtime::{Connection, WebSocketTransport};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn websocket_transport_echo_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut ws_tx, mut ws_rx) = ws.split();

        let incoming = ws_rx.next().await.unwrap().unwrap();
        assert_eq!(incoming, Message::Text("{\"ping\":true}".into()));

        ws_tx
            .send(Message::Text("{\"pong\":true}".into()))
            .await
            .unwrap();
    });

    let url = format!("ws://{}", addr);
    let (transport, message_rx) = WebSocketTransport::connect(&url).await.unwrap();
    let parts = transport.into_transport_parts(message_rx);

    let mut sender = parts.sender;
    let receiver = parts.receiver;
    let mut rx = parts.message_rx;

    let recv_task = tokio::spawn(async move { receiver.run().await });

    sender.send(json!({ "ping": true })).await.unwrap();

    let reply = rx.recv().await.expect("should receive reply");
    assert_eq!(reply["pong"], true);

    // Receiver may exit with an error after the server finishes; that's OK.
    recv_task.abort();
    let _ = recv_task.await;
    server.await.unwrap();
}

#[tokio::test]
async fn websocket_request_is_correlated_over_the_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Minimal recording service: answers START with INITIATING.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let frame = ws.next().await.unwrap().unwrap();
        let request: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(request["action"], "START");

        let reply = json!({
            "id": request["id"],
            "type": "result",
            "kind": "recording",
            "action": "START",
            "sessionId": "abc",
            "status": "INITIATING"
        });
        ws.send(Message::Text(reply.to_string().into())).await.unwrap();
        let _ = ws.close(None).await;
    });

    let url = format!("ws://{}", addr);
    let (transport, message_rx) = WebSocketTransport::connect(&url).await.unwrap();
    let connection = Arc::new(Connection::new(transport.into_transport_parts(message_rx)));
    let conn = Arc::clone(&connection);
    tokio::spawn(async move { conn.run().await });

    let packet = Packet::set(
        "focus@example.com",
        "recorder.example.com",
        Payload::Recording(RecordingIq::start("room@muc", Some("/rec"))),
    );
    let reply = connection.request(packet, Duration::from_secs(5)).await.unwrap();

    assert_eq!(reply.iq_type, IqType::Result);
    let iq = reply.recording().unwrap();
    assert_eq!(iq.status, Status::Initiating);
    assert_eq!(iq.session_id.as_deref(), Some("abc"));

    server.await.unwrap();
}
