//! End-to-end WebSocket sessions against a live server

mod common;

use canids_lib::models::ServerMessage;
use canids_server::api;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    _dir: TempDir,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn start_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let state = common::app_state(dir.path());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(api::serve(listener, state, async move {
        let _ = rx.await;
    }));

    TestServer {
        addr,
        shutdown: Some(tx),
        _dir: dir,
    }
}

/// Send one text frame and collect every server message until close
async fn run_session(addr: SocketAddr, first_frame: Message) -> Vec<ServerMessage> {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws.send(first_frame).await.unwrap();

    let collect = async {
        let mut received = Vec::new();
        while let Some(frame) = ws.next().await {
            match frame.unwrap() {
                Message::Text(text) => received.push(serde_json::from_str(&text).unwrap()),
                Message::Close(_) => break,
                _ => {}
            }
        }
        received
    };

    tokio::time::timeout(Duration::from_secs(10), collect)
        .await
        .expect("session did not close")
}

#[tokio::test]
async fn test_full_session_streams_intervals_then_verdict() {
    let server = start_server().await;

    let received = run_session(server.addr, Message::Text(r#"{"attack":"DoS"}"#.into())).await;

    assert_eq!(
        received,
        vec![
            ServerMessage::interim(1),
            ServerMessage::interim(1),
            ServerMessage::interim(1),
            ServerMessage::verdict(Some(1)),
        ]
    );
}

#[tokio::test]
async fn test_unknown_category_gets_error_and_close() {
    let server = start_server().await;

    let received = run_session(server.addr, Message::Text(r#"{"attack":"Bogus"}"#.into())).await;

    assert_eq!(received, vec![ServerMessage::error("Invalid attack type")]);
}

#[tokio::test]
async fn test_missing_dataset_file_gets_error() {
    let server = start_server().await;

    let received = run_session(server.addr, Message::Text(r#"{"attack":"Fuzzy"}"#.into())).await;

    assert_eq!(received.len(), 1);
    assert!(received[0].is_terminal());
    assert!(matches!(received[0], ServerMessage::Error { .. }));
}

#[tokio::test]
async fn test_malformed_selection_gets_error() {
    let server = start_server().await;

    let received = run_session(server.addr, Message::Text("not json".into())).await;

    assert_eq!(received.len(), 1);
    match &received[0] {
        ServerMessage::Error { error } => {
            assert!(error.starts_with("Malformed selection message"))
        }
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() {
    let server = start_server().await;

    let first = run_session(server.addr, Message::Text(r#"{"attack":"DoS"}"#.into()));
    let second = run_session(server.addr, Message::Text(r#"{"attack":"Bogus"}"#.into()));
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.len(), 4);
    assert_eq!(first.last(), Some(&ServerMessage::verdict(Some(1))));
    assert_eq!(second, vec![ServerMessage::error("Invalid attack type")]);
}
