//! End-to-end WebSocket tests against a live listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tempfile::{tempdir, TempDir};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use webnotify_hub::{Hub, HubConfig};
use webnotify_server::config::DEFAULT_MAX_BODY_BYTES;
use webnotify_server::router;

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Server {
    hub: Arc<Hub>,
    addr: SocketAddr,
    _doc_root: TempDir,
}

async fn start_server(config: HubConfig) -> Server {
    let doc_root = tempdir().unwrap();
    let hub = Hub::new(config).unwrap();
    let app = router(Arc::clone(&hub), doc_root.path(), DEFAULT_MAX_BODY_BYTES);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        hub,
        addr,
        _doc_root: doc_root,
    }
}

async fn connect(server: &Server) -> Client {
    let url = format!("ws://{}/api/stream", server.addr);
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn send(server: &Server, message: &str) {
    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    let request = format!(
        "GET /api/send/{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        message, server.addr
    );
    tokio::io::AsyncWriteExt::write_all(&mut stream, request.as_bytes())
        .await
        .unwrap();
    let mut response = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
        .await
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
}

/// Next text frame, skipping control frames
async fn next_text(client: &mut Client) -> Option<String> {
    loop {
        match timeout(WAIT, client.next()).await.expect("timed out waiting for frame")? {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

async fn wait_for_subscribers(hub: &Hub, expected: usize) {
    timeout(WAIT, async {
        while hub.subscriber_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber count did not settle");
}

#[tokio::test]
async fn test_replay_then_live_over_websocket() {
    let server = start_server(HubConfig::default().with_buffer_size(2)).await;
    for text in ["a", "b", "c"] {
        server.hub.broadcast(text).await.unwrap();
    }

    let mut client = connect(&server).await;
    let first = next_text(&mut client).await.unwrap();
    let second = next_text(&mut client).await.unwrap();
    assert!(first.starts_with("0[") && first.ends_with("] b"), "{}", first);
    assert!(second.starts_with("0[") && second.ends_with("] c"), "{}", second);

    send(&server, "d").await;
    let third = next_text(&mut client).await.unwrap();
    assert!(third.starts_with("0[") && third.ends_with("] d"), "{}", third);
}

#[tokio::test]
async fn test_every_client_receives_each_message_once() {
    let server = start_server(HubConfig::default()).await;
    let mut one = connect(&server).await;
    let mut two = connect(&server).await;
    wait_for_subscribers(&server.hub, 2).await;

    send(&server, "x").await;
    send(&server, "y").await;

    for client in [&mut one, &mut two] {
        let x = next_text(client).await.unwrap();
        let y = next_text(client).await.unwrap();
        assert!(x.ends_with("] x"), "{}", x);
        assert!(y.ends_with("] y"), "{}", y);
    }
}

#[tokio::test]
async fn test_client_close_unsubscribes() {
    let server = start_server(HubConfig::default()).await;
    let mut client = connect(&server).await;
    wait_for_subscribers(&server.hub, 1).await;

    client.close(None).await.unwrap();
    wait_for_subscribers(&server.hub, 0).await;

    // Later broadcasts do not touch the departed client
    server.hub.broadcast("after").await.unwrap();
    assert_eq!(server.hub.history_len().await, 1);
}

#[tokio::test]
async fn test_client_drop_unsubscribes() {
    let server = start_server(HubConfig::default()).await;
    let client = connect(&server).await;
    wait_for_subscribers(&server.hub, 1).await;

    drop(client);
    wait_for_subscribers(&server.hub, 0).await;
}

#[tokio::test]
async fn test_hub_close_ends_stream() {
    let server = start_server(HubConfig::default()).await;
    let mut client = connect(&server).await;
    wait_for_subscribers(&server.hub, 1).await;

    send(&server, "last").await;
    server.hub.close().await;

    let last = next_text(&mut client).await.unwrap();
    assert!(last.ends_with("] last"), "{}", last);
    assert_eq!(next_text(&mut client).await, None);
}

#[tokio::test]
async fn test_stream_rejected_after_close() {
    let server = start_server(HubConfig::default()).await;
    server.hub.close().await;

    let mut client = connect(&server).await;
    assert_eq!(next_text(&mut client).await, None);
    assert_eq!(server.hub.subscriber_count().await, 0);
}

#[tokio::test]
async fn test_pings_reach_idle_clients() {
    let server = start_server(HubConfig::default().with_ping_interval_secs(1)).await;
    let mut client = connect(&server).await;

    let frame = next_text(&mut client).await.unwrap();
    assert_eq!(frame, "1");
}
