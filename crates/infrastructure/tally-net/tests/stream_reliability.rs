use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use tally_core::{Frame, Subscribe};
use tally_net::stream::{self, ConnState, ReconnectPolicy, StreamEvent};

async fn start_ws_server<F, Fut>(handler: F) -> (SocketAddr, tokio::task::JoinHandle<()>)
where
    F: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let handler = handler.clone();
            async move { ws.on_upgrade(move |socket| handler(socket)) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

async fn next_event(events: &mut mpsc::Receiver<StreamEvent>) -> StreamEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for stream event")
        .expect("event channel closed")
}

fn expect_frame(event: StreamEvent) -> Frame {
    match event {
        StreamEvent::Frame(frame) => frame,
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[tokio::test]
async fn frames_keep_flowing_across_server_drops() {
    #[derive(Deserialize)]
    struct Hello {
        n: u32,
    }

    let connections = Arc::new(AtomicU32::new(0));
    let counter = connections.clone();
    let (addr, _server) = start_ws_server(move |mut socket: WebSocket| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            let frame = format!(r#"{{"type":"hello","data":{{"n":{n}}}}}"#);
            let _ = socket.send(WsMessage::Text(frame)).await;
            // Dropping the socket here kills the connection from the
            // server side.
        }
    })
    .await;

    let (events_tx, mut events) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let handle = stream::spawn(
        format!("ws://{addr}/ws"),
        ReconnectPolicy::unbounded(Duration::from_millis(20)),
        events_tx,
        cancel.clone(),
    );

    assert!(matches!(next_event(&mut events).await, StreamEvent::Opened));
    let first = expect_frame(next_event(&mut events).await);
    assert_eq!(first.kind, "hello");
    assert_eq!(first.data::<Hello>().unwrap().n, 1);

    assert!(matches!(next_event(&mut events).await, StreamEvent::Closed));
    assert!(matches!(next_event(&mut events).await, StreamEvent::Opened));
    let second = expect_frame(next_event(&mut events).await);
    assert_eq!(second.data::<Hello>().unwrap().n, 2);

    handle.stop();
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_breaking_the_stream() {
    let (addr, _server) = start_ws_server(|mut socket: WebSocket| async move {
        let _ = socket.send(WsMessage::Text("not json at all".into())).await;
        let _ = socket
            .send(WsMessage::Text(r#"{"untyped": true}"#.into()))
            .await;
        let _ = socket
            .send(WsMessage::Text(r#"{"type":"ping","data":{}}"#.into()))
            .await;
        // Hold the connection open until the peer goes away.
        while socket.recv().await.is_some() {}
    })
    .await;

    let (events_tx, mut events) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let handle = stream::spawn(
        format!("ws://{addr}/ws"),
        ReconnectPolicy::unbounded(Duration::from_millis(20)),
        events_tx,
        cancel.clone(),
    );

    assert!(matches!(next_event(&mut events).await, StreamEvent::Opened));
    // The two unparseable payloads never surface; the next event is the
    // first well-formed frame.
    let frame = expect_frame(next_event(&mut events).await);
    assert_eq!(frame.kind, "ping");
    assert!(handle.is_open(), "malformed input must not drop the link");

    handle.stop();
}

#[tokio::test]
async fn outbound_messages_reach_the_server_only_while_open() {
    let (seen_tx, mut seen) = mpsc::channel::<String>(8);
    let (addr, _server) = start_ws_server(move |mut socket: WebSocket| {
        let seen_tx = seen_tx.clone();
        async move {
            while let Some(Ok(msg)) = socket.recv().await {
                if let WsMessage::Text(text) = msg {
                    let _ = seen_tx.send(text).await;
                }
            }
        }
    })
    .await;

    let (events_tx, mut events) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let handle = stream::spawn(
        format!("ws://{addr}/ws"),
        ReconnectPolicy::unbounded(Duration::from_millis(20)),
        events_tx,
        cancel.clone(),
    );

    // Nothing has opened yet; the message is dropped, not queued.
    assert!(!handle.send_json(&Subscribe::new(["services"])));

    assert!(matches!(next_event(&mut events).await, StreamEvent::Opened));
    assert!(handle.send_json(&Subscribe::new(["services", "vram"])));

    let text = timeout(Duration::from_secs(5), seen.recv())
        .await
        .expect("timed out waiting for the server to see the message")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(sent["type"], "subscribe");
    assert_eq!(sent["topics"][0], "services");
    assert_eq!(sent["topics"][1], "vram");

    // The dropped pre-open message never arrived.
    assert!(seen.try_recv().is_err());

    handle.stop();
}

#[tokio::test]
async fn bounded_policy_gives_up_after_its_attempt_budget() {
    // Bind a port and release it so connections get refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (events_tx, mut events) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = stream::spawn(
        format!("ws://{addr}/ws"),
        ReconnectPolicy::bounded(Duration::from_millis(10), 3),
        events_tx,
        cancel,
    );

    match next_event(&mut events).await {
        StreamEvent::GaveUp => {}
        other => panic!("expected the stream to give up, got {other:?}"),
    }
    assert_eq!(handle.state(), ConnState::GaveUp);
    assert!(!handle.send_json(&Subscribe::new(["services"])));
}
