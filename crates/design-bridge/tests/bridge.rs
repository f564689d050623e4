//! End-to-end tests for the command bridge against a scripted application

use async_trait::async_trait;
use design_bridge::framing::{read_frame, write_frame};
use design_bridge::{AsyncReader, AsyncWriter, BridgeConfig, CommandBridge, Endpoint, IdGenerator};
use design_mcp_core::{CommandId, CommandRequest, CommandResponse, DesignError, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

struct ChannelReader(mpsc::UnboundedReceiver<Vec<u8>>);

#[async_trait]
impl AsyncReader for ChannelReader {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        self.0
            .recv()
            .await
            .ok_or_else(|| DesignError::ConnectionLost("application went away".into()))
    }
}

struct ChannelWriter(mpsc::UnboundedSender<Vec<u8>>);

#[async_trait]
impl AsyncWriter for ChannelWriter {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        self.0
            .send(data.to_vec())
            .map_err(|_| DesignError::TransportUnavailable("application went away".into()))
    }
}

/// In-memory stand-in for the design application
struct FakeApp {
    to_bridge: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_bridge: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl FakeApp {
    async fn next_request(&mut self) -> CommandRequest {
        let data = tokio::time::timeout(Duration::from_secs(2), self.from_bridge.recv())
            .await
            .expect("bridge sent nothing")
            .expect("bridge writer closed");
        serde_json::from_slice(&data).unwrap()
    }

    fn reply(&self, response: &CommandResponse) {
        self.send_raw(&serde_json::to_string(response).unwrap());
    }

    fn send_raw(&self, json: &str) {
        self.to_bridge
            .as_ref()
            .expect("already disconnected")
            .send(json.as_bytes().to_vec())
            .unwrap();
    }

    fn disconnect(&mut self) {
        self.to_bridge = None;
    }
}

async fn connected_bridge(config: BridgeConfig) -> (CommandBridge, FakeApp) {
    let bridge = CommandBridge::new(config);
    let app = attach_app(&bridge).await;
    (bridge, app)
}

async fn attach_app(bridge: &CommandBridge) -> FakeApp {
    let (to_bridge, bridge_rx) = mpsc::unbounded_channel();
    let (bridge_tx, from_bridge) = mpsc::unbounded_channel();
    bridge.attach(ChannelReader(bridge_rx), ChannelWriter(bridge_tx));
    FakeApp {
        to_bridge: Some(to_bridge),
        from_bridge,
    }
}

async fn wait_for_pending(bridge: &CommandBridge, count: usize) {
    for _ in 0..200 {
        if bridge.pending_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} pending, found {}",
        count,
        bridge.pending_count()
    );
}

#[tokio::test]
async fn test_create_shape_resolves_with_payload() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .execute(
                    "shape:create-shape",
                    json!({ "type": "Rectangle", "left": 0, "top": 0, "width": 100, "height": 50 }),
                )
                .await
        }
    });

    let request = app.next_request().await;
    assert_eq!(request.command, "shape:create-shape");
    assert_eq!(request.params["width"], 100);

    app.reply(&CommandResponse::success(
        request.id,
        json!({ "id": "shp_1", "type": "Rectangle" }),
    ));

    let payload = call.await.unwrap().unwrap();
    assert_eq!(payload["id"], "shp_1");
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_application_error_is_surfaced() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .execute("shape:get-shape", json!({ "shapeId": "missing" }))
                .await
        }
    });

    let request = app.next_request().await;
    app.send_raw(&format!(
        r#"{{"id":{},"ok":false,"payload":{{"message":"not found"}}}}"#,
        request.id.0
    ));

    match call.await.unwrap() {
        Err(DesignError::Application { message, .. }) => assert_eq!(message, "not found"),
        other => panic!("expected application error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let a = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:get-shape", json!({ "shapeId": "a" })).await }
    });
    let first = app.next_request().await;

    let b = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:get-shape", json!({ "shapeId": "b" })).await }
    });
    let second = app.next_request().await;

    assert_eq!(first.params["shapeId"], "a");
    assert_eq!(second.params["shapeId"], "b");
    assert_ne!(first.id, second.id);

    app.reply(&CommandResponse::success(second.id, json!({ "id": "b" })));
    app.reply(&CommandResponse::success(first.id, json!({ "id": "a" })));

    assert_eq!(a.await.unwrap().unwrap()["id"], "a");
    assert_eq!(b.await.unwrap().unwrap()["id"], "b");
}

#[tokio::test]
async fn test_many_concurrent_calls_settle_independently() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let calls: Vec<_> = (0..32)
        .map(|n| {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let value = bridge.execute("shape:get-shape", json!({ "n": n })).await?;
                Ok::<_, DesignError>((n, value))
            })
        })
        .collect();

    let mut requests = Vec::new();
    for _ in 0..32 {
        requests.push(app.next_request().await);
    }
    for request in requests.iter().rev() {
        app.reply(&CommandResponse::success(
            request.id,
            json!({ "echo": request.params["n"] }),
        ));
    }

    for call in calls {
        let (n, value) = call.await.unwrap().unwrap();
        assert_eq!(value["echo"], n);
    }
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_timeout_is_bounded_and_evicts() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let started = Instant::now();
    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .execute_with_timeout(
                    "shape:move-shape",
                    json!({ "shapeId": "shp_1", "left": 10 }),
                    Duration::from_millis(50),
                )
                .await
        }
    });
    let request = app.next_request().await;

    let outcome = call.await.unwrap();
    let elapsed = started.elapsed();

    match outcome {
        Err(DesignError::Timeout { command, after }) => {
            assert_eq!(command, "shape:move-shape");
            assert_eq!(after, Duration::from_millis(50));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(49), "fired early: {:?}", elapsed);
    assert_eq!(bridge.pending_count(), 0);

    // A late answer is discarded without disturbing the bridge
    app.reply(&CommandResponse::success(request.id, json!({ "late": true })));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bridge.pending_count(), 0);
    assert!(bridge.is_connected());
}

#[tokio::test]
async fn test_unknown_response_is_discarded() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("page:list-pages", json!({})).await }
    });
    let request = app.next_request().await;

    app.reply(&CommandResponse::success(CommandId(request.id.0 + 1000), json!("stray")));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bridge.pending_count(), 1);

    app.reply(&CommandResponse::success(request.id, json!(["Page 1"])));
    assert_eq!(call.await.unwrap().unwrap(), json!(["Page 1"]));
}

#[tokio::test]
async fn test_connection_loss_fails_every_pending_call() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let calls: Vec<_> = (0..5)
        .map(|n| {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.execute("shape:get-shape", json!({ "n": n })).await })
        })
        .collect();
    for _ in 0..5 {
        app.next_request().await;
    }
    assert_eq!(bridge.pending_count(), 5);

    app.disconnect();

    for call in calls {
        assert!(matches!(
            call.await.unwrap(),
            Err(DesignError::ConnectionLost(_))
        ));
    }
    assert_eq!(bridge.pending_count(), 0);
    assert!(!bridge.is_connected());
}

#[tokio::test]
async fn test_execute_without_connection_is_not_sent() {
    let bridge = CommandBridge::new(BridgeConfig::default());

    match bridge.execute("page:add-page", json!({ "name": "Drafts" })).await {
        Err(e @ DesignError::TransportUnavailable(_)) => {
            assert_eq!(e.delivery(), design_mcp_core::Delivery::NotApplied);
        }
        other => panic!("expected transport unavailable, got {:?}", other),
    }
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_shutdown_fails_pending_calls() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("document:get-document", json!({})).await }
    });
    app.next_request().await;

    bridge.shutdown();

    assert!(matches!(
        call.await.unwrap(),
        Err(DesignError::ConnectionLost(_))
    ));
    assert!(!bridge.is_connected());
}

#[tokio::test]
async fn test_abandoned_call_stays_pending_until_deadline() {
    let config = BridgeConfig {
        command_timeout: Duration::from_millis(60),
        ..Default::default()
    };
    let (bridge, mut app) = connected_bridge(config).await;

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:delete-shape", json!({ "shapeId": "x" })).await }
    });
    app.next_request().await;
    call.abort();

    assert_eq!(bridge.pending_count(), 1);
    wait_for_pending(&bridge, 0).await;
}

/// Writer for an application that has stopped reading its socket
struct StalledWriter;

#[async_trait]
impl AsyncWriter for StalledWriter {
    async fn write_message(&mut self, _data: &[u8]) -> Result<()> {
        std::future::pending().await
    }
}

async fn settle_within<T>(limit: Duration, call: tokio::task::JoinHandle<T>) -> T {
    tokio::time::timeout(limit, call)
        .await
        .expect("call never settled")
        .unwrap()
}

#[tokio::test]
async fn test_deadline_fires_while_write_is_stuck() {
    let bridge = CommandBridge::new(BridgeConfig::default());
    let (_to_bridge, bridge_rx) = mpsc::unbounded_channel();
    bridge.attach(ChannelReader(bridge_rx), StalledWriter);

    let calls: Vec<_> = ["shape:create-shape", "page:list-pages"]
        .into_iter()
        .map(|command| {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .execute_with_timeout(command, json!({}), Duration::from_millis(50))
                    .await
            })
        })
        .collect();

    for call in calls {
        assert!(matches!(
            settle_within(Duration::from_secs(2), call).await,
            Err(DesignError::Timeout { .. })
        ));
    }
    assert_eq!(bridge.pending_count(), 0);
    assert!(bridge.is_connected());
}

#[tokio::test]
async fn test_deadline_fires_when_tcp_peer_stops_reading() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let bridge = CommandBridge::new(BridgeConfig {
        endpoint: Endpoint::Tcp(listener.local_addr().unwrap().to_string()),
        ..Default::default()
    });

    // Accepted and held, never read
    let (accepted, connected) = tokio::join!(listener.accept(), bridge.connect());
    let (_stream, _) = accepted.unwrap();
    connected.unwrap();

    // Far larger than the socket buffers, so the write cannot complete
    let big = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .execute_with_timeout(
                    "shape:create-shape",
                    json!({ "text": "x".repeat(32 * 1024 * 1024) }),
                    Duration::from_millis(50),
                )
                .await
        }
    });
    assert!(matches!(
        settle_within(Duration::from_secs(3), big).await,
        Err(DesignError::Timeout { .. })
    ));

    let small = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .execute_with_timeout("page:list-pages", json!({}), Duration::from_millis(50))
                .await
        }
    });
    assert!(matches!(
        settle_within(Duration::from_secs(3), small).await,
        Err(DesignError::Timeout { .. })
    ));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_oversized_request_fails_alone() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;

    let pending = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:get-shape", json!({ "shapeId": "shp_1" })).await }
    });
    let request = app.next_request().await;

    let oversized = bridge
        .execute(
            "shape:create-shape",
            json!({ "text": "x".repeat(65 * 1024 * 1024) }),
        )
        .await;
    match oversized {
        Err(e @ DesignError::RequestTooLarge { .. }) => {
            assert_eq!(e.delivery(), design_mcp_core::Delivery::NotApplied);
        }
        other => panic!("expected request too large, got {:?}", other),
    }
    assert!(bridge.is_connected());
    assert_eq!(bridge.pending_count(), 1);

    app.reply(&CommandResponse::success(request.id, json!({ "id": "shp_1" })));
    assert_eq!(pending.await.unwrap().unwrap()["id"], "shp_1");
}

#[tokio::test]
async fn test_write_failure_fails_outstanding_calls_once() {
    let (bridge, app) = connected_bridge(BridgeConfig::default()).await;
    let FakeApp {
        to_bridge,
        mut from_bridge,
    } = app;

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:get-shape", json!({ "shapeId": "a" })).await }
    });
    from_bridge.recv().await.unwrap();
    wait_for_pending(&bridge, 1).await;

    // The application stops accepting writes; the next frame fails to go out
    drop(from_bridge);
    let second = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:move-shape", json!({ "shapeId": "a" })).await }
    });

    for call in [first, second] {
        assert!(matches!(
            settle_within(Duration::from_secs(2), call).await,
            Err(DesignError::ConnectionLost(_))
        ));
    }
    assert_eq!(bridge.pending_count(), 0);
    assert!(!bridge.is_connected());

    assert!(matches!(
        bridge.execute("page:list-pages", json!({})).await,
        Err(DesignError::TransportUnavailable(_))
    ));
    drop(to_bridge);
}

struct StuckIds;

impl IdGenerator for StuckIds {
    fn next_id(&self) -> CommandId {
        CommandId(1)
    }
}

#[tokio::test]
async fn test_colliding_ids_fail_only_the_new_call() {
    let bridge = CommandBridge::with_ids(BridgeConfig::default(), Arc::new(StuckIds));
    let mut app = attach_app(&bridge).await;

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("shape:get-shape", json!({})).await }
    });
    let request = app.next_request().await;

    match bridge.execute("shape:get-shape", json!({})).await {
        Err(DesignError::DuplicateId(id)) => assert_eq!(id, CommandId(1)),
        other => panic!("expected duplicate id, got {:?}", other),
    }

    app.reply(&CommandResponse::success(request.id, json!({ "id": "shp_1" })));
    assert_eq!(first.await.unwrap().unwrap()["id"], "shp_1");
}

#[tokio::test]
async fn test_pushed_events_are_broadcast() {
    let (bridge, app) = connected_bridge(BridgeConfig::default()).await;
    let mut events = bridge.subscribe_events();

    app.send_raw(r#"{"event":"selection-changed","data":{"ids":["shp_1"]}}"#);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.event, "selection-changed");
    assert_eq!(event.data["ids"][0], "shp_1");
}

#[tokio::test]
async fn test_reconnect_after_loss() {
    let (bridge, mut app) = connected_bridge(BridgeConfig::default()).await;
    app.disconnect();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!bridge.is_connected());

    let mut app = attach_app(&bridge).await;
    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.execute("page:list-pages", json!({})).await }
    });
    let request = app.next_request().await;
    app.reply(&CommandResponse::success(request.id, json!([])));

    assert_eq!(call.await.unwrap().unwrap(), json!([]));
}

#[tokio::test]
async fn test_tcp_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        write_frame(
            &mut stream,
            br#"{"event":"hello","data":{"name":"Sketchboard","version":"2.4.1"}}"#,
            "app",
        )
        .await
        .unwrap();

        let data = read_frame(&mut stream, "app").await.unwrap();
        let request: CommandRequest = serde_json::from_slice(&data).unwrap();
        let response = CommandResponse::success(
            request.id,
            json!({ "pages": [{ "id": "page_1", "name": "Page 1" }] }),
        );
        write_frame(&mut stream, &serde_json::to_vec(&response).unwrap(), "app")
            .await
            .unwrap();
    });

    let bridge = CommandBridge::new(BridgeConfig {
        endpoint: Endpoint::Tcp(addr.to_string()),
        ..Default::default()
    });
    bridge.connect().await.unwrap();
    assert!(bridge.is_connected());

    let payload = bridge.execute("page:list-pages", json!({})).await.unwrap();
    assert_eq!(payload["pages"][0]["name"], "Page 1");

    app.await.unwrap();
}
