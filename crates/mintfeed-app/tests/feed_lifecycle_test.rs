//! Feed lifecycle integration tests.
//!
//! Tests the feed end to end against a live socket:
//! - Connection establishment and entry delivery
//! - Rejection of malformed frames
//! - Reconnection after drops and close frames
//! - Heartbeat timeout against a silent peer
//! - Capacity bound and deduplication across reconnects
//! - Stop semantics

mod integration;
use integration::common::mock_ws::MockWsServer;

use mintfeed_app::{AppConfig, Application};
use mintfeed_core::{ConnectionState, Subscription};
use mintfeed_feed::{FeedClient, FeedClientConfig, FeedError, StoreConfig};
use mintfeed_ws::{ConnectionConfig, WsError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Reconnect quickly and deterministically.
fn fast_config() -> FeedClientConfig {
    FeedClientConfig {
        connection: ConnectionConfig {
            reconnect_initial_delay_ms: 20,
            reconnect_max_delay_ms: 200,
            reconnect_jitter: 0.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Collect transitions until `target` is observed.
async fn wait_for_state(
    status: &mut Subscription<ConnectionState>,
    target: ConnectionState,
) -> Vec<ConnectionState> {
    timeout(WAIT, async {
        let mut seen = Vec::new();
        while let Some(state) = status.recv().await {
            seen.push(state);
            if state == target {
                break;
            }
        }
        seen
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {target}"))
}

/// Poll until the feed holds `len` entries.
async fn wait_for_len(client: &FeedClient, len: usize) {
    timeout(WAIT, async {
        while client.snapshot().len() < len {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {len} entries"));
}

/// A single well-formed frame becomes the only entry.
#[tokio::test]
async fn test_single_entry_delivered() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();
    let mut updates = client.subscribe_entries();

    client.start(&server.url()).unwrap();
    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Open).await,
        vec![ConnectionState::Connecting, ConnectionState::Open]
    );

    server.send_entry(
        "Example Token",
        "EXT",
        "https://example.com/token-metadata.json",
        "Mint1",
    );
    wait_for_len(&client, 1).await;

    let snapshot = client.snapshot();
    let entry = snapshot.newest().unwrap();
    assert_eq!(entry.name, "Example Token");
    assert_eq!(entry.symbol, "EXT");
    assert_eq!(entry.uri, "https://example.com/token-metadata.json");
    assert_eq!(entry.mint, "Mint1");

    let update = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(update.entry.mint, "Mint1");
    assert_eq!(update.len, 1);

    client.stop().await;
    server.shutdown().await;
}

/// A frame missing its mint is dropped without disturbing the connection.
#[tokio::test]
async fn test_invalid_frame_skipped() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    wait_for_state(&mut status, ConnectionState::Open).await;

    server.send_entry("A", "AAA", "https://a", "MintA");
    server.send_text(r#"{"name":"Broken","symbol":"BRK","uri":"https://b"}"#);
    server.send_text("not json at all");
    server.send_entry("B", "BBB", "https://b", "MintB");
    wait_for_len(&client, 2).await;

    assert_eq!(client.snapshot().mints(), vec!["MintB", "MintA"]);
    assert_eq!(client.decode_stats().accepted(), 2);
    assert_eq!(client.decode_stats().rejected(), 2);
    assert_eq!(client.state(), ConnectionState::Open);
    assert!(status.drain().is_empty());
    assert_eq!(server.connection_count(), 1);

    client.stop().await;
    server.shutdown().await;
}

/// Callback subscribers see every update in order until their handle is released.
#[tokio::test]
async fn test_callback_subscriptions() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());

    let states = Arc::new(Mutex::new(Vec::new()));
    let mints = Arc::new(Mutex::new(Vec::new()));

    let states_clone = states.clone();
    let status_handle = client.subscribe_status_fn(move |state| {
        states_clone.lock().unwrap().push(state);
    });
    let mints_clone = mints.clone();
    let entries_handle = client.subscribe_entries_fn(move |update| {
        mints_clone.lock().unwrap().push(update.entry.mint);
    });

    client.start(&server.url()).unwrap();
    timeout(WAIT, async {
        while client.state() != ConnectionState::Open {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    server.send_entry("One", "ONE", "u", "Mint1");
    server.send_entry("Two", "TWO", "u", "Mint2");
    timeout(WAIT, async {
        while mints.lock().unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(*mints.lock().unwrap(), vec!["Mint1", "Mint2"]);

    entries_handle.unsubscribe();
    server.send_entry("Three", "THR", "u", "Mint3");
    wait_for_len(&client, 3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mints.lock().unwrap().len(), 2);

    client.stop().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        *states.lock().unwrap(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closed
        ]
    );
    drop(status_handle);

    server.shutdown().await;
}

/// A dropped connection goes through Error and back to Open on its own.
#[tokio::test]
async fn test_reconnects_after_drop() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Open).await,
        vec![ConnectionState::Connecting, ConnectionState::Open]
    );

    server.drop_all();

    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Open).await,
        vec![
            ConnectionState::Error,
            ConnectionState::Connecting,
            ConnectionState::Open
        ]
    );
    assert!(server.wait_for_connections(2, WAIT).await);
    assert_eq!(client.reconnect_count(), 0);

    client.stop().await;
    server.shutdown().await;
}

/// A close frame from the server reports Closed, then reconnects.
#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    wait_for_state(&mut status, ConnectionState::Open).await;

    server.close_all();

    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Open).await,
        vec![
            ConnectionState::Closed,
            ConnectionState::Connecting,
            ConnectionState::Open
        ]
    );

    client.stop().await;
    server.shutdown().await;
}

/// Exhausting reconnect attempts after a server close ends in Error.
#[tokio::test]
async fn test_gives_up_after_server_close() {
    let server = MockWsServer::start().await;
    let mut config = fast_config();
    config.connection.max_reconnect_attempts = 1;
    let client = FeedClient::new(config);
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    wait_for_state(&mut status, ConnectionState::Open).await;

    server.close_all();

    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Error).await,
        vec![ConnectionState::Closed, ConnectionState::Error]
    );
    timeout(WAIT, async {
        while client.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker should stop after its last attempt");

    assert_eq!(client.state(), ConnectionState::Error);
    assert_eq!(server.connection_count(), 1);

    server.shutdown().await;
}

/// A peer that stops answering pings is detected and replaced.
#[tokio::test]
async fn test_heartbeat_timeout_reconnects() {
    let server = MockWsServer::start_silent().await;
    let mut config = fast_config();
    config.connection.heartbeat_interval_ms = 50;
    config.connection.heartbeat_timeout_ms = 50;
    let client = FeedClient::new(config);
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Open).await,
        vec![ConnectionState::Connecting, ConnectionState::Open]
    );

    assert_eq!(
        wait_for_state(&mut status, ConnectionState::Open).await,
        vec![
            ConnectionState::Error,
            ConnectionState::Connecting,
            ConnectionState::Open
        ]
    );
    assert!(server.wait_for_connections(2, WAIT).await);

    client.stop().await;
    server.drop_all();
    server.shutdown().await;
}

/// The feed keeps only the newest entries up to its capacity.
#[tokio::test]
async fn test_capacity_bound() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(FeedClientConfig {
        store: StoreConfig {
            max_entries: 2,
            ..Default::default()
        },
        ..fast_config()
    });
    let mut status = client.subscribe_status();
    let mut updates = client.subscribe_entries();

    client.start(&server.url()).unwrap();
    wait_for_state(&mut status, ConnectionState::Open).await;

    for mint in ["A", "B", "C"] {
        server.send_entry(mint, mint, "u", mint);
    }

    let last = timeout(WAIT, async {
        let mut last = None;
        for _ in 0..3 {
            last = updates.recv().await;
        }
        last
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(last.entry.mint, "C");
    assert_eq!(last.evicted.len(), 1);
    assert_eq!(last.evicted[0].mint, "A");
    assert_eq!(client.snapshot().mints(), vec!["C", "B"]);

    client.stop().await;
    server.shutdown().await;
}

/// Mints seen before a reconnect are still deduplicated after it.
#[tokio::test]
async fn test_dedup_across_reconnect() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    wait_for_state(&mut status, ConnectionState::Open).await;

    server.send_entry("A", "A", "u", "MintA");
    wait_for_len(&client, 1).await;

    server.drop_all();
    wait_for_state(&mut status, ConnectionState::Open).await;

    server.send_entry("A again", "A", "u", "MintA");
    server.send_entry("B", "B", "u", "MintB");
    wait_for_len(&client, 2).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.mints(), vec!["MintB", "MintA"]);
    assert_eq!(snapshot.get(1).unwrap().name, "A");

    client.stop().await;
    server.shutdown().await;
}

/// Stop closes the socket, publishes Closed once and never reconnects.
#[tokio::test]
async fn test_stop_is_final_and_idempotent() {
    let server = MockWsServer::start().await;
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();

    client.start(&server.url()).unwrap();
    wait_for_state(&mut status, ConnectionState::Open).await;

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(status.drain(), vec![ConnectionState::Closed]);

    client.stop().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(status.drain().is_empty());
    assert_eq!(server.connection_count(), 1);
    assert_eq!(server.active_count(), 0);
    assert!(!client.is_running());

    server.shutdown().await;
}

/// Stop during backoff cancels the pending reconnect.
#[tokio::test]
async fn test_stop_during_backoff() {
    let client = FeedClient::new(FeedClientConfig {
        connection: ConnectionConfig {
            reconnect_initial_delay_ms: 10_000,
            reconnect_max_delay_ms: 10_000,
            reconnect_jitter: 0.0,
            ..Default::default()
        },
        ..Default::default()
    });
    let mut status = client.subscribe_status();

    // Nothing listens on port 1.
    client.start("ws://127.0.0.1:1").unwrap();
    wait_for_state(&mut status, ConnectionState::Error).await;

    timeout(Duration::from_secs(2), client.stop())
        .await
        .expect("stop should not wait for the backoff timer");

    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(status.drain(), vec![ConnectionState::Closed]);
}

/// A malformed endpoint fails start without touching state.
#[tokio::test]
async fn test_invalid_endpoint_fails_start() {
    let client = FeedClient::new(fast_config());
    let mut status = client.subscribe_status();

    for endpoint in ["", "localhost:8080", "http://localhost:8080/connect"] {
        let err = client.start(endpoint).unwrap_err();
        assert!(
            matches!(err, FeedError::Connection(WsError::InvalidEndpoint(_))),
            "unexpected error for {endpoint:?}: {err}"
        );
    }

    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(status.drain().is_empty());
}

/// The application seeds the feed, ingests live frames and stops on shutdown.
#[tokio::test]
async fn test_application_run_until_shutdown() {
    let server = MockWsServer::start().await;

    let config = AppConfig::from_toml_str(&format!(
        r#"
        [ws]
        endpoint = "{}"
        reconnect_initial_delay_ms = 20
        reconnect_jitter = 0.0

        [[feed.seed]]
        name = "Example Token"
        symbol = "EXT"
        uri = "https://example.com/token-metadata.json"
        mint = "Mint1"
        "#,
        server.url()
    ))
    .unwrap();

    let app = Arc::new(Application::new(config).unwrap());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let runner = app.clone();
    let handle = tokio::spawn(async move {
        runner
            .run_until(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    assert!(server.wait_for_connections(1, WAIT).await);
    timeout(WAIT, async {
        while app.client().state() != ConnectionState::Open {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // The seed mint is already known and must not be re-added.
    server.send_entry("Example Token", "EXT", "u", "Mint1");
    server.send_entry("Fresh", "FRS", "u", "Mint2");
    wait_for_len(app.client(), 2).await;
    assert_eq!(app.client().snapshot().mints(), vec!["Mint2", "Mint1"]);

    shutdown_tx.send(()).unwrap();
    timeout(WAIT, handle).await.unwrap().unwrap().unwrap();

    assert_eq!(app.client().state(), ConnectionState::Closed);
    assert!(!app.client().is_running());

    server.shutdown().await;
}
