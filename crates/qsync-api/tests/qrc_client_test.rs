#![allow(clippy::unwrap_used)]
// Integration tests for `QrcClient` against an in-process fake core.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use qsync_api::{
    ComponentDirectory, ControlGateway, Error, QrcClient, QrcConfig, ReconnectConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

/// Start a fake core on an ephemeral port.
///
/// Answers the handful of methods the client uses, records every request
/// it sees, and pushes one `ChangeGroup.Poll` after each change-group
/// registration.
async fn spawn_fake_core() -> (Url, mpsc::UnboundedReceiver<Value>) {
    spawn_fake_core_with(0).await
}

/// Like [`spawn_fake_core`], but the first `failing_directory_loads`
/// `Component.GetComponents` calls answer with an RPC error.
async fn spawn_fake_core_with(
    failing_directory_loads: usize,
) -> (Url, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let directory_failures = Arc::new(AtomicUsize::new(failing_directory_loads));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen_tx = seen_tx.clone();
            let directory_failures = Arc::clone(&directory_failures);
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let _ = seen_tx.send(request.clone());

                    let id = request["id"].clone();
                    let method = request["method"].as_str().unwrap_or_default().to_owned();
                    let params = request["params"].clone();

                    let reply = match method.as_str() {
                        "Component.GetComponents"
                            if directory_failures
                                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                                    n.checked_sub(1)
                                })
                                .is_ok() =>
                        {
                            json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "error": { "code": 13, "message": "Design not running" }
                            })
                        }
                        "Component.GetComponents" => json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": [
                                { "Name": "MainLight", "Type": "dimmer", "Properties": [] },
                                { "Name": "Lobby", "Type": "gain", "Properties": [] }
                            ]
                        }),
                        "Component.GetControls" if params["Name"] == "Lobby" => json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "result": {
                                "Name": "Lobby",
                                "Controls": [
                                    { "Name": "gain", "Type": "Float", "Value": -12.0, "Position": 0.5, "String": "-12.0dB" },
                                    { "Name": "mute", "Type": "Boolean", "Value": 0.0, "Position": 0.0, "String": "false" }
                                ]
                            }
                        }),
                        "Component.GetControls" | "Component.Set"
                            if params["Name"] != "Lobby" =>
                        {
                            json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "error": { "code": 8, "message": "Unknown component" }
                            })
                        }
                        _ => json!({ "jsonrpc": "2.0", "id": id, "result": true }),
                    };
                    ws.send(Message::text(reply.to_string())).await.unwrap();

                    if method == "ChangeGroup.AddComponentControl" {
                        let push = json!({
                            "jsonrpc": "2.0",
                            "method": "ChangeGroup.Poll",
                            "params": {
                                "Id": params["Id"],
                                "Changes": [
                                    { "Component": "Lobby", "Name": "gain", "Value": -6.0, "String": "-6.0dB" }
                                ]
                            }
                        });
                        ws.send(Message::text(push.to_string())).await.unwrap();
                    }
                }
            });
        }
    });

    (Url::parse(&format!("ws://{addr}/qrc")).unwrap(), seen_rx)
}

async fn connected_client(url: Url) -> (QrcClient, CancellationToken) {
    let cancel = CancellationToken::new();
    let client = QrcClient::connect(url, QrcConfig::default(), cancel.clone()).unwrap();

    let mut status = client.connection_status();
    tokio::time::timeout(WAIT, status.wait_for(|connected| *connected))
        .await
        .expect("client should connect")
        .unwrap();

    (client, cancel)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_directory_loaded_on_connect() {
    let (url, _seen) = spawn_fake_core().await;
    let (client, cancel) = connected_client(url).await;

    let components = client.components().unwrap();
    let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["MainLight", "Lobby"]);
    assert_eq!(components[0].component_type, "dimmer");

    cancel.cancel();
}

#[tokio::test]
async fn test_component_controls_and_push_update() {
    let (url, _seen) = spawn_fake_core().await;
    let (client, cancel) = connected_client(url).await;

    let mut updates = client.control_updates();
    let controls = client.component_controls("Lobby").await.unwrap();

    assert_eq!(controls.len(), 2);
    assert_eq!(controls[0].name, "gain");
    assert_eq!(controls[0].value, Some(-12.0));
    assert_eq!(controls[1].control_type, "Boolean");

    let update = tokio::time::timeout(WAIT, updates.recv())
        .await
        .expect("poll should be pushed")
        .unwrap();
    assert_eq!(update.component, "Lobby");
    assert_eq!(update.control, "gain");
    assert_eq!(update.value, Some(-6.0));
    assert_eq!(update.position, None);

    cancel.cancel();
}

#[tokio::test]
async fn test_unknown_component_is_rpc_error() {
    let (url, _seen) = spawn_fake_core().await;
    let (client, cancel) = connected_client(url).await;

    let result = client.component_controls("Nope").await;
    assert!(
        matches!(result, Err(Error::Rpc { code: 8, .. })),
        "expected Rpc error, got: {result:?}"
    );

    cancel.cancel();
}

#[tokio::test]
async fn test_set_control_sends_component_set() {
    let (url, mut seen) = spawn_fake_core().await;
    let (client, cancel) = connected_client(url).await;

    client.set_control("Lobby", "gain", -3.0).await.unwrap();
    client
        .set_control_position("Lobby", "gain", 0.75)
        .await
        .unwrap();

    let mut sets = Vec::new();
    while sets.len() < 2 {
        let request = tokio::time::timeout(WAIT, seen.recv())
            .await
            .unwrap()
            .unwrap();
        if request["method"] == "Component.Set" {
            sets.push(request["params"].clone());
        }
    }

    assert_eq!(
        sets[0],
        json!({ "Name": "Lobby", "Controls": [{ "Name": "gain", "Value": -3.0 }] })
    );
    assert_eq!(
        sets[1],
        json!({ "Name": "Lobby", "Controls": [{ "Name": "gain", "Position": 0.75 }] })
    );

    cancel.cancel();
}

#[tokio::test]
async fn test_shutdown_drops_connectivity() {
    let (url, _seen) = spawn_fake_core().await;
    let (client, _cancel) = connected_client(url).await;

    let mut status = client.connection_status();
    client.shutdown();

    tokio::time::timeout(WAIT, status.wait_for(|connected| !*connected))
        .await
        .expect("connectivity should drop after shutdown")
        .unwrap();
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_failed_directory_load_retries_before_connecting() {
    let (url, mut seen) = spawn_fake_core_with(1).await;
    let cancel = CancellationToken::new();
    let config = QrcConfig {
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            max_retries: None,
        },
        ..QrcConfig::default()
    };
    let client = QrcClient::connect(url, config, cancel.clone()).unwrap();

    // Connectivity must only ever be published with a directory in place.
    let mut status = client.connection_status();
    tokio::time::timeout(WAIT, status.wait_for(|connected| *connected))
        .await
        .expect("client should connect after retrying")
        .unwrap();
    assert_eq!(client.components().unwrap().len(), 2);

    let mut directory_loads = 0;
    while let Ok(request) = seen.try_recv() {
        if request["method"] == "Component.GetComponents" {
            directory_loads += 1;
        }
    }
    assert_eq!(directory_loads, 2, "first load failed, second succeeded");

    cancel.cancel();
}
