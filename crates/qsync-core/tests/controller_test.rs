#![allow(clippy::unwrap_used)]
// End-to-end: `Controller` against an in-process fake core.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use qsync_api::ReconnectConfig;
use qsync_core::{
    ConnectionState, Controller, ControllerConfig, CoreError, LifecycleState, SelectionDirective,
    ViewConfig,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

/// Fake core: one component (`Lobby`), echoes every `Component.Set` back
/// as a change-group poll.
async fn spawn_fake_core() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let mut group = Value::Null;
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let id = request["id"].clone();
                    let params = request["params"].clone();

                    let result = match request["method"].as_str().unwrap_or_default() {
                        "Component.GetComponents" => {
                            json!([{ "Name": "Lobby", "Type": "gain", "Properties": [] }])
                        }
                        "Component.GetControls" => json!({
                            "Name": "Lobby",
                            "Controls": [
                                { "Name": "gain", "Type": "Float", "Value": -12.0, "Position": 0.5 },
                                { "Name": "mute", "Type": "Boolean", "Value": 0.0, "Position": 0.0 }
                            ]
                        }),
                        "ChangeGroup.AddComponentControl" | "ChangeGroup.AutoPoll" => {
                            group = params["Id"].clone();
                            json!(true)
                        }
                        _ => json!(true),
                    };
                    let reply = json!({ "jsonrpc": "2.0", "id": id, "result": result });
                    ws.send(Message::text(reply.to_string())).await.unwrap();

                    if request["method"] == "Component.Set" {
                        let mut change = params["Controls"][0].clone();
                        change["Component"] = params["Name"].clone();
                        let push = json!({
                            "jsonrpc": "2.0",
                            "method": "ChangeGroup.Poll",
                            "params": { "Id": group, "Changes": [change] }
                        });
                        ws.send(Message::text(push.to_string())).await.unwrap();
                    }
                }
            });
        }
    });

    Url::parse(&format!("ws://{addr}/qrc")).unwrap()
}

#[tokio::test]
async fn test_view_round_trip_through_device_echo() {
    let url = spawn_fake_core().await;
    let controller = Controller::new(ControllerConfig::new(url));
    controller.connect().await.unwrap();
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Connected);

    let components = controller.components().await.unwrap();
    assert_eq!(components.len(), 1);

    let view = controller
        .open_view(ViewConfig::new(
            "lobby",
            vec![SelectionDirective::component_and_control_pattern("lobby", "gain")],
        ))
        .await
        .unwrap();
    assert_eq!(view.wait_until_settled().await.unwrap(), 1);

    let writer = controller.writer().await.unwrap();
    let gain = view.snapshot()[0].clone();
    writer.set_value(&gain, -3.0).await;

    let mut stream = view.subscribe();
    tokio::time::timeout(WAIT, async {
        while view.snapshot()[0].value != Some(-3.0) {
            stream.changed().await;
        }
    })
    .await
    .expect("device echo should reach the view");
    assert_eq!(view.snapshot()[0].position, Some(0.5));

    controller.disconnect().await;
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Disconnected);
    assert!(view.is_disposed());
    assert_eq!(view.state(), LifecycleState::Ready);
    assert!(matches!(controller.writer().await, Err(CoreError::Disconnected)));
}

#[tokio::test]
async fn test_connect_times_out_when_core_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ControllerConfig::new(Url::parse(&format!("ws://{addr}/qrc")).unwrap());
    config.connect_timeout = Duration::from_millis(300);
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(100),
        max_retries: None,
    };
    let controller = Controller::new(config);

    let result = controller.connect().await;

    assert!(matches!(result, Err(CoreError::ConnectionFailed { .. })));
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_non_websocket_url_fails_fast() {
    let controller = Controller::new(ControllerConfig::new(
        Url::parse("http://core.local/qrc").unwrap(),
    ));
    let result = controller.connect().await;
    assert!(result.is_err());
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_second_connect_shuts_down_previous_session() {
    let url = spawn_fake_core().await;
    let controller = Controller::new(ControllerConfig::new(url));
    controller.connect().await.unwrap();

    let first = controller.gateway().await.unwrap();
    let mut first_status = first.connection_status();
    let view = controller
        .open_view(ViewConfig::new(
            "lobby",
            vec![SelectionDirective::component_pattern("lobby")],
        ))
        .await
        .unwrap();
    view.wait_until_settled().await.unwrap();

    controller.connect().await.unwrap();

    tokio::time::timeout(WAIT, first_status.wait_for(|connected| !*connected))
        .await
        .expect("previous session should be shut down")
        .unwrap();
    assert!(view.is_disposed());
    assert_eq!(*controller.connection_state().borrow(), ConnectionState::Connected);
    assert!(controller.gateway().await.unwrap().is_connected());

    // The old client stays down rather than reconnecting in the background.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!first.is_connected());

    controller.disconnect().await;
}
