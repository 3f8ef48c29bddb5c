//! HTTP-level tests for `HueBridge` against a mock bridge

use std::time::Duration;

use hue_api::{
    create_app_key_at, ApiError, BridgeClient, HueBridge, PairingOptions, APP_KEY_HEADER,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use url::Url;

const KEY: &str = "test-app-key";

fn bridge_for(server: &ServerGuard) -> HueBridge {
    let url = Url::parse(&server.url()).unwrap();
    HueBridge::with_base_url(url, KEY, "bridge-1").unwrap()
}

fn envelope(data: serde_json::Value) -> String {
    json!({"errors": [], "data": data}).to_string()
}

async fn mock_resource(server: &mut ServerGuard, kind: &str, data: serde_json::Value) -> mockito::Mock {
    server
        .mock("GET", format!("/clip/v2/resource/{}", kind).as_str())
        .match_header(APP_KEY_HEADER, KEY)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(envelope(data))
        .create_async()
        .await
}

#[tokio::test]
async fn test_fetch_all_collects_every_resource() {
    let mut server = Server::new_async().await;

    let rooms = mock_resource(
        &mut server,
        "room",
        json!([{
            "id": "room-1",
            "metadata": {"name": "Office"},
            "children": [{"rid": "dev-1", "rtype": "device"}],
            "services": [{"rid": "gl-1", "rtype": "grouped_light"}]
        }]),
    )
    .await;
    let lights = mock_resource(
        &mut server,
        "light",
        json!([{
            "id": "light-1",
            "owner": {"rid": "dev-1", "rtype": "device"},
            "metadata": {"name": "Desk"},
            "on": {"on": true},
            "dimming": {"brightness": 42.0}
        }]),
    )
    .await;
    let devices = mock_resource(
        &mut server,
        "device",
        json!([{"id": "dev-1", "services": [{"rid": "light-1", "rtype": "light"}]}]),
    )
    .await;
    let scenes = mock_resource(
        &mut server,
        "scene",
        json!([{"id": "scene-1", "metadata": {"name": "Focus"}, "group": {"rid": "room-1", "rtype": "room"}}]),
    )
    .await;

    let snapshot = bridge_for(&server).fetch_all().await.unwrap();

    rooms.assert_async().await;
    lights.assert_async().await;
    devices.assert_async().await;
    scenes.assert_async().await;

    assert_eq!(snapshot.rooms[0].grouped_light_id(), Some("gl-1"));
    assert_eq!(snapshot.lights[0].dimming.unwrap().brightness, 42.0);
    assert_eq!(snapshot.devices[0].light_ids().collect::<Vec<_>>(), vec!["light-1"]);
    assert_eq!(snapshot.scenes[0].metadata.name, "Focus");
}

#[tokio::test]
async fn test_fetch_all_tolerates_device_failure() {
    let mut server = Server::new_async().await;

    let _rooms = mock_resource(&mut server, "room", json!([])).await;
    let _lights = mock_resource(&mut server, "light", json!([{"id": "light-1"}])).await;
    let _scenes = mock_resource(&mut server, "scene", json!([])).await;
    let _devices = server
        .mock("GET", "/clip/v2/resource/device")
        .with_status(503)
        .with_body("busy")
        .create_async()
        .await;

    let snapshot = bridge_for(&server).fetch_all().await.unwrap();
    assert_eq!(snapshot.lights.len(), 1);
    assert!(snapshot.devices.is_empty());
}

#[tokio::test]
async fn test_fetch_all_propagates_room_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/clip/v2/resource/room")
        .with_status(403)
        .with_body("unauthorized user")
        .create_async()
        .await;

    let err = bridge_for(&server).fetch_all().await.unwrap_err();
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "unauthorized user");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_envelope_errors_become_bridge_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/clip/v2/resource/room")
        .with_status(200)
        .with_body(r#"{"errors": [{"description": "resource not available"}], "data": []}"#)
        .create_async()
        .await;

    let err = bridge_for(&server).fetch_all().await.unwrap_err();
    assert!(matches!(err, ApiError::Bridge(msg) if msg == "resource not available"));
}

#[tokio::test]
async fn test_set_light_brightness_sends_clamped_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/clip/v2/resource/light/light-1")
        .match_header(APP_KEY_HEADER, KEY)
        .match_body(Matcher::Json(json!({"dimming": {"brightness": 100}})))
        .with_status(200)
        .with_body(envelope(json!([{"rid": "light-1", "rtype": "light"}])))
        .create_async()
        .await;

    bridge_for(&server)
        .set_light_brightness("light-1", 140)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_set_light_color_xy_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/clip/v2/resource/light/light-1")
        .match_body(Matcher::Json(json!({"color": {"xy": {"x": 0.3127, "y": 0.329}}})))
        .with_status(200)
        .with_body(envelope(json!([])))
        .create_async()
        .await;

    bridge_for(&server)
        .set_light_color_xy("light-1", 0.31271, 0.32901)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_grouped_light_and_scene_paths() {
    let mut server = Server::new_async().await;
    let group = server
        .mock("PUT", "/clip/v2/resource/grouped_light/gl-1")
        .match_body(Matcher::Json(json!({"on": {"on": false}})))
        .with_status(200)
        .with_body(envelope(json!([])))
        .create_async()
        .await;
    let scene = server
        .mock("PUT", "/clip/v2/resource/scene/scene-1")
        .match_body(Matcher::Json(json!({"recall": {"action": "active"}})))
        .with_status(200)
        .with_body(envelope(json!([])))
        .create_async()
        .await;

    let bridge = bridge_for(&server);
    bridge.set_grouped_light_on("gl-1", false).await.unwrap();
    bridge.activate_scene("scene-1").await.unwrap();

    group.assert_async().await;
    scene.assert_async().await;
}

#[tokio::test]
async fn test_command_error_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/clip/v2/resource/light/light-1")
        .with_status(429)
        .with_body("too many requests")
        .create_async()
        .await;

    let err = bridge_for(&server)
        .set_light_on("light-1", true)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API error (status 429): too many requests");
}

fn pairing_options() -> PairingOptions {
    PairingOptions {
        device_type: "hue-tui#test".to_string(),
        timeout: Duration::from_millis(300),
        retry_interval: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn test_pairing_success() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api")
        .match_body(Matcher::PartialJson(json!({"generateclientkey": true})))
        .with_status(200)
        .with_body(r#"[{"success": {"username": "new-key", "clientkey": "ABCD"}}]"#)
        .create_async()
        .await;

    let url = Url::parse(&server.url()).unwrap();
    let key = create_app_key_at(&url, &pairing_options()).await.unwrap();
    assert_eq!(key.username, "new-key");
    assert_eq!(key.client_key.as_deref(), Some("ABCD"));
}

#[tokio::test]
async fn test_pairing_times_out_without_button() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api")
        .with_status(200)
        .with_body(r#"[{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]"#)
        .expect_at_least(2)
        .create_async()
        .await;

    let url = Url::parse(&server.url()).unwrap();
    let err = create_app_key_at(&url, &pairing_options()).await.unwrap_err();
    assert!(matches!(err, ApiError::PairingTimeout));
}

#[tokio::test]
async fn test_pairing_other_error_fails_fast() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api")
        .with_status(200)
        .with_body(r#"[{"error": {"type": 7, "description": "invalid value"}}]"#)
        .create_async()
        .await;

    let url = Url::parse(&server.url()).unwrap();
    let err = create_app_key_at(&url, &pairing_options()).await.unwrap_err();
    assert_eq!(err.to_string(), "Bridge error: pairing error: invalid value");
}
