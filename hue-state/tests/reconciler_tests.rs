mod support;

use std::time::Duration;

use hue_state::{
    ColorMode, ConnectionStatus, Direction, Field, LightChange, LightUpdate, LocalIntent, Message,
    PendingTarget, Reconciler, ReconcilerConfig, RoomId, SceneId,
};
use hue_stream::{EventKind, ResourceKind, ResourceUpdate, StreamEvent};
use support::{eventually, house, id, wait_for, RecordingClient};
use tokio::sync::mpsc;

fn loaded() -> Reconciler {
    let (mut reconciler, _handle) = Reconciler::new(RecordingClient::new(), ReconcilerConfig::default());
    reconciler.load(&house());
    reconciler
}

fn brightness(reconciler: &Reconciler, light: &str) -> u8 {
    reconciler.store().light(&id(light)).unwrap().brightness()
}

// ============================================================================
// Echo suppression
// ============================================================================

#[tokio::test]
async fn test_rapid_brighten_echoes_are_ignored() {
    let client = RecordingClient::new();
    let (mut reconciler, handle) = Reconciler::new(client, ReconcilerConfig::default());
    reconciler.load(&house());

    for target in [60, 70, 80] {
        let current = brightness(&reconciler, "l1");
        reconciler.handle(LocalIntent::brightness("l1", current, target).into());
    }
    assert_eq!(brightness(&reconciler, "l1"), 80);
    let revision = handle.current().revision;

    for echo in [55, 65, 75, 80] {
        let update = LightUpdate::new("l1").with_brightness(echo);
        assert!(!reconciler.apply_light_update(&update), "echo {} applied", echo);
        assert_eq!(brightness(&reconciler, "l1"), 80);
    }
    assert!(!reconciler.tracker().has_pending(&id("l1"), Field::Brightness));

    // Nothing changed, nothing published
    reconciler.handle(LightUpdate::new("l1").with_brightness(80).into());
    assert_eq!(handle.current().revision, revision);
}

#[tokio::test]
async fn test_overshoot_is_applied() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::brightness("l1", 50, 60).into());

    assert!(reconciler.apply_light_update(&LightUpdate::new("l1").with_brightness(90)));
    assert_eq!(brightness(&reconciler, "l1"), 90);
    assert!(!reconciler.tracker().has_pending(&id("l1"), Field::Brightness));
}

#[tokio::test]
async fn test_dimming_echoes_are_ignored() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::brightness("l1", 50, 10).into());

    for echo in [40, 25, 10] {
        assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_brightness(echo)));
    }
    assert_eq!(brightness(&reconciler, "l1"), 10);
}

#[tokio::test]
async fn test_on_mismatch_applies_but_keeps_pending() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::exact("l1", LightChange::On(false)).into());
    assert!(!reconciler.store().light(&id("l1")).unwrap().on());

    // Another client turned it back on before our echo arrived
    assert!(reconciler.apply_light_update(&LightUpdate::new("l1").with_on(true)));
    assert!(reconciler.tracker().has_pending(&id("l1"), Field::On));

    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_on(false)));
    assert!(!reconciler.tracker().has_pending(&id("l1"), Field::On));
}

#[tokio::test]
async fn test_external_change_without_pending_is_applied() {
    let (mut reconciler, handle) = Reconciler::new(RecordingClient::new(), ReconcilerConfig::default());
    reconciler.load(&house());
    let before = handle.current().revision;

    reconciler.handle(LightUpdate::new("l2").with_on(true).with_brightness(35).into());

    let state = handle.current();
    assert_eq!(state.revision, before + 1);
    let l2 = state.store.light(&id("l2")).unwrap();
    assert!(l2.on());
    assert_eq!(l2.brightness(), 35);
}

#[tokio::test]
async fn test_unknown_light_update_dropped() {
    let mut reconciler = loaded();
    assert!(!reconciler.apply_light_update(&LightUpdate::new("ghost").with_on(true)));
}

// ============================================================================
// Color fields
// ============================================================================

#[tokio::test]
async fn test_out_of_range_temperature_dropped() {
    let mut reconciler = loaded();

    for mirek in [0, 152, 501] {
        assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_color_temp(mirek)));
    }
    let color = reconciler.store().light(&id("l1")).unwrap().color().unwrap().clone();
    assert_eq!(color.mirek(), Some(300));
}

#[tokio::test]
async fn test_temperature_suppressed_while_xy_pending() {
    let mut reconciler = loaded();
    let l1 = id("l1");

    reconciler.handle(LocalIntent::exact("l1", LightChange::ColorXy(0.3, 0.3)).into());
    reconciler.handle(LocalIntent::color_temp("l1", 300, 153).into());
    assert_eq!(reconciler.tracker().get(&l1, Field::ColorTemp).unwrap().direction, Direction::Decreasing);

    // Cool white arrives while the xy write is still outstanding
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_color_temp(153)));
    assert!(reconciler.tracker().has_pending(&l1, Field::ColorTemp));

    // The bridge's rounded xy echo clears the xy op
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_color_xy(0.3001, 0.2999)));
    assert!(!reconciler.tracker().has_pending(&l1, Field::ColorXy));

    // Our own temperature echo confirms and clears
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_color_temp(153)));
    assert!(!reconciler.tracker().has_pending(&l1, Field::ColorTemp));

    // From here on a valid temperature applies normally
    assert!(reconciler.apply_light_update(&LightUpdate::new("l1").with_color_temp(400)));
    let color = reconciler.store().light(&l1).unwrap().color().unwrap().clone();
    assert_eq!(color.mode(), ColorMode::ColorTemp);
    assert_eq!(color.mirek(), Some(400));
}

#[tokio::test]
async fn test_xy_suppressed_while_temperature_pending() {
    let mut reconciler = loaded();

    reconciler.handle(LocalIntent::color_temp("l1", 300, 350).into());
    // Side effect of the mode switch, not an external change
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_color_xy(0.5, 0.41)));
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_color_temp(350)));

    assert!(reconciler.apply_light_update(&LightUpdate::new("l1").with_color_xy(0.5, 0.41)));
    let color = reconciler.store().light(&id("l1")).unwrap().color().unwrap().clone();
    assert_eq!(color.xy(), Some((0.5, 0.41)));
}

#[tokio::test]
async fn test_xy_echoes_ignored_during_rapid_changes() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::exact("l3", LightChange::ColorXy(0.3, 0.3)).into());
    reconciler.handle(LocalIntent::exact("l3", LightChange::ColorXy(0.4, 0.35)).into());

    // Echo of the superseded write: ignored, entry kept
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l3").with_color_xy(0.3, 0.3)));
    assert!(reconciler.tracker().has_pending(&id("l3"), Field::ColorXy));

    assert!(!reconciler.apply_light_update(&LightUpdate::new("l3").with_color_xy(0.4, 0.35)));
    assert!(!reconciler.tracker().has_pending(&id("l3"), Field::ColorXy));
    let color = reconciler.store().light(&id("l3")).unwrap().color().unwrap().clone();
    assert_eq!(color.xy(), Some((0.4, 0.35)));
}

#[tokio::test]
async fn test_hue_sat_edit_registers_xy_target() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::exact("l3", LightChange::HueSat(0, 254)).into());

    let color = reconciler.store().light(&id("l3")).unwrap().color().unwrap().clone();
    let (x, y) = color.xy().unwrap();
    let op = reconciler.tracker().get(&id("l3"), Field::ColorXy).unwrap();
    assert_eq!(op.target, PendingTarget::Pair(x, y));
    assert_eq!(op.direction, Direction::Exact);
}

#[tokio::test]
async fn test_xy_mismatch_dropped_while_xy_pending() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::exact("l3", LightChange::ColorXy(0.3, 0.3)).into());

    // Not our target, but an xy write is still in flight
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l3").with_color_xy(0.6, 0.3)));
    assert!(reconciler.tracker().has_pending(&id("l3"), Field::ColorXy));
    let color = reconciler.store().light(&id("l3")).unwrap().color().unwrap().clone();
    assert_eq!(color.xy(), Some((0.3, 0.3)));
}

// ============================================================================
// Relative steps
// ============================================================================

#[tokio::test]
async fn test_brightness_steps_resolve_against_model() {
    let mut reconciler = loaded();
    for _ in 0..3 {
        reconciler.handle(LocalIntent::brightness_step("l1", 10, 0).into());
    }

    assert_eq!(brightness(&reconciler, "l1"), 80);
    let op = reconciler.tracker().get(&id("l1"), Field::Brightness).unwrap();
    assert_eq!(op.target, PendingTarget::Scalar(80.0));
    assert_eq!(op.direction, Direction::Increasing);
}

#[tokio::test]
async fn test_dim_step_to_zero_turns_light_off() {
    let mut reconciler = loaded();
    assert!(reconciler.apply_light_update(&LightUpdate::new("l1").with_brightness(10)));

    reconciler.handle(LocalIntent::brightness_step("l1", -10, 0).into());
    let light = reconciler.store().light(&id("l1")).unwrap();
    assert!(!light.on());
    assert_eq!(light.brightness(), 10);
    assert!(reconciler.tracker().has_pending(&id("l1"), Field::On));
    assert!(!reconciler.tracker().has_pending(&id("l1"), Field::Brightness));
}

#[tokio::test]
async fn test_room_dim_step_stops_at_floor() {
    let mut reconciler = loaded();
    assert!(reconciler.apply_light_update(&LightUpdate::new("l1").with_brightness(10)));

    reconciler.handle(LocalIntent::brightness_step("l1", -10, 10).into());
    let light = reconciler.store().light(&id("l1")).unwrap();
    assert!(light.on());
    assert_eq!(light.brightness(), 10);
    assert!(!reconciler.tracker().has_pending(&id("l1"), Field::On));
    assert!(!reconciler.tracker().has_pending(&id("l1"), Field::Brightness));
}

#[tokio::test]
async fn test_temperature_steps_resolve_against_model() {
    let mut reconciler = loaded();
    reconciler.handle(LocalIntent::color_temp_step("l1", 25).into());
    reconciler.handle(LocalIntent::color_temp_step("l1", 25).into());

    let color = reconciler.store().light(&id("l1")).unwrap().color().unwrap().clone();
    assert_eq!(color.mirek(), Some(350));
    let op = reconciler.tracker().get(&id("l1"), Field::ColorTemp).unwrap();
    assert_eq!(op.target, PendingTarget::Scalar(350.0));
}

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn test_room_aggregate_follows_updates() {
    let mut reconciler = loaded();
    let room = RoomId::new("room-a");
    assert!(!reconciler.store().room(&room).unwrap().all_on());

    reconciler.apply_light_update(&LightUpdate::new("l2").with_on(true));
    assert!(reconciler.store().room(&room).unwrap().all_on());

    reconciler.apply_light_update(&LightUpdate::new("l1").with_on(false));
    reconciler.apply_light_update(&LightUpdate::new("l2").with_on(false));
    let state = reconciler.store().room(&room).unwrap();
    assert!(!state.all_on());
    assert!(!state.any_on());
}

#[tokio::test]
async fn test_group_intent_uses_grouped_control() {
    let client = RecordingClient::new();
    let (mut reconciler, _handle) = Reconciler::new(client.clone(), ReconcilerConfig::default());
    reconciler.load(&house());

    reconciler.handle(Message::GroupIntent {
        room_id: RoomId::new("room-a"),
        on: true,
    });
    assert!(reconciler.store().room(&RoomId::new("room-a")).unwrap().all_on());

    // Per-light echoes of the grouped command
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l1").with_on(true)));
    assert!(!reconciler.apply_light_update(&LightUpdate::new("l2").with_on(true)));

    eventually(|| client.calls() == vec!["group group-a true".to_string()]).await;
}

#[tokio::test]
async fn test_group_intent_without_grouped_light_sends_per_light() {
    let client = RecordingClient::new();
    let (mut reconciler, _handle) = Reconciler::new(client.clone(), ReconcilerConfig::default());
    reconciler.load(&house());

    reconciler.handle(Message::GroupIntent {
        room_id: RoomId::unassigned(),
        on: false,
    });

    eventually(|| client.calls() == vec!["on l3 false".to_string()]).await;
}

// ============================================================================
// Running loop
// ============================================================================

struct Running {
    handle: hue_state::ReconcilerHandle,
    events: mpsc::Sender<StreamEvent>,
    task: tokio::task::JoinHandle<()>,
}

async fn start(client: std::sync::Arc<RecordingClient>, config: ReconcilerConfig) -> Running {
    let (reconciler, handle) = Reconciler::new(client, config);
    let (events, events_rx) = mpsc::channel(16);
    let task = tokio::spawn(reconciler.run(Some(events_rx)));

    handle.send(Message::Refresh).await.unwrap();
    let mut rx = handle.subscribe();
    wait_for(&mut rx, |d| d.store.light_count() == 3 && !d.loading).await;

    Running { handle, events, task }
}

#[tokio::test]
async fn test_intent_dispatches_command() {
    let client = RecordingClient::new();
    let running = start(client.clone(), ReconcilerConfig::default()).await;

    running
        .handle
        .send(LocalIntent::brightness("l1", 50, 90))
        .await
        .unwrap();

    eventually(|| client.calls() == vec!["brightness l1 90".to_string()]).await;
    assert_eq!(running.handle.current().store.light(&id("l1")).unwrap().brightness(), 90);
    assert!(running.handle.current().error.is_none());
}

#[tokio::test]
async fn test_queued_steps_are_not_lost() {
    let client = RecordingClient::new();
    let running = start(client.clone(), ReconcilerConfig::default()).await;

    // Queued back to back, before any new state is published
    for _ in 0..3 {
        running.handle.try_send(LocalIntent::brightness_step("l1", 10, 0)).unwrap();
    }

    let mut rx = running.handle.subscribe();
    wait_for(&mut rx, |d| d.store.light(&id("l1")).map(|l| l.brightness()) == Some(80)).await;
    eventually(|| client.calls().len() == 3).await;
    let mut calls = client.calls();
    calls.sort();
    assert_eq!(calls, vec!["brightness l1 60", "brightness l1 70", "brightness l1 80"]);
}

#[tokio::test]
async fn test_failed_command_sets_banner_without_rollback() {
    let running = start(RecordingClient::failing(), ReconcilerConfig::default()).await;

    running
        .handle
        .send(LocalIntent::exact("l2", LightChange::On(true)))
        .await
        .unwrap();

    let mut rx = running.handle.subscribe();
    let state = wait_for(&mut rx, |d| d.error.is_some()).await;
    assert!(state.error.as_deref().unwrap().contains("503"));
    assert!(state.store.light(&id("l2")).unwrap().on());
}

#[tokio::test(start_paused = true)]
async fn test_slow_command_times_out() {
    let config = ReconcilerConfig {
        command_timeout: Duration::from_secs(1),
        ..Default::default()
    };
    let running = start(RecordingClient::slow(Duration::from_secs(30)), config).await;

    running
        .handle
        .send(LocalIntent::exact("l1", LightChange::On(false)))
        .await
        .unwrap();

    let mut rx = running.handle.subscribe();
    let state = wait_for(&mut rx, |d| d.error.is_some()).await;
    assert_eq!(state.error.as_deref(), Some("turn l1 off timed out"));
}

#[tokio::test]
async fn test_stream_batch_applies() {
    let running = start(RecordingClient::new(), ReconcilerConfig::default()).await;

    let mut update = ResourceUpdate::new(EventKind::Update, ResourceKind::Light, "l2");
    update.on = Some(true);
    update.brightness = Some(64.7);
    let room = ResourceUpdate::new(EventKind::Update, ResourceKind::Room, "room-a");
    running
        .events
        .send(StreamEvent::Batch(vec![room, update]))
        .await
        .unwrap();

    let mut rx = running.handle.subscribe();
    let state = wait_for(&mut rx, |d| d.store.light(&id("l2")).is_some_and(|l| l.on())).await;
    assert_eq!(state.store.light(&id("l2")).unwrap().brightness(), 65);
    assert!(state.store.room(&RoomId::new("room-a")).unwrap().all_on());
}

#[tokio::test]
async fn test_connection_status_tracks_stream() {
    let running = start(RecordingClient::new(), ReconcilerConfig::default()).await;
    let mut rx = running.handle.subscribe();

    running.events.send(StreamEvent::Connected).await.unwrap();
    wait_for(&mut rx, |d| d.connection == ConnectionStatus::Connected).await;

    running
        .events
        .send(StreamEvent::Disconnected("Event stream ended".into()))
        .await
        .unwrap();
    wait_for(&mut rx, |d| matches!(d.connection, ConnectionStatus::Reconnecting(_))).await;

    drop(running.events);
    wait_for(&mut rx, |d| d.connection == ConnectionStatus::Offline).await;
}

#[tokio::test]
async fn test_scene_activation_refreshes() {
    let client = RecordingClient::new();
    let running = start(client.clone(), ReconcilerConfig::default()).await;
    assert_eq!(client.fetches(), 1);

    running
        .handle
        .send(Message::ActivateScene {
            scene_id: SceneId::new("scene-a"),
        })
        .await
        .unwrap();

    eventually(|| client.fetches() == 2).await;
    assert_eq!(client.calls(), vec!["scene scene-a".to_string()]);
}

#[tokio::test]
async fn test_unknown_scene_sets_banner() {
    let running = start(RecordingClient::new(), ReconcilerConfig::default()).await;
    running
        .handle
        .send(Message::ActivateScene {
            scene_id: SceneId::new("nope"),
        })
        .await
        .unwrap();

    let mut rx = running.handle.subscribe();
    let state = wait_for(&mut rx, |d| d.error.is_some()).await;
    assert_eq!(state.error.as_deref(), Some("Scene not found: nope"));
}

#[tokio::test]
async fn test_refresh_clears_banner() {
    let running = start(RecordingClient::new(), ReconcilerConfig::default()).await;
    running
        .handle
        .send(LocalIntent::exact("ghost", LightChange::On(true)))
        .await
        .unwrap();

    let mut rx = running.handle.subscribe();
    wait_for(&mut rx, |d| d.error.is_some()).await;

    running.handle.send(Message::Refresh).await.unwrap();
    wait_for(&mut rx, |d| d.error.is_none() && !d.loading).await;
}

#[tokio::test]
async fn test_shutdown_ends_loop() {
    let running = start(RecordingClient::new(), ReconcilerConfig::default()).await;
    running.handle.shutdown().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_dropping_handles_ends_loop() {
    let running = start(RecordingClient::new(), ReconcilerConfig::default()).await;
    let Running { handle, events, task } = running;
    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("loop did not stop")
        .unwrap();
    drop(events);
}
