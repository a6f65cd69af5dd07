// Fleet workflow tests: recorder batches, playback entry validation, and
// the per-device step sequence, all against wiremock devices.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gantry_core::{
    CoreError, DeviceRecord, Fleet, FleetConfig, Playback, Recorder, StepDirection, StepOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Long heartbeat interval: each connect fires exactly one liveness poll
/// and then sleeps past the end of the test.
fn quiet_config() -> FleetConfig {
    FleetConfig {
        heartbeat_interval: Duration::from_secs(600),
        ..FleetConfig::default()
    }
}

fn record_for(name: &str, server: &MockServer) -> DeviceRecord {
    let url: url::Url = server.uri().parse().expect("mock server uri");
    DeviceRecord::new(
        name,
        url.host_str().expect("mock server host"),
        url.port().expect("mock server port"),
    )
}

/// Mount the endpoints every connected device answers.
async fn mount_base(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mode"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/target_waypoint"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Mount playback read/write endpoints for a device sitting at `pos`
/// whose neighbouring waypoints are `next` and `previous`.
async fn mount_playback(
    server: &MockServer,
    length: u32,
    pos: (f64, f64),
    next: (f64, f64),
    previous: (f64, f64),
) {
    Mock::given(method("GET"))
        .and(path("/trajectory_length"))
        .respond_with(ResponseTemplate::new(200).set_body_string(length.to_string()))
        .mount(server)
        .await;
    for (prefix, pair) in [
        ("position", pos),
        ("next_waypoint", next),
        ("previous_waypoint", previous),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/{prefix}/q0")))
            .respond_with(ResponseTemplate::new(200).set_body_string(pair.0.to_string()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{prefix}/q1")))
            .respond_with(ResponseTemplate::new(200).set_body_string(pair.1.to_string()))
            .mount(server)
            .await;
    }
    for axis in ["q0", "q1"] {
        Mock::given(method("POST"))
            .and(path(format!("/speed_multiplier/{axis}")))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }
}

async fn fleet_of(servers: &[(&str, &MockServer)]) -> Fleet {
    let records = servers
        .iter()
        .map(|(name, server)| record_for(name, server))
        .collect();
    let (fleet, report) = Fleet::connect_all(records, &quiet_config()).await;
    assert!(report.is_ok(), "connect failures: {:?}", report.failures());
    fleet
}

// ── Recorder ────────────────────────────────────────────────────────

#[tokio::test]
async fn recorder_continues_past_a_failing_device() {
    let alpha = MockServer::start().await;
    let beta = MockServer::start().await;
    mount_base(&alpha).await;
    mount_base(&beta).await;

    // alpha accepts the waypoint; beta errors out.
    Mock::given(method("GET"))
        .and(path("/add_waypoint"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&alpha)
        .await;
    Mock::given(method("GET"))
        .and(path("/add_waypoint"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage full"))
        .expect(1)
        .mount(&beta)
        .await;

    let fleet = fleet_of(&[("alpha", &alpha), ("beta", &beta)]).await;
    let (recorder, enter_report) = Recorder::enter(&fleet).await.unwrap();
    assert!(enter_report.is_ok());

    let report = recorder.capture_waypoint().await;
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "beta");
    assert!(matches!(failures[0].1, CoreError::Api { .. }));

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn recorder_reports_rejected_waypoints() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    Mock::given(method("GET"))
        .and(path("/add_waypoint"))
        .respond_with(ResponseTemplate::new(200).set_body_string("false"))
        .mount(&server)
        .await;

    let fleet = fleet_of(&[("alpha", &server)]).await;
    let (recorder, _) = Recorder::enter(&fleet).await.unwrap();

    let report = recorder.capture_waypoint().await;
    assert!(matches!(
        report.failures()[0].1,
        CoreError::Rejected { operation: "add_waypoint", .. }
    ));

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn finish_saves_on_every_device() {
    let alpha = MockServer::start().await;
    let beta = MockServer::start().await;
    mount_base(&alpha).await;
    mount_base(&beta).await;
    for server in [&alpha, &beta] {
        Mock::given(method("GET"))
            .and(path("/save_trajectory"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(server)
            .await;
    }

    let fleet = fleet_of(&[("alpha", &alpha), ("beta", &beta)]).await;
    let (recorder, _) = Recorder::enter(&fleet).await.unwrap();
    assert!(recorder.finish().await.is_ok());

    fleet.disconnect_all().await;
}

// ── Playback entry ──────────────────────────────────────────────────

#[tokio::test]
async fn mismatched_lengths_abort_entry_before_any_motion_command() {
    let alpha = MockServer::start().await;
    let beta = MockServer::start().await;

    for (server, length) in [(&alpha, 5), (&beta, 7)] {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/trajectory_length"))
            .respond_with(ResponseTemplate::new(200).set_body_string(length.to_string()))
            .mount(server)
            .await;
        // Entry must fail before any mode or target-waypoint command.
        Mock::given(method("POST"))
            .and(path("/mode"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/target_waypoint"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    let records = vec![record_for("alpha", &alpha), record_for("beta", &beta)];
    let (fleet, report) = Fleet::connect_all(records, &quiet_config()).await;
    assert!(report.is_ok());

    let err = Playback::enter(&fleet).await.unwrap_err();
    match err {
        CoreError::TrajectoryMismatch {
            ref device,
            expected,
            found,
        } => {
            assert_eq!(device, "beta");
            assert_eq!(expected, 5);
            assert_eq!(found, 7);
        }
        other => panic!("expected TrajectoryMismatch, got: {other:?}"),
    }

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn empty_trajectory_is_rejected() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    Mock::given(method("GET"))
        .and(path("/trajectory_length"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0"))
        .mount(&server)
        .await;

    let fleet = fleet_of(&[("alpha", &server)]).await;
    let err = Playback::enter(&fleet).await.unwrap_err();
    assert!(matches!(err, CoreError::EmptyTrajectory { .. }), "got: {err:?}");

    fleet.disconnect_all().await;
}

// ── Playback stepping ───────────────────────────────────────────────

#[tokio::test]
async fn step_writes_multipliers_before_the_new_index() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    mount_playback(&server, 3, (0.0, 0.0), (10.0, 5.0), (0.0, 0.0)).await;

    let fleet = fleet_of(&[("alpha", &server)]).await;
    let (mut playback, report) = Playback::enter(&fleet).await.unwrap();
    assert!(report.is_ok());
    assert_eq!(playback.cursor(), 0);
    assert_eq!(playback.trajectory_length(), 3);

    match playback.step(StepDirection::Next).await {
        StepOutcome::Stepped { cursor, report } => {
            assert_eq!(cursor, 1);
            assert!(report.is_ok(), "failures: {:?}", report.failures());
        }
        StepOutcome::Boundary => panic!("unexpected boundary"),
    }

    // The dominant axis runs at full rate, the other at half; both
    // multiplier writes land before the index commit.
    let requests = server.received_requests().await.unwrap();
    let posts: Vec<(String, serde_json::Value)> = requests
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| {
            let body = serde_json::from_slice(&r.body).unwrap_or(serde_json::Value::Null);
            (r.url.path().to_owned(), body)
        })
        .collect();

    let m0 = posts
        .iter()
        .position(|(p, b)| p == "/speed_multiplier/q0" && b["value"] == json!(1.0))
        .expect("q0 multiplier written");
    let m1 = posts
        .iter()
        .position(|(p, b)| p == "/speed_multiplier/q1" && b["value"] == json!(0.5))
        .expect("q1 multiplier written");
    let index = posts
        .iter()
        .position(|(p, b)| p == "/target_waypoint" && b["value"] == json!(1))
        .expect("target index committed");
    assert!(m0 < m1, "q0 multiplier must precede q1");
    assert!(m1 < index, "multipliers must precede the index commit");

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn device_already_at_target_gets_zero_multipliers() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    mount_playback(&server, 2, (3.0, 3.0), (3.0, 3.0), (0.0, 0.0)).await;

    let fleet = fleet_of(&[("alpha", &server)]).await;
    let (mut playback, _) = Playback::enter(&fleet).await.unwrap();

    match playback.step(StepDirection::Next).await {
        StepOutcome::Stepped { report, .. } => assert!(report.is_ok()),
        StepOutcome::Boundary => panic!("unexpected boundary"),
    }

    let requests = server.received_requests().await.unwrap();
    for axis in ["q0", "q1"] {
        let body: serde_json::Value = requests
            .iter()
            .find(|r| r.url.path() == format!("/speed_multiplier/{axis}"))
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .expect("multiplier written");
        assert_eq!(body["value"], json!(0.0));
    }

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn boundary_steps_leave_the_cursor_unchanged() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    mount_playback(&server, 1, (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)).await;

    let fleet = fleet_of(&[("alpha", &server)]).await;
    let (mut playback, _) = Playback::enter(&fleet).await.unwrap();

    // Single-waypoint trajectory: both directions are boundaries.
    assert!(matches!(
        playback.step(StepDirection::Next).await,
        StepOutcome::Boundary
    ));
    assert!(matches!(
        playback.step(StepDirection::Previous).await,
        StepOutcome::Boundary
    ));
    assert_eq!(playback.cursor(), 0);

    // A boundary step sends nothing.
    let requests = server.received_requests().await.unwrap();
    assert!(
        !requests
            .iter()
            .any(|r| r.url.path().starts_with("/speed_multiplier")),
        "boundary step must not write multipliers"
    );

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn stepping_walks_the_cursor_both_ways() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    mount_playback(&server, 3, (0.0, 0.0), (1.0, 1.0), (-1.0, -1.0)).await;

    let fleet = fleet_of(&[("alpha", &server)]).await;
    let (mut playback, _) = Playback::enter(&fleet).await.unwrap();

    for expected in [1, 2] {
        match playback.step(StepDirection::Next).await {
            StepOutcome::Stepped { cursor, .. } => assert_eq!(cursor, expected),
            StepOutcome::Boundary => panic!("unexpected boundary at {expected}"),
        }
    }
    assert!(matches!(
        playback.step(StepDirection::Next).await,
        StepOutcome::Boundary
    ));

    match playback.step(StepDirection::Previous).await {
        StepOutcome::Stepped { cursor, .. } => assert_eq!(cursor, 1),
        StepOutcome::Boundary => panic!("unexpected boundary stepping back"),
    }

    // Previous steps read the previous-waypoint endpoint.
    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .any(|r| r.url.path() == "/previous_waypoint/q0")
    );

    fleet.disconnect_all().await;
}

#[tokio::test]
async fn step_reports_but_does_not_roll_back_on_partial_failure() {
    let alpha = MockServer::start().await;
    let beta = MockServer::start().await;
    mount_base(&alpha).await;
    mount_base(&beta).await;
    mount_playback(&alpha, 2, (0.0, 0.0), (4.0, 2.0), (0.0, 0.0)).await;
    // beta reports a length but cannot serve positions.
    Mock::given(method("GET"))
        .and(path("/trajectory_length"))
        .respond_with(ResponseTemplate::new(200).set_body_string("2"))
        .mount(&beta)
        .await;
    Mock::given(method("GET"))
        .and(path("/position/q0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&beta)
        .await;

    let fleet = fleet_of(&[("alpha", &alpha), ("beta", &beta)]).await;
    let (mut playback, _) = Playback::enter(&fleet).await.unwrap();

    match playback.step(StepDirection::Next).await {
        StepOutcome::Stepped { cursor, report } => {
            // The cursor still advances; alpha's commit stands.
            assert_eq!(cursor, 1);
            let failures = report.failures();
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "beta");
        }
        StepOutcome::Boundary => panic!("unexpected boundary"),
    }

    // alpha received its index commit for waypoint 1.
    let committed = alpha
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/target_waypoint" && r.method.as_str() == "POST")
        .any(|r| serde_json::from_slice::<serde_json::Value>(&r.body).unwrap()["value"] == json!(1));
    assert!(committed);

    fleet.disconnect_all().await;
}

// ── Fleet-wide setters ──────────────────────────────────────────────

#[tokio::test]
async fn disconnected_member_fails_fast_in_batches() {
    let alpha = MockServer::start().await;
    let beta = MockServer::start().await;
    mount_base(&alpha).await;
    mount_base(&beta).await;
    Mock::given(method("POST"))
        .and(path("/target_speed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&alpha)
        .await;
    // The lost device must not see the request.
    Mock::given(method("POST"))
        .and(path("/target_speed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&beta)
        .await;

    let fleet = fleet_of(&[("alpha", &alpha), ("beta", &beta)]).await;
    fleet.get("beta").unwrap().disconnect().await;

    let report = fleet.set_target_speed_all(2.5).await;
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "beta");
    assert!(matches!(failures[0].1, CoreError::NotConnected { .. }));

    fleet.disconnect_all().await;
}
