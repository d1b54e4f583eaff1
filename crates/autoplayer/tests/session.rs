//! Whole-session tests: config file to policy, game-state JSON to snapshot,
//! driver ticks to recorded tape, tape back to a verified replay.

use std::sync::Arc;

use autoplayer::prelude::*;
use autoplayer_remote::wire::parse_game_state;
use proptest::prelude::*;

/// Player standing at tile (5, 9) with a solid floor on row 15.
fn game_state_json() -> String {
    let rows: Vec<String> = (0..30)
        .map(|r| if r == 15 { "1".repeat(60) } else { "0".repeat(60) })
        .collect();
    serde_json::json!({
        "Player": {
            "Position": { "X": 40.0, "Y": 79.0 },
            "OnGround": true
        },
        "Level": {
            "Bounds": { "X": 0.0, "Y": 0.0, "W": 480.0, "H": 240.0 },
            "SolidsData": rows.join("\n"),
            "Spikes": null
        },
        "RoomName": "a-01",
        "PlayerStateName": "StNormal"
    })
    .to_string()
}

struct Republish {
    cell: Arc<SnapshotCell>,
    snapshot: WorldSnapshot,
}

impl FetchTrigger for Republish {
    fn request_fetch(&self) -> bool {
        self.cell.publish(self.snapshot.clone());
        true
    }
}

fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autoplayer.json");
    std::fs::write(&path, body).unwrap();
    (dir, path)
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_file_selects_local_policy() {
    let (_dir, path) = write_config(r#"{ "policy": "terrain", "fetch_interval_ticks": 10 }"#);
    let config = AutoplayConfig::from_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.policy, PolicyChoice::Terrain);
    assert_eq!(config.fetch_interval_ticks, 10);
    // Unlisted keys keep their defaults.
    assert_eq!(config.decision_url, AutoplayConfig::default().decision_url);
    assert_eq!(config.build_policy().unwrap().name(), "terrain-aware");
}

#[test]
fn zero_interval_in_file_fails_validation() {
    let (_dir, path) = write_config(r#"{ "fetch_interval_ticks": 0 }"#);
    let config = AutoplayConfig::from_file(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid {
            field: "fetch_interval_ticks",
            ..
        })
    ));
}

#[test]
fn malformed_config_file_reports_parse_error() {
    let (_dir, path) = write_config("{ not json");
    assert!(matches!(
        AutoplayConfig::from_file(&path),
        Err(ConfigError::Parse { .. })
    ));
}

// ---------------------------------------------------------------------------
// Driver sessions
// ---------------------------------------------------------------------------

#[test]
fn game_state_payload_drives_long_combo() {
    let snapshot = parse_game_state(&game_state_json()).unwrap().unwrap();
    assert_eq!(snapshot.room_name, "a-01");

    let mut player = Autoplayer::new(Box::new(TerrainAwarePolicy::default()), 10);
    player.set_trigger(Box::new(Republish {
        cell: player.feed(),
        snapshot,
    }));
    player.start_recording();
    player.start_dynamic();

    let combo = Maneuver::long_jump_dash_combo();
    let mut emitted = Vec::new();
    for _ in 0..combo.duration() {
        emitted.push(player.tick());
    }
    let expected: Vec<Action> = combo
        .frames()
        .iter()
        .flat_map(|f| std::iter::repeat(f.action()).take(f.frames() as usize))
        .collect();
    assert_eq!(emitted, expected);
    assert!(player.gamepad().pressed(Button::Dash));

    let log = player.finish_recording().unwrap();
    assert_eq!(log.total_ticks, combo.duration());
    assert_eq!(log.decisions.len(), 1);
    assert_eq!(log.decisions[0].maneuver, ManeuverKind::LongJumpDashCombo);
    assert_eq!(log.decisions[0].tick, 1);
    assert!(log.decisions[0].snapshot_digest.is_some());
    assert_eq!(log.tape, combo.frames().to_vec());
}

#[test]
fn long_dynamic_session_verifies_as_tape() {
    let snapshot = parse_game_state(&game_state_json()).unwrap().unwrap();
    let mut player = Autoplayer::new(Box::new(TerrainAwarePolicy::default()), 7);
    player.set_trigger(Box::new(Republish {
        cell: player.feed(),
        snapshot,
    }));
    player.start_recording();
    player.start_dynamic();
    for _ in 0..500 {
        player.tick();
    }
    let log = player.finish_recording().unwrap();

    assert_eq!(log.total_ticks, 500);
    assert!(log.decisions.len() >= 2);
    let taped: u64 = log.tape.iter().map(|f| u64::from(f.frames())).sum();
    assert_eq!(taped, 500);

    let result = verify_tape(&log);
    assert_eq!(result.ticks_replayed, 500);
    assert!(result.is_ok(), "{:?}", result.first_divergence);
}

#[test]
fn session_without_snapshots_emits_nothing() {
    let mut player = Autoplayer::new(Box::new(TerrainAwarePolicy::default()), 5);
    player.start_recording();
    player.start_dynamic();
    for _ in 0..30 {
        assert_eq!(player.tick(), Action::NONE);
    }
    let log = player.finish_recording().unwrap();
    assert!(log.decisions.is_empty());
    assert_eq!(log.tape, vec![InputFrame::new(Action::NONE, 30)]);
}

#[test]
fn stop_mid_combo_releases_buttons_on_next_tick() {
    let snapshot = parse_game_state(&game_state_json()).unwrap().unwrap();
    let mut player = Autoplayer::new(Box::new(TerrainAwarePolicy::default()), 100);
    player.set_trigger(Box::new(Republish {
        cell: player.feed(),
        snapshot,
    }));
    player.start_dynamic();
    for _ in 0..10 {
        player.tick();
    }
    assert!(player.gamepad().pressed(Button::Dash));

    player.stop();
    assert_eq!(player.state(), SequencerState::Idle);
    assert_eq!(player.tick(), Action::NONE);
    assert!(player.diagnostics().injected);
    assert!(!player.gamepad().pressed(Button::Dash));
    assert!(!player.gamepad().pressed(Button::Jump));
    assert_eq!(player.gamepad().current().stick_x, 0.0);

    // Released once; afterwards the pad belongs to the player again.
    assert_eq!(player.tick(), Action::NONE);
    assert!(!player.diagnostics().injected);
}

#[test]
fn scripted_combo_end_releases_buttons() {
    let mut player = Autoplayer::new(Box::new(TerrainAwarePolicy::default()), 100);
    player.start_scripted(Maneuver::jump_dash_combo().into_frames());
    for _ in 0..30 {
        player.tick();
    }
    assert!(!player.is_running());
    assert!(player.gamepad().pressed(Button::Dash));

    for _ in 0..50 {
        assert_eq!(player.tick(), Action::NONE);
    }
    assert!(!player.gamepad().pressed(Button::Jump));
    assert!(!player.gamepad().pressed(Button::Dash));
    assert_eq!(player.gamepad().current().stick_x, 0.0);
}

// ---------------------------------------------------------------------------
// Recorder properties
// ---------------------------------------------------------------------------

fn any_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::NONE),
        Just(Action::RIGHT),
        Just(Action::JUMP),
        Just(Action::JUMP | Action::RIGHT),
        Just(Action::DASH | Action::UP | Action::RIGHT | Action::JUMP),
    ]
}

proptest! {
    #[test]
    fn recorded_stream_replays_exactly(stream in prop::collection::vec(any_action(), 0..300)) {
        let mut recorder = PlaybackRecorder::new();
        for (i, action) in stream.iter().enumerate() {
            recorder.record(i as u64 + 1, *action, None);
        }
        let log = recorder.finish();

        let taped: u64 = log.tape.iter().map(|f| u64::from(f.frames())).sum();
        prop_assert_eq!(taped, stream.len() as u64);
        for pair in log.tape.windows(2) {
            prop_assert_ne!(pair[0].action(), pair[1].action());
        }
        let result = verify_tape(&log);
        prop_assert!(result.is_ok());
        prop_assert_eq!(result.ticks_replayed, stream.len() as u64);
    }
}
