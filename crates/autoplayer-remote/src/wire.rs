//! Wire schemas for the game-state endpoint and the decision service.
//!
//! The game-state endpoint speaks PascalCase JSON and may omit or null any
//! field. Every DTO here therefore defaults each field, and conversion into
//! [`WorldSnapshot`] is total: a payload that parses always yields a
//! snapshot.

use autoplayer_core::action::{Action, InputFrame};
use autoplayer_core::maneuver::Maneuver;
use autoplayer_core::snapshot::{
    Bounds, PlayerState, SolidityGrid, Spike, SpikeDirection, Vec2, WorldSnapshot,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::RemoteError;

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Game state (PascalCase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct XyDto {
    pub x: f32,
    pub y: f32,
}

impl From<XyDto> for Vec2 {
    fn from(v: XyDto) -> Self {
        Vec2 { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BoundsDto {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<BoundsDto> for Bounds {
    fn from(b: BoundsDto) -> Self {
        Bounds::new(b.x, b.y, b.w, b.h)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpikeDto {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(deserialize_with = "nullable")]
    pub direction: String,
}

impl From<SpikeDto> for Spike {
    fn from(s: SpikeDto) -> Self {
        Spike {
            bounds: Bounds::new(s.x, s.y, s.w, s.h),
            direction: parse_direction(&s.direction),
        }
    }
}

/// Case-insensitive spike direction; anything unrecognised points up.
fn parse_direction(raw: &str) -> SpikeDirection {
    match raw.trim().to_ascii_lowercase().as_str() {
        "down" => SpikeDirection::Down,
        "left" => SpikeDirection::Left,
        "right" => SpikeDirection::Right,
        "up" | "" => SpikeDirection::Up,
        other => {
            tracing::debug!(direction = other, "unknown spike direction; assuming up");
            SpikeDirection::Up
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlayerDto {
    #[serde(deserialize_with = "nullable")]
    pub position: XyDto,
    #[serde(deserialize_with = "nullable")]
    pub position_remainder: XyDto,
    #[serde(deserialize_with = "nullable")]
    pub speed: XyDto,
    pub on_ground: bool,
    pub is_holding: bool,
    pub jump_timer: f32,
    pub auto_jump: bool,
    pub max_fall: f32,
    #[serde(rename = "starFlySpeedLerp")]
    pub star_fly_speed_lerp: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LevelDto {
    #[serde(deserialize_with = "nullable")]
    pub bounds: BoundsDto,
    #[serde(deserialize_with = "nullable")]
    pub wind_direction: XyDto,
    #[serde(deserialize_with = "nullable")]
    pub solids_data: String,
    #[serde(deserialize_with = "nullable")]
    pub static_solids: Vec<BoundsDto>,
    #[serde(deserialize_with = "nullable")]
    pub spinners: Vec<BoundsDto>,
    #[serde(deserialize_with = "nullable")]
    pub lightning: Vec<BoundsDto>,
    #[serde(deserialize_with = "nullable")]
    pub spikes: Vec<SpikeDto>,
    #[serde(deserialize_with = "nullable")]
    pub wind_triggers: Vec<BoundsDto>,
    #[serde(deserialize_with = "nullable")]
    pub jump_thrus: Vec<BoundsDto>,
}

/// Top-level game-state payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GameStateDto {
    #[serde(deserialize_with = "nullable")]
    pub player: PlayerDto,
    #[serde(deserialize_with = "nullable")]
    pub level: LevelDto,
    #[serde(deserialize_with = "nullable")]
    pub chapter_time: String,
    #[serde(deserialize_with = "nullable")]
    pub room_name: String,
    #[serde(deserialize_with = "nullable")]
    pub player_state_name: String,
    pub delta_time: f32,
}

fn boxes(list: Vec<BoundsDto>) -> Vec<Bounds> {
    list.into_iter().map(Bounds::from).collect()
}

impl From<GameStateDto> for WorldSnapshot {
    fn from(dto: GameStateDto) -> Self {
        let GameStateDto {
            player,
            level,
            chapter_time,
            room_name,
            player_state_name,
            delta_time: _,
        } = dto;

        WorldSnapshot {
            player: PlayerState {
                x: player.position.x,
                y: player.position.y,
                subpixel_rem_x: player.position_remainder.x,
                subpixel_rem_y: player.position_remainder.y,
                speed_x: player.speed.x,
                speed_y: player.speed.y,
                on_ground: player.on_ground,
                is_holding: player.is_holding,
                jump_timer: player.jump_timer,
                auto_jump: player.auto_jump,
            },
            level_bounds: level.bounds.into(),
            wind: level.wind_direction.into(),
            state_name: player_state_name,
            chapter_time,
            room_name,
            solidity_grid: SolidityGrid::new(level.solids_data),
            static_solids: boxes(level.static_solids),
            spinners: boxes(level.spinners),
            lightning: boxes(level.lightning),
            spikes: level.spikes.into_iter().map(Spike::from).collect(),
            wind_triggers: boxes(level.wind_triggers),
            jump_thrus: boxes(level.jump_thrus),
        }
    }
}

/// Parse a game-state response body.
///
/// An empty body or a literal `null` means the endpoint is up but has no
/// level loaded yet, and yields `Ok(None)`.
pub fn parse_game_state(body: &str) -> Result<Option<WorldSnapshot>, RemoteError> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Ok(None);
    }
    let dto: GameStateDto = serde_json::from_str(body).map_err(|source| RemoteError::Decode {
        what: "game state",
        source,
    })?;
    Ok(Some(dto.into()))
}

// ---------------------------------------------------------------------------
// Decision service (camelCase)
// ---------------------------------------------------------------------------

/// Request body for the decision service: a flat summary of the player and
/// level, without terrain lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub player_x: f32,
    pub player_y: f32,
    pub player_speed_x: f32,
    pub player_speed_y: f32,
    pub on_ground: bool,
    pub is_holding: bool,
    pub jump_timer: f32,
    pub auto_jump: bool,
    pub level_bounds_x: f32,
    pub level_bounds_y: f32,
    pub level_bounds_w: f32,
    pub level_bounds_h: f32,
    pub wind_x: f32,
    pub wind_y: f32,
    pub player_state_name: String,
}

impl From<&WorldSnapshot> for DecisionRequest {
    fn from(snap: &WorldSnapshot) -> Self {
        let player = &snap.player;
        let level = &snap.level_bounds;
        Self {
            player_x: player.x,
            player_y: player.y,
            player_speed_x: player.speed_x,
            player_speed_y: player.speed_y,
            on_ground: player.on_ground,
            is_holding: player.is_holding,
            jump_timer: player.jump_timer,
            auto_jump: player.auto_jump,
            level_bounds_x: level.x,
            level_bounds_y: level.y,
            level_bounds_w: level.w,
            level_bounds_h: level.h,
            wind_x: snap.wind.x,
            wind_y: snap.wind.y,
            player_state_name: snap.state_name.clone(),
        }
    }
}

/// One frame of a decision response. Values are kept wide so out-of-range
/// input is reported rather than silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputFrameDto {
    pub action: i64,
    pub frames: i64,
}

/// Body of `POST /api/decision/decide`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    #[serde(default)]
    pub sequence: Vec<InputFrameDto>,
}

impl DecisionResponse {
    /// Validate the plan and wrap it as a scripted maneuver.
    ///
    /// An empty sequence, or any frame with a non-positive duration, makes
    /// the whole response malformed.
    pub fn into_maneuver(self) -> Result<Maneuver, RemoteError> {
        if self.sequence.is_empty() {
            return Err(RemoteError::Malformed {
                reason: "empty sequence".to_owned(),
            });
        }
        let frames = self
            .sequence
            .iter()
            .enumerate()
            .map(|(i, dto)| {
                let action = Action::from_wire(dto.action);
                let frames = u32::try_from(dto.frames).map_err(|_| RemoteError::Malformed {
                    reason: format!("frame {i} has out-of-range duration {}", dto.frames),
                })?;
                InputFrame::try_new(action, frames).map_err(|e| RemoteError::Malformed {
                    reason: format!("frame {i}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Maneuver::scripted(frames))
    }
}

/// Body of `GET /api/decision/health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "DeltaTime": 0.0166667,
        "ChapterTime": "0:01.394",
        "RoomName": "1",
        "PlayerStateName": "StNormal",
        "Player": {
            "Position": {"X": 24.0, "Y": 152.0},
            "PositionRemainder": {"X": 0.25, "Y": -0.5},
            "Speed": {"X": 90.0, "Y": 0.0},
            "starFlySpeedLerp": 0.0,
            "OnGround": true,
            "IsHolding": false,
            "JumpTimer": 0,
            "AutoJump": false,
            "MaxFall": 160
        },
        "Level": {
            "Bounds": {"X": 0, "Y": 0, "W": 320, "H": 184},
            "WindDirection": {"X": 0, "Y": 0},
            "SolidsData": "0000\n0000\n1111",
            "Spikes": [{"X": 64, "Y": 144, "W": 16, "H": 8, "Direction": "Up"}],
            "JumpThrus": [{"X": 100, "Y": 120, "W": 24, "H": 5}]
        }
    }"#;

    // -- 1. Game state -------------------------------------------------------

    #[test]
    fn full_payload_maps_every_field() {
        let snap = parse_game_state(FULL).unwrap().unwrap();
        assert_eq!((snap.player.x, snap.player.y), (24.0, 152.0));
        assert_eq!(snap.player.subpixel_rem_y, -0.5);
        assert_eq!(snap.player.speed_x, 90.0);
        assert!(snap.player.on_ground);
        assert_eq!(snap.level_bounds, Bounds::new(0.0, 0.0, 320.0, 184.0));
        assert_eq!(snap.state_name, "StNormal");
        assert_eq!(snap.room_name, "1");
        assert_eq!(snap.chapter_time, "0:01.394");
        assert_eq!(snap.solidity_grid.row_count(), 3);
        assert_eq!(snap.spikes.len(), 1);
        assert_eq!(snap.spikes[0].bounds.w, 16.0);
        assert_eq!(snap.jump_thrus.len(), 1);
        assert!(snap.spinners.is_empty());
    }

    #[test]
    fn null_or_empty_body_is_not_ready() {
        assert!(parse_game_state("null").unwrap().is_none());
        assert!(parse_game_state("  null\n").unwrap().is_none());
        assert!(parse_game_state("").unwrap().is_none());
    }

    #[test]
    fn missing_and_null_fields_default() {
        let snap = parse_game_state(r#"{"Player": null, "Level": {"Spikes": null}, "RoomName": null}"#)
            .unwrap()
            .unwrap();
        assert_eq!(snap, WorldSnapshot::default());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_game_state("{not json").unwrap_err();
        assert!(matches!(err, RemoteError::Decode { what: "game state", .. }));
    }

    #[test]
    fn spike_directions() {
        assert_eq!(parse_direction("Down"), SpikeDirection::Down);
        assert_eq!(parse_direction("left"), SpikeDirection::Left);
        assert_eq!(parse_direction("RIGHT"), SpikeDirection::Right);
        assert_eq!(parse_direction("sideways"), SpikeDirection::Up);
        assert_eq!(parse_direction(""), SpikeDirection::Up);
    }

    // -- 2. Decision response ------------------------------------------------

    #[test]
    fn decision_response_becomes_scripted_maneuver() {
        let resp: DecisionResponse = serde_json::from_str(
            r#"{"sequence":[{"action":4,"frames":10},{"action":30,"frames":20}]}"#,
        )
        .unwrap();
        let m = resp.into_maneuver().unwrap();
        assert_eq!(m.duration(), 30);
        assert_eq!(
            m.frames()[1].action(),
            Action::DASH | Action::UP | Action::RIGHT | Action::JUMP
        );
    }

    #[test]
    fn empty_or_zero_frame_responses_are_malformed() {
        let empty = DecisionResponse::default();
        assert!(matches!(empty.into_maneuver(), Err(RemoteError::Malformed { .. })));

        let zero = DecisionResponse {
            sequence: vec![
                InputFrameDto { action: 4, frames: 3 },
                InputFrameDto { action: 2, frames: 0 },
            ],
        };
        let err = zero.into_maneuver().unwrap_err();
        assert!(err.to_string().contains("frame 1"), "{err}");

        let negative = DecisionResponse {
            sequence: vec![InputFrameDto { action: 4, frames: -2 }],
        };
        assert!(negative.into_maneuver().is_err());
    }

    // -- 3. Decision request -------------------------------------------------

    #[test]
    fn decision_request_is_flat_camel_case() {
        let mut snap = WorldSnapshot::default();
        snap.player.x = 12.5;
        snap.player.y = -3.0;
        snap.player.speed_y = 90.0;
        snap.player.on_ground = true;
        snap.player.auto_jump = true;
        snap.level_bounds = Bounds::new(8.0, 16.0, 320.0, 180.0);
        snap.wind = Vec2 { x: 0.5, y: -0.25 };
        snap.state_name = "StDash".to_owned();

        let value = serde_json::to_value(DecisionRequest::from(&snap)).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "autoJump",
                "isHolding",
                "jumpTimer",
                "levelBoundsH",
                "levelBoundsW",
                "levelBoundsX",
                "levelBoundsY",
                "onGround",
                "playerSpeedX",
                "playerSpeedY",
                "playerStateName",
                "playerX",
                "playerY",
                "windX",
                "windY",
            ]
        );
        assert_eq!(value["onGround"], serde_json::json!(true));
        assert_eq!(value["playerX"], serde_json::json!(12.5));
        assert_eq!(value["playerSpeedY"], serde_json::json!(90.0));
        assert_eq!(value["levelBoundsY"], serde_json::json!(16.0));
        assert_eq!(value["windY"], serde_json::json!(-0.25));
        assert_eq!(value["playerStateName"], serde_json::json!("StDash"));
    }
}
