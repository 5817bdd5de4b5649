//! Command and event types exchanged with the transport
//!
//! The engine never talks to a socket. A transport decodes [`Inbound`]
//! messages, hands them to the session, and delivers each returned
//! [`Outbound`] to the connection named in `to`.

use crate::error::{GameError, codes};
use crate::tetromino::{Shape, TetrominoType};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Connection id of a player
pub type PlayerId = String;

/// Longest accepted room or player name
pub const MAX_NAME_LEN: usize = 20;

/// A command tagged with the connection that sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbound {
    pub from: PlayerId,
    pub command: Command,
}

/// Commands a connection can issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    Join { room: String, player_name: String },
    StartGame { room: String },
    /// Direction is kept as a raw token so unknown values reach validation
    Move { direction: String },
    StopSoftDrop,
    Leave,
}

/// Player input tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Left,
    Right,
    Down,
    Rotate,
    HardDrop,
}

impl FromStr for Direction {
    type Err = GameError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "down" => Ok(Direction::Down),
            "rotate" => Ok(Direction::Rotate),
            "hardDrop" => Ok(Direction::HardDrop),
            other => Err(GameError::validation(
                codes::INVALID_DIRECTION,
                format!("Unknown move direction '{}'", other),
            )),
        }
    }
}

/// Check a room or player name: required, at most 20 characters,
/// ASCII letters and digits only
pub fn validate_name(name: &str, code: &'static str, what: &str) -> Result<(), GameError> {
    if name.is_empty() {
        return Err(GameError::validation(code, format!("{} is required", what)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::validation(
            code,
            format!("{} must be at most {} characters", what, MAX_NAME_LEN),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GameError::validation(
            code,
            format!("{} must be alphanumeric", what),
        ));
    }
    Ok(())
}

/// Preview of the next piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSummary {
    pub kind: TetrominoType,
    pub shape: Shape,
    pub color: u8,
    /// Quarter turns clockwise from spawn, 0..=3
    pub rotation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub score: u64,
    pub lines: u32,
    pub level: u32,
    pub eliminated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumEntry {
    pub player_id: PlayerId,
    pub spectrum: Vec<u8>,
}

/// Events sent to connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Joined {
        room: String,
        player_id: PlayerId,
        is_host: bool,
    },
    /// The player's own grid with the falling piece composited in
    UpdateBoard {
        grid: Vec<Vec<u8>>,
        next_piece: Option<PieceSummary>,
    },
    RoomUpdate {
        room: String,
        players: Vec<PlayerSummary>,
        spectrums: Vec<SpectrumEntry>,
        game_started: bool,
    },
    GameOver,
    GameEnd {
        winner_name: Option<String>,
        is_winner: bool,
    },
    PenaltyReceived {
        lines: usize,
        from_player_name: String,
    },
    JoinError {
        message: String,
        code: String,
    },
    StartError {
        message: String,
        code: String,
    },
    MoveError {
        message: String,
        code: String,
    },
    Error {
        message: String,
        code: String,
    },
}

impl ServerEvent {
    /// Wrap a rejected command in the error event matching that command
    pub fn rejected(command: &Command, err: &GameError) -> Self {
        let message = err.message.clone();
        let code = err.code.to_string();
        match command {
            Command::Join { .. } => ServerEvent::JoinError { message, code },
            Command::StartGame { .. } => ServerEvent::StartError { message, code },
            Command::Move { .. } | Command::StopSoftDrop => ServerEvent::MoveError { message, code },
            Command::Leave => ServerEvent::Error { message, code },
        }
    }

    pub fn error(err: &GameError) -> Self {
        ServerEvent::Error {
            message: err.message.clone(),
            code: err.code.to_string(),
        }
    }
}

/// An event addressed to one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outbound {
    pub to: PlayerId,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(to: impl Into<PlayerId>, event: ServerEvent) -> Self {
        Self {
            to: to.into(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directions() {
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert_eq!("hardDrop".parse::<Direction>(), Ok(Direction::HardDrop));
        let err = "jump".parse::<Direction>().unwrap_err();
        assert_eq!(err.code, codes::INVALID_DIRECTION);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("room42", codes::INVALID_ROOM_NAME, "Room name").is_ok());
        assert!(validate_name("", codes::INVALID_ROOM_NAME, "Room name").is_err());
        assert!(validate_name("has space", codes::INVALID_ROOM_NAME, "Room name").is_err());
        assert!(validate_name(&"a".repeat(21), codes::INVALID_ROOM_NAME, "Room name").is_err());
        assert!(validate_name(&"a".repeat(20), codes::INVALID_ROOM_NAME, "Room name").is_ok());
    }

    #[test]
    fn test_command_json() {
        let inbound: Inbound = serde_json::from_str(
            r#"{"from":"c1","command":{"type":"join","room":"lobby","playerName":"ann"}}"#,
        )
        .unwrap();
        assert_eq!(
            inbound.command,
            Command::Join {
                room: "lobby".into(),
                player_name: "ann".into()
            }
        );
        let leave: Command = serde_json::from_str(r#"{"type":"stopSoftDrop"}"#).unwrap();
        assert_eq!(leave, Command::StopSoftDrop);
    }

    #[test]
    fn test_event_json() {
        let event = ServerEvent::PenaltyReceived {
            lines: 1,
            from_player_name: "bob".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "penaltyReceived");
        assert_eq!(json["fromPlayerName"], "bob");
    }

    #[test]
    fn test_rejected_maps_command() {
        let err = GameError::room(codes::ROOM_FULL, "Room is full");
        let join = Command::Join {
            room: "r".into(),
            player_name: "p".into(),
        };
        assert!(matches!(ServerEvent::rejected(&join, &err), ServerEvent::JoinError { .. }));
        let mv = Command::Move {
            direction: "left".into(),
        };
        assert!(matches!(ServerEvent::rejected(&mv, &err), ServerEvent::MoveError { .. }));
    }
}
